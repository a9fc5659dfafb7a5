//! Authenticated principal extraction.
//!
//! Flow Overview: read the `Authorization: Bearer` header, verify it with the
//! access gate, and hand the resulting principal to the handler.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::{
    api::state::GymState,
    gym::{Error, Principal, Result},
};

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the bearer credential into a principal, or 401 when it is missing or invalid.
pub async fn require_auth(headers: &HeaderMap, state: &GymState) -> Result<Principal> {
    let token = extract_bearer_token(headers).ok_or(Error::Unauthorized)?;
    state.gate().authenticate(&token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_variants() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz  "));
        assert_eq!(extract_bearer_token(&headers), Some("xyz".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
