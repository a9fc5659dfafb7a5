//! Signed session credentials.
//!
//! Compact JWS with an HMAC-SHA256 signature: `base64url(header).base64url(claims).base64url(mac)`.
//! The claims carry the subject (account id, or the operator marker), an admin flag, and the
//! issue/expiry instants as unix seconds.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime when nothing else is configured.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);

const ALG: &str = "HS256";
const TYP: &str = "JWT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        }
    }
}

/// Decoded, verified credential contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Why a credential was refused. Collapsed into [`Error::InvalidCredential`] for callers.
#[derive(Debug, Error)]
enum TokenError {
    #[error("invalid token format")]
    Format,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Issues and verifies session credentials with a shared secret.
#[derive(Clone)]
pub struct CredentialCodec {
    secret: SecretString,
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("secret", &"***")
            .finish()
    }
}

impl CredentialCodec {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|err| Error::Store(anyhow::anyhow!("invalid signing key: {err}")))
    }

    /// Issue a credential valid from now for `ttl`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for a non-positive `ttl` or one whose expiry overflows.
    pub fn issue(&self, subject: &str, is_admin: bool, ttl: Duration) -> Result<String> {
        self.issue_at(subject, is_admin, ttl, OffsetDateTime::now_utc())
    }

    /// Issue a credential as if the clock read `now`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for a non-positive `ttl` or one whose expiry overflows.
    pub fn issue_at(
        &self,
        subject: &str,
        is_admin: bool,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<String> {
        if !ttl.is_positive() {
            return Err(Error::InvalidInput("token ttl must be positive".to_string()));
        }
        let iat = now.unix_timestamp();
        let exp = iat
            .checked_add(ttl.whole_seconds())
            .ok_or_else(|| Error::InvalidInput("token ttl is too large".to_string()))?;
        let claims = SessionClaims {
            sub: subject.to_string(),
            is_admin,
            iat,
            exp,
        };

        let header_b64 = b64e_json(&Header::hs256()).map_err(encode_failure)?;
        let claims_b64 = b64e_json(&claims).map_err(encode_failure)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a credential against the current clock.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCredential`] for anything malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Verify a credential as if the clock read `now`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCredential`] for anything malformed, forged or expired.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<SessionClaims> {
        let mac = self.mac()?;
        decode(mac, token, now.unix_timestamp()).map_err(|err| {
            debug!(reason = %err, "rejected session credential");
            Error::InvalidCredential
        })
    }
}

fn decode(mut mac: HmacSha256, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::Format)?;
    let claims_b64 = parts.next().ok_or(TokenError::Format)?;
    let sig_b64 = parts.next().ok_or(TokenError::Format)?;
    if parts.next().is_some() {
        return Err(TokenError::Format);
    }

    let header: Header = b64d_json(header_b64)?;
    if header.alg != ALG {
        return Err(TokenError::UnsupportedAlg(header.alg));
    }

    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: SessionClaims = b64d_json(claims_b64)?;
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

fn encode_failure(err: TokenError) -> Error {
    Error::Store(anyhow::anyhow!("failed to encode session credential: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn codec(secret: &str) -> CredentialCodec {
        CredentialCodec::new(SecretString::from(secret.to_string()))
    }

    #[test]
    fn issued_credential_verifies_before_expiry() -> anyhow::Result<()> {
        let codec = codec("s");
        let now = datetime!(2024-03-10 12:00 UTC);
        let token = codec.issue_at("user-1", false, Duration::hours(24), now)?;

        let claims = codec.verify_at(&token, now + Duration::hours(23))?;
        assert_eq!(claims.sub, "user-1");
        assert!(!claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 86_400);
        Ok(())
    }

    #[test]
    fn expired_credential_is_rejected() -> anyhow::Result<()> {
        let codec = codec("s");
        let now = datetime!(2024-03-10 12:00 UTC);
        let token = codec.issue_at("user-1", false, Duration::hours(24), now)?;

        let result = codec.verify_at(&token, now + Duration::hours(25));
        assert!(matches!(result, Err(Error::InvalidCredential)));

        let at_expiry = codec.verify_at(&token, now + Duration::hours(24));
        assert!(matches!(at_expiry, Err(Error::InvalidCredential)));
        Ok(())
    }

    #[test]
    fn foreign_secret_is_rejected() -> anyhow::Result<()> {
        let token = codec("s").issue("user-1", false, Duration::hours(1))?;
        assert!(matches!(
            codec("other").verify(&token),
            Err(Error::InvalidCredential)
        ));
        Ok(())
    }

    #[test]
    fn tampered_claims_are_rejected() -> anyhow::Result<()> {
        let codec = codec("s");
        let token = codec.issue("user-1", false, Duration::hours(1))?;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = b64e_json(&SessionClaims {
            sub: "user-1".to_string(),
            is_admin: true,
            iat: 0,
            exp: i64::MAX,
        })?;
        parts[1] = &forged;
        assert!(matches!(
            codec.verify(&parts.join(".")),
            Err(Error::InvalidCredential)
        ));
        Ok(())
    }

    #[test]
    fn malformed_input_is_rejected() {
        let codec = codec("s");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(matches!(
                codec.verify(token),
                Err(Error::InvalidCredential)
            ));
        }
    }

    #[test]
    fn other_algorithms_are_rejected() -> anyhow::Result<()> {
        let codec = codec("s");
        let token = codec.issue("user-1", false, Duration::hours(1))?;
        let parts: Vec<&str> = token.split('.').collect();
        let none_header = b64e_json(&Header {
            alg: "none".to_string(),
            typ: TYP.to_string(),
        })?;
        let forged = format!("{none_header}.{}.{}", parts[1], parts[2]);
        assert!(matches!(
            codec.verify(&forged),
            Err(Error::InvalidCredential)
        ));
        Ok(())
    }

    #[test]
    fn admin_flag_round_trips() -> anyhow::Result<()> {
        let codec = codec("s");
        let token = codec.issue("admin", true, DEFAULT_TOKEN_TTL)?;
        let claims = codec.verify(&token)?;
        assert_eq!(claims.sub, "admin");
        assert!(claims.is_admin);
        Ok(())
    }

    #[test]
    fn non_positive_ttl_is_invalid_input() {
        let codec = codec("s");
        assert!(matches!(
            codec.issue("user-1", false, Duration::ZERO),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            codec.issue("user-1", false, Duration::seconds(-5)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn overflowing_ttl_is_invalid_input() -> anyhow::Result<()> {
        let codec = codec("s");
        assert!(matches!(
            codec.issue("user-1", false, Duration::seconds(i64::MAX)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            codec.issue("user-1", false, Duration::MAX),
            Err(Error::InvalidInput(_))
        ));

        let ten_years = Duration::days(3650);
        let now = datetime!(2024-03-10 12:00 UTC);
        let token = codec.issue_at("user-1", false, ten_years, now)?;
        let claims = codec.verify_at(&token, now + Duration::days(3649))?;
        assert_eq!(claims.exp - claims.iat, ten_years.whole_seconds());
        Ok(())
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", codec("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
