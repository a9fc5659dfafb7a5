//! Operator-only member management.
//!
//! Flow Overview:
//! 1) Authenticate the bearer credential.
//! 2) Require the administrator principal.
//! 3) Apply the requested change through the account directory or the reset scheduler.

use axum::{
    Json,
    extract::{Extension, Path},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ErrorBody, MessageResponse, principal::require_auth};
use crate::{
    api::state::GymState,
    gym::{Account, ApprovalState, Error, PaymentState, Result, require_admin},
};

/// Account as shown to the operator. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub status: ApprovalState,
    pub payment_status: PaymentState,
    pub total_stars: i64,
    pub created_at: String,
}

impl From<&Account> for MemberRecord {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            username: account.username.clone(),
            email: account.email.clone(),
            status: account.approval,
            payment_status: account.payment,
            total_stars: account.total_stars,
            created_at: account
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| account.created_at.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MemberUpdateRequest {
    pub status: Option<ApprovalState>,
    pub payment_status: Option<PaymentState>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_users: i64,
    pub pending_approval: i64,
    pub active_members: i64,
    pub paid_members: i64,
}

async fn require_operator(headers: &HeaderMap, state: &GymState) -> Result<()> {
    let principal = require_auth(headers, state).await?;
    require_admin(&principal)
}

fn parse_member_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::InvalidInput(format!("invalid user id: {raw}")))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [MemberRecord]),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 403, description = "Administrator required", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_users(headers: HeaderMap, state: Extension<Arc<GymState>>) -> Response {
    if let Err(err) = require_operator(&headers, &state).await {
        return err.into_response();
    }
    match state.directory().list().await {
        Ok(accounts) => {
            Json(accounts.iter().map(MemberRecord::from).collect::<Vec<_>>()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = String, Path, description = "Account id")),
    request_body = MemberUpdateRequest,
    responses(
        (status = 200, description = "Account updated", body = MessageResponse),
        (status = 400, description = "Invalid account id or body", body = ErrorBody),
        (status = 403, description = "Administrator required", body = ErrorBody),
        (status = 404, description = "No such account", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn update_user(
    headers: HeaderMap,
    state: Extension<Arc<GymState>>,
    Path(user_id): Path<String>,
    Json(request): Json<MemberUpdateRequest>,
) -> Response {
    if let Err(err) = require_operator(&headers, &state).await {
        return err.into_response();
    }
    let account_id = match parse_member_id(&user_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state
        .directory()
        .update(account_id, request.status, request.payment_status)
        .await
    {
        Ok(()) => Json(MessageResponse::new("User updated successfully")).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account removed (or already absent)", body = MessageResponse),
        (status = 403, description = "Administrator required", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn delete_user(
    headers: HeaderMap,
    state: Extension<Arc<GymState>>,
    Path(user_id): Path<String>,
) -> Response {
    if let Err(err) = require_operator(&headers, &state).await {
        return err.into_response();
    }
    // An id that is not a UUID names no account, so there is nothing to delete.
    let result = match parse_member_id(&user_id) {
        Ok(account_id) => state.directory().delete(account_id).await,
        Err(_) => Ok(()),
    };

    match result {
        Ok(()) => Json(MessageResponse::new("User deleted successfully")).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/reset-payments",
    responses(
        (status = 200, description = "Every account marked unpaid", body = MessageResponse),
        (status = 403, description = "Administrator required", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn reset_payments(headers: HeaderMap, state: Extension<Arc<GymState>>) -> Response {
    if let Err(err) = require_operator(&headers, &state).await {
        return err.into_response();
    }
    match state.directory().reset_all_payments().await {
        Ok(_) => Json(MessageResponse::new("All payment statuses reset to unpaid")).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/clear-workout-data",
    responses(
        (status = 200, description = "Completions cleared and stars zeroed", body = MessageResponse),
        (status = 403, description = "Administrator required", body = ErrorBody),
        (status = 500, description = "Reset partially failed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn clear_workout_data(headers: HeaderMap, state: Extension<Arc<GymState>>) -> Response {
    if let Err(err) = require_operator(&headers, &state).await {
        return err.into_response();
    }
    let report = state.scheduler().run_cycle().await;
    if report.is_complete() {
        info!("manual workout reset completed");
        Json(MessageResponse::new("All workout data cleared successfully")).into_response()
    } else {
        warn!(?report, "manual workout reset finished with failures");
        Error::Store(anyhow::anyhow!("workout reset incomplete: {report:?}")).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Membership headcounts", body = StatsResponse),
        (status = 403, description = "Administrator required", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn stats(headers: HeaderMap, state: Extension<Arc<GymState>>) -> Response {
    if let Err(err) = require_operator(&headers, &state).await {
        return err.into_response();
    }
    match state.directory().stats().await {
        Ok(stats) => Json(StatsResponse {
            total_users: stats.total,
            pending_approval: stats.pending,
            active_members: stats.approved,
            paid_members: stats.paid,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
