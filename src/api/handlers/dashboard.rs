use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{ErrorBody, principal::require_auth};
use crate::{api::state::GymState, gym::require_user};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub total_stars: i64,
    pub completed_today: usize,
    pub today_exercises: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/user/dashboard",
    responses(
        (status = 200, description = "Stars and today's completed exercises", body = Dashboard),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "dashboard"
)]
pub async fn dashboard(headers: HeaderMap, state: Extension<Arc<GymState>>) -> Response {
    let account = match require_auth(&headers, &state).await.and_then(require_user) {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };

    let records = match state
        .ledger()
        .todays_completions(account.id, OffsetDateTime::now_utc())
        .await
    {
        Ok(records) => records,
        Err(err) => return err.into_response(),
    };

    Json(Dashboard {
        total_stars: account.total_stars,
        completed_today: records.len(),
        today_exercises: records
            .into_iter()
            .map(|record| record.exercise_id)
            .collect(),
    })
    .into_response()
}
