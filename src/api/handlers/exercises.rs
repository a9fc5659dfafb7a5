use axum::{
    Json,
    extract::{Extension, Path},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{ErrorBody, principal::require_auth};
use crate::{
    api::state::GymState,
    gym::{Error, Exercise, ExerciseLevel, require_user},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompletionResponse {
    pub message: String,
    pub stars_earned: i64,
}

#[utoipa::path(
    get,
    path = "/api/exercises/{level}",
    params(("level" = String, Path, description = "beginner, intermediate or advanced")),
    responses(
        (status = 200, description = "Exercises for the level", body = [Exercise]),
        (status = 400, description = "Unknown level", body = ErrorBody),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "exercises"
)]
pub async fn list_exercises(
    headers: HeaderMap,
    state: Extension<Arc<GymState>>,
    Path(level): Path<String>,
) -> Response {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = require_user(principal) {
        return err.into_response();
    }

    match level.parse::<ExerciseLevel>() {
        Ok(level) => Json(state.ledger().catalog().by_level(level)).into_response(),
        Err(reason) => Error::InvalidInput(reason).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/exercises/{exercise_id}/complete",
    params(("exercise_id" = String, Path, description = "Exercise slug")),
    responses(
        (status = 200, description = "Completion recorded", body = CompletionResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 404, description = "Unknown exercise", body = ErrorBody),
        (status = 409, description = "Already completed today", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "exercises"
)]
pub async fn complete_exercise(
    headers: HeaderMap,
    state: Extension<Arc<GymState>>,
    Path(exercise_id): Path<String>,
) -> Response {
    let account = match require_auth(&headers, &state).await.and_then(require_user) {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };

    match state
        .ledger()
        .record_completion(account.id, &exercise_id, OffsetDateTime::now_utc())
        .await
    {
        Ok(stars_earned) => Json(CompletionResponse {
            message: "Exercise completed!".to_string(),
            stars_earned,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
