use axum::{Json, response::IntoResponse};

use super::MessageResponse;

#[utoipa::path(
    get,
    path = "/api/",
    responses(
        (status = 200, description = "Service banner", body = MessageResponse)
    ),
    tag = "silvergym"
)]
pub async fn root() -> impl IntoResponse {
    Json(MessageResponse::new("Silver Gym API is running"))
}
