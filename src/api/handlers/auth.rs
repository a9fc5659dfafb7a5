//! Signup and login endpoints for members and the operator.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ErrorBody, MessageResponse};
use crate::{
    api::state::GymState,
    gym::{Account, LoginGrant},
};

const TOKEN_TYPE: &str = "bearer";

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Member fields returned on login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub total_stars: i64,
}

impl From<&Account> for MemberSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            username: account.username.clone(),
            email: account.email.clone(),
            total_stars: account.total_stars,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: MemberSummary,
}

impl From<LoginGrant> for LoginResponse {
    fn from(grant: LoginGrant) -> Self {
        Self {
            access_token: grant.token,
            token_type: TOKEN_TYPE.to_string(),
            user: MemberSummary::from(&grant.account),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, awaiting approval", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Username or email already registered", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn signup(
    state: Extension<Arc<GymState>>,
    Json(request): Json<SignupRequest>,
) -> Response {
    match state
        .directory()
        .register(&request.username, &request.email, &request.password)
        .await
    {
        Ok(_) => (
            StatusCode::CREATED,
            Json(MessageResponse::new(
                "User registered successfully. Wait for admin approval.",
            )),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Account not approved", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<GymState>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match state.gate().login(&request.username, &request.password).await {
        Ok(grant) => Json(LoginResponse::from(grant)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Operator session issued", body = AdminLoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn admin_login(
    state: Extension<Arc<GymState>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match state.gate().admin_login(&request.username, &request.password) {
        Ok(access_token) => Json(AdminLoginResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
