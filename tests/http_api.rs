use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use silvergym::{
    api::{self, GymConfig, GymState},
    store::{MemoryStore, Store},
};
use std::sync::Arc;
use tower::ServiceExt;

const OPERATOR: (&str, &str) = ("Silver Gym", "silver101");

fn app() -> Result<Router> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let config = GymConfig::new(SecretString::from("http-test-secret".to_string()));
    api::app(Arc::new(GymState::new(store, &config)), None)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn admin_token(app: &Router) -> Result<String> {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/admin/login",
        None,
        Some(json!({"username": OPERATOR.0, "password": OPERATOR.1})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .context("missing access_token")
}

async fn signup(app: &Router, username: &str) -> Result<()> {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "pw1",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        "User registered successfully. Wait for admin approval."
    );
    Ok(())
}

async fn member_id(app: &Router, admin: &str, username: &str) -> Result<String> {
    let (status, users) = send(app, Method::GET, "/api/admin/users", Some(admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    users
        .as_array()
        .context("users is not an array")?
        .iter()
        .find(|user| user["username"] == username)
        .and_then(|user| user["id"].as_str())
        .map(str::to_string)
        .context("member not listed")
}

async fn approved_member_token(app: &Router, username: &str) -> Result<String> {
    signup(app, username).await?;
    let admin = admin_token(app).await?;
    let id = member_id(app, &admin, username).await?;
    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/api/admin/users/{id}"),
        Some(&admin),
        Some(json!({"status": "approved"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": username, "password": "pw1"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .context("missing access_token")
}

#[tokio::test]
async fn banner_and_health() -> Result<()> {
    let app = app()?;
    let (status, body) = send(&app, Method::GET, "/api/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Silver Gym API is running");

    let (status, body) = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "ok");
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    Ok(())
}

#[tokio::test]
async fn pending_member_cannot_log_in() -> Result<()> {
    let app = app()?;
    signup(&app, "alice").await?;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "pw1"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "Account not approved yet. Please wait for admin approval."
    );

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn duplicate_signup_conflicts() -> Result<()> {
    let app = app()?;
    signup(&app, "alice").await?;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"username": "alice", "email": "other@example.com", "password": "pw"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"username": "mallory", "email": "not-an-email", "password": "pw"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn member_completes_exercise_once_per_day() -> Result<()> {
    let app = app()?;
    let token = approved_member_token(&app, "alice").await?;

    let (status, exercises) =
        send(&app, Method::GET, "/api/exercises/beginner", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exercises.as_array().map(Vec::len), Some(10));

    let (status, _) = send(&app, Method::GET, "/api/exercises/expert", Some(&token), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/exercises/push-ups/complete",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Exercise completed!");
    assert_eq!(body["stars_earned"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/exercises/push-ups/complete",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/exercises/moon-walk/complete",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, dashboard) =
        send(&app, Method::GET, "/api/user/dashboard", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_stars"], 1);
    assert_eq!(dashboard["completed_today"], 1);
    assert_eq!(dashboard["today_exercises"], json!(["push-ups"]));
    Ok(())
}

#[tokio::test]
async fn role_boundaries() -> Result<()> {
    let app = app()?;
    let member = approved_member_token(&app, "alice").await?;
    let admin = admin_token(&app).await?;

    let (status, _) = send(&app, Method::GET, "/api/user/dashboard", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/user/dashboard", Some("garbage"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/admin/stats", Some(&member), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/user/dashboard", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/admin/login",
        None,
        Some(json!({"username": OPERATOR.0, "password": "nope"})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn operator_manages_members() -> Result<()> {
    let app = app()?;
    let member = approved_member_token(&app, "alice").await?;
    signup(&app, "bob").await?;
    let admin = admin_token(&app).await?;

    let (status, stats) = send(&app, Method::GET, "/api/admin/stats", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({"total_users": 2, "pending_approval": 1, "active_members": 1, "paid_members": 0})
    );

    let (status, users) = send(&app, Method::GET, "/api/admin/users", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().context("users is not an array")?;
    assert!(users.iter().all(|user| user.get("password_hash").is_none()));

    let alice = member_id(&app, &admin, "alice").await?;
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/users/{alice}"),
        Some(&admin),
        Some(json!({"payment_status": "paid"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/admin/users/not-a-uuid",
        Some(&admin),
        Some(json!({"status": "approved"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/reset-payments",
        Some(&admin),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All payment statuses reset to unpaid");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/exercises/plank/complete",
        Some(&member),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/clear-workout-data",
        Some(&admin),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All workout data cleared successfully");

    let (_, dashboard) =
        send(&app, Method::GET, "/api/user/dashboard", Some(&member), None).await?;
    assert_eq!(dashboard["total_stars"], 0);
    assert_eq!(dashboard["completed_today"], 0);

    let bob = member_id(&app, &admin, "bob").await?;
    for _ in 0..2 {
        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/api/admin/users/{bob}"),
            Some(&admin),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted successfully");
    }

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/admin/users/not-a-uuid",
        Some(&admin),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/admin/users/not-a-uuid",
        Some(&member),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, stats) = send(&app, Method::GET, "/api/admin/stats", Some(&admin), None).await?;
    assert_eq!(stats["total_users"], 1);
    assert_eq!(stats["paid_members"], 0);
    Ok(())
}
