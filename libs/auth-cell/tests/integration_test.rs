use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use auth_cell::{auth_routes, client_routes, seed_default_users};
use shared_database::{Database, StoreError};
use shared_utils::state::AppState;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

async fn seeded_state(config: &TestConfig) -> Arc<AppState> {
    let db = Database::in_memory().unwrap();
    seed_default_users(&db, Utc::now().with_timezone(&config.reference_offset))
        .await
        .unwrap();
    Arc::new(AppState::new(config.to_app_config(), Arc::new(db)))
}

/// The seeded account with `username`, as a token-minting test user.
async fn seeded_user(state: &AppState, username: &str) -> TestUser {
    let account = state
        .db
        .read(|data| data.user_by_username(username))
        .await
        .unwrap()
        .unwrap();

    TestUser {
        id: account.id,
        username: account.username,
        email: account.email.unwrap_or_default(),
        role: account.role,
    }
}

async fn post(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::post(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_seeded_users_can_authenticate() {
    let config = TestConfig::default();
    let state = seeded_state(&config).await;
    let doctor = seeded_user(&state, "doctor").await;
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let (status, body) = post(auth_routes(state.clone()), "/validate", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "professional");

    let (status, body) = post(auth_routes(state), "/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "doctor@agendapro.com");
}

#[tokio::test]
async fn test_profile_requires_token() {
    let config = TestConfig::default();
    let state = seeded_state(&config).await;

    let (status, body) = post(auth_routes(state), "/profile", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");
}

#[tokio::test]
async fn test_client_directory_routes() {
    let config = TestConfig::default();
    let state = seeded_state(&config).await;
    let doctor = seeded_user(&state, "doctor").await;
    let cliente = seeded_user(&state, "cliente").await;

    let response = client_routes(state.clone())
        .oneshot(
            Request::get("/clients")
                .header(
                    "Authorization",
                    format!("Bearer {}", JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let clients: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(clients.as_array().unwrap().len(), 1);
    assert_eq!(clients[0]["username"], "cliente");

    let response = client_routes(state)
        .oneshot(
            Request::get("/clients")
                .header(
                    "Authorization",
                    format!("Bearer {}", JwtTestUtils::create_test_token(&cliente, &config.jwt_secret, None)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seed_survives_database_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.db");
    let now = Utc::now().with_timezone(&TestConfig::default().reference_offset);

    let db = Database::open(&path).unwrap();
    assert_eq!(seed_default_users(&db, now).await.unwrap(), 3);
    drop(db);

    let reopened = Database::open(&path).unwrap();
    assert_eq!(seed_default_users(&reopened, now).await.unwrap(), 0);
    let users = reopened
        .read(|data| -> Result<_, StoreError> { data.count_users() })
        .await
        .unwrap();
    assert_eq!(users, 3);
}
