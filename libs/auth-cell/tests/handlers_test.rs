use axum::{
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue},
};

use auth_cell::handlers::{get_profile, list_clients, validate_token, verify_token};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_auth_header(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_validate_token_reports_directory_role() {
    let config = TestConfig::default();
    let doctor = TestUser::professional("doctor");
    let state = config.state_with_users(&[&doctor]);
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    let response = validate_token(State(state), create_auth_header(&token)).await.unwrap().0;

    assert!(response.valid);
    assert_eq!(response.user_id, doctor.id.to_string());
    assert_eq!(response.email, Some(doctor.email.clone()));
    assert_eq!(response.role.as_deref(), Some("professional"));
}

#[tokio::test]
async fn test_validate_token_missing_header() {
    let state = TestConfig::default().state_with_users(&[]);

    let result = validate_token(State(state), HeaderMap::new()).await;

    match result {
        Err(AppError::Auth(msg)) => assert_eq!(msg, "Missing authorization header"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_token_invalid_format() {
    let state = TestConfig::default().state_with_users(&[]);
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));

    let result = validate_token(State(state), headers).await;

    match result {
        Err(AppError::Auth(msg)) => assert_eq!(msg, "Invalid authorization header format"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_token_rejects_bad_signature_and_expiry() {
    let config = TestConfig::default();
    let user = TestUser::client("cliente");
    let state = config.state_with_users(&[&user]);

    let forged = JwtTestUtils::create_invalid_signature_token(&user);
    assert!(matches!(
        validate_token(State(state.clone()), create_auth_header(&forged)).await,
        Err(AppError::Auth(_))
    ));

    let expired = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);
    assert!(matches!(
        validate_token(State(state), create_auth_header(&expired)).await,
        Err(AppError::Auth(_))
    ));
}

#[tokio::test]
async fn test_verify_token_answers_valid_flag() {
    let config = TestConfig::default();
    let user = TestUser::client("cliente");
    let state = config.state_with_users(&[&user]);

    let good = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    let response = verify_token(State(state.clone()), create_auth_header(&good)).await.unwrap().0;
    assert_eq!(response["valid"], true);

    let malformed = JwtTestUtils::create_malformed_token();
    let response = verify_token(State(state), create_auth_header(&malformed)).await.unwrap().0;
    assert_eq!(response["valid"], false);
}

#[tokio::test]
async fn test_get_profile_reads_directory() {
    let admin = TestUser::admin("admin");
    let state = TestConfig::default().state_with_users(&[&admin]);

    let profile = get_profile(State(state), Extension(admin.to_user())).await.unwrap().0;

    assert_eq!(profile["username"], "admin");
    assert_eq!(profile["role"], "admin");
    assert_eq!(profile["is_active"], true);
    assert!(profile["created_at"].as_str().unwrap().ends_with("-05:00"));
}

#[tokio::test]
async fn test_list_clients_requires_professional_capability() {
    let doctor = TestUser::professional("doctor");
    let client = TestUser::client("cliente");
    let state = TestConfig::default().state_with_users(&[&doctor, &client]);

    let clients = list_clients(State(state.clone()), Extension(doctor.to_user())).await.unwrap().0;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, client.id);
    assert_eq!(clients[0].username, "cliente");

    let denied = list_clients(State(state), Extension(client.to_user())).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}
