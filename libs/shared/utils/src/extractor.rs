use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use shared_models::error::AppError;

use crate::jwt::{subject_id, validate_token};
use crate::state::AppState;

/// Validates the bearer token and resolves the caller against the user
/// directory. The role always comes from the directory, never from claims.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let claims = validate_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;
    let user_id = subject_id(&claims).map_err(AppError::Auth)?;

    let user = state
        .db
        .read(|data| data.active_user(user_id))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .map(|account| account.to_principal())
        .ok_or_else(|| AppError::Auth("Unknown or inactive user".to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::{
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    use shared_models::auth::User;

    use super::*;
    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/whoami", get(|Extension(user): Extension<User>| async move { user.username }))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    #[tokio::test]
    async fn known_user_passes_through() {
        let config = TestConfig::default();
        let doctor = TestUser::professional("doctor");
        let state = config.state_with_users(&[&doctor]);
        let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

        let response = app(state)
            .oneshot(
                Request::get("/whoami")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_subject_is_rejected() {
        let config = TestConfig::default();
        let state = config.state_with_users(&[]);
        let stranger = TestUser::admin("ghost");
        let token = JwtTestUtils::create_test_token(&stranger, &config.jwt_secret, None);

        let response = app(state)
            .oneshot(
                Request::get("/whoami")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = TestConfig::default().state_with_users(&[]);

        let response = app(state)
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_reads_the_header_map() {
        let mut headers = HeaderMap::new();
        assert_matches!(bearer_token(&headers), Err(AppError::Auth(_)));

        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert_matches!(bearer_token(&headers), Err(AppError::Auth(_)));

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
