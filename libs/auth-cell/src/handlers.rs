use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{TokenResponse, User};
use shared_models::capability::{has_capability, Action};
use shared_models::error::AppError;
use shared_database::StoreError;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt::{subject_id, validate_token as decode_token};
use shared_utils::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSummary {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

/// Checks the token and reports who it belongs to. The role is taken from
/// the user directory when the subject is a known account.
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(&headers)?;
    let claims = decode_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;

    let directory_role = match subject_id(&claims) {
        Ok(id) => {
            state
                .db
                .read(|data| data.active_user(id))
                .await
                .map_err(database_error)?
                .map(|account| account.role)
        }
        Err(_) => None,
    };

    Ok(Json(TokenResponse {
        valid: true,
        user_id: claims.sub,
        email: claims.email,
        role: directory_role.map(|role| role.to_string()).or(claims.role),
    }))
}

pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(&headers)?;

    match decode_token(token, &state.config.jwt_secret) {
        Ok(_) => Ok(Json(json!({ "valid": true }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let account = state
        .db
        .read(|data| data.user(user.id))
        .await
        .map_err(database_error)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "user_id": account.id,
        "username": account.username,
        "email": account.email,
        "role": account.role,
        "is_active": account.is_active,
        "created_at": account.created_at
    })))
}

/// Active client accounts, for attaching to appointments.
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<ClientSummary>>, AppError> {
    if !has_capability(&user, Action::ListClients) {
        return Err(AppError::Forbidden("Only professionals can list clients".to_string()));
    }

    let clients = state
        .db
        .read(|data| data.active_clients())
        .await
        .map_err(database_error)?
        .into_iter()
        .map(|account| ClientSummary {
            id: account.id,
            username: account.username,
            email: account.email,
        })
        .collect::<Vec<_>>();

    debug!("Returning {} clients to {}", clients.len(), user.id);
    Ok(Json(clients))
}

fn database_error(e: StoreError) -> AppError {
    AppError::Database(e.to_string())
}
