use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{MarkReadResponse, Notification};
use crate::services::inbox::NotificationService;

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notification_service = NotificationService::from_state(&state);
    Ok(Json(notification_service.unread(&user).await?))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<i64>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let notification_service = NotificationService::from_state(&state);
    let notification = notification_service.mark_read(&user, notification_id).await?;

    Ok(Json(MarkReadResponse {
        success: true,
        notification,
    }))
}
