use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::error::AppError;

pub use shared_models::notification::{Notification, NotificationKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkReadResponse {
    pub success: bool,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Notification belongs to another user")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for NotificationError {
    fn from(e: StoreError) -> Self {
        NotificationError::Database(e.to_string())
    }
}

impl From<NotificationError> for AppError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::NotFound => AppError::NotFound(e.to_string()),
            NotificationError::Forbidden => AppError::Forbidden(e.to_string()),
            NotificationError::Database(msg) => AppError::Database(msg),
        }
    }
}
