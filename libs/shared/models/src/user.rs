use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Role, User};

/// A directory entry. Credentials are managed elsewhere; the scheduling
/// core only reads the role and the display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl UserAccount {
    pub fn new(username: &str, email: Option<&str>, role: Role, created_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.map(str::to_string),
            role,
            is_active: true,
            created_at,
        }
    }

    pub fn to_principal(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}
