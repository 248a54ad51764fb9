use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::Database;
use shared_models::auth::{Role, User};
use shared_models::user::UserAccount;

use crate::clock::{Clock, SystemClock};
use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub reference_offset: FixedOffset,
    pub database_path: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            reference_offset: shared_config::default_offset(),
            database_path: None,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            jwt_secret: self.jwt_secret.clone(),
            reference_offset: self.reference_offset,
            database_path: self.database_path.clone(),
            port: 0,
            seed_default_users: false,
        }
    }

    /// In-memory state whose user directory contains `users`.
    pub fn state_with_users(&self, users: &[&TestUser]) -> Arc<AppState> {
        self.state_with_clock(users, Arc::new(SystemClock))
    }

    pub fn state_with_clock(&self, users: &[&TestUser], clock: Arc<dyn Clock>) -> Arc<AppState> {
        let db = Arc::new(database_with(users));
        Arc::new(AppState::with_clock(self.to_app_config(), db, clock))
    }
}

/// In-memory database whose user directory contains `users`.
pub fn database_with(users: &[&TestUser]) -> Database {
    Database::in_memory_with(|data| {
        for user in users {
            data.insert_user(&user.to_account())?;
        }
        Ok(())
    })
    .expect("in-memory database should open")
}

/// Wall-clock now in the default business offset.
pub fn business_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&shared_config::default_offset())
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(username: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role,
        }
    }

    pub fn professional(username: &str) -> Self {
        Self::new(username, Role::Professional)
    }

    pub fn client(username: &str) -> Self {
        Self::new(username, Role::Client)
    }

    pub fn admin(username: &str) -> Self {
        Self::new(username, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: Some(self.email.clone()),
            role: self.role,
        }
    }

    pub fn to_account(&self) -> UserAccount {
        UserAccount {
            id: self.id,
            username: self.username.clone(),
            email: Some(self.email.clone()),
            role: self.role,
            is_active: true,
            created_at: business_now(),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role.as_str(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}
