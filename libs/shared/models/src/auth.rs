use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "profesional")]
    Professional,
    #[serde(alias = "cliente")]
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professional => "professional",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "professional" | "profesional" => Ok(Role::Professional),
            "client" | "cliente" => Ok(Role::Client),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// The authenticated caller, resolved from the bearer token and the user
/// directory. Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_role_spellings_are_accepted() {
        let role: Role = serde_json::from_str("\"profesional\"").unwrap();
        assert_eq!(role, Role::Professional);
        assert_eq!("cliente".parse::<Role>().unwrap(), Role::Client);
        assert_eq!(serde_json::to_string(&Role::Client).unwrap(), "\"client\"");
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("doctor".parse::<Role>().is_err());
    }
}
