use std::env;
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

pub const DEFAULT_UTC_OFFSET: &str = "-05:00";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    /// The single fixed offset the business operates in. Every stored and
    /// compared timestamp is normalised to it.
    pub reference_offset: FixedOffset,
    /// SQLite file. `None` keeps everything in an in-memory database.
    pub database_path: Option<PathBuf>,
    pub port: u16,
    pub seed_default_users: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            reference_offset: env::var("BUSINESS_UTC_OFFSET")
                .ok()
                .and_then(|raw| {
                    let parsed = parse_utc_offset(&raw);
                    if parsed.is_none() {
                        warn!("BUSINESS_UTC_OFFSET '{}' is not a valid offset, using default", raw);
                    }
                    parsed
                })
                .unwrap_or_else(default_offset),
            database_path: env::var("DATABASE_PATH")
                .ok()
                .and_then(|raw| parse_database_path(&raw))
                .or_else(|| {
                    warn!("DATABASE_PATH not set, records will only be kept in memory");
                    None
                }),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            seed_default_users: env::var("SEED_DEFAULT_USERS")
                .map(|raw| !matches!(raw.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

/// Accepts a bare path or a `sqlite://` URL. Blank values and `:memory:`
/// mean no file.
pub fn parse_database_path(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    let path = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(raw);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Some(Utc.fix());
    }

    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

pub fn default_offset() -> FixedOffset {
    parse_utc_offset(DEFAULT_UTC_OFFSET).unwrap_or_else(|| Utc.fix())
}
