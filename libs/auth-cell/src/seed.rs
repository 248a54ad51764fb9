use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use shared_database::{Database, StoreError};
use shared_models::auth::Role;
use shared_models::user::UserAccount;

/// Accounts every fresh installation starts with: username, email, role.
pub const DEFAULT_USERS: &[(&str, &str, Role)] = &[
    ("admin", "admin@agendapro.com", Role::Admin),
    ("doctor", "doctor@agendapro.com", Role::Professional),
    ("cliente", "cliente@agendapro.com", Role::Client),
];

/// Creates the default accounts whose usernames are not taken yet.
/// Returns how many were created; running it again creates none.
pub async fn seed_default_users(db: &Database, created_at: DateTime<FixedOffset>) -> Result<usize, StoreError> {
    let created = db
        .transaction(|data| -> Result<Vec<UserAccount>, StoreError> {
            let mut created = Vec::new();
            for (username, email, role) in DEFAULT_USERS {
                if data.user_by_username(username)?.is_some() {
                    debug!("Default user '{}' already present", username);
                    continue;
                }
                let account = UserAccount::new(username, Some(*email), *role, created_at);
                data.insert_user(&account)?;
                created.push(account);
            }
            Ok(created)
        })
        .await?;

    for account in &created {
        info!("Seeded {} account '{}' with id {}", account.role, account.username, account.id);
    }

    Ok(created.len())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn seeded_at() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 20, 8, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let db = Database::in_memory().unwrap();

        assert_eq!(seed_default_users(&db, seeded_at()).await.unwrap(), 3);
        assert_eq!(seed_default_users(&db, seeded_at()).await.unwrap(), 0);

        let roles = db
            .read(|data| -> Result<_, StoreError> {
                DEFAULT_USERS
                    .iter()
                    .map(|(username, _, _)| -> Result<_, StoreError> {
                        Ok(data.user_by_username(username)?.map(|a| a.role))
                    })
                    .collect::<Result<Vec<_>, StoreError>>()
            })
            .await
            .unwrap();
        assert_eq!(roles, vec![Some(Role::Admin), Some(Role::Professional), Some(Role::Client)]);
    }

    #[tokio::test]
    async fn seeded_accounts_carry_the_business_offset() {
        let db = Database::in_memory().unwrap();
        seed_default_users(&db, seeded_at()).await.unwrap();

        let admin = db
            .read(|data| data.user_by_username("admin"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.created_at, seeded_at());
        assert_eq!(admin.created_at.offset().local_minus_utc(), -5 * 3600);
    }

    #[tokio::test]
    async fn existing_usernames_are_left_alone() {
        let existing = UserAccount::new("doctor", Some("house@clinic.test"), Role::Professional, seeded_at());
        let db = Database::in_memory_with(|data| data.insert_user(&existing)).unwrap();

        assert_eq!(seed_default_users(&db, seeded_at()).await.unwrap(), 2);

        let doctor = db
            .read(|data| data.user_by_username("doctor"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doctor.id, existing.id);
        assert_eq!(doctor.email.as_deref(), Some("house@clinic.test"));
    }
}
