use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_database::Database;
use shared_models::auth::User;
use shared_models::capability::{has_capability, Action};
use shared_utils::state::AppState;

use crate::models::{Notification, NotificationError};

/// Unread notifications returned per request.
pub const INBOX_LIMIT: usize = 10;

pub struct NotificationService {
    db: Arc<Database>,
}

impl NotificationService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.db))
    }

    /// The caller's unread notifications, newest first.
    pub async fn unread(&self, user: &User) -> Result<Vec<Notification>, NotificationError> {
        let mut inbox = self
            .db
            .read(|data| -> Result<_, NotificationError> { Ok(data.notifications_for(user.id, true)?) })
            .await?;

        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        inbox.truncate(INBOX_LIMIT);

        debug!("User {} has {} unread notifications", user.id, inbox.len());
        Ok(inbox)
    }

    pub async fn mark_read(&self, user: &User, notification_id: i64) -> Result<Notification, NotificationError> {
        let notification = self
            .db
            .transaction(|data| -> Result<Notification, NotificationError> {
                let mut notification = data
                    .notification(notification_id)?
                    .ok_or(NotificationError::NotFound)?;

                if !has_capability(user, Action::ReadNotification(&notification)) {
                    warn!(
                        "User {} tried to mark notification {} of user {}",
                        user.id, notification_id, notification.user_id
                    );
                    return Err(NotificationError::Forbidden);
                }

                data.mark_notification_read(notification_id)?;
                notification.is_read = true;
                Ok(notification)
            })
            .await?;

        info!("Notification {} marked as read by {}", notification_id, user.id);
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone};
    use uuid::Uuid;

    use shared_models::auth::Role;
    use shared_models::notification::NotificationKind;

    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: role.to_string(),
            email: None,
            role,
        }
    }

    fn morning() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 20, 8, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn inbox_is_newest_first_and_capped() {
        let owner = user(Role::Client);
        let db = Database::in_memory_with(|data| {
            for i in 0..12 {
                data.notify(owner.id, format!("message {}", i), NotificationKind::Info, morning() + Duration::minutes(i))?;
            }
            data.notify(Uuid::new_v4(), "someone else", NotificationKind::Info, morning())?;
            Ok(())
        })
        .unwrap();

        let service = NotificationService::new(Arc::new(db));
        let inbox = service.unread(&owner).await.unwrap();

        assert_eq!(inbox.len(), INBOX_LIMIT);
        assert_eq!(inbox[0].message, "message 11");
        assert_eq!(inbox[9].message, "message 2");
    }

    #[tokio::test]
    async fn inbox_orders_by_instant_across_offsets() {
        let owner = user(Role::Client);
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        let db = Database::in_memory_with(|data| {
            // 05:30-08:00 is half an hour after 08:00-05:00.
            let later = morning().with_timezone(&pacific) + Duration::minutes(30);
            data.notify(owner.id, "later", NotificationKind::Info, later)?;
            data.notify(owner.id, "earlier", NotificationKind::Info, morning())?;
            Ok(())
        })
        .unwrap();

        let inbox = NotificationService::new(Arc::new(db)).unread(&owner).await.unwrap();

        assert_eq!(inbox[0].message, "later");
        assert_eq!(inbox[1].message, "earlier");
    }

    #[tokio::test]
    async fn marking_read_removes_from_inbox() {
        let owner = user(Role::Client);
        let mut id = 0;
        let db = Database::in_memory_with(|data| {
            id = data.notify(owner.id, "hello", NotificationKind::Success, morning())?;
            Ok(())
        })
        .unwrap();

        let service = NotificationService::new(Arc::new(db));
        let marked = service.mark_read(&owner, id).await.unwrap();

        assert!(marked.is_read);
        assert!(service.unread(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_and_unknown_notifications_are_rejected() {
        let owner = user(Role::Client);
        let admin = user(Role::Admin);
        let mut id = 0;
        let db = Database::in_memory_with(|data| {
            id = data.notify(owner.id, "private", NotificationKind::Warning, morning())?;
            Ok(())
        })
        .unwrap();

        let service = NotificationService::new(Arc::new(db));

        assert_matches!(service.mark_read(&admin, id).await, Err(NotificationError::Forbidden));
        assert_matches!(service.mark_read(&owner, id + 1).await, Err(NotificationError::NotFound));
        assert_eq!(service.unread(&owner).await.unwrap().len(), 1);
    }
}
