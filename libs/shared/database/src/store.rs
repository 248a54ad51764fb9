use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, TransactionBehavior};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clinic::ClinicData;
use crate::error::StoreError;
use crate::sqlite::{open_database, open_memory_database, open_read_connection};

/// SQLite backed store.
///
/// Every mutation goes through [`Database::transaction`], which runs the
/// closure inside one `BEGIN IMMEDIATE` transaction on the writer
/// connection. Nothing between taking the lock and `COMMIT` awaits, so a
/// request future dropped mid-flight either committed fully or not at all.
///
/// File databases get a second, query-only connection in WAL mode so reads
/// do not queue behind a writer.
pub struct Database {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening database at {}", path.display());

        let writer = open_database(path)?;
        let reader = open_read_connection(path)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Some(Mutex::new(reader)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database; contents are lost on drop.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::in_memory_with(|_| Ok(()))
    }

    /// In-memory database populated by `init` before it is shared.
    pub fn in_memory_with(init: impl FnOnce(&ClinicData<'_>) -> Result<(), StoreError>) -> Result<Self, StoreError> {
        let mut conn = open_memory_database()?;

        let tx = conn.transaction()?;
        init(&ClinicData::new(&tx))?;
        tx.commit()?;

        Ok(Self {
            writer: Mutex::new(conn),
            reader: None,
            path: None,
        })
    }

    /// Runs `f` against committed state.
    pub async fn read<T, E>(&self, f: impl FnOnce(&ClinicData<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let conn = match &self.reader {
            Some(reader) => reader.lock().await,
            None => self.writer.lock().await,
        };
        f(&ClinicData::new(&conn))
    }

    /// Runs `f` as one atomic unit. `Err` from `f` rolls everything back.
    pub async fn transaction<T, E>(&self, f: impl FnOnce(&ClinicData<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.writer.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        // Dropping `tx` on the error path rolls back.
        let output = f(&ClinicData::new(&tx))?;

        tx.commit().map_err(StoreError::from)?;
        debug!("Transaction committed");
        Ok(output)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("split_reader", &self.reader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{FixedOffset, TimeZone};
    use uuid::Uuid;

    use shared_models::auth::Role;
    use shared_models::notification::NotificationKind;
    use shared_models::user::UserAccount;

    use super::*;

    #[derive(Debug)]
    enum TestError {
        Rejected,
        Store(StoreError),
    }

    impl From<StoreError> for TestError {
        fn from(e: StoreError) -> Self {
            TestError::Store(e)
        }
    }

    fn account(username: &str) -> UserAccount {
        let created_at = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 20, 8, 0, 0)
            .unwrap();
        UserAccount::new(username, None, Role::Professional, created_at)
    }

    #[tokio::test]
    async fn failed_transaction_leaves_state_untouched() {
        let db = Database::in_memory().unwrap();
        let ghost = account("ghost");

        let result: Result<(), TestError> = db
            .transaction(|data| -> Result<(), TestError> {
                data.insert_user(&ghost)?;
                Err(TestError::Rejected)
            })
            .await;

        assert_matches!(result, Err(TestError::Rejected));
        let found = db
            .read(|data| -> Result<_, StoreError> { data.user(ghost.id) })
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn notification_ids_are_serial_and_never_reused() {
        let db = Database::in_memory().unwrap();
        let user = Uuid::new_v4();
        let now = account("clock").created_at;

        let first = db
            .transaction(|data| -> Result<_, StoreError> { data.notify(user, "one", NotificationKind::Info, now) })
            .await
            .unwrap();
        let second = db
            .transaction(|data| -> Result<_, StoreError> { data.notify(user, "two", NotificationKind::Info, now) })
            .await
            .unwrap();

        assert_eq!(second, first + 1);
    }

    #[tokio::test]
    async fn committed_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let doctor = account("doctor");

        let db = Database::open(&path).unwrap();
        db.transaction(|data| -> Result<(), StoreError> { data.insert_user(&doctor) })
            .await
            .unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        let found = reopened
            .read(|data| -> Result<_, StoreError> { data.user_by_username("doctor") })
            .await
            .unwrap();
        assert_eq!(found, Some(doctor));
    }

    #[tokio::test]
    async fn reader_sees_writes_once_committed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("clinic.db")).unwrap();
        let doctor = account("doctor");

        db.transaction(|data| -> Result<(), StoreError> { data.insert_user(&doctor) })
            .await
            .unwrap();

        let count = db
            .read(|data| -> Result<_, StoreError> { data.count_users() })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn garbage_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        std::fs::write(&path, "this is not a sqlite database ".repeat(64)).unwrap();

        assert_matches!(
            Database::open(&path).err(),
            Some(StoreError::Sqlite(_) | StoreError::MigrationFailed { .. })
        );
    }
}
