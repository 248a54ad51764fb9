use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use uuid::Uuid;

use shared_models::appointment::{Appointment, NewAppointment};
use shared_models::auth::Role;
use shared_models::capability::AppointmentScope;
use shared_models::notification::{Notification, NotificationKind};
use shared_models::user::UserAccount;

use crate::error::StoreError;

const USER_COLUMNS: &str = "id, username, email, role, is_active, created_at";

const APPOINTMENT_COLUMNS: &str = "id, patient_name, start_time, end_time, status, notes, \
     professional_id, client_id, cancelled_at, cancellation_reason, created_at, updated_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, kind, is_read, created_at";

/// Repository view over one connection or an open transaction.
///
/// Appointments and the notifications they trigger share a database, so a
/// single [`crate::Database::transaction`] covers both.
pub struct ClinicData<'c> {
    conn: &'c Connection,
}

impl<'c> ClinicData<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==============================================================================
    // USERS
    // ==============================================================================

    pub fn user(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], user_from_row).optional()?)
    }

    pub fn active_user(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND is_active = 1");
        Ok(self.conn.query_row(&sql, params![id], user_from_row).optional()?)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        Ok(self.conn.query_row(&sql, params![username], user_from_row).optional()?)
    }

    pub fn insert_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO users (id, username, email, role, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                account.id,
                account.username,
                account.email,
                account.role.as_str(),
                account.is_active,
                account.created_at,
            ],
        )?;
        Ok(())
    }

    /// Active client accounts, ordered by username.
    pub fn active_clients(&self) -> Result<Vec<UserAccount>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 AND is_active = 1 ORDER BY username"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![Role::Client.as_str()], user_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_users(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Display name for an optional user reference.
    pub fn username_or_placeholder(&self, id: Option<Uuid>) -> Result<String, StoreError> {
        let account = match id {
            Some(id) => self.user(id)?,
            None => None,
        };
        Ok(account
            .map(|account| account.username)
            .unwrap_or_else(|| "N/A".to_string()))
    }

    // ==============================================================================
    // APPOINTMENTS
    // ==============================================================================

    pub fn appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], appointment_from_row).optional()?)
    }

    /// Stores a new scheduled appointment and returns it with its serial id.
    pub fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        self.conn.execute(
            "INSERT INTO appointments (patient_name, start_time, end_time, status, notes,
                 professional_id, client_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'scheduled', ?4, ?5, ?6, ?7, ?7)",
            params![
                new.patient_name,
                new.start_time,
                new.end_time,
                new.notes,
                new.professional_id,
                new.client_id,
                new.created_at,
            ],
        )?;
        Ok(new.into_appointment(self.conn.last_insert_rowid()))
    }

    /// Writes every mutable column of `appointment` back to its row.
    pub fn save_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE appointments
             SET patient_name = ?2, start_time = ?3, end_time = ?4, status = ?5, notes = ?6,
                 client_id = ?7, cancelled_at = ?8, cancellation_reason = ?9, updated_at = ?10
             WHERE id = ?1",
            params![
                appointment.id,
                appointment.patient_name,
                appointment.start_time,
                appointment.end_time,
                appointment.status.as_str(),
                appointment.notes,
                appointment.client_id,
                appointment.cancelled_at,
                appointment.cancellation_reason,
                appointment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Deletes the row and returns what it held.
    pub fn remove_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        let Some(appointment) = self.appointment(id)? else {
            return Ok(None);
        };
        self.conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
        Ok(Some(appointment))
    }

    /// Appointments still holding a slot on `professional_id`'s calendar.
    pub fn occupying_appointments(&self, professional_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.appointments_where(
            "WHERE professional_id = ?1 AND status != 'cancelled'",
            params![professional_id],
        )
    }

    /// Every appointment inside `scope`, ordered by id.
    pub fn appointments_in(&self, scope: AppointmentScope) -> Result<Vec<Appointment>, StoreError> {
        match scope {
            AppointmentScope::All => self.appointments_where("", params![]),
            AppointmentScope::Professional(id) => {
                self.appointments_where("WHERE professional_id = ?1", params![id])
            }
            AppointmentScope::Client(id) => self.appointments_where("WHERE client_id = ?1", params![id]),
        }
    }

    fn appointments_where<P: Params>(&self, filter: &str, params: P) -> Result<Vec<Appointment>, StoreError> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments {filter} ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, appointment_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==============================================================================
    // NOTIFICATIONS
    // ==============================================================================

    /// Queues an unread notification for `user_id` and returns its id.
    pub fn notify(
        &self,
        user_id: Uuid,
        message: impl Into<String>,
        kind: NotificationKind,
        now: DateTime<FixedOffset>,
    ) -> Result<i64, StoreError> {
        let message: String = message.into();
        self.conn.execute(
            "INSERT INTO notifications (user_id, message, kind, is_read, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![user_id, message, kind.as_str(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn notification(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], notification_from_row).optional()?)
    }

    /// Notifications addressed to `user_id`, ordered by id.
    pub fn notifications_for(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, StoreError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
             ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, unread_only], notification_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Returns false when no such notification exists.
    pub fn mark_notification_read(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("UPDATE notifications SET is_read = 1 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role: parse_column(row, 3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        status: parse_column(row, 4)?,
        notes: row.get(5)?,
        professional_id: row.get(6)?,
        client_id: row.get(7)?,
        cancelled_at: row.get(8)?,
        cancellation_reason: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        kind: parse_column(row, 3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Enum columns are stored as their lowercase names.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
