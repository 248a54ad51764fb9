// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

pub use shared_models::appointment::{Appointment, AppointmentStatus};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_name: String,
    #[serde(alias = "start_datetime")]
    pub start_time: String,
    #[serde(alias = "end_datetime")]
    pub end_time: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
}

/// Field changes for an appointment. Carries no status; status only moves
/// through complete/cancel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_name: Option<String>,
    #[serde(alias = "start_datetime")]
    pub start_time: Option<String>,
    #[serde(alias = "end_datetime")]
    pub end_time: Option<String>,
    pub notes: Option<String>,
    /// Absent leaves the client untouched, `null` detaches it.
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Option<Uuid>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub start_time: String,
    pub end_time: String,
    pub exclude_appointment_id: Option<i64>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// One entry of the active calendar view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub patient_name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub color: String,
    pub class_name: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub professional: String,
    pub client: String,
    pub client_id: Option<Uuid>,
    pub can_complete: bool,
    pub can_cancel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelledAppointment {
    pub id: i64,
    pub patient_name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub cancelled_at: Option<DateTime<FixedOffset>>,
    pub cancellation_reason: Option<String>,
    pub professional: String,
    pub client: String,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentStats {
    pub total_appointments: usize,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<ConflictDetails>,
}

/// The blocking appointment, reported back so the caller can pick another slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictDetails {
    pub id: i64,
    pub patient_name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

impl From<&Appointment> for ConflictDetails {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_name: appointment.patient_name.clone(),
            start_time: appointment.start_time,
            end_time: appointment.end_time,
        }
    }
}

impl fmt::Display for ConflictDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} '{}' ({} - {})",
            self.id,
            self.patient_name,
            self.start_time.format("%Y-%m-%d %H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

pub fn status_color(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Scheduled => "#0d6efd",
        AppointmentStatus::Completed => "#198754",
        AppointmentStatus::Cancelled => "#dc3545",
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid date-time format: {0}")]
    InvalidFormat(String),

    #[error("End time must be after start time")]
    InvalidRange,

    #[error("Appointment conflicts with existing booking {0}")]
    SchedulingConflict(ConflictDetails),

    #[error("Appointment cannot change from status: {0}")]
    InvalidTransition(AppointmentStatus),

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Appointment cannot be completed before its end time")]
    NotYetOccurred,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for AppointmentError {
    fn from(e: StoreError) -> Self {
        AppointmentError::Database(e.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::InvalidFormat(_)
            | AppointmentError::InvalidRange
            | AppointmentError::Validation(_) => AppError::ValidationError(e.to_string()),
            AppointmentError::SchedulingConflict(ref details) => AppError::ConflictWithDetails {
                message: e.to_string(),
                details: json!(details),
            },
            AppointmentError::InvalidTransition(_)
            | AppointmentError::AlreadyCancelled
            | AppointmentError::NotYetOccurred => AppError::BadRequest(e.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(e.to_string()),
            AppointmentError::NotFound => AppError::NotFound(e.to_string()),
            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}
