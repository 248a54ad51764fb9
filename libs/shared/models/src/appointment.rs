use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted appointment row. Times are stored in the business reference
/// offset and always satisfy `end_time > start_time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub professional_id: Uuid,
    pub client_id: Option<Uuid>,
    pub cancelled_at: Option<DateTime<FixedOffset>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Appointment {
    /// Cancelled appointments free their slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn is_owned_by(&self, professional_id: Uuid) -> bool {
        self.professional_id == professional_id
    }
}

/// An appointment before the store has assigned its id.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub notes: Option<String>,
    pub professional_id: Uuid,
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
}

impl NewAppointment {
    /// New bookings always start out scheduled.
    pub fn into_appointment(self, id: i64) -> Appointment {
        Appointment {
            id,
            patient_name: self.patient_name,
            start_time: self.start_time,
            end_time: self.end_time,
            status: AppointmentStatus::Scheduled,
            notes: self.notes,
            professional_id: self.professional_id,
            client_id: self.client_id,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[serde(alias = "programada", alias = "Programada")]
    Scheduled,
    #[serde(alias = "completada", alias = "Completada")]
    Completed,
    #[serde(alias = "cancelada", alias = "Cancelada")]
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" | "programada" => Ok(AppointmentStatus::Scheduled),
            "completed" | "completada" => Ok(AppointmentStatus::Completed),
            "cancelled" | "cancelada" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}
