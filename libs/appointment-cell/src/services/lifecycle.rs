// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

pub const DEFAULT_CANCELLATION_REASON: &str = "No reason given";

/// A status change requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Complete,
    Cancel { reason: Option<String> },
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Complete => AppointmentStatus::Completed,
            Transition::Cancel { .. } => AppointmentStatus::Cancelled,
        }
    }
}

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }

    /// True once the appointment's end time has been reached.
    pub fn can_be_completed(&self, appointment: &Appointment, now: DateTime<FixedOffset>) -> bool {
        now >= appointment.end_time
    }

    pub fn can_be_cancelled(&self, appointment: &Appointment) -> bool {
        appointment.status == AppointmentStatus::Scheduled
    }

    pub fn apply(
        &self,
        appointment: &mut Appointment,
        transition: &Transition,
        now: DateTime<FixedOffset>,
    ) -> Result<(), AppointmentError> {
        match transition {
            Transition::Complete => self.complete(appointment, now),
            Transition::Cancel { reason } => self.cancel(appointment, reason.as_deref(), now),
        }
    }

    pub fn complete(&self, appointment: &mut Appointment, now: DateTime<FixedOffset>) -> Result<(), AppointmentError> {
        debug!("Completing appointment {} (status {})", appointment.id, appointment.status);

        match appointment.status {
            AppointmentStatus::Cancelled => {
                warn!("Refusing to complete cancelled appointment {}", appointment.id);
                return Err(AppointmentError::AlreadyCancelled);
            }
            AppointmentStatus::Completed => {
                return Err(AppointmentError::InvalidTransition(AppointmentStatus::Completed));
            }
            AppointmentStatus::Scheduled => {}
        }

        if !self.can_be_completed(appointment, now) {
            warn!(
                "Appointment {} ends at {}, cannot complete at {}",
                appointment.id, appointment.end_time, now
            );
            return Err(AppointmentError::NotYetOccurred);
        }

        appointment.status = AppointmentStatus::Completed;
        appointment.updated_at = now;

        info!("Appointment {} completed", appointment.id);
        Ok(())
    }

    /// Blank or missing reasons are stored as [`DEFAULT_CANCELLATION_REASON`].
    pub fn cancel(
        &self,
        appointment: &mut Appointment,
        reason: Option<&str>,
        now: DateTime<FixedOffset>,
    ) -> Result<(), AppointmentError> {
        if !self.can_be_cancelled(appointment) {
            warn!(
                "Invalid cancellation of appointment {} in status {}",
                appointment.id, appointment.status
            );
            return Err(AppointmentError::InvalidTransition(appointment.status));
        }

        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_CANCELLATION_REASON);

        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancelled_at = Some(now);
        appointment.cancellation_reason = Some(reason.to_string());
        appointment.updated_at = now;

        info!("Appointment {} cancelled: {}", appointment.id, reason);
        Ok(())
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
