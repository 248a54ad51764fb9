// libs/appointment-cell/src/services/scheduling.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{ClinicData, Database};
use shared_models::auth::{Role, User};
use shared_models::capability::{has_capability, Action, AppointmentScope};
use shared_models::appointment::NewAppointment;
use shared_models::notification::NotificationKind;
use shared_utils::clock::Clock;
use shared_utils::state::AppState;

use crate::models::{
    status_color, Appointment, AppointmentError, AppointmentStats, AppointmentStatus, CalendarEvent,
    CancelledAppointment, ConflictCheckResponse, ConflictDetails, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::{AppointmentLifecycleService, Transition};
use crate::services::time_range::{TimeRange, TimeRangeValidator};

/// Entry point for every appointment read and mutation.
///
/// Each mutation runs inside a single `BEGIN IMMEDIATE` transaction: the
/// authorization check, the overlap check, the write and the notification it
/// triggers either all commit together or not at all.
pub struct SchedulingService {
    db: Arc<Database>,
    validator: TimeRangeValidator,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
}

impl SchedulingService {
    pub fn new(db: Arc<Database>, reference: FixedOffset, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            validator: TimeRangeValidator::new(reference),
            conflict_service: ConflictDetectionService::new(),
            lifecycle_service: AppointmentLifecycleService::new(),
            clock,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.db), state.config.reference_offset, Arc::clone(&state.clock))
    }

    pub fn validator(&self) -> &TimeRangeValidator {
        &self.validator
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.validator.reference())
    }

    // ==============================================================================
    // MUTATIONS
    // ==============================================================================

    pub async fn create(&self, user: &User, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        info!("User {} creating appointment for '{}'", user.id, request.patient_name);

        authorize(user, Action::CreateAppointment)?;
        let patient_name = required_name(&request.patient_name)?;
        let range = self.validator.validate(&request.start_time, &request.end_time)?;
        let notes = normalize_notes(request.notes);
        let now = self.now();

        let appointment = self
            .db
            .transaction(|data| -> Result<Appointment, AppointmentError> {
                if let Some(client_id) = request.client_id {
                    ensure_client(data, client_id)?;
                }

                let occupying = data.occupying_appointments(user.id)?;
                if let Some(existing) = self.conflict_service.find_conflict(&occupying, user.id, &range, None) {
                    return Err(AppointmentError::SchedulingConflict(ConflictDetails::from(existing)));
                }

                let appointment = data.insert_appointment(NewAppointment {
                    patient_name,
                    start_time: range.start,
                    end_time: range.end,
                    notes,
                    professional_id: user.id,
                    client_id: request.client_id,
                    created_at: now,
                })?;

                if let Some(client_id) = appointment.client_id {
                    data.notify(
                        client_id,
                        format!(
                            "New appointment scheduled: {} on {}",
                            appointment.patient_name,
                            self.validator.display(appointment.start_time)
                        ),
                        NotificationKind::Info,
                        now,
                    )?;
                }

                Ok(appointment)
            })
            .await?;

        info!(
            "Appointment {} created for professional {} ({} - {})",
            appointment.id, appointment.professional_id, appointment.start_time, appointment.end_time
        );
        Ok(appointment)
    }

    /// Changes non-status fields. Times and the client may only change while
    /// the appointment is still scheduled.
    pub async fn update(
        &self,
        user: &User,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!("User {} updating appointment {}", user.id, appointment_id);

        let now = self.now();

        let updated = self
            .db
            .transaction(|data| -> Result<Appointment, AppointmentError> {
                let current = data.appointment(appointment_id)?.ok_or(AppointmentError::NotFound)?;
                authorize(user, Action::UpdateAppointment(&current))?;

                let mut updated = current.clone();

                if let Some(name) = request.patient_name.as_deref() {
                    updated.patient_name = required_name(name)?;
                }

                let reschedules = request.start_time.is_some() || request.end_time.is_some();
                let reassigns = matches!(request.client_id, Some(client) if client != current.client_id);
                if (reschedules || reassigns) && current.status != AppointmentStatus::Scheduled {
                    warn!(
                        "Appointment {} is {}, refusing to change its time or client",
                        appointment_id, current.status
                    );
                    return Err(AppointmentError::InvalidTransition(current.status));
                }

                if reschedules {
                    let start = match request.start_time.as_deref() {
                        Some(raw) => self.validator.parse_timestamp(raw)?,
                        None => current.start_time,
                    };
                    let end = match request.end_time.as_deref() {
                        Some(raw) => self.validator.parse_timestamp(raw)?,
                        None => current.end_time,
                    };
                    let range = TimeRange::new(start, end)?;

                    let occupying = data.occupying_appointments(current.professional_id)?;
                    if let Some(existing) = self.conflict_service.find_conflict(
                        &occupying,
                        current.professional_id,
                        &range,
                        Some(appointment_id),
                    ) {
                        return Err(AppointmentError::SchedulingConflict(ConflictDetails::from(existing)));
                    }

                    updated.start_time = range.start;
                    updated.end_time = range.end;
                }

                if let Some(notes) = request.notes {
                    updated.notes = normalize_notes(Some(notes));
                }

                if let Some(client) = request.client_id {
                    if let Some(client_id) = client {
                        ensure_client(data, client_id)?;
                    }
                    updated.client_id = client;
                }

                updated.updated_at = now;

                data.save_appointment(&updated)?;

                let when = self.validator.display(updated.start_time);
                if let Some(Some(client_id)) = request.client_id {
                    if current.client_id != Some(client_id) {
                        data.notify(
                            client_id,
                            format!("You have been assigned to appointment: {} on {}", updated.patient_name, when),
                            NotificationKind::Info,
                            now,
                        )?;
                    }
                }
                if let Some(client_id) = updated.client_id {
                    data.notify(
                        client_id,
                        format!("Appointment updated: {} on {}", updated.patient_name, when),
                        NotificationKind::Warning,
                        now,
                    )?;
                }

                Ok(updated)
            })
            .await?;

        info!("Appointment {} updated", appointment_id);
        Ok(updated)
    }

    pub async fn complete(&self, user: &User, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.transition(user, appointment_id, Transition::Complete).await
    }

    pub async fn cancel(
        &self,
        user: &User,
        appointment_id: i64,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(user, appointment_id, Transition::Cancel { reason }).await
    }

    async fn transition(
        &self,
        user: &User,
        appointment_id: i64,
        transition: Transition,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "User {} moving appointment {} to {}",
            user.id,
            appointment_id,
            transition.target()
        );

        let now = self.now();

        self.db
            .transaction(|data| -> Result<Appointment, AppointmentError> {
                let mut appointment = data.appointment(appointment_id)?.ok_or(AppointmentError::NotFound)?;
                authorize(user, Action::TransitionAppointment(&appointment))?;

                self.lifecycle_service.apply(&mut appointment, &transition, now)?;
                data.save_appointment(&appointment)?;

                if let Some(client_id) = appointment.client_id {
                    let when = self.validator.display(appointment.start_time);
                    let (message, kind) = match appointment.status {
                        AppointmentStatus::Cancelled => (
                            format!(
                                "Appointment cancelled: {} on {}. Reason: {}",
                                appointment.patient_name,
                                when,
                                appointment.cancellation_reason.as_deref().unwrap_or_default()
                            ),
                            NotificationKind::Danger,
                        ),
                        _ => (
                            format!("Appointment completed: {} on {}", appointment.patient_name, when),
                            NotificationKind::Success,
                        ),
                    };
                    data.notify(client_id, message, kind, now)?;
                }

                Ok(appointment)
            })
            .await
    }

    /// Administrative removal. Bypasses the lifecycle entirely.
    pub async fn delete(&self, user: &User, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        info!("User {} deleting appointment {}", user.id, appointment_id);

        let now = self.now();

        let removed = self
            .db
            .transaction(|data| -> Result<Appointment, AppointmentError> {
                let appointment = data.appointment(appointment_id)?.ok_or(AppointmentError::NotFound)?;
                authorize(user, Action::DeleteAppointment(&appointment))?;

                if let Some(client_id) = appointment.client_id {
                    let message = format!(
                        "Appointment removed: {} on {}",
                        appointment.patient_name,
                        self.validator.display(appointment.start_time)
                    );
                    data.notify(client_id, message, NotificationKind::Danger, now)?;
                }

                data.remove_appointment(appointment_id)?.ok_or(AppointmentError::NotFound)
            })
            .await?;

        info!("Appointment {} ({}) deleted", removed.id, removed.status);
        Ok(removed)
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn get(&self, user: &User, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        debug!("User {} fetching appointment {}", user.id, appointment_id);

        self.db
            .read(|data| -> Result<Appointment, AppointmentError> {
                let appointment = data.appointment(appointment_id)?.ok_or(AppointmentError::NotFound)?;
                authorize(user, Action::ViewAppointment(&appointment))?;
                Ok(appointment)
            })
            .await
    }

    /// Non-cancelled appointments visible to `user`, ordered by start time.
    pub async fn list_active(&self, user: &User) -> Result<Vec<CalendarEvent>, AppointmentError> {
        let scope = AppointmentScope::for_user(user);
        let now = self.now();

        let events = self
            .db
            .read(|data| -> Result<Vec<CalendarEvent>, AppointmentError> {
                let mut active: Vec<Appointment> = data
                    .appointments_in(scope)?
                    .into_iter()
                    .filter(|appointment| appointment.occupies_slot())
                    .collect();
                active.sort_by_key(|appointment| (appointment.start_time, appointment.id));

                active
                    .iter()
                    .map(|appointment| self.calendar_event(data, appointment, now))
                    .collect()
            })
            .await?;

        debug!("Returning {} active appointments for user {}", events.len(), user.id);
        Ok(events)
    }

    /// Cancellation history visible to `user`, newest cancellation first.
    pub async fn list_cancelled(&self, user: &User) -> Result<Vec<CancelledAppointment>, AppointmentError> {
        let scope = AppointmentScope::for_user(user);

        let history = self
            .db
            .read(|data| -> Result<Vec<CancelledAppointment>, AppointmentError> {
                let mut cancelled: Vec<Appointment> = data
                    .appointments_in(scope)?
                    .into_iter()
                    .filter(|appointment| appointment.status == AppointmentStatus::Cancelled)
                    .collect();
                cancelled.sort_by(|a, b| b.cancelled_at.cmp(&a.cancelled_at).then(b.id.cmp(&a.id)));

                cancelled
                    .into_iter()
                    .map(|appointment| -> Result<CancelledAppointment, AppointmentError> {
                        Ok(CancelledAppointment {
                            professional: data.username_or_placeholder(Some(appointment.professional_id))?,
                            client: data.username_or_placeholder(appointment.client_id)?,
                            id: appointment.id,
                            patient_name: appointment.patient_name,
                            start: appointment.start_time,
                            end: appointment.end_time,
                            cancelled_at: appointment.cancelled_at,
                            cancellation_reason: appointment.cancellation_reason,
                            client_id: appointment.client_id,
                        })
                    })
                    .collect()
            })
            .await?;

        debug!("Returning {} cancelled appointments for user {}", history.len(), user.id);
        Ok(history)
    }

    pub async fn stats(&self, user: &User) -> Result<AppointmentStats, AppointmentError> {
        let scope = AppointmentScope::for_user(user);
        let include_users = has_capability(user, Action::ViewUserTotals);

        self.db
            .read(|data| -> Result<AppointmentStats, AppointmentError> {
                let mut stats = AppointmentStats::default();
                for appointment in data.appointments_in(scope)? {
                    stats.total_appointments += 1;
                    match appointment.status {
                        AppointmentStatus::Scheduled => stats.pending += 1,
                        AppointmentStatus::Completed => stats.completed += 1,
                        AppointmentStatus::Cancelled => stats.cancelled += 1,
                    }
                }
                if include_users {
                    stats.total_users = Some(data.count_users()?);
                }
                Ok(stats)
            })
            .await
    }

    /// Read-only overlap check of the caller's own calendar.
    pub async fn check_conflicts(
        &self,
        user: &User,
        raw_start: &str,
        raw_end: &str,
        exclude_appointment_id: Option<i64>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        authorize(user, Action::CreateAppointment)?;
        let range = self.validator.validate(raw_start, raw_end)?;

        let conflicting_appointments = self
            .db
            .read(|data| -> Result<Vec<ConflictDetails>, AppointmentError> {
                let occupying = data.occupying_appointments(user.id)?;
                Ok(self
                    .conflict_service
                    .find_conflicts(&occupying, user.id, &range, exclude_appointment_id)
                    .into_iter()
                    .map(ConflictDetails::from)
                    .collect())
            })
            .await?;

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            conflicting_appointments,
        })
    }

    fn calendar_event(
        &self,
        data: &ClinicData<'_>,
        appointment: &Appointment,
        now: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent, AppointmentError> {
        let scheduled = appointment.status == AppointmentStatus::Scheduled;

        Ok(CalendarEvent {
            id: appointment.id,
            title: appointment.patient_name.clone(),
            patient_name: appointment.patient_name.clone(),
            start: appointment.start_time,
            end: appointment.end_time,
            color: status_color(appointment.status).to_string(),
            class_name: format!("appointment-{}", appointment.status),
            status: appointment.status,
            notes: appointment.notes.clone(),
            professional: data.username_or_placeholder(Some(appointment.professional_id))?,
            client: data.username_or_placeholder(appointment.client_id)?,
            client_id: appointment.client_id,
            can_complete: scheduled && self.lifecycle_service.can_be_completed(appointment, now),
            can_cancel: self.lifecycle_service.can_be_cancelled(appointment),
        })
    }
}

fn authorize(user: &User, action: Action<'_>) -> Result<(), AppointmentError> {
    if has_capability(user, action) {
        Ok(())
    } else {
        warn!("User {} ({}) denied {:?}", user.id, user.role, action);
        Err(AppointmentError::Unauthorized)
    }
}

fn required_name(raw: &str) -> Result<String, AppointmentError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppointmentError::Validation("patient_name is required".to_string()));
    }
    Ok(name.to_string())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty())
}

/// An attached client must be an active account holding the client role.
fn ensure_client(data: &ClinicData<'_>, client_id: Uuid) -> Result<(), AppointmentError> {
    match data.active_user(client_id)? {
        Some(account) if account.role == Role::Client => Ok(()),
        _ => {
            warn!("Rejecting client {}: not an active client account", client_id);
            Err(AppointmentError::Validation(format!(
                "client {} is not an active client",
                client_id
            )))
        }
    }
}
