//! Role based authorization.
//!
//! Every permission decision in the service goes through [`has_capability`];
//! handlers and services never compare role names themselves.

use uuid::Uuid;

use crate::appointment::Appointment;
use crate::auth::{Role, User};
use crate::notification::Notification;

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// Book a new appointment on the caller's own calendar.
    CreateAppointment,
    ViewAppointment(&'a Appointment),
    /// Change non-status fields (patient, times, notes, client).
    UpdateAppointment(&'a Appointment),
    /// Complete or cancel.
    TransitionAppointment(&'a Appointment),
    /// Administrative hard removal, bypasses the lifecycle.
    DeleteAppointment(&'a Appointment),
    ListClients,
    ViewUserTotals,
    ReadNotification(&'a Notification),
}

pub fn has_capability(user: &User, action: Action<'_>) -> bool {
    match action {
        Action::CreateAppointment | Action::ListClients => is_professional_capable(user.role),
        Action::ViewAppointment(appointment) => AppointmentScope::for_user(user).includes(appointment),
        Action::UpdateAppointment(appointment) | Action::TransitionAppointment(appointment) => {
            match user.role {
                Role::Admin => true,
                Role::Professional => appointment.is_owned_by(user.id),
                Role::Client => false,
            }
        }
        Action::DeleteAppointment(_) | Action::ViewUserTotals => user.role == Role::Admin,
        Action::ReadNotification(notification) => notification.user_id == user.id,
    }
}

fn is_professional_capable(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Professional)
}

/// Which appointments a caller may see in lists and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    Professional(Uuid),
    Client(Uuid),
}

impl AppointmentScope {
    pub fn for_user(user: &User) -> Self {
        match user.role {
            Role::Admin => AppointmentScope::All,
            Role::Professional => AppointmentScope::Professional(user.id),
            Role::Client => AppointmentScope::Client(user.id),
        }
    }

    pub fn includes(&self, appointment: &Appointment) -> bool {
        match self {
            AppointmentScope::All => true,
            AppointmentScope::Professional(id) => appointment.professional_id == *id,
            AppointmentScope::Client(id) => appointment.client_id == Some(*id),
        }
    }
}
