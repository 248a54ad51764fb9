// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{
    AppointmentStats, CalendarEvent, CancelAppointmentRequest, CancelledAppointment, ConflictCheckQuery,
    ConflictCheckResponse, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::scheduling::SchedulingService;

// ==============================================================================
// CALENDAR VIEWS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    Ok(Json(scheduling_service.list_active(&user).await?))
}

#[axum::debug_handler]
pub async fn list_cancelled_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<CancelledAppointment>>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    Ok(Json(scheduling_service.list_cancelled(&user).await?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    let appointment = scheduling_service.get(&user, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<AppointmentStats>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    Ok(Json(scheduling_service.stats(&user).await?))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<ConflictCheckResponse>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    let response = scheduling_service
        .check_conflicts(&user, &query.start_time, &query.end_time, query.exclude_appointment_id)
        .await?;

    Ok(Json(response))
}

// ==============================================================================
// MUTATIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    let appointment = scheduling_service.create(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": appointment.id,
            "appointment": appointment,
            "message": "Appointment created successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    let appointment = scheduling_service.update(&user, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    let appointment = scheduling_service.complete(&user, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment marked as completed"
    })))
}

/// The body is optional; an empty body cancels with the default reason.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request = parse_cancel_request(&body)?;

    let scheduling_service = SchedulingService::from_state(&state);
    let appointment = scheduling_service
        .cancel(&user, appointment_id, request.reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let scheduling_service = SchedulingService::from_state(&state);
    let removed = scheduling_service.delete(&user, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "id": removed.id,
        "message": "Appointment deleted"
    })))
}

fn parse_cancel_request(body: &[u8]) -> Result<CancelAppointmentRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CancelAppointmentRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        debug!("Malformed cancel body: {}", e);
        AppError::BadRequest(format!("Invalid cancel request: {}", e))
    })
}
