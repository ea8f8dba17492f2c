// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{CreateAppointmentRequest, MoveAppointmentRequest, TransitionStatusRequest};
use crate::services::booking::AppointmentBookingService;

#[derive(Debug, Deserialize)]
pub struct DayAppointmentsQuery {
    pub professional_id: Uuid,
    pub date: NaiveDate,
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.create(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.get_appointment(appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_day_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(query): Query<DayAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = service
        .appointments_for_day(query.professional_id, query.date)
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn transition_status(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.transition(appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment is now {}", appointment.status)
    })))
}

#[axum::debug_handler]
pub async fn move_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<MoveAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.move_appointment(appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_history(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let history = service.history(appointment_id).await?;
    let summary: Vec<String> = history.iter().map(ToString::to_string).collect();

    Ok(Json(json!({
        "success": true,
        "history": history,
        "summary": summary,
    })))
}
