// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
};

use crate::handlers;
use crate::services::booking::AppointmentBookingService;

pub fn appointment_routes(service: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/", get(handlers::list_day_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", post(handlers::transition_status))
        .route("/{appointment_id}/move", patch(handlers::move_appointment))
        .route("/{appointment_id}/history", get(handlers::get_history))
        .with_state(service)
}
