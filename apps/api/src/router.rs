use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::AppointmentBookingService;
use availability_cell::handlers::AvailabilityState;
use availability_cell::router::availability_routes;

pub fn create_router(
    availability: Arc<AvailabilityState>,
    appointments: Arc<AppointmentBookingService>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .nest("/professionals", availability_routes(availability))
        .nest("/appointments", appointment_routes(appointments))
}
