// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put, post, delete},
};

use crate::handlers::{self, AvailabilityState};

pub fn availability_routes(state: Arc<AvailabilityState>) -> Router {
    Router::new()
        .route("/{professional_id}/slots", get(handlers::get_available_slots))
        .route("/{professional_id}/weekly-schedule", get(handlers::get_weekly_schedule))
        .route("/{professional_id}/weekly-schedule", put(handlers::upsert_weekly_schedule))
        .route(
            "/{professional_id}/weekly-schedule/{day_of_week}",
            delete(handlers::deactivate_weekly_schedule),
        )
        .route("/{professional_id}/overrides", put(handlers::upsert_day_override))
        .route("/{professional_id}/breaks", get(handlers::list_breaks))
        .route("/{professional_id}/breaks", post(handlers::create_break))
        .route("/{professional_id}/breaks/{break_id}", delete(handlers::deactivate_break))
        .with_state(state)
}
