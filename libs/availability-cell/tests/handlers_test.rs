// libs/availability-cell/tests/handlers_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Json, Path, Query, State};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use availability_cell::handlers::{self, AvailabilityState};
use availability_cell::models::{AvailabilityQueryRequest, UpsertWeeklyScheduleRequest};
use shared_config::SchedulingConfig;
use shared_database::InMemoryStore;
use shared_models::error::AppError;

fn state() -> Arc<AvailabilityState> {
    Arc::new(AvailabilityState::new(
        Arc::new(InMemoryStore::new()),
        &SchedulingConfig::default(),
    ))
}

#[tokio::test]
async fn configure_then_query_slots() {
    let state = state();
    let professional_id = Uuid::new_v4();

    let request: UpsertWeeklyScheduleRequest = serde_json::from_value(json!({
        "day_of_week": 1,
        "start_time": "09:00",
        "end_time": "10:00"
    }))
    .unwrap();

    let Json(stored) = handlers::upsert_weekly_schedule(
        State(state.clone()),
        Path(professional_id),
        Json(request),
    )
    .await
    .unwrap();
    assert_eq!(stored["success"], true);
    assert_eq!(stored["entry"]["start_time"], "09:00");

    let Json(body) = handlers::get_available_slots(
        State(state),
        Path(professional_id),
        Query(AvailabilityQueryRequest {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            duration_minutes: 30,
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["available_count"], 2);
    assert_eq!(body["availability"]["slots"][0]["time"], "09:00");
    assert_eq!(body["availability"]["slots"][1]["time"], "09:30");
}

#[tokio::test]
async fn unscheduled_day_reports_reason() {
    let Json(body) = handlers::get_available_slots(
        State(state()),
        Path(Uuid::new_v4()),
        Query(AvailabilityQueryRequest {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            duration_minutes: 30,
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["available_count"], 0);
    assert_eq!(body["availability"]["blocked_reason"]["kind"], "no_schedule");
}

#[tokio::test]
async fn invalid_override_maps_to_validation_error() {
    let request = serde_json::from_value(json!({
        "date": "2025-06-02",
        "available": false
    }))
    .unwrap();

    let result = handlers::upsert_day_override(State(state()), Path(Uuid::new_v4()), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn deactivating_unknown_break_is_not_found() {
    let result = handlers::deactivate_break(State(state()), Path((Uuid::new_v4(), Uuid::new_v4()))).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}
