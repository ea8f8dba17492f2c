// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityQueryRequest, CreateBreakRequest, UpsertDayOverrideRequest,
    UpsertWeeklyScheduleRequest,
};
use crate::services::{AvailabilityService, ScheduleService};

pub struct AvailabilityState {
    pub availability: AvailabilityService,
    pub schedule: ScheduleService,
}

impl AvailabilityState {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulingConfig) -> Self {
        Self {
            availability: AvailabilityService::new(Arc::clone(&store), config),
            schedule: ScheduleService::new(store),
        }
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AvailabilityState>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<AvailabilityQueryRequest>,
) -> Result<Json<Value>, AppError> {
    let day = state
        .availability
        .list_available_slots(professional_id, query.date, query.duration_minutes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "availability": day,
        "available_count": day.slots.iter().filter(|s| s.available).count(),
    })))
}

// ==============================================================================
// WEEKLY SCHEDULE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_weekly_schedule(
    State(state): State<Arc<AvailabilityState>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entries = state.schedule.weekly_schedule(professional_id).await?;
    Ok(Json(json!({ "success": true, "schedule": entries })))
}

#[axum::debug_handler]
pub async fn upsert_weekly_schedule(
    State(state): State<Arc<AvailabilityState>>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<UpsertWeeklyScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let entry = state.schedule.upsert_weekly_entry(professional_id, request).await?;
    Ok(Json(json!({ "success": true, "entry": entry })))
}

#[axum::debug_handler]
pub async fn deactivate_weekly_schedule(
    State(state): State<Arc<AvailabilityState>>,
    Path((professional_id, day_of_week)): Path<(Uuid, u8)>,
) -> Result<Json<Value>, AppError> {
    let entry = state
        .schedule
        .deactivate_weekly_entry(professional_id, day_of_week)
        .await?;
    Ok(Json(json!({ "success": true, "entry": entry })))
}

// ==============================================================================
// OVERRIDES + BREAKS
// ==============================================================================

#[axum::debug_handler]
pub async fn upsert_day_override(
    State(state): State<Arc<AvailabilityState>>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<UpsertDayOverrideRequest>,
) -> Result<Json<Value>, AppError> {
    let day_override = state.schedule.upsert_day_override(professional_id, request).await?;
    Ok(Json(json!({ "success": true, "override": day_override })))
}

#[axum::debug_handler]
pub async fn list_breaks(
    State(state): State<Arc<AvailabilityState>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let breaks = state.schedule.breaks(professional_id).await?;
    Ok(Json(json!({ "success": true, "breaks": breaks })))
}

#[axum::debug_handler]
pub async fn create_break(
    State(state): State<Arc<AvailabilityState>>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<CreateBreakRequest>,
) -> Result<Json<Value>, AppError> {
    let break_period = state.schedule.add_break(professional_id, request).await?;
    Ok(Json(json!({ "success": true, "break": break_period })))
}

#[axum::debug_handler]
pub async fn deactivate_break(
    State(state): State<Arc<AvailabilityState>>,
    Path((professional_id, break_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let break_period = state.schedule.deactivate_break(professional_id, break_id).await?;
    Ok(Json(json!({ "success": true, "break": break_period })))
}
