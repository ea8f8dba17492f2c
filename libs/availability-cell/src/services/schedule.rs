// libs/availability-cell/src/services/schedule.rs
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::scheduling::{BreakPeriod, DayOverride, WeeklyScheduleEntry};
use shared_utils::time::TimeOfDay;

use crate::models::{
    AvailabilityError, CreateBreakRequest, UpsertDayOverrideRequest, UpsertWeeklyScheduleRequest,
};

/// Administrative maintenance of weekly templates, overrides and breaks.
/// Rows are soft-deactivated, never deleted.
pub struct ScheduleService {
    store: Arc<dyn SchedulingStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Create or replace the working window for one weekday.
    pub async fn upsert_weekly_entry(
        &self,
        professional_id: Uuid,
        request: UpsertWeeklyScheduleRequest,
    ) -> Result<WeeklyScheduleEntry, AvailabilityError> {
        debug!("Upserting weekly schedule for {} on day {}", professional_id, request.day_of_week);

        validate_day_of_week(request.day_of_week)?;
        validate_range(request.start_time, request.end_time)?;

        let existing = self
            .store
            .weekly_entry(professional_id, request.day_of_week)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let entry = WeeklyScheduleEntry {
            id: existing.map(|e| e.id).unwrap_or_else(Uuid::new_v4),
            professional_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            active: request.active.unwrap_or(true),
        };

        let stored = self
            .store
            .upsert_weekly_entry(entry)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        info!(
            "Weekly schedule for {} on day {} set to {}-{}",
            professional_id, stored.day_of_week, stored.start_time, stored.end_time
        );
        Ok(stored)
    }

    pub async fn deactivate_weekly_entry(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<WeeklyScheduleEntry, AvailabilityError> {
        validate_day_of_week(day_of_week)?;

        let mut entry = self
            .store
            .weekly_entry(professional_id, day_of_week)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?
            .ok_or_else(|| {
                AvailabilityError::NotFound(format!("No weekly schedule for day {}", day_of_week))
            })?;

        entry.active = false;
        self.store
            .upsert_weekly_entry(entry)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))
    }

    pub async fn weekly_schedule(&self, professional_id: Uuid) -> Result<Vec<WeeklyScheduleEntry>, AvailabilityError> {
        self.store
            .weekly_entries(professional_id)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))
    }

    /// Block a date or give it one-off hours. At most one override per date.
    pub async fn upsert_day_override(
        &self,
        professional_id: Uuid,
        request: UpsertDayOverrideRequest,
    ) -> Result<DayOverride, AvailabilityError> {
        debug!("Upserting override for {} on {}", professional_id, request.date);

        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        if !request.available && reason.is_none() {
            return Err(AvailabilityError::ValidationError(
                "A reason is required when blocking a day".to_string(),
            ));
        }

        match (request.start_time, request.end_time) {
            (Some(start), Some(end)) => validate_range(start, end)?,
            (None, None) => {}
            _ => {
                return Err(AvailabilityError::ValidationError(
                    "Override hours need both a start and an end time".to_string(),
                ))
            }
        }

        let existing = self
            .store
            .day_override(professional_id, request.date)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let day_override = DayOverride {
            id: existing.map(|o| o.id).unwrap_or_else(Uuid::new_v4),
            professional_id,
            date: request.date,
            available: request.available,
            start_time: request.start_time,
            end_time: request.end_time,
            reason,
        };

        let stored = self
            .store
            .upsert_day_override(day_override)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        info!(
            "Override for {} on {} stored (available: {})",
            professional_id, stored.date, stored.available
        );
        Ok(stored)
    }

    pub async fn add_break(
        &self,
        professional_id: Uuid,
        request: CreateBreakRequest,
    ) -> Result<BreakPeriod, AvailabilityError> {
        if let Some(day) = request.day_of_week {
            validate_day_of_week(day)?;
        }
        validate_range(request.start_time, request.end_time)?;

        let label = request.label.trim();
        if label.is_empty() {
            return Err(AvailabilityError::ValidationError("Break label is required".to_string()));
        }

        let break_period = BreakPeriod {
            id: Uuid::new_v4(),
            professional_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            label: label.to_string(),
            active: true,
        };

        self.store
            .upsert_break(break_period)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))
    }

    pub async fn deactivate_break(
        &self,
        professional_id: Uuid,
        break_id: Uuid,
    ) -> Result<BreakPeriod, AvailabilityError> {
        let mut break_period = self
            .breaks(professional_id)
            .await?
            .into_iter()
            .find(|b| b.id == break_id)
            .ok_or_else(|| AvailabilityError::NotFound(format!("Break {} not found", break_id)))?;

        break_period.active = false;
        self.store
            .upsert_break(break_period)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))
    }

    pub async fn breaks(&self, professional_id: Uuid) -> Result<Vec<BreakPeriod>, AvailabilityError> {
        self.store
            .breaks(professional_id)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))
    }
}

fn validate_day_of_week(day_of_week: u8) -> Result<(), AvailabilityError> {
    if day_of_week > 6 {
        return Err(AvailabilityError::ValidationError(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    Ok(())
}

fn validate_range(start: TimeOfDay, end: TimeOfDay) -> Result<(), AvailabilityError> {
    if start >= end {
        return Err(AvailabilityError::ValidationError(
            "Start time must be before end time".to_string(),
        ));
    }
    Ok(())
}
