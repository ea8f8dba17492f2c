// libs/availability-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::scheduling::{day_of_week, Appointment, BreakPeriod};
use shared_utils::time::{add_minutes, overlaps, TimeOfDay};

use crate::models::{
    AvailabilityError, AvailableSlot, BlockReason, DayAvailability, SlotCheck, WorkingWindow,
};
use crate::services::slots::generate_candidate_slots;

/// Effective state of a professional's day after applying overrides.
#[derive(Debug, Clone, PartialEq)]
enum DayWindow {
    Blocked(String),
    NoSchedule,
    Open(WorkingWindow),
}

/// Everything needed to judge intervals on one day, read once.
struct DayContext {
    window: DayWindow,
    breaks: Vec<BreakPeriod>,
    appointments: Vec<Appointment>,
}

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
    granularity_minutes: u16,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulingConfig) -> Self {
        Self {
            store,
            granularity_minutes: config.slot_granularity_minutes,
        }
    }

    pub fn granularity_minutes(&self) -> u16 {
        self.granularity_minutes
    }

    /// Bookable/blocked start times for a service of the given length.
    #[instrument(skip(self))]
    pub async fn list_available_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        service_duration_minutes: u16,
    ) -> Result<DayAvailability, AvailabilityError> {
        if service_duration_minutes == 0 {
            return Err(AvailabilityError::ValidationError(
                "Service duration must be positive".to_string(),
            ));
        }

        let context = self.load_day(professional_id, date).await?;

        let window = match &context.window {
            DayWindow::Blocked(reason) => {
                debug!("Professional {} blocked on {}: {}", professional_id, date, reason);
                return Ok(DayAvailability {
                    professional_id,
                    date,
                    window: None,
                    blocked_reason: Some(BlockReason::DayBlocked { reason: reason.clone() }),
                    slots: vec![],
                });
            }
            DayWindow::NoSchedule => {
                debug!("No schedule configured for {} on {}", professional_id, date);
                return Ok(DayAvailability {
                    professional_id,
                    date,
                    window: None,
                    blocked_reason: Some(BlockReason::NoSchedule),
                    slots: vec![],
                });
            }
            DayWindow::Open(window) => window.clone(),
        };

        let slots: Vec<AvailableSlot> =
            generate_candidate_slots(window.start_time, window.end_time, self.granularity_minutes)
                .map(|slot_start| {
                    let reason = match add_minutes(slot_start, service_duration_minutes as i32) {
                        Ok(slot_end) => evaluate_interval(slot_start, slot_end, &window, &context, None),
                        Err(_) => Some(BlockReason::ExceedsWorkingHours),
                    };
                    AvailableSlot {
                        time: slot_start,
                        available: reason.is_none(),
                        reason,
                    }
                })
                .collect();

        debug!(
            "{} of {} slots available for {} on {}",
            slots.iter().filter(|s| s.available).count(),
            slots.len(),
            professional_id,
            date
        );

        Ok(DayAvailability {
            professional_id,
            date,
            window: Some(window),
            blocked_reason: None,
            slots,
        })
    }

    /// Decision for one explicit interval. `exclude_appointment_id` lets a
    /// reschedule ignore the appointment being moved.
    #[instrument(skip(self))]
    pub async fn check_slot_available(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<SlotCheck, AvailabilityError> {
        if start_time >= end_time {
            return Err(AvailabilityError::ValidationError(format!(
                "Start time {} must be before end time {}",
                start_time, end_time
            )));
        }

        let context = self.load_day(professional_id, date).await?;

        let check = match &context.window {
            DayWindow::Blocked(reason) => SlotCheck::blocked(BlockReason::DayBlocked { reason: reason.clone() }),
            DayWindow::NoSchedule => SlotCheck::blocked(BlockReason::NoSchedule),
            DayWindow::Open(window) => {
                match evaluate_interval(start_time, end_time, window, &context, exclude_appointment_id) {
                    Some(reason) => SlotCheck::blocked(reason),
                    None => SlotCheck::available(),
                }
            }
        };

        if let Some(reason) = &check.reason {
            debug!(
                "Interval {}-{} on {} unavailable for {}: {}",
                start_time, end_time, date, professional_id, reason
            );
        }

        Ok(check)
    }

    async fn load_day(&self, professional_id: Uuid, date: NaiveDate) -> Result<DayContext, AvailabilityError> {
        let window = self.resolve_window(professional_id, date).await?;

        if !matches!(window, DayWindow::Open(_)) {
            return Ok(DayContext {
                window,
                breaks: vec![],
                appointments: vec![],
            });
        }

        let weekday = day_of_week(date);
        let breaks = self
            .store
            .breaks(professional_id)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?
            .into_iter()
            .filter(|b| b.applies_on(weekday))
            .collect();

        let appointments = self
            .store
            .appointments_for_day(professional_id, date)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?
            .into_iter()
            .filter(Appointment::holds_slot)
            .collect();

        Ok(DayContext {
            window,
            breaks,
            appointments,
        })
    }

    async fn resolve_window(&self, professional_id: Uuid, date: NaiveDate) -> Result<DayWindow, AvailabilityError> {
        let day_override = self
            .store
            .day_override(professional_id, date)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        if let Some(day_override) = &day_override {
            if !day_override.available {
                let reason = day_override
                    .reason
                    .clone()
                    .unwrap_or_else(|| "unavailable".to_string());
                return Ok(DayWindow::Blocked(reason));
            }
            if let Some((start_time, end_time)) = day_override.hours() {
                return Ok(DayWindow::Open(WorkingWindow { start_time, end_time }));
            }
            // available without hours: fall through to the weekly template
        }

        let entry = self
            .store
            .weekly_entry(professional_id, day_of_week(date))
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        Ok(match entry {
            Some(entry) if entry.active => DayWindow::Open(WorkingWindow {
                start_time: entry.start_time,
                end_time: entry.end_time,
            }),
            _ => DayWindow::NoSchedule,
        })
    }
}

/// Rules shared by slot listing and single-interval checks, in priority order:
/// working window, breaks, then committed appointments.
fn evaluate_interval(
    start: TimeOfDay,
    end: TimeOfDay,
    window: &WorkingWindow,
    context: &DayContext,
    exclude_appointment_id: Option<Uuid>,
) -> Option<BlockReason> {
    if start < window.start_time {
        return Some(BlockReason::OutsideWorkingHours);
    }
    if end > window.end_time {
        return Some(BlockReason::ExceedsWorkingHours);
    }

    if let Some(b) = context
        .breaks
        .iter()
        .find(|b| overlaps(start, end, b.start_time, b.end_time))
    {
        return Some(BlockReason::Break { label: b.label.clone() });
    }

    context
        .appointments
        .iter()
        .filter(|a| Some(a.id) != exclude_appointment_id)
        .find(|a| overlaps(start, end, a.start_time, a.end_time))
        .map(|a| BlockReason::ExistingAppointment { appointment_id: a.id })
}
