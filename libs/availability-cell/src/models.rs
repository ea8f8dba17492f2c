// libs/availability-cell/src/models.rs
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::time::{TimeError, TimeOfDay};

// ==============================================================================
// AVAILABILITY RESULTS
// ==============================================================================

/// Why a slot or interval cannot be booked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    DayBlocked { reason: String },
    NoSchedule,
    OutsideWorkingHours,
    ExceedsWorkingHours,
    Break { label: String },
    ExistingAppointment { appointment_id: Uuid },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::DayBlocked { reason } => write!(f, "day blocked: {}", reason),
            BlockReason::NoSchedule => write!(f, "no schedule configured"),
            BlockReason::OutsideWorkingHours => write!(f, "outside working hours"),
            BlockReason::ExceedsWorkingHours => write!(f, "exceeds working hours"),
            BlockReason::Break { label } => write!(f, "overlaps break: {}", label),
            BlockReason::ExistingAppointment { .. } => write!(f, "already booked"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlot {
    pub time: TimeOfDay,
    pub available: bool,
    pub reason: Option<BlockReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingWindow {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

/// Slot listing for one professional and date. When the whole day is
/// unavailable `slots` is empty and `blocked_reason` says why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayAvailability {
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub window: Option<WorkingWindow>,
    pub blocked_reason: Option<BlockReason>,
    pub slots: Vec<AvailableSlot>,
}

impl DayAvailability {
    pub fn available_times(&self) -> Vec<TimeOfDay> {
        self.slots.iter().filter(|s| s.available).map(|s| s.time).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotCheck {
    pub available: bool,
    pub reason: Option<BlockReason>,
}

impl SlotCheck {
    pub fn available() -> Self {
        Self { available: true, reason: None }
    }

    pub fn blocked(reason: BlockReason) -> Self {
        Self { available: false, reason: Some(reason) }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQueryRequest {
    pub date: NaiveDate,
    pub duration_minutes: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertWeeklyScheduleRequest {
    pub day_of_week: u8,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertDayOverrideRequest {
    pub date: NaiveDate,
    pub available: bool,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBreakRequest {
    pub day_of_week: Option<u8>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub label: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<TimeError> for AvailabilityError {
    fn from(e: TimeError) -> Self {
        AvailabilityError::ValidationError(e.to_string())
    }
}

impl From<AvailabilityError> for AppError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::ValidationError(msg) => AppError::ValidationError(msg),
            AvailabilityError::NotFound(msg) => AppError::NotFound(msg),
            AvailabilityError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
