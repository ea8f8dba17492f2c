// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use availability_cell::models::{AvailabilityError, BlockReason};
use shared_models::error::AppError;
use shared_models::scheduling::{Actor, ActorRole, ReminderTask};
use shared_utils::time::{TimeError, TimeOfDay};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub professional_id: Uuid,
    pub client_identity: String,
    pub client_email: Option<String>,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    /// Optional; derived from the duration when omitted.
    pub end_time: Option<TimeOfDay>,
    pub service_duration_minutes: u16,
    pub notes: Option<String>,
    pub actor: Actor,
}

/// Status arrives as a raw string so unknown values surface as
/// `InvalidStatus` rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStatusRequest {
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub actor: Actor,
}

/// Every field is optional; missing ones keep the appointment's current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAppointmentRequest {
    pub new_date: Option<NaiveDate>,
    pub new_start_time: Option<TimeOfDay>,
    pub new_professional_id: Option<Uuid>,
    pub reason: Option<String>,
    pub actor: Actor,
}

// ==============================================================================
// AUDIT VIEW
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: String,
    pub new: String,
}

/// One audit entry reduced to the fields that actually changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryDiff {
    pub changed_at: DateTime<Utc>,
    pub changed_by: Uuid,
    pub changed_by_role: ActorRole,
    pub created: bool,
    pub changes: Vec<FieldChange>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl HistoryDiff {
    pub fn change(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }
}

impl fmt::Display for HistoryDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.changed_at.format("%Y-%m-%d %H:%M:%S"),
            self.changed_by,
            self.changed_by_role
        )?;

        if self.created {
            write!(f, " created")?;
        }

        for change in &self.changes {
            write!(f, " {}: {} -> {};", change.field, change.old, change.new)?;
        }

        if let Some(reason) = &self.reason {
            write!(f, " reason: {}", reason)?;
        }
        if let Some(notes) = &self.notes {
            write!(f, " notes: {}", notes)?;
        }
        Ok(())
    }
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReminderOutcome {
    Scheduled { task: ReminderTask },
    /// Fire time already passed or the appointment no longer holds its slot.
    Skipped,
}

/// Counters from one reminder sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub dispatched: usize,
    pub failed: usize,
    pub discarded: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot not available: {0}")]
    Conflict(BlockReason),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown appointment status: {0}")]
    InvalidStatus(String),

    #[error("Appointment cannot change from status {0}")]
    InvalidStatusTransition(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AvailabilityError> for AppointmentError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            AvailabilityError::NotFound(_) => AppointmentError::NotFound,
            AvailabilityError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<TimeError> for AppointmentError {
    fn from(e: TimeError) -> Self {
        AppointmentError::ValidationError(e.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidStatus(status) => {
                AppError::ValidationError(format!("Unknown appointment status: {}", status))
            }
            e @ AppointmentError::Conflict(_) => AppError::Conflict(e.to_string()),
            AppointmentError::PermissionDenied(msg) => AppError::Forbidden(msg),
            e @ AppointmentError::InvalidStatusTransition(_) => AppError::InvalidTransition(e.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
