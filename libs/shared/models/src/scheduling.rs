// libs/shared/models/src/scheduling.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::time::TimeOfDay;

/// 0 = Sunday, 1 = Monday, ... 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

// ==============================================================================
// SCHEDULE CONFIGURATION
// ==============================================================================

/// Standing working window for one weekday. Unique per (professional, day).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyScheduleEntry {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub day_of_week: u8,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub active: bool,
}

/// Single-date exception to the weekly template. Unique per (professional, date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayOverride {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub available: bool,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub reason: Option<String>,
}

impl DayOverride {
    /// Replacement hours, when the override supplies both bounds.
    pub fn hours(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        match (self.available, self.start_time, self.end_time) {
            (true, Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakPeriod {
    pub id: Uuid,
    pub professional_id: Uuid,
    /// `None` applies on every working day.
    pub day_of_week: Option<u8>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub label: String,
    pub active: bool,
}

impl BreakPeriod {
    pub fn applies_on(&self, day_of_week: u8) -> bool {
        self.active && self.day_of_week.map_or(true, |d| d == day_of_week)
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    ClientArrived,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::ClientArrived,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    /// No further status, time or professional change is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Whether an appointment in this status still occupies its time slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::ClientArrived => "client_arrived",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown appointment status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    /// Accepts `client_arrived` as well as `CLIENT_ARRIVED`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: AppointmentStatus,
    pub client_identity: String,
    pub client_email: Option<String>,
    pub service_duration_minutes: u16,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn holds_slot(&self) -> bool {
        self.status.holds_slot()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ==============================================================================
// ACTORS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Staff,
    /// The professional the appointment is assigned to. Restricted role.
    Professional,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Admin => write!(f, "admin"),
            ActorRole::Staff => write!(f, "staff"),
            ActorRole::Professional => write!(f, "professional"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn is_restricted(&self) -> bool {
        self.role == ActorRole::Professional
    }
}

// ==============================================================================
// AUDIT + REMINDERS
// ==============================================================================

/// Append-only record of one appointment mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub changed_by: Uuid,
    pub changed_by_role: ActorRole,
    pub old_status: Option<AppointmentStatus>,
    pub new_status: AppointmentStatus,
    pub old_date: Option<NaiveDate>,
    pub new_date: Option<NaiveDate>,
    pub old_start_time: Option<TimeOfDay>,
    pub new_start_time: Option<TimeOfDay>,
    pub old_end_time: Option<TimeOfDay>,
    pub new_end_time: Option<TimeOfDay>,
    pub old_professional_id: Option<Uuid>,
    pub new_professional_id: Option<Uuid>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderTask {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReminderTask {
    /// Unsent and never attempted.
    pub fn is_pending(&self) -> bool {
        !self.sent && self.error.is_none()
    }
}
