use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, BreakPeriod, DayOverride, ReminderTask, StatusHistoryEntry, WeeklyScheduleEntry,
};

/// Persistence collaborator for the scheduling core.
///
/// Implementations only store and filter rows. Conflict safety is provided by
/// the booking layer, which serializes check-then-write per professional/day.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    // Weekly template
    async fn weekly_entries(&self, professional_id: Uuid) -> Result<Vec<WeeklyScheduleEntry>>;
    async fn weekly_entry(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<Option<WeeklyScheduleEntry>>;
    /// Insert or replace by (professional_id, day_of_week).
    async fn upsert_weekly_entry(&self, entry: WeeklyScheduleEntry) -> Result<WeeklyScheduleEntry>;

    // Overrides
    async fn day_override(&self, professional_id: Uuid, date: NaiveDate) -> Result<Option<DayOverride>>;
    /// Insert or replace by (professional_id, date).
    async fn upsert_day_override(&self, day_override: DayOverride) -> Result<DayOverride>;

    // Breaks
    async fn breaks(&self, professional_id: Uuid) -> Result<Vec<BreakPeriod>>;
    /// Insert or replace by id.
    async fn upsert_break(&self, break_period: BreakPeriod) -> Result<BreakPeriod>;

    // Appointments
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;
    /// Every appointment of the day regardless of status, ordered by start time.
    async fn appointments_for_day(&self, professional_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>>;
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()>;
    async fn update_appointment(&self, appointment: &Appointment) -> Result<()>;
    /// Only used to undo an insert whose history entry could not be written.
    async fn delete_appointment(&self, id: Uuid) -> Result<()>;

    // History
    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()>;
    /// Ordered by `changed_at`, oldest first.
    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusHistoryEntry>>;

    // Reminders
    async fn insert_reminder(&self, task: &ReminderTask) -> Result<()>;
    async fn reminders_for(&self, appointment_id: Uuid) -> Result<Vec<ReminderTask>>;
    /// Unsent, never-attempted tasks with `scheduled_for <= now`.
    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ReminderTask>>;
    async fn update_reminder(&self, task: &ReminderTask) -> Result<()>;
}
