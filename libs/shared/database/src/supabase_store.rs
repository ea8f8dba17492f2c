use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::scheduling::{
    Appointment, BreakPeriod, DayOverride, ReminderTask, StatusHistoryEntry, WeeklyScheduleEntry,
};

use crate::store::SchedulingStore;
use crate::supabase::SupabaseClient;

const WEEKLY_SCHEDULES: &str = "/rest/v1/weekly_schedules";
const DAY_OVERRIDES: &str = "/rest/v1/day_overrides";
const BREAK_PERIODS: &str = "/rest/v1/break_periods";
const APPOINTMENTS: &str = "/rest/v1/appointments";
const STATUS_HISTORY: &str = "/rest/v1/appointment_status_history";
const REMINDER_TASKS: &str = "/rest/v1/reminder_tasks";

/// PostgREST-backed store. Tables mirror the entity structs field for field.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn from_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let rows: Vec<Value> = self.supabase.request(Method::GET, path, None).await?;
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|e| anyhow!("Failed to parse rows from {}: {}", path, e))
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        Ok(self.select(path).await?.into_iter().next())
    }

    async fn write<T: Serialize + DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        row: &T,
        merge_duplicates: bool,
    ) -> Result<T> {
        let body = serde_json::to_value(row)?;
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                method,
                path,
                Some(body),
                Some(SupabaseClient::representation_headers(merge_duplicates)),
            )
            .await?;

        let stored = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No row returned from {}", path))?;
        Ok(serde_json::from_value(stored)?)
    }
}

fn timestamp(instant: DateTime<Utc>) -> String {
    // `Z` suffix keeps the value URL-safe (no `+`)
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn weekly_entries(&self, professional_id: Uuid) -> Result<Vec<WeeklyScheduleEntry>> {
        let path = format!(
            "{}?professional_id=eq.{}&order=day_of_week.asc",
            WEEKLY_SCHEDULES, professional_id
        );
        self.select(&path).await
    }

    async fn weekly_entry(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<Option<WeeklyScheduleEntry>> {
        let path = format!(
            "{}?professional_id=eq.{}&day_of_week=eq.{}",
            WEEKLY_SCHEDULES, professional_id, day_of_week
        );
        self.select_one(&path).await
    }

    async fn upsert_weekly_entry(&self, entry: WeeklyScheduleEntry) -> Result<WeeklyScheduleEntry> {
        let path = format!("{}?on_conflict=professional_id,day_of_week", WEEKLY_SCHEDULES);
        self.write(Method::POST, &path, &entry, true).await
    }

    async fn day_override(&self, professional_id: Uuid, date: NaiveDate) -> Result<Option<DayOverride>> {
        let path = format!(
            "{}?professional_id=eq.{}&date=eq.{}",
            DAY_OVERRIDES, professional_id, date
        );
        self.select_one(&path).await
    }

    async fn upsert_day_override(&self, day_override: DayOverride) -> Result<DayOverride> {
        let path = format!("{}?on_conflict=professional_id,date", DAY_OVERRIDES);
        self.write(Method::POST, &path, &day_override, true).await
    }

    async fn breaks(&self, professional_id: Uuid) -> Result<Vec<BreakPeriod>> {
        let path = format!(
            "{}?professional_id=eq.{}&order=start_time.asc",
            BREAK_PERIODS, professional_id
        );
        self.select(&path).await
    }

    async fn upsert_break(&self, break_period: BreakPeriod) -> Result<BreakPeriod> {
        let path = format!("{}?on_conflict=id", BREAK_PERIODS);
        self.write(Method::POST, &path, &break_period, true).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        self.select_one(&path).await
    }

    async fn appointments_for_day(&self, professional_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>> {
        let path = format!(
            "{}?professional_id=eq.{}&date=eq.{}&order=start_time.asc",
            APPOINTMENTS, professional_id, date
        );
        self.select(&path).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        debug!("Inserting appointment {}", appointment.id);
        self.write(Method::POST, APPOINTMENTS, appointment, false).await?;
        Ok(())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment.id);
        self.write(Method::PATCH, &path, appointment, false).await?;
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<()> {
        debug!("Deleting appointment {}", id);
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let removed: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::representation_headers(false)),
            )
            .await?;
        if removed.is_empty() {
            return Err(anyhow!("Appointment {} not found", id));
        }
        Ok(())
    }

    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()> {
        self.write(Method::POST, STATUS_HISTORY, entry, false).await?;
        Ok(())
    }

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let path = format!(
            "{}?appointment_id=eq.{}&order=changed_at.asc",
            STATUS_HISTORY, appointment_id
        );
        self.select(&path).await
    }

    async fn insert_reminder(&self, task: &ReminderTask) -> Result<()> {
        self.write(Method::POST, REMINDER_TASKS, task, false).await?;
        Ok(())
    }

    async fn reminders_for(&self, appointment_id: Uuid) -> Result<Vec<ReminderTask>> {
        let path = format!(
            "{}?appointment_id=eq.{}&order=created_at.asc",
            REMINDER_TASKS, appointment_id
        );
        self.select(&path).await
    }

    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ReminderTask>> {
        let path = format!(
            "{}?sent=eq.false&error=is.null&scheduled_for=lte.{}&order=scheduled_for.asc",
            REMINDER_TASKS,
            timestamp(now)
        );
        self.select(&path).await
    }

    async fn update_reminder(&self, task: &ReminderTask) -> Result<()> {
        let path = format!("{}?id=eq.{}", REMINDER_TASKS, task.id);
        self.write(Method::PATCH, &path, task, false).await?;
        Ok(())
    }
}
