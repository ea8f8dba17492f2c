use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, BreakPeriod, DayOverride, ReminderTask, StatusHistoryEntry, WeeklyScheduleEntry,
};

use crate::store::SchedulingStore;

#[derive(Default)]
struct Tables {
    weekly: HashMap<(Uuid, u8), WeeklyScheduleEntry>,
    overrides: HashMap<(Uuid, NaiveDate), DayOverride>,
    breaks: HashMap<Uuid, BreakPeriod>,
    appointments: HashMap<Uuid, Appointment>,
    history: Vec<StatusHistoryEntry>,
    reminders: Vec<ReminderTask>,
}

/// Process-local store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn weekly_entries(&self, professional_id: Uuid) -> Result<Vec<WeeklyScheduleEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .weekly
            .values()
            .filter(|e| e.professional_id == professional_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.day_of_week);
        Ok(entries)
    }

    async fn weekly_entry(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<Option<WeeklyScheduleEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.weekly.get(&(professional_id, day_of_week)).cloned())
    }

    async fn upsert_weekly_entry(&self, entry: WeeklyScheduleEntry) -> Result<WeeklyScheduleEntry> {
        let mut tables = self.tables.write().await;
        tables
            .weekly
            .insert((entry.professional_id, entry.day_of_week), entry.clone());
        Ok(entry)
    }

    async fn day_override(&self, professional_id: Uuid, date: NaiveDate) -> Result<Option<DayOverride>> {
        let tables = self.tables.read().await;
        Ok(tables.overrides.get(&(professional_id, date)).cloned())
    }

    async fn upsert_day_override(&self, day_override: DayOverride) -> Result<DayOverride> {
        let mut tables = self.tables.write().await;
        tables
            .overrides
            .insert((day_override.professional_id, day_override.date), day_override.clone());
        Ok(day_override)
    }

    async fn breaks(&self, professional_id: Uuid) -> Result<Vec<BreakPeriod>> {
        let tables = self.tables.read().await;
        let mut breaks: Vec<_> = tables
            .breaks
            .values()
            .filter(|b| b.professional_id == professional_id)
            .cloned()
            .collect();
        breaks.sort_by_key(|b| b.start_time);
        Ok(breaks)
    }

    async fn upsert_break(&self, break_period: BreakPeriod) -> Result<BreakPeriod> {
        let mut tables = self.tables.write().await;
        tables.breaks.insert(break_period.id, break_period.clone());
        Ok(break_period)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.get(&id).cloned())
    }

    async fn appointments_for_day(&self, professional_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<_> = tables
            .appointments
            .values()
            .filter(|a| a.professional_id == professional_id && a.date == date)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.start_time);
        Ok(appointments)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.appointments.contains_key(&appointment.id) {
            return Err(anyhow!("Appointment {} already exists", appointment.id));
        }
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.appointments.get_mut(&appointment.id) {
            Some(existing) => {
                *existing = appointment.clone();
                Ok(())
            }
            None => Err(anyhow!("Appointment {} not found", appointment.id)),
        }
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .appointments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Appointment {} not found", id))
    }

    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.history.push(entry.clone());
        Ok(())
    }

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .history
            .iter()
            .filter(|e| e.appointment_id == appointment_id)
            .cloned()
            .collect();
        // stable: same-instant entries keep insertion order
        entries.sort_by_key(|e| e.changed_at);
        Ok(entries)
    }

    async fn insert_reminder(&self, task: &ReminderTask) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.reminders.push(task.clone());
        Ok(())
    }

    async fn reminders_for(&self, appointment_id: Uuid) -> Result<Vec<ReminderTask>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reminders
            .iter()
            .filter(|r| r.appointment_id == appointment_id)
            .cloned()
            .collect())
    }

    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ReminderTask>> {
        let tables = self.tables.read().await;
        let mut due: Vec<_> = tables
            .reminders
            .iter()
            .filter(|r| r.is_pending() && r.scheduled_for <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.scheduled_for);
        Ok(due)
    }

    async fn update_reminder(&self, task: &ReminderTask) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.reminders.iter_mut().find(|r| r.id == task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(anyhow!("Reminder task {} not found", task.id)),
        }
    }
}
