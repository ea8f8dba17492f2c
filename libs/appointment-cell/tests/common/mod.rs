// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::CreateAppointmentRequest;
use appointment_cell::services::{AppointmentBookingService, NotificationDispatcher, ReminderSweeper};
use shared_config::SchedulingConfig;
use shared_database::{InMemoryStore, SchedulingStore};
use shared_models::scheduling::{
    Actor, ActorRole, Appointment, BreakPeriod, DayOverride, ReminderTask, StatusHistoryEntry,
    WeeklyScheduleEntry,
};
use shared_utils::clock::FixedClock;
use shared_utils::time::TimeOfDay;

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Captures outgoing notifications; can be switched to fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn with_subject(&self, subject: &str) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.subject == subject).collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("smtp relay unavailable"));
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// In-memory store with switchable faults on the history and reminder tables.
#[derive(Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    history_failures: AtomicUsize,
    reminder_delay: Mutex<Option<StdDuration>>,
}

impl FaultyStore {
    /// The next `count` history appends fail.
    pub fn fail_history(&self, count: usize) {
        self.history_failures.store(count, Ordering::SeqCst);
    }

    /// The next reminder insert sleeps for `delay` first.
    pub fn delay_next_reminder(&self, delay: StdDuration) {
        *self.reminder_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl SchedulingStore for FaultyStore {
    async fn weekly_entries(&self, professional_id: Uuid) -> Result<Vec<WeeklyScheduleEntry>> {
        self.inner.weekly_entries(professional_id).await
    }

    async fn weekly_entry(&self, professional_id: Uuid, day_of_week: u8) -> Result<Option<WeeklyScheduleEntry>> {
        self.inner.weekly_entry(professional_id, day_of_week).await
    }

    async fn upsert_weekly_entry(&self, entry: WeeklyScheduleEntry) -> Result<WeeklyScheduleEntry> {
        self.inner.upsert_weekly_entry(entry).await
    }

    async fn day_override(&self, professional_id: Uuid, date: NaiveDate) -> Result<Option<DayOverride>> {
        self.inner.day_override(professional_id, date).await
    }

    async fn upsert_day_override(&self, day_override: DayOverride) -> Result<DayOverride> {
        self.inner.upsert_day_override(day_override).await
    }

    async fn breaks(&self, professional_id: Uuid) -> Result<Vec<BreakPeriod>> {
        self.inner.breaks(professional_id).await
    }

    async fn upsert_break(&self, break_period: BreakPeriod) -> Result<BreakPeriod> {
        self.inner.upsert_break(break_period).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        self.inner.get_appointment(id).await
    }

    async fn appointments_for_day(&self, professional_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>> {
        self.inner.appointments_for_day(professional_id, date).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        self.inner.insert_appointment(appointment).await
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        self.inner.update_appointment(appointment).await
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<()> {
        self.inner.delete_appointment(id).await
    }

    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()> {
        let failing = self
            .history_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("history table unavailable"));
        }
        self.inner.append_history(entry).await
    }

    async fn history(&self, appointment_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        self.inner.history(appointment_id).await
    }

    async fn insert_reminder(&self, task: &ReminderTask) -> Result<()> {
        let delay = self.reminder_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.insert_reminder(task).await
    }

    async fn reminders_for(&self, appointment_id: Uuid) -> Result<Vec<ReminderTask>> {
        self.inner.reminders_for(appointment_id).await
    }

    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ReminderTask>> {
        self.inner.due_reminders(now).await
    }

    async fn update_reminder(&self, task: &ReminderTask) -> Result<()> {
        self.inner.update_reminder(task).await
    }
}

pub fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

/// 2025-06-02, a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
}

/// Sunday morning before the test week.
pub fn sunday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

pub struct TestHarness {
    pub store: Arc<FaultyStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingDispatcher>,
    pub service: Arc<AppointmentBookingService>,
    pub config: SchedulingConfig,
    pub professional_id: Uuid,
    pub admin: Actor,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(SchedulingConfig::default()).await
    }

    /// One professional working Monday to Friday 09:00-17:00.
    pub async fn with_config(config: SchedulingConfig) -> Self {
        let store = Arc::new(FaultyStore::default());
        let clock = Arc::new(FixedClock::new(sunday_morning()));
        let notifier = Arc::new(RecordingDispatcher::default());
        let service = Arc::new(AppointmentBookingService::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            &config,
        ));

        let harness = Self {
            store,
            clock,
            notifier,
            service,
            config,
            professional_id: Uuid::new_v4(),
            admin: Actor::new(Uuid::new_v4(), ActorRole::Admin),
        };
        harness.working_week(harness.professional_id).await;
        harness
    }

    pub async fn working_week(&self, professional_id: Uuid) {
        for day_of_week in 1..=5 {
            self.store
                .upsert_weekly_entry(WeeklyScheduleEntry {
                    id: Uuid::new_v4(),
                    professional_id,
                    day_of_week,
                    start_time: t("09:00"),
                    end_time: t("17:00"),
                    active: true,
                })
                .await
                .unwrap();
        }
    }

    pub async fn lunch_break(&self) {
        self.store
            .upsert_break(BreakPeriod {
                id: Uuid::new_v4(),
                professional_id: self.professional_id,
                day_of_week: None,
                start_time: t("12:00"),
                end_time: t("13:00"),
                label: "Lunch".to_string(),
                active: true,
            })
            .await
            .unwrap();
    }

    pub fn professional(&self) -> Actor {
        Actor::new(self.professional_id, ActorRole::Professional)
    }

    pub fn request(&self, date: NaiveDate, start: &str, duration_minutes: u16) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            professional_id: self.professional_id,
            client_identity: "Ana Souza".to_string(),
            client_email: Some("ana@example.com".to_string()),
            date,
            start_time: t(start),
            end_time: None,
            service_duration_minutes: duration_minutes,
            notes: None,
            actor: self.admin.clone(),
        }
    }

    pub async fn book(&self, date: NaiveDate, start: &str, duration_minutes: u16) -> Appointment {
        self.service
            .create(self.request(date, start, duration_minutes))
            .await
            .unwrap()
    }

    pub fn sweeper(&self) -> ReminderSweeper {
        ReminderSweeper::new(
            self.store.clone(),
            self.notifier.clone(),
            self.clock.clone(),
            &self.config,
        )
    }
}
