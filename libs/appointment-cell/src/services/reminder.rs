// libs/appointment-cell/src/services/reminder.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::scheduling::{Appointment, ReminderTask};
use shared_utils::clock::Clock;
use shared_utils::time::TimeOfDay;

use crate::models::{AppointmentError, ReminderOutcome, SweepReport};
use crate::services::notification::{recipient_for, NotificationDispatcher};

pub const SUPERSEDED: &str = "superseded by reschedule";

/// Instant of a wall-clock date and time at the business's UTC offset.
pub fn wall_clock_instant(
    date: NaiveDate,
    time: TimeOfDay,
    utc_offset_minutes: i32,
) -> Result<DateTime<Utc>, AppointmentError> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppointmentError::ValidationError(format!("Invalid date {}", date)))?;
    let naive_utc = midnight + Duration::minutes(time.minutes() as i64 - utc_offset_minutes as i64);
    Ok(Utc.from_utc_datetime(&naive_utc))
}

// ==============================================================================
// SCHEDULER
// ==============================================================================

/// Computes and persists the single pending reminder of an appointment.
pub struct ReminderScheduler {
    store: Arc<dyn SchedulingStore>,
    clock: Arc<dyn Clock>,
    offset: Duration,
    business_utc_offset_minutes: i32,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn SchedulingStore>, clock: Arc<dyn Clock>, config: &SchedulingConfig) -> Self {
        Self {
            store,
            clock,
            offset: Duration::hours(config.reminder_offset_hours),
            business_utc_offset_minutes: config.business_utc_offset_minutes,
        }
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn schedule(&self, appointment: &Appointment) -> Result<ReminderOutcome, AppointmentError> {
        if !appointment.holds_slot() {
            debug!("Appointment is {}, no reminder", appointment.status);
            return Ok(ReminderOutcome::Skipped);
        }

        let start = wall_clock_instant(
            appointment.date,
            appointment.start_time,
            self.business_utc_offset_minutes,
        )?;
        let reminder_time = start - self.offset;
        let now = self.clock.now();

        if reminder_time <= now {
            info!(
                "Reminder time {} already passed for appointment starting {}, skipping",
                reminder_time, start
            );
            return Ok(ReminderOutcome::Skipped);
        }

        let task = ReminderTask {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            scheduled_for: reminder_time,
            sent: false,
            error: None,
            created_at: now,
        };

        self.store
            .insert_reminder(&task)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        debug!("Reminder {} scheduled for {}", task.id, task.scheduled_for);
        Ok(ReminderOutcome::Scheduled { task })
    }

    /// Supersede every pending reminder, then schedule a fresh one unless the
    /// appointment no longer holds its slot.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, appointment_id: Uuid) -> Result<ReminderOutcome, AppointmentError> {
        let pending: Vec<ReminderTask> = self
            .store
            .reminders_for(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .into_iter()
            .filter(ReminderTask::is_pending)
            .collect();

        for mut task in pending {
            task.sent = true;
            task.error = Some(SUPERSEDED.to_string());
            self.store
                .update_reminder(&task)
                .await
                .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
            debug!("Reminder {} superseded", task.id);
        }

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        self.schedule(&appointment).await
    }
}

// ==============================================================================
// SWEEPER
// ==============================================================================

/// Periodically dispatches due reminders. Takes no booking locks.
pub struct ReminderSweeper {
    store: Arc<dyn SchedulingStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    interval: StdDuration,
}

impl ReminderSweeper {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            interval: StdDuration::from_secs(config.reminder_sweep_interval_seconds),
        }
    }

    /// One pass over due tasks. A failed dispatch is recorded on the task and
    /// not retried.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<SweepReport, AppointmentError> {
        let now = self.clock.now();
        let due = self
            .store
            .due_reminders(now)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut report = SweepReport::default();

        for mut task in due {
            let appointment = self
                .store
                .get_appointment(task.appointment_id)
                .await
                .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

            match appointment {
                Some(appointment) if appointment.holds_slot() => {
                    let body = format!(
                        "Reminder: your appointment is on {} at {}",
                        appointment.date, appointment.start_time
                    );
                    match self
                        .dispatcher
                        .send(recipient_for(&appointment), "Appointment reminder", &body)
                        .await
                    {
                        Ok(()) => {
                            task.sent = true;
                            report.dispatched += 1;
                        }
                        Err(e) => {
                            warn!("Reminder {} dispatch failed: {}", task.id, e);
                            task.error = Some(e.to_string());
                            report.failed += 1;
                        }
                    }
                }
                Some(appointment) => {
                    task.sent = true;
                    task.error = Some(format!("appointment {}", appointment.status));
                    report.discarded += 1;
                }
                None => {
                    task.sent = true;
                    task.error = Some("appointment not found".to_string());
                    report.discarded += 1;
                }
            }

            self.store
                .update_reminder(&task)
                .await
                .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        }

        if report != SweepReport::default() {
            info!(
                "Reminder sweep: {} dispatched, {} failed, {} discarded",
                report.dispatched, report.failed, report.discarded
            );
        }
        Ok(report)
    }

    /// Sweep on a fixed interval until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Reminder sweeper started (every {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Reminder sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("Reminder sweep failed: {}", e);
                    }
                }
            }
        }
    }
}
