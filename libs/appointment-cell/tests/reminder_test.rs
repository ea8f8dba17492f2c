// libs/appointment-cell/tests/reminder_test.rs
mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{MoveAppointmentRequest, ReminderOutcome, SweepReport, TransitionStatusRequest};
use appointment_cell::services::reminder::SUPERSEDED;
use appointment_cell::services::ReminderScheduler;
use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::scheduling::{AppointmentStatus, ReminderTask};

use common::{monday, t, tuesday, TestHarness};

fn cancel(h: &TestHarness) -> TransitionStatusRequest {
    TransitionStatusRequest {
        status: "cancelled".to_string(),
        reason: Some("client called".to_string()),
        notes: None,
        actor: h.admin.clone(),
    }
}

async fn pending(h: &TestHarness, appointment_id: Uuid) -> Vec<ReminderTask> {
    h.store
        .reminders_for(appointment_id)
        .await
        .unwrap()
        .into_iter()
        .filter(ReminderTask::is_pending)
        .collect()
}

// ==============================================================================
// SCHEDULING
// ==============================================================================

#[tokio::test]
async fn booking_schedules_reminder_one_offset_before_start() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;

    let tasks = pending(&h, appointment.id).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0].scheduled_for,
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn reminder_time_already_passed_is_skipped() {
    let h = TestHarness::new().await;
    // ten hours before a Monday 10:00 appointment
    h.clock.set(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap());

    let appointment = h.book(monday(), "10:00", 30).await;
    assert!(h.store.reminders_for(appointment.id).await.unwrap().is_empty());

    let scheduler = ReminderScheduler::new(h.store.clone(), h.clock.clone(), &h.config);
    assert_eq!(scheduler.schedule(&appointment).await.unwrap(), ReminderOutcome::Skipped);
}

#[tokio::test]
async fn business_offset_shifts_fire_time() {
    let h = TestHarness::with_config(SchedulingConfig {
        reminder_offset_hours: 2,
        business_utc_offset_minutes: -180,
        ..SchedulingConfig::default()
    })
    .await;

    let appointment = h.book(monday(), "10:00", 30).await;
    let tasks = pending(&h, appointment.id).await;

    // 10:00 at UTC-3 is 13:00Z, minus two hours
    assert_eq!(
        tasks[0].scheduled_for,
        Utc.with_ymd_and_hms(2025, 6, 2, 11, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn cancellation_supersedes_reminder_without_replacement() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;
    assert_eq!(pending(&h, appointment.id).await.len(), 1);

    h.service.transition(appointment.id, cancel(&h)).await.unwrap();

    let tasks = h.store.reminders_for(appointment.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].sent);
    assert_eq!(tasks[0].error.as_deref(), Some(SUPERSEDED));
    assert!(pending(&h, appointment.id).await.is_empty());

    assert_eq!(h.notifier.with_subject("Appointment cancelled").len(), 1);
}

#[tokio::test]
async fn reschedule_replaces_reminder() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;

    h.service
        .move_appointment(
            appointment.id,
            MoveAppointmentRequest {
                new_date: Some(tuesday()),
                new_start_time: Some(t("14:00")),
                new_professional_id: None,
                reason: None,
                actor: h.admin.clone(),
            },
        )
        .await
        .unwrap();

    let tasks = h.store.reminders_for(appointment.id).await.unwrap();
    assert_eq!(tasks.len(), 2);

    let live = pending(&h, appointment.id).await;
    assert_eq!(live.len(), 1);
    assert_eq!(
        live[0].scheduled_for,
        Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn reconcile_marks_every_pending_task() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;
    let scheduler = ReminderScheduler::new(h.store.clone(), h.clock.clone(), &h.config);

    // a stray duplicate
    scheduler.schedule(&appointment).await.unwrap();
    assert_eq!(pending(&h, appointment.id).await.len(), 2);

    let outcome = scheduler.reconcile(appointment.id).await.unwrap();
    assert_matches!(outcome, ReminderOutcome::Scheduled { .. });
    assert_eq!(pending(&h, appointment.id).await.len(), 1);
    assert_eq!(h.store.reminders_for(appointment.id).await.unwrap().len(), 3);
}

// ==============================================================================
// SWEEP
// ==============================================================================

#[tokio::test]
async fn sweep_dispatches_due_reminders_once() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;
    let sweeper = h.sweeper();

    // not yet due
    assert_eq!(sweeper.run_once().await.unwrap(), SweepReport::default());

    h.clock.advance(Duration::hours(3));
    let report = sweeper.run_once().await.unwrap();
    assert_eq!(report.dispatched, 1);

    let reminders = h.notifier.with_subject("Appointment reminder");
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].recipient, "ana@example.com");
    assert!(reminders[0].body.contains("2025-06-02"));

    let tasks = h.store.reminders_for(appointment.id).await.unwrap();
    assert!(tasks[0].sent);
    assert!(tasks[0].error.is_none());

    assert_eq!(sweeper.run_once().await.unwrap(), SweepReport::default());
    assert_eq!(h.notifier.with_subject("Appointment reminder").len(), 1);
}

#[tokio::test]
async fn failed_dispatch_is_recorded_and_not_retried() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;
    let sweeper = h.sweeper();

    h.notifier.set_failing(true);
    h.clock.advance(Duration::hours(3));

    let report = sweeper.run_once().await.unwrap();
    assert_eq!(report.failed, 1);

    let tasks = h.store.reminders_for(appointment.id).await.unwrap();
    assert!(!tasks[0].sent);
    assert_eq!(tasks[0].error.as_deref(), Some("smtp relay unavailable"));

    h.notifier.set_failing(false);
    assert_eq!(sweeper.run_once().await.unwrap(), SweepReport::default());
    assert!(h.notifier.with_subject("Appointment reminder").is_empty());
}

#[tokio::test]
async fn sweep_discards_reminders_of_cancelled_appointments() {
    let h = TestHarness::new().await;
    let appointment = h.book(monday(), "10:00", 30).await;

    // cancelled behind the booking service's back, so the task is still pending
    let mut cancelled = appointment.clone();
    cancelled.status = AppointmentStatus::Cancelled;
    h.store.update_appointment(&cancelled).await.unwrap();

    h.clock.advance(Duration::hours(3));
    let report = h.sweeper().run_once().await.unwrap();
    assert_eq!(report.discarded, 1);
    assert_eq!(report.dispatched, 0);
    assert!(h.notifier.with_subject("Appointment reminder").is_empty());

    let tasks = h.store.reminders_for(appointment.id).await.unwrap();
    assert!(tasks[0].sent);
    assert!(tasks[0].error.is_some());
}

#[tokio::test]
async fn sweeper_runs_until_shutdown() {
    let h = TestHarness::with_config(SchedulingConfig {
        reminder_sweep_interval_seconds: 1,
        ..SchedulingConfig::default()
    })
    .await;
    h.book(monday(), "10:00", 30).await;
    h.clock.advance(Duration::hours(3));

    let sweeper = Arc::new(h.sweeper());
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let handle = {
        let sweeper = sweeper.clone();
        tokio::spawn(async move {
            sweeper
                .run(async {
                    let _ = stopped.await;
                })
                .await
        })
    };

    // first tick fires immediately
    for _ in 0..50 {
        if !h.notifier.with_subject("Appointment reminder").is_empty() {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    assert_eq!(h.notifier.with_subject("Appointment reminder").len(), 1);

    stop.send(()).unwrap();
    tokio::time::timeout(StdDuration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}
