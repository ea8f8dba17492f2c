// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use availability_cell::services::AvailabilityService;
use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::scheduling::{Actor, Appointment, AppointmentStatus, StatusHistoryEntry};
use shared_utils::clock::Clock;
use shared_utils::time::{add_minutes, TimeOfDay};

use crate::models::{
    AppointmentError, CreateAppointmentRequest, HistoryDiff, MoveAppointmentRequest,
    TransitionStatusRequest,
};
use crate::services::audit::AuditRecorder;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::{DayGuard, DayKey, DayLockRegistry};
use crate::services::notification::{recipient_for, NotificationDispatcher};
use crate::services::reminder::{wall_clock_instant, ReminderScheduler};

const MAX_LOCK_ATTEMPTS: u32 = 3;

/// Owns every appointment mutation. Availability checks and the writes that
/// depend on them run under the affected days' locks.
pub struct AppointmentBookingService {
    store: Arc<dyn SchedulingStore>,
    availability: AvailabilityService,
    lifecycle: AppointmentLifecycleService,
    audit: AuditRecorder,
    reminders: ReminderScheduler,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    locks: DayLockRegistry,
    granularity_minutes: u16,
    business_utc_offset_minutes: i32,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            availability: AvailabilityService::new(Arc::clone(&store), config),
            lifecycle: AppointmentLifecycleService::new(),
            audit: AuditRecorder::new(Arc::clone(&store)),
            reminders: ReminderScheduler::new(Arc::clone(&store), Arc::clone(&clock), config),
            store,
            notifier,
            clock,
            locks: DayLockRegistry::new(),
            granularity_minutes: config.slot_granularity_minutes,
            business_utc_offset_minutes: config.business_utc_offset_minutes,
        }
    }

    // ==========================================================================
    // CREATE
    // ==========================================================================

    #[instrument(skip(self, request), fields(professional_id = %request.professional_id, date = %request.date))]
    pub async fn create(&self, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let client_identity = request.client_identity.trim();
        if client_identity.is_empty() {
            return Err(AppointmentError::ValidationError("Client identity is required".to_string()));
        }
        if request.service_duration_minutes == 0 {
            return Err(AppointmentError::ValidationError(
                "Service duration must be positive".to_string(),
            ));
        }

        let derived_end = add_minutes(request.start_time, request.service_duration_minutes as i32)?;
        let end_time = match request.end_time {
            Some(end) if end != derived_end => {
                return Err(AppointmentError::ValidationError(format!(
                    "End time {} does not match start {} plus {} minutes",
                    end, request.start_time, request.service_duration_minutes
                )));
            }
            Some(end) => end,
            None => derived_end,
        };

        self.validate_interval(request.date, request.start_time, end_time)?;

        let guard = self.locks.lock_day(request.professional_id, request.date).await;

        let check = self
            .availability
            .check_slot_available(request.professional_id, request.date, request.start_time, end_time, None)
            .await?;
        if let Some(reason) = check.reason {
            info!("Booking rejected at {}-{}: {}", request.start_time, end_time, reason);
            return Err(AppointmentError::Conflict(reason));
        }

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            date: request.date,
            start_time: request.start_time,
            end_time,
            status: AppointmentStatus::Pending,
            client_identity: client_identity.to_string(),
            client_email: request.client_email,
            service_duration_minutes: request.service_duration_minutes,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let created = StatusHistoryEntry {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            changed_by: request.actor.id,
            changed_by_role: request.actor.role,
            old_status: None,
            new_status: appointment.status,
            old_date: None,
            new_date: Some(appointment.date),
            old_start_time: None,
            new_start_time: Some(appointment.start_time),
            old_end_time: None,
            new_end_time: Some(appointment.end_time),
            old_professional_id: None,
            new_professional_id: Some(appointment.professional_id),
            reason: None,
            notes: None,
            changed_at: now,
        };
        self.insert_with_history(&appointment, &created).await?;

        info!(
            "Appointment {} booked for {} on {} {}-{}",
            appointment.id, appointment.professional_id, appointment.date, appointment.start_time, appointment.end_time
        );

        // a concurrent transition waits on this day, so it sees the task
        if let Err(e) = self.reminders.schedule(&appointment).await {
            warn!("Failed to schedule reminder for {}: {}", appointment.id, e);
        }
        drop(guard);

        self.notify(
            &appointment,
            "Appointment booked",
            format!("Your appointment is booked for {} at {}", appointment.date, appointment.start_time),
        )
        .await;

        Ok(appointment)
    }

    // ==========================================================================
    // STATUS TRANSITIONS
    // ==========================================================================

    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        request: TransitionStatusRequest,
    ) -> Result<Appointment, AppointmentError> {
        let new_status = self.lifecycle.parse_status(&request.status)?;

        let (guard, mut appointment) = self
            .lock_appointment(appointment_id, |a| vec![(a.professional_id, a.date)])
            .await?;

        let old_status = appointment.status;
        self.lifecycle.validate_status_transition(old_status, new_status)?;
        self.lifecycle.authorize_transition(&request.actor, &appointment, new_status)?;

        let now = self.clock.now();
        let previous = appointment.clone();
        appointment.status = new_status;
        appointment.updated_at = now;

        let change = StatusHistoryEntry {
            id: Uuid::new_v4(),
            appointment_id,
            changed_by: request.actor.id,
            changed_by_role: request.actor.role,
            old_status: Some(old_status),
            new_status,
            old_date: None,
            new_date: None,
            old_start_time: None,
            new_start_time: None,
            old_end_time: None,
            new_end_time: None,
            old_professional_id: None,
            new_professional_id: None,
            reason: request.reason,
            notes: request.notes,
            changed_at: now,
        };
        self.update_with_history(&previous, &appointment, &change).await?;

        info!("Appointment {} status {} -> {}", appointment_id, old_status, new_status);

        if !new_status.holds_slot() {
            if let Err(e) = self.reminders.reconcile(appointment_id).await {
                warn!("Failed to reconcile reminders for {}: {}", appointment_id, e);
            }
        }
        drop(guard);

        if new_status == AppointmentStatus::Cancelled {
            self.notify(
                &appointment,
                "Appointment cancelled",
                format!(
                    "Your appointment on {} at {} has been cancelled",
                    appointment.date, appointment.start_time
                ),
            )
            .await;
        }

        Ok(appointment)
    }

    // ==========================================================================
    // MOVE
    // ==========================================================================

    #[instrument(skip(self, request))]
    pub async fn move_appointment(
        &self,
        appointment_id: Uuid,
        request: MoveAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let target_key = |a: &Appointment| -> Vec<DayKey> {
            vec![
                (a.professional_id, a.date),
                (
                    request.new_professional_id.unwrap_or(a.professional_id),
                    request.new_date.unwrap_or(a.date),
                ),
            ]
        };

        let (guard, current) = self.lock_appointment(appointment_id, target_key).await?;

        if current.is_terminal() {
            return Err(AppointmentError::InvalidStatusTransition(current.status.to_string()));
        }
        self.authorize_move(&request.actor, &current, request.new_professional_id)?;

        let new_professional_id = request.new_professional_id.unwrap_or(current.professional_id);
        let new_date = request.new_date.unwrap_or(current.date);
        let new_start = request.new_start_time.unwrap_or(current.start_time);
        let new_end = add_minutes(new_start, current.service_duration_minutes as i32)?;

        if new_professional_id == current.professional_id
            && new_date == current.date
            && new_start == current.start_time
            && new_end == current.end_time
        {
            return Err(AppointmentError::ValidationError(
                "Move does not change the appointment".to_string(),
            ));
        }

        self.validate_interval(new_date, new_start, new_end)?;

        let check = self
            .availability
            .check_slot_available(new_professional_id, new_date, new_start, new_end, Some(appointment_id))
            .await?;
        if let Some(reason) = check.reason {
            info!("Move of {} rejected at {} {}-{}: {}", appointment_id, new_date, new_start, new_end, reason);
            return Err(AppointmentError::Conflict(reason));
        }

        let now = self.clock.now();
        let mut moved = current.clone();
        moved.professional_id = new_professional_id;
        moved.date = new_date;
        moved.start_time = new_start;
        moved.end_time = new_end;
        moved.updated_at = now;

        let change = StatusHistoryEntry {
            id: Uuid::new_v4(),
            appointment_id,
            changed_by: request.actor.id,
            changed_by_role: request.actor.role,
            old_status: Some(current.status),
            new_status: moved.status,
            old_date: Some(current.date),
            new_date: Some(moved.date),
            old_start_time: Some(current.start_time),
            new_start_time: Some(moved.start_time),
            old_end_time: Some(current.end_time),
            new_end_time: Some(moved.end_time),
            old_professional_id: Some(current.professional_id),
            new_professional_id: Some(moved.professional_id),
            reason: request.reason,
            notes: None,
            changed_at: now,
        };
        self.update_with_history(&current, &moved, &change).await?;

        info!(
            "Appointment {} moved from {} {} to {} {}",
            appointment_id, current.date, current.start_time, moved.date, moved.start_time
        );

        // the reminder fire time follows the start instant
        if moved.date != current.date || moved.start_time != current.start_time {
            if let Err(e) = self.reminders.reconcile(appointment_id).await {
                warn!("Failed to reconcile reminders for {}: {}", appointment_id, e);
            }
        }
        drop(guard);

        self.notify(
            &moved,
            "Appointment rescheduled",
            format!("Your appointment has moved to {} at {}", moved.date, moved.start_time),
        )
        .await;

        Ok(moved)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn appointments_for_day(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store
            .appointments_for_day(professional_id, date)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    pub async fn history(&self, appointment_id: Uuid) -> Result<Vec<HistoryDiff>, AppointmentError> {
        self.get_appointment(appointment_id).await?;
        self.audit.reconstruct(appointment_id).await
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    /// Writes a new appointment together with its creation entry. The row is
    /// removed again when the history append fails.
    async fn insert_with_history(
        &self,
        appointment: &Appointment,
        entry: &StatusHistoryEntry,
    ) -> Result<(), AppointmentError> {
        self.store
            .insert_appointment(appointment)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if let Err(e) = self.audit.record(entry).await {
            error!("History write failed for new appointment {}, removing it: {}", appointment.id, e);
            if let Err(undo) = self.store.delete_appointment(appointment.id).await {
                error!("Failed to remove unaudited appointment {}: {}", appointment.id, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Writes an appointment change together with its history entry. The
    /// previous row is restored when the history append fails.
    async fn update_with_history(
        &self,
        previous: &Appointment,
        updated: &Appointment,
        entry: &StatusHistoryEntry,
    ) -> Result<(), AppointmentError> {
        self.store
            .update_appointment(updated)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if let Err(e) = self.audit.record(entry).await {
            error!("History write failed for appointment {}, restoring it: {}", updated.id, e);
            if let Err(undo) = self.store.update_appointment(previous).await {
                error!("Failed to restore appointment {}: {}", updated.id, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Shared create/move rules: ordering, granularity, and not in the past.
    fn validate_interval(&self, date: NaiveDate, start: TimeOfDay, end: TimeOfDay) -> Result<(), AppointmentError> {
        if start >= end {
            return Err(AppointmentError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }

        let granularity = self.granularity_minutes;
        if !start.is_aligned_to(granularity) || !end.is_aligned_to(granularity) {
            return Err(AppointmentError::ValidationError(format!(
                "Start and end must fall on {}-minute boundaries",
                granularity
            )));
        }

        let starts_at = wall_clock_instant(date, start, self.business_utc_offset_minutes)?;
        if starts_at < self.clock.now() {
            return Err(AppointmentError::ValidationError(
                "Cannot book an appointment in the past".to_string(),
            ));
        }
        Ok(())
    }

    fn authorize_move(
        &self,
        actor: &Actor,
        appointment: &Appointment,
        new_professional_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        self.lifecycle.authorize_owner(actor, appointment)?;

        if actor.is_restricted() && new_professional_id.is_some_and(|p| p != actor.id) {
            return Err(AppointmentError::PermissionDenied(
                "Professionals cannot reassign appointments".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock the days an operation touches and return the appointment as read
    /// under those locks. Retries if it moved while we waited.
    async fn lock_appointment<F>(
        &self,
        appointment_id: Uuid,
        keys_for: F,
    ) -> Result<(DayGuard, Appointment), AppointmentError>
    where
        F: Fn(&Appointment) -> Vec<DayKey>,
    {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let before = self.get_appointment(appointment_id).await?;
            let keys = keys_for(&before);
            let guard = self.locks.lock_days(keys.clone()).await;

            let current = self.get_appointment(appointment_id).await?;
            if keys_for(&current) == keys {
                return Ok((guard, current));
            }

            debug!(
                "Appointment {} changed day while waiting for its lock, attempt {}/{}",
                appointment_id, attempt, MAX_LOCK_ATTEMPTS
            );
        }

        Err(AppointmentError::DatabaseError(
            "Appointment kept changing while acquiring its lock".to_string(),
        ))
    }

    async fn notify(&self, appointment: &Appointment, subject: &str, body: String) {
        if let Err(e) = self
            .notifier
            .send(recipient_for(appointment), subject, &body)
            .await
        {
            warn!("Notification for appointment {} failed: {}", appointment.id, e);
        }
    }
}
