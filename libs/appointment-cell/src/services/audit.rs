// libs/appointment-cell/src/services/audit.rs
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::scheduling::StatusHistoryEntry;

use crate::models::{AppointmentError, FieldChange, HistoryDiff};

/// Append-only audit trail of appointment mutations.
pub struct AuditRecorder {
    store: Arc<dyn SchedulingStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, entry), fields(appointment_id = %entry.appointment_id))]
    pub async fn record(&self, entry: &StatusHistoryEntry) -> Result<(), AppointmentError> {
        self.store
            .append_history(entry)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        info!(
            entry_id = %entry.id,
            changed_by = %entry.changed_by,
            role = %entry.changed_by_role,
            old_status = ?entry.old_status,
            new_status = %entry.new_status,
            moved = entry.old_date.is_some() || entry.old_start_time.is_some() || entry.old_professional_id.is_some(),
            "AUDIT: appointment {} recorded",
            entry.appointment_id
        );
        Ok(())
    }

    /// Full history, oldest first, each entry reduced to what changed.
    pub async fn reconstruct(&self, appointment_id: Uuid) -> Result<Vec<HistoryDiff>, AppointmentError> {
        let mut entries = self
            .store
            .history(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        entries.sort_by_key(|e| e.changed_at);
        Ok(entries.iter().map(diff_entry).collect())
    }
}

pub fn diff_entry(entry: &StatusHistoryEntry) -> HistoryDiff {
    let mut changes = Vec::new();

    if let Some(old) = entry.old_status {
        if old != entry.new_status {
            changes.push(change("status", old, entry.new_status));
        }
    }
    if let (Some(old), Some(new)) = (entry.old_date, entry.new_date) {
        if old != new {
            changes.push(change("date", old, new));
        }
    }
    if let (Some(old), Some(new)) = (entry.old_start_time, entry.new_start_time) {
        if old != new {
            changes.push(change("start_time", old, new));
        }
    }
    if let (Some(old), Some(new)) = (entry.old_end_time, entry.new_end_time) {
        if old != new {
            changes.push(change("end_time", old, new));
        }
    }
    if let (Some(old), Some(new)) = (entry.old_professional_id, entry.new_professional_id) {
        if old != new {
            changes.push(change("professional_id", old, new));
        }
    }

    HistoryDiff {
        changed_at: entry.changed_at,
        changed_by: entry.changed_by,
        changed_by_role: entry.changed_by_role,
        created: entry.old_status.is_none(),
        changes,
        reason: entry.reason.clone(),
        notes: entry.notes.clone(),
    }
}

fn change(field: &str, old: impl ToString, new: impl ToString) -> FieldChange {
    FieldChange {
        field: field.to_string(),
        old: old.to_string(),
        new: new.to_string(),
    }
}
