// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::scheduling::{Actor, ActorRole, Appointment, AppointmentStatus};

use crate::models::AppointmentError;

/// Statuses a restricted (professional) actor may set.
const PROFESSIONAL_TARGETS: [AppointmentStatus; 4] = [
    AppointmentStatus::ClientArrived,
    AppointmentStatus::InProgress,
    AppointmentStatus::Completed,
    AppointmentStatus::NoShow,
];

/// Pure status and permission policy. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_status(&self, raw: &str) -> Result<AppointmentStatus, AppointmentError> {
        raw.parse::<AppointmentStatus>()
            .map_err(|_| AppointmentError::InvalidStatus(raw.to_string()))
    }

    /// Terminal appointments accept nothing; otherwise any different status.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status.to_string()));
        }
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        if current_status.is_terminal() {
            return vec![];
        }
        AppointmentStatus::ALL
            .into_iter()
            .filter(|s| *s != current_status)
            .collect()
    }

    /// Statuses the actor's role may set on someone's appointment at all.
    pub fn allowed_targets(&self, role: ActorRole) -> Vec<AppointmentStatus> {
        match role {
            ActorRole::Admin | ActorRole::Staff => AppointmentStatus::ALL.to_vec(),
            ActorRole::Professional => PROFESSIONAL_TARGETS.to_vec(),
        }
    }

    pub fn authorize_transition(
        &self,
        actor: &Actor,
        appointment: &Appointment,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        self.authorize_owner(actor, appointment)?;

        if !self.allowed_targets(actor.role).contains(&new_status) {
            return Err(AppointmentError::PermissionDenied(format!(
                "Role {} may not set status {}",
                actor.role, new_status
            )));
        }
        Ok(())
    }

    /// Restricted actors only touch appointments assigned to them.
    pub fn authorize_owner(&self, actor: &Actor, appointment: &Appointment) -> Result<(), AppointmentError> {
        if actor.is_restricted() && actor.id != appointment.professional_id {
            warn!(
                "Actor {} attempted to modify appointment {} assigned to {}",
                actor.id, appointment.id, appointment.professional_id
            );
            return Err(AppointmentError::PermissionDenied(
                "Appointment is assigned to another professional".to_string(),
            ));
        }
        Ok(())
    }
}
