pub mod slots;
pub mod availability;
pub mod schedule;

pub use availability::AvailabilityService;
pub use schedule::ScheduleService;
pub use slots::{generate_candidate_slots, CandidateSlots};
