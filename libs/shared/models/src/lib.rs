pub mod error;
pub mod scheduling;
