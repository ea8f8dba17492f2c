pub mod clock;
pub mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use time::{add_minutes, overlaps, to_minutes, to_time_string, TimeError, TimeOfDay};
