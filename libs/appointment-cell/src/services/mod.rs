pub mod audit;
pub mod booking;
pub mod lifecycle;
pub mod locks;
pub mod notification;
pub mod reminder;

pub use audit::AuditRecorder;
pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use locks::DayLockRegistry;
pub use notification::{LogDispatcher, NotificationDispatcher, WebhookDispatcher};
pub use reminder::{ReminderScheduler, ReminderSweeper};
