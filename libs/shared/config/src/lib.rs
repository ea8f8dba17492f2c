use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub notification_webhook_url: String,
    pub api_port: u16,
    pub scheduling: SchedulingConfig,
}

/// Scheduling policy knobs. These are configuration, not literals, so tests
/// can exercise other granularities and offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingConfig {
    /// Distance between candidate slot starts, and the boundary every booked
    /// start/end must land on.
    pub slot_granularity_minutes: u16,
    pub reminder_offset_hours: i64,
    /// Offset of the business's wall clock from UTC, used to turn an
    /// appointment's date + "HH:MM" into an instant for reminders.
    pub business_utc_offset_minutes: i32,
    pub reminder_sweep_interval_seconds: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: 30,
            reminder_offset_hours: 24,
            business_utc_offset_minutes: 0,
            reminder_sweep_interval_seconds: 60,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.slot_granularity_minutes == 0 || self.slot_granularity_minutes > 24 * 60 {
            return Err(format!(
                "slot granularity must be between 1 and 1440 minutes, got {}",
                self.slot_granularity_minutes
            ));
        }
        if self.reminder_offset_hours < 0 {
            return Err("reminder offset cannot be negative".to_string());
        }
        if self.business_utc_offset_minutes.abs() >= 24 * 60 {
            return Err("business UTC offset must be less than 24 hours".to_string());
        }
        if self.reminder_sweep_interval_seconds == 0 {
            return Err("reminder sweep interval must be positive".to_string());
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SchedulingConfig::default();

        let mut config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using in-memory storage");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .unwrap_or_else(|_| {
                    warn!("NOTIFICATION_WEBHOOK_URL not set, notifications will only be logged");
                    String::new()
                }),
            api_port: parse_or("API_PORT", 3000),
            scheduling: SchedulingConfig {
                slot_granularity_minutes: parse_or(
                    "SLOT_GRANULARITY_MINUTES",
                    defaults.slot_granularity_minutes,
                ),
                reminder_offset_hours: parse_or("REMINDER_OFFSET_HOURS", defaults.reminder_offset_hours),
                business_utc_offset_minutes: parse_or(
                    "BUSINESS_UTC_OFFSET_MINUTES",
                    defaults.business_utc_offset_minutes,
                ),
                reminder_sweep_interval_seconds: parse_or(
                    "REMINDER_SWEEP_INTERVAL_SECONDS",
                    defaults.reminder_sweep_interval_seconds,
                ),
            },
        };

        if let Err(e) = config.scheduling.validate() {
            warn!("Invalid scheduling configuration ({}), using defaults", e);
            config.scheduling = defaults;
        }

        if !config.is_database_configured() {
            warn!("Database not configured - appointments will not survive a restart");
        }

        config
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_webhook_configured(&self) -> bool {
        !self.notification_webhook_url.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            notification_webhook_url: String::new(),
            api_port: 3000,
            scheduling: SchedulingConfig::default(),
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
