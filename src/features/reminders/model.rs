//! Reminder records and recurrence policy

use chrono::NaiveDateTime;

use crate::gateway::UserId;

/// Store-assigned reminder identifier
pub type ReminderId = i64;

/// Timestamp format used for persisted instants (sorts lexicographically)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a reminder re-arms after it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recurrence {
    /// Fire once, then retire
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn is_recurring(self) -> bool {
        !matches!(self, Recurrence::None)
    }

    /// Human readable label for confirmations and listings
    pub fn label(self) -> &'static str {
        match self {
            Recurrence::None => "once",
            Recurrence::Daily => "every day",
            Recurrence::Weekly => "every week",
            Recurrence::Monthly => "every month",
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::None => write!(f, "none"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(anyhow::anyhow!("Invalid recurrence: {}", s)),
        }
    }
}

/// A persisted reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,

    /// User who receives the reminder
    pub owner: UserId,

    pub message: String,

    /// Next time this reminder fires (local time)
    pub fire_at: NaiveDateTime,

    pub recurrence: Recurrence,
}

impl Reminder {
    /// Text delivered to the owner when the reminder fires
    pub fn delivery_text(&self) -> String {
        format!(
            "🔔 Reminder ({}): {}",
            self.fire_at.format("%H:%M"),
            self.message
        )
    }
}
