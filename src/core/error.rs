//! Reminder lifecycle errors
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use thiserror::Error;

pub type ReminderResult<T> = std::result::Result<T, ReminderError>;

/// Errors raised while collecting, storing, or firing a reminder
///
/// None of these are fatal to the bot: conversation errors are reported to the
/// user who caused them, dispatcher errors are logged and retried.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// A one-off reminder was set for a time that has already passed
    #[error("selected time is already in the past")]
    PastTime,

    /// The event does not belong to the user's current step (or there is no session)
    #[error("event does not match the current reminder step")]
    InvalidStep,

    /// A selection token the bot does not understand
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("reminder text is empty")]
    EmptyMessage,

    #[error("reminder store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("message delivery failed: {0}")]
    DeliveryFailed(String),
}

impl ReminderError {
    /// Whether the user's in-progress session must be thrown away
    pub fn discards_session(&self) -> bool {
        match self {
            ReminderError::PastTime
            | ReminderError::StoreUnavailable(_)
            | ReminderError::DeliveryFailed(_) => true,
            ReminderError::InvalidStep
            | ReminderError::InvalidSelection(_)
            | ReminderError::EmptyMessage => false,
        }
    }

    /// Text shown to the user when this error ends a conversation turn
    pub fn user_notice(&self) -> &'static str {
        match self {
            ReminderError::PastTime => {
                "⏰ That time has already passed. Use `/remind` to pick another time."
            }
            ReminderError::InvalidStep | ReminderError::InvalidSelection(_) => {
                "⚠️ That option isn't active anymore. Use `/remind` to start a new reminder."
            }
            ReminderError::EmptyMessage => "✏️ Please send some text for the reminder.",
            ReminderError::StoreUnavailable(_) | ReminderError::DeliveryFailed(_) => {
                "❌ Sorry, I couldn't save your reminder. Please try again later."
            }
        }
    }
}

impl From<sqlite::Error> for ReminderError {
    fn from(err: sqlite::Error) -> Self {
        ReminderError::StoreUnavailable(err.to_string())
    }
}
