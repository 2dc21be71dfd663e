//! # Reminders Feature
//!
//! Guided reminder creation and recurring delivery.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Button-driven day/time flow, recurrence, durable fire times
//! - 1.0.0: Duration-based one-off reminders

pub mod choices;
pub mod model;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use choices::{day_choices, time_choices, Selection};
pub use model::{Recurrence, Reminder, ReminderId};
pub use resolver::{Clock, DaySelector, LocalClock};
pub use scheduler::{PollSummary, ReminderScheduler};
pub use session::{ConversationTracker, Session, SessionStep};
pub use store::ReminderStore;
