//! # Features
//!
//! Self-contained feature modules.

pub mod reminders;

pub use reminders::{
    ConversationTracker, Recurrence, Reminder, ReminderId, ReminderScheduler, ReminderStore,
};
