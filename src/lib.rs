// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Chat platform boundary
pub mod gateway;

// UI components
pub mod message_components;

// Infrastructure
pub mod database;

// Application layer
pub mod command_handler;
pub mod commands;

pub use crate::core::{Config, ReminderError, ReminderResult};

pub use features::{
    ConversationTracker, Recurrence, Reminder, ReminderId, ReminderScheduler, ReminderStore,
};

pub use gateway::{DiscordGateway, GatewayEvent, MessagingGateway};
