//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Carry the reminder store, tracker, scheduler and clock
//! - 1.0.0: Initial implementation with core shared state

use std::sync::Arc;

use crate::features::reminders::{Clock, ConversationTracker, ReminderScheduler, ReminderStore};
use crate::gateway::MessagingGateway;

/// Shared context for all command handlers
///
/// Contains the core services needed by the command handlers:
/// - ReminderStore for listing and cancelling reminders
/// - ConversationTracker for the guided creation flow
/// - ReminderScheduler to drop cancelled fire events
/// - MessagingGateway for prompts sent outside the interaction
/// - Clock shared with the tracker and dispatcher
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<dyn ReminderStore>,
    pub tracker: ConversationTracker,
    pub scheduler: ReminderScheduler,
    pub gateway: Arc<dyn MessagingGateway>,
    pub clock: Arc<dyn Clock>,
}

impl CommandContext {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        tracker: ConversationTracker,
        scheduler: ReminderScheduler,
        gateway: Arc<dyn MessagingGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            tracker,
            scheduler,
            gateway,
            clock,
        }
    }
}
