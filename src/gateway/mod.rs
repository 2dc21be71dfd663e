//! # Messaging Gateway
//!
//! The boundary between the reminder engine and the chat platform. The engine
//! only sees `GatewayEvent`s coming in and talks back through
//! `MessagingGateway`; how buttons are drawn is the adapter's business.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod discord;

use anyhow::Result;
use async_trait::async_trait;

pub use discord::DiscordGateway;

/// Stable end-user identifier (a Discord user snowflake)
pub type UserId = u64;

/// Reference to a prompt message so it can be edited in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptRef {
    pub channel_id: u64,
    pub message_id: u64,
}

/// A selectable option: what the user sees and the token we get back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Inbound user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The user asked to create a reminder
    Start { user_id: UserId },
    /// Any other bot command
    Command { user_id: UserId, name: String },
    /// A button press or menu pick on one of our prompts
    Selection {
        user_id: UserId,
        token: String,
        prompt: Option<PromptRef>,
    },
    /// A free-text direct message
    Text { user_id: UserId, content: String },
}

impl GatewayEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            GatewayEvent::Start { user_id }
            | GatewayEvent::Command { user_id, .. }
            | GatewayEvent::Selection { user_id, .. }
            | GatewayEvent::Text { user_id, .. } => *user_id,
        }
    }
}

/// Outbound messaging used by the conversation tracker and the dispatcher
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a plain text message to the user
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<()>;

    /// Send a prompt with selectable choices, returning a handle to edit it later
    async fn send_choices(
        &self,
        user_id: UserId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<PromptRef>;

    /// Replace a previous prompt's text; `None` removes its choices
    async fn edit_prompt(
        &self,
        user_id: UserId,
        prompt: PromptRef,
        text: &str,
        choices: Option<&[Choice]>,
    ) -> Result<()>;
}
