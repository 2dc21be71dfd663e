use anyhow::Result;
use log::{debug, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::context::CommandContext;
use crate::commands::handlers::create_all_handlers;
use crate::commands::registry::CommandRegistry;
use crate::gateway::GatewayEvent;

/// Command that starts the guided reminder flow
const START_COMMAND: &str = "remind";

/// Entry point for inbound messages and slash commands
#[derive(Clone)]
pub struct CommandHandler {
    context: Arc<CommandContext>,
    registry: CommandRegistry,
}

impl CommandHandler {
    pub fn new(context: CommandContext) -> Self {
        let mut registry = CommandRegistry::new();
        for handler in create_all_handlers() {
            registry.register(handler);
        }

        Self {
            context: Arc::new(context),
            registry,
        }
    }

    /// Route a direct message into the reminder flow
    ///
    /// Guild messages are ignored; the flow only runs in DMs.
    pub async fn handle_message(&self, _ctx: &Context, msg: &Message) -> Result<()> {
        if msg.guild_id.is_some() {
            return Ok(());
        }

        let request_id = Uuid::new_v4();
        let user_id = msg.author.id.0;
        debug!(
            "[{request_id}] 📥 DM received | User: {user_id} | Content: '{}'",
            msg.content.chars().take(100).collect::<String>()
        );

        let event = GatewayEvent::Text {
            user_id,
            content: msg.content.clone(),
        };
        if let Err(e) = self
            .context
            .tracker
            .handle_event(self.context.gateway.as_ref(), event)
            .await
        {
            // Already reported to the user
            debug!("[{request_id}] Reminder flow rejected DM from {user_id}: {e}");
        }
        Ok(())
    }

    pub async fn handle_slash_command(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();
        let user_id = command.user.id.0;
        let name = command.data.name.as_str();
        let guild_id = command
            .guild_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "DM".to_string());

        info!(
            "[{request_id}] 📥 Slash command received | Command: {name} | User: {user_id} | Channel: {} | Guild: {guild_id}",
            command.channel_id
        );

        // Any other command abandons a reminder that is waiting for its text
        if name != START_COMMAND {
            let event = GatewayEvent::Command {
                user_id,
                name: name.to_string(),
            };
            if let Err(e) = self
                .context
                .tracker
                .handle_event(self.context.gateway.as_ref(), event)
                .await
            {
                debug!("[{request_id}] Reminder flow rejected /{name}: {e}");
            }
        }

        let Some(handler) = self.registry.get(name) else {
            warn!("[{request_id}] ❓ No handler registered for /{name}");
            return Ok(());
        };

        handler
            .handle(Arc::clone(&self.context), ctx, command)
            .await?;
        info!("[{request_id}] ✅ /{name} completed for user {user_id}");
        Ok(())
    }
}
