use anyhow::Result;
use log::{info, warn};
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::features::reminders::ConversationTracker;
use crate::gateway::discord::{is_reminder_component, selection_token};
use crate::gateway::{GatewayEvent, MessagingGateway, PromptRef};

/// Handler for all message component interactions
pub struct MessageComponentHandler {
    tracker: ConversationTracker,
    gateway: Arc<dyn MessagingGateway>,
}

impl MessageComponentHandler {
    pub fn new(tracker: ConversationTracker, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { tracker, gateway }
    }

    /// Handle all types of component interactions
    pub async fn handle_component_interaction(
        &self,
        ctx: &Context,
        interaction: &MessageComponentInteraction,
    ) -> Result<()> {
        let custom_id = &interaction.data.custom_id;
        let user_id = interaction.user.id;

        info!("Processing component interaction: {custom_id} from user: {user_id}");

        match custom_id.as_str() {
            id if is_reminder_component(id) => {
                self.handle_reminder_selection(ctx, interaction).await?;
            }
            _ => {
                interaction
                    .create_interaction_response(&ctx.http, |response| {
                        response
                            .kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| {
                                message.content("Unknown component interaction.").ephemeral(true)
                            })
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// Acknowledge a reminder button/menu pick and feed it to the tracker
    async fn handle_reminder_selection(
        &self,
        ctx: &Context,
        interaction: &MessageComponentInteraction,
    ) -> Result<()> {
        // The tracker edits the prompt itself, so only defer here
        interaction
            .create_interaction_response(&ctx.http, |response| {
                response.kind(InteractionResponseType::DeferredUpdateMessage)
            })
            .await?;

        let user_id = interaction.user.id.0;
        let Some(token) = selection_token(&interaction.data.custom_id, &interaction.data.values)
        else {
            warn!(
                "Reminder component {} from user {user_id} carried no selection",
                interaction.data.custom_id
            );
            return Ok(());
        };

        let event = GatewayEvent::Selection {
            user_id,
            token,
            prompt: Some(PromptRef {
                channel_id: interaction.message.channel_id.0,
                message_id: interaction.message.id.0,
            }),
        };

        // Errors are already reported to the user by the tracker
        if let Err(e) = self.tracker.handle_event(self.gateway.as_ref(), event).await {
            warn!("Reminder selection from user {user_id} rejected: {e}");
        }
        Ok(())
    }
}
