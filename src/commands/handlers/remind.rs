//! Reminder command handlers
//!
//! Handles: remind, reminders
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: `/remind` opens the guided DM flow; cancel also drops the pending fire event
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::{get_integer_option, get_string_option};
use crate::features::reminders::Reminder;
use crate::gateway::GatewayEvent;

/// Handler for reminder-related commands
pub struct RemindHandler;

#[async_trait]
impl SlashCommandHandler for RemindHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["remind", "reminders"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        match command.data.name.as_str() {
            "remind" => self.handle_remind(&ctx, serenity_ctx, command).await,
            "reminders" => self.handle_reminders(&ctx, serenity_ctx, command).await,
            _ => Ok(()),
        }
    }
}

impl RemindHandler {
    /// Handle /remind command - start the guided flow in DMs
    async fn handle_remind(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.0;
        let in_dm = command.guild_id.is_none();

        let ack = if in_dm {
            "⏰ Let's set up a reminder."
        } else {
            "📬 Check your DMs, I'll walk you through setting up the reminder there."
        };
        Self::reply(serenity_ctx, command, ack).await?;

        // Errors are already reported to the user by the tracker
        if let Err(e) = ctx
            .tracker
            .handle_event(ctx.gateway.as_ref(), GatewayEvent::Start { user_id })
            .await
        {
            warn!("Could not start reminder flow for user {user_id}: {e}");
        }
        Ok(())
    }

    /// Handle /reminders command - list or cancel reminders
    async fn handle_reminders(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.0;
        let action = get_string_option(&command.data.options, "action")
            .unwrap_or_else(|| "list".to_string());

        let reply = match action.as_str() {
            "cancel" => {
                let id = get_integer_option(&command.data.options, "id");
                self.cancel_reminder(ctx, user_id, id).await
            }
            _ => self.list_reminders(ctx, user_id).await,
        };

        Self::reply(serenity_ctx, command, &reply).await
    }

    async fn list_reminders(&self, ctx: &CommandContext, user_id: u64) -> String {
        match ctx.store.list_for_owner(user_id).await {
            Ok(reminders) => format_reminder_list(&reminders, ctx.clock.now()),
            Err(e) => {
                warn!("Could not list reminders for user {user_id}: {e}");
                "❌ Sorry, I couldn't load your reminders. Please try again later.".to_string()
            }
        }
    }

    /// Cancel a specific reminder
    async fn cancel_reminder(&self, ctx: &CommandContext, user_id: u64, id: Option<i64>) -> String {
        let Some(id) = id else {
            return "❌ Please provide a reminder ID to cancel. Use `/reminders` to see your reminder IDs."
                .to_string();
        };

        match ctx.store.delete_owned(id, user_id).await {
            Ok(true) => {
                ctx.scheduler.unschedule(id).await;
                info!("Deleted reminder {id} for user {user_id}");
                format!("✅ Cancelled reminder #{id}.")
            }
            Ok(false) => format!("❌ Reminder #{id} not found or doesn't belong to you."),
            Err(e) => {
                warn!("Could not cancel reminder {id} for user {user_id}: {e}");
                "❌ Sorry, I couldn't cancel that reminder. Please try again later.".to_string()
            }
        }
    }

    async fn reply(
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        content: &str,
    ) -> Result<()> {
        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|msg| msg.content(content).ephemeral(true))
            })
            .await?;
        Ok(())
    }
}

/// Render a user's reminders for `/reminders`
pub fn format_reminder_list(reminders: &[Reminder], now: NaiveDateTime) -> String {
    if reminders.is_empty() {
        return "📋 You don't have any pending reminders.\n\nUse `/remind` to create one!"
            .to_string();
    }

    let mut reminder_list = String::from("📋 **Your Pending Reminders:**\n\n");
    for reminder in reminders {
        let diff = reminder.fire_at.signed_duration_since(now);
        let time_display = if diff.num_seconds() > 0 {
            format!("in {}", format_duration(diff.num_seconds()))
        } else {
            "any moment now".to_string()
        };

        reminder_list.push_str(&format!(
            "**#{}** - {} ({}, {})\n> {}\n\n",
            reminder.id,
            time_display,
            reminder.fire_at.format("%Y-%m-%d %H:%M"),
            reminder.recurrence.label(),
            reminder.message
        ));
    }
    reminder_list.push_str("*Use `/reminders action:cancel id:<id>` to cancel a reminder.*");
    reminder_list
}

/// Format a duration in seconds into a human-readable string
pub fn format_duration(seconds: i64) -> String {
    fn plural(n: i64, unit: &str) -> String {
        format!("{n} {unit}{}", if n == 1 { "" } else { "s" })
    }

    if seconds < 60 {
        plural(seconds, "second")
    } else if seconds < 3600 {
        plural(seconds / 60, "minute")
    } else if seconds < 86400 {
        let (hours, mins) = (seconds / 3600, (seconds % 3600) / 60);
        if mins > 0 {
            format!("{} {}", plural(hours, "hour"), plural(mins, "minute"))
        } else {
            plural(hours, "hour")
        }
    } else {
        let (days, hours) = (seconds / 86400, (seconds % 86400) / 3600);
        if hours > 0 {
            format!("{} {}", plural(days, "day"), plural(hours, "hour"))
        } else {
            plural(days, "day")
        }
    }
}
