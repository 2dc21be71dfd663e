//! Discord implementation of the messaging gateway
//!
//! All reminder traffic happens in the user's DMs. Short menus are drawn as
//! buttons, long ones (the time menu) as select menus.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serenity::builder::CreateComponents;
use serenity::http::Http;
use serenity::model::application::component::ButtonStyle;
use serenity::model::id::{ChannelId, MessageId};
use std::sync::Arc;

use super::{Choice, MessagingGateway, PromptRef, UserId};

/// Component custom_id prefix for everything the reminder flow renders
pub const REMIND_COMPONENT_PREFIX: &str = "remind:";

/// Select menus use this after the prefix; the token is the picked value
const MENU_MARKER: &str = "menu:";

// Discord limits
const BUTTONS_PER_ROW: usize = 5;
const MAX_ROWS: usize = 5;
const MAX_MENU_OPTIONS: usize = 25;

/// Gateway that sends reminder prompts and deliveries as Discord DMs
#[derive(Clone)]
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessagingGateway for DiscordGateway {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<()> {
        let http = self.http.as_ref();
        let dm = serenity::model::id::UserId(user_id)
            .create_dm_channel(http)
            .await?;
        dm.send_message(http, |m| m.content(text)).await?;
        debug!("Sent DM to user {user_id}");
        Ok(())
    }

    async fn send_choices(
        &self,
        user_id: UserId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<PromptRef> {
        let http = self.http.as_ref();
        let dm = serenity::model::id::UserId(user_id)
            .create_dm_channel(http)
            .await?;
        let message = dm
            .send_message(http, |m| {
                m.content(prompt)
                    .components(|c| fill_components(c, choices))
            })
            .await?;

        Ok(PromptRef {
            channel_id: message.channel_id.0,
            message_id: message.id.0,
        })
    }

    async fn edit_prompt(
        &self,
        user_id: UserId,
        prompt: PromptRef,
        text: &str,
        choices: Option<&[Choice]>,
    ) -> Result<()> {
        ChannelId(prompt.channel_id)
            .edit_message(self.http.as_ref(), MessageId(prompt.message_id), |m| {
                m.content(text).components(|c| match choices {
                    Some(choices) => fill_components(c, choices),
                    None => c, // Clear components
                })
            })
            .await?;
        debug!("Edited prompt {} for user {user_id}", prompt.message_id);
        Ok(())
    }
}

/// Render choices as buttons, or as select menus when there are too many
pub fn fill_components<'a>(
    components: &'a mut CreateComponents,
    choices: &[Choice],
) -> &'a mut CreateComponents {
    if choices.len() <= BUTTONS_PER_ROW * MAX_ROWS {
        for row in choices.chunks(BUTTONS_PER_ROW) {
            components.create_action_row(|action_row| {
                for choice in row {
                    action_row.create_button(|btn| {
                        btn.custom_id(format!("{REMIND_COMPONENT_PREFIX}{}", choice.token))
                            .label(&choice.label)
                            .style(ButtonStyle::Secondary)
                    });
                }
                action_row
            });
        }
        return components;
    }

    for (idx, chunk) in choices.chunks(MAX_MENU_OPTIONS).take(MAX_ROWS).enumerate() {
        let placeholder = match (chunk.first(), chunk.last()) {
            (Some(first), Some(last)) => format!("{} to {}", first.label, last.label),
            _ => "Choose".to_string(),
        };
        components.create_action_row(|action_row| {
            action_row.create_select_menu(|menu| {
                menu.custom_id(format!("{REMIND_COMPONENT_PREFIX}{MENU_MARKER}{idx}"))
                    .placeholder(placeholder)
                    .options(|options| {
                        for choice in chunk {
                            options.create_option(|opt| opt.label(&choice.label).value(&choice.token));
                        }
                        options
                    })
            })
        });
    }
    components
}

/// Whether a component custom_id belongs to the reminder flow
pub fn is_reminder_component(custom_id: &str) -> bool {
    custom_id.starts_with(REMIND_COMPONENT_PREFIX)
}

/// Extract the selection token from a component interaction
///
/// Buttons carry it in the custom_id; select menus carry it in the picked value.
pub fn selection_token(custom_id: &str, values: &[String]) -> Option<String> {
    let rest = custom_id.strip_prefix(REMIND_COMPONENT_PREFIX)?;
    if rest.starts_with(MENU_MARKER) {
        values.first().cloned()
    } else if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}
