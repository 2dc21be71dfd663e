//! # Reminder Commands
//!
//! `/remind` starts the guided flow, `/reminders` lists or cancels.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 2.0.0: `/remind` takes no options; day and time are picked from buttons
//! - 1.0.0: Initial implementation

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_remind_command(), create_reminders_command()]
}

fn create_remind_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("remind")
        .description("Create a reminder (I'll walk you through it in DMs)")
        .dm_permission(true);
    command
}

fn create_reminders_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("reminders")
        .description("List or cancel your reminders")
        .dm_permission(true)
        .create_option(|option| {
            option
                .name("action")
                .description("What to do (defaults to list)")
                .kind(CommandOptionType::String)
                .required(false)
                .add_string_choice("List my reminders", "list")
                .add_string_choice("Cancel a reminder", "cancel")
        })
        .create_option(|option| {
            option
                .name("id")
                .description("Reminder ID to cancel")
                .kind(CommandOptionType::Integer)
                .required(false)
                .min_int_value(1)
        })
        .to_owned()
}
