//! Reminder menu choices and selection tokens
//!
//! Tokens are what the gateway hands back when the user presses a button or
//! picks a menu entry. They are opaque to the gateway.

use super::model::Recurrence;
use super::resolver::DaySelector;
use crate::core::ReminderError;
use crate::gateway::Choice;

/// First and last hour offered in the time menu
pub const FIRST_HOUR: u32 = 7;
pub const LAST_HOUR: u32 = 23;

/// Minutes offered within each hour
pub const MINUTE_SLOTS: &[u32] = &[0, 30];

/// Day menu entries (label, token), in display order
pub const DAY_CHOICES: &[(&str, &str)] = &[
    ("Today", "day:today"),
    ("Tomorrow", "day:tomorrow"),
    ("Monday", "day:1"),
    ("Tuesday", "day:2"),
    ("Wednesday", "day:3"),
    ("Thursday", "day:4"),
    ("Friday", "day:5"),
    ("Saturday", "day:6"),
    ("Sunday", "day:0"),
    ("Every day", "repeat:daily"),
    ("Every week", "repeat:weekly"),
    ("Every month", "repeat:monthly"),
];

/// A parsed selection token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A specific day for a one-off reminder
    Day(DaySelector),
    /// A recurrence class; the first occurrence is rooted at today
    Repeat(Recurrence),
    Time { hour: u32, minute: u32 },
}

impl std::str::FromStr for Selection {
    type Err = ReminderError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || ReminderError::InvalidSelection(token.to_string());
        let (kind, value) = token.split_once(':').ok_or_else(invalid)?;

        match kind {
            "day" => match value {
                "today" => Ok(Selection::Day(DaySelector::Today)),
                "tomorrow" => Ok(Selection::Day(DaySelector::Tomorrow)),
                n => n
                    .parse::<u8>()
                    .ok()
                    .filter(|n| *n < 7)
                    .map(|n| Selection::Day(DaySelector::Weekday(n)))
                    .ok_or_else(invalid),
            },
            "repeat" => match value {
                "daily" => Ok(Selection::Repeat(Recurrence::Daily)),
                "weekly" => Ok(Selection::Repeat(Recurrence::Weekly)),
                "monthly" => Ok(Selection::Repeat(Recurrence::Monthly)),
                _ => Err(invalid()),
            },
            "time" => {
                let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
                let hour: u32 = hour.parse().map_err(|_| invalid())?;
                let minute: u32 = minute.parse().map_err(|_| invalid())?;
                if hour > 23 || minute > 59 {
                    return Err(invalid());
                }
                Ok(Selection::Time { hour, minute })
            }
            _ => Err(invalid()),
        }
    }
}

/// Day and recurrence menu
pub fn day_choices() -> Vec<Choice> {
    DAY_CHOICES
        .iter()
        .map(|(label, token)| Choice::new(*label, *token))
        .collect()
}

/// Time menu, every slot from FIRST_HOUR to LAST_HOUR
pub fn time_choices() -> Vec<Choice> {
    (FIRST_HOUR..=LAST_HOUR)
        .flat_map(|hour| {
            MINUTE_SLOTS.iter().map(move |minute| {
                Choice::new(
                    format!("{hour:02}:{minute:02}"),
                    format!("time:{hour:02}:{minute:02}"),
                )
            })
        })
        .collect()
}
