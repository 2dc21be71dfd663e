//! # Date/Time Resolver
//!
//! Turns a symbolic day choice plus a clock time into an absolute local instant.
//! Everything here is pure; "now" is always passed in.
//!
//! Weekdays use the Sunday = 0 convention throughout.

use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime};

use super::model::Recurrence;
use crate::core::{ReminderError, ReminderResult};

/// Symbolic day picked by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelector {
    Today,
    Tomorrow,
    /// 0 = Sunday .. 6 = Saturday
    Weekday(u8),
}

/// Source of "now" for the tracker and dispatcher
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the host's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Resolve a day selector to a calendar date on or after today
pub fn resolve_day(selector: DaySelector, now: NaiveDateTime) -> NaiveDate {
    let today = now.date();
    let delta = match selector {
        DaySelector::Today => 0,
        DaySelector::Tomorrow => 1,
        DaySelector::Weekday(n) => {
            let current = now.weekday().num_days_from_sunday() as i64;
            (i64::from(n % 7) - current + 7) % 7
        }
    };
    today + Duration::days(delta)
}

/// Put a clock time on a date (seconds zeroed)
pub fn combine(date: NaiveDate, hour: u32, minute: u32) -> ReminderResult<NaiveDateTime> {
    date.and_hms_opt(hour, minute, 0)
        .ok_or_else(|| ReminderError::InvalidSelection(format!("{hour:02}:{minute:02}")))
}

/// Move an already-elapsed instant to its next occurrence
///
/// One-off reminders cannot be moved and fail with `PastTime`. Instants that
/// are not in the past are returned untouched.
pub fn correct_if_past(
    instant: NaiveDateTime,
    recurrence: Recurrence,
    now: NaiveDateTime,
) -> ReminderResult<NaiveDateTime> {
    if instant >= now {
        return Ok(instant);
    }
    advance(instant, recurrence).ok_or(ReminderError::PastTime)
}

/// Next occurrence after `instant`, or `None` for a one-off reminder
///
/// Monthly steps clamp to the last day of a shorter month, and the clamped
/// day is what later steps start from (Jan 31 -> Feb 28 -> Mar 28).
pub fn advance(instant: NaiveDateTime, recurrence: Recurrence) -> Option<NaiveDateTime> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => instant.checked_add_signed(Duration::days(1)),
        Recurrence::Weekly => instant.checked_add_signed(Duration::days(7)),
        Recurrence::Monthly => instant.checked_add_months(Months::new(1)),
    }
}

/// First occurrence strictly after `now`, stepping from `instant`
///
/// A reminder that was overdue by several periods (bot offline) skips the
/// missed occurrences instead of firing once per poll to catch up.
pub fn next_after(
    instant: NaiveDateTime,
    recurrence: Recurrence,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let mut next = advance(instant, recurrence)?;
    while next <= now {
        next = advance(next, recurrence)?;
    }
    Some(next)
}
