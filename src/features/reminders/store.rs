//! Reminder persistence boundary

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::model::{Recurrence, Reminder, ReminderId};
use crate::core::ReminderResult;
use crate::gateway::UserId;

/// Durable storage for reminder records
///
/// Implementations hold no business logic. Every method is a single atomic
/// operation on one record (or a read); failures surface as
/// `ReminderError::StoreUnavailable`.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persist a new reminder and return it with its assigned id
    async fn create(
        &self,
        owner: UserId,
        message: &str,
        fire_at: NaiveDateTime,
        recurrence: Recurrence,
    ) -> ReminderResult<Reminder>;

    async fn get(&self, id: ReminderId) -> ReminderResult<Option<Reminder>>;

    /// Rewrite the next fire time of a recurring reminder
    async fn update(&self, id: ReminderId, fire_at: NaiveDateTime) -> ReminderResult<()>;

    /// Remove a reminder; removing a missing id is not an error
    async fn delete(&self, id: ReminderId) -> ReminderResult<()>;

    /// Remove a reminder only if `owner` owns it; returns whether a row was removed
    async fn delete_owned(&self, id: ReminderId, owner: UserId) -> ReminderResult<bool>;

    /// A user's reminders, soonest first
    async fn list_for_owner(&self, owner: UserId) -> ReminderResult<Vec<Reminder>>;

    /// Every reminder due at or before `at`, soonest first
    async fn due(&self, at: NaiveDateTime) -> ReminderResult<Vec<Reminder>>;

    /// Every stored reminder, soonest first
    async fn all(&self) -> ReminderResult<Vec<Reminder>>;
}
