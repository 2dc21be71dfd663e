//! # Conversation State Tracker
//!
//! Walks a user through day → time → message, one event at a time.
//!
//! Each user gets a slot holding at most one `Session`. The slot's async mutex
//! serializes that user's events; different users never wait on each other.
//! Idle slots are dropped after every event.

use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::choices::{day_choices, time_choices, Selection};
use super::model::Recurrence;
use super::resolver::{combine, correct_if_past, resolve_day, Clock, DaySelector};
use super::scheduler::ReminderScheduler;
use super::store::ReminderStore;
use crate::core::{ReminderError, ReminderResult};
use crate::gateway::{GatewayEvent, MessagingGateway, PromptRef, UserId};

const DAY_PROMPT: &str = "📅 When should I remind you?";
const MESSAGE_PROMPT: &str = "✏️ Now send me the text for the reminder.";

/// Where a user is in the reminder flow, with what has been collected so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    AwaitingDay,
    AwaitingTime {
        day: NaiveDate,
        recurrence: Recurrence,
    },
    AwaitingMessage {
        fire_at: NaiveDateTime,
        recurrence: Recurrence,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub owner: UserId,
    pub step: SessionStep,
    /// Last prompt with choices, edited in place as the flow advances
    pub prompt: Option<PromptRef>,
}

impl Session {
    fn new(owner: UserId) -> Self {
        Self {
            owner,
            step: SessionStep::AwaitingDay,
            prompt: None,
        }
    }
}

type SessionSlot = Arc<Mutex<Option<Session>>>;

/// Per-user reminder conversations
#[derive(Clone)]
pub struct ConversationTracker {
    sessions: Arc<DashMap<UserId, SessionSlot>>,
    store: Arc<dyn ReminderStore>,
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
    io_timeout: Duration,
}

impl ConversationTracker {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        scheduler: ReminderScheduler,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            store,
            scheduler,
            clock,
            io_timeout,
        }
    }

    /// Snapshot of a user's session, if one is active
    pub async fn session(&self, user_id: UserId) -> Option<Session> {
        let slot = self.sessions.get(&user_id).map(|s| Arc::clone(s.value()))?;
        let session = slot.lock().await;
        session.clone()
    }

    /// Number of users with a slot (active or being processed)
    pub fn active_users(&self) -> usize {
        self.sessions.len()
    }

    /// Process one inbound event to completion
    ///
    /// User-facing errors are reported to the user before being returned, so
    /// callers only need to log them.
    pub async fn handle_event(
        &self,
        gateway: &dyn MessagingGateway,
        event: GatewayEvent,
    ) -> ReminderResult<()> {
        let user_id = event.user_id();
        let slot = Arc::clone(&self.sessions.entry(user_id).or_default());

        let result = {
            let mut session = slot.lock().await;
            let result = self.apply(gateway, &mut session, event).await;
            if let Err(e) = &result {
                if e.discards_session() {
                    *session = None;
                }
                match e {
                    ReminderError::StoreUnavailable(_) => {
                        error!("Reminder store failed for user {user_id}: {e}")
                    }
                    _ => debug!("Reminder flow error for user {user_id}: {e}"),
                }
                if let Err(send_err) = self.deliver(gateway.send_text(user_id, e.user_notice())).await {
                    warn!("Could not tell user {user_id} about '{e}': {send_err}");
                }
            }
            result
        };

        drop(slot);
        self.release(user_id);
        result
    }

    /// Drop the user's slot if nobody is using it and it holds no session
    fn release(&self, user_id: UserId) {
        self.sessions.remove_if(&user_id, |_, slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .map(|session| session.is_none())
                    .unwrap_or(false)
        });
    }

    async fn apply(
        &self,
        gateway: &dyn MessagingGateway,
        session: &mut Option<Session>,
        event: GatewayEvent,
    ) -> ReminderResult<()> {
        match event {
            GatewayEvent::Start { user_id } => self.start(gateway, session, user_id).await,
            GatewayEvent::Selection {
                user_id,
                token,
                prompt,
            } => match token.parse::<Selection>()? {
                Selection::Day(selector) => {
                    self.choose_day(gateway, session, user_id, Some(selector), Recurrence::None, prompt)
                        .await
                }
                Selection::Repeat(recurrence) => {
                    self.choose_day(gateway, session, user_id, None, recurrence, prompt)
                        .await
                }
                Selection::Time { hour, minute } => {
                    self.choose_time(gateway, session, user_id, hour, minute, prompt)
                        .await
                }
            },
            GatewayEvent::Text { user_id, content } => {
                if content.trim_start().starts_with('/') {
                    self.cancel_if_awaiting_message(session, user_id);
                    Ok(())
                } else {
                    self.receive_text(gateway, session, user_id, &content).await
                }
            }
            GatewayEvent::Command { user_id, name } => {
                debug!("Command /{name} from user {user_id} during reminder flow check");
                self.cancel_if_awaiting_message(session, user_id);
                Ok(())
            }
        }
    }

    async fn start(
        &self,
        gateway: &dyn MessagingGateway,
        session: &mut Option<Session>,
        user_id: UserId,
    ) -> ReminderResult<()> {
        if session.is_some() {
            debug!("Replacing unfinished reminder session for user {user_id}");
        }
        *session = Some(Session::new(user_id));

        let choices = day_choices();
        let prompt = self
            .deliver(gateway.send_choices(user_id, DAY_PROMPT, &choices))
            .await?;

        if let Some(active) = session.as_mut() {
            active.prompt = Some(prompt);
        }
        info!("Started reminder session for user {user_id}");
        Ok(())
    }

    async fn choose_day(
        &self,
        gateway: &dyn MessagingGateway,
        session: &mut Option<Session>,
        user_id: UserId,
        selector: Option<DaySelector>,
        recurrence: Recurrence,
        prompt: Option<PromptRef>,
    ) -> ReminderResult<()> {
        let active = session.as_mut().ok_or(ReminderError::InvalidStep)?;

        let now = self.clock.now();
        let day = match selector {
            Some(selector) => resolve_day(selector, now),
            None => now.date(),
        };
        active.step = SessionStep::AwaitingTime { day, recurrence };

        let text = if recurrence.is_recurring() {
            format!("🔁 Repeating **{}**. Now choose a time:", recurrence.label())
        } else {
            format!("📅 **{}**. Now choose a time:", day.format("%A %d %B"))
        };

        let prompt = prompt.or(active.prompt);
        active.prompt = Some(self.show_choices(gateway, user_id, prompt, &text).await?);
        debug!("User {user_id} picked {day} ({recurrence})");
        Ok(())
    }

    /// Edit the existing prompt into the time menu, or send a fresh one
    async fn show_choices(
        &self,
        gateway: &dyn MessagingGateway,
        user_id: UserId,
        prompt: Option<PromptRef>,
        text: &str,
    ) -> ReminderResult<PromptRef> {
        let times = time_choices();
        if let Some(prompt) = prompt {
            match self
                .deliver(gateway.edit_prompt(user_id, prompt, text, Some(times.as_slice())))
                .await
            {
                Ok(()) => return Ok(prompt),
                Err(e) => warn!("Could not edit reminder prompt for user {user_id}: {e}"),
            }
        }
        self.deliver(gateway.send_choices(user_id, text, &times)).await
    }

    async fn choose_time(
        &self,
        gateway: &dyn MessagingGateway,
        session: &mut Option<Session>,
        user_id: UserId,
        hour: u32,
        minute: u32,
        prompt: Option<PromptRef>,
    ) -> ReminderResult<()> {
        let active = session.as_mut().ok_or(ReminderError::InvalidStep)?;
        let SessionStep::AwaitingTime { day, recurrence } = active.step else {
            return Err(ReminderError::InvalidStep);
        };

        let now = self.clock.now();
        let fire_at = correct_if_past(combine(day, hour, minute)?, recurrence, now)?;
        active.step = SessionStep::AwaitingMessage {
            fire_at,
            recurrence,
        };

        if let Some(prompt) = prompt.or(active.prompt) {
            let summary = format!("🕒 {}", describe(fire_at, recurrence));
            if let Err(e) = self
                .deliver(gateway.edit_prompt(user_id, prompt, &summary, None))
                .await
            {
                warn!("Could not close reminder prompt for user {user_id}: {e}");
            }
        }
        active.prompt = None;

        self.deliver(gateway.send_text(user_id, MESSAGE_PROMPT)).await?;
        debug!("User {user_id} picked {fire_at}, awaiting text");
        Ok(())
    }

    async fn receive_text(
        &self,
        gateway: &dyn MessagingGateway,
        session: &mut Option<Session>,
        user_id: UserId,
        content: &str,
    ) -> ReminderResult<()> {
        let Some(SessionStep::AwaitingMessage {
            fire_at,
            recurrence,
        }) = session.as_ref().map(|s| s.step)
        else {
            // Ordinary chat, not part of a reminder flow
            return Ok(());
        };

        let message = content.trim();
        if message.is_empty() {
            return Err(ReminderError::EmptyMessage);
        }

        let reminder = self
            .bounded(self.store.create(user_id, message, fire_at, recurrence))
            .await?;
        self.scheduler.schedule(&reminder).await;
        *session = None;

        info!(
            "Created reminder {} for user {} at {} ({})",
            reminder.id, user_id, reminder.fire_at, reminder.recurrence
        );

        let confirmation = format!(
            "✅ Reminder saved: \"{}\" for {}\n\n*Reminder ID: #{}*",
            reminder.message,
            describe(reminder.fire_at, reminder.recurrence),
            reminder.id
        );
        if let Err(e) = self.deliver(gateway.send_text(user_id, &confirmation)).await {
            warn!("Reminder {} saved but confirmation to user {user_id} failed: {e}", reminder.id);
        }
        Ok(())
    }

    fn cancel_if_awaiting_message(&self, session: &mut Option<Session>, user_id: UserId) {
        if matches!(
            session.as_ref().map(|s| s.step),
            Some(SessionStep::AwaitingMessage { .. })
        ) {
            *session = None;
            debug!("Cancelled reminder session for user {user_id} (command received)");
        }
    }

    /// Bound a store call; a timeout counts as the store being down
    async fn bounded<T, F>(&self, call: F) -> ReminderResult<T>
    where
        F: Future<Output = ReminderResult<T>>,
    {
        timeout(self.io_timeout, call).await.unwrap_or_else(|_| {
            Err(ReminderError::StoreUnavailable(format!(
                "call timed out after {:?}",
                self.io_timeout
            )))
        })
    }

    /// Bound a gateway call; a timeout counts as a failed delivery
    async fn deliver<T, F>(&self, call: F) -> ReminderResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match timeout(self.io_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ReminderError::DeliveryFailed(e.to_string())),
            Err(_) => Err(ReminderError::DeliveryFailed(format!(
                "timed out after {:?}",
                self.io_timeout
            ))),
        }
    }
}

/// "Friday 14 March 2025 at 09:00 (every week)"
fn describe(fire_at: NaiveDateTime, recurrence: Recurrence) -> String {
    let when = fire_at.format("%A %d %B %Y at %H:%M");
    if recurrence.is_recurring() {
        format!("{when} ({})", recurrence.label())
    } else {
        when.to_string()
    }
}
