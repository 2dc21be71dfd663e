//! Shared fixtures for reminder tests

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

use super::model::{Recurrence, Reminder, ReminderId};
use super::resolver::Clock;
use super::store::ReminderStore;
use crate::core::{ReminderError, ReminderResult};
use crate::gateway::{Choice, MessagingGateway, PromptRef, UserId};

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub struct FixedClock(StdMutex<NaiveDateTime>);

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self(StdMutex::new(now))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

/// Gateway that records everything sent through it
#[derive(Default)]
pub struct RecordingGateway {
    texts: Mutex<Vec<(UserId, String)>>,
    prompts: Mutex<Vec<(UserId, String, Vec<Choice>)>>,
    edits: Mutex<Vec<(PromptRef, String, usize)>>,
    next_message_id: AtomicU64,
    failing: AtomicBool,
}

impl RecordingGateway {
    /// Make every outbound call fail until switched back
    pub fn fail_sends(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub async fn texts(&self) -> Vec<(UserId, String)> {
        self.texts.lock().await.clone()
    }

    pub async fn prompts(&self) -> Vec<(UserId, String, Vec<Choice>)> {
        self.prompts.lock().await.clone()
    }

    /// (prompt, new text, number of choices left on it)
    pub async fn edits(&self) -> Vec<(PromptRef, String, usize)> {
        self.edits.lock().await.clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("gateway offline");
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<()> {
        self.check()?;
        self.texts.lock().await.push((user_id, text.to_string()));
        Ok(())
    }

    async fn send_choices(
        &self,
        user_id: UserId,
        prompt: &str,
        choices: &[Choice],
    ) -> Result<PromptRef> {
        self.check()?;
        self.prompts
            .lock()
            .await
            .push((user_id, prompt.to_string(), choices.to_vec()));
        Ok(PromptRef {
            channel_id: user_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn edit_prompt(
        &self,
        _user_id: UserId,
        prompt: PromptRef,
        text: &str,
        choices: Option<&[Choice]>,
    ) -> Result<()> {
        self.check()?;
        self.edits
            .lock()
            .await
            .push((prompt, text.to_string(), choices.map_or(0, |c| c.len())));
        Ok(())
    }
}

/// Store whose backend is always down
pub struct FailingStore;

fn down<T>() -> ReminderResult<T> {
    Err(ReminderError::StoreUnavailable("database is locked".into()))
}

#[async_trait]
impl ReminderStore for FailingStore {
    async fn create(
        &self,
        _owner: UserId,
        _message: &str,
        _fire_at: NaiveDateTime,
        _recurrence: Recurrence,
    ) -> ReminderResult<Reminder> {
        down()
    }

    async fn get(&self, _id: ReminderId) -> ReminderResult<Option<Reminder>> {
        down()
    }

    async fn update(&self, _id: ReminderId, _fire_at: NaiveDateTime) -> ReminderResult<()> {
        down()
    }

    async fn delete(&self, _id: ReminderId) -> ReminderResult<()> {
        down()
    }

    async fn delete_owned(&self, _id: ReminderId, _owner: UserId) -> ReminderResult<bool> {
        down()
    }

    async fn list_for_owner(&self, _owner: UserId) -> ReminderResult<Vec<Reminder>> {
        down()
    }

    async fn due(&self, _at: NaiveDateTime) -> ReminderResult<Vec<Reminder>> {
        down()
    }

    async fn all(&self) -> ReminderResult<Vec<Reminder>> {
        down()
    }
}

/// Gateway that never answers
pub struct StalledGateway;

#[async_trait]
impl MessagingGateway for StalledGateway {
    async fn send_text(&self, _user_id: UserId, _text: &str) -> Result<()> {
        std::future::pending().await
    }

    async fn send_choices(
        &self,
        _user_id: UserId,
        _prompt: &str,
        _choices: &[Choice],
    ) -> Result<PromptRef> {
        std::future::pending().await
    }

    async fn edit_prompt(
        &self,
        _user_id: UserId,
        _prompt: PromptRef,
        _text: &str,
        _choices: Option<&[Choice]>,
    ) -> Result<()> {
        std::future::pending().await
    }
}

/// Store whose writes hang (a stuck lock on the database file)
pub struct StalledStore;

#[async_trait]
impl ReminderStore for StalledStore {
    async fn create(
        &self,
        _owner: UserId,
        _message: &str,
        _fire_at: NaiveDateTime,
        _recurrence: Recurrence,
    ) -> ReminderResult<Reminder> {
        std::future::pending().await
    }

    async fn get(&self, _id: ReminderId) -> ReminderResult<Option<Reminder>> {
        std::future::pending().await
    }

    async fn update(&self, _id: ReminderId, _fire_at: NaiveDateTime) -> ReminderResult<()> {
        std::future::pending().await
    }

    async fn delete(&self, _id: ReminderId) -> ReminderResult<()> {
        std::future::pending().await
    }

    async fn delete_owned(&self, _id: ReminderId, _owner: UserId) -> ReminderResult<bool> {
        std::future::pending().await
    }

    async fn list_for_owner(&self, _owner: UserId) -> ReminderResult<Vec<Reminder>> {
        std::future::pending().await
    }

    async fn due(&self, _at: NaiveDateTime) -> ReminderResult<Vec<Reminder>> {
        std::future::pending().await
    }

    async fn all(&self) -> ReminderResult<Vec<Reminder>> {
        std::future::pending().await
    }
}
