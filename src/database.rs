//! # SQLite Reminder Store
//!
//! Durable storage for reminders. One connection behind an async mutex makes
//! every statement atomic with respect to the others, so the conversation flow
//! and the dispatcher can share it safely.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{info, warn};
use sqlite::{Connection, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::{ReminderError, ReminderResult};
use crate::features::reminders::model::{Recurrence, Reminder, ReminderId, TIMESTAMP_FORMAT};
use crate::features::reminders::store::ReminderStore;
use crate::gateway::UserId;

// AUTOINCREMENT keeps ids from being reused, so a stale fire event can never
// hit a newer reminder.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        message TEXT NOT NULL,
        fire_at TEXT NOT NULL,
        recurrence TEXT NOT NULL DEFAULT 'none',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_fire_at ON reminders(fire_at);
    CREATE INDEX IF NOT EXISTS idx_reminders_user ON reminders(user_id);
";

const SELECT_COLUMNS: &str = "SELECT id, user_id, message, fire_at, recurrence FROM reminders";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema
    pub async fn new(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(SCHEMA)?;
        info!("Opened reminder database at {path}");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    async fn query_reminders(
        &self,
        sql: &str,
        bind: impl FnOnce(&mut Statement) -> sqlite::Result<()> + Send,
    ) -> ReminderResult<Vec<Reminder>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(sql)?;
        bind(&mut statement)?;

        let mut reminders = Vec::new();
        while let State::Row = statement.next()? {
            match read_reminder(&statement) {
                Ok(reminder) => reminders.push(reminder),
                Err(e) => warn!("Skipping unreadable reminder row: {e}"),
            }
        }
        Ok(reminders)
    }
}

fn format_timestamp(instant: NaiveDateTime) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

fn read_reminder(statement: &Statement) -> ReminderResult<Reminder> {
    let id = statement.read::<i64, _>("id")?;
    let owner = statement.read::<i64, _>("user_id")? as UserId;
    let message = statement.read::<String, _>("message")?;
    let fire_at_raw = statement.read::<String, _>("fire_at")?;
    let recurrence_raw = statement.read::<String, _>("recurrence")?;

    let fire_at = NaiveDateTime::parse_from_str(&fire_at_raw, TIMESTAMP_FORMAT).map_err(|e| {
        ReminderError::StoreUnavailable(format!(
            "reminder {id} has malformed fire_at '{fire_at_raw}': {e}"
        ))
    })?;
    let recurrence = recurrence_raw
        .parse::<Recurrence>()
        .map_err(|e| ReminderError::StoreUnavailable(format!("reminder {id}: {e}")))?;

    Ok(Reminder {
        id,
        owner,
        message,
        fire_at,
        recurrence,
    })
}

/// Number of rows touched by the last statement on this connection
fn changes(connection: &Connection) -> ReminderResult<i64> {
    let mut statement = connection.prepare("SELECT changes()")?;
    statement.next()?;
    Ok(statement.read::<i64, _>(0)?)
}

#[async_trait]
impl ReminderStore for Database {
    async fn create(
        &self,
        owner: UserId,
        message: &str,
        fire_at: NaiveDateTime,
        recurrence: Recurrence,
    ) -> ReminderResult<Reminder> {
        let fire_at_str = format_timestamp(fire_at);
        let recurrence_str = recurrence.to_string();

        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO reminders (user_id, message, fire_at, recurrence) VALUES (?, ?, ?, ?)",
        )?;
        statement.bind((1, owner as i64))?;
        statement.bind((2, message))?;
        statement.bind((3, fire_at_str.as_str()))?;
        statement.bind((4, recurrence_str.as_str()))?;
        statement.next()?;

        let mut id_statement = connection.prepare("SELECT last_insert_rowid()")?;
        id_statement.next()?;
        let id = id_statement.read::<i64, _>(0)?;

        Ok(Reminder {
            id,
            owner,
            message: message.to_string(),
            fire_at,
            recurrence,
        })
    }

    async fn get(&self, id: ReminderId) -> ReminderResult<Option<Reminder>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let mut found = self
            .query_reminders(&sql, |s| s.bind((1, id)))
            .await?;
        Ok(found.pop())
    }

    async fn update(&self, id: ReminderId, fire_at: NaiveDateTime) -> ReminderResult<()> {
        let fire_at_str = format_timestamp(fire_at);

        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("UPDATE reminders SET fire_at = ? WHERE id = ?")?;
        statement.bind((1, fire_at_str.as_str()))?;
        statement.bind((2, id))?;
        statement.next()?;
        Ok(())
    }

    async fn delete(&self, id: ReminderId) -> ReminderResult<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("DELETE FROM reminders WHERE id = ?")?;
        statement.bind((1, id))?;
        statement.next()?;
        Ok(())
    }

    async fn delete_owned(&self, id: ReminderId, owner: UserId) -> ReminderResult<bool> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("DELETE FROM reminders WHERE id = ? AND user_id = ?")?;
        statement.bind((1, id))?;
        statement.bind((2, owner as i64))?;
        statement.next()?;
        drop(statement);

        Ok(changes(&connection)? > 0)
    }

    async fn list_for_owner(&self, owner: UserId) -> ReminderResult<Vec<Reminder>> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ? ORDER BY fire_at, id");
        self.query_reminders(&sql, |s| s.bind((1, owner as i64)))
            .await
    }

    async fn due(&self, at: NaiveDateTime) -> ReminderResult<Vec<Reminder>> {
        let sql = format!("{SELECT_COLUMNS} WHERE fire_at <= ? ORDER BY fire_at, id");
        let at_str = format_timestamp(at);
        self.query_reminders(&sql, |s| s.bind((1, at_str.as_str())))
            .await
    }

    async fn all(&self) -> ReminderResult<Vec<Reminder>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY fire_at, id");
        self.query_reminders(&sql, |_| Ok(())).await
    }
}
