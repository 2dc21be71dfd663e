//! Environment-driven bot configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "reminders.db";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_IO_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Register commands on a single guild (instant updates during development)
    pub discord_guild_id: Option<String>,
    pub database_path: String,
    pub log_level: String,
    /// How often the dispatcher looks for due reminders
    pub reminder_poll_interval_secs: u64,
    /// Upper bound for a single store or Discord call made by the dispatcher
    pub reminder_io_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment (call `dotenv()` first)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("DISCORD_TOKEN must be set"))?;

        let discord_guild_id = lookup("DISCORD_GUILD_ID").filter(|id| !id.trim().is_empty());

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let reminder_poll_interval_secs = parse_seconds(
            &lookup,
            "REMINDER_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        let reminder_io_timeout_secs =
            parse_seconds(&lookup, "REMINDER_IO_TIMEOUT_SECS", DEFAULT_IO_TIMEOUT_SECS)?;

        Ok(Self {
            discord_token,
            discord_guild_id,
            database_path,
            log_level,
            reminder_poll_interval_secs,
            reminder_io_timeout_secs,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_poll_interval_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.reminder_io_timeout_secs)
    }
}

fn parse_seconds<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'"))?;

    if secs == 0 {
        return Err(anyhow!("{key} must be at least 1 second"));
    }

    Ok(secs)
}
