use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::pins::sync::{PersistMode, SyncOptions};

pub const DEFAULT_COMMAND_PREFIX: &str = "s!";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a valid number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub command_prefix: String,
    /// Never unpin source messages (used against dev guilds)
    pub non_destructive: bool,
    /// Persist the mirror map after every post instead of once per pass
    pub persist_each_mirror: bool,
    pub store_timeout: Duration,
    pub transport_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        Ok(Self {
            discord_token,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "./.db/starboard.db".to_string()),
            command_prefix: lookup("COMMAND_PREFIX")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
            non_destructive: parse_flag(lookup("NON_DESTRUCTIVE")),
            persist_each_mirror: parse_flag(lookup("PERSIST_EACH_MIRROR")),
            store_timeout: parse_secs(&lookup, "STORE_TIMEOUT_SECS", 10)?,
            transport_timeout: parse_secs(&lookup, "TRANSPORT_TIMEOUT_SECS", 15)?,
            shutdown_grace: parse_secs(&lookup, "SHUTDOWN_GRACE_SECS", 30)?,
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            destructive: !self.non_destructive,
            persist: if self.persist_each_mirror {
                PersistMode::Incremental
            } else {
                PersistMode::Batch
            },
        }
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_secs<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(Duration::from_secs(default)),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
