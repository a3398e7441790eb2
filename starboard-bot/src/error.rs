//! Error taxonomy for the starboard core
//!
//! "Not configured" is an expected outcome for guilds that never ran setup,
//! so callers match on it and reply with guidance instead of logging it as a
//! failure. "Already in state" is not an error at all; it lives in the
//! outcome enums of the watch list manager.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StarboardError {
    /// No guild record yet, or the record has no board channel
    #[error("guild {guild_id} is not configured")]
    NotConfigured { guild_id: String },

    /// A chat platform call failed (network, permissions, rate limits)
    #[error("transport error: {0}")]
    Transport(String),

    /// The guild store failed to read or write
    #[error("store error: {0}")]
    Store(String),

    /// An external call did not finish in time
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl StarboardError {
    pub fn not_configured(guild_id: &str) -> Self {
        Self::NotConfigured {
            guild_id: guild_id.to_string(),
        }
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }

    /// Infrastructure failures that may succeed on the next trigger
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Store(_) | Self::Timeout { .. }
        )
    }
}

impl From<rusqlite::Error> for StarboardError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<serde_json::Error> for StarboardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Store(format!("document encoding: {}", e))
    }
}

impl From<serenity::Error> for StarboardError {
    fn from(e: serenity::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Run `fut` with a deadline, mapping elapsed time to [`StarboardError::Timeout`]
pub async fn with_timeout<F, T>(
    operation: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, StarboardError>
where
    F: std::future::Future<Output = Result<T, StarboardError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(StarboardError::Timeout { operation, after }),
    }
}
