//! Guild state store - the persistence capability used by the starboard core
//!
//! The core only sees [`GuildStore`]. Production wires in [`SqliteGuildStore`],
//! which runs every call on the blocking pool under a timeout so a stalled
//! database cannot hold up event dispatch for other guilds.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::Database;
use crate::error::{with_timeout, StarboardError};
use crate::models::{GuildRecord, PinMirror};

#[async_trait]
pub trait GuildStore: Send + Sync {
    /// `Ok(None)` for guilds that never ran setup
    async fn get(&self, guild_id: &str) -> Result<Option<GuildRecord>, StarboardError>;

    async fn create(&self, record: &GuildRecord) -> Result<(), StarboardError>;

    async fn set_board_channel(&self, guild_id: &str, channel_id: &str)
        -> Result<(), StarboardError>;

    async fn set_watch_channels(
        &self,
        guild_id: &str,
        channels: &[String],
    ) -> Result<(), StarboardError>;

    async fn set_pinned_messages(
        &self,
        guild_id: &str,
        mirrors: &[PinMirror],
    ) -> Result<(), StarboardError>;
}

pub struct SqliteGuildStore {
    db: Arc<Database>,
    timeout: Duration,
}

impl SqliteGuildStore {
    pub fn new(db: Arc<Database>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T, StarboardError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        with_timeout(operation, self.timeout, async move {
            tokio::task::spawn_blocking(move || f(&db))
                .await
                .map_err(|e| StarboardError::Store(format!("{} task failed: {}", operation, e)))?
                .map_err(StarboardError::from)
        })
        .await
    }

    /// Run a targeted update and turn "no row matched" into `NotConfigured`
    async fn update<F>(
        &self,
        operation: &'static str,
        guild_id: &str,
        f: F,
    ) -> Result<(), StarboardError>
    where
        F: FnOnce(&Database) -> rusqlite::Result<bool> + Send + 'static,
    {
        if self.run(operation, f).await? {
            Ok(())
        } else {
            Err(StarboardError::not_configured(guild_id))
        }
    }
}

#[async_trait]
impl GuildStore for SqliteGuildStore {
    async fn get(&self, guild_id: &str) -> Result<Option<GuildRecord>, StarboardError> {
        let guild_id = guild_id.to_string();
        self.run("store get", move |db| db.get_guild(&guild_id)).await
    }

    async fn create(&self, record: &GuildRecord) -> Result<(), StarboardError> {
        let record = record.clone();
        self.run("store create", move |db| db.create_guild(&record))
            .await
    }

    async fn set_board_channel(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<(), StarboardError> {
        let (id, channel) = (guild_id.to_string(), channel_id.to_string());
        self.update("store set board", guild_id, move |db| {
            db.set_board_channel(&id, &channel)
        })
        .await
    }

    async fn set_watch_channels(
        &self,
        guild_id: &str,
        channels: &[String],
    ) -> Result<(), StarboardError> {
        let (id, channels) = (guild_id.to_string(), channels.to_vec());
        self.update("store set watch channels", guild_id, move |db| {
            db.set_watch_channels(&id, &channels)
        })
        .await
    }

    async fn set_pinned_messages(
        &self,
        guild_id: &str,
        mirrors: &[PinMirror],
    ) -> Result<(), StarboardError> {
        let (id, mirrors) = (guild_id.to_string(), mirrors.to_vec());
        self.update("store set pinned messages", guild_id, move |db| {
            db.set_pinned_messages(&id, &mirrors)
        })
        .await
    }
}

/// Per-guild mutual exclusion around read-modify-write cycles
///
/// Two pin notifications for the same guild would otherwise both read the
/// same mirror map, both post, and the later write would drop the earlier
/// mirror's record.
#[derive(Default)]
pub struct GuildLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, guild_id: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out before awaiting so the shard guard is released
        let lock = self
            .locks
            .entry(guild_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
