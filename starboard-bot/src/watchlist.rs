//! Watch list manager - board setup and the per-guild set of watched channels

use std::sync::Arc;

use crate::error::StarboardError;
use crate::guild_store::{GuildLocks, GuildStore};
use crate::models::GuildRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Watching,
    AlreadyWatching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwatchOutcome {
    Unwatched,
    NotWatching,
}

pub struct WatchListManager<S> {
    store: Arc<S>,
    locks: Arc<GuildLocks>,
}

impl<S: GuildStore> WatchListManager<S> {
    pub fn new(store: Arc<S>, locks: Arc<GuildLocks>) -> Self {
        Self { store, locks }
    }

    /// Make `channel_id` the guild's board, creating the record on first use
    pub async fn configure(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<ConfigureOutcome, StarboardError> {
        let _guard = self.locks.lock(guild_id).await;

        match self.store.get(guild_id).await? {
            None => {
                self.store
                    .create(&GuildRecord::new(guild_id, channel_id))
                    .await?;
                log::info!("Starboard: guild {} set up with board {}", guild_id, channel_id);
                Ok(ConfigureOutcome::Created)
            }
            Some(_) => {
                self.store.set_board_channel(guild_id, channel_id).await?;
                log::info!("Starboard: guild {} moved board to {}", guild_id, channel_id);
                Ok(ConfigureOutcome::Updated)
            }
        }
    }

    pub async fn watch(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<WatchOutcome, StarboardError> {
        let _guard = self.locks.lock(guild_id).await;
        let mut record = self.load(guild_id).await?;

        if record.add_watch(channel_id) {
            return Ok(WatchOutcome::AlreadyWatching);
        }
        self.store
            .set_watch_channels(guild_id, &record.watch_channels)
            .await?;
        log::info!("Starboard: guild {} now watching {}", guild_id, channel_id);
        Ok(WatchOutcome::Watching)
    }

    pub async fn unwatch(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<UnwatchOutcome, StarboardError> {
        let _guard = self.locks.lock(guild_id).await;
        let mut record = self.load(guild_id).await?;

        if !record.remove_watch(channel_id) {
            return Ok(UnwatchOutcome::NotWatching);
        }
        self.store
            .set_watch_channels(guild_id, &record.watch_channels)
            .await?;
        log::info!("Starboard: guild {} stopped watching {}", guild_id, channel_id);
        Ok(UnwatchOutcome::Unwatched)
    }

    async fn load(&self, guild_id: &str) -> Result<GuildRecord, StarboardError> {
        self.store
            .get(guild_id)
            .await?
            .ok_or_else(|| StarboardError::not_configured(guild_id))
    }
}
