//! Pin mirror synchronizer
//!
//! Mirrors every pinned message of a channel onto the guild's board, oldest
//! pin first, and records source -> mirror pairs so later passes skip them.
//!
//! A pass is not transactional. With [`PersistMode::Batch`] a crash between
//! the first post and the final write loses the records for that pass and the
//! next pass posts those pins again. [`PersistMode::Incremental`] writes after
//! every post, trading one write per mirror for a window of one message.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::StarboardError;
use crate::guild_store::{GuildLocks, GuildStore};
use crate::models::PinMirror;
use crate::pins::render::render_mirror;
use crate::pins::transport::ChatTransport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// One write per pass, only when something changed
    #[default]
    Batch,
    /// One write per successful post
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Unpin sources once mirrored
    pub destructive: bool,
    pub persist: PersistMode,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            destructive: true,
            persist: PersistMode::Batch,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pinned: usize,
    /// New mirrors, including re-posts of deleted ones
    pub posted: usize,
    /// Re-posts that replaced a record whose mirror was gone
    pub healed: usize,
    pub already_mirrored: usize,
    pub failed: usize,
    pub unpinned: usize,
    /// Stopped early because of shutdown
    pub interrupted: bool,
}

pub struct PinSynchronizer<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    locks: Arc<GuildLocks>,
    options: SyncOptions,
    shutdown: CancellationToken,
}

impl<S: GuildStore, T: ChatTransport> PinSynchronizer<S, T> {
    pub fn new(
        store: Arc<S>,
        transport: Arc<T>,
        locks: Arc<GuildLocks>,
        options: SyncOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            transport,
            locks,
            options,
            shutdown,
        }
    }

    pub async fn synchronize(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<SyncReport, StarboardError> {
        // Nothing is read or written until the fetch succeeds
        let pinned = self.transport.fetch_pinned_messages(channel_id).await?;

        let _guard = self.locks.lock(guild_id).await;

        let mut record = self
            .store
            .get(guild_id)
            .await?
            .ok_or_else(|| StarboardError::not_configured(guild_id))?;
        if !record.has_board() {
            return Err(StarboardError::not_configured(guild_id));
        }

        let mut report = SyncReport {
            pinned: pinned.len(),
            ..Default::default()
        };
        let mut dirty = false;

        // Platform order is newest first
        for msg in pinned.iter().rev() {
            if self.shutdown.is_cancelled() {
                log::info!(
                    "Starboard: shutdown requested, stopping sync of channel {} early",
                    channel_id
                );
                report.interrupted = true;
                break;
            }

            let stale = match record.position_of_mirror(channel_id, &msg.id) {
                Some(idx) => {
                    let existing = &record.pinned_messages[idx];
                    match self
                        .transport
                        .mirror_exists(&existing.mirror_channel_id, &existing.mirror_id)
                        .await
                    {
                        Ok(true) => {
                            report.already_mirrored += 1;
                            continue;
                        }
                        Ok(false) => {
                            log::warn!(
                                "Starboard: mirror {} of message {} is gone, posting again",
                                existing.mirror_id,
                                msg.id
                            );
                        }
                        Err(e) => {
                            log::warn!(
                                "Starboard: could not verify mirror {} of message {}, posting again: {}",
                                existing.mirror_id,
                                msg.id,
                                e
                            );
                        }
                    }
                    Some(idx)
                }
                None => None,
            };

            let embed = render_mirror(&record.id, msg);
            let posted = match self
                .transport
                .post_mirror(&record.board_channel_id, &embed)
                .await
            {
                Ok(posted) => posted,
                Err(e) => {
                    log::error!(
                        "Starboard: failed to mirror message {} from channel {}: {}",
                        msg.id,
                        channel_id,
                        e
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let entry = PinMirror {
                target_channel_id: channel_id.to_string(),
                target_id: msg.id.clone(),
                mirror_channel_id: posted.channel_id,
                mirror_id: posted.message_id,
            };
            match stale {
                Some(idx) => {
                    record.pinned_messages[idx] = entry;
                    report.healed += 1;
                }
                None => record.pinned_messages.push(entry),
            }
            report.posted += 1;

            match self.options.persist {
                PersistMode::Incremental => self.persist(guild_id, &record.pinned_messages).await?,
                PersistMode::Batch => dirty = true,
            }

            if self.options.destructive {
                match self.transport.unpin_message(channel_id, &msg.id).await {
                    Ok(()) => report.unpinned += 1,
                    Err(e) => log::warn!(
                        "Starboard: mirrored message {} but could not unpin it: {}",
                        msg.id,
                        e
                    ),
                }
            }
        }

        if dirty {
            self.persist(guild_id, &record.pinned_messages).await?;
        }

        log::info!(
            "Starboard: synced channel {} of guild {}: {:?}",
            channel_id,
            guild_id,
            report
        );
        Ok(report)
    }

    async fn persist(&self, guild_id: &str, mirrors: &[PinMirror]) -> Result<(), StarboardError> {
        self.store
            .set_pinned_messages(guild_id, mirrors)
            .await
            .inspect_err(|e| {
                log::error!(
                    "Starboard: failed to save pin mirrors for guild {}: {}",
                    guild_id,
                    e
                )
            })
    }
}
