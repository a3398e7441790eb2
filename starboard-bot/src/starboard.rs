//! Starboard service - wires the watch list, pin filter and synchronizer
//! behind the two entry points the chat adapter calls

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::channels::commands::Command;
use crate::guild_store::{GuildLocks, GuildStore};
use crate::pins::sync::SyncOptions;
use crate::pins::{ChatTransport, FilterDecision, PinEventFilter, PinSynchronizer, SyncReport};
use crate::watchlist::{ConfigureOutcome, UnwatchOutcome, WatchListManager, WatchOutcome};

pub struct Starboard<S, T> {
    watchlist: WatchListManager<S>,
    filter: PinEventFilter<S>,
    synchronizer: PinSynchronizer<S, T>,
    transport: Arc<T>,
    prefix: String,
}

impl<S: GuildStore, T: ChatTransport> Starboard<S, T> {
    pub fn new(
        store: Arc<S>,
        transport: Arc<T>,
        options: SyncOptions,
        prefix: &str,
        shutdown: CancellationToken,
    ) -> Self {
        let locks = Arc::new(GuildLocks::new());
        Self {
            watchlist: WatchListManager::new(store.clone(), locks.clone()),
            filter: PinEventFilter::new(store.clone()),
            synchronizer: PinSynchronizer::new(store, transport.clone(), locks, options, shutdown),
            transport,
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Run a command and send exactly one reply to the channel it came from
    pub async fn handle_command(&self, guild_id: &str, channel_id: &str, command: Command) {
        let reply = self.reply_for(guild_id, channel_id, command).await;
        if let Err(e) = self.transport.send_text(channel_id, &reply).await {
            log::error!(
                "Discord: Failed to send {} reply to channel {}: {}",
                command.as_str(),
                channel_id,
                e
            );
        }
    }

    async fn reply_for(&self, guild_id: &str, channel_id: &str, command: Command) -> String {
        let result = match command {
            Command::Setup => self
                .watchlist
                .configure(guild_id, channel_id)
                .await
                .map(|outcome| match outcome {
                    ConfigureOutcome::Created => format!(
                        "This channel has been chosen as the Starboard.\nPlease run {}watch on channels that you want to monitor pins.",
                        self.prefix
                    ),
                    ConfigureOutcome::Updated => {
                        "This channel has been chosen as the Starboard.".to_string()
                    }
                }),
            Command::Watch => self
                .watchlist
                .watch(guild_id, channel_id)
                .await
                .map(|outcome| match outcome {
                    WatchOutcome::Watching => "I will be watching this channel from now.",
                    WatchOutcome::AlreadyWatching => "I've already been watching this channel",
                }.to_string()),
            Command::Unwatch => self
                .watchlist
                .unwatch(guild_id, channel_id)
                .await
                .map(|outcome| match outcome {
                    UnwatchOutcome::Unwatched => "I will stop watching this channel from now.",
                    UnwatchOutcome::NotWatching => "I've never been watching this channel",
                }.to_string()),
            Command::Migrate => self
                .synchronizer
                .synchronize(guild_id, channel_id)
                .await
                .map(|_| {
                    "Migrated this channel's pinned messages to Starboard successfully".to_string()
                }),
        };

        match result {
            Ok(reply) => reply,
            Err(e) if e.is_not_configured() => {
                format!("Please run {}setup on this guild.", self.prefix)
            }
            Err(e) => {
                log::error!(
                    "Starboard: {} failed in guild {} channel {}: {}",
                    command.as_str(),
                    guild_id,
                    channel_id,
                    e
                );
                format!(
                    "Sorry, I couldn't {} right now. Please try again later.",
                    command.as_str()
                )
            }
        }
    }

    /// Pin change notification. Failures are logged only; nobody is waiting.
    pub async fn handle_pins_update(&self, guild_id: &str, channel_id: &str) -> Option<SyncReport> {
        match self.filter.check(guild_id, channel_id).await {
            Ok(FilterDecision::Proceed) => {}
            Ok(FilterDecision::Ignore(_)) => return None,
            Err(e) => {
                log::error!(
                    "Starboard: could not load guild {} for pin event: {}",
                    guild_id,
                    e
                );
                return None;
            }
        }

        match self.synchronizer.synchronize(guild_id, channel_id).await {
            Ok(report) => Some(report),
            Err(e) => {
                // Transient failures are picked up again by the next pin change
                let level = if e.is_retryable() {
                    log::Level::Warn
                } else {
                    log::Level::Error
                };
                log::log!(
                    level,
                    "Starboard: pin sync failed for channel {} in guild {}: {}",
                    channel_id,
                    guild_id,
                    e
                );
                None
            }
        }
    }
}
