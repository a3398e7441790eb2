//! Pin event filter
//!
//! Pin notifications arrive for every channel the bot can see. Only watched
//! channels of configured guilds are worth a pin fetch.

use std::sync::Arc;

use crate::error::StarboardError;
use crate::guild_store::GuildStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Unconfigured,
    NotWatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Proceed,
    Ignore(IgnoreReason),
}

pub struct PinEventFilter<S> {
    store: Arc<S>,
}

impl<S: GuildStore> PinEventFilter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn check(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<FilterDecision, StarboardError> {
        let decision = match self.store.get(guild_id).await? {
            None => FilterDecision::Ignore(IgnoreReason::Unconfigured),
            Some(record) if !record.is_watching(channel_id) => {
                FilterDecision::Ignore(IgnoreReason::NotWatched)
            }
            Some(_) => FilterDecision::Proceed,
        };

        log::debug!(
            "Starboard: pin event guild={} channel={} -> {:?}",
            guild_id,
            channel_id,
            decision
        );
        Ok(decision)
    }
}
