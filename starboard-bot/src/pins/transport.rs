//! Chat transport capability
//!
//! Platform-agnostic view of the few chat primitives the synchronizer needs.
//! The Discord implementation lives in `channels::discord`.

use async_trait::async_trait;

use crate::error::StarboardError;
use crate::pins::render::MirrorEmbed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttachment {
    pub filename: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl SourceAttachment {
    /// Images are the attachments that report both dimensions
    pub fn has_positive_dimensions(&self) -> bool {
        matches!((self.width, self.height), (Some(w), Some(h)) if w > 0 && h > 0)
    }
}

/// A pinned message as seen by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: String,
    pub channel_id: String,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub attachments: Vec<SourceAttachment>,
}

/// Location of a message the transport posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Pinned messages of a channel, newest first
    async fn fetch_pinned_messages(
        &self,
        channel_id: &str,
    ) -> Result<Vec<SourceMessage>, StarboardError>;

    async fn post_mirror(
        &self,
        channel_id: &str,
        embed: &MirrorEmbed,
    ) -> Result<MessageRef, StarboardError>;

    /// `Ok(false)` when the platform reports the message as gone
    async fn mirror_exists(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool, StarboardError>;

    async fn unpin_message(&self, channel_id: &str, message_id: &str)
        -> Result<(), StarboardError>;

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), StarboardError>;
}
