//! In-memory chat transport for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::StarboardError;
use crate::pins::render::MirrorEmbed;
use crate::pins::transport::{ChatTransport, MessageRef, SourceMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchPins(String),
    Post { channel_id: String, embed: MirrorEmbed },
    Exists { channel_id: String, message_id: String },
    Unpin { channel_id: String, message_id: String },
    Text { channel_id: String, text: String },
}

#[derive(Default)]
struct FakeState {
    /// Newest first, like the platform
    pins: HashMap<String, Vec<SourceMessage>>,
    existing: HashSet<(String, String)>,
    fail_fetch: bool,
    fail_exists: bool,
    fail_unpin: bool,
    fail_posts_containing: Vec<String>,
    next_id: u64,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

pub fn source_message(channel_id: &str, id: &str, content: &str) -> SourceMessage {
    SourceMessage {
        id: id.into(),
        channel_id: channel_id.into(),
        author_name: "alice".into(),
        author_avatar_url: None,
        content: content.into(),
        attachments: Vec::new(),
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a message; later pins come first in fetch results
    pub fn pin(&self, msg: SourceMessage) {
        let mut state = self.state.lock().unwrap();
        state
            .pins
            .entry(msg.channel_id.clone())
            .or_default()
            .insert(0, msg);
    }

    pub fn delete_message(&self, channel_id: &str, message_id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .existing
            .remove(&(channel_id.to_string(), message_id.to_string()));
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetch = fail;
    }

    pub fn set_fail_exists(&self, fail: bool) {
        self.state.lock().unwrap().fail_exists = fail;
    }

    pub fn set_fail_unpin(&self, fail: bool) {
        self.state.lock().unwrap().fail_unpin = fail;
    }

    pub fn fail_posts_containing(&self, text: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_posts_containing
            .push(text.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn posts(&self) -> Vec<(String, MirrorEmbed)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Post { channel_id, embed } => Some((channel_id, embed)),
                _ => None,
            })
            .collect()
    }

    pub fn unpins(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Unpin {
                    channel_id,
                    message_id,
                } => Some((channel_id, message_id)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Text { channel_id, text } => Some((channel_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn pinned_ids(&self, channel_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .pins
            .get(channel_id)
            .map(|msgs| msgs.iter().map(|m| m.id.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn fetch_pinned_messages(
        &self,
        channel_id: &str,
    ) -> Result<Vec<SourceMessage>, StarboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FetchPins(channel_id.to_string()));
        if state.fail_fetch {
            return Err(StarboardError::Transport("403 Missing Access".into()));
        }
        Ok(state.pins.get(channel_id).cloned().unwrap_or_default())
    }

    async fn post_mirror(
        &self,
        channel_id: &str,
        embed: &MirrorEmbed,
    ) -> Result<MessageRef, StarboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Post {
            channel_id: channel_id.to_string(),
            embed: embed.clone(),
        });
        if state
            .fail_posts_containing
            .iter()
            .any(|t| embed.description.contains(t.as_str()))
        {
            return Err(StarboardError::Transport("500 Internal Server Error".into()));
        }
        state.next_id += 1;
        let message_id = format!("mirror-{}", state.next_id);
        state
            .existing
            .insert((channel_id.to_string(), message_id.clone()));
        Ok(MessageRef {
            channel_id: channel_id.to_string(),
            message_id,
        })
    }

    async fn mirror_exists(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool, StarboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Exists {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        });
        if state.fail_exists {
            return Err(StarboardError::Transport("502 Bad Gateway".into()));
        }
        Ok(state
            .existing
            .contains(&(channel_id.to_string(), message_id.to_string())))
    }

    async fn unpin_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), StarboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Unpin {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        });
        if state.fail_unpin {
            return Err(StarboardError::Transport("403 Missing Permissions".into()));
        }
        if let Some(pins) = state.pins.get_mut(channel_id) {
            pins.retain(|m| m.id != message_id);
        }
        Ok(())
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), StarboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Text {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
