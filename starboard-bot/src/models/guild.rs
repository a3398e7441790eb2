use serde::{Deserialize, Serialize};

/// One mirrored pin: where the original lives and where its copy was posted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMirror {
    pub target_channel_id: String,
    pub target_id: String,
    pub mirror_channel_id: String,
    pub mirror_id: String,
}

impl PinMirror {
    pub fn is_for(&self, channel_id: &str, message_id: &str) -> bool {
        self.target_channel_id == channel_id && self.target_id == message_id
    }
}

/// Persisted per-guild state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRecord {
    pub id: String,
    /// Empty until the guild runs setup
    pub board_channel_id: String,
    /// Unique channel ids; `add_watch` is the only way in
    pub watch_channels: Vec<String>,
    /// Discovery order
    pub pinned_messages: Vec<PinMirror>,
}

impl GuildRecord {
    pub fn new(id: impl Into<String>, board_channel_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            board_channel_id: board_channel_id.into(),
            watch_channels: Vec::new(),
            pinned_messages: Vec::new(),
        }
    }

    pub fn has_board(&self) -> bool {
        !self.board_channel_id.is_empty()
    }

    pub fn is_watching(&self, channel_id: &str) -> bool {
        self.watch_channels.iter().any(|c| c == channel_id)
    }

    /// Add a channel to the watch set. Returns `true` if it was already there.
    pub fn add_watch(&mut self, channel_id: &str) -> bool {
        if self.is_watching(channel_id) {
            return true;
        }
        self.watch_channels.push(channel_id.to_string());
        false
    }

    /// Remove a channel from the watch set. Returns `true` if it was present.
    pub fn remove_watch(&mut self, channel_id: &str) -> bool {
        match self.watch_channels.iter().position(|c| c == channel_id) {
            Some(idx) => {
                self.watch_channels.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Index of the recorded mirror for a source message, if any
    pub fn position_of_mirror(&self, channel_id: &str, message_id: &str) -> Option<usize> {
        self.pinned_messages
            .iter()
            .position(|p| p.is_for(channel_id, message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_watching(channels: &[&str]) -> GuildRecord {
        let mut record = GuildRecord::new("g1", "board");
        record.watch_channels = channels.iter().map(|c| c.to_string()).collect();
        record
    }

    #[test]
    fn test_add_watch_twice_keeps_one_entry() {
        let mut record = GuildRecord::new("g1", "board");
        assert!(!record.add_watch("c1"));
        assert!(record.add_watch("c1"));
        assert_eq!(record.watch_channels, vec!["c1"]);
        assert!(record.is_watching("c1"));
        assert!(!record.is_watching("c2"));
    }

    #[test]
    fn test_remove_first() {
        let mut record = record_watching(&["a", "b", "c"]);
        assert!(record.remove_watch("a"));
        assert_eq!(record.watch_channels, vec!["b", "c"]);
    }

    #[test]
    fn test_remove_middle() {
        let mut record = record_watching(&["a", "b", "c"]);
        assert!(record.remove_watch("b"));
        assert_eq!(record.watch_channels, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_last() {
        let mut record = record_watching(&["a", "b", "c"]);
        assert!(record.remove_watch("c"));
        assert_eq!(record.watch_channels, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_only() {
        let mut record = record_watching(&["a"]);
        assert!(record.remove_watch("a"));
        assert!(record.watch_channels.is_empty());
    }

    #[test]
    fn test_remove_absent_leaves_set_unchanged() {
        let mut record = record_watching(&["a", "b"]);
        assert!(!record.remove_watch("z"));
        assert_eq!(record.watch_channels, vec!["a", "b"]);

        let mut empty = record_watching(&[]);
        assert!(!empty.remove_watch("a"));
        assert!(empty.watch_channels.is_empty());
    }

    #[test]
    fn test_position_of_mirror_matches_composite_key() {
        let mut record = GuildRecord::new("g1", "board");
        record.pinned_messages.push(PinMirror {
            target_channel_id: "c1".into(),
            target_id: "m1".into(),
            mirror_channel_id: "board".into(),
            mirror_id: "x1".into(),
        });

        assert_eq!(record.position_of_mirror("c1", "m1"), Some(0));
        // Same message id in another channel is a different pin
        assert_eq!(record.position_of_mirror("c2", "m1"), None);
        assert_eq!(record.position_of_mirror("c1", "m2"), None);
    }

    #[test]
    fn test_document_field_names() {
        let mirror = PinMirror {
            target_channel_id: "c".into(),
            target_id: "m".into(),
            mirror_channel_id: "b".into(),
            mirror_id: "x".into(),
        };
        let json = serde_json::to_value(&mirror).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "target_channel_id": "c",
                "target_id": "m",
                "mirror_channel_id": "b",
                "mirror_id": "x"
            })
        );
    }
}
