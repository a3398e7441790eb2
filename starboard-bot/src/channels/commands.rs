//! Chat command triggers
//!
//! Only exact matches count: `s!watch` triggers, `s!watch please` does not.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Make the current channel the board
    Setup,
    Watch,
    Unwatch,
    /// Mirror the current channel's pins right now
    Migrate,
}

impl Command {
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        match content.trim().strip_prefix(prefix)? {
            "setup" => Some(Self::Setup),
            "watch" => Some(Self::Watch),
            "unwatch" => Some(Self::Unwatch),
            "migrate" => Some(Self::Migrate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Watch => "watch",
            Self::Unwatch => "unwatch",
            Self::Migrate => "migrate",
        }
    }
}
