//! Mirror rendering - turns a pinned message into the embed posted on the board
//!
//! Pure functions only, so everything here is testable without a gateway.

use chrono::{DateTime, TimeZone, Utc};

use crate::pins::transport::SourceMessage;

/// Discord's limit for an embed description
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01)
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEmbed {
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub description: String,
    pub image_url: Option<String>,
    pub footer: String,
}

/// Creation time embedded in a snowflake id
pub fn snowflake_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let raw: u64 = id.parse().ok()?;
    let ms = (raw >> 22) as i64 + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms).single()
}

pub fn message_link(guild_id: &str, channel_id: &str, message_id: &str) -> String {
    format!(
        "https://discord.com/channels/{}/{}/{}",
        guild_id, channel_id, message_id
    )
}

/// Render the board embed for `msg`, linking back into `guild_id`
pub fn render_mirror(guild_id: &str, msg: &SourceMessage) -> MirrorEmbed {
    let mut image_url = None;
    let mut appendix = String::new();

    // Only the first image becomes the lead image; everything else is a link
    for attachment in &msg.attachments {
        if image_url.is_none() && attachment.has_positive_dimensions() {
            image_url = Some(attachment.url.clone());
        } else {
            appendix.push_str(&format!("\n\n[{}]({})", attachment.filename, attachment.url));
        }
    }
    appendix.push_str(&format!(
        "\n\n[Link to message]({})",
        message_link(guild_id, &msg.channel_id, &msg.id)
    ));

    let footer = match snowflake_timestamp(&msg.id) {
        Some(created) => format!("MessageID: {} • {}", msg.id, created.format("%d/%m/%Y")),
        None => format!("MessageID: {}", msg.id),
    };

    MirrorEmbed {
        author_name: msg.author_name.clone(),
        author_icon_url: msg.author_avatar_url.clone(),
        description: fit_description(&msg.content, &appendix),
        image_url,
        footer,
    }
}

/// Join body and appendix within the description limit, cutting the body
/// first so the links survive
fn fit_description(body: &str, appendix: &str) -> String {
    let body_len = body.chars().count();
    let appendix_len = appendix.chars().count();

    if body_len + appendix_len <= MAX_DESCRIPTION_CHARS {
        return format!("{}{}", body, appendix);
    }

    if appendix_len < MAX_DESCRIPTION_CHARS {
        let budget = MAX_DESCRIPTION_CHARS - appendix_len - 1;
        let cut: String = body.chars().take(budget).collect();
        return format!("{}…{}", cut, appendix);
    }

    let full = format!("{}{}", body, appendix);
    let cut: String = full.chars().take(MAX_DESCRIPTION_CHARS - 1).collect();
    format!("{}…", cut)
}
