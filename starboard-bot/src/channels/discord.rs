use crate::channels::commands::Command;
use crate::config::Config;
use crate::error::{with_timeout, StarboardError};
use crate::guild_store::SqliteGuildStore;
use crate::pins::render::MirrorEmbed;
use crate::pins::transport::{ChatTransport, MessageRef, SourceAttachment, SourceMessage};
use crate::starboard::Starboard;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelPinsUpdateEvent, Client, Context, CreateEmbed, CreateEmbedAuthor,
    CreateEmbedFooter, CreateMessage, EventHandler, GatewayIntents, Http, Message, MessageId,
    Ready,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub type DiscordStarboard = Starboard<SqliteGuildStore, SerenityTransport>;

fn channel_id(id: &str) -> Result<ChannelId, StarboardError> {
    id.parse::<u64>()
        .ok()
        .filter(|v| *v != 0)
        .map(ChannelId::new)
        .ok_or_else(|| StarboardError::Transport(format!("invalid channel id '{}'", id)))
}

fn message_id(id: &str) -> Result<MessageId, StarboardError> {
    id.parse::<u64>()
        .ok()
        .filter(|v| *v != 0)
        .map(MessageId::new)
        .ok_or_else(|| StarboardError::Transport(format!("invalid message id '{}'", id)))
}

fn to_source_message(msg: &Message) -> SourceMessage {
    SourceMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        author_name: msg
            .author
            .global_name
            .clone()
            .unwrap_or_else(|| msg.author.name.clone()),
        author_avatar_url: Some(msg.author.face()),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| SourceAttachment {
                filename: a.filename.clone(),
                url: a.url.clone(),
                width: a.width.and_then(|w| u32::try_from(w).ok()),
                height: a.height.and_then(|h| u32::try_from(h).ok()),
            })
            .collect(),
    }
}

fn to_create_embed(embed: &MirrorEmbed) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(&embed.author_name);
    if let Some(icon) = &embed.author_icon_url {
        author = author.icon_url(icon);
    }

    let mut create = CreateEmbed::new()
        .author(author)
        .description(&embed.description)
        .footer(CreateEmbedFooter::new(&embed.footer));
    if let Some(url) = &embed.image_url {
        create = create.image(url);
    }
    create
}

fn is_not_found(e: &serenity::Error) -> bool {
    match e {
        serenity::Error::Http(http_err) => {
            http_err.status_code().map(|s| s.as_u16()) == Some(404)
        }
        _ => false,
    }
}

/// Discord REST calls behind [`ChatTransport`], each bounded by a timeout
pub struct SerenityTransport {
    http: Arc<Http>,
    timeout: Duration,
}

impl SerenityTransport {
    pub fn new(http: Arc<Http>, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl ChatTransport for SerenityTransport {
    async fn fetch_pinned_messages(
        &self,
        channel: &str,
    ) -> Result<Vec<SourceMessage>, StarboardError> {
        let channel = channel_id(channel)?;
        with_timeout("fetch pins", self.timeout, async {
            let pins = channel.pins(&self.http).await.map_err(StarboardError::from)?;
            Ok::<_, StarboardError>(pins.iter().map(to_source_message).collect())
        })
        .await
    }

    async fn post_mirror(
        &self,
        channel: &str,
        embed: &MirrorEmbed,
    ) -> Result<MessageRef, StarboardError> {
        let channel = channel_id(channel)?;
        with_timeout("post mirror", self.timeout, async {
            let sent = channel
                .send_message(&self.http, CreateMessage::new().embed(to_create_embed(embed)))
                .await
                .map_err(StarboardError::from)?;
            Ok::<_, StarboardError>(MessageRef {
                channel_id: sent.channel_id.to_string(),
                message_id: sent.id.to_string(),
            })
        })
        .await
    }

    async fn mirror_exists(&self, channel: &str, message: &str) -> Result<bool, StarboardError> {
        let channel = channel_id(channel)?;
        let message = message_id(message)?;
        with_timeout("fetch mirror", self.timeout, async {
            match channel.message(&self.http, message).await {
                Ok(_) => Ok(true),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(StarboardError::from(e)),
            }
        })
        .await
    }

    async fn unpin_message(&self, channel: &str, message: &str) -> Result<(), StarboardError> {
        let channel = channel_id(channel)?;
        let message = message_id(message)?;
        with_timeout("unpin", self.timeout, async {
            channel
                .unpin(&self.http, message)
                .await
                .map_err(StarboardError::from)
        })
        .await
    }

    async fn send_text(&self, channel: &str, text: &str) -> Result<(), StarboardError> {
        let channel = channel_id(channel)?;
        with_timeout("send message", self.timeout, async {
            channel
                .say(&self.http, text)
                .await
                .map(|_| ())
                .map_err(StarboardError::from)
        })
        .await
    }
}

struct DiscordHandler {
    starboard: Arc<DiscordStarboard>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn message(&self, _ctx: Context, msg: Message) {
        // Ignore messages from bots (including ourselves)
        if msg.author.bot || self.shutdown.is_cancelled() {
            return;
        }
        // Commands only make sense inside a guild
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(command) = Command::parse(&msg.content, self.starboard.prefix()) else {
            return;
        };

        log::info!(
            "Discord: {} command from {} ({}) in guild {} channel {}",
            command.as_str(),
            msg.author.name,
            msg.author.id,
            guild_id,
            msg.channel_id
        );

        self.tracker
            .track_future(self.starboard.handle_command(
                &guild_id.to_string(),
                &msg.channel_id.to_string(),
                command,
            ))
            .await;
    }

    async fn channel_pins_update(&self, _ctx: Context, pin: ChannelPinsUpdateEvent) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let Some(guild_id) = pin.guild_id else {
            return;
        };

        self.tracker
            .track_future(
                self.starboard
                    .handle_pins_update(&guild_id.to_string(), &pin.channel_id.to_string()),
            )
            .await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!(
            "Discord: Bot connected as {} ({} guilds)",
            ready.user.name,
            ready.guilds.len()
        );
    }
}

/// Run the Discord gateway until it fails or `shutdown` is cancelled.
///
/// On shutdown, in-flight handlers get `config.shutdown_grace` to finish
/// their current message before the shards are closed.
pub async fn start_discord_listener(
    config: &Config,
    starboard: Arc<DiscordStarboard>,
    shutdown: CancellationToken,
) -> Result<(), String> {
    // Set up intents - message content is needed to read commands
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let tracker = TaskTracker::new();
    let handler = DiscordHandler {
        starboard,
        tracker: tracker.clone(),
        shutdown: shutdown.clone(),
    };

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| format!("Failed to create Discord client: {}", e))?;

    log::info!("Discord: Client created successfully");

    // Get shard manager for shutdown
    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        _ = shutdown.cancelled() => {
            log::info!(
                "Discord: Shutdown signal received, waiting for {} in-flight handlers",
                tracker.len()
            );
            tracker.close();
            if tokio::time::timeout(config.shutdown_grace, tracker.wait()).await.is_err() {
                log::warn!(
                    "Discord: {} handlers still running after {}s, stopping anyway",
                    tracker.len(),
                    config.shutdown_grace.as_secs()
                );
            }
            shard_manager.shutdown_all().await;
            log::info!("Discord: Listener stopped");
        }
        result = client.start() => {
            if let Err(e) = result {
                let error = format!("Discord client error: {}", e);
                log::error!("{}", error);
                return Err(error);
            }
            log::info!("Discord: Listener stopped");
        }
    }

    Ok(())
}
