//! Discord gateway event handler.
//!
//! Converts serenity events into [`Invocation`]s and sends the dispatcher's
//! replies back to the originating channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gw2link_domain::{ChannelId, MemberId, MessageId, ServerId};
use serenity::all::{
    ActivityData, Channel, Context, EventHandler, Guild, Message, Ready, UnavailableGuild,
};

use crate::api::dispatcher::{Dispatcher, Invocation, ServerRef};
use crate::api::reply::{chunk, MESSAGE_LIMIT};

/// Discord's snowflake epoch (2015-01-01T00:00:00Z), in milliseconds.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a Discord snowflake.
pub fn snowflake_time(id: u64) -> Option<DateTime<Utc>> {
    let millis = (id >> 22).checked_add(DISCORD_EPOCH_MS)?;
    DateTime::from_timestamp_millis(i64::try_from(millis).ok()?)
}

fn presence(server_count: usize) -> ActivityData {
    ActivityData::playing(format!("Serving {server_count} servers"))
}

pub struct Handler {
    dispatcher: Dispatcher,
}

impl Handler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    async fn invocation(&self, ctx: &Context, msg: &Message) -> Invocation {
        let server = msg.guild_id.map(|id| ServerRef {
            id: ServerId::new(id.get()),
            name: id.name(&ctx.cache).unwrap_or_default(),
        });
        let channel_name = match msg.channel_id.to_channel(ctx).await {
            Ok(Channel::Guild(channel)) => Some(channel.name),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(channel_id = %msg.channel_id, error = %e, "Failed to resolve channel");
                None
            }
        };

        Invocation {
            author: MemberId::new(msg.author.id.get()),
            author_is_bot: msg.author.bot,
            server,
            channel: ChannelId::new(msg.channel_id.get()),
            channel_name,
            message: MessageId::new(msg.id.get()),
            content: msg.content.clone(),
            sent_at: snowflake_time(msg.id.get()).unwrap_or_else(Utc::now),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(
            user = %ready.user.name,
            servers = ready.guilds.len(),
            "Connected to Discord"
        );
        ctx.set_activity(Some(presence(ready.guilds.len())));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || !self.dispatcher.is_command(&msg.content) {
            return;
        }
        let invocation = self.invocation(&ctx, &msg).await;
        let Some(reply) = self.dispatcher.dispatch(&invocation).await else {
            return;
        };
        for part in chunk(&reply, MESSAGE_LIMIT) {
            if let Err(e) = msg.channel_id.say(&ctx.http, part).await {
                tracing::error!(channel_id = %msg.channel_id, error = %e, "Failed to send reply");
                break;
            }
        }
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: Option<bool>) {
        if is_new == Some(true) {
            tracing::info!(server_id = %guild.id, server = %guild.name, "Joined server");
        }
        ctx.set_activity(Some(presence(ctx.cache.guild_count())));
    }

    async fn guild_delete(&self, ctx: Context, incomplete: UnavailableGuild, full: Option<Guild>) {
        if incomplete.unavailable {
            tracing::warn!(server_id = %incomplete.id, "Server became unavailable");
            return;
        }
        let name = full.map(|g| g.name).unwrap_or_default();
        tracing::info!(server_id = %incomplete.id, server = %name, "Left server");
        ctx.set_activity(Some(presence(ctx.cache.guild_count())));
    }
}
