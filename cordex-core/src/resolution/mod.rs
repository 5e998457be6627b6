//! Entity resolution, supplied per invocation by the host.
//!
//! Converters never talk to the chat platform directly: they reduce a raw token to a [`Lookup`]
//! and walk an ordered list of [`ResolutionStrategy`] values, asking the [`ResolutionContext`] to
//! search each scope until one of them finds a match.

use std::fmt::Display;

use async_trait::async_trait;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;

use crate::command::errors::ConvertError;

pub mod memory;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Channel,
    Role,
    Message,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Message => "message",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a raw token refers to, once mentions and IDs are recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Id(u64),
    Name(&'a str),
}

/// A scope to search for an entity in. Strategies are tried in the order they are declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// The guild the command was invoked in. Skipped outside of guilds.
    CurrentGuild,
    /// Every guild shared with the invoking user. Only consulted outside of guilds.
    MutualGuilds,
}

/// Per-invocation view of the chat platform.
#[async_trait]
pub trait ResolutionContext: Send + Sync {
    fn author_id(&self) -> Id<UserMarker>;
    fn channel_id(&self) -> Id<ChannelMarker>;
    fn guild_id(&self) -> Option<Id<GuildMarker>>;

    async fn channel_is_nsfw(&self) -> anyhow::Result<bool>;
    /// Permissions of the invoking user in the current channel.
    async fn author_permissions(&self) -> anyhow::Result<Permissions>;
    /// Permissions of the bot itself in the current channel.
    async fn self_permissions(&self) -> anyhow::Result<Permissions>;
    async fn mutual_guilds(&self) -> anyhow::Result<Vec<Id<GuildMarker>>>;
    /// Searches a single guild for an entity, returning its ID if found.
    async fn find_entity(
        &self,
        kind: EntityKind,
        guild_id: Id<GuildMarker>,
        lookup: Lookup<'_>,
    ) -> anyhow::Result<Option<u64>>;
    /// Whether `message_id` exists in `channel_id` and is visible to the invoking user.
    async fn find_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> anyhow::Result<bool>;
}

/// Walks `strategies` in order and returns the first match.
pub async fn resolve_entity(
    ctxt: &dyn ResolutionContext,
    strategies: &[ResolutionStrategy],
    kind: EntityKind,
    lookup: Lookup<'_>,
) -> Result<u64, ConvertError> {
    for strategy in strategies {
        let guilds = match strategy {
            ResolutionStrategy::CurrentGuild => ctxt.guild_id().into_iter().collect::<Vec<_>>(),
            ResolutionStrategy::MutualGuilds if ctxt.guild_id().is_none() => {
                ctxt.mutual_guilds().await.map_err(ConvertError::Lookup)?
            },
            ResolutionStrategy::MutualGuilds => continue,
        };

        for guild_id in guilds {
            if let Some(id) = ctxt
                .find_entity(kind, guild_id, lookup)
                .await
                .map_err(ConvertError::Lookup)?
            {
                return Ok(id);
            }
        }
    }

    Err(ConvertError::NotFound(kind))
}
