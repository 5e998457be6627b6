use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;

use super::{EntityKind, Lookup, ResolutionContext};

#[derive(Clone, Debug)]
struct Entity {
    id: u64,
    name: String,
}

/// An in-memory snapshot of guilds, their members, channels and roles.
///
/// Backs the console host and tests; a real deployment implements [`ResolutionContext`] on top of
/// the platform client instead.
#[derive(Default, Debug)]
pub struct MemoryDirectory {
    entities: HashMap<(u64, EntityKind), Vec<Entity>>,
    nsfw_channels: HashSet<u64>,
    permissions: HashMap<(u64, u64), Permissions>,
    members: HashMap<u64, Vec<u64>>,
    messages: HashSet<(u64, u64)>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, guild_id: u64, kind: EntityKind, id: u64, name: &str) -> &mut Self {
        self.entities.entry((guild_id, kind)).or_default().push(Entity {
            id,
            name: name.to_owned(),
        });
        if kind == EntityKind::User {
            self.members.entry(id).or_default().push(guild_id);
        }
        self
    }

    pub fn set_nsfw(&mut self, channel_id: u64) -> &mut Self {
        self.nsfw_channels.insert(channel_id);
        self
    }

    pub fn set_permissions(&mut self, guild_id: u64, user_id: u64, permissions: Permissions) -> &mut Self {
        self.permissions.insert((guild_id, user_id), permissions);
        self
    }

    pub fn add_message(&mut self, channel_id: u64, message_id: u64) -> &mut Self {
        self.messages.insert((channel_id, message_id));
        self
    }

    fn find(&self, kind: EntityKind, guild_id: u64, lookup: Lookup<'_>) -> Option<u64> {
        let entities = self.entities.get(&(guild_id, kind))?;
        entities
            .iter()
            .find(|e| match lookup {
                Lookup::Id(id) => e.id == id,
                Lookup::Name(name) => e.name.eq_ignore_ascii_case(name),
            })
            .map(|e| e.id)
    }
}

/// The [`ResolutionContext`] of one invocation, viewing a shared [`MemoryDirectory`].
#[derive(Clone, Debug)]
pub struct MemoryContext {
    pub directory: Arc<MemoryDirectory>,
    pub author_id: Id<UserMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub self_id: Id<UserMarker>,
}

#[async_trait]
impl ResolutionContext for MemoryContext {
    fn author_id(&self) -> Id<UserMarker> {
        self.author_id
    }

    fn channel_id(&self) -> Id<ChannelMarker> {
        self.channel_id
    }

    fn guild_id(&self) -> Option<Id<GuildMarker>> {
        self.guild_id
    }

    async fn channel_is_nsfw(&self) -> anyhow::Result<bool> {
        Ok(self.directory.nsfw_channels.contains(&self.channel_id.get()))
    }

    async fn author_permissions(&self) -> anyhow::Result<Permissions> {
        Ok(self
            .guild_id
            .and_then(|g| self.directory.permissions.get(&(g.get(), self.author_id.get())))
            .copied()
            .unwrap_or_else(Permissions::empty))
    }

    async fn self_permissions(&self) -> anyhow::Result<Permissions> {
        Ok(self
            .guild_id
            .and_then(|g| self.directory.permissions.get(&(g.get(), self.self_id.get())))
            .copied()
            .unwrap_or_else(Permissions::empty))
    }

    async fn mutual_guilds(&self) -> anyhow::Result<Vec<Id<GuildMarker>>> {
        Ok(self
            .directory
            .members
            .get(&self.author_id.get())
            .map(|guilds| guilds.iter().filter_map(|&g| Id::new_checked(g)).collect())
            .unwrap_or_default())
    }

    async fn find_entity(
        &self,
        kind: EntityKind,
        guild_id: Id<GuildMarker>,
        lookup: Lookup<'_>,
    ) -> anyhow::Result<Option<u64>> {
        Ok(self.directory.find(kind, guild_id.get(), lookup))
    }

    async fn find_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> anyhow::Result<bool> {
        Ok(self.directory.messages.contains(&(channel_id.get(), message_id.get())))
    }
}
