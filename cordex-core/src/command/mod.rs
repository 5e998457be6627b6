//! The command system.
//!
//! The key things that make up the command system are:
//!
//! - The [`Command`] trait: exposes a command's [`metadata::CommandSpec`] and the `execute` method
//!   that runs its body. Commands are stored as trait objects ([`TCommand`]) in the
//!   [`registry::Registry`], keyed by name and alias.
//!
//! - The [`arguments::Converter`] trait: turns one raw string into a typed value. Converters are
//!   wrapped by [`argument::Argument`], which adds multiplicity, defaults and choices, and
//!   collected into a command's spec.
//!
//! - The [`gate`]: checks an invocation against its spec (scope, NSFW, permissions, cooldowns)
//!   and finally parses its arguments with the [`parser`]. Only an invocation that passes the gate
//!   reaches `execute`.
//!
//! - The [`suggest`]er: proposes near-miss command names when a name is not registered.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;

use self::gate::StartedCooldown;
use self::metadata::CommandSpec;
use self::parser::ParsedArguments;
use crate::cordex::ThreadSafeCordex;
use crate::dispatcher::reply::Responder;
use crate::resolution::ResolutionContext;

pub mod argument;
pub mod arguments;
pub mod errors;
pub mod gate;
pub mod group;
pub mod metadata;
pub mod misc;
pub mod parser;
pub mod registry;
pub mod suggest;
pub mod tokenizer;

/// A command that can be executed.
// used as a trait object, so AFIT is not an option
#[async_trait]
pub trait Command: Send + Sync {
    /// Returns the **direct** metadata.
    ///
    /// For a command group this is the metadata of the group itself, not of any subcommand.
    fn metadata(&self) -> &CommandSpec;

    /// Direct subcommands, if this is a command group.
    fn subcommands(&self) -> &[TCommand] {
        &[]
    }

    /// Runs the command body. Only called once every check of the gate has passed.
    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()>;
}

/// Just a type alias for a command as a trait object.
/// See [Command] for more documentation.
pub type TCommand = Arc<dyn Command>;

/// Where an invocation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// A prefixed text message.
    Text,
    /// A structured (slash-style) invocation with named options.
    Structured,
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Structured => "structured",
        })
    }
}

/// A set of timings used to diagnose slow areas of dispatch.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionTimings {
    /// Instant full command processing started.
    pub processing_time_start: Instant,
    /// Total time spent in the gate, including argument parsing.
    pub gate_total: Duration,
}

/// Per-invocation data, shared by every clone of a [`CommandCtxt`].
pub struct CommandData {
    pub cordex: ThreadSafeCordex,
    pub source: Source,
    /// Empty for structured invocations.
    pub calling_prefix: String,
    /// Full path of the invoked command, e.g. `tag create`.
    pub command_path: String,
    pub resolution: Arc<dyn ResolutionContext>,
    pub responder: Arc<dyn Responder>,
    pub started_cooldowns: Vec<StartedCooldown>,
    pub execution_timings: ExecutionTimings,
}

#[derive(Clone)]
pub struct CommandCtxt {
    pub data: Arc<CommandData>,
}

impl CommandCtxt {
    pub fn new(data: CommandData) -> Self {
        Self { data: Arc::new(data) }
    }

    pub async fn reply(&self, content: impl Into<String>) -> anyhow::Result<()> {
        self.data.responder.reply(&content.into()).await
    }

    pub fn cordex(&self) -> &ThreadSafeCordex {
        &self.data.cordex
    }

    pub fn resolution(&self) -> &dyn ResolutionContext {
        &*self.data.resolution
    }

    pub fn author_id(&self) -> Id<UserMarker> {
        self.data.resolution.author_id()
    }

    pub fn channel_id(&self) -> Id<ChannelMarker> {
        self.data.resolution.channel_id()
    }

    pub fn guild_id(&self) -> Option<Id<GuildMarker>> {
        self.data.resolution.guild_id()
    }

    /// Removes every cooldown window this invocation started, so it does not count against the
    /// user. Windows started since by other invocations are kept. Returns how many windows were
    /// removed.
    pub fn revoke_cooldowns(&self) -> usize {
        let cooldowns = &self.data.cordex.cooldowns;
        self.data
            .started_cooldowns
            .iter()
            .filter(|c| cooldowns.revoke(c.scope, &c.command, c.subject, c.start).is_some())
            .count()
    }
}
