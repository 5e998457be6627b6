use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

use crate::command::argument::Argument;
use crate::command::arguments::{user, Mapped, Text};
use crate::command::errors::SpecError;
use crate::command::metadata::CommandSpec;
use crate::command::parser::ParsedArguments;
use crate::command::{Command, CommandCtxt};

pub struct Kick(CommandSpec);

impl Kick {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("kick")
            .description("removes a member from the server")
            .example("@someone spamming")
            .guild_only()
            .required_permissions(Permissions::KICK_MEMBERS)
            .required_self_permissions(Permissions::KICK_MEMBERS)
            .guild_cooldown(Duration::from_secs(3))
            .argument(Argument::one("member", user()))
            .argument(Argument::remainder("reason", Text).not_required())
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Kick {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()> {
        let member = args.get::<Id<UserMarker>>("member").context("member argument missing")?;
        let reason = args.get::<String>("reason").map_or("no reason given", String::as_str);
        ctxt.reply(format!("Kicked <@{member}> ({reason}).")).await
    }
}

pub struct Slowmode(CommandSpec);

impl Slowmode {
    pub fn new() -> Result<Self, SpecError> {
        let levels = Mapped::new([
            ("off", Duration::ZERO),
            ("low", Duration::from_secs(5)),
            ("high", Duration::from_secs(30)),
        ])
        .ignore_case();

        CommandSpec::builder("slowmode")
            .description("sets the slowmode of the current channel")
            .example("low")
            .guild_only()
            .required_permissions(Permissions::MANAGE_CHANNELS)
            .required_self_permissions(Permissions::MANAGE_CHANNELS)
            .channel_cooldown(Duration::from_secs(10))
            .argument(Argument::one("level", levels))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Slowmode {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()> {
        let level = args.get::<Duration>("level").context("level argument missing")?;
        if level.is_zero() {
            ctxt.reply(format!("Slowmode disabled in <#{}>.", ctxt.channel_id())).await
        } else {
            ctxt.reply(format!("Slowmode in <#{}> set to {level:?}.", ctxt.channel_id()))
                .await
        }
    }
}
