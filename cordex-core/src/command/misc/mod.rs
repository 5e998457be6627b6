use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::argument::Argument;
use super::arguments::{parsed, Colour, ColourArg, Text};
use super::errors::SpecError;
use super::metadata::CommandSpec;
use super::parser::ParsedArguments;
use super::registry::RegistryBuilder;
use super::{Command, CommandCtxt};

pub mod math;
pub mod moderation;
pub mod remind;

/// Registers every bundled command.
pub fn register_all(builder: RegistryBuilder) -> Result<RegistryBuilder, SpecError> {
    builder
        .register(Arc::new(Ping::new()?))?
        .register(Arc::new(Echo::new()?))?
        .register(Arc::new(Sum::new()?))?
        .register(Arc::new(ColourInfo::new()?))?
        .register(Arc::new(Help::new()?))?
        .register(Arc::new(remind::Remind::new()?))?
        .register(Arc::new(moderation::Kick::new()?))?
        .register(Arc::new(moderation::Slowmode::new()?))?
        .register(Arc::new(math::Math::new()?))
}

pub struct Ping(CommandSpec);

impl Ping {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("ping")
            .description("checks that the bot is responding")
            .user_cooldown(Duration::from_secs(1))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Ping {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, _: ParsedArguments) -> anyhow::Result<()> {
        let timings = ctxt.data.execution_timings;
        ctxt.reply(format!(
            "pong! (processing: {:?}, gate: {:?})",
            timings.processing_time_start.elapsed(),
            timings.gate_total
        ))
        .await
    }
}

pub struct Echo(CommandSpec);

impl Echo {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("echo")
            .alias("say")
            .description("repeats the given text")
            .example("hello world")
            .user_cooldown(Duration::from_secs(2))
            .argument(Argument::remainder("text", Text))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Echo {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, mut args: ParsedArguments) -> anyhow::Result<()> {
        let text = args.take::<String>("text").context("text argument missing")?;
        ctxt.reply(text).await
    }
}

pub struct Sum(CommandSpec);

impl Sum {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("sum")
            .alias("total")
            .description("adds up a list of integers")
            .example("1 2 3")
            .argument(Argument::list("numbers", parsed::<i64>()))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Sum {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()> {
        let total = args
            .list::<i64>("numbers")
            .into_iter()
            .try_fold(0i64, |acc, n| acc.checked_add(*n))
            .context("the sum does not fit into 64 bits")?;
        ctxt.reply(total.to_string()).await
    }
}

pub struct ColourInfo(CommandSpec);

impl ColourInfo {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("colour")
            .alias("color")
            .description("shows the components of a colour")
            .example("#ff8800")
            .example("orange")
            .argument(Argument::one("colour", ColourArg))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for ColourInfo {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()> {
        let colour = args.get::<Colour>("colour").context("colour argument missing")?;
        let (r, g, b) = colour.rgb();
        ctxt.reply(format!("{colour}: rgb({r}, {g}, {b})")).await
    }
}

pub struct Help(CommandSpec);

impl Help {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("help")
            .alias("commands")
            .description("lists commands, or shows details of one")
            .example("echo")
            .argument(Argument::optional("command", Text))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Help {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()> {
        let prefix = &ctxt.data.calling_prefix;
        let registry = &ctxt.cordex().registry;

        let Some(name) = args.get::<String>("command") else {
            let mut output = String::new();
            for command in registry.commands() {
                let meta = command.metadata();
                writeln!(output, "{prefix}{} - {}", meta.name, meta.description)?;
            }
            return ctxt.reply(output.trim_end()).await;
        };

        let Some(command) = registry.find(name) else {
            return ctxt.reply(format!("No command named `{name}`.")).await;
        };

        let meta = command.metadata();
        let mut output = format!("{prefix}{} {}\n{}", meta.name, meta.usage(), meta.description);
        if !meta.aliases.is_empty() {
            write!(output, "\nAliases: {}", meta.aliases.join(", "))?;
        }
        for sub in command.subcommands() {
            let sub = sub.metadata();
            write!(output, "\n  {} {} - {}", sub.name, sub.usage(), sub.description)?;
        }
        for example in &meta.examples {
            write!(output, "\nExample: {prefix}{} {example}", meta.name)?;
        }
        ctxt.reply(output).await
    }
}
