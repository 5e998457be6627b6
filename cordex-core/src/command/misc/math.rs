use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::command::argument::Argument;
use crate::command::arguments::parsed;
use crate::command::errors::SpecError;
use crate::command::metadata::CommandSpec;
use crate::command::parser::ParsedArguments;
use crate::command::{Command, CommandCtxt, TCommand};

/// A command group; invoked without a subcommand it lists them.
pub struct Math {
    spec: CommandSpec,
    subcommands: Vec<TCommand>,
}

impl Math {
    pub fn new() -> Result<Self, SpecError> {
        Ok(Self {
            spec: CommandSpec::builder("math")
                .description("integer arithmetic")
                .build()?,
            subcommands: vec![
                Arc::new(Fold::new("add", "adds integers", i64::checked_add)?),
                Arc::new(Fold::new("mul", "multiplies integers", i64::checked_mul)?),
            ],
        })
    }
}

#[async_trait]
impl Command for Math {
    fn metadata(&self) -> &CommandSpec {
        &self.spec
    }

    fn subcommands(&self) -> &[TCommand] {
        &self.subcommands
    }

    async fn execute(&self, ctxt: CommandCtxt, _: ParsedArguments) -> anyhow::Result<()> {
        let names = self
            .subcommands
            .iter()
            .map(|c| c.metadata().name.as_str())
            .collect::<Vec<_>>();
        ctxt.reply(format!("Available subcommands: {}", names.join(", "))).await
    }
}

/// Folds its arguments with a checked operation.
struct Fold {
    spec: CommandSpec,
    op: fn(i64, i64) -> Option<i64>,
}

impl Fold {
    fn new(name: &str, description: &str, op: fn(i64, i64) -> Option<i64>) -> Result<Self, SpecError> {
        Ok(Self {
            spec: CommandSpec::builder(name)
                .description(description)
                .user_cooldown(Duration::from_secs(2))
                .argument(Argument::one("first", parsed::<i64>()))
                .argument(Argument::list("rest", parsed::<i64>()).not_required())
                .build()?,
            op,
        })
    }
}

#[async_trait]
impl Command for Fold {
    fn metadata(&self) -> &CommandSpec {
        &self.spec
    }

    async fn execute(&self, ctxt: CommandCtxt, args: ParsedArguments) -> anyhow::Result<()> {
        let first = *args.get::<i64>("first").context("first argument missing")?;
        let result = args
            .list::<i64>("rest")
            .into_iter()
            .try_fold(first, |acc, n| (self.op)(acc, *n));

        match result {
            Some(result) => ctxt.reply(result.to_string()).await,
            None => {
                ctxt.revoke_cooldowns();
                ctxt.reply("The result overflowed, try smaller numbers.").await
            },
        }
    }
}
