use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;

use crate::command::argument::Argument;
use crate::command::arguments::{DurationArg, Text};
use crate::command::errors::SpecError;
use crate::command::metadata::CommandSpec;
use crate::command::parser::ParsedArguments;
use crate::command::{Command, CommandCtxt};

/// Reminders longer than this are refused.
const MAX_REMINDER: Duration = Duration::from_secs(60 * 60 * 24 * 7);

pub struct Remind(CommandSpec);

impl Remind {
    pub fn new() -> Result<Self, SpecError> {
        CommandSpec::builder("remind")
            .alias("reminder")
            .description("pings you after the given time")
            .example("1h30m take out the bins")
            .user_cooldown(Duration::from_secs(5))
            .argument(Argument::one("when", DurationArg))
            .argument(Argument::remainder("message", Text).default_value("something".to_owned()))
            .build()
            .map(Self)
    }
}

#[async_trait]
impl Command for Remind {
    fn metadata(&self) -> &CommandSpec {
        &self.0
    }

    async fn execute(&self, ctxt: CommandCtxt, mut args: ParsedArguments) -> anyhow::Result<()> {
        let when = args.take::<Duration>("when").context("when argument missing")?;
        let message = args.take::<String>("message").context("message argument missing")?;

        if when > MAX_REMINDER {
            // not the user's fault the invocation was wasted
            ctxt.revoke_cooldowns();
            bail!("reminders can be at most 7 days long");
        }

        ctxt.reply(format!("Okay, I'll remind you in {when:?}.")).await?;
        tokio::time::sleep(when).await;
        ctxt.reply(format!("<@{}> reminder: {message}", ctxt.author_id())).await
    }
}
