//! The execution gate: every check a command invocation has to pass before its handler may run.
//!
//! Checks run in a fixed order and the first failure is the only one reported:
//!
//! 1. guild-only commands outside of a guild
//! 2. NSFW commands outside of an NSFW channel
//! 3. permissions of the invoking user, then of the bot
//! 4. guild, user and channel cooldowns, in that order
//! 5. argument parsing
//!
//! Each cooldown window is started as soon as its own check passes, so a command that is rejected
//! later in the sequence (or whose handler fails) still counts against the cooldown.

use tokio::time::Instant;
use tracing::{debug, warn};
use twilight_model::guild::Permissions;

use super::errors::Rejection;
use super::metadata::CommandSpec;
use super::parser::{parse, parse_options, ParsedArguments};
use crate::cooldowns::{CooldownScope, CooldownTracker};
use crate::resolution::ResolutionContext;

/// The raw arguments of an invocation.
#[derive(Clone, Copy, Debug)]
pub enum Invocation<'a> {
    /// Whitespace-separated tokens following the command name.
    Tokens(&'a [&'a str]),
    /// Named options from a structured invocation.
    Options(&'a [(String, String)]),
}

/// A cooldown window started while passing the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartedCooldown {
    pub scope: CooldownScope,
    pub command: String,
    pub subject: u64,
    /// Identifies the window, so revoking it cannot remove a newer one.
    pub start: Instant,
}

#[derive(Debug)]
pub struct GatePass {
    pub args: ParsedArguments,
    pub started_cooldowns: Vec<StartedCooldown>,
}

/// Cooldown bookkeeping for one pass through the gate.
pub struct CooldownCheck<'a> {
    pub tracker: &'a CooldownTracker,
    /// Key the windows are stored under; the full path for subcommands.
    pub command: &'a str,
    /// Skips every cooldown, e.g. for bot administrators.
    pub bypass: bool,
    pub now: Instant,
}

fn missing(required: Permissions, granted: Permissions) -> Option<Permissions> {
    if required.is_empty() || granted.contains(Permissions::ADMINISTRATOR) {
        return None;
    }

    let missing = required - granted;
    (!missing.is_empty()).then_some(missing)
}

pub async fn check(
    spec: &CommandSpec,
    invocation: Invocation<'_>,
    ctxt: &dyn ResolutionContext,
    cooldowns: CooldownCheck<'_>,
) -> Result<GatePass, Rejection> {
    let guild_id = ctxt.guild_id();

    if spec.guild_only && guild_id.is_none() {
        return Err(Rejection::NotInGuild);
    }

    if spec.nsfw {
        let nsfw = ctxt.channel_is_nsfw().await.unwrap_or_else(|e| {
            warn!("Failed to check NSFW status of channel {}: {e:#}", ctxt.channel_id());
            false
        });
        if !nsfw {
            return Err(Rejection::NsfwOnly);
        }
    }

    // permissions only exist inside guilds
    if guild_id.is_some() {
        if !spec.required_permissions.is_empty() {
            let granted = ctxt.author_permissions().await.unwrap_or_else(|e| {
                warn!("Failed to fetch permissions of user {}: {e:#}", ctxt.author_id());
                Permissions::empty()
            });
            if let Some(missing) = missing(spec.required_permissions, granted) {
                return Err(Rejection::MissingPermission(missing));
            }
        }

        if !spec.required_self_permissions.is_empty() {
            let granted = ctxt.self_permissions().await.unwrap_or_else(|e| {
                warn!("Failed to fetch own permissions in channel {}: {e:#}", ctxt.channel_id());
                Permissions::empty()
            });
            if let Some(missing) = missing(spec.required_self_permissions, granted) {
                return Err(Rejection::MissingSelfPermission(missing));
            }
        }
    }

    let mut started_cooldowns = Vec::new();
    if !cooldowns.bypass {
        let subjects = [
            (CooldownScope::Guild, spec.cooldowns.guild, guild_id.map(|g| g.get())),
            (CooldownScope::User, spec.cooldowns.user, Some(ctxt.author_id().get())),
            (CooldownScope::Channel, spec.cooldowns.channel, Some(ctxt.channel_id().get())),
        ];

        for (scope, duration, subject) in subjects {
            let Some(subject) = subject else { continue };
            if duration.is_zero() {
                continue;
            }

            match cooldowns
                .tracker
                .try_start(scope, cooldowns.command, subject, duration, cooldowns.now)
            {
                Ok(window) => started_cooldowns.push(StartedCooldown {
                    scope,
                    command: cooldowns.command.to_owned(),
                    subject,
                    start: window.start,
                }),
                Err(remaining) => {
                    debug!("{} is on {scope} cooldown for {subject} ({remaining:?} left)", cooldowns.command);
                    return Err(Rejection::OnCooldown(scope, remaining));
                },
            }
        }
    }

    let args = match invocation {
        Invocation::Tokens(tokens) => parse(tokens, spec, ctxt).await?,
        Invocation::Options(options) => parse_options(options, spec, ctxt).await?,
    };

    Ok(GatePass {
        args,
        started_cooldowns,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use twilight_model::id::Id;

    use super::*;
    use crate::command::argument::Argument;
    use crate::command::arguments::parsed;
    use crate::command::errors::ParseError;
    use crate::resolution::memory::{MemoryContext, MemoryDirectory};

    const GUILD: u64 = 10;
    const AUTHOR: u64 = 1;
    const BOT: u64 = 999;

    fn directory() -> MemoryDirectory {
        let mut directory = MemoryDirectory::new();
        directory.set_permissions(GUILD, BOT, Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS);
        directory
    }

    fn context(directory: MemoryDirectory, guild: bool) -> MemoryContext {
        MemoryContext {
            directory: Arc::new(directory),
            author_id: Id::new(AUTHOR),
            channel_id: Id::new(100),
            guild_id: guild.then(|| Id::new(GUILD)),
            self_id: Id::new(BOT),
        }
    }

    fn cooldowns<'a>(tracker: &'a CooldownTracker, command: &'a str) -> CooldownCheck<'a> {
        CooldownCheck {
            tracker,
            command,
            bypass: false,
            now: Instant::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn guild_only_is_checked_before_cooldowns() {
        let spec = CommandSpec::builder("ban")
            .guild_only()
            .user_cooldown(Duration::from_secs(30))
            .build()
            .unwrap();
        let tracker = CooldownTracker::new();
        tracker.start_cooldown(
            CooldownScope::User,
            "ban",
            AUTHOR,
            Duration::from_secs(30),
            Instant::now(),
        );

        let result = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(directory(), false),
            cooldowns(&tracker, "ban"),
        )
        .await;
        assert!(matches!(result, Err(Rejection::NotInGuild)));
    }

    #[tokio::test]
    async fn nsfw_channels() {
        let spec = CommandSpec::builder("lewd").nsfw().build().unwrap();
        let tracker = CooldownTracker::new();

        let result = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(directory(), true),
            cooldowns(&tracker, "lewd"),
        )
        .await;
        assert!(matches!(result, Err(Rejection::NsfwOnly)));

        let mut nsfw = directory();
        nsfw.set_nsfw(100);
        let result = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(nsfw, true),
            cooldowns(&tracker, "lewd"),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn permissions_report_what_is_missing() {
        let spec = CommandSpec::builder("purge")
            .required_permissions(Permissions::MANAGE_MESSAGES | Permissions::READ_MESSAGE_HISTORY)
            .required_self_permissions(Permissions::MANAGE_MESSAGES)
            .build()
            .unwrap();
        let tracker = CooldownTracker::new();

        let mut partial = directory();
        partial.set_permissions(GUILD, AUTHOR, Permissions::READ_MESSAGE_HISTORY);
        let result = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(partial, true),
            cooldowns(&tracker, "purge"),
        )
        .await;
        assert!(matches!(result, Err(Rejection::MissingPermission(p)) if p == Permissions::MANAGE_MESSAGES));

        let mut admin = directory();
        admin.set_permissions(GUILD, AUTHOR, Permissions::ADMINISTRATOR);
        let result = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(admin, true),
            cooldowns(&tracker, "purge"),
        )
        .await;
        assert!(
            matches!(result, Err(Rejection::MissingSelfPermission(p)) if p == Permissions::MANAGE_MESSAGES)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expires_with_time() {
        let spec = CommandSpec::builder("ping")
            .user_cooldown(Duration::from_secs(5))
            .build()
            .unwrap();
        let tracker = CooldownTracker::new();
        let ctxt = context(directory(), true);
        let start = Instant::now();

        let first = check(&spec, Invocation::Tokens(&[]), &ctxt, cooldowns(&tracker, "ping"))
            .await
            .unwrap();
        assert_eq!(first.started_cooldowns, [StartedCooldown {
            scope: CooldownScope::User,
            command: "ping".to_owned(),
            subject: AUTHOR,
            start,
        }]);

        tokio::time::advance(Duration::from_secs(2)).await;
        let second = check(&spec, Invocation::Tokens(&[]), &ctxt, cooldowns(&tracker, "ping")).await;
        assert!(matches!(
            second,
            Err(Rejection::OnCooldown(CooldownScope::User, remaining)) if remaining == Duration::from_secs(3)
        ));

        tokio::time::advance(Duration::from_secs(3)).await;
        let third = check(&spec, Invocation::Tokens(&[]), &ctxt, cooldowns(&tracker, "ping")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn guild_cooldown_is_checked_first_and_skipped_outside_guilds() {
        let spec = CommandSpec::builder("ping")
            .guild_cooldown(Duration::from_secs(60))
            .user_cooldown(Duration::from_secs(60))
            .build()
            .unwrap();
        let tracker = CooldownTracker::new();
        tracker.start_cooldown(
            CooldownScope::Guild,
            "ping",
            GUILD,
            Duration::from_secs(60),
            Instant::now(),
        );

        let in_guild = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(directory(), true),
            cooldowns(&tracker, "ping"),
        )
        .await;
        assert!(matches!(in_guild, Err(Rejection::OnCooldown(CooldownScope::Guild, _))));
        // the rejected invocation must not have started a user window
        assert!(!tracker.is_on_cooldown(CooldownScope::User, "ping", AUTHOR, Instant::now()));

        let in_dm = check(
            &spec,
            Invocation::Tokens(&[]),
            &context(directory(), false),
            cooldowns(&tracker, "ping"),
        )
        .await
        .unwrap();
        assert_eq!(in_dm.started_cooldowns.len(), 1);
        assert_eq!(in_dm.started_cooldowns[0].scope, CooldownScope::User);
    }

    #[tokio::test]
    async fn bypass_skips_cooldowns() {
        let spec = CommandSpec::builder("ping")
            .user_cooldown(Duration::from_secs(60))
            .build()
            .unwrap();
        let tracker = CooldownTracker::new();
        let ctxt = context(directory(), true);

        for _ in 0..3 {
            let pass = check(&spec, Invocation::Tokens(&[]), &ctxt, CooldownCheck {
                bypass: true,
                ..cooldowns(&tracker, "ping")
            })
            .await
            .unwrap();
            assert!(pass.started_cooldowns.is_empty());
        }
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn parse_failures_still_consume_cooldown() {
        let spec = CommandSpec::builder("double")
            .user_cooldown(Duration::from_secs(10))
            .argument(Argument::one("n", parsed::<i64>()))
            .build()
            .unwrap();
        let tracker = CooldownTracker::new();
        let ctxt = context(directory(), true);

        let result = check(&spec, Invocation::Tokens(&["x"]), &ctxt, cooldowns(&tracker, "double")).await;
        assert!(matches!(
            result,
            Err(Rejection::Parse(ParseError::InvalidArgument { .. }))
        ));
        assert!(tracker.is_on_cooldown(CooldownScope::User, "double", AUTHOR, Instant::now()));
    }

    #[tokio::test]
    async fn concurrent_invocations_admit_one() {
        let spec = Arc::new(
            CommandSpec::builder("ping")
                .user_cooldown(Duration::from_secs(60))
                .build()
                .unwrap(),
        );
        let tracker = Arc::new(CooldownTracker::new());
        let ctxt = Arc::new(context(directory(), true));
        let now = Instant::now();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let (spec, tracker, ctxt) = (spec.clone(), tracker.clone(), ctxt.clone());
            tasks.push(tokio::spawn(async move {
                check(&spec, Invocation::Tokens(&[]), &*ctxt, CooldownCheck {
                    tracker: &tracker,
                    command: "ping",
                    bypass: false,
                    now,
                })
                .await
                .is_ok()
            }));
        }

        let mut passed = 0;
        for task in tasks {
            if task.await.unwrap() {
                passed += 1;
            }
        }
        assert_eq!(passed, 1);
    }
}
