//! Turns inbound chat events into command executions.
//!
//! For a text event the steps are:
//!
//! **Step 1**: Ignore bot authors and messages that do not start with the prefix that applies to
//! the guild (or the default prefix outside of guilds).
//!
//! **Step 2**: Split off the command name and look it up. Unknown names are reported as not found,
//! with near-miss suggestions when any exist. Leading arguments naming subcommands select the
//! subcommand.
//!
//! **Step 3**: Run the interceptor of the command, if the host installed one.
//!
//! **Step 4**: Run the execution gate. A rejection is answered with a reply and ends the
//! invocation.
//!
//! **Step 5**: Spawn the command body as its own task. Errors and panics of the body are caught in
//! that task, logged and reported; they never reach the caller of [`handle_event`].
//!
//! Structured events skip the prefix and address commands by their full path.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use cordex_common::err;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use self::incoming_event::{EventContent, InboundEvent};
use crate::command::errors::{ErrorSeverity, ExecutionError, GetErrorSeverity, Rejection};
use crate::command::gate::{self, CooldownCheck, Invocation};
use crate::command::group::{self, ResolvedCommand};
use crate::command::metadata::CommandSpec;
use crate::command::suggest::Suggestion;
use crate::command::tokenizer::split_command;
use crate::command::{CommandCtxt, CommandData, ExecutionTimings, Source};
use crate::cordex::ThreadSafeCordex;

pub mod hooks;
pub mod incoming_event;
pub mod reply;

/// What happened to an inbound event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not addressed to the bot at all.
    Ignored,
    NotFound {
        name: String,
        suggestions: Vec<Suggestion>,
    },
    /// An interceptor dropped the invocation.
    Intercepted,
    Rejected(Rejection),
    /// The command body is running; the handle resolves once it finishes.
    Spawned(JoinHandle<Result<(), ExecutionError>>),
}

/// Handles one inbound event, returning once the command body has been spawned (or the event has
/// been turned away).
pub async fn handle_event(cordex: ThreadSafeCordex, event: InboundEvent) -> DispatchOutcome {
    let processing_time_start = Instant::now();
    cordex.metrics.add_event();

    if event.author_is_bot {
        return DispatchOutcome::Ignored;
    }

    match &event.content {
        EventContent::Text(content) => {
            let guild_id = event.resolution.guild_id().map(|g| g.get());
            let prefix = cordex.config.prefix.for_guild(guild_id);
            let Some(command_text) = content.strip_prefix(prefix) else {
                return DispatchOutcome::Ignored;
            };
            let Some((name, tokens)) = split_command(command_text) else {
                return DispatchOutcome::Ignored;
            };

            let Some(command) = cordex.registry.find(name) else {
                return not_found(&cordex, &event, name, cordex.registry.names().collect(), prefix).await;
            };
            let resolved = group::resolve(command, &tokens);
            let invocation = Invocation::Tokens(&tokens[resolved.consumed..]);

            dispatch(&cordex, &event, resolved, invocation, Source::Text, prefix, processing_time_start).await
        },
        EventContent::Structured { command, options } => {
            let Some(name) = command.split_ascii_whitespace().next() else {
                return DispatchOutcome::Ignored;
            };

            let Some(top) = cordex.registry.find(name) else {
                return not_found(&cordex, &event, name, cordex.registry.names().collect(), "/").await;
            };

            let resolved = match group::resolve_path(top, command) {
                Ok(resolved) => resolved,
                Err(unresolved) => {
                    // suggest among the siblings of the segment that failed to match
                    let parent = &unresolved.parent;
                    let siblings = parent
                        .command
                        .subcommands()
                        .iter()
                        .flat_map(|sub| sub.metadata().names())
                        .collect();
                    let prefix = format!("/{} ", parent.path);
                    return not_found(&cordex, &event, unresolved.segment, siblings, &prefix).await;
                },
            };

            dispatch(
                &cordex,
                &event,
                resolved,
                Invocation::Options(options),
                Source::Structured,
                "",
                processing_time_start,
            )
            .await
        },
    }
}

/// Reports an unknown command `name`, suggesting close matches among `known`.
async fn not_found(
    cordex: &ThreadSafeCordex,
    event: &InboundEvent,
    name: &str,
    known: Vec<&str>,
    prefix: &str,
) -> DispatchOutcome {
    cordex.metrics.add_not_found();

    let suggestions = if cordex.config.suggestions.enabled {
        cordex.suggester().suggest(name, known)
    } else {
        Vec::new()
    };
    debug!("Command {name:?} not found ({} suggestions)", suggestions.len());

    if !suggestions.is_empty() {
        let list = suggestions
            .iter()
            .map(|s| format!("`{prefix}{}`", s.name))
            .collect::<Vec<_>>()
            .join(", ");
        if let Err(e) = event
            .responder
            .reply(&format!(":question: Command `{name}` not found. Did you mean: {list}?"))
            .await
        {
            err!("Failed to send suggestions for {name:?}: {e:#}");
        }
    }

    DispatchOutcome::NotFound {
        name: name.to_owned(),
        suggestions,
    }
}

async fn dispatch(
    cordex: &ThreadSafeCordex,
    event: &InboundEvent,
    resolved: ResolvedCommand,
    invocation: Invocation<'_>,
    source: Source,
    calling_prefix: &str,
    processing_time_start: Instant,
) -> DispatchOutcome {
    let ResolvedCommand { command, path, .. } = resolved;
    let spec = command.metadata();
    let ctxt = &*event.resolution;

    if !cordex.hooks.allows(&path, spec, ctxt) {
        debug!("Invocation of {path} dropped by interceptor");
        return DispatchOutcome::Intercepted;
    }

    let gate_start = Instant::now();
    let cooldowns = CooldownCheck {
        tracker: &cordex.cooldowns,
        command: &path,
        bypass: cordex.is_admin(ctxt.author_id().get()),
        now: gate_start,
    };

    let pass = match gate::check(spec, invocation, ctxt, cooldowns).await {
        Ok(pass) => pass,
        Err(rejection) => {
            report_rejection(cordex, event, spec, &path, calling_prefix, &rejection).await;
            return DispatchOutcome::Rejected(rejection);
        },
    };

    let data = CommandData {
        cordex: cordex.clone(),
        source,
        calling_prefix: calling_prefix.to_owned(),
        command_path: path.clone(),
        resolution: event.resolution.clone(),
        responder: event.responder.clone(),
        started_cooldowns: pass.started_cooldowns,
        execution_timings: ExecutionTimings {
            processing_time_start,
            gate_total: gate_start.elapsed(),
        },
    };
    let ctxt = CommandCtxt::new(data);
    cordex.metrics.add_command(&path);

    let cordex = cordex.clone();
    let handle = tokio::spawn(async move {
        let result = match AssertUnwindSafe(command.execute(ctxt.clone(), pass.args))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ExecutionError::Command(e)),
            Err(payload) => Err(ExecutionError::Panicked(panic_message(&*payload))),
        };

        let timings = ctxt.data.execution_timings;
        debug!(
            "{path} finished in {:?} (gate: {:?})",
            timings.processing_time_start.elapsed(),
            timings.gate_total
        );

        if let Err(error) = &result {
            report_failure(&cordex, &ctxt, &path, error).await;
        }
        result
    });

    DispatchOutcome::Spawned(handle)
}

async fn report_rejection(
    cordex: &ThreadSafeCordex,
    event: &InboundEvent,
    spec: &CommandSpec,
    path: &str,
    calling_prefix: &str,
    rejection: &Rejection,
) {
    cordex.metrics.add_rejection(rejection.kind());
    match rejection.get_severity() {
        ErrorSeverity::Low => debug!("{path} rejected: {rejection}"),
        ErrorSeverity::High => warn!("{path} rejected: {rejection}"),
    }

    let reply = match &cordex.hooks.rejection_handler {
        Some(handler) => handler(spec, rejection),
        None => Some(match rejection {
            // if invalid args: report usage to user
            Rejection::Parse(_) => {
                let usage = spec.usage();
                let separator = if usage.is_empty() { "" } else { " " };
                format!(":warning: `{rejection}`\nUsage: `{calling_prefix}{path}{separator}{usage}`")
            },
            _ => format!(":warning: `{rejection}`"),
        }),
    };

    if let Some(reply) = reply {
        if let Err(e) = event.responder.reply(&reply).await {
            err!("Failed to reply to rejected invocation of {path}: {e:#}");
        }
    }
}

async fn report_failure(cordex: &ThreadSafeCordex, ctxt: &CommandCtxt, path: &str, error: &ExecutionError) {
    cordex.metrics.add_failure(path);
    err!("Error occurred while executing command {path}: {error}");

    let reply = match &cordex.hooks.error_handler {
        Some(handler) => handler(path, error),
        None => Some(format!(":warning: `{error}`")),
    };

    if let Some(reply) = reply {
        if let Err(e) = ctxt.reply(reply).await {
            err!("Failed to report error of {path}: {e:#}");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use cordex_common::config::config::CordexConfig;
    use twilight_model::guild::Permissions;
    use twilight_model::id::Id;

    use super::reply::BufferedResponder;
    use super::*;
    use crate::command::errors::ParseError;
    use crate::command::misc::register_all;
    use crate::command::parser::ParsedArguments;
    use crate::command::registry::RegistryBuilder;
    use crate::command::Command;
    use crate::cooldowns::CooldownScope;
    use crate::cordex::Cordex;
    use crate::dispatcher::hooks::Hooks;
    use crate::resolution::memory::{MemoryContext, MemoryDirectory};
    use crate::resolution::EntityKind;

    const GUILD: u64 = 1;
    const AUTHOR: u64 = 100;
    const BOT: u64 = 999;

    struct Explode(CommandSpec);

    #[async_trait]
    impl Command for Explode {
        fn metadata(&self) -> &CommandSpec {
            &self.0
        }

        async fn execute(&self, _: CommandCtxt, _: ParsedArguments) -> anyhow::Result<()> {
            panic!("kaboom")
        }
    }

    /// Holds its window for longer than the window lasts, then gives it back.
    struct Slow(CommandSpec);

    #[async_trait]
    impl Command for Slow {
        fn metadata(&self) -> &CommandSpec {
            &self.0
        }

        async fn execute(&self, ctxt: CommandCtxt, _: ParsedArguments) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            ctxt.revoke_cooldowns();
            Ok(())
        }
    }

    fn cordex_with(config: CordexConfig, hooks: Hooks) -> ThreadSafeCordex {
        let slow = CommandSpec::builder("slow")
            .user_cooldown(Duration::from_secs(5))
            .build()
            .unwrap();
        let registry = register_all(RegistryBuilder::new())
            .unwrap()
            .register(Arc::new(Explode(CommandSpec::builder("explode").build().unwrap())))
            .unwrap()
            .register(Arc::new(Slow(slow)))
            .unwrap()
            .build();
        Cordex::new(config, registry).unwrap().with_hooks(hooks).into_shared()
    }

    fn cordex() -> ThreadSafeCordex {
        cordex_with(CordexConfig::default(), Hooks::default())
    }

    fn context(guild: bool) -> Arc<MemoryContext> {
        let mut directory = MemoryDirectory::new();
        directory
            .add_entity(GUILD, EntityKind::User, AUTHOR, "author")
            .add_entity(GUILD, EntityKind::User, 101, "alice")
            .set_permissions(GUILD, AUTHOR, Permissions::KICK_MEMBERS)
            .set_permissions(GUILD, BOT, Permissions::KICK_MEMBERS);

        Arc::new(MemoryContext {
            directory: Arc::new(directory),
            author_id: Id::new(AUTHOR),
            channel_id: Id::new(10),
            guild_id: guild.then(|| Id::new(GUILD)),
            self_id: Id::new(BOT),
        })
    }

    async fn run_text(
        cordex: &ThreadSafeCordex,
        content: &str,
        responder: &Arc<BufferedResponder>,
    ) -> DispatchOutcome {
        let event = InboundEvent::text(content, context(true), responder.clone());
        handle_event(cordex.clone(), event).await
    }

    async fn finish(outcome: DispatchOutcome) -> Result<(), ExecutionError> {
        match outcome {
            DispatchOutcome::Spawned(handle) => handle.await.unwrap(),
            other => panic!("expected a spawned command, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ignores_unprefixed_and_bot_messages() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        assert!(matches!(run_text(&cordex, "ping", &responder).await, DispatchOutcome::Ignored));
        assert!(matches!(run_text(&cordex, "!", &responder).await, DispatchOutcome::Ignored));

        let mut event = InboundEvent::text("!ping", context(true), responder.clone());
        event.author_is_bot = true;
        assert!(matches!(handle_event(cordex.clone(), event).await, DispatchOutcome::Ignored));
        assert!(responder.replies().await.is_empty());
    }

    #[tokio::test]
    async fn runs_commands_and_replies() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        finish(run_text(&cordex, "!sum 1 2   3", &responder).await).await.unwrap();
        finish(run_text(&cordex, "!SAY hello  world", &responder).await).await.unwrap();

        assert_eq!(responder.take().await, ["6", "hello world"]);
        assert_eq!(cordex.metrics.commands.with_label_values(&["sum"]).get(), 1);
    }

    #[tokio::test]
    async fn unknown_commands_get_suggestions() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        match run_text(&cordex, "!pnig", &responder).await {
            DispatchOutcome::NotFound { name, suggestions } => {
                assert_eq!(name, "pnig");
                assert_eq!(suggestions[0].name, "ping");
            },
            other => panic!("unexpected {other:?}"),
        }
        let replies = responder.take().await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("`!ping`"));

        // nothing close: not found, but no reply
        assert!(matches!(
            run_text(&cordex, "!xyzzyplugh", &responder).await,
            DispatchOutcome::NotFound { suggestions, .. } if suggestions.is_empty()
        ));
        assert!(responder.take().await.is_empty());
    }

    #[tokio::test]
    async fn suggestions_can_be_disabled() {
        let mut config = CordexConfig::default();
        config.suggestions.enabled = false;
        let cordex = cordex_with(config, Hooks::default());
        let responder = Arc::new(BufferedResponder::new());

        assert!(matches!(
            run_text(&cordex, "!pnig", &responder).await,
            DispatchOutcome::NotFound { suggestions, .. } if suggestions.is_empty()
        ));
    }

    #[tokio::test]
    async fn parse_failures_report_usage() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let outcome = run_text(&cordex, "!sum", &responder).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(Rejection::Parse(ParseError::MissingArgument(ref name))) if name == "numbers"
        ));

        let replies = responder.take().await;
        assert!(replies[0].contains("Usage: `!sum <numbers...>`"), "{replies:?}");
        assert_eq!(cordex.metrics.rejections.with_label_values(&["missing_argument"]).get(), 1);
    }

    #[tokio::test]
    async fn cooldowns_apply_per_command_path() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        finish(run_text(&cordex, "!echo one", &responder).await).await.unwrap();
        assert!(matches!(
            run_text(&cordex, "!echo two", &responder).await,
            DispatchOutcome::Rejected(Rejection::OnCooldown(CooldownScope::User, _))
        ));

        // separate subcommands have separate windows
        finish(run_text(&cordex, "!math add 1 2", &responder).await).await.unwrap();
        finish(run_text(&cordex, "!math mul 3 4", &responder).await).await.unwrap();
        assert!(matches!(
            run_text(&cordex, "!math add 1 2", &responder).await,
            DispatchOutcome::Rejected(Rejection::OnCooldown(..))
        ));
    }

    #[tokio::test]
    async fn admins_bypass_cooldowns() {
        let mut config = CordexConfig::default();
        config.dev.admin_users.push(AUTHOR);
        let cordex = cordex_with(config, Hooks::default());
        let responder = Arc::new(BufferedResponder::new());

        for _ in 0..3 {
            finish(run_text(&cordex, "!echo hi", &responder).await).await.unwrap();
        }
        assert!(cordex.cooldowns.is_empty());
    }

    #[tokio::test]
    async fn revoked_cooldowns_allow_retries() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let huge = format!("!math mul {} 2", i64::MAX);
        finish(run_text(&cordex, &huge, &responder).await).await.unwrap();
        assert!(!cordex.cooldowns.is_on_cooldown(
            CooldownScope::User,
            "math mul",
            AUTHOR,
            tokio::time::Instant::now()
        ));

        finish(run_text(&cordex, "!math mul 2 2", &responder).await).await.unwrap();
        assert_eq!(responder.take().await.last().map(String::as_str), Some("4"));
    }

    #[tokio::test(start_paused = true)]
    async fn late_revokes_keep_newer_windows() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let first = run_text(&cordex, "!slow", &responder).await;

        // the first window has lapsed while its invocation is still running
        tokio::time::advance(Duration::from_secs(6)).await;
        let second = run_text(&cordex, "!slow", &responder).await;
        assert!(matches!(second, DispatchOutcome::Spawned(_)));

        tokio::time::advance(Duration::from_secs(4)).await;
        finish(first).await.unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(matches!(
            run_text(&cordex, "!slow", &responder).await,
            DispatchOutcome::Rejected(Rejection::OnCooldown(CooldownScope::User, _))
        ));
    }

    #[tokio::test]
    async fn groups_without_subcommand_run_themselves() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        finish(run_text(&cordex, "!math", &responder).await).await.unwrap();
        assert_eq!(responder.take().await, ["Available subcommands: add, mul"]);
    }

    #[tokio::test]
    async fn structured_invocations() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let options = vec![
            ("first".to_owned(), "2".to_owned()),
            ("rest".to_owned(), "3 4".to_owned()),
        ];
        let event = InboundEvent::structured("math mul", options, context(true), responder.clone());
        finish(handle_event(cordex.clone(), event).await).await.unwrap();
        assert_eq!(responder.take().await, ["24"]);

        let event = InboundEvent::structured("math div", vec![], context(true), responder.clone());
        assert!(matches!(
            handle_event(cordex.clone(), event).await,
            DispatchOutcome::NotFound { name, .. } if name == "div"
        ));
    }

    #[tokio::test]
    async fn structured_suggestions_name_the_unmatched_segment() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let event = InboundEvent::structured("mth add", vec![], context(true), responder.clone());
        match handle_event(cordex.clone(), event).await {
            DispatchOutcome::NotFound { name, suggestions } => {
                assert_eq!(name, "mth");
                assert_eq!(suggestions[0].name, "math");
            },
            other => panic!("unexpected {other:?}"),
        }
        assert!(responder.take().await[0].contains("`/math`"));

        let event = InboundEvent::structured("math ad", vec![], context(true), responder.clone());
        match handle_event(cordex.clone(), event).await {
            DispatchOutcome::NotFound { name, suggestions } => {
                assert_eq!(name, "ad");
                assert_eq!(suggestions[0].name, "add");
            },
            other => panic!("unexpected {other:?}"),
        }
        let replies = responder.take().await;
        assert!(replies[0].contains("`/math add`"), "{replies:?}");
    }

    #[tokio::test]
    async fn guild_only_commands_in_dms() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let event = InboundEvent::text("!kick alice", context(false), responder.clone());
        assert!(matches!(
            handle_event(cordex.clone(), event).await,
            DispatchOutcome::Rejected(Rejection::NotInGuild)
        ));

        finish(run_text(&cordex, "!kick alice being rude", &responder).await)
            .await
            .unwrap();
        let replies = responder.take().await;
        assert_eq!(replies.last().map(String::as_str), Some("Kicked <@101> (being rude)."));
    }

    #[tokio::test]
    async fn handler_panics_are_contained() {
        let cordex = cordex();
        let responder = Arc::new(BufferedResponder::new());

        let result = finish(run_text(&cordex, "!explode", &responder).await).await;
        assert!(matches!(result, Err(ExecutionError::Panicked(ref message)) if message == "kaboom"));
        assert_eq!(cordex.metrics.failures.with_label_values(&["explode"]).get(), 1);
        assert_eq!(responder.take().await, [":warning: `command panicked: kaboom`"]);

        // the dispatcher keeps working afterwards
        finish(run_text(&cordex, "!sum 1", &responder).await).await.unwrap();
    }

    #[tokio::test]
    async fn hooks_replace_default_behaviour() {
        let hooks = Hooks::new()
            .intercept("echo", |_, ctxt| ctxt.guild_id().is_none())
            .on_rejection(|spec, rejection| Some(format!("{} refused: {}", spec.name, rejection.kind())))
            .on_error(|_, _| None);
        let cordex = cordex_with(CordexConfig::default(), hooks);
        let responder = Arc::new(BufferedResponder::new());

        assert!(matches!(
            run_text(&cordex, "!echo hi", &responder).await,
            DispatchOutcome::Intercepted
        ));

        run_text(&cordex, "!sum x", &responder).await;
        assert!(finish(run_text(&cordex, "!explode", &responder).await).await.is_err());

        assert_eq!(responder.take().await, ["sum refused: invalid_argument"]);
    }

    #[tokio::test]
    async fn guild_prefixes() {
        let mut config = CordexConfig::default();
        config.prefix.guilds.insert(GUILD.to_string(), "?".to_owned());
        let cordex = cordex_with(config, Hooks::default());
        let responder = Arc::new(BufferedResponder::new());

        assert!(matches!(run_text(&cordex, "!sum 1", &responder).await, DispatchOutcome::Ignored));
        finish(run_text(&cordex, "?sum 1", &responder).await).await.unwrap();

        let event = InboundEvent::text("!sum 1", context(false), responder.clone());
        finish(handle_event(cordex.clone(), event).await).await.unwrap();
    }
}
