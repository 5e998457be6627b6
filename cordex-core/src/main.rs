use std::sync::Arc;

use async_trait::async_trait;
use cordex_common::config::CONFIG;
use cordex_common::{ok_or_break, ok_or_continue};
use cordex_common::util::tracing_init;
use cordex_core::command::misc::register_all;
use cordex_core::command::registry::RegistryBuilder;
use cordex_core::dispatcher::handle_event;
use cordex_core::dispatcher::incoming_event::InboundEvent;
use cordex_core::dispatcher::reply::Responder;
use cordex_core::resolution::memory::{MemoryContext, MemoryDirectory};
use cordex_core::resolution::EntityKind;
use cordex_core::{Cordex, ThreadSafeCordex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, trace};
use twilight_model::guild::Permissions;
use twilight_model::id::Id;

const GUILD_ID: u64 = 1;
const CHANNEL_ID: u64 = 10;
const USER_ID: u64 = 100;
const BOT_ID: u64 = 999;

struct StdoutResponder;

#[async_trait]
impl Responder for StdoutResponder {
    async fn reply(&self, content: &str) -> anyhow::Result<()> {
        for line in content.lines() {
            println!("> {line}");
        }
        Ok(())
    }
}

/// A small guild for the console session to run commands against.
fn demo_directory() -> MemoryDirectory {
    let mut directory = MemoryDirectory::new();
    directory
        .add_entity(GUILD_ID, EntityKind::User, USER_ID, "console")
        .add_entity(GUILD_ID, EntityKind::User, 101, "alice")
        .add_entity(GUILD_ID, EntityKind::User, 102, "bob")
        .add_entity(GUILD_ID, EntityKind::Channel, CHANNEL_ID, "general")
        .add_entity(GUILD_ID, EntityKind::Role, 50, "moderators")
        .set_permissions(GUILD_ID, USER_ID, Permissions::ADMINISTRATOR)
        .set_permissions(GUILD_ID, BOT_ID, Permissions::KICK_MEMBERS | Permissions::SEND_MESSAGES);
    directory
}

/// Lines starting with `/` are structured invocations: `/path of command; key=value; ...`.
fn parse_event(line: &str, resolution: Arc<MemoryContext>, responder: Arc<StdoutResponder>) -> InboundEvent {
    match line.strip_prefix('/') {
        Some(structured) => {
            let mut parts = structured.split(';');
            let command = parts.next().unwrap_or_default().trim().to_owned();
            let options = parts
                .filter_map(|part| part.split_once('='))
                .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                .collect();
            InboundEvent::structured(command, options, resolution, responder)
        },
        None => InboundEvent::text(line, resolution, responder),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_init(&CONFIG.logging.level);

    info!("Initialising");
    let registry = register_all(RegistryBuilder::new())?.build();
    info!("Registered {} commands", registry.len());

    let cordex: ThreadSafeCordex = Cordex::new(CONFIG.clone(), registry)?.into_shared();
    let resolution = Arc::new(MemoryContext {
        directory: Arc::new(demo_directory()),
        author_id: Id::new(USER_ID),
        channel_id: Id::new(CHANNEL_ID),
        guild_id: Some(Id::new(GUILD_ID)),
        self_id: Id::new(BOT_ID),
    });
    let responder = Arc::new(StdoutResponder);

    info!(
        "Reading commands from stdin, prefix is {:?}",
        cordex.config.prefix.for_guild(Some(GUILD_ID))
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = ok_or_break!(lines.next_line().await) else {
            break;
        };
        trace!("got line: {line}");

        if line.trim() == ":metrics" {
            print!("{}", ok_or_continue!(cordex.metrics.render()));
            continue;
        }

        let event = parse_event(&line, resolution.clone(), responder.clone());
        tokio::spawn(handle_event(cordex.clone(), event));
    }

    info!("Input closed, shutting down");
    Ok(())
}
