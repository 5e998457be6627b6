use std::sync::Arc;

use super::reply::Responder;
use crate::resolution::ResolutionContext;

#[derive(Clone, Debug)]
pub enum EventContent {
    /// A chat message, possibly starting with a command prefix.
    Text(String),
    /// A structured invocation. `command` is the full command path, e.g. `tag create`.
    Structured {
        command: String,
        options: Vec<(String, String)>,
    },
}

/// One inbound chat event, as handed over by the host.
///
/// The author, channel and guild are taken from `resolution`.
pub struct InboundEvent {
    pub content: EventContent,
    pub author_is_bot: bool,
    pub resolution: Arc<dyn ResolutionContext>,
    pub responder: Arc<dyn Responder>,
}

impl InboundEvent {
    pub fn text(
        content: impl Into<String>,
        resolution: Arc<dyn ResolutionContext>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            content: EventContent::Text(content.into()),
            author_is_bot: false,
            resolution,
            responder,
        }
    }

    pub fn structured(
        command: impl Into<String>,
        options: Vec<(String, String)>,
        resolution: Arc<dyn ResolutionContext>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            content: EventContent::Structured {
                command: command.into(),
                options,
            },
            author_is_bot: false,
            resolution,
            responder,
        }
    }
}
