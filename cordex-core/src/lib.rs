//! A command dispatch pipeline for chat bots: typed argument parsing, an execution gate with
//! permission and cooldown checks, and near-miss suggestions for unknown command names.
//!
//! Hosts build a [`command::registry::Registry`] once at startup, wrap it in a [`cordex::Cordex`]
//! and feed every inbound chat event to [`dispatcher::handle_event`].

pub mod command;
pub mod cooldowns;
pub mod cordex;
pub mod dispatcher;
pub mod metrics;
pub mod resolution;

pub use cordex::{Cordex, ThreadSafeCordex};
