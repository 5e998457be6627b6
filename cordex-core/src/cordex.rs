use std::sync::Arc;

use cordex_common::config::config::CordexConfig;

use crate::command::registry::Registry;
use crate::command::suggest::Suggester;
use crate::cooldowns::CooldownTracker;
use crate::dispatcher::hooks::Hooks;
use crate::metrics::Metrics;

pub type ThreadSafeCordex = Arc<Cordex>;

/// Main dispatcher state, shared by every invocation.
///
/// The registry and configuration are fixed once this is built; only the cooldown tracker and
/// the metrics change afterwards.
pub struct Cordex {
    pub config: CordexConfig,
    pub registry: Registry,
    pub cooldowns: CooldownTracker,
    pub metrics: Metrics,
    pub hooks: Hooks,
}

impl Cordex {
    pub fn new(config: CordexConfig, registry: Registry) -> anyhow::Result<Cordex> {
        Ok(Cordex {
            config,
            registry,
            cooldowns: CooldownTracker::new(),
            metrics: Metrics::new()?,
            hooks: Hooks::default(),
        })
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn into_shared(self) -> ThreadSafeCordex {
        Arc::new(self)
    }

    /// Admin users are exempt from every cooldown.
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.config.dev.admin_users.contains(&user_id)
    }

    pub fn suggester(&self) -> Suggester {
        Suggester::from(&self.config.suggestions)
    }
}
