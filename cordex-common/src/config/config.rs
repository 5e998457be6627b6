// See config.toml for information on the variables here.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CordexConfig {
    pub prefix: Prefixes,
    pub suggestions: Suggestions,
    pub dev: DevAttributes,
    pub logging: Logging,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Prefixes {
    pub default: String,
    /// Per-guild prefix overrides, keyed by guild ID.
    pub guilds: HashMap<String, String>,
}
impl Prefixes {
    /// The prefix that applies to a message sent in `guild_id` (or in DMs, if `None`).
    pub fn for_guild(&self, guild_id: Option<u64>) -> &str {
        guild_id
            .and_then(|id| self.guilds.get(&id.to_string()))
            .unwrap_or(&self.default)
    }
}
impl Default for Prefixes {
    fn default() -> Self {
        Self {
            default: "!".to_owned(),
            guilds: HashMap::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Suggestions {
    pub enabled: bool,
    pub max_distance: usize,
    pub max_results: Option<usize>,
    /// Unknown command names longer than this are never matched against the registry.
    pub max_input_length: usize,
}
impl Default for Suggestions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_distance: 2,
            max_results: Some(5),
            max_input_length: 30,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DevAttributes {
    /// Users who bypass all command cooldowns.
    pub admin_users: Vec<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Logging {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}
