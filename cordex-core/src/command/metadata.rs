use std::collections::HashSet;
use std::time::Duration;

use twilight_model::guild::Permissions;

use super::argument::ArgumentSpec;
use super::errors::SpecError;

/// Cooldown windows per scope. A zero duration disables that scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cooldowns {
    pub user: Duration,
    pub channel: Duration,
    pub guild: Duration,
}

/// Everything the dispatcher needs to know about a command before running it.
///
/// Built through [`CommandSpec::builder`], which validates the argument layout. Names and aliases
/// are always lowercase.
#[derive(Debug)]
pub struct CommandSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub examples: Vec<String>,
    pub guild_only: bool,
    pub nsfw: bool,
    /// Permissions the invoking user needs in the current channel.
    pub required_permissions: Permissions,
    /// Permissions the bot itself needs in the current channel.
    pub required_self_permissions: Permissions,
    pub cooldowns: Cooldowns,
    arguments: Vec<ArgumentSpec>,
}

impl CommandSpec {
    pub fn builder(name: &str) -> CommandSpecBuilder {
        CommandSpecBuilder {
            name: name.to_owned(),
            aliases: Vec::new(),
            description: String::new(),
            examples: Vec::new(),
            guild_only: false,
            nsfw: false,
            required_permissions: Permissions::empty(),
            required_self_permissions: Permissions::empty(),
            cooldowns: Cooldowns::default(),
            arguments: Vec::new(),
        }
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    /// The name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Argument part of the usage string, e.g. `<user> [reason...]`.
    pub fn usage(&self) -> String {
        self.arguments
            .iter()
            .map(ArgumentSpec::usage)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct CommandSpecBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    examples: Vec<String>,
    guild_only: bool,
    nsfw: bool,
    required_permissions: Permissions,
    required_self_permissions: Permissions,
    cooldowns: Cooldowns,
    arguments: Vec<ArgumentSpec>,
}

impl CommandSpecBuilder {
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    pub fn aliases<'a>(mut self, aliases: impl IntoIterator<Item = &'a str>) -> Self {
        self.aliases.extend(aliases.into_iter().map(str::to_owned));
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        description.clone_into(&mut self.description);
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.examples.push(example.to_owned());
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.nsfw = true;
        self
    }

    pub fn required_permissions(mut self, permissions: Permissions) -> Self {
        self.required_permissions |= permissions;
        self
    }

    pub fn required_self_permissions(mut self, permissions: Permissions) -> Self {
        self.required_self_permissions |= permissions;
        self
    }

    pub fn user_cooldown(mut self, duration: Duration) -> Self {
        self.cooldowns.user = duration;
        self
    }

    pub fn channel_cooldown(mut self, duration: Duration) -> Self {
        self.cooldowns.channel = duration;
        self
    }

    pub fn guild_cooldown(mut self, duration: Duration) -> Self {
        self.cooldowns.guild = duration;
        self
    }

    pub fn argument(mut self, argument: impl Into<ArgumentSpec>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn build(self) -> Result<CommandSpec, SpecError> {
        let name = self.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(SpecError::EmptyName);
        }

        let mut aliases = Vec::with_capacity(self.aliases.len());
        for alias in self.aliases {
            let alias = alias.trim().to_lowercase();
            if alias.is_empty() {
                return Err(SpecError::EmptyName);
            }
            if alias == name || aliases.contains(&alias) {
                return Err(SpecError::DuplicateCommand(alias));
            }
            aliases.push(alias);
        }

        let mut seen = HashSet::new();
        let mut variadic: Option<&str> = None;
        for arg in &self.arguments {
            if arg.name().is_empty() {
                return Err(SpecError::EmptyName);
            }
            if !seen.insert(arg.name()) {
                return Err(SpecError::DuplicateArgument(arg.name().to_owned()));
            }
            if let Some(previous) = variadic {
                return Err(if arg.multiplicity().is_variadic() {
                    SpecError::MultipleVariadic
                } else {
                    SpecError::VariadicNotLast(previous.to_owned())
                });
            }
            if arg.multiplicity().is_variadic() {
                variadic = Some(arg.name());
            }
        }

        Ok(CommandSpec {
            name,
            aliases,
            description: self.description,
            examples: self.examples,
            guild_only: self.guild_only,
            nsfw: self.nsfw,
            required_permissions: self.required_permissions,
            required_self_permissions: self.required_self_permissions,
            cooldowns: self.cooldowns,
            arguments: self.arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::argument::Argument;
    use crate::command::arguments::{parsed, Text};

    #[test]
    fn names_are_lowercased() {
        let spec = CommandSpec::builder("Ping").alias("P").build().unwrap();
        assert_eq!(spec.name, "ping");
        assert_eq!(spec.names().collect::<Vec<_>>(), ["ping", "p"]);
        assert!(spec.matches("PING"));
        assert!(!spec.matches("pong"));
    }

    #[test]
    fn usage_joins_arguments() {
        let spec = CommandSpec::builder("remind")
            .argument(Argument::one("when", parsed::<u64>()))
            .argument(Argument::remainder("message", Text).not_required())
            .build()
            .unwrap();
        assert_eq!(spec.usage(), "<when> [message...]");
    }

    #[test]
    fn rejects_malformed_layouts() {
        assert_eq!(CommandSpec::builder("  ").build().unwrap_err(), SpecError::EmptyName);

        let err = CommandSpec::builder("x")
            .argument(Argument::list("a", Text))
            .argument(Argument::one("b", Text))
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::VariadicNotLast("a".to_owned()));

        let err = CommandSpec::builder("x")
            .argument(Argument::list("a", Text))
            .argument(Argument::remainder("b", Text))
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::MultipleVariadic);

        let err = CommandSpec::builder("x")
            .argument(Argument::one("a", Text))
            .argument(Argument::optional("a", Text))
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::DuplicateArgument("a".to_owned()));

        let err = CommandSpec::builder("x").alias("X").build().unwrap_err();
        assert_eq!(err, SpecError::DuplicateCommand("x".to_owned()));
    }
}
