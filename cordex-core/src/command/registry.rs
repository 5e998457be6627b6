use std::collections::HashMap;

use tracing::debug;

use super::errors::SpecError;
use super::TCommand;

/// Collects commands during startup. Nothing is looked up until [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    commands: Vec<TCommand>,
    by_name: HashMap<String, TCommand>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command under its name and every alias. Fails if any of those is already taken.
    pub fn register(mut self, command: TCommand) -> Result<Self, SpecError> {
        let meta = command.metadata();
        if let Some(taken) = meta.names().find(|n| self.by_name.contains_key(*n)) {
            return Err(SpecError::DuplicateCommand(taken.to_owned()));
        }

        for name in meta.names() {
            self.by_name.insert(name.to_owned(), command.clone());
        }
        debug!("Registered command {} ({} aliases)", meta.name, meta.aliases.len());
        self.commands.push(command);

        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            commands: self.commands,
            by_name: self.by_name,
        }
    }
}

/// Immutable name and alias lookup of top-level commands.
#[derive(Default)]
pub struct Registry {
    commands: Vec<TCommand>,
    by_name: HashMap<String, TCommand>,
}

impl Registry {
    /// Finds a command by its name or one of its aliases, ignoring case.
    pub fn find(&self, name: &str) -> Option<TCommand> {
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(&name.to_lowercase()))
            .cloned()
    }

    /// Every name and alias, for suggestions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Registered commands, in registration order.
    pub fn commands(&self) -> &[TCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
