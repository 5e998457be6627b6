use super::TCommand;

/// Finds a direct subcommand of `command` by name or alias.
pub fn find_subcommand(command: &TCommand, name: &str) -> Option<TCommand> {
    command
        .subcommands()
        .iter()
        .find(|sub| sub.metadata().matches(name))
        .cloned()
}

/// The command an invocation actually targets, after descending into command groups.
pub struct ResolvedCommand {
    pub command: TCommand,
    /// Space-separated path from the top-level name, e.g. `tag create`. Cooldowns are keyed by
    /// this.
    pub path: String,
    /// Number of leading argument tokens that named subcommands.
    pub consumed: usize,
}

/// Follows leading tokens into nested subcommands for as long as they match.
///
/// A group whose next token names none of its subcommands is itself the target, and the token is
/// left for its own arguments.
pub fn resolve(command: TCommand, tokens: &[&str]) -> ResolvedCommand {
    let mut resolved = ResolvedCommand {
        path: command.metadata().name.clone(),
        command,
        consumed: 0,
    };

    while let Some(token) = tokens.get(resolved.consumed) {
        let Some(sub) = find_subcommand(&resolved.command, token) else {
            break;
        };
        resolved.path.push(' ');
        resolved.path.push_str(&sub.metadata().name);
        resolved.command = sub;
        resolved.consumed += 1;
    }

    resolved
}

/// A structured path that names a subcommand its parent does not have.
pub struct UnresolvedPath<'p> {
    /// The deepest command the path did resolve to.
    pub parent: ResolvedCommand,
    /// The first segment that matched nothing.
    pub segment: &'p str,
}

/// Like [`resolve`], for structured invocations whose command name is already a full path. Every
/// segment after the first must name a subcommand.
pub fn resolve_path(command: TCommand, path: &str) -> Result<ResolvedCommand, UnresolvedPath<'_>> {
    let tokens = path.split_ascii_whitespace().skip(1).collect::<Vec<_>>();
    let resolved = resolve(command, &tokens);
    match tokens.get(resolved.consumed) {
        None => Ok(resolved),
        Some(&segment) => Err(UnresolvedPath {
            parent: resolved,
            segment,
        }),
    }
}
