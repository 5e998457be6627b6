use std::fmt::Display;
use std::time::Duration;

use cordex_common::util::ParseDurationError;
use twilight_model::guild::Permissions;

use crate::cooldowns::CooldownScope;
use crate::resolution::EntityKind;

pub trait GetErrorSeverity {
    fn get_severity(&self) -> ErrorSeverity;
}

/// `Low` errors are caused by the invoking user; `High` errors mean a collaborator failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    High,
}

/// A raw value could not be converted into the type an argument expects.
#[derive(Debug)]
pub enum ConvertError {
    Malformed { expected: &'static str, reason: String },
    Duration(ParseDurationError),
    Url(url::ParseError),
    NotFound(EntityKind),
    NotAChoice(Vec<String>),
    Lookup(anyhow::Error),
    Other(String),
}

impl GetErrorSeverity for ConvertError {
    fn get_severity(&self) -> ErrorSeverity {
        match self {
            Self::Lookup(..) => ErrorSeverity::High,
            _ => ErrorSeverity::Low,
        }
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { expected, reason } => write!(f, "expected {expected} ({reason})"),
            Self::Duration(err) => write!(f, "failed to parse a duration: {err}"),
            Self::Url(err) => write!(f, "failed to parse a URL: {err}"),
            Self::NotFound(kind) => write!(f, "no matching {kind} could be found"),
            Self::NotAChoice(choices) => write!(f, "expected one of: {}", choices.join(", ")),
            Self::Lookup(err) => write!(f, "lookup failed: {err}"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}
impl std::error::Error for ConvertError {}

impl From<ParseDurationError> for ConvertError {
    fn from(v: ParseDurationError) -> Self {
        Self::Duration(v)
    }
}

impl From<url::ParseError> for ConvertError {
    fn from(v: url::ParseError) -> Self {
        Self::Url(v)
    }
}

/// Parsing the arguments of a command failed.
#[derive(Debug)]
pub enum ParseError {
    /// A required argument had no remaining input.
    MissingArgument(String),
    /// A supplied value was rejected by the argument's choices or converter.
    InvalidArgument {
        name: String,
        raw: String,
        cause: ConvertError,
    },
}

impl GetErrorSeverity for ParseError {
    fn get_severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingArgument(..) => ErrorSeverity::Low,
            Self::InvalidArgument { cause, .. } => cause.get_severity(),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingArgument(name) => write!(f, "the argument `{name}` is required but was not provided"),
            Self::InvalidArgument { name, raw, cause } => {
                write!(f, "invalid value `{raw}` for argument `{name}`: {cause}")
            },
        }
    }
}
impl std::error::Error for ParseError {}

/// Why the execution gate refused to run a command. Exactly one reason is ever reported.
#[derive(Debug)]
pub enum Rejection {
    NotInGuild,
    NsfwOnly,
    MissingPermission(Permissions),
    MissingSelfPermission(Permissions),
    OnCooldown(CooldownScope, Duration),
    Parse(ParseError),
}

impl Rejection {
    /// Short, stable identifier used for metrics labels and hook dispatch.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotInGuild => "not_in_guild",
            Self::NsfwOnly => "nsfw_only",
            Self::MissingPermission(..) => "missing_permission",
            Self::MissingSelfPermission(..) => "missing_self_permission",
            Self::OnCooldown(..) => "on_cooldown",
            Self::Parse(ParseError::MissingArgument(..)) => "missing_argument",
            Self::Parse(ParseError::InvalidArgument { .. }) => "invalid_argument",
        }
    }
}

impl GetErrorSeverity for Rejection {
    fn get_severity(&self) -> ErrorSeverity {
        match self {
            Self::Parse(err) => err.get_severity(),
            _ => ErrorSeverity::Low,
        }
    }
}

/// Renders permission flags as a readable list, e.g. `manage messages, ban members`.
pub fn format_permissions(permissions: Permissions) -> String {
    permissions
        .iter_names()
        .map(|(name, _)| name.to_ascii_lowercase().replace('_', " "))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInGuild => f.write_str("This command can only be used in a server."),
            Self::NsfwOnly => f.write_str("This command can only be used in NSFW channels."),
            Self::MissingPermission(permissions) => write!(
                f,
                "You need the following permissions to use this command: {}",
                format_permissions(*permissions)
            ),
            Self::MissingSelfPermission(permissions) => write!(
                f,
                "I need the following permissions to run this command: {}",
                format_permissions(*permissions)
            ),
            Self::OnCooldown(scope, remaining) => write!(
                f,
                "This command is on {scope} cooldown, try again in {:.1} seconds.",
                remaining.as_secs_f32()
            ),
            Self::Parse(err) => write!(f, "Argument error: {err}"),
        }
    }
}
impl std::error::Error for Rejection {}

impl From<ParseError> for Rejection {
    fn from(v: ParseError) -> Self {
        Self::Parse(v)
    }
}

/// A failure of the command body itself, after the gate passed.
#[derive(Debug)]
pub enum ExecutionError {
    Command(anyhow::Error),
    Panicked(String),
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(err) => write!(f, "{err:#}"),
            Self::Panicked(message) => write!(f, "command panicked: {message}"),
        }
    }
}
impl std::error::Error for ExecutionError {}

impl From<anyhow::Error> for ExecutionError {
    fn from(v: anyhow::Error) -> Self {
        Self::Command(v)
    }
}

/// The command spec itself is malformed, or conflicts with another at registration.
#[derive(Debug, PartialEq, Eq)]
pub enum SpecError {
    EmptyName,
    VariadicNotLast(String),
    MultipleVariadic,
    DuplicateArgument(String),
    DuplicateCommand(String),
}

impl Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => f.write_str("command and argument names must not be empty"),
            Self::VariadicNotLast(name) => write!(f, "variadic argument `{name}` must be the last argument"),
            Self::MultipleVariadic => f.write_str("a command may have at most one variadic argument"),
            Self::DuplicateArgument(name) => write!(f, "argument `{name}` is declared more than once"),
            Self::DuplicateCommand(name) => write!(f, "the name or alias `{name}` is already registered"),
        }
    }
}
impl std::error::Error for SpecError {}
