use std::collections::HashMap;

use super::argument::{ArgValue, ArgumentSpec, Multiplicity, Value};
use super::errors::ParseError;
use super::metadata::CommandSpec;
use crate::resolution::ResolutionContext;

/// Converted arguments of one invocation, keyed by argument name.
#[derive(Debug, Default)]
pub struct ParsedArguments {
    values: HashMap<String, ArgValue>,
}

impl ParsedArguments {
    /// A single value, or `None` if absent or not of type `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        match self.values.get(name)? {
            ArgValue::Single(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// Every element of a list argument. Empty if the list was not supplied.
    pub fn list<T: 'static>(&self, name: &str) -> Vec<&T> {
        match self.values.get(name) {
            Some(ArgValue::List(values)) => values.iter().filter_map(|v| v.downcast_ref()).collect(),
            _ => Vec::new(),
        }
    }

    /// Moves a single value out.
    pub fn take<T: 'static>(&mut self, name: &str) -> Option<T> {
        match self.values.remove(name)? {
            ArgValue::Single(value) => value.downcast::<T>().ok().map(|v| *v),
            _ => None,
        }
    }

    /// Whether the argument ended up with a value, supplied or defaulted.
    pub fn is_present(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ArgValue::Single(_) | ArgValue::List(_)))
    }

    pub fn raw(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Binds the tokens following a command name to its declared arguments, left to right.
///
/// Single arguments take one token each; a trailing variadic takes the rest. Tokens left over once
/// every argument is bound are ignored.
pub async fn parse(
    tokens: &[&str],
    spec: &CommandSpec,
    ctxt: &dyn ResolutionContext,
) -> Result<ParsedArguments, ParseError> {
    let mut values = HashMap::with_capacity(spec.arguments().len());
    let mut remaining = tokens;

    for arg in spec.arguments() {
        let value = match arg.multiplicity() {
            Multiplicity::One | Multiplicity::Optional => match remaining.split_first() {
                Some((raw, rest)) => {
                    remaining = rest;
                    ArgValue::Single(arg.convert(raw, ctxt).await?)
                },
                None => arg.missing()?,
            },
            Multiplicity::List => {
                let raws = std::mem::take(&mut remaining);
                if raws.is_empty() {
                    arg.missing()?
                } else {
                    ArgValue::List(convert_all(arg, raws.iter().copied(), ctxt).await?)
                }
            },
            Multiplicity::Remainder => {
                let raws = std::mem::take(&mut remaining);
                if raws.is_empty() {
                    arg.missing()?
                } else {
                    ArgValue::Single(arg.convert(&raws.join(" "), ctxt).await?)
                }
            },
        };

        values.insert(arg.name().to_owned(), value);
    }

    Ok(ParsedArguments { values })
}

/// Binds named options, as delivered by structured (slash-style) invocations.
///
/// List options are split on whitespace; every other option is converted as a whole. Options that
/// match no declared argument are ignored.
pub async fn parse_options(
    options: &[(String, String)],
    spec: &CommandSpec,
    ctxt: &dyn ResolutionContext,
) -> Result<ParsedArguments, ParseError> {
    let mut values = HashMap::with_capacity(spec.arguments().len());

    for arg in spec.arguments() {
        let raw = options
            .iter()
            .find(|(name, _)| name == arg.name())
            .map(|(_, raw)| raw.trim())
            .filter(|raw| !raw.is_empty());

        let value = match (raw, arg.multiplicity()) {
            (None, _) => arg.missing()?,
            (Some(raw), Multiplicity::List) => {
                ArgValue::List(convert_all(arg, raw.split_ascii_whitespace(), ctxt).await?)
            },
            (Some(raw), _) => ArgValue::Single(arg.convert(raw, ctxt).await?),
        };

        values.insert(arg.name().to_owned(), value);
    }

    Ok(ParsedArguments { values })
}

async fn convert_all<'a>(
    arg: &ArgumentSpec,
    raws: impl Iterator<Item = &'a str>,
    ctxt: &dyn ResolutionContext,
) -> Result<Vec<Value>, ParseError> {
    let mut converted = Vec::new();
    for raw in raws {
        converted.push(arg.convert(raw, ctxt).await?);
    }
    Ok(converted)
}
