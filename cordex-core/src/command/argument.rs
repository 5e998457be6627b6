use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;

use super::arguments::Converter;
use super::errors::{ConvertError, ParseError};
use crate::resolution::ResolutionContext;

/// A converted argument value. Retrieved by type through [`super::parser::ParsedArguments`].
pub type Value = Box<dyn Any + Send + Sync>;

/// How many input tokens an argument consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplicity {
    /// Exactly one token, required.
    One,
    /// Zero or one token.
    Optional,
    /// Every remaining token, each converted separately.
    List,
    /// Every remaining token, joined back together and converted once.
    Remainder,
}

impl Multiplicity {
    pub fn is_variadic(&self) -> bool {
        matches!(self, Self::List | Self::Remainder)
    }
}

/// The result of parsing one argument.
pub enum ArgValue {
    Single(Value),
    List(Vec<Value>),
    /// Not supplied and no default was declared.
    Absent,
}

impl std::fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(_) => f.write_str("Single(..)"),
            Self::List(values) => write!(f, "List(len = {})", values.len()),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

type DefaultFn = Box<dyn Fn() -> ArgValue + Send + Sync>;

#[async_trait]
trait ErasedConverter: Send + Sync {
    async fn convert_erased(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<Value, ConvertError>;
    fn description(&self) -> &'static str;
}

#[async_trait]
impl<C: Converter> ErasedConverter for C {
    async fn convert_erased(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<Value, ConvertError> {
        let value = self.convert(raw, ctxt).await?;
        Ok(Box::new(value))
    }

    fn description(&self) -> &'static str {
        Converter::describe(self)
    }
}

/// Typed builder for an [`ArgumentSpec`], so defaults are checked against the converter's
/// output type.
pub struct Argument<C: Converter> {
    name: String,
    multiplicity: Multiplicity,
    required: bool,
    default: Option<DefaultFn>,
    choices: Option<BTreeSet<String>>,
    converter: C,
}

impl<C: Converter> Argument<C> {
    fn new(name: &str, multiplicity: Multiplicity, converter: C) -> Self {
        Self {
            name: name.to_owned(),
            required: multiplicity != Multiplicity::Optional,
            multiplicity,
            default: None,
            choices: None,
            converter,
        }
    }

    pub fn one(name: &str, converter: C) -> Self {
        Self::new(name, Multiplicity::One, converter)
    }

    pub fn optional(name: &str, converter: C) -> Self {
        Self::new(name, Multiplicity::Optional, converter)
    }

    pub fn list(name: &str, converter: C) -> Self {
        Self::new(name, Multiplicity::List, converter)
    }

    pub fn remainder(name: &str, converter: C) -> Self {
        Self::new(name, Multiplicity::Remainder, converter)
    }

    /// Allows a variadic argument to receive no input at all.
    pub fn not_required(mut self) -> Self {
        self.required = false;
        if self.multiplicity == Multiplicity::One {
            self.multiplicity = Multiplicity::Optional;
        }
        self
    }

    /// Value used when the argument is not supplied. Implies [`Argument::not_required`].
    pub fn default_value(mut self, value: C::Output) -> Self
    where
        C::Output: Clone,
    {
        let as_list = self.multiplicity == Multiplicity::List;
        self.default = Some(Box::new(move || {
            if as_list {
                ArgValue::List(vec![Box::new(value.clone()) as Value])
            } else {
                ArgValue::Single(Box::new(value.clone()))
            }
        }));
        self.not_required()
    }

    /// Default for a list argument with several elements.
    pub fn default_values(mut self, values: Vec<C::Output>) -> Self
    where
        C::Output: Clone,
    {
        self.default = Some(Box::new(move || {
            ArgValue::List(values.iter().cloned().map(|v| Box::new(v) as Value).collect())
        }));
        self.not_required()
    }

    /// Restricts the raw input to a fixed set of strings, checked before conversion.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }
}

/// A declared argument of a command. Immutable once built.
pub struct ArgumentSpec {
    name: String,
    multiplicity: Multiplicity,
    required: bool,
    default: Option<DefaultFn>,
    choices: Option<BTreeSet<String>>,
    converter: Box<dyn ErasedConverter>,
}

impl<C: Converter> From<Argument<C>> for ArgumentSpec {
    fn from(arg: Argument<C>) -> Self {
        Self {
            name: arg.name,
            multiplicity: arg.multiplicity,
            required: arg.required,
            default: arg.default,
            choices: arg.choices,
            converter: Box::new(arg.converter),
        }
    }
}

impl std::fmt::Debug for ArgumentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentSpec")
            .field("name", &self.name)
            .field("multiplicity", &self.multiplicity)
            .field("required", &self.required)
            .field("choices", &self.choices)
            .field("converter", &self.converter.description())
            .finish()
    }
}

impl ArgumentSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn choices(&self) -> Option<&BTreeSet<String>> {
        self.choices.as_ref()
    }

    pub fn describe(&self) -> &'static str {
        self.converter.description()
    }

    /// `<name>` for required arguments, `[name]` otherwise, with `...` marking variadics.
    pub fn usage(&self) -> String {
        let dots = if self.multiplicity.is_variadic() { "..." } else { "" };
        if self.required {
            format!("<{}{dots}>", self.name)
        } else {
            format!("[{}{dots}]", self.name)
        }
    }

    /// The value of this argument when no input was supplied for it.
    pub fn missing(&self) -> Result<ArgValue, ParseError> {
        if self.required {
            return Err(ParseError::MissingArgument(self.name.clone()));
        }

        Ok(self.default.as_ref().map_or(ArgValue::Absent, |default| default()))
    }

    /// Validates and converts one raw value. Choice checks happen first; converter panics are
    /// reported as invalid input rather than unwinding into the caller.
    pub async fn convert(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<Value, ParseError> {
        let invalid = |cause| ParseError::InvalidArgument {
            name: self.name.clone(),
            raw: raw.to_owned(),
            cause,
        };

        if let Some(choices) = &self.choices {
            if !choices.contains(raw) {
                return Err(invalid(ConvertError::NotAChoice(choices.iter().cloned().collect())));
            }
        }

        match AssertUnwindSafe(self.converter.convert_erased(raw, ctxt))
            .catch_unwind()
            .await
        {
            Ok(result) => result.map_err(invalid),
            Err(_) => Err(invalid(ConvertError::Other("the value could not be processed".to_owned()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use twilight_model::id::Id;

    use super::*;
    use crate::command::arguments::{from_fn, parsed, Text};
    use crate::resolution::memory::{MemoryContext, MemoryDirectory};

    fn ctxt() -> MemoryContext {
        MemoryContext {
            directory: Arc::new(MemoryDirectory::new()),
            author_id: Id::new(1),
            channel_id: Id::new(2),
            guild_id: None,
            self_id: Id::new(3),
        }
    }

    #[test]
    fn usage_strings() {
        let one: ArgumentSpec = Argument::one("amount", parsed::<i64>()).into();
        let optional: ArgumentSpec = Argument::optional("reason", Text).into();
        let list: ArgumentSpec = Argument::list("values", parsed::<i64>()).into();
        let optional_list: ArgumentSpec = Argument::list("values", parsed::<i64>()).not_required().into();
        let rest: ArgumentSpec = Argument::remainder("text", Text).into();

        assert_eq!(one.usage(), "<amount>");
        assert_eq!(optional.usage(), "[reason]");
        assert_eq!(list.usage(), "<values...>");
        assert_eq!(optional_list.usage(), "[values...]");
        assert_eq!(rest.usage(), "<text...>");
    }

    #[test]
    fn defaults_apply_only_when_missing() {
        let required: ArgumentSpec = Argument::one("amount", parsed::<i64>()).into();
        assert!(matches!(required.missing(), Err(ParseError::MissingArgument(name)) if name == "amount"));

        let absent: ArgumentSpec = Argument::optional("amount", parsed::<i64>()).into();
        assert!(matches!(absent.missing(), Ok(ArgValue::Absent)));

        let defaulted: ArgumentSpec = Argument::one("amount", parsed::<i64>()).default_value(5).into();
        assert_eq!(defaulted.multiplicity(), Multiplicity::Optional);
        match defaulted.missing() {
            Ok(ArgValue::Single(value)) => assert_eq!(value.downcast_ref::<i64>(), Some(&5)),
            other => panic!("unexpected {other:?}"),
        }

        let list: ArgumentSpec = Argument::list("values", parsed::<i64>())
            .default_values(vec![1, 2])
            .into();
        match list.missing() {
            Ok(ArgValue::List(values)) => assert_eq!(values.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn choices_are_checked_before_conversion() {
        let spec: ArgumentSpec = Argument::one("mode", Text).choices(["slow", "fast"]).into();
        let ctxt = ctxt();

        assert!(spec.convert("fast", &ctxt).await.is_ok());
        match spec.convert("FAST", &ctxt).await {
            Err(ParseError::InvalidArgument {
                cause: ConvertError::NotAChoice(choices),
                ..
            }) => assert_eq!(choices, ["fast", "slow"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn converter_panics_become_invalid_arguments() {
        let spec: ArgumentSpec = Argument::one(
            "boom",
            from_fn("anything", |_| -> Result<u8, ConvertError> { panic!("converter bug") }),
        )
        .into();

        let err = spec.convert("x", &ctxt()).await.unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { ref name, .. } if name == "boom"));
    }
}
