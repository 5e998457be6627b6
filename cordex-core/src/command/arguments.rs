//! Converters turn one raw string into a typed value.
//!
//! Every argument type goes through the same [`Converter`] trait; multiplicity, requiredness and
//! choices are layered on top of it by [`super::argument::Argument`], so a converter only ever
//! sees a single raw value.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use cordex_common::util::regex::{
    CHANNEL_MENTION, CUSTOM_EMOJI, HEX_COLOUR, MESSAGE_LINK, ROLE_MENTION, USER_MENTION,
};
use cordex_common::util::{extract_digits, id_from_mention, parse_date, parse_duration};
use regex::Regex;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;
use url::Url;

use super::errors::ConvertError;
use crate::resolution::{resolve_entity, EntityKind, Lookup, ResolutionContext, ResolutionStrategy};

#[async_trait]
pub trait Converter: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    async fn convert(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<Self::Output, ConvertError>;

    /// What the argument expects, shown in usage strings.
    fn describe(&self) -> &'static str {
        "value"
    }
}

/// Any type implementing [`FromStr`], e.g. `i64`, `u32`, `f64` or `bool`.
pub struct Parsed<T>(PhantomData<fn() -> T>);

pub fn parsed<T>() -> Parsed<T> {
    Parsed(PhantomData)
}

#[async_trait]
impl<T> Converter for Parsed<T>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: Display,
{
    type Output = T;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<T, ConvertError> {
        raw.parse::<T>().map_err(|e| ConvertError::Malformed {
            expected: std::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }

    fn describe(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Free text, taken as-is.
pub struct Text;

#[async_trait]
impl Converter for Text {
    type Output = String;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<String, ConvertError> {
        Ok(raw.to_owned())
    }

    fn describe(&self) -> &'static str {
        "text"
    }
}

/// A time argument such as `1h20m30s`.
pub struct DurationArg;

#[async_trait]
impl Converter for DurationArg {
    type Output = Duration;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<Duration, ConvertError> {
        Ok(parse_duration(raw)?)
    }

    fn describe(&self) -> &'static str {
        "duration"
    }
}

/// A calendar date, see [`parse_date`] for the accepted layouts.
#[derive(Default)]
pub struct DateArg {
    default_year: Option<i32>,
}

/// A date with an optional time of day, see [`parse_date`] for the accepted layouts.
#[derive(Default)]
pub struct DateTimeArg {
    default_year: Option<i32>,
}

pub fn date() -> DateArg {
    DateArg::default()
}

pub fn date_time() -> DateTimeArg {
    DateTimeArg::default()
}

impl DateArg {
    /// Year used when the input leaves it out. Defaults to the current year (UTC).
    pub fn default_year(mut self, year: i32) -> Self {
        self.default_year = Some(year);
        self
    }
}

impl DateTimeArg {
    /// Year used when the input leaves it out. Defaults to the current year (UTC).
    pub fn default_year(mut self, year: i32) -> Self {
        self.default_year = Some(year);
        self
    }
}

fn convert_date(raw: &str, default_year: Option<i32>) -> Result<PrimitiveDateTime, ConvertError> {
    let year = default_year.unwrap_or_else(|| OffsetDateTime::now_utc().year());
    parse_date(raw, year).ok_or_else(|| ConvertError::Malformed {
        expected: "a date",
        reason: "use a date such as 24.12.2024, 2024-12-24 or Dec 24".to_owned(),
    })
}

#[async_trait]
impl Converter for DateArg {
    type Output = Date;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<Date, ConvertError> {
        convert_date(raw, self.default_year).map(|at| at.date())
    }

    fn describe(&self) -> &'static str {
        "date"
    }
}

#[async_trait]
impl Converter for DateTimeArg {
    type Output = PrimitiveDateTime;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<PrimitiveDateTime, ConvertError> {
        convert_date(raw, self.default_year)
    }

    fn describe(&self) -> &'static str {
        "date and time"
    }
}

/// A platform ID. Any non-digit characters (such as mention syntax) are ignored.
pub struct SnowflakeArg;

#[async_trait]
impl Converter for SnowflakeArg {
    type Output = u64;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<u64, ConvertError> {
        let digits = extract_digits(raw);
        match digits.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            Ok(_) => Err(ConvertError::Malformed {
                expected: "an ID",
                reason: "IDs cannot be zero".to_owned(),
            }),
            Err(e) => Err(ConvertError::Malformed {
                expected: "an ID",
                reason: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> &'static str {
        "id"
    }
}

pub struct UrlArg;

#[async_trait]
impl Converter for UrlArg {
    type Output = Url;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<Url, ConvertError> {
        Ok(Url::parse(raw)?)
    }

    fn describe(&self) -> &'static str {
        "url"
    }
}

/// A 24-bit RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colour(pub u32);

impl Colour {
    pub fn rgb(&self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }
}

impl Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

static NAMED_COLOURS: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("blue", 0x0000ff),
    ("cyan", 0x00ffff),
    ("gray", 0x808080),
    ("green", 0x00ff00),
    ("grey", 0x808080),
    ("magenta", 0xff00ff),
    ("orange", 0xffa500),
    ("pink", 0xffc0cb),
    ("purple", 0x800080),
    ("red", 0xff0000),
    ("white", 0xffffff),
    ("yellow", 0xffff00),
];

/// A colour given as `#rrggbb`, `0xrrggbb`, `rrggbb` or a basic colour name.
pub struct ColourArg;

#[async_trait]
impl Converter for ColourArg {
    type Output = Colour;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<Colour, ConvertError> {
        if let Some(&(_, value)) = NAMED_COLOURS.iter().find(|(name, _)| name.eq_ignore_ascii_case(raw)) {
            return Ok(Colour(value));
        }

        let hex = HEX_COLOUR.captures(raw).ok_or_else(|| ConvertError::Malformed {
            expected: "a colour",
            reason: "use a hex code like #ff8800 or a colour name".to_owned(),
        })?;

        u32::from_str_radix(&hex[1], 16)
            .map(Colour)
            .map_err(|e| ConvertError::Malformed {
                expected: "a colour",
                reason: e.to_string(),
            })
    }

    fn describe(&self) -> &'static str {
        "colour"
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomEmoji {
    pub name: String,
    pub id: u64,
    pub animated: bool,
}

/// A custom emoji in `<:name:id>` or `<a:name:id>` form.
pub struct CustomEmojiArg;

#[async_trait]
impl Converter for CustomEmojiArg {
    type Output = CustomEmoji;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<CustomEmoji, ConvertError> {
        let captures = CUSTOM_EMOJI.captures(raw).ok_or_else(|| ConvertError::Malformed {
            expected: "a custom emoji",
            reason: "not an emoji".to_owned(),
        })?;

        Ok(CustomEmoji {
            animated: !captures[1].is_empty(),
            name: captures[2].to_owned(),
            id: captures[3].parse().map_err(|_| ConvertError::Malformed {
                expected: "a custom emoji",
                reason: "emoji ID out of range".to_owned(),
            })?,
        })
    }

    fn describe(&self) -> &'static str {
        "emoji"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnicodeEmoji {
    pub glyph: &'static str,
    pub name: &'static str,
    /// Space-separated uppercase hex code points, e.g. `1F44D`.
    pub codepoint: &'static str,
}

/// A single standard (Unicode) emoji, given as the glyph itself.
pub struct UnicodeEmojiArg;

#[async_trait]
impl Converter for UnicodeEmojiArg {
    type Output = UnicodeEmoji;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<UnicodeEmoji, ConvertError> {
        let emoji = emoji::lookup_by_glyph::lookup(raw).ok_or_else(|| ConvertError::Malformed {
            expected: "an emoji",
            reason: "not a standard emoji".to_owned(),
        })?;

        Ok(UnicodeEmoji {
            glyph: emoji.glyph,
            name: emoji.name,
            codepoint: emoji.codepoint,
        })
    }

    fn describe(&self) -> &'static str {
        "emoji"
    }
}

/// Maps fixed keywords onto values.
pub struct Mapped<T> {
    values: Vec<(String, T)>,
    ignore_case: bool,
}

impl<T> Mapped<T> {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

#[async_trait]
impl<T> Converter for Mapped<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<T, ConvertError> {
        self.values
            .iter()
            .find(|(key, _)| {
                if self.ignore_case {
                    key.eq_ignore_ascii_case(raw)
                } else {
                    key == raw
                }
            })
            .map(|(_, value)| value.clone())
            .ok_or_else(|| ConvertError::NotAChoice(self.values.iter().map(|(k, _)| k.clone()).collect()))
    }

    fn describe(&self) -> &'static str {
        "keyword"
    }
}

/// An entity (user, channel or role) resolved through the invocation's [`ResolutionContext`].
///
/// Mentions and raw IDs are looked up by ID, anything else by name. The current guild is
/// searched first; [`EntityArg::search_mutual_guilds`] adds a fallback for invocations outside
/// of a guild.
pub struct EntityArg<M> {
    kind: EntityKind,
    mention: &'static Regex,
    strategies: Vec<ResolutionStrategy>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> EntityArg<M> {
    fn new(kind: EntityKind, mention: &'static Regex) -> Self {
        Self {
            kind,
            mention,
            strategies: vec![ResolutionStrategy::CurrentGuild],
            _marker: PhantomData,
        }
    }

    pub fn search_mutual_guilds(mut self) -> Self {
        if !self.strategies.contains(&ResolutionStrategy::MutualGuilds) {
            self.strategies.push(ResolutionStrategy::MutualGuilds);
        }
        self
    }

    pub fn strategies(&self) -> &[ResolutionStrategy] {
        &self.strategies
    }
}

pub type UserArg = EntityArg<UserMarker>;
pub type ChannelArg = EntityArg<ChannelMarker>;
pub type RoleArg = EntityArg<RoleMarker>;

pub fn user() -> UserArg {
    EntityArg::new(EntityKind::User, &USER_MENTION)
}

pub fn channel() -> ChannelArg {
    EntityArg::new(EntityKind::Channel, &CHANNEL_MENTION)
}

pub fn role() -> RoleArg {
    EntityArg::new(EntityKind::Role, &ROLE_MENTION)
}

#[async_trait]
impl<M: 'static> Converter for EntityArg<M> {
    type Output = Id<M>;

    async fn convert(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<Id<M>, ConvertError> {
        let lookup = id_from_mention(raw, self.mention).map_or(Lookup::Name(raw), Lookup::Id);

        let id = resolve_entity(ctxt, &self.strategies, self.kind, lookup).await?;
        Id::new_checked(id).ok_or(ConvertError::NotFound(self.kind))
    }

    fn describe(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// A message addressed by its ID or by its link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRef {
    /// `None` for messages in private channels.
    pub guild_id: Option<Id<GuildMarker>>,
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
}

/// A message, given as an ID (looked up in the current channel) or as a message link.
///
/// Links must point into the current guild. Outside of guilds,
/// [`MessageArg::search_mutual_guilds`] also accepts links into guilds shared with the user, and
/// links into private channels are only accepted with [`MessageArg::include_private_channels`].
#[derive(Default)]
pub struct MessageArg {
    mutual_guilds: bool,
    private_channels: bool,
}

pub fn message() -> MessageArg {
    MessageArg::default()
}

impl MessageArg {
    pub fn search_mutual_guilds(mut self) -> Self {
        self.mutual_guilds = true;
        self
    }

    pub fn include_private_channels(mut self) -> Self {
        self.private_channels = true;
        self
    }

    /// Whether a link into `guild_id` may be followed from this invocation.
    async fn reaches(&self, guild_id: Id<GuildMarker>, ctxt: &dyn ResolutionContext) -> Result<bool, ConvertError> {
        match ctxt.guild_id() {
            Some(current) => Ok(current == guild_id),
            None if self.mutual_guilds => Ok(ctxt
                .mutual_guilds()
                .await
                .map_err(ConvertError::Lookup)?
                .contains(&guild_id)),
            None => Ok(false),
        }
    }

    async fn locate(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<Option<MessageRef>, ConvertError> {
        let Some(link) = MESSAGE_LINK.captures(raw) else {
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(None);
            }
            return Ok(raw.parse().ok().and_then(Id::new_checked).map(|message_id| MessageRef {
                guild_id: ctxt.guild_id(),
                channel_id: ctxt.channel_id(),
                message_id,
            }));
        };

        let (Some(channel_id), Some(message_id)) = (
            link[2].parse().ok().and_then(Id::new_checked),
            link[3].parse().ok().and_then(Id::new_checked),
        ) else {
            return Ok(None);
        };

        if &link[1] == "@me" {
            let found = self.private_channels.then_some(MessageRef {
                guild_id: None,
                channel_id,
                message_id,
            });
            return Ok(found);
        }

        let Some(guild_id) = link[1].parse().ok().and_then(Id::<GuildMarker>::new_checked) else {
            return Ok(None);
        };
        if !self.reaches(guild_id, ctxt).await? {
            return Ok(None);
        }

        // the channel has to belong to the linked guild
        let channel = ctxt
            .find_entity(EntityKind::Channel, guild_id, Lookup::Id(channel_id.get()))
            .await
            .map_err(ConvertError::Lookup)?;

        Ok(channel.map(|_| MessageRef {
            guild_id: Some(guild_id),
            channel_id,
            message_id,
        }))
    }
}

#[async_trait]
impl Converter for MessageArg {
    type Output = MessageRef;

    async fn convert(&self, raw: &str, ctxt: &dyn ResolutionContext) -> Result<MessageRef, ConvertError> {
        let Some(found) = self.locate(raw, ctxt).await? else {
            return Err(ConvertError::NotFound(EntityKind::Message));
        };

        if ctxt
            .find_message(found.channel_id, found.message_id)
            .await
            .map_err(ConvertError::Lookup)?
        {
            Ok(found)
        } else {
            Err(ConvertError::NotFound(EntityKind::Message))
        }
    }

    fn describe(&self) -> &'static str {
        "message"
    }
}

/// A converter backed by a plain function.
pub struct FnConverter<F, T> {
    f: F,
    description: &'static str,
    _output: PhantomData<fn() -> T>,
}

pub fn from_fn<F, T>(description: &'static str, f: F) -> FnConverter<F, T>
where
    F: Fn(&str) -> Result<T, ConvertError> + Send + Sync + 'static,
{
    FnConverter {
        f,
        description,
        _output: PhantomData,
    }
}

#[async_trait]
impl<F, T> Converter for FnConverter<F, T>
where
    F: Fn(&str) -> Result<T, ConvertError> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    async fn convert(&self, raw: &str, _: &dyn ResolutionContext) -> Result<T, ConvertError> {
        (self.f)(raw)
    }

    fn describe(&self) -> &'static str {
        self.description
    }
}
