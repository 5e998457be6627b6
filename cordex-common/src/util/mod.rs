use std::fmt::Display;
use std::time::Duration;

use ::regex::Regex;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub mod regex;

use self::regex::{DURATION, DURATION_PART};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; `default_level` is used when it is not set.
pub fn tracing_init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_target(false)
        .init();
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseDurationError {
    InvalidFormat,
    UnknownUnit(String),
    TooLarge,
}
impl Display for ParseDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat => f.write_str("expected a duration such as 1h30m or 90s"),
            Self::UnknownUnit(unit) => write!(f, "unknown time unit '{unit}'"),
            Self::TooLarge => f.write_str("duration is too large"),
        }
    }
}
impl std::error::Error for ParseDurationError {}

fn unit_to_secs(unit: &str) -> Option<f64> {
    Some(match &*unit.to_ascii_lowercase() {
        "mo" | "month" | "months" => 2_592_000.0,
        "w" | "week" | "weeks" => 604_800.0,
        "d" | "day" | "days" => 86_400.0,
        "h" | "hour" | "hours" => 3_600.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        _ => return None,
    })
}

/// Parses a duration such as `1h30m`, `1.5h` or `2 weeks`.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let input = input.trim();
    if !DURATION.is_match(input) {
        return Err(ParseDurationError::InvalidFormat);
    }

    let mut total = 0f64;
    for part in DURATION_PART.captures_iter(input) {
        let value = part[1].parse::<f64>().map_err(|_| ParseDurationError::InvalidFormat)?;
        let unit = &part[2];
        let secs = unit_to_secs(unit).ok_or_else(|| ParseDurationError::UnknownUnit(unit.to_owned()))?;
        total += value * secs;
    }

    Duration::try_from_secs_f64(total).map_err(|_| ParseDurationError::TooLarge)
}

/// Strips every non-digit character, e.g. `<@!1234>` -> `1234`.
pub fn extract_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Extracts an ID from a mention matching `mention`, or from a token consisting only of digits.
pub fn id_from_mention(token: &str, mention: &Regex) -> Option<u64> {
    if let Some(captures) = mention.captures(token) {
        return captures[1].parse().ok();
    }

    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

/// Parses a calendar date with an optional trailing `hh:mm:ss` time, e.g. `24.12.2024`,
/// `2024-12-24 18:30:00` or `Dec 24`.
///
/// Day-first, year-first and English month-name layouts are tried in that order. A missing year
/// is taken from `default_year`; a missing time is midnight.
pub fn parse_date(input: &str, default_year: i32) -> Option<PrimitiveDateTime> {
    let input = input.trim();
    let (day, time) = match input.rsplit_once(' ') {
        Some((day, time)) if time.contains(':') => (
            day.trim_end(),
            Time::parse(time, format_description!("[hour]:[minute]:[second]")).ok()?,
        ),
        _ => (input, Time::MIDNIGHT),
    };

    parse_day(day, default_year).map(|date| PrimitiveDateTime::new(date, time))
}

fn parse_day(day: &str, default_year: i32) -> Option<Date> {
    macro_rules! attempt {
        ($input:expr, $description:tt) => {
            if let Ok(date) = Date::parse($input, format_description!($description)) {
                return Some(date);
            }
        };
    }

    let trailing = |separator: char| format!("{day}{separator}{default_year:04}");
    let leading = |separator: char| format!("{default_year:04}{separator}{day}");

    attempt!(day, "[day].[month].[year]");
    attempt!(&trailing('.'), "[day].[month].[year]");
    attempt!(day, "[day]-[month]-[year]");
    attempt!(&trailing('-'), "[day]-[month]-[year]");
    attempt!(day, "[day]/[month]/[year]");
    attempt!(&trailing('/'), "[day]/[month]/[year]");
    attempt!(day, "[year].[month].[day]");
    attempt!(&leading('.'), "[year].[month].[day]");
    attempt!(day, "[year]-[month]-[day]");
    attempt!(&leading('-'), "[year]-[month]-[day]");
    attempt!(day, "[year]/[month]/[day]");
    attempt!(&leading('/'), "[year]/[month]/[day]");
    attempt!(day, "[day] [month] [year]");
    attempt!(&trailing(' '), "[day] [month] [year]");
    attempt!(day, "[day] [month repr:short case_sensitive:false] [year]");
    attempt!(&trailing(' '), "[day] [month repr:short case_sensitive:false] [year]");
    attempt!(day, "[month repr:short case_sensitive:false] [day] [year]");
    attempt!(&trailing(' '), "[month repr:short case_sensitive:false] [day] [year]");

    None
}
