use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref CUSTOM_EMOJI: Regex = Regex::new(r"^<(a?):(\w+):(\d{1,20})>$").unwrap();
    pub static ref USER_MENTION: Regex = Regex::new(r"^<@!?(\d{1,20})>$").unwrap();
    pub static ref CHANNEL_MENTION: Regex = Regex::new(r"^<#(\d{1,20})>$").unwrap();
    pub static ref ROLE_MENTION: Regex = Regex::new(r"^<@&(\d{1,20})>$").unwrap();
    pub static ref DURATION: Regex = Regex::new(r"^(?:\d+(?:\.\d+)?\s*[a-zA-Z]+\s*)+$").unwrap();
    pub static ref DURATION_PART: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*([a-zA-Z]+)").unwrap();
    pub static ref MESSAGE_LINK: Regex = Regex::new(
        r"^https?://(?:(?:ptb|canary)\.)?discord(?:app)?\.com/channels/(\d{1,20}|@me)/(\d{1,20})/(\d{1,20})$"
    )
    .unwrap();
    pub static ref HEX_COLOUR: Regex = Regex::new(r"^(?:#|0x)?([0-9a-fA-F]{6})$").unwrap();
}
