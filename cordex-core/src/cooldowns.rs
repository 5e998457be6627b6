use std::fmt::Display;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

/// The subject dimension a cooldown window is tracked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    User,
    Channel,
    Guild,
}

impl Display for CooldownScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Channel => "channel",
            Self::Guild => "server",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownEntry {
    pub start: Instant,
    pub end: Instant,
}
/// Windows longer than this end at `start + MAX_WINDOW` when `start + duration` is not
/// representable.
const MAX_WINDOW: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

impl CooldownEntry {
    fn starting_at(now: Instant, duration: Duration) -> Self {
        let end = now
            .checked_add(duration)
            .or_else(|| now.checked_add(MAX_WINDOW))
            // only reachable with a clock at the very end of its range
            .unwrap_or(now);
        Self { start: now, end }
    }

    /// Time left in this window, or `None` if it has expired at `now`.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        (now < self.end).then(|| self.end - now)
    }
}

type CooldownMap = DashMap<(String, u64), CooldownEntry>;

/// All command cooldowns, in the format <(command name, subject id) => window>, with one map per
/// scope.
///
/// Expired entries are never evicted; expiry is judged when the entry is next queried and a new
/// window simply overwrites the old one.
#[derive(Default)]
pub struct CooldownTracker {
    user: CooldownMap,
    channel: CooldownMap,
    guild: CooldownMap,
}
impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, scope: CooldownScope) -> &CooldownMap {
        match scope {
            CooldownScope::User => &self.user,
            CooldownScope::Channel => &self.channel,
            CooldownScope::Guild => &self.guild,
        }
    }

    pub fn get(&self, scope: CooldownScope, command: &str, subject: u64) -> Option<CooldownEntry> {
        self.map(scope).get(&(command.to_owned(), subject)).map(|e| *e)
    }

    pub fn is_on_cooldown(&self, scope: CooldownScope, command: &str, subject: u64, now: Instant) -> bool {
        self.get_remaining(scope, command, subject, now).is_some()
    }

    pub fn get_remaining(&self, scope: CooldownScope, command: &str, subject: u64, now: Instant) -> Option<Duration> {
        self.get(scope, command, subject)?.remaining(now)
    }

    /// Unconditionally starts a new window, overwriting any existing one.
    pub fn start_cooldown(&self, scope: CooldownScope, command: &str, subject: u64, duration: Duration, now: Instant) {
        self.map(scope)
            .insert((command.to_owned(), subject), CooldownEntry::starting_at(now, duration));
    }

    /// Checks the cooldown and, if it is not active, starts a new window, all under the entry's
    /// lock. Returns the remaining time of the active window otherwise.
    ///
    /// Concurrent callers for the same key are serialized, so at most one of them can start a
    /// window.
    pub fn try_start(
        &self,
        scope: CooldownScope,
        command: &str,
        subject: u64,
        duration: Duration,
        now: Instant,
    ) -> Result<CooldownEntry, Duration> {
        let window = CooldownEntry::starting_at(now, duration);
        if duration.is_zero() {
            return Ok(window);
        }

        match self.map(scope).entry((command.to_owned(), subject)) {
            Entry::Occupied(mut entry) => {
                if let Some(remaining) = entry.get().remaining(now) {
                    return Err(remaining);
                }
                entry.insert(window);
            },
            Entry::Vacant(entry) => {
                entry.insert(window);
            },
        }

        Ok(window)
    }

    /// Removes a window, e.g. when a command decides an invocation should not count.
    pub fn reset(&self, scope: CooldownScope, command: &str, subject: u64) -> Option<CooldownEntry> {
        self.map(scope).remove(&(command.to_owned(), subject)).map(|(_, e)| e)
    }

    /// Removes a window only if it is still the one that started at `start`. A newer window for
    /// the same key is left alone.
    pub fn revoke(&self, scope: CooldownScope, command: &str, subject: u64, start: Instant) -> Option<CooldownEntry> {
        self.map(scope)
            .remove_if(&(command.to_owned(), subject), |_, entry| entry.start == start)
            .map(|(_, e)| e)
    }

    /// Number of tracked (possibly expired) windows in a scope.
    pub fn len(&self, scope: CooldownScope) -> usize {
        self.map(scope).len()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.channel.is_empty() && self.guild.is_empty()
    }
}
