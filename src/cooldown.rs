use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use serenity::all::UserId;

use crate::commands::CommandDefinition;

/// Fixed-window throttle per (user, command). Entries are created on first use
/// and live as long as the tracker.
pub struct CooldownTracker {
    bypass_level: u8,
    last_used: Mutex<HashMap<UserId, HashMap<String, u64>>>,
}

impl CooldownTracker {
    pub fn new(bypass_level: u8) -> Self {
        Self {
            bypass_level,
            last_used: Mutex::default(),
        }
    }

    /// Returns the remaining wait if the user is still cooling down, otherwise
    /// records the invocation and returns None.
    pub fn check_and_consume(
        &self,
        user: UserId,
        level: u8,
        command: &CommandDefinition,
    ) -> Option<Duration> {
        self.check_and_consume_at(user, level, command, now_millis())
    }

    pub fn check_and_consume_at(
        &self,
        user: UserId,
        level: u8,
        command: &CommandDefinition,
        now_ms: u64,
    ) -> Option<Duration> {
        if level > self.bypass_level || command.cooldown.is_zero() {
            return None;
        }
        let cooldown_ms = u64::try_from(command.cooldown.as_millis()).unwrap_or(u64::MAX);

        let mut last_used = self.last_used.lock();
        let per_user = last_used.entry(user).or_default();
        // A missing entry counts as a full window ago, even when the window is
        // longer than the clock has been running
        if let Some(&last) = per_user.get(&command.name) {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < cooldown_ms {
                return Some(Duration::from_millis(cooldown_ms - elapsed));
            }
        }

        per_user.insert(command.name.clone(), now_ms);
        None
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
