use std::collections::HashMap;

use parking_lot::RwLock;
use serenity::all::GuildId;

use crate::constant;

/// Per-guild prefix overrides on top of a process-wide default
pub struct PrefixResolver {
    default: RwLock<String>,
    /// Keyed by raw guild ID; DMs use [`constant::DM_GUILD_KEY`]
    overrides: RwLock<HashMap<u64, String>>,
}

impl PrefixResolver {
    pub fn new(default: impl Into<String>) -> Self {
        let default = default.into();
        Self {
            default: RwLock::new(if default.is_empty() {
                constant::DEFAULT_PREFIX.to_string()
            } else {
                default
            }),
            overrides: RwLock::default(),
        }
    }

    pub fn resolve(&self, guild_id: Option<GuildId>) -> String {
        self.overrides
            .read()
            .get(&key(guild_id))
            .cloned()
            .unwrap_or_else(|| self.default())
    }

    pub fn default(&self) -> String {
        self.default.read().clone()
    }

    /// Empty prefixes are ignored
    pub fn set_default(&self, prefix: &str) {
        if !prefix.is_empty() {
            *self.default.write() = prefix.to_string();
        }
    }

    /// Upserts the guild's prefix; `None` stores the current default.
    pub fn set_guild_prefix(&self, guild_id: Option<GuildId>, prefix: Option<&str>) {
        let prefix = match prefix {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => self.default(),
        };
        self.overrides.write().insert(key(guild_id), prefix);
    }
}

fn key(guild_id: Option<GuildId>) -> u64 {
    guild_id.map_or(constant::DM_GUILD_KEY, GuildId::get)
}
