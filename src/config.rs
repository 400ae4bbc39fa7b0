use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::constant;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Configuration {
    pub authentication: Authentication,
    pub discord: Discord,
    pub cooldown: Cooldown,
    pub permissions: Permissions,
}
impl Configuration {
    const FILENAME: &str = "config.toml";

    pub fn load() -> anyhow::Result<Self> {
        let config = if let Ok(file) = std::fs::read_to_string(Self::FILENAME) {
            toml::from_str(&file).context("failed to load config")?
        } else {
            Self::default()
        };
        config.save()?;

        Ok(config)
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(std::fs::write(
            Self::FILENAME,
            toml::to_string_pretty(self)?,
        )?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Authentication {
    pub discord_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Discord {
    /// Prefix used in guilds without an override, and in DMs
    pub default_prefix: String,
    /// Whether text commands are accepted in direct messages
    pub allow_dms: bool,
    pub commands_dir: String,
    pub events_dir: String,
    /// Guilds that receive non-global slash commands. Empty means non-global
    /// slash commands are not published anywhere.
    pub test_guilds: Vec<u64>,
}

impl Default for Discord {
    fn default() -> Self {
        Self {
            default_prefix: constant::DEFAULT_PREFIX.to_string(),
            allow_dms: true,
            commands_dir: "commands".to_string(),
            events_dir: "events".to_string(),
            test_guilds: vec![],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Cooldown {
    /// Users whose level is strictly above this value skip cooldowns
    pub bypass_level: u8,
    /// Apply cooldowns to prefix commands
    pub text: bool,
    /// Apply cooldowns to slash commands
    pub slash: bool,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self {
            bypass_level: 9,
            text: true,
            slash: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Permissions {
    /// User ID -> permission level. Users not listed are level 0.
    pub levels: HashMap<String, u8>,
}
