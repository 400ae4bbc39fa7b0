use std::collections::HashMap;

use serenity::all::UserId;

use crate::config;

/// Numeric permission levels. Higher is more trusted; unknown users are 0.
#[derive(Clone, Debug, Default)]
pub struct PermissionLevels {
    levels: HashMap<UserId, u8>,
}

impl PermissionLevels {
    pub fn from_config(config: &config::Permissions) -> Self {
        let levels = config
            .levels
            .iter()
            .filter_map(|(id, level)| match id.parse::<u64>() {
                Ok(id) if id != 0 => Some((UserId::new(id), *level)),
                _ => {
                    tracing::warn!("Ignoring permission level for invalid user ID {id:?}");
                    None
                }
            })
            .collect();
        Self { levels }
    }

    pub fn level(&self, user: UserId) -> u8 {
        self.levels.get(&user).copied().unwrap_or(0)
    }
}
