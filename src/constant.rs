pub const DEFAULT_PREFIX: &str = "!";

/// Category given to commands that neither declare one nor live in a subdirectory
pub const DEFAULT_CATEGORY: &str = "default";

/// Prefix map key standing in for "no guild" (direct messages)
pub const DM_GUILD_KEY: u64 = 0;

/// File extensions recognised as plugins
pub const PLUGIN_EXTENSIONS: &[&str] = &["lua", "luau"];

/// names of fields read from plugin tables
pub mod field {
    pub const NAME: &str = "name";
    pub const RUN: &str = "run";
    pub const ALIASES: &str = "aliases";
    pub const CATEGORY: &str = "category";
    pub const COOLDOWN: &str = "cooldown";
    pub const SLASH: &str = "slash";
    pub const GLOBAL: &str = "global";
    pub const DESCRIPTION: &str = "description";
    pub const OPTIONS: &str = "options";
    pub const ONCE: &str = "once";
    pub const TYPE: &str = "type";
    pub const REQUIRED: &str = "required";
}

/// names of platform events that can be bound by event plugins
pub mod event {
    pub const READY: &str = "ready";
    pub const MESSAGE: &str = "message";
    pub const GUILD_CREATE: &str = "guild_create";
    pub const GUILD_MEMBER_ADDITION: &str = "guild_member_addition";
    pub const REACTION_ADD: &str = "reaction_add";
    pub const INTERACTION_CREATE: &str = "interaction_create";

    pub const ALL: &[&str] = &[
        READY,
        MESSAGE,
        GUILD_CREATE,
        GUILD_MEMBER_ADDITION,
        REACTION_ADD,
        INTERACTION_CREATE,
    ];
}
