use std::{sync::Arc, time::Duration};

use crate::context::CommandContext;

pub mod lua_command;
pub mod registry;

pub use registry::Registry;

#[serenity::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: CommandContext) -> anyhow::Result<()>;
}

/// Which paths a command can be invoked through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationMode {
    TextOnly,
    RemoteOnly,
    Both,
}

impl InvocationMode {
    pub fn text(self) -> bool {
        matches!(self, InvocationMode::TextOnly | InvocationMode::Both)
    }

    pub fn remote(self) -> bool {
        matches!(self, InvocationMode::RemoteOnly | InvocationMode::Both)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}

impl OptionKind {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => OptionKind::String,
            "integer" => OptionKind::Integer,
            "number" => OptionKind::Number,
            "boolean" => OptionKind::Boolean,
            "user" => OptionKind::User,
            "channel" => OptionKind::Channel,
            "role" => OptionKind::Role,
            "mentionable" => OptionKind::Mentionable,
            "attachment" => OptionKind::Attachment,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
}

#[derive(Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub aliases: Vec<String>,
    pub category: String,
    /// Zero means unthrottled
    pub cooldown: Duration,
    pub mode: InvocationMode,
    /// Slash registration goes to the global scope instead of the test guilds
    pub global: bool,
    pub description: String,
    pub options: Vec<OptionSpec>,
    pub handler: Arc<dyn CommandHandler>,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("cooldown", &self.cooldown)
            .field("mode", &self.mode)
            .field("global", &self.global)
            .finish_non_exhaustive()
    }
}
