use std::sync::Arc;

use serenity::all::{ChannelId, GuildId, UserId};

use crate::util::{Messenger, Responder};

/// How a command was invoked, and the arguments that came with it
#[derive(Clone, Debug)]
pub enum Invocation {
    /// A prefix command. `args` are the whitespace-separated tokens after the command name.
    Text { content: String, args: Vec<String> },
    /// A slash command with its option values in declaration order
    Slash { options: Vec<(String, OptionValue)> },
}

impl Invocation {
    pub fn via(&self) -> &'static str {
        match self {
            Invocation::Text { .. } => "text",
            Invocation::Slash { .. } => "slash",
        }
    }
}

/// A command option value
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

/// Everything a command handler gets to see about an invocation
#[derive(Clone)]
pub struct CommandContext {
    /// Canonical name of the command, even when invoked through an alias
    pub command: String,
    pub invocation: Invocation,
    pub author_id: UserId,
    /// None for DMs
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub level: u8,
    pub responder: Arc<dyn Responder>,
}

/// Passed to event handlers alongside the event payload
#[derive(Clone)]
pub struct EventContext {
    pub event: String,
    pub messenger: Arc<dyn Messenger>,
}
