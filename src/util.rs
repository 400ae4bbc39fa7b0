use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use serenity::{all::*, async_trait};

use crate::context::OptionValue;

/// Somewhere a handler can reply to: the channel a text command came from, or
/// the slash command interaction itself.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn say(&self, message: &str) -> anyhow::Result<()>;
}

/// Sends messages to arbitrary channels on behalf of event handlers.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn say(&self, channel_id: ChannelId, message: &str) -> anyhow::Result<()>;
}

pub struct ChannelResponder {
    http: Arc<Http>,
    channel_id: ChannelId,
}
impl ChannelResponder {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}
#[async_trait]
impl Responder for ChannelResponder {
    async fn say(&self, message: &str) -> anyhow::Result<()> {
        self.channel_id
            .send_message(
                &*self.http,
                CreateMessage::new()
                    .content(message)
                    .allowed_mentions(CreateAllowedMentions::new()),
            )
            .await?;
        Ok(())
    }
}

/// The first reply answers the interaction; later replies become followups.
pub struct InteractionResponder {
    http: Arc<Http>,
    interaction: CommandInteraction,
    responded: AtomicBool,
}
impl InteractionResponder {
    pub fn new(http: Arc<Http>, interaction: CommandInteraction) -> Self {
        Self {
            http,
            interaction,
            responded: AtomicBool::new(false),
        }
    }
}
#[async_trait]
impl Responder for InteractionResponder {
    async fn say(&self, message: &str) -> anyhow::Result<()> {
        if self.responded.swap(true, Ordering::SeqCst) {
            self.interaction
                .create_followup(
                    &*self.http,
                    CreateInteractionResponseFollowup::new()
                        .content(message)
                        .allowed_mentions(CreateAllowedMentions::new()),
                )
                .await?;
        } else {
            self.interaction
                .create_response(
                    &*self.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content(message)
                            .allowed_mentions(CreateAllowedMentions::new()),
                    ),
                )
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for Http {
    async fn say(&self, channel_id: ChannelId, message: &str) -> anyhow::Result<()> {
        channel_id
            .send_message(
                self,
                CreateMessage::new()
                    .content(message)
                    .allowed_mentions(CreateAllowedMentions::new()),
            )
            .await?;
        Ok(())
    }
}

/// Splits message content on runs of whitespace. No quoting or escaping.
pub fn split_args(content: &str) -> Vec<&str> {
    content.split_whitespace().collect()
}

/// Formats a duration as e.g. "1 day, 2 hours, 3 minutes and 4 seconds".
/// Partial seconds round up so a pending cooldown never reads as "0 seconds".
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_nanos() > 0 || secs == 0 {
        secs += 1;
    }

    let units = [
        ("day", secs / 86_400),
        ("hour", secs % 86_400 / 3_600),
        ("minute", secs % 3_600 / 60),
        ("second", secs % 60),
    ];
    let parts: Vec<String> = units
        .iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(unit, amount)| {
            format!("{amount} {unit}{}", if *amount == 1 { "" } else { "s" })
        })
        .collect();

    match parts.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
        None => "0 seconds".to_string(),
    }
}

pub fn option_values(options: &[CommandDataOption]) -> Vec<(String, OptionValue)> {
    options
        .iter()
        .filter_map(|opt| {
            let value = match &opt.value {
                CommandDataOptionValue::String(s) => OptionValue::String(s.clone()),
                CommandDataOptionValue::Integer(i) => OptionValue::Integer(*i),
                CommandDataOptionValue::Number(n) => OptionValue::Number(*n),
                CommandDataOptionValue::Boolean(b) => OptionValue::Boolean(*b),
                CommandDataOptionValue::User(id) => OptionValue::String(id.to_string()),
                CommandDataOptionValue::Channel(id) => OptionValue::String(id.to_string()),
                CommandDataOptionValue::Role(id) => OptionValue::String(id.to_string()),
                CommandDataOptionValue::Mentionable(id) => OptionValue::String(id.to_string()),
                CommandDataOptionValue::Attachment(id) => OptionValue::String(id.to_string()),
                // Subcommands are never declared by plugins
                _ => return None,
            };
            Some((opt.name.clone(), value))
        })
        .collect()
}
