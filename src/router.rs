use std::{sync::Arc, time::Duration};

use serenity::all::{ChannelId, CommandInteraction, GuildId, Interaction, Message, UserId};

use crate::{
    commands::CommandDefinition,
    context::{CommandContext, Invocation, OptionValue},
    framework::Framework,
    util::{self, Responder},
};

/// The parts of a message the router looks at
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub author_id: UserId,
    pub author_bot: bool,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub content: String,
}

impl From<&Message> for InboundMessage {
    fn from(msg: &Message) -> Self {
        Self {
            author_id: msg.author.id,
            author_bot: msg.author.bot,
            guild_id: msg.guild_id,
            channel_id: msg.channel_id,
            content: msg.content.clone(),
        }
    }
}

/// A slash command invocation
#[derive(Clone, Debug)]
pub struct InboundCommand {
    pub name: String,
    pub options: Vec<(String, OptionValue)>,
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
}

impl From<&CommandInteraction> for InboundCommand {
    fn from(cmd: &CommandInteraction) -> Self {
        Self {
            name: cmd.data.name.clone(),
            options: util::option_values(&cmd.data.options),
            user_id: cmd.user.id,
            guild_id: cmd.guild_id,
            channel_id: cmd.channel_id,
        }
    }
}

/// Only command interactions are routed; everything else is ignored
pub fn classify(interaction: &Interaction) -> Option<&CommandInteraction> {
    match interaction {
        Interaction::Command(cmd) => Some(cmd),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Filtered before lookup: bot author, disabled DMs, or a non-command interaction
    Ignored,
    /// Not addressed to a known command
    NoMatch,
    /// The user must wait this long
    Throttled(Duration),
    Dispatched,
    /// The handler returned an error
    Failed,
}

impl Framework {
    pub async fn route_message(
        &self,
        msg: &InboundMessage,
        responder: Arc<dyn Responder>,
    ) -> RouteOutcome {
        if msg.author_bot || (msg.guild_id.is_none() && !self.dms_allowed()) {
            return RouteOutcome::Ignored;
        }

        let tokens = util::split_args(&msg.content);
        let Some((first, rest)) = tokens.split_first() else {
            return RouteOutcome::NoMatch;
        };

        let prefix = self.prefixes.resolve(msg.guild_id);
        let Some(name) = first.strip_prefix(prefix.as_str()) else {
            return RouteOutcome::NoMatch;
        };

        let registry = self.registry();
        let Some(command) = registry.resolve(name).filter(|c| c.mode.text()) else {
            return RouteOutcome::NoMatch;
        };

        let level = self.level(msg.author_id);
        if self.cooldown_modes.text
            && let Some(remaining) = self.cooldowns.check_and_consume(msg.author_id, level, command)
        {
            return self.throttled(command, remaining, responder.as_ref()).await;
        }

        let ctx = CommandContext {
            command: command.name.clone(),
            invocation: Invocation::Text {
                content: msg.content.clone(),
                args: rest.iter().map(|s| s.to_string()).collect(),
            },
            author_id: msg.author_id,
            guild_id: msg.guild_id,
            channel_id: msg.channel_id,
            level,
            responder,
        };
        dispatch(command, ctx).await
    }

    pub async fn route_interaction(
        &self,
        cmd: &InboundCommand,
        responder: Arc<dyn Responder>,
    ) -> RouteOutcome {
        let registry = self.registry();
        let Some(command) = registry
            .resolve_remote(&cmd.name)
            .filter(|c| c.mode.remote())
        else {
            tracing::warn!("Received unknown slash command `{}`", cmd.name);
            // Interactions must always be answered
            let message = format!("Error: unknown command `{}`", cmd.name);
            if let Err(err) = responder.say(&message).await {
                tracing::warn!("Failed to answer unknown command `{}`: {err:?}", cmd.name);
            }
            return RouteOutcome::NoMatch;
        };

        let level = self.level(cmd.user_id);
        if self.cooldown_modes.slash
            && let Some(remaining) = self.cooldowns.check_and_consume(cmd.user_id, level, command)
        {
            return self.throttled(command, remaining, responder.as_ref()).await;
        }

        let ctx = CommandContext {
            command: command.name.clone(),
            invocation: Invocation::Slash {
                options: cmd.options.clone(),
            },
            author_id: cmd.user_id,
            guild_id: cmd.guild_id,
            channel_id: cmd.channel_id,
            level,
            responder,
        };
        dispatch(command, ctx).await
    }

    async fn throttled(
        &self,
        command: &CommandDefinition,
        remaining: Duration,
        responder: &dyn Responder,
    ) -> RouteOutcome {
        let message = format!(
            "Please wait {} before using `{}` again.",
            util::format_duration(remaining),
            command.name
        );
        if let Err(err) = responder.say(&message).await {
            tracing::warn!("Failed to send cooldown notice for `{}`: {err:?}", command.name);
        }
        RouteOutcome::Throttled(remaining)
    }
}

async fn dispatch(command: &CommandDefinition, ctx: CommandContext) -> RouteOutcome {
    tracing::debug!("Dispatching `{}` for {}", command.name, ctx.author_id);
    let responder = ctx.responder.clone();
    match command.handler.run(ctx).await {
        Ok(()) => RouteOutcome::Dispatched,
        Err(err) => {
            tracing::error!("Command `{}` failed: {err:?}", command.name);
            if let Err(err) = responder.say(&format!("Error: {err}")).await {
                tracing::warn!("Failed to report error for `{}`: {err:?}", command.name);
            }
            RouteOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        config::Configuration,
        framework::{
            Section,
            tests::{framework_with, write},
        },
    };

    const USER: UserId = UserId::new(7);
    const G1: GuildId = GuildId::new(1);
    const G2: GuildId = GuildId::new(2);
    const CHANNEL: ChannelId = ChannelId::new(3);

    #[derive(Default)]
    struct CollectingResponder {
        messages: Mutex<Vec<String>>,
    }
    #[serenity::async_trait]
    impl Responder for CollectingResponder {
        async fn say(&self, message: &str) -> anyhow::Result<()> {
            self.messages.lock().push(message.to_string());
            Ok(())
        }
    }
    impl CollectingResponder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.messages.lock())
        }
    }

    fn message(content: &str, guild_id: Option<GuildId>) -> InboundMessage {
        InboundMessage {
            author_id: USER,
            author_bot: false,
            guild_id,
            channel_id: CHANNEL,
            content: content.to_string(),
        }
    }

    fn slash(name: &str) -> InboundCommand {
        InboundCommand {
            name: name.to_string(),
            options: vec![("text".to_string(), OptionValue::String("hi".to_string()))],
            user_id: USER,
            guild_id: Some(G1),
            channel_id: CHANNEL,
        }
    }

    const PING: &str = r#"return { name = "ping", run = function(ctx) ctx.reply("pong") end }"#;
    const ECHO: &str = r#"
return {
    name = "echo",
    aliases = { "say" },
    cooldown = 5,
    slash = "both",
    run = function(ctx)
        if ctx.via == "slash" then
            ctx.reply("slash:" .. ctx.options.text)
        else
            ctx.reply(ctx.command .. ":" .. table.concat(ctx.args, ","))
        end
    end,
}
"#;

    struct Fixture {
        framework: Arc<Framework>,
        responder: Arc<CollectingResponder>,
        commands: tempfile::TempDir,
        _events: tempfile::TempDir,
    }

    impl Fixture {
        fn new(config: Configuration, plugins: &[(&str, &str)]) -> Self {
            let commands = tempfile::tempdir().unwrap();
            let events = tempfile::tempdir().unwrap();
            for (name, code) in plugins {
                write(commands.path(), name, code);
            }
            Self {
                framework: framework_with(config, commands.path(), events.path()),
                responder: Arc::new(CollectingResponder::default()),
                commands,
                _events: events,
            }
        }

        async fn send(&self, msg: &InboundMessage) -> RouteOutcome {
            self.framework.route_message(msg, self.responder.clone()).await
        }

        async fn text(&self, content: &str) -> RouteOutcome {
            self.send(&message(content, Some(G1))).await
        }
    }

    #[tokio::test]
    async fn test_end_to_end_ping_echo() {
        let f = Fixture::new(
            Configuration::default(),
            &[("ping.lua", PING), ("echo.lua", ECHO)],
        );

        assert_eq!(f.text("!ping").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["pong"]);

        assert_eq!(f.text("!echo hello world").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["echo:hello,world"]);

        let RouteOutcome::Throttled(remaining) = f.text("!echo test").await else {
            panic!("expected throttle");
        };
        assert!(remaining > Duration::ZERO && remaining <= Duration::from_secs(5));
        let notice = f.responder.take();
        assert_eq!(notice.len(), 1);
        assert!(notice[0].starts_with("Please wait "), "{notice:?}");
        assert!(notice[0].contains("second"), "{notice:?}");

        // The alias shares the `echo` bucket
        assert!(matches!(f.text("!say x").await, RouteOutcome::Throttled(_)));
    }

    #[tokio::test]
    async fn test_alias_dispatches_command() {
        let f = Fixture::new(Configuration::default(), &[("echo.lua", ECHO)]);
        assert_eq!(f.text("!say x").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["echo:x"]);
    }

    #[tokio::test]
    async fn test_alias_follows_reload() {
        let f = Fixture::new(
            Configuration::default(),
            &[(
                "a.lua",
                r#"return { name = "a", aliases = { "b" },
                    run = function(ctx) ctx.reply("a") end }"#,
            )],
        );
        assert_eq!(f.text("!b").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["a"]);

        std::fs::remove_file(f.commands.path().join("a.lua")).unwrap();
        write(
            f.commands.path(),
            "c.lua",
            r#"return { name = "c", aliases = { "b" },
                run = function(ctx) ctx.reply("c") end }"#,
        );
        f.framework.reload(Section::Commands).unwrap();

        assert_eq!(f.text("!b").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["c"]);
        assert_eq!(f.text("!a").await, RouteOutcome::NoMatch);
    }

    #[tokio::test]
    async fn test_guild_prefix() {
        let f = Fixture::new(Configuration::default(), &[("ping.lua", PING)]);
        f.framework.set_guild_prefix(Some(G1), Some("?"));

        assert_eq!(f.send(&message("?ping", Some(G1))).await, RouteOutcome::Dispatched);
        assert_eq!(f.send(&message("?ping", Some(G2))).await, RouteOutcome::NoMatch);
        assert_eq!(f.send(&message("!ping", Some(G1))).await, RouteOutcome::NoMatch);
        assert_eq!(f.send(&message("!ping", Some(G2))).await, RouteOutcome::Dispatched);

        f.framework.set_default_prefix("?");
        assert_eq!(f.send(&message("?ping", Some(G2))).await, RouteOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_filters() {
        let f = Fixture::new(Configuration::default(), &[("ping.lua", PING)]);

        let mut bot = message("!ping", Some(G1));
        bot.author_bot = true;
        assert_eq!(f.send(&bot).await, RouteOutcome::Ignored);

        assert_eq!(f.send(&message("!ping", None)).await, RouteOutcome::Dispatched);
        f.framework.toggle_dms(Some(false));
        assert_eq!(f.send(&message("!ping", None)).await, RouteOutcome::Ignored);

        assert_eq!(f.text("hello there").await, RouteOutcome::NoMatch);
        assert_eq!(f.text("   ").await, RouteOutcome::NoMatch);
        assert_eq!(f.text("!unknown").await, RouteOutcome::NoMatch);
        assert_eq!(f.text("! ping").await, RouteOutcome::NoMatch);
        assert!(f.responder.take().len() == 1);
    }

    #[tokio::test]
    async fn test_handler_failure_is_contained() {
        let f = Fixture::new(
            Configuration::default(),
            &[
                (
                    "boom.lua",
                    r#"return { name = "boom", run = function() error("kaboom") end }"#,
                ),
                ("ping.lua", PING),
            ],
        );

        assert_eq!(f.text("!boom").await, RouteOutcome::Failed);
        let replies = f.responder.take();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("Error:") && replies[0].contains("kaboom"));

        assert_eq!(f.text("!ping").await, RouteOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_bypass_level_skips_cooldown() {
        let mut config = Configuration::default();
        config.permissions.levels.insert(USER.to_string(), 10);
        let f = Fixture::new(config, &[("echo.lua", ECHO)]);

        assert_eq!(f.text("!echo a").await, RouteOutcome::Dispatched);
        assert_eq!(f.text("!echo b").await, RouteOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_remote_only_is_not_text_invocable() {
        let f = Fixture::new(
            Configuration::default(),
            &[(
                "roll.lua",
                r#"return { name = "roll", slash = true, run = function(ctx) ctx.reply("4") end }"#,
            )],
        );
        assert_eq!(f.text("!roll").await, RouteOutcome::NoMatch);

        let responder = Arc::new(CollectingResponder::default());
        assert_eq!(
            f.framework.route_interaction(&slash("roll"), responder.clone()).await,
            RouteOutcome::Dispatched
        );
        assert_eq!(responder.take(), vec!["4"]);
    }

    #[tokio::test]
    async fn test_slash_path() {
        let f = Fixture::new(
            Configuration::default(),
            &[("ping.lua", PING), ("echo.lua", ECHO)],
        );
        let route = |name: &'static str| {
            let framework = f.framework.clone();
            let responder = f.responder.clone();
            async move { framework.route_interaction(&slash(name), responder).await }
        };

        // Text-only commands are invisible to slash routing, but still answered
        assert_eq!(route("ping").await, RouteOutcome::NoMatch);
        assert_eq!(f.responder.take(), vec!["Error: unknown command `ping`"]);
        assert_eq!(route("missing").await, RouteOutcome::NoMatch);
        assert_eq!(f.responder.take(), vec!["Error: unknown command `missing`"]);

        // No cooldown on the slash path by default
        assert_eq!(route("echo").await, RouteOutcome::Dispatched);
        assert_eq!(route("say").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["slash:hi", "slash:hi"]);
    }

    #[tokio::test]
    async fn test_slash_cooldown_when_enabled() {
        let mut config = Configuration::default();
        config.cooldown.slash = true;
        let f = Fixture::new(config, &[("echo.lua", ECHO)]);

        assert_eq!(
            f.framework.route_interaction(&slash("echo"), f.responder.clone()).await,
            RouteOutcome::Dispatched
        );
        assert!(matches!(
            f.framework.route_interaction(&slash("echo"), f.responder.clone()).await,
            RouteOutcome::Throttled(_)
        ));
        // Text and slash share the bucket
        assert!(matches!(f.text("!echo again").await, RouteOutcome::Throttled(_)));
    }

    const RELOAD: &str = r#"
return {
    name = "reload",
    run = function(ctx)
        local result = host.reload(ctx.args[1])
        ctx.reply(`{result.commands} {result.events} {result.skipped}`)
    end,
}
"#;

    #[tokio::test]
    async fn test_reload_from_a_running_command() {
        let f = Fixture::new(Configuration::default(), &[("reload.lua", RELOAD)]);
        assert_eq!(f.text("!new").await, RouteOutcome::NoMatch);

        write(
            f.commands.path(),
            "new.lua",
            r#"return { name = "new", run = function(ctx) ctx.reply("fresh") end }"#,
        );
        write(f.commands.path(), "broken.lua", "return { name = 'broken' }");

        assert_eq!(f.text("!reload commands").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["2 0 1"]);

        assert_eq!(f.text("!new").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["fresh"]);

        // The reload command survives reloading itself
        assert_eq!(f.text("!reload").await, RouteOutcome::Dispatched);
        assert_eq!(f.responder.take(), vec!["2 0 1"]);

        assert_eq!(f.text("!reload plugins").await, RouteOutcome::Failed);
        let replies = f.responder.take();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("unknown reload section"), "{replies:?}");
    }

    #[tokio::test]
    async fn test_host_settings_from_a_running_command() {
        let mut config = Configuration::default();
        config.permissions.levels.insert(USER.to_string(), 5);
        let f = Fixture::new(
            config,
            &[
                (
                    "info.lua",
                    r#"
return {
    name = "info",
    run = function(ctx)
        ctx.reply(tostring(host.level(ctx.author_id)))
        ctx.reply(tostring(host.level("12345")))
        ctx.reply(host.prefix(ctx.guild_id))
        ctx.reply(host.prefix())
        ctx.reply(tostring(host.dms_allowed()))
        local category = host.categories()[1]
        ctx.reply(category.name .. "=" .. category.count)
    end,
}
"#,
                ),
                ("fun/ping.lua", PING),
            ],
        );
        f.framework.set_guild_prefix(Some(G1), Some("?"));
        f.framework.toggle_dms(Some(false));

        assert_eq!(f.text("?info").await, RouteOutcome::Dispatched);
        assert_eq!(
            f.responder.take(),
            vec!["5", "0", "?", "!", "false", "default=1"]
        );
    }

    #[tokio::test]
    async fn test_interleaved_reload_keeps_snapshot() {
        let f = Fixture::new(
            Configuration::default(),
            &[(
                "slow.lua",
                r#"return { name = "slow", aliases = { "s" }, run = function(ctx)
                    sleep(50)
                    ctx.reply(host.commands()[1].name)
                end }"#,
            )],
        );

        let framework = f.framework.clone();
        let responder = f.responder.clone();
        let running = tokio::spawn(async move {
            framework.route_message(&message("!s", Some(G1)), responder).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        std::fs::remove_file(f.commands.path().join("slow.lua")).unwrap();
        write(
            f.commands.path(),
            "fast.lua",
            r#"return { name = "fast", aliases = { "s" }, run = function() end }"#,
        );
        f.framework.reload(Section::Commands).unwrap();

        assert_eq!(running.await.unwrap(), RouteOutcome::Dispatched);
        // The running handler sees the host's current registry
        assert_eq!(f.responder.take(), vec!["fast"]);

        let registry = f.framework.registry();
        assert_eq!(registry.resolve("s").unwrap().name, "fast");
        assert!(registry.get("slow").is_none());
    }
}
