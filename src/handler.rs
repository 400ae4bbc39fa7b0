use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use serenity::{
    all::{
        Context, EventHandler, Guild, Http, Interaction, Member, Message, Reaction, Ready,
    },
    async_trait,
};

use crate::{
    constant::event,
    context::EventContext,
    framework::Framework,
    router::{self, InboundCommand, InboundMessage},
    util::{ChannelResponder, InteractionResponder},
};

/// Feeds gateway events into the framework
pub struct Handler {
    framework: Arc<Framework>,
    resync_listener_started: AtomicBool,
}

impl Handler {
    pub fn new(framework: Arc<Framework>) -> Self {
        Self {
            framework,
            resync_listener_started: AtomicBool::new(false),
        }
    }

    async fn emit(&self, ctx: &Context, name: &str, payload: &impl Serialize) {
        let payload = serde_json::to_value(payload).unwrap_or_else(|err| {
            tracing::warn!("Failed to serialize `{name}` payload: {err}");
            serde_json::Value::Null
        });
        let event_ctx = EventContext {
            event: name.to_string(),
            messenger: ctx.http.clone(),
        };
        self.framework.emit_event(name, event_ctx, payload).await;
    }

    /// Re-syncs slash commands whenever commands are reloaded. Started once;
    /// later `ready` events reuse the running listener.
    fn start_resync_listener(&self, http: Arc<Http>) {
        if self.resync_listener_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let framework = self.framework.clone();
        let requests = framework.resync_requests();
        tokio::spawn(async move {
            while requests.recv_async().await.is_ok() {
                // Collapse bursts of reloads into a single sync
                while requests.try_recv().is_ok() {}
                framework.sync_remote_commands(&*http).await;
            }
        });
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("{} is connected; syncing commands...", ready.user.name);

        // This sync covers any reload that happened before we connected
        let requests = self.framework.resync_requests();
        while requests.try_recv().is_ok() {}
        self.framework.sync_remote_commands(&*ctx.http).await;
        self.start_resync_listener(ctx.http.clone());

        tracing::info!("{} is good to go!", ready.user.name);
        self.emit(&ctx, event::READY, &ready).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        self.emit(&ctx, event::MESSAGE, &msg).await;

        let responder = Arc::new(ChannelResponder::new(ctx.http.clone(), msg.channel_id));
        self.framework
            .route_message(&InboundMessage::from(&msg), responder)
            .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        self.emit(&ctx, event::INTERACTION_CREATE, &interaction).await;

        let Some(cmd) = router::classify(&interaction) else {
            return;
        };
        let responder = Arc::new(InteractionResponder::new(ctx.http.clone(), cmd.clone()));
        self.framework
            .route_interaction(&InboundCommand::from(cmd), responder)
            .await;
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        self.emit(&ctx, event::GUILD_CREATE, &guild).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        self.emit(&ctx, event::GUILD_MEMBER_ADDITION, &new_member).await;
    }

    async fn reaction_add(&self, ctx: Context, add_reaction: Reaction) {
        self.emit(&ctx, event::REACTION_ADD, &add_reaction).await;
    }
}
