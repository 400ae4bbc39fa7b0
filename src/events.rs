use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::context::EventContext;

#[serenity::async_trait]
pub trait EventHandlerFn: Send + Sync {
    async fn run(&self, ctx: EventContext, payload: serde_json::Value) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct EventDefinition {
    pub name: String,
    pub once: bool,
    pub handler: Arc<dyn EventHandlerFn>,
}

struct Binding {
    definition: EventDefinition,
    fired: AtomicBool,
}

/// Event bindings from a single load. A reload replaces the whole bus, so
/// bindings from an earlier load can never fire again.
#[derive(Default)]
pub struct EventBus {
    bindings: HashMap<String, Vec<Binding>>,
    len: usize,
}

impl EventBus {
    pub fn build(definitions: impl IntoIterator<Item = EventDefinition>) -> Self {
        let mut bindings: HashMap<String, Vec<Binding>> = HashMap::new();
        let mut len = 0;
        for definition in definitions {
            len += 1;
            bindings
                .entry(definition.name.clone())
                .or_default()
                .push(Binding {
                    definition,
                    fired: AtomicBool::new(false),
                });
        }
        Self { bindings, len }
    }

    /// Runs every binding for `name` in load order. Returns how many ran.
    pub async fn emit(
        &self,
        name: &str,
        ctx: &EventContext,
        payload: &serde_json::Value,
    ) -> usize {
        let Some(bindings) = self.bindings.get(name) else {
            return 0;
        };

        let mut ran = 0;
        for binding in bindings {
            if binding.definition.once && binding.fired.swap(true, Ordering::SeqCst) {
                continue;
            }
            ran += 1;
            if let Err(err) = binding
                .definition
                .handler
                .run(ctx.clone(), payload.clone())
                .await
            {
                tracing::error!("Event handler for `{name}` failed: {err:?}");
            }
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;

    use serenity::all::ChannelId;

    use super::*;
    use crate::util::Messenger;

    #[derive(Default)]
    pub struct NullMessenger;
    #[serenity::async_trait]
    impl Messenger for NullMessenger {
        async fn say(&self, _channel_id: ChannelId, _message: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Counter {
        count: Arc<AtomicUsize>,
        fail: bool,
    }
    #[serenity::async_trait]
    impl EventHandlerFn for Counter {
        async fn run(&self, _ctx: EventContext, _payload: serde_json::Value) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn event(name: &str, once: bool, count: &Arc<AtomicUsize>, fail: bool) -> EventDefinition {
        EventDefinition {
            name: name.to_string(),
            once,
            handler: Arc::new(Counter {
                count: count.clone(),
                fail,
            }),
        }
    }

    fn ctx() -> EventContext {
        EventContext {
            event: "message".to_string(),
            messenger: Arc::new(NullMessenger),
        }
    }

    #[tokio::test]
    async fn test_once_fires_once_per_bus() {
        let count = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::build([event("ready", true, &count, false)]);

        assert_eq!(bus.emit("ready", &ctx(), &serde_json::Value::Null).await, 1);
        assert_eq!(bus.emit("ready", &ctx(), &serde_json::Value::Null).await, 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A freshly built bus (reload) gets a fresh binding
        let bus = EventBus::build([event("ready", true, &count, false)]);
        assert_eq!(bus.emit("ready", &ctx(), &serde_json::Value::Null).await, 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let failing = Arc::new(AtomicUsize::new(0));
        let ok = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::build([
            event("message", false, &failing, true),
            event("message", false, &ok, false),
        ]);

        assert_eq!(bus.emit("message", &ctx(), &serde_json::json!({})).await, 2);
        assert_eq!(bus.emit("message", &ctx(), &serde_json::json!({})).await, 2);
        assert_eq!(failing.load(Ordering::SeqCst), 2);
        assert_eq!(ok.load(Ordering::SeqCst), 2);
        assert_eq!(bus.emit("guild_create", &ctx(), &serde_json::json!({})).await, 0);
        assert_eq!(bus.len(), 2);
    }
}
