use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context as _;
use parking_lot::RwLock;
use serenity::all::{GuildId, UserId};

use crate::{
    commands::Registry,
    config::{self, Configuration},
    context::EventContext,
    cooldown::CooldownTracker,
    events::EventBus,
    lua,
    permissions::PermissionLevels,
    plugin::{self, LoadDiagnostic},
    prefix::PrefixResolver,
    sync::{self, RemoteCommandApi, SyncReport},
};

/// Which plugin sets a reload rebuilds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Commands,
    Events,
    All,
}

impl Section {
    /// `None` means both; matching is case-insensitive
    pub fn parse(section: Option<&str>) -> Option<Self> {
        match section.map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("all") => Some(Section::All),
            Some("commands") => Some(Section::Commands),
            Some("events") => Some(Section::Events),
            Some(_) => None,
        }
    }

    fn commands(self) -> bool {
        matches!(self, Section::Commands | Section::All)
    }

    fn events(self) -> bool {
        matches!(self, Section::Events | Section::All)
    }
}

#[derive(Debug, Default)]
pub struct LoadReport {
    /// Commands in the registry after the load, or 0 if commands weren't reloaded
    pub commands: usize,
    /// Event bindings after the load, or 0 if events weren't reloaded
    pub events: usize,
    pub diagnostics: Vec<LoadDiagnostic>,
}

/// The host instance. Owns every piece of dispatch state; the gateway
/// handler and plugins reach it by reference.
pub struct Framework {
    pub(crate) prefixes: PrefixResolver,
    allow_dms: AtomicBool,
    pub(crate) cooldowns: CooldownTracker,
    pub(crate) cooldown_modes: config::Cooldown,
    permissions: PermissionLevels,
    test_guilds: Vec<GuildId>,

    commands_dir: RwLock<PathBuf>,
    events_dir: RwLock<PathBuf>,
    registry: RwLock<Arc<Registry>>,
    events: RwLock<Arc<EventBus>>,

    resync_tx: flume::Sender<()>,
    resync_rx: flume::Receiver<()>,
}

impl Framework {
    pub fn new(config: &Configuration) -> Arc<Self> {
        let (resync_tx, resync_rx) = flume::unbounded();
        Arc::new(Self {
            prefixes: PrefixResolver::new(config.discord.default_prefix.clone()),
            allow_dms: AtomicBool::new(config.discord.allow_dms),
            cooldowns: CooldownTracker::new(config.cooldown.bypass_level),
            cooldown_modes: config.cooldown.clone(),
            permissions: PermissionLevels::from_config(&config.permissions),
            test_guilds: config
                .discord
                .test_guilds
                .iter()
                .filter(|id| **id != 0)
                .map(|id| GuildId::new(*id))
                .collect(),
            commands_dir: RwLock::new(PathBuf::from(&config.discord.commands_dir)),
            events_dir: RwLock::new(PathBuf::from(&config.discord.events_dir)),
            registry: RwLock::default(),
            events: RwLock::default(),
            resync_tx,
            resync_rx,
        })
    }

    /// Loads commands and events from the configured directories
    pub fn load(self: &Arc<Self>) -> anyhow::Result<LoadReport> {
        self.reload(Section::All)
    }

    pub fn load_from(
        self: &Arc<Self>,
        commands_dir: impl AsRef<Path>,
        events_dir: impl AsRef<Path>,
    ) -> anyhow::Result<LoadReport> {
        *self.commands_dir.write() = commands_dir.as_ref().to_path_buf();
        *self.events_dir.write() = events_dir.as_ref().to_path_buf();
        self.load()
    }

    /// Rebuilds the requested sections in a fresh Lua state and publishes them.
    /// Until the new snapshot is published, the previous one stays in use.
    pub fn reload(self: &Arc<Self>, section: Section) -> anyhow::Result<LoadReport> {
        tracing::info!("Loading {section:?}...");
        let lua = lua::create_plugin_lua_state(Arc::downgrade(self))
            .context("failed to create plugin Lua state")?;
        let mut report = LoadReport::default();

        if section.commands() {
            let dir = self.commands_dir.read().clone();
            let mut definitions = vec![];
            for file in plugin::discover(&dir) {
                match lua::load_command(&lua, &file) {
                    Ok(definition) => definitions.push(definition),
                    Err(error) => report.diagnostics.push(LoadDiagnostic {
                        path: file.path,
                        error,
                    }),
                }
            }

            let registry = Arc::new(Registry::build(definitions));
            report.commands = registry.len();
            *self.registry.write() = registry;
            log_amount("command", report.commands);

            // A closed receiver only means nobody is syncing
            let _ = self.resync_tx.send(());
        }

        if section.events() {
            let dir = self.events_dir.read().clone();
            let mut definitions = vec![];
            for file in plugin::discover(&dir) {
                match lua::load_event(&lua, &file) {
                    Ok(definition) => definitions.push(definition),
                    Err(error) => report.diagnostics.push(LoadDiagnostic {
                        path: file.path,
                        error,
                    }),
                }
            }

            let events = Arc::new(EventBus::build(definitions));
            report.events = events.len();
            *self.events.write() = events;
            log_amount("event", report.events);
        }

        for diagnostic in &report.diagnostics {
            tracing::warn!(
                "Skipped plugin {}: {}",
                diagnostic.path.display(),
                diagnostic.error
            );
        }

        Ok(report)
    }

    /// The current command snapshot. Holding it across a reload keeps the old
    /// snapshot alive and consistent.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.read().clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.events.read().clone()
    }

    /// Fires every binding for `name` on the current event bus
    pub async fn emit_event(&self, name: &str, ctx: EventContext, payload: serde_json::Value) {
        let bus = self.event_bus();
        bus.emit(name, &ctx, &payload).await;
    }

    /// Converges the platform's slash commands with the current registry
    pub async fn sync_remote_commands(&self, api: &dyn RemoteCommandApi) -> SyncReport {
        let registry = self.registry();
        sync::synchronize(api, &registry, &self.test_guilds).await
    }

    /// Fires once per command reload. Clones share one queue.
    pub fn resync_requests(&self) -> flume::Receiver<()> {
        self.resync_rx.clone()
    }

    pub fn prefixes(&self) -> &PrefixResolver {
        &self.prefixes
    }

    pub fn set_default_prefix(&self, prefix: &str) {
        self.prefixes.set_default(prefix);
    }

    /// `None` resets the guild to the current default
    pub fn set_guild_prefix(&self, guild_id: Option<GuildId>, prefix: Option<&str>) {
        self.prefixes.set_guild_prefix(guild_id, prefix);
    }

    /// Sets whether DMs are accepted, or flips it when `value` is None.
    /// Returns the new setting.
    pub fn toggle_dms(&self, value: Option<bool>) -> bool {
        match value {
            Some(value) => {
                self.allow_dms.store(value, Ordering::SeqCst);
                value
            }
            None => !self.allow_dms.fetch_xor(true, Ordering::SeqCst),
        }
    }

    pub fn dms_allowed(&self) -> bool {
        self.allow_dms.load(Ordering::SeqCst)
    }

    pub fn level(&self, user: UserId) -> u8 {
        self.permissions.level(user)
    }

    /// Ignored unless `dir` is an existing directory
    pub fn set_commands_dir(&self, dir: impl AsRef<Path>) -> bool {
        set_dir(&self.commands_dir, dir.as_ref())
    }

    /// Ignored unless `dir` is an existing directory
    pub fn set_events_dir(&self, dir: impl AsRef<Path>) -> bool {
        set_dir(&self.events_dir, dir.as_ref())
    }
}

fn set_dir(slot: &RwLock<PathBuf>, dir: &Path) -> bool {
    if dir.is_dir() {
        *slot.write() = dir.to_path_buf();
        true
    } else {
        false
    }
}

fn log_amount(kind: &str, amount: usize) {
    let plural = if amount == 1 { "" } else { "s" };
    if amount == 0 {
        tracing::warn!("Loaded {amount} {kind}{plural}");
    } else {
        tracing::info!("Loaded {amount} {kind}{plural}");
    }
}
