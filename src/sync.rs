use std::fmt;

use serenity::all::{Command, CommandId, GuildId, Http};

use crate::commands::{CommandDefinition, Registry};

/// Where a slash command is registered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandScope {
    Global,
    Guild(GuildId),
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandScope::Global => write!(f, "global"),
            CommandScope::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// A command as registered with the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub name: String,
}

#[serenity::async_trait]
pub trait RemoteCommandApi: Send + Sync {
    async fn fetch(&self, scope: CommandScope) -> anyhow::Result<Vec<RemoteCommand>>;
    /// Creating a command whose name already exists in the scope overwrites it
    async fn create(&self, scope: CommandScope, command: &CommandDefinition) -> anyhow::Result<()>;
    async fn delete(&self, scope: CommandScope, id: CommandId) -> anyhow::Result<()>;
}

#[serenity::async_trait]
impl RemoteCommandApi for Http {
    async fn fetch(&self, scope: CommandScope) -> anyhow::Result<Vec<RemoteCommand>> {
        let commands = match scope {
            CommandScope::Global => Command::get_global_commands(self).await?,
            CommandScope::Guild(guild_id) => guild_id.get_commands(self).await?,
        };
        Ok(commands
            .into_iter()
            .map(|c| RemoteCommand {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    async fn create(&self, scope: CommandScope, command: &CommandDefinition) -> anyhow::Result<()> {
        let command = command.to_discord_command();
        match scope {
            CommandScope::Global => {
                Command::create_global_command(self, command).await?;
            }
            CommandScope::Guild(guild_id) => {
                guild_id.create_command(self, command).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, scope: CommandScope, id: CommandId) -> anyhow::Result<()> {
        match scope {
            CommandScope::Global => Command::delete_global_command(self, id).await?,
            CommandScope::Guild(guild_id) => guild_id.delete_command(self, id).await?,
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Scopes a remote command should be registered in
pub fn target_scopes(command: &CommandDefinition, test_guilds: &[GuildId]) -> Vec<CommandScope> {
    if command.global {
        vec![CommandScope::Global]
    } else {
        test_guilds.iter().copied().map(CommandScope::Guild).collect()
    }
}

/// Brings every scope's registered commands in line with the registry's
/// remote commands: stale entries are deleted and every targeted command is
/// (re)created. Individual failures are logged and skipped, so running this
/// again converges on the same state.
pub async fn synchronize(
    api: &dyn RemoteCommandApi,
    registry: &Registry,
    test_guilds: &[GuildId],
) -> SyncReport {
    let mut report = SyncReport::default();

    let mut local: Vec<&CommandDefinition> = registry.remote_commands().collect();
    local.sort_by(|a, b| a.name.cmp(&b.name));

    let mut scopes = vec![CommandScope::Global];
    for guild_id in test_guilds {
        let scope = CommandScope::Guild(*guild_id);
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }

    for scope in scopes {
        let targeted: Vec<&CommandDefinition> = local
            .iter()
            .copied()
            .filter(|c| target_scopes(c, test_guilds).contains(&scope))
            .collect();

        let snapshot = match api.fetch(scope).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!("Failed to fetch {scope} commands: {err:?}");
                report.failed += 1;
                continue;
            }
        };

        for remote in &snapshot {
            let reason = match registry.get_remote(&remote.name) {
                None => "no longer declared",
                Some(local) if !target_scopes(local, test_guilds).contains(&scope) => {
                    "no longer targets this scope"
                }
                Some(_) => continue,
            };

            match api.delete(scope, remote.id).await {
                Ok(()) => {
                    tracing::info!("Deleted {scope} command `{}` ({reason})", remote.name);
                    report.deleted += 1;
                }
                Err(err) => {
                    tracing::error!("Failed to delete {scope} command `{}`: {err:?}", remote.name);
                    report.failed += 1;
                }
            }
        }

        for command in targeted {
            match api.create(scope, command).await {
                Ok(()) => report.created += 1,
                Err(err) => {
                    tracing::error!("Failed to create {scope} command `{}`: {err:?}", command.name);
                    report.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        "Synced slash commands: {} created, {} deleted, {} failed",
        report.created,
        report.deleted,
        report.failed
    );
    report
}
