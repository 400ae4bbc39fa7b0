use std::collections::{BTreeMap, HashMap};

use serenity::all::{CommandOptionType, CreateCommand, CreateCommandOption};

use super::{CommandDefinition, OptionKind};

const FALLBACK_DESCRIPTION: &str = "No description provided";

/// An immutable snapshot of the loaded commands. Reloading builds a new
/// snapshot and swaps it in; a snapshot is never mutated once built.
#[derive(Default, Debug)]
pub struct Registry {
    commands: HashMap<String, CommandDefinition>,
    remote_commands: HashMap<String, CommandDefinition>,
    aliases: HashMap<String, String>,
    categories: BTreeMap<String, usize>,
}

impl Registry {
    /// Builds a registry from definitions in load order. Later definitions
    /// replace earlier ones with the same name, and later alias declarations
    /// win over earlier ones.
    pub fn build(definitions: impl IntoIterator<Item = CommandDefinition>) -> Self {
        let mut commands = HashMap::new();
        let mut aliases = HashMap::new();

        for definition in definitions {
            for alias in &definition.aliases {
                aliases.insert(alias.clone(), definition.name.clone());
            }
            commands.insert(definition.name.clone(), definition);
        }

        let remote_commands = commands
            .iter()
            .filter(|(_, def)| def.mode.remote())
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect();

        let mut categories = BTreeMap::new();
        for definition in commands.values() {
            *categories.entry(definition.category.clone()).or_default() += 1;
        }

        Self {
            commands,
            remote_commands,
            aliases,
            categories,
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    /// Looks up a command by name, falling back to the alias map
    pub fn resolve(&self, token: &str) -> Option<&CommandDefinition> {
        self.commands
            .get(token)
            .or_else(|| self.commands.get(self.aliases.get(token)?))
    }

    /// Like [`Registry::resolve`], restricted to remotely invokable commands
    pub fn resolve_remote(&self, token: &str) -> Option<&CommandDefinition> {
        self.remote_commands
            .get(token)
            .or_else(|| self.remote_commands.get(self.aliases.get(token)?))
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.values()
    }

    pub fn remote_commands(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.remote_commands.values()
    }

    pub fn get_remote(&self, name: &str) -> Option<&CommandDefinition> {
        self.remote_commands.get(name)
    }

    pub fn categories(&self) -> &BTreeMap<String, usize> {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl From<OptionKind> for CommandOptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Number => CommandOptionType::Number,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
            OptionKind::Mentionable => CommandOptionType::Mentionable,
            OptionKind::Attachment => CommandOptionType::Attachment,
        }
    }
}

impl CommandDefinition {
    pub fn to_discord_command(&self) -> CreateCommand {
        let mut cmd = CreateCommand::new(&self.name).description(non_empty(&self.description));

        for opt in &self.options {
            cmd = cmd.add_option(
                CreateCommandOption::new(opt.kind.into(), &opt.name, non_empty(&opt.description))
                    .required(opt.required),
            );
        }

        cmd
    }
}

fn non_empty(description: &str) -> &str {
    if description.trim().is_empty() {
        FALLBACK_DESCRIPTION
    } else {
        description
    }
}
