use std::{sync::Arc, time::Duration};

use mlua::prelude::*;

use crate::{
    commands::{CommandDefinition, InvocationMode, OptionKind, OptionSpec, lua_command},
    constant::{self, field},
    events::EventDefinition,
    lua::event_handler::LuaEventHandler,
    plugin::{PluginError, PluginFile},
};

/// Validates a command plugin's table into a [`CommandDefinition`]
pub fn command_from_table(
    lua: &Lua,
    table: &LuaTable,
    file: &PluginFile,
) -> Result<CommandDefinition, PluginError> {
    let name = required_name(table)?;
    let run = required_run(table)?;

    let aliases = get::<Vec<String>>(table, field::ALIASES)?.unwrap_or_default();
    let category = get::<String>(table, field::CATEGORY)?
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| file.category().to_string());

    let cooldown = match get::<f64>(table, field::COOLDOWN)? {
        None => Duration::ZERO,
        Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| PluginError::InvalidField {
            field: field::COOLDOWN,
            reason: format!("{secs} is not a representable non-negative number of seconds"),
        })?,
    };

    let mode = match table.get::<LuaValue>(field::SLASH)? {
        LuaValue::Nil | LuaValue::Boolean(false) => InvocationMode::TextOnly,
        LuaValue::Boolean(true) => InvocationMode::RemoteOnly,
        LuaValue::String(s) => match &*s.to_str()? {
            "true" => InvocationMode::RemoteOnly,
            "both" => InvocationMode::Both,
            "false" | "" => InvocationMode::TextOnly,
            other => {
                return Err(PluginError::InvalidField {
                    field: field::SLASH,
                    reason: format!("expected \"true\" or \"both\", got {other:?}"),
                });
            }
        },
        other => {
            return Err(PluginError::InvalidField {
                field: field::SLASH,
                reason: format!("unexpected {}", other.type_name()),
            });
        }
    };

    let options = get::<LuaTable>(table, field::OPTIONS)?
        .map(|opts| parse_options(&opts))
        .transpose()?
        .unwrap_or_default();

    Ok(CommandDefinition {
        name,
        aliases,
        category,
        cooldown,
        mode,
        global: get::<bool>(table, field::GLOBAL)?.unwrap_or(false),
        description: get::<String>(table, field::DESCRIPTION)?.unwrap_or_default(),
        options,
        handler: Arc::new(lua_command::Handler::new(lua.clone(), run)),
    })
}

/// Validates an event plugin's table into an [`EventDefinition`]
pub fn event_from_table(lua: &Lua, table: &LuaTable) -> Result<EventDefinition, PluginError> {
    let name = required_name(table)?;
    if !constant::event::ALL.contains(&name.as_str()) {
        return Err(PluginError::InvalidField {
            field: field::NAME,
            reason: format!("unknown event `{name}`"),
        });
    }
    let run = required_run(table)?;

    Ok(EventDefinition {
        name,
        once: get::<bool>(table, field::ONCE)?.unwrap_or(false),
        handler: Arc::new(LuaEventHandler::new(lua.clone(), run)),
    })
}

fn required_name(table: &LuaTable) -> Result<String, PluginError> {
    get::<String>(table, field::NAME)?
        .filter(|n| !n.is_empty())
        .ok_or(PluginError::MissingName)
}

fn required_run(table: &LuaTable) -> Result<LuaFunction, PluginError> {
    match table.get::<LuaValue>(field::RUN)? {
        LuaValue::Function(f) => Ok(f),
        _ => Err(PluginError::MissingRun),
    }
}

fn parse_options(opts: &LuaTable) -> Result<Vec<OptionSpec>, PluginError> {
    let mut options = vec![];
    for opt in opts.sequence_values::<LuaTable>() {
        let opt = opt.map_err(|e| invalid(field::OPTIONS, e))?;
        let name = get::<String>(&opt, field::NAME)?.ok_or_else(|| PluginError::InvalidField {
            field: field::OPTIONS,
            reason: "option without a name".to_string(),
        })?;
        let type_ = get::<String>(&opt, field::TYPE)?.unwrap_or_default();
        let kind = OptionKind::parse(&type_).ok_or_else(|| PluginError::UnknownOptionType {
            option: name.clone(),
            kind: type_.clone(),
        })?;

        options.push(OptionSpec {
            description: get::<String>(&opt, field::DESCRIPTION)?.unwrap_or_default(),
            required: get::<bool>(&opt, field::REQUIRED)?.unwrap_or(false),
            name,
            kind,
        });
    }
    Ok(options)
}

fn get<T: FromLua>(table: &LuaTable, field: &'static str) -> Result<Option<T>, PluginError> {
    table
        .get::<Option<T>>(field)
        .map_err(|e| invalid(field, e))
}

fn invalid(field: &'static str, err: LuaError) -> PluginError {
    PluginError::InvalidField {
        field,
        reason: err.to_string(),
    }
}
