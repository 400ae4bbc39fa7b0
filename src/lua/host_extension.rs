use std::sync::{Arc, Weak};

use mlua::prelude::*;
use serenity::all::{GuildId, UserId};

use crate::framework::{Framework, Section};

/// Exposes host operations to plugins as the `host` global. The framework is
/// held weakly; its registry owns this Lua state.
pub fn register(lua: &Lua, host: Weak<Framework>) -> LuaResult<()> {
    let table = lua.create_table()?;

    let h = host.clone();
    table.set(
        "prefix",
        lua.create_function(move |_lua, guild_id: Option<String>| {
            let guild_id = guild_id.as_deref().map(parse_id).transpose()?.map(GuildId::new);
            with_host(&h, |host| host.prefixes().resolve(guild_id))
        })?,
    )?;

    let h = host.clone();
    table.set(
        "set_default_prefix",
        lua.create_function(move |_lua, prefix: String| {
            with_host(&h, |host| host.set_default_prefix(&prefix))
        })?,
    )?;

    let h = host.clone();
    table.set(
        "set_guild_prefix",
        lua.create_function(
            move |_lua, (guild_id, prefix): (Option<String>, Option<String>)| {
                let guild_id = guild_id.as_deref().map(parse_id).transpose()?.map(GuildId::new);
                with_host(&h, |host| host.set_guild_prefix(guild_id, prefix.as_deref()))
            },
        )?,
    )?;

    let h = host.clone();
    table.set(
        "toggle_dms",
        lua.create_function(move |_lua, value: Option<bool>| {
            with_host(&h, |host| host.toggle_dms(value))
        })?,
    )?;

    let h = host.clone();
    table.set(
        "dms_allowed",
        lua.create_function(move |_lua, ()| with_host(&h, |host| host.dms_allowed()))?,
    )?;

    let h = host.clone();
    table.set(
        "level",
        lua.create_function(move |_lua, user_id: String| {
            let user_id = UserId::new(parse_id(&user_id)?);
            with_host(&h, |host| host.level(user_id))
        })?,
    )?;

    let h = host.clone();
    table.set(
        "reload",
        lua.create_function(move |lua, section: Option<String>| {
            let section = Section::parse(section.as_deref()).ok_or_else(|| {
                LuaError::runtime(format!("unknown reload section {section:?}"))
            })?;
            let report = with_host(&h, |host| host.reload(section))?
                .map_err(|e| LuaError::runtime(format!("{e:#}")))?;

            let result = lua.create_table()?;
            result.set("commands", report.commands)?;
            result.set("events", report.events)?;
            result.set("skipped", report.diagnostics.len())?;
            Ok(result)
        })?,
    )?;

    let h = host.clone();
    table.set(
        "categories",
        lua.create_function(move |lua, ()| {
            let registry = with_host(&h, |host| host.registry())?;
            let list = lua.create_table()?;
            for (i, (name, count)) in registry.categories().iter().enumerate() {
                let entry = lua.create_table()?;
                entry.set("name", name.as_str())?;
                entry.set("count", *count)?;
                list.set(i + 1, entry)?;
            }
            Ok(list)
        })?,
    )?;

    let h = host;
    table.set(
        "commands",
        lua.create_function(move |lua, ()| {
            let registry = with_host(&h, |host| host.registry())?;
            let mut commands: Vec<_> = registry.commands().collect();
            commands.sort_by(|a, b| a.name.cmp(&b.name));

            let list = lua.create_table()?;
            for (i, command) in commands.into_iter().enumerate() {
                let entry = lua.create_table()?;
                entry.set("name", command.name.as_str())?;
                entry.set("category", command.category.as_str())?;
                entry.set("description", command.description.as_str())?;
                entry.set("aliases", command.aliases.clone())?;
                list.set(i + 1, entry)?;
            }
            Ok(list)
        })?,
    )?;

    lua.globals().set("host", table)?;
    Ok(())
}

fn with_host<R>(host: &Weak<Framework>, f: impl FnOnce(&Arc<Framework>) -> R) -> LuaResult<R> {
    let host = host
        .upgrade()
        .ok_or_else(|| LuaError::runtime("host has shut down"))?;
    Ok(f(&host))
}

fn parse_id(id: &str) -> LuaResult<u64> {
    id.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| LuaError::runtime(format!("invalid ID {id:?}")))
}
