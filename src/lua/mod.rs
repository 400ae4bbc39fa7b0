use std::sync::Weak;

use crate::{
    commands::CommandDefinition,
    events::EventDefinition,
    framework::Framework,
    plugin::{PluginError, PluginFile},
};

mod definition;
mod event_handler;
mod globals;
mod host_extension;

/// Creates the Lua state that one load's plugins are evaluated in
pub fn create_plugin_lua_state(host: Weak<Framework>) -> mlua::Result<mlua::Lua> {
    let lua = mlua::Lua::new_with(
        {
            use mlua::StdLib as SL;
            SL::COROUTINE | SL::MATH | SL::STRING | SL::TABLE | SL::UTF8 | SL::VECTOR
        },
        mlua::LuaOptions::new().catch_rust_panics(true),
    )?;

    globals::register(&lua)?;
    host_extension::register(&lua, host)?;

    Ok(lua)
}

pub fn load_command(lua: &mlua::Lua, file: &PluginFile) -> Result<CommandDefinition, PluginError> {
    let table = load_plugin_table(lua, file)?;
    definition::command_from_table(lua, &table, file)
}

pub fn load_event(lua: &mlua::Lua, file: &PluginFile) -> Result<EventDefinition, PluginError> {
    let table = load_plugin_table(lua, file)?;
    definition::event_from_table(lua, &table)
}

fn load_plugin_table(lua: &mlua::Lua, file: &PluginFile) -> Result<mlua::Table, PluginError> {
    let code = std::fs::read_to_string(&file.path)?;
    match lua
        .load(&code)
        .set_name(file.path.to_string_lossy())
        .eval::<mlua::Value>()?
    {
        mlua::Value::Table(table) => Ok(table),
        _ => Err(PluginError::NotATable),
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use super::*;
    use crate::commands::{InvocationMode, OptionKind};

    fn plugin(dir: &Path, name: &str, code: &str) -> PluginFile {
        let path = dir.join(name);
        std::fs::write(&path, code).unwrap();
        PluginFile {
            path,
            directory_category: Some("fun".to_string()),
        }
    }

    fn lua() -> mlua::Lua {
        create_plugin_lua_state(Weak::new()).unwrap()
    }

    #[test]
    fn test_full_command_definition() {
        let dir = tempfile::tempdir().unwrap();
        let file = plugin(
            dir.path(),
            "echo.lua",
            r#"
return {
    name = "echo",
    aliases = { "say", "repeat" },
    cooldown = 5,
    slash = "both",
    global = true,
    description = "Echoes text",
    options = {
        { name = "text", type = "string", description = "What to say", required = true },
        { name = "times", type = "integer" },
    },
    run = function(ctx) end,
}
"#,
        );

        let def = load_command(&lua(), &file).unwrap();
        assert_eq!(def.name, "echo");
        assert_eq!(def.aliases, vec!["say", "repeat"]);
        assert_eq!(def.category, "fun");
        assert_eq!(def.cooldown, Duration::from_secs(5));
        assert_eq!(def.mode, InvocationMode::Both);
        assert!(def.global);
        assert_eq!(def.options.len(), 2);
        assert_eq!(def.options[0].kind, OptionKind::String);
        assert!(def.options[0].required);
        assert_eq!(def.options[1].kind, OptionKind::Integer);
        assert!(!def.options[1].required);
    }

    #[test]
    fn test_minimal_command_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = plugin(
            dir.path(),
            "ping.lua",
            r#"return { name = "ping", category = "util", run = function(ctx) end }"#,
        );

        let def = load_command(&lua(), &file).unwrap();
        assert_eq!(def.category, "util");
        assert_eq!(def.cooldown, Duration::ZERO);
        assert_eq!(def.mode, InvocationMode::TextOnly);
        assert!(!def.global);
        assert!(def.aliases.is_empty());
    }

    #[test]
    fn test_slash_values() {
        let dir = tempfile::tempdir().unwrap();
        let lua = lua();
        for (value, mode) in [
            ("true", InvocationMode::RemoteOnly),
            ("\"true\"", InvocationMode::RemoteOnly),
            ("\"both\"", InvocationMode::Both),
            ("false", InvocationMode::TextOnly),
        ] {
            let file = plugin(
                dir.path(),
                "cmd.lua",
                &format!("return {{ name = 'cmd', slash = {value}, run = function() end }}"),
            );
            assert_eq!(load_command(&lua, &file).unwrap().mode, mode, "slash = {value}");
        }
    }

    #[test]
    fn test_rejected_commands() {
        let dir = tempfile::tempdir().unwrap();
        let lua = lua();
        let cases = [
            ("return { run = function() end }", "MissingName"),
            ("return { name = 'x' }", "MissingRun"),
            ("return { name = 'x', run = 5 }", "MissingRun"),
            ("return 42", "NotATable"),
            ("this is not lua", "Load"),
            ("error('boom')", "Load"),
            ("return { name = 'x', run = function() end, cooldown = -1 }", "InvalidField"),
            ("return { name = 'x', run = function() end, cooldown = 1e20 }", "InvalidField"),
            ("return { name = 'x', run = function() end, cooldown = 0/0 }", "InvalidField"),
            ("return { name = 'x', run = function() end, slash = 'sometimes' }", "InvalidField"),
            (
                "return { name = 'x', run = function() end, \
                 options = { { name = 'a', type = 'colour' } } }",
                "UnknownOptionType",
            ),
        ];
        for (code, expected) in cases {
            let file = plugin(dir.path(), "bad.lua", code);
            let err = load_command(&lua, &file).unwrap_err();
            assert!(
                format!("{err:?}").starts_with(expected),
                "{code}: expected {expected}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_event_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let lua = lua();

        let file = plugin(
            dir.path(),
            "ready.lua",
            "return { name = 'ready', once = true, run = function(ctx, payload) end }",
        );
        let def = load_event(&lua, &file).unwrap();
        assert_eq!(def.name, "ready");
        assert!(def.once);

        let file = plugin(
            dir.path(),
            "bogus.lua",
            "return { name = 'not_an_event', run = function() end }",
        );
        assert!(matches!(
            load_event(&lua, &file),
            Err(PluginError::InvalidField { .. })
        ));
    }
}
