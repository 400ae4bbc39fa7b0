pub fn register(lua: &mlua::Lua) -> mlua::Result<()> {
    lua.globals().set(
        "sleep",
        lua.create_async_function(|_lua, ms: u32| async move {
            tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
            Ok(())
        })?,
    )?;

    lua.globals().set(
        "yield",
        lua.globals()
            .get("coroutine")
            .and_then(|c: mlua::Table| c.get::<mlua::Function>("yield"))?,
    )?;

    // Plugin output goes to the log rather than stdout
    lua.globals().set(
        "print",
        lua.create_function(move |_lua, values: mlua::Variadic<String>| {
            let output = values.into_iter().collect::<Vec<_>>().join("\t");
            tracing::info!(target: "plugcord::plugin", "{output}");
            Ok(())
        })?,
    )?;

    Ok(())
}
