use mlua::{LuaSerdeExt as _, prelude::*};
use serenity::all::ChannelId;

use crate::{context::EventContext, events::EventHandlerFn};

pub struct LuaEventHandler {
    lua: Lua,
    run: LuaFunction,
}

impl LuaEventHandler {
    pub fn new(lua: Lua, run: LuaFunction) -> Self {
        Self { lua, run }
    }
}

#[serenity::async_trait]
impl EventHandlerFn for LuaEventHandler {
    async fn run(&self, ctx: EventContext, payload: serde_json::Value) -> anyhow::Result<()> {
        let lua = &self.lua;
        let table = lua.create_table()?;
        table.set("event", ctx.event.as_str())?;

        let messenger = ctx.messenger.clone();
        table.set(
            "say",
            lua.create_async_function(move |_lua, (channel_id, message): (String, String)| {
                let messenger = messenger.clone();
                async move {
                    let channel_id = channel_id
                        .parse::<u64>()
                        .ok()
                        .filter(|id| *id != 0)
                        .map(ChannelId::new)
                        .ok_or_else(|| {
                            LuaError::runtime(format!("invalid channel ID {channel_id:?}"))
                        })?;
                    messenger
                        .say(channel_id, &message)
                        .await
                        .map_err(LuaError::external)?;
                    Ok::<_, LuaError>(())
                }
            })?,
        )?;

        let payload = lua.to_value(&payload)?;
        self.run.call_async::<()>((table, payload)).await?;
        Ok(())
    }
}
