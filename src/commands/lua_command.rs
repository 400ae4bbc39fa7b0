use mlua::prelude::*;

use crate::context::{CommandContext, Invocation, OptionValue};

/// Runs a plugin's `run` function. The function stays tied to the Lua state
/// of the load that produced it, so a reload never changes a running handler.
pub struct Handler {
    lua: Lua,
    run: LuaFunction,
}

impl Handler {
    pub fn new(lua: Lua, run: LuaFunction) -> Self {
        Self { lua, run }
    }

    fn build_context(&self, ctx: &CommandContext) -> LuaResult<LuaTable> {
        let lua = &self.lua;
        let table = lua.create_table()?;
        table.set("command", ctx.command.as_str())?;
        table.set("via", ctx.invocation.via())?;

        let args = lua.create_table()?;
        let options = lua.create_table()?;
        match &ctx.invocation {
            Invocation::Text { content, args: text_args } => {
                for (i, arg) in text_args.iter().enumerate() {
                    args.set(i + 1, arg.as_str())?;
                }
                table.set("content", content.as_str())?;
            }
            Invocation::Slash { options: values } => {
                for (name, value) in values {
                    match value {
                        OptionValue::String(s) => options.set(name.as_str(), s.as_str())?,
                        OptionValue::Integer(i) => options.set(name.as_str(), *i)?,
                        OptionValue::Number(n) => options.set(name.as_str(), *n)?,
                        OptionValue::Boolean(b) => options.set(name.as_str(), *b)?,
                    }
                }
            }
        }
        table.set("args", args)?;
        table.set("options", options)?;

        // IDs are strings; snowflakes don't survive a round trip through Luau numbers
        table.set("author_id", ctx.author_id.to_string())?;
        if let Some(guild_id) = ctx.guild_id {
            table.set("guild_id", guild_id.to_string())?;
        }
        table.set("channel_id", ctx.channel_id.to_string())?;
        table.set("level", ctx.level)?;

        let responder = ctx.responder.clone();
        table.set(
            "reply",
            lua.create_async_function(move |_lua, message: String| {
                let responder = responder.clone();
                async move {
                    responder.say(&message).await.map_err(LuaError::external)?;
                    Ok::<_, LuaError>(())
                }
            })?,
        )?;

        Ok(table)
    }
}

#[serenity::async_trait]
impl super::CommandHandler for Handler {
    async fn run(&self, ctx: CommandContext) -> anyhow::Result<()> {
        let table = self.build_context(&ctx)?;
        self.run.call_async::<()>(table).await?;
        Ok(())
    }
}
