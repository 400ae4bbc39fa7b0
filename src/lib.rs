//! Command and event dispatch for Discord bots whose commands and event
//! handlers are Luau plugins.
//!
//! [`framework::Framework`] is the host instance: it loads plugins, routes
//! messages and slash commands to them, and keeps the platform's slash
//! commands in sync with what is loaded. [`handler::Handler`] connects it to a
//! serenity client.

pub mod commands;
pub mod config;
pub mod constant;
pub mod context;
pub mod cooldown;
pub mod events;
pub mod framework;
pub mod handler;
pub mod lua;
pub mod permissions;
pub mod plugin;
pub mod prefix;
pub mod router;
pub mod sync;
pub mod util;
