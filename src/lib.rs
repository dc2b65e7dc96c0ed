//! Lazygram - a lazy-JSON Telegram bot framework.
//!
//! Updates are never deserialized into fixed structs: handlers query the raw
//! payload through lazy views, the dispatcher classifies each update into
//! exactly one event kind, extracts bot commands with UTF-16 offset
//! semantics, and routes to exactly one registered handler through an onion
//! of middleware.
//!
//! ## Architecture
//!
//! - `json` - lazy query views over raw update JSON
//! - `update` - the event envelope: classification, commands, reply builders
//! - `dispatch` - handler registry, precedence resolution, middleware
//! - `api` - thin pass-through client for the HTTP API
//! - `bot` - polling / webhook runtimes tying it all together
//! - `config` - environment configuration
//! - `logging` - tracing initialization
//!
//! ## Handler resolution
//!
//! Per update, first match wins: callback-data pattern, then exact command,
//! then event kind. No match is an error the embedding application sees.

pub mod api;
pub mod bot;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod json;
pub mod logging;
pub mod update;

pub use api::{Api, ChatRef};
pub use bot::Bot;
pub use bot::polling::{ApiSource, Poller, UpdateSource};
pub use config::{BotMode, Config};
pub use dispatch::{Dispatcher, Handler, Middleware};
pub use error::{ApiError, Error, Result};
pub use json::JsonView;
pub use update::{Command, EventKind, ResponseBody, Update};
