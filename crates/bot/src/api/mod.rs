//! API layer - Discord gateway and health-check entry points.

pub mod commands;
pub mod discord_handler;
pub mod dispatcher;
pub mod error_sanitizer;
pub mod format;
pub mod http;
pub mod reply;

pub use discord_handler::Handler;
pub use dispatcher::Dispatcher;
