//! Infrastructure layer - external dependencies.
//!
//! Ports (traits) define what the bot needs; the rest of this module holds
//! the adapters that implement them.

pub mod clock;
pub mod config;
pub mod discord;
pub mod gw2;
pub mod ports;
pub mod store;
