//! Domain entities.

mod account;
mod member;
mod server_config;
mod world;

pub use account::{Account, AccountSnapshot};
pub use member::{Member, PlatformRole, RoleDirectory};
pub use server_config::{Guild, ServerConfig};
pub use world::{World, WorldDirectory};
