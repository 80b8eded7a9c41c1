//! gw2link Bot library.
//!
//! Links Guild Wars 2 accounts to Discord roles.
//!
//! ## Structure
//!
//! - `infrastructure/` - Ports and their adapters (SQLite, game API, Discord)
//! - `use_cases/` - Command orchestration over the ports
//! - `api/` - Gateway handler, command dispatch and health-check routes
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
