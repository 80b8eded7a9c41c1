//! Use cases - command orchestration.
//!
//! Each module owns one area of the bot and talks to the outside world only
//! through the port traits in `infrastructure::ports`.

pub mod accounts;
pub mod batch;
pub mod debug;
pub mod reconcile;
pub mod server_config;
pub mod worlds;

pub use accounts::{LinkAccount, LinkOutcome, VerifyAccount, VerifyError, INVALID_KEY_MESSAGE};
pub use batch::{
    AuditServer, BatchError, PurgeAccounts, PurgeReport, RefreshReport, RefreshServer, Roster,
    ServerAudit,
};
pub use debug::{DebugReport, DebugServer};
pub use reconcile::{ReconcileError, ReconcileMember, ServerContext};
pub use server_config::{ServerConfigOps, TrackGuild, TrackGuildError};
pub use worlds::{
    WorldDirectoryError, WorldDirectoryService, WorldRoleChange, WorldRoleError, WorldRoleStatus,
    WorldRoles,
};
