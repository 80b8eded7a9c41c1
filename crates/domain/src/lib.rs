//! gw2link domain.
//!
//! Pure types and rules for linking game accounts to chat roles:
//! ids, validated values, entities, role reconciliation and audit
//! classification. No I/O happens here.

pub mod audit;
pub mod entities;
pub mod error;
pub mod ids;
pub mod reconcile;
pub mod value_objects;

pub use audit::{classify, AuditReport, MemberLabel, MemberStanding, Placement};
pub use entities::{
    Account, AccountSnapshot, Guild, Member, PlatformRole, RoleDirectory, ServerConfig, World,
    WorldDirectory,
};
pub use error::DomainError;
pub use ids::{ChannelId, GuildId, MemberId, MessageId, RoleId, ServerId, WorldId};
pub use reconcile::{managed_role_ids, reconcile, Grants, RolePlan};
pub use value_objects::{normalize_world_name, ApiKey};
