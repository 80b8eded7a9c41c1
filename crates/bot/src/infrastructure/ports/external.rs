//! External service port traits (game API, chat platform).

use std::collections::BTreeSet;

use async_trait::async_trait;
use gw2link_domain::{
    AccountSnapshot, ApiKey, ChannelId, Guild, GuildId, Member, MemberId, MessageId,
    PlatformRole, RoleId, ServerId, World,
};

use super::error::{GameApiError, PlatformError};

// =============================================================================
// Game API
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameApiPort: Send + Sync {
    /// Every world, in one call.
    async fn worlds(&self) -> Result<Vec<World>, GameApiError>;
    /// Live account data for a key.
    async fn account(&self, key: &ApiKey) -> Result<AccountSnapshot, GameApiError>;
    /// Guild ids whose name matches exactly.
    async fn search_guild(&self, name: &str) -> Result<Vec<GuildId>, GameApiError>;
    async fn guild(&self, id: &GuildId) -> Result<Guild, GameApiError>;
}

// =============================================================================
// Chat platform
// =============================================================================

/// Permissions commands can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    KickMembers,
}

impl Permission {
    pub fn name(self) -> &'static str {
        match self {
            Self::KickMembers => "KICK_MEMBERS",
        }
    }
}

/// A chat server the bot is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub id: ServerId,
    pub name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatPlatformPort: Send + Sync {
    async fn roles(&self, server: ServerId) -> Result<Vec<PlatformRole>, PlatformError>;
    /// `None` when the user is not a member of the server.
    async fn member(
        &self,
        server: ServerId,
        member: MemberId,
    ) -> Result<Option<Member>, PlatformError>;
    /// One page of members with ids greater than `after`, ascending.
    async fn members_page(
        &self,
        server: ServerId,
        after: Option<MemberId>,
        limit: u32,
    ) -> Result<Vec<Member>, PlatformError>;
    /// Replace the member's role set wholesale.
    async fn set_member_roles(
        &self,
        server: ServerId,
        member: MemberId,
        roles: &BTreeSet<RoleId>,
    ) -> Result<(), PlatformError>;
    async fn create_role(&self, server: ServerId, name: &str) -> Result<RoleId, PlatformError>;
    async fn delete_role(&self, server: ServerId, role: RoleId) -> Result<(), PlatformError>;
    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError>;
    async fn has_permission(
        &self,
        server: ServerId,
        member: MemberId,
        permission: Permission,
    ) -> Result<bool, PlatformError>;
    async fn servers(&self) -> Result<Vec<ServerSummary>, PlatformError>;
}
