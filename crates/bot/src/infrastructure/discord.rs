//! Discord implementation of the chat platform port, over serenity's REST client.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use gw2link_domain::{
    ChannelId, Member, MemberId, MessageId, PlatformRole, RoleId, ServerId,
};
use serenity::builder::{EditMember, EditRole};
use serenity::http::{GuildPagination, Http, HttpError};
use serenity::model::id::{
    ChannelId as DiscordChannelId, GuildId as DiscordGuildId, MessageId as DiscordMessageId,
    RoleId as DiscordRoleId, UserId as DiscordUserId,
};
use serenity::model::Permissions;

use crate::infrastructure::ports::{ChatPlatformPort, Permission, PlatformError, ServerSummary};

/// Discord's page size cap for the current user's guild listing.
const GUILD_PAGE_LIMIT: u64 = 200;

/// Chat platform adapter backed by Discord's REST API.
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn guild_id(server: ServerId) -> DiscordGuildId {
    DiscordGuildId::new(server.get())
}

fn user_id(member: MemberId) -> DiscordUserId {
    DiscordUserId::new(member.get())
}

fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

fn convert_member(member: &serenity::model::guild::Member) -> Member {
    Member {
        id: MemberId::new(member.user.id.get()),
        display_name: member.display_name().to_string(),
        roles: member.roles.iter().map(|r| RoleId::new(r.get())).collect(),
        bot: member.user.bot,
    }
}

fn permission_flag(permission: Permission) -> Permissions {
    match permission {
        Permission::KickMembers => Permissions::KICK_MEMBERS,
    }
}

/// Server-wide permissions of a member, ignoring channel overwrites.
///
/// The owner holds everything. Anyone else gets the @everyone role (which
/// shares the server's id) plus every role they hold.
fn member_permissions(
    server: ServerId,
    is_owner: bool,
    role_permissions: &HashMap<DiscordRoleId, Permissions>,
    member_roles: &[DiscordRoleId],
) -> Permissions {
    if is_owner {
        return Permissions::all();
    }
    let everyone = DiscordRoleId::new(server.get());
    std::iter::once(&everyone)
        .chain(member_roles)
        .filter_map(|role| role_permissions.get(role))
        .fold(Permissions::empty(), |granted, role| granted | *role)
}

fn allows(granted: Permissions, permission: Permission) -> bool {
    granted.contains(Permissions::ADMINISTRATOR) || granted.contains(permission_flag(permission))
}

#[async_trait]
impl ChatPlatformPort for DiscordPlatform {
    async fn roles(&self, server: ServerId) -> Result<Vec<PlatformRole>, PlatformError> {
        let roles = guild_id(server)
            .roles(self.http.as_ref())
            .await
            .map_err(|e| PlatformError::request("roles", e))?;

        Ok(roles
            .into_values()
            .map(|role| PlatformRole {
                id: RoleId::new(role.id.get()),
                name: role.name,
            })
            .collect())
    }

    async fn member(
        &self,
        server: ServerId,
        member: MemberId,
    ) -> Result<Option<Member>, PlatformError> {
        match guild_id(server)
            .member(self.http.as_ref(), user_id(member))
            .await
        {
            Ok(found) => Ok(Some(convert_member(&found))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(PlatformError::request("member", e)),
        }
    }

    async fn members_page(
        &self,
        server: ServerId,
        after: Option<MemberId>,
        limit: u32,
    ) -> Result<Vec<Member>, PlatformError> {
        let members = guild_id(server)
            .members(self.http.as_ref(), Some(u64::from(limit)), after.map(user_id))
            .await
            .map_err(|e| PlatformError::request("members_page", e))?;

        Ok(members.iter().map(convert_member).collect())
    }

    async fn set_member_roles(
        &self,
        server: ServerId,
        member: MemberId,
        roles: &BTreeSet<RoleId>,
    ) -> Result<(), PlatformError> {
        let builder =
            EditMember::new().roles(roles.iter().map(|r| DiscordRoleId::new(r.get())));
        guild_id(server)
            .edit_member(self.http.as_ref(), user_id(member), builder)
            .await
            .map_err(|e| PlatformError::request("set_member_roles", e))?;
        Ok(())
    }

    async fn create_role(&self, server: ServerId, name: &str) -> Result<RoleId, PlatformError> {
        let builder = EditRole::new().name(name).hoist(false).mentionable(false);
        let role = guild_id(server)
            .create_role(self.http.as_ref(), builder)
            .await
            .map_err(|e| PlatformError::request("create_role", e))?;
        Ok(RoleId::new(role.id.get()))
    }

    async fn delete_role(&self, server: ServerId, role: RoleId) -> Result<(), PlatformError> {
        guild_id(server)
            .delete_role(self.http.as_ref(), DiscordRoleId::new(role.get()))
            .await
            .map_err(|e| PlatformError::request("delete_role", e))
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        DiscordChannelId::new(channel.get())
            .delete_message(self.http.as_ref(), DiscordMessageId::new(message.get()))
            .await
            .map_err(|e| PlatformError::request("delete_message", e))
    }

    async fn has_permission(
        &self,
        server: ServerId,
        member: MemberId,
        permission: Permission,
    ) -> Result<bool, PlatformError> {
        let guild = guild_id(server);
        let partial = guild
            .to_partial_guild(self.http.as_ref())
            .await
            .map_err(|e| PlatformError::request("has_permission", e))?;

        let role_permissions: HashMap<DiscordRoleId, Permissions> = partial
            .roles
            .iter()
            .map(|(id, role)| (*id, role.permissions))
            .collect();

        if partial.owner_id == user_id(member) {
            let granted = member_permissions(server, true, &role_permissions, &[]);
            return Ok(allows(granted, permission));
        }

        let found = match guild.member(self.http.as_ref(), user_id(member)).await {
            Ok(found) => found,
            Err(e) if is_not_found(&e) => return Ok(false),
            Err(e) => return Err(PlatformError::request("has_permission", e)),
        };

        let granted = member_permissions(server, false, &role_permissions, &found.roles);
        Ok(allows(granted, permission))
    }

    async fn servers(&self) -> Result<Vec<ServerSummary>, PlatformError> {
        let mut servers = Vec::new();
        let mut after: Option<DiscordGuildId> = None;
        loop {
            let page = self
                .http
                .get_guilds(after.map(GuildPagination::After), Some(GUILD_PAGE_LIMIT))
                .await
                .map_err(|e| PlatformError::request("servers", e))?;
            let full_page = page.len() as u64 == GUILD_PAGE_LIMIT;
            after = page.last().map(|info| info.id);
            servers.extend(page.into_iter().map(|info| ServerSummary {
                id: ServerId::new(info.id.get()),
                name: info.name,
            }));
            if !full_page {
                break;
            }
        }
        Ok(servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::http::ErrorResponse;

    const SERVER: ServerId = ServerId::new(500);
    const MODERATOR: DiscordRoleId = DiscordRoleId::new(7);
    const ADMIN: DiscordRoleId = DiscordRoleId::new(8);

    fn server_roles() -> HashMap<DiscordRoleId, Permissions> {
        HashMap::from([
            (
                DiscordRoleId::new(SERVER.get()),
                Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY,
            ),
            (MODERATOR, Permissions::KICK_MEMBERS),
            (ADMIN, Permissions::ADMINISTRATOR),
        ])
    }

    async fn http_error(status: u16) -> serenity::Error {
        let response = axum::http::Response::builder()
            .status(status)
            .body(br#"{"code": 10007, "message": "Unknown Member"}"#.to_vec())
            .unwrap();
        let response = ErrorResponse::from_response(
            reqwest::Response::from(response),
            reqwest::Method::GET,
        )
        .await;
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
    }

    #[test]
    fn owner_holds_every_permission() {
        let granted = member_permissions(SERVER, true, &HashMap::new(), &[]);
        assert!(allows(granted, Permission::KickMembers));
    }

    #[test]
    fn everyone_role_alone_does_not_grant_kick() {
        let granted = member_permissions(SERVER, false, &server_roles(), &[]);
        assert!(granted.contains(Permissions::SEND_MESSAGES));
        assert!(!allows(granted, Permission::KickMembers));
    }

    #[test]
    fn held_role_grants_its_permissions() {
        let granted = member_permissions(SERVER, false, &server_roles(), &[MODERATOR]);
        assert!(granted.contains(Permissions::SEND_MESSAGES));
        assert!(allows(granted, Permission::KickMembers));
    }

    #[test]
    fn administrator_implies_kick() {
        let granted = member_permissions(SERVER, false, &server_roles(), &[ADMIN]);
        assert!(!granted.contains(Permissions::KICK_MEMBERS));
        assert!(allows(granted, Permission::KickMembers));
    }

    #[test]
    fn roles_missing_from_the_server_grant_nothing() {
        let granted =
            member_permissions(SERVER, false, &server_roles(), &[DiscordRoleId::new(999)]);
        assert!(!allows(granted, Permission::KickMembers));
    }

    #[tokio::test]
    async fn only_404_means_not_a_member() {
        assert!(is_not_found(&http_error(404).await));
        assert!(!is_not_found(&http_error(403).await));
        assert!(!is_not_found(&http_error(500).await));
    }
}
