//! Applying role plans to chat members.

use std::sync::Arc;

use gw2link_domain::{
    reconcile, AccountSnapshot, Member, MemberId, RoleDirectory, RolePlan, ServerConfig, ServerId,
    WorldDirectory,
};

use crate::infrastructure::ports::{ChatPlatformPort, PlatformError, RepoError};
use crate::use_cases::server_config::ServerConfigOps;
use crate::use_cases::worlds::{WorldDirectoryError, WorldDirectoryService};

/// Everything reconciliation needs to know about one server.
///
/// Loaded once per single-member reconcile, or once per batch command.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub server: ServerId,
    pub config: ServerConfig,
    pub roles: RoleDirectory,
    pub worlds: Arc<WorldDirectory>,
}

pub struct ReconcileMember {
    platform: Arc<dyn ChatPlatformPort>,
    configs: Arc<ServerConfigOps>,
    worlds: Arc<WorldDirectoryService>,
}

impl ReconcileMember {
    pub fn new(
        platform: Arc<dyn ChatPlatformPort>,
        configs: Arc<ServerConfigOps>,
        worlds: Arc<WorldDirectoryService>,
    ) -> Self {
        Self {
            platform,
            configs,
            worlds,
        }
    }

    pub async fn context(&self, server: ServerId) -> Result<ServerContext, ReconcileError> {
        let config = self.configs.get(server).await?;
        let worlds = self.worlds.load().await?;
        let roles = RoleDirectory::from_roles(self.platform.roles(server).await?);
        Ok(ServerContext {
            server,
            config,
            roles,
            worlds,
        })
    }

    /// Reconcile one member of one server.
    ///
    /// Returns `None` without touching anything when the user is not a member
    /// of the server.
    pub async fn execute(
        &self,
        server: ServerId,
        member: MemberId,
        snapshot: &AccountSnapshot,
    ) -> Result<Option<RolePlan>, ReconcileError> {
        let Some(member) = self.platform.member(server, member).await? else {
            return Ok(None);
        };
        let context = self.context(server).await?;
        self.apply(&context, &member, snapshot).await.map(Some)
    }

    /// Compute and apply the plan for a member already fetched.
    pub async fn apply(
        &self,
        context: &ServerContext,
        member: &Member,
        snapshot: &AccountSnapshot,
    ) -> Result<RolePlan, ReconcileError> {
        let plan = reconcile(
            &member.roles,
            &context.config,
            &context.roles,
            snapshot,
            &context.worlds,
        );

        if plan.is_noop() {
            tracing::debug!(server_id = %context.server, member_id = %member.id, "Roles already up to date");
            return Ok(plan);
        }

        self.platform
            .set_member_roles(context.server, member.id, &plan.target)
            .await?;
        tracing::info!(
            server_id = %context.server,
            member_id = %member.id,
            added = plan.added().len(),
            removed = plan.removed().len(),
            "Reconciled member roles"
        );
        Ok(plan)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Worlds(#[from] WorldDirectoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{
        MockChatPlatformPort, MockGameApiPort, MockServerConfigRepo, MockWorldCacheRepo,
    };
    use gw2link_domain::{Guild, GuildId, PlatformRole, RoleId, World, WorldId};
    use std::collections::BTreeSet;

    const UNMANAGED: RoleId = RoleId::new(1);
    const DEVONA: RoleId = RoleId::new(101);
    const FERGUSON: RoleId = RoleId::new(102);
    const GUILD_ROLE: RoleId = RoleId::new(200);

    fn reconciler(platform: MockChatPlatformPort) -> ReconcileMember {
        let mut cache = MockWorldCacheRepo::new();
        cache.expect_load().returning(|| {
            Ok(Some(WorldDirectory::from_worlds([
                World::from_api(WorldId::new(1001), "Devona's Rest"),
                World::from_api(WorldId::new(1002), "Ferguson's Crossing"),
            ])))
        });
        let mut configs = MockServerConfigRepo::new();
        configs.expect_get().returning(|_| {
            Ok(Some(ServerConfig::unconfigured("server").with_guild(Some(Guild {
                id: GuildId::new("ABC").unwrap(),
                tag: "G1".into(),
                name: "G1".into(),
            }))))
        });

        ReconcileMember::new(
            Arc::new(platform),
            Arc::new(ServerConfigOps::new(Arc::new(configs))),
            Arc::new(WorldDirectoryService::new(
                Arc::new(cache),
                Arc::new(MockGameApiPort::new()),
            )),
        )
    }

    fn roles() -> Vec<PlatformRole> {
        [
            (UNMANAGED, "unmanaged1"),
            (DEVONA, "Devona's Rest"),
            (FERGUSON, "Ferguson's Crossing"),
            (GUILD_ROLE, "G1"),
        ]
        .into_iter()
        .map(|(id, name)| PlatformRole {
            id,
            name: name.into(),
        })
        .collect()
    }

    fn member(roles: &[RoleId]) -> Member {
        Member {
            id: MemberId::new(5),
            display_name: "member".into(),
            roles: roles.iter().copied().collect(),
            bot: false,
        }
    }

    fn snapshot() -> AccountSnapshot {
        AccountSnapshot {
            name: "Player.1234".into(),
            world: WorldId::new(1001),
            guilds: [GuildId::new("ABC").unwrap()].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn replaces_role_set_with_target() {
        let mut platform = MockChatPlatformPort::new();
        platform
            .expect_member()
            .returning(|_, _| Ok(Some(member(&[UNMANAGED, FERGUSON]))));
        platform.expect_roles().times(1).returning(|_| Ok(roles()));
        platform
            .expect_set_member_roles()
            .withf(|_, member, roles| {
                *member == MemberId::new(5)
                    && *roles == [UNMANAGED, DEVONA, GUILD_ROLE].into_iter().collect::<BTreeSet<_>>()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let plan = reconciler(platform)
            .execute(ServerId::new(1), MemberId::new(5), &snapshot())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.removed(), BTreeSet::from([FERGUSON]));
    }

    #[tokio::test]
    async fn up_to_date_member_is_not_touched() {
        let mut platform = MockChatPlatformPort::new();
        platform
            .expect_member()
            .returning(|_, _| Ok(Some(member(&[UNMANAGED, DEVONA, GUILD_ROLE]))));
        platform.expect_roles().returning(|_| Ok(roles()));
        platform.expect_set_member_roles().never();

        let plan = reconciler(platform)
            .execute(ServerId::new(1), MemberId::new(5), &snapshot())
            .await
            .unwrap()
            .unwrap();
        assert!(plan.is_noop());
    }

    #[tokio::test]
    async fn non_member_is_skipped() {
        let mut platform = MockChatPlatformPort::new();
        platform.expect_member().returning(|_, _| Ok(None));
        platform.expect_roles().never();
        platform.expect_set_member_roles().never();

        let result = reconciler(platform)
            .execute(ServerId::new(1), MemberId::new(5), &snapshot())
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn platform_failure_propagates() {
        let mut platform = MockChatPlatformPort::new();
        platform
            .expect_member()
            .returning(|_, _| Ok(Some(member(&[FERGUSON]))));
        platform.expect_roles().returning(|_| Ok(roles()));
        platform
            .expect_set_member_roles()
            .returning(|_, _, _| Err(PlatformError::request("set_member_roles", "Missing Permissions")));

        let result = reconciler(platform)
            .execute(ServerId::new(1), MemberId::new(5), &snapshot())
            .await;
        assert!(matches!(result, Err(ReconcileError::Platform(_))));
    }
}
