//! Diagnostic snapshot for the `debug` command.

use std::sync::Arc;

use gw2link_domain::{MemberId, RoleDirectory, ServerConfig, ServerId};

use crate::infrastructure::ports::{AccountRepo, ChatPlatformPort};
use crate::use_cases::batch::BatchError;
use crate::use_cases::server_config::ServerConfigOps;
use crate::use_cases::worlds::WorldDirectoryService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugReport {
    pub world_count: usize,
    pub config: ServerConfig,
    pub role_count: usize,
    /// Managed role names that exist on the server.
    pub provisioned: Vec<String>,
    /// Managed role names with no role on the server.
    pub missing: Vec<String>,
    /// Account name stored for the caller, if any.
    pub caller_account: Option<String>,
}

pub struct DebugServer {
    platform: Arc<dyn ChatPlatformPort>,
    accounts: Arc<dyn AccountRepo>,
    configs: Arc<ServerConfigOps>,
    worlds: Arc<WorldDirectoryService>,
}

impl DebugServer {
    pub fn new(
        platform: Arc<dyn ChatPlatformPort>,
        accounts: Arc<dyn AccountRepo>,
        configs: Arc<ServerConfigOps>,
        worlds: Arc<WorldDirectoryService>,
    ) -> Self {
        Self {
            platform,
            accounts,
            configs,
            worlds,
        }
    }

    pub async fn execute(
        &self,
        server: ServerId,
        caller: MemberId,
    ) -> Result<DebugReport, BatchError> {
        let worlds = self.worlds.load().await?;
        let config = self.configs.get(server).await?;
        let platform_roles = self.platform.roles(server).await?;
        let role_count = platform_roles.len();
        let roles = RoleDirectory::from_roles(platform_roles);

        let managed = config
            .tracked_guild()
            .map(|guild| guild.role_name().to_string())
            .into_iter()
            .chain(worlds.names().map(str::to_string));
        let (provisioned, missing): (Vec<String>, Vec<String>) =
            managed.partition(|name| roles.contains(name));

        let caller_account = self
            .accounts
            .get(caller)
            .await?
            .map(|account| account.account_name);

        Ok(DebugReport {
            world_count: worlds.len(),
            config,
            role_count,
            provisioned,
            missing,
            caller_account,
        })
    }
}
