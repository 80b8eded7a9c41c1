//! Application state and composition.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::infrastructure::config::{BotConfig, GuildPreset};
use crate::infrastructure::ports::{
    AccountRepo, ChatPlatformPort, ClockPort, GameApiPort, ServerConfigRepo, WorldCacheRepo,
};
use crate::use_cases::{
    AuditServer, DebugServer, LinkAccount, PurgeAccounts, ReconcileMember, RefreshServer, Roster,
    ServerConfigOps, TrackGuild, VerifyAccount, WorldDirectoryService, WorldRoles,
};

/// Main application state.
///
/// Built once in `main` and shared with the gateway handler. Holds every
/// port and use case; nothing in the bot reaches for globals.
pub struct App {
    pub settings: CommandSettings,
    pub platform: Arc<dyn ChatPlatformPort>,
    pub clock: Arc<dyn ClockPort>,
    pub use_cases: UseCases,
}

/// The injected ports.
pub struct Ports {
    pub accounts: Arc<dyn AccountRepo>,
    pub server_configs: Arc<dyn ServerConfigRepo>,
    pub world_cache: Arc<dyn WorldCacheRepo>,
    pub game_api: Arc<dyn GameApiPort>,
    pub platform: Arc<dyn ChatPlatformPort>,
    pub clock: Arc<dyn ClockPort>,
}

/// Command-facing settings taken from the process configuration.
#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub prefix: String,
    pub verification_channel: String,
    pub admin_channel: String,
    pub batch_concurrency: usize,
    pub presets: BTreeMap<String, GuildPreset>,
}

impl From<&BotConfig> for CommandSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            prefix: config.command_prefix.clone(),
            verification_channel: config.verification_channel.clone(),
            admin_channel: config.admin_channel.clone(),
            batch_concurrency: config.batch_concurrency,
            presets: config.presets.clone(),
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub worlds: Arc<WorldDirectoryService>,
    pub world_roles: WorldRoles,
    pub link: LinkAccount,
    pub configs: Arc<ServerConfigOps>,
    pub track_guild: TrackGuild,
    pub audit: AuditServer,
    pub refresh: RefreshServer,
    pub purge: PurgeAccounts,
    pub debug: DebugServer,
}

impl App {
    pub fn new(ports: Ports, settings: CommandSettings) -> Self {
        let worlds = Arc::new(WorldDirectoryService::new(
            ports.world_cache.clone(),
            ports.game_api.clone(),
        ));
        let configs = Arc::new(ServerConfigOps::new(ports.server_configs.clone()));
        let reconcile = Arc::new(ReconcileMember::new(
            ports.platform.clone(),
            configs.clone(),
            worlds.clone(),
        ));
        let verify = Arc::new(VerifyAccount::new(
            ports.game_api.clone(),
            ports.accounts.clone(),
            ports.clock.clone(),
        ));
        let roster = Arc::new(Roster::new(
            ports.platform.clone(),
            ports.game_api.clone(),
            ports.accounts.clone(),
            settings.batch_concurrency,
        ));

        let use_cases = UseCases {
            world_roles: WorldRoles::new(worlds.clone(), ports.platform.clone()),
            link: LinkAccount::new(verify, reconcile.clone()),
            track_guild: TrackGuild::new(ports.game_api.clone(), configs.clone()),
            audit: AuditServer::new(roster.clone(), configs.clone(), worlds.clone()),
            refresh: RefreshServer::new(roster.clone(), reconcile.clone()),
            purge: PurgeAccounts::new(
                roster,
                ports.platform.clone(),
                ports.accounts.clone(),
                reconcile,
            ),
            debug: DebugServer::new(
                ports.platform.clone(),
                ports.accounts.clone(),
                configs.clone(),
                worlds.clone(),
            ),
            worlds,
            configs,
        };

        Self {
            settings,
            platform: ports.platform,
            clock: ports.clock,
            use_cases,
        }
    }
}
