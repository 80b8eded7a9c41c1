//! Table-driven command dispatch.
//!
//! Turns an incoming message into at most one reply. Gate failures are
//! silent; everything else gets an answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gw2link_domain::{ChannelId, DomainError, MemberId, MessageId, ServerConfig, ServerId};

use crate::api::commands::{lookup, Command, CommandName, Gate, WorldsAction};
use crate::api::error_sanitizer::sanitize_error;
use crate::api::format;
use crate::app::App;
use crate::use_cases::{TrackGuildError, VerifyError, WorldRoleError, INVALID_KEY_MESSAGE};

/// The server a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRef {
    pub id: ServerId,
    pub name: String,
}

/// A chat message, reduced to what dispatch needs.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub author: MemberId,
    pub author_is_bot: bool,
    /// `None` for direct messages.
    pub server: Option<ServerRef>,
    pub channel: ChannelId,
    pub channel_name: Option<String>,
    pub message: MessageId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

pub struct Dispatcher {
    app: Arc<App>,
}

impl Dispatcher {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    /// Whether `content` names a known command, before any gating.
    pub fn is_command(&self, content: &str) -> bool {
        lookup(&self.app.settings.prefix, content).is_some()
    }

    pub async fn dispatch(&self, invocation: &Invocation) -> Option<String> {
        if invocation.author_is_bot {
            return None;
        }
        let prefix = &self.app.settings.prefix;
        let (spec, args) = lookup(prefix, &invocation.content)?;

        if !self.passes_gate(spec.gate, invocation) {
            tracing::debug!(
                command = spec.names[0],
                channel = ?invocation.channel_name,
                "Command outside its channel, ignoring"
            );
            return None;
        }

        if spec.name == CommandName::Key {
            self.hide_key(invocation).await;
        }

        let Some(command) = spec.build(&args) else {
            return Some(spec.usage_reply(prefix));
        };

        if let Some(permission) = spec.permission {
            let target = match self.target_server(&command, invocation) {
                Ok(target) => target,
                Err(reply) => return Some(reply),
            };
            match self
                .app
                .platform
                .has_permission(target, invocation.author, permission)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    return Some(format!(
                        "You must have the {} permission to {}.",
                        permission.name(),
                        spec.summary
                    ))
                }
                Err(e) => return Some(sanitize_error(&e, "check permissions")),
            }
        }

        tracing::info!(
            command = spec.names[0],
            member_id = %invocation.author,
            server_id = ?invocation.server.as_ref().map(|s| s.id.get()),
            "Running command"
        );
        Some(self.execute(command, invocation).await)
    }

    fn passes_gate(&self, gate: Gate, invocation: &Invocation) -> bool {
        let in_channel = |wanted: &str| {
            invocation
                .channel_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
        };
        let settings = &self.app.settings;
        match gate {
            Gate::Anywhere => true,
            Gate::VerificationOrDirect => {
                invocation.server.is_none() || in_channel(&settings.verification_channel)
            }
            Gate::Admin => invocation.server.is_some() && in_channel(&settings.admin_channel),
        }
    }

    /// Delete a message carrying an API key from a server channel.
    async fn hide_key(&self, invocation: &Invocation) {
        if invocation.server.is_none() {
            return;
        }
        if let Err(e) = self
            .app
            .platform
            .delete_message(invocation.channel, invocation.message)
            .await
        {
            tracing::warn!(error = %e, member_id = %invocation.author, "Failed to delete message with API key");
        }
    }

    /// The server a command acts on.
    fn target_server(&self, command: &Command, invocation: &Invocation) -> Result<ServerId, String> {
        if let Command::Purge {
            preset: Some(preset),
        } = command
        {
            return self
                .app
                .settings
                .presets
                .get(&preset.to_ascii_lowercase())
                .map(|p| p.server_id)
                .ok_or_else(|| format!("Unknown preset: {preset}"));
        }
        invocation
            .server
            .as_ref()
            .map(|s| s.id)
            .ok_or_else(|| "This command only works in a server".to_string())
    }

    async fn execute(&self, command: Command, invocation: &Invocation) -> String {
        match command {
            Command::Ping => self.ping(invocation),
            Command::Key { api_key } => self.key(invocation, &api_key).await,
            Command::Purge { .. } => match self.target_server(&command, invocation) {
                Ok(target) => self.purge(target).await,
                Err(reply) => reply,
            },
            command => match &invocation.server {
                Some(server) => self.admin(command, server, invocation.author).await,
                None => "This command only works in a server".to_string(),
            },
        }
    }

    fn ping(&self, invocation: &Invocation) -> String {
        let latency = (self.app.clock.now() - invocation.sent_at)
            .num_milliseconds()
            .max(0);
        format!("Pong! Latency is {latency}ms.")
    }

    async fn key(&self, invocation: &Invocation, api_key: &str) -> String {
        let servers = match &invocation.server {
            Some(server) => vec![server.id],
            None => match self.app.platform.servers().await {
                Ok(servers) => servers.into_iter().map(|s| s.id).collect(),
                Err(e) => return sanitize_error(&e, "look up your servers"),
            },
        };

        match self
            .app
            .use_cases
            .link
            .execute(invocation.author, api_key, &servers)
            .await
        {
            Ok(outcome) => {
                let mut reply = "API key added successfully.".to_string();
                let failures = outcome.failures().count();
                if failures > 0 {
                    reply.push_str(&format!(
                        "\nRoles could not be updated in {failures} server(s)."
                    ));
                }
                reply
            }
            Err(VerifyError::InvalidKey) => INVALID_KEY_MESSAGE.to_string(),
            Err(VerifyError::Validation(DomainError::Validation(reason))) => reason,
            Err(e @ VerifyError::UpstreamUnavailable(_)) => {
                tracing::warn!(error = %e, "Game API unavailable during verification");
                "The Guild Wars 2 API is unavailable - please try again later.".to_string()
            }
            Err(e) => sanitize_error(&e, "store API key"),
        }
    }

    async fn purge(&self, target: ServerId) -> String {
        match self.app.use_cases.purge.execute(target).await {
            Ok(report) => format::purge(&report),
            Err(e) => sanitize_error(&e, "purge accounts"),
        }
    }

    async fn admin(&self, command: Command, server: &ServerRef, author: MemberId) -> String {
        let use_cases = &self.app.use_cases;
        match command {
            Command::Guild { query: None } => match use_cases.configs.get(server.id).await {
                Ok(config) => format::guild(&config),
                Err(e) => sanitize_error(&e, "load server config"),
            },
            Command::Guild { query: Some(query) } => match use_cases
                .track_guild
                .by_name(server.id, &server.name, &query)
                .await
            {
                Ok(guild) => format!("Now tracking {guild}"),
                Err(TrackGuildError::GuildNotFound(name)) => format!("No guild found named {name:?}"),
                Err(e) => sanitize_error(&e, "set guild"),
            },
            Command::Audit => match use_cases.audit.execute(server.id).await {
                Ok(audit) => format::audit(&audit.report, &audit.config),
                Err(e) => sanitize_error(&e, "run audit"),
            },
            Command::Servers => self.servers().await,
            Command::Worlds(action) => {
                let result = match action {
                    WorldsAction::List => use_cases
                        .world_roles
                        .list(server.id)
                        .await
                        .map(|statuses| format::world_roles(&statuses)),
                    WorldsAction::Add(name) => use_cases
                        .world_roles
                        .add(server.id, &name)
                        .await
                        .map(|change| format::world_role_change(&change)),
                    WorldsAction::Remove(name) => use_cases
                        .world_roles
                        .remove(server.id, &name)
                        .await
                        .map(|change| format::world_role_change(&change)),
                };
                match result {
                    Ok(reply) => reply,
                    Err(WorldRoleError::UnknownWorld(name)) => format!("Unknown world: {name}"),
                    Err(e) => sanitize_error(&e, "manage world roles"),
                }
            }
            Command::Refresh => match use_cases.refresh.execute(server.id).await {
                Ok(report) => format::refresh(&report),
                Err(e) => sanitize_error(&e, "refresh roles"),
            },
            Command::Debug => match use_cases.debug.execute(server.id, author).await {
                Ok(report) => format::debug(&report),
                Err(e) => sanitize_error(&e, "collect debug information"),
            },
            Command::Ping | Command::Key { .. } | Command::Purge { .. } => {
                "Invalid command".to_string()
            }
        }
    }

    async fn servers(&self) -> String {
        let servers = match self.app.platform.servers().await {
            Ok(servers) => servers,
            Err(e) => return sanitize_error(&e, "list servers"),
        };
        let mut rows = Vec::with_capacity(servers.len());
        for server in servers {
            let config = match self.app.use_cases.configs.get(server.id).await {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(server_id = %server.id, error = %e, "Failed to load server config");
                    ServerConfig::default()
                }
            };
            rows.push((server, config));
        }
        format::servers(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{CommandSettings, Ports};
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::config::GuildPreset;
    use crate::infrastructure::ports::{
        GameApiError, MockAccountRepo, MockChatPlatformPort, MockGameApiPort,
        MockServerConfigRepo, MockWorldCacheRepo, Permission,
    };
    use chrono::{Duration, TimeZone};
    use gw2link_domain::{
        Account, AccountSnapshot, ApiKey, Guild, GuildId, Member, WorldDirectory, WorldId,
    };
    use std::collections::{BTreeMap, BTreeSet};

    const SERVER: ServerId = ServerId::new(10);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    struct Mocks {
        accounts: MockAccountRepo,
        configs: MockServerConfigRepo,
        api: MockGameApiPort,
        platform: MockChatPlatformPort,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                accounts: MockAccountRepo::new(),
                configs: MockServerConfigRepo::new(),
                api: MockGameApiPort::new(),
                platform: MockChatPlatformPort::new(),
            }
        }

        fn dispatcher(self) -> Dispatcher {
            let mut cache = MockWorldCacheRepo::new();
            cache
                .expect_load()
                .returning(|| Ok(Some(WorldDirectory::default())));
            cache.expect_store().returning(|_| Ok(()));

            let mut presets = BTreeMap::new();
            presets.insert(
                "raid".to_string(),
                GuildPreset {
                    server_id: ServerId::new(20),
                    guild_id: GuildId::new("RAID").unwrap(),
                },
            );

            let ports = Ports {
                accounts: Arc::new(self.accounts),
                server_configs: Arc::new(self.configs),
                world_cache: Arc::new(cache),
                game_api: Arc::new(self.api),
                platform: Arc::new(self.platform),
                clock: Arc::new(FixedClock(now())),
            };
            let settings = CommandSettings {
                prefix: "!".into(),
                verification_channel: "verification".into(),
                admin_channel: "admin".into(),
                batch_concurrency: 2,
                presets,
            };
            Dispatcher::new(Arc::new(App::new(ports, settings)))
        }
    }

    fn message(content: &str, channel: Option<&str>) -> Invocation {
        Invocation {
            author: MemberId::new(5),
            author_is_bot: false,
            server: channel.map(|_| ServerRef {
                id: SERVER,
                name: "Test Server".into(),
            }),
            channel: ChannelId::new(99),
            channel_name: channel.map(str::to_string),
            message: MessageId::new(1234),
            content: content.into(),
            sent_at: now() - Duration::milliseconds(42),
        }
    }

    #[tokio::test]
    async fn ping_reports_latency() {
        let dispatcher = Mocks::new().dispatcher();
        let reply = dispatcher.dispatch(&message("!ping", Some("general"))).await;
        assert_eq!(reply.as_deref(), Some("Pong! Latency is 42ms."));
    }

    #[tokio::test]
    async fn bots_are_ignored() {
        let dispatcher = Mocks::new().dispatcher();
        let mut invocation = message("!ping", None);
        invocation.author_is_bot = true;
        assert_eq!(dispatcher.dispatch(&invocation).await, None);
    }

    #[tokio::test]
    async fn key_outside_verification_channel_is_silent() {
        let mut mocks = Mocks::new();
        mocks.api.expect_account().never();
        mocks.platform.expect_delete_message().never();
        let dispatcher = mocks.dispatcher();
        assert_eq!(
            dispatcher.dispatch(&message("!key ABCD", Some("general"))).await,
            None
        );
    }

    #[tokio::test]
    async fn invalid_key_is_hidden_and_refused() {
        let mut mocks = Mocks::new();
        mocks
            .platform
            .expect_delete_message()
            .withf(|channel, message| {
                *channel == ChannelId::new(99) && *message == MessageId::new(1234)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.api.expect_account().returning(|_| {
            Err(GameApiError::Status {
                endpoint: "/v2/account",
                status: 401,
            })
        });
        mocks.accounts.expect_save().never();
        mocks.platform.expect_set_member_roles().never();

        let reply = mocks
            .dispatcher()
            .dispatch(&message("!key BAD-KEY", Some("verification")))
            .await;
        assert_eq!(reply.as_deref(), Some(INVALID_KEY_MESSAGE));
    }

    #[tokio::test]
    async fn key_with_wrong_arguments_shows_usage_and_still_hides_message() {
        let mut mocks = Mocks::new();
        mocks
            .platform
            .expect_delete_message()
            .times(1)
            .returning(|_, _| Ok(()));
        let reply = mocks
            .dispatcher()
            .dispatch(&message("!key two words", Some("verification")))
            .await;
        assert_eq!(
            reply.as_deref(),
            Some("Invalid command\nUsage: !key <apiKey>")
        );
    }

    #[tokio::test]
    async fn admin_commands_only_in_admin_channel() {
        let dispatcher = Mocks::new().dispatcher();
        assert_eq!(
            dispatcher.dispatch(&message("!audit", Some("verification"))).await,
            None
        );
        assert_eq!(dispatcher.dispatch(&message("!audit", None)).await, None);
    }

    #[tokio::test]
    async fn purge_requires_kick_members() {
        let mut mocks = Mocks::new();
        mocks
            .platform
            .expect_has_permission()
            .withf(|server, member, permission| {
                *server == SERVER
                    && *member == MemberId::new(5)
                    && *permission == Permission::KickMembers
            })
            .returning(|_, _, _| Ok(false));
        mocks.accounts.expect_list_member_ids().never();

        let reply = mocks
            .dispatcher()
            .dispatch(&message("!purge", Some("admin")))
            .await;
        assert_eq!(
            reply.as_deref(),
            Some("You must have the KICK_MEMBERS permission to purge accounts.")
        );
    }

    #[tokio::test]
    async fn purge_preset_checks_permission_on_preset_server() {
        let mut mocks = Mocks::new();
        mocks
            .platform
            .expect_has_permission()
            .withf(|server, _, _| *server == ServerId::new(20))
            .times(1)
            .returning(|_, _, _| Ok(false));

        let reply = mocks
            .dispatcher()
            .dispatch(&message("!purge RAID", Some("admin")))
            .await;
        assert!(reply.unwrap().starts_with("You must have"));
    }

    #[tokio::test]
    async fn purge_unknown_preset() {
        let mut mocks = Mocks::new();
        mocks.platform.expect_has_permission().never();
        let reply = mocks
            .dispatcher()
            .dispatch(&message("!purge nope", Some("admin")))
            .await;
        assert_eq!(reply.as_deref(), Some("Unknown preset: nope"));
    }

    #[tokio::test]
    async fn guild_without_arguments_shows_tracked_guild() {
        let mut mocks = Mocks::new();
        mocks.configs.expect_get().returning(|_| Ok(None));
        let reply = mocks
            .dispatcher()
            .dispatch(&message("!guild", Some("admin")))
            .await;
        assert_eq!(reply.as_deref(), Some("No guild configured"));
    }

    #[tokio::test]
    async fn audit_reads_server_config_once() {
        let guild = Guild {
            id: GuildId::new("ABC").unwrap(),
            tag: "G1".into(),
            name: "Guild One".into(),
        };
        let snapshot = AccountSnapshot {
            name: "Acc.1234".into(),
            world: WorldId::new(1001),
            guilds: BTreeSet::from([guild.id.clone()]),
        };

        let mut mocks = Mocks::new();
        mocks
            .configs
            .expect_get()
            .times(1)
            .returning(move |_| {
                Ok(Some(
                    ServerConfig::unconfigured("Test Server").with_guild(Some(guild.clone())),
                ))
            });
        mocks.platform.expect_members_page().returning(|_, _, _| {
            Ok(vec![Member {
                id: MemberId::new(7),
                display_name: "member7".into(),
                roles: BTreeSet::new(),
                bot: false,
            }])
        });
        let stored = snapshot.clone();
        mocks.accounts.expect_get().returning(move |id| {
            Ok(Some(Account::new(
                id,
                ApiKey::new("KEY-7").unwrap(),
                &stored,
                now(),
            )))
        });
        mocks
            .api
            .expect_account()
            .returning(move |_| Ok(snapshot.clone()));

        let reply = mocks
            .dispatcher()
            .dispatch(&message("!audit", Some("admin")))
            .await
            .unwrap();
        assert!(reply.contains("**[G1] Guild One** (1)\n- member7 (Acc.1234)"));
    }

    #[tokio::test]
    async fn storage_errors_are_sanitized() {
        let mut mocks = Mocks::new();
        mocks.configs.expect_get().returning(|_| {
            Err(crate::infrastructure::ports::RepoError::database(
                "kv_get",
                "database is locked",
            ))
        });
        let reply = mocks
            .dispatcher()
            .dispatch(&message("!guild", Some("admin")))
            .await
            .unwrap();
        assert_eq!(reply, "Failed to load server config - please try again");
    }
}
