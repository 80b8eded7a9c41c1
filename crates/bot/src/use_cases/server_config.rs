//! Per-server configuration: which in-game guild a chat server tracks.

use std::sync::Arc;

use gw2link_domain::{Guild, GuildId, ServerConfig, ServerId};

use crate::infrastructure::ports::{GameApiError, GameApiPort, RepoError, ServerConfigRepo};

pub struct ServerConfigOps {
    repo: Arc<dyn ServerConfigRepo>,
}

impl ServerConfigOps {
    pub fn new(repo: Arc<dyn ServerConfigRepo>) -> Self {
        Self { repo }
    }

    /// The server's configuration, or an unconfigured default.
    pub async fn get(&self, server: ServerId) -> Result<ServerConfig, RepoError> {
        Ok(self.repo.get(server).await?.unwrap_or_default())
    }

    /// Set or clear the tracked guild.
    ///
    /// Creates the record if absent; otherwise only the guild changes.
    pub async fn set_guild(
        &self,
        server: ServerId,
        server_name: &str,
        guild: Option<Guild>,
    ) -> Result<ServerConfig, RepoError> {
        let config = self
            .repo
            .get(server)
            .await?
            .unwrap_or_else(|| ServerConfig::unconfigured(server_name))
            .with_guild(guild);
        self.repo.save(server, &config).await?;
        Ok(config)
    }
}

/// Looks a guild up in the game API and makes it the server's tracked guild.
pub struct TrackGuild {
    api: Arc<dyn GameApiPort>,
    configs: Arc<ServerConfigOps>,
}

impl TrackGuild {
    pub fn new(api: Arc<dyn GameApiPort>, configs: Arc<ServerConfigOps>) -> Self {
        Self { api, configs }
    }

    /// Track the first guild whose name matches `query`.
    pub async fn by_name(
        &self,
        server: ServerId,
        server_name: &str,
        query: &str,
    ) -> Result<Guild, TrackGuildError> {
        let query = query.trim();
        let ids = self.api.search_guild(query).await?;
        let Some(id) = ids.into_iter().next() else {
            return Err(TrackGuildError::GuildNotFound(query.to_string()));
        };
        self.by_id(server, server_name, &id).await
    }

    pub async fn by_id(
        &self,
        server: ServerId,
        server_name: &str,
        id: &GuildId,
    ) -> Result<Guild, TrackGuildError> {
        let guild = self.api.guild(id).await?;
        self.configs
            .set_guild(server, server_name, Some(guild.clone()))
            .await?;
        tracing::info!(server_id = %server, guild = %guild, "Tracking guild");
        Ok(guild)
    }

    /// Track `id` unless the server already tracks a guild.
    ///
    /// Returns the newly tracked guild, or `None` when nothing changed.
    pub async fn seed(
        &self,
        server: ServerId,
        server_name: &str,
        id: &GuildId,
    ) -> Result<Option<Guild>, TrackGuildError> {
        if self.configs.get(server).await?.tracked_guild().is_some() {
            return Ok(None);
        }
        self.by_id(server, server_name, id).await.map(Some)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackGuildError {
    #[error("No guild named {0:?}")]
    GuildNotFound(String),
    #[error("Game API error: {0}")]
    Upstream(#[from] GameApiError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
