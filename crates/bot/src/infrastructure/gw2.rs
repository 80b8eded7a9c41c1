//! Guild Wars 2 web API client.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use gw2link_domain::{AccountSnapshot, ApiKey, Guild, GuildId, World, WorldId};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::infrastructure::ports::{GameApiError, GameApiPort};

/// Default Guild Wars 2 API base URL.
pub const DEFAULT_GW2_API_BASE_URL: &str = "https://api.guildwars2.com";

/// Default request timeout in seconds.
pub const DEFAULT_GW2_API_TIMEOUT_SECS: u64 = 30;

const WORLDS: &str = "/v2/worlds";
const ACCOUNT: &str = "/v2/account";
const GUILD_SEARCH: &str = "/v2/guild/search";
const GUILD: &str = "/v2/guild";

/// Client for the Guild Wars 2 v2 REST API.
#[derive(Clone)]
pub struct Gw2Client {
    client: Client,
    base_url: String,
}

impl Gw2Client {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, GameApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| GameApiError::Transport {
                endpoint,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(endpoint, status = status.as_u16(), "Game API returned non-success");
            return Err(GameApiError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GameApiError::InvalidResponse {
                endpoint,
                message: e.to_string(),
            })
    }
}

impl Default for Gw2Client {
    fn default() -> Self {
        Self::new(
            DEFAULT_GW2_API_BASE_URL,
            Duration::from_secs(DEFAULT_GW2_API_TIMEOUT_SECS),
        )
    }
}

#[async_trait]
impl GameApiPort for Gw2Client {
    async fn worlds(&self) -> Result<Vec<World>, GameApiError> {
        let request = self
            .client
            .get(format!("{}{WORLDS}", self.base_url))
            .query(&[("ids", "all")]);
        let worlds: Vec<ApiWorld> = self.fetch(WORLDS, request).await?;
        Ok(convert_worlds(worlds))
    }

    async fn account(&self, key: &ApiKey) -> Result<AccountSnapshot, GameApiError> {
        let request = self
            .client
            .get(format!("{}{ACCOUNT}", self.base_url))
            .bearer_auth(key.expose());
        let account: ApiAccount = self.fetch(ACCOUNT, request).await?;
        convert_account(account)
    }

    async fn search_guild(&self, name: &str) -> Result<Vec<GuildId>, GameApiError> {
        let request = self
            .client
            .get(format!("{}{GUILD_SEARCH}", self.base_url))
            .query(&[("name", name)]);
        let ids: Vec<String> = self.fetch(GUILD_SEARCH, request).await?;
        ids.into_iter()
            .map(|id| GuildId::new(id).map_err(|e| invalid(GUILD_SEARCH, e)))
            .collect()
    }

    async fn guild(&self, id: &GuildId) -> Result<Guild, GameApiError> {
        let request = self
            .client
            .get(format!("{}{GUILD}/{}", self.base_url, id.as_str()));
        let guild: ApiGuild = self.fetch(GUILD, request).await?;
        convert_guild(guild)
    }
}

fn invalid(endpoint: &'static str, error: impl ToString) -> GameApiError {
    GameApiError::InvalidResponse {
        endpoint,
        message: error.to_string(),
    }
}

fn convert_worlds(worlds: Vec<ApiWorld>) -> Vec<World> {
    worlds
        .into_iter()
        .map(|w| World::from_api(WorldId::new(w.id), &w.name))
        .collect()
}

fn convert_account(account: ApiAccount) -> Result<AccountSnapshot, GameApiError> {
    let guilds = account
        .guilds
        .unwrap_or_default()
        .into_iter()
        .map(GuildId::new)
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(|e| invalid(ACCOUNT, e))?;

    Ok(AccountSnapshot {
        name: account.name,
        world: WorldId::new(account.world),
        guilds,
    })
}

fn convert_guild(guild: ApiGuild) -> Result<Guild, GameApiError> {
    Ok(Guild {
        id: GuildId::new(guild.id).map_err(|e| invalid(GUILD, e))?,
        tag: guild.tag,
        name: guild.name,
    })
}

// =============================================================================
// Guild Wars 2 API types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiWorld {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAccount {
    name: String,
    world: u32,
    /// Absent when the key lacks the `guilds` permission.
    #[serde(default)]
    guilds: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiGuild {
    id: String,
    name: String,
    tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worlds_are_normalized() {
        let raw: Vec<ApiWorld> = serde_json::from_str(
            r#"[
                {"id": 1001, "name": "Anvil Rock", "population": "Medium"},
                {"id": 2206, "name": "Miller's Sound [DE]", "population": "High"}
            ]"#,
        )
        .unwrap();
        let worlds = convert_worlds(raw);
        assert_eq!(worlds[0].name, "Anvil Rock");
        assert_eq!(worlds[1].id, WorldId::new(2206));
        assert_eq!(worlds[1].name, "Miller's Sound");
    }

    #[test]
    fn account_guilds_collected() {
        let raw: ApiAccount = serde_json::from_str(
            r#"{
                "id": "C19BE3BC-D33E-4ECB-BB62-2B3A14AD3C0C",
                "name": "Player.1234",
                "world": 1001,
                "guilds": ["4bbb52aa-d768-4fc6-8ede-c299f2822f0f"],
                "created": "2012-08-28T00:00:00Z"
            }"#,
        )
        .unwrap();
        let snapshot = convert_account(raw).unwrap();
        assert_eq!(snapshot.name, "Player.1234");
        assert_eq!(snapshot.world, WorldId::new(1001));
        assert!(snapshot.is_in_guild(&GuildId::new("4BBB52AA-D768-4FC6-8EDE-C299F2822F0F").unwrap()));
    }

    #[test]
    fn account_without_guild_scope_has_no_guilds() {
        let raw: ApiAccount =
            serde_json::from_str(r#"{"name": "Player.1234", "world": 2101}"#).unwrap();
        assert!(convert_account(raw).unwrap().guilds.is_empty());
    }

    #[test]
    fn blank_guild_id_is_invalid_response() {
        let raw: ApiAccount =
            serde_json::from_str(r#"{"name": "P", "world": 1, "guilds": [""]}"#).unwrap();
        assert!(matches!(
            convert_account(raw),
            Err(GameApiError::InvalidResponse { endpoint: ACCOUNT, .. })
        ));
    }

    #[test]
    fn guild_converted() {
        let raw: ApiGuild = serde_json::from_str(
            r#"{"id": "116e0c0e-0035-44a9-bb22-4ae3e23127e5", "name": "Edge Of Destiny", "tag": "EoD", "level": 42}"#,
        )
        .unwrap();
        let guild = convert_guild(raw).unwrap();
        assert_eq!(guild.to_string(), "[EoD] Edge Of Destiny");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = Gw2Client::new("https://example.test/", Duration::from_secs(1));
        assert_eq!(client.base_url, "https://example.test");
    }
}
