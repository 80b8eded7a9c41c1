//! Process configuration from environment variables.
//!
//! `main` loads `.env.local` and `.env` first, so everything here can come
//! from either the real environment or those files.

use std::collections::BTreeMap;
use std::time::Duration;

use gw2link_domain::{GuildId, ServerId};
use serde::Deserialize;

use crate::infrastructure::gw2::{DEFAULT_GW2_API_BASE_URL, DEFAULT_GW2_API_TIMEOUT_SECS};

pub const DEFAULT_STORE_PATH: &str = "gw2link.db";
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
pub const DEFAULT_VERIFICATION_CHANNEL: &str = "verification";
pub const DEFAULT_ADMIN_CHANNEL: &str = "admin";
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;
const BATCH_CONCURRENCY_RANGE: std::ops::RangeInclusive<usize> = 1..=32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            reason: reason.to_string(),
        }
    }
}

/// A named (server, guild) pair from `GUILD_CONFIG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildPreset {
    pub server_id: ServerId,
    pub guild_id: GuildId,
}

#[derive(Deserialize)]
struct RawPreset {
    #[serde(alias = "discordId")]
    server_id: String,
    #[serde(alias = "gw2Id")]
    guild_id: String,
}

/// Everything the bot reads from its environment.
#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub store_path: String,
    pub gw2_api_base_url: String,
    pub gw2_api_timeout: Duration,
    pub command_prefix: String,
    pub verification_channel: String,
    pub admin_channel: String,
    pub batch_concurrency: usize,
    /// Health-check port; no HTTP server when unset.
    pub port: Option<u16>,
    pub presets: BTreeMap<String, GuildPreset>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("store_path", &self.store_path)
            .field("gw2_api_base_url", &self.gw2_api_base_url)
            .field("gw2_api_timeout", &self.gw2_api_timeout)
            .field("command_prefix", &self.command_prefix)
            .field("verification_channel", &self.verification_channel)
            .field("admin_channel", &self.admin_channel)
            .field("batch_concurrency", &self.batch_concurrency)
            .field("port", &self.port)
            .field("presets", &self.presets)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = var("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let gw2_api_timeout = match var("GW2_API_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::invalid(
                        "GW2_API_TIMEOUT_SECS",
                        format!("expected a positive number of seconds, got {raw:?}"),
                    ))
                }
            },
            None => Duration::from_secs(DEFAULT_GW2_API_TIMEOUT_SECS),
        };

        let batch_concurrency = match var("BATCH_CONCURRENCY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if BATCH_CONCURRENCY_RANGE.contains(&n) => n,
                _ => {
                    return Err(ConfigError::invalid(
                        "BATCH_CONCURRENCY",
                        format!("expected 1-32, got {raw:?}"),
                    ))
                }
            },
            None => DEFAULT_BATCH_CONCURRENCY,
        };

        let port = var("PORT")
            .map(|raw| raw.parse::<u16>().map_err(|e| ConfigError::invalid("PORT", e)))
            .transpose()?;

        let presets = match var("GUILD_CONFIG") {
            Some(raw) => parse_presets(&raw)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            discord_token,
            store_path: var("STORE_PATH").unwrap_or_else(|| DEFAULT_STORE_PATH.into()),
            gw2_api_base_url: var("GW2_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GW2_API_BASE_URL.into()),
            gw2_api_timeout,
            command_prefix: var("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.into()),
            verification_channel: var("VERIFICATION_CHANNEL")
                .unwrap_or_else(|| DEFAULT_VERIFICATION_CHANNEL.into()),
            admin_channel: var("ADMIN_CHANNEL").unwrap_or_else(|| DEFAULT_ADMIN_CHANNEL.into()),
            batch_concurrency,
            port,
            presets,
        })
    }
}

fn parse_presets(raw: &str) -> Result<BTreeMap<String, GuildPreset>, ConfigError> {
    let parsed: BTreeMap<String, RawPreset> =
        serde_json::from_str(raw).map_err(|e| ConfigError::invalid("GUILD_CONFIG", e))?;

    parsed
        .into_iter()
        .map(|(name, preset)| {
            let server_id = preset.server_id.parse::<ServerId>().map_err(|e| {
                ConfigError::invalid("GUILD_CONFIG", format!("preset {name:?}: {e}"))
            })?;
            let guild_id = GuildId::new(preset.guild_id).map_err(|e| {
                ConfigError::invalid("GUILD_CONFIG", format!("preset {name:?}: {e}"))
            })?;
            Ok((
                name.to_ascii_lowercase(),
                GuildPreset {
                    server_id,
                    guild_id,
                },
            ))
        })
        .collect()
}
