//! gw2link Bot - Main entry point.

use std::sync::Arc;

use anyhow::Context as _;
use serenity::all::GatewayIntents;
use serenity::http::Http;
use serenity::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gw2link_bot::api::{self, Dispatcher, Handler};
use gw2link_bot::app::{App, CommandSettings, Ports};
use gw2link_bot::infrastructure::{
    clock::SystemClock,
    config::BotConfig,
    discord::DiscordPlatform,
    gw2::Gw2Client,
    ports::{ChatPlatformPort, ClockPort},
    store::{KvAccountRepo, KvServerConfigRepo, KvWorldCache, SqliteKvStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gw2link_bot=debug,gw2link_domain=info,serenity=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gw2link bot");

    let config = BotConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    tracing::info!("Opening store at {}", config.store_path);
    let store = Arc::new(SqliteKvStore::new(&config.store_path, clock.clone()).await?);

    let platform: Arc<dyn ChatPlatformPort> = Arc::new(DiscordPlatform::new(Arc::new(
        Http::new(&config.discord_token),
    )));

    let ports = Ports {
        accounts: Arc::new(KvAccountRepo::new(store.clone())),
        server_configs: Arc::new(KvServerConfigRepo::new(store.clone())),
        world_cache: Arc::new(KvWorldCache::new(store)),
        game_api: Arc::new(Gw2Client::new(
            &config.gw2_api_base_url,
            config.gw2_api_timeout,
        )),
        platform: platform.clone(),
        clock,
    };
    let app = Arc::new(App::new(ports, CommandSettings::from(&config)));

    // Role decisions need every world name, so startup waits for them.
    let worlds = app
        .use_cases
        .worlds
        .load()
        .await
        .context("Failed to load world list")?;
    tracing::info!(worlds = worlds.len(), "World directory ready");

    seed_presets(&app, &config).await;

    if let Some(port) = config.port {
        tokio::spawn(async move {
            if let Err(e) = api::http::serve(port).await {
                tracing::error!(error = %e, "Health check server stopped");
            }
        });
    }

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler::new(Dispatcher::new(app)))
        .await
        .context("Failed to build Discord client")?;

    client.start().await.context("Discord client stopped")?;
    Ok(())
}

/// Track each preset's guild on servers that have none yet.
async fn seed_presets(app: &App, config: &BotConfig) {
    if config.presets.is_empty() {
        return;
    }
    let servers = match app.platform.servers().await {
        Ok(servers) => servers,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list servers, using preset names");
            Vec::new()
        }
    };

    for (name, preset) in &config.presets {
        let server_name = servers
            .iter()
            .find(|s| s.id == preset.server_id)
            .map(|s| s.name.as_str())
            .unwrap_or(name);
        match app
            .use_cases
            .track_guild
            .seed(preset.server_id, server_name, &preset.guild_id)
            .await
        {
            Ok(Some(guild)) => {
                tracing::info!(preset = %name, server_id = %preset.server_id, guild = %guild, "Seeded guild from preset")
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(preset = %name, server_id = %preset.server_id, error = %e, "Failed to seed preset")
            }
        }
    }
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
