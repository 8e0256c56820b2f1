use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::registry::SessionRegistry;
use crate::bot::{DiscordConnector, JukeboxBot};
use crate::config::Config;
use crate::sources::YtDlpResolver;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voice_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("🎵 Iniciando Voice Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    if !dependencies_available(&config).await {
        warn!("⚠️ Faltan herramientas externas, la reproducción fallará");
    }

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let songbird = Songbird::serenity();
    let http = Arc::new(Http::new(&config.discord_token));
    let connector = DiscordConnector::new(songbird.clone(), http, &config);
    let registry = Arc::new(SessionRegistry::new(connector, config.start_retry_delay));
    let resolver = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.ytdlp_format.clone(),
    ));

    // Crear handler del bot
    let handler = JukeboxBot::new(config.clone(), registry.clone(), resolver);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, registry.stop_all())
            .await
            .is_err()
        {
            warn!("⏱️ Algunas sesiones no terminaron a tiempo");
        }
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn tool_runs(program: &str, version_flag: &str) -> bool {
    match async_process::Command::new(program)
        .arg(version_flag)
        .output()
        .await
    {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            warn!("{} terminó con {}", program, output.status);
            false
        }
        Err(e) => {
            warn!("No se pudo ejecutar {}: {}", program, e);
            false
        }
    }
}

async fn dependencies_available(config: &Config) -> bool {
    let yt_dlp = tool_runs(&config.ytdlp_path, "--version").await;
    let ffmpeg = tool_runs(&config.ffmpeg_path, "-version").await;
    yt_dlp && ffmpeg
}

async fn health_check() -> Result<()> {
    dotenvy::dotenv().ok();
    let defaults = Config::default();
    let config = Config {
        ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path.clone()),
        ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path.clone()),
        ..defaults
    };

    // Verificar dependencias críticas
    if dependencies_available(&config).await {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
