//! # Bot Module
//!
//! Discord glue for the jukebox.
//!
//! The bot is built around the [`JukeboxBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It:
//!
//! - Turns chat messages with video links or MP3 attachments into queued items
//! - Forwards status-message button presses to the guild's session
//! - Reports the bot leaving voice to the guild's session
//!
//! Voice connections and status messages for new sessions are created by
//! [`DiscordConnector`].

use async_trait::async_trait;
use serenity::{
    all::{Context, EventHandler, Interaction, Message, Ready, VoiceState},
    http::Http,
};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod events;
pub mod handlers;

use crate::{
    audio::{
        player::SongbirdPlayer,
        registry::{RouteTarget, SessionConnector, SessionRegistry},
        session::SessionHandle,
        transport::TransportOptions,
    },
    config::Config,
    error::SessionError,
    sources::YtDlpResolver,
    ui::discord::StatusMessage,
};

pub type JukeboxRegistry = SessionRegistry<DiscordConnector>;

/// Handler principal de eventos de Discord
pub struct JukeboxBot {
    /// Configuración cargada del entorno
    config: Arc<Config>,
    /// Una sesión de reproducción por guild
    pub registry: Arc<JukeboxRegistry>,
    /// Resolución de enlaces con yt-dlp
    resolver: Arc<YtDlpResolver>,
}

impl JukeboxBot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<JukeboxRegistry>,
        resolver: Arc<YtDlpResolver>,
    ) -> Self {
        Self {
            config,
            registry,
            resolver,
        }
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = handlers::handle_message(&ctx, &msg, self).await {
            error!("Error manejando mensaje: {:?}", e);
        }
    }

    /// Botones del mensaje de estado
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component_interaction) = interaction {
            if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await {
                error!("Error manejando componente: {:?}", e);
            }
        }
    }

    /// Detecta que el bot salió del canal de voz
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id.or_else(|| old.and_then(|state| state.guild_id)) {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.registry.connection_lost(guild_id);
        }
    }
}

/// Conecta a voz con songbird y publica el mensaje de estado
pub struct DiscordConnector {
    manager: Arc<Songbird>,
    http: Arc<Http>,
    ffmpeg_path: String,
    options: TransportOptions,
}

impl DiscordConnector {
    pub fn new(manager: Arc<Songbird>, http: Arc<Http>, config: &Config) -> Self {
        Self {
            manager,
            http,
            ffmpeg_path: config.ffmpeg_path.clone(),
            options: config.transport_options(),
        }
    }
}

#[async_trait]
impl SessionConnector for DiscordConnector {
    type Transport = SongbirdPlayer;
    type Surface = StatusMessage;

    async fn connect(
        &self,
        target: &RouteTarget,
        session: &SessionHandle,
    ) -> Result<(SongbirdPlayer, StatusMessage), SessionError> {
        let call = self
            .manager
            .join(target.guild_id, target.voice_channel)
            .await
            .map_err(|e| {
                error!("Error al obtener handler de voz: {:?}", e);
                SessionError::Connect(format!("{e:?}"))
            })?;

        {
            let mut handler = call.lock().await;
            events::register_voice_events(&mut handler, target.guild_id, session.clone());
        }
        info!(
            "🔊 Conectado al canal de voz {} en guild {}",
            target.voice_channel, target.guild_id
        );

        let surface = match StatusMessage::post(self.http.clone(), target.text_channel).await {
            Ok(surface) => surface,
            Err(e) => {
                warn!("No se pudo publicar el mensaje de estado: {:?}", e);
                if let Err(e) = self.manager.remove(target.guild_id).await {
                    error!("Error al salir del canal de voz: {:?}", e);
                }
                return Err(SessionError::Connect(e.to_string()));
            }
        };

        let transport = SongbirdPlayer::new(
            self.manager.clone(),
            call,
            target.guild_id,
            self.ffmpeg_path.clone(),
            self.options.clone(),
        );

        Ok((transport, surface))
    }
}
