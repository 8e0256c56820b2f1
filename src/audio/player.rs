use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::GuildId;
use songbird::{
    input::{ChildContainer, Input},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    process::{Command, Stdio},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    audio::transport::{AudioTransport, TrackEndNotifier, TransportOptions},
    error::TransportError,
};

/// Salida de voz de un guild: llamada songbird más un ffmpeg por stream
pub struct SongbirdPlayer {
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    guild_id: GuildId,
    ffmpeg_path: String,
    options: TransportOptions,
    current: SyncMutex<Option<TrackHandle>>,
}

impl SongbirdPlayer {
    pub fn new(
        manager: Arc<Songbird>,
        call: Arc<Mutex<Call>>,
        guild_id: GuildId,
        ffmpeg_path: String,
        options: TransportOptions,
    ) -> Self {
        Self {
            manager,
            call,
            guild_id,
            ffmpeg_path,
            options,
            current: SyncMutex::new(None),
        }
    }

    fn current_track(&self) -> Option<TrackHandle> {
        self.current.lock().clone()
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let track = self.current_track()?;
        track.get_info().await.ok().map(|info| info.playing)
    }
}

/// Argumentos de ffmpeg: WAV estéreo a 48 kHz por stdout
pub fn encoder_args(locator: &str, options: &TransportOptions) -> Vec<String> {
    let mut args: Vec<String> = ["-nostdin", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if options.reconnect {
        args.extend(
            [
                "-reconnect",
                "1",
                "-reconnect_streamed",
                "1",
                "-reconnect_delay_max",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(options.reconnect_delay_max.as_secs().max(1).to_string());
    }

    args.push("-i".to_string());
    args.push(locator.to_string());

    if options.audio_only {
        args.push("-vn".to_string());
    }

    args.extend(
        ["-f", "wav", "-ac", "2", "-ar", "48000", "pipe:1"]
            .iter()
            .map(|s| s.to_string()),
    );
    args
}

#[async_trait]
impl AudioTransport for SongbirdPlayer {
    type Stream = Input;

    async fn open_source(&self, locator: &str) -> Result<Input, TransportError> {
        debug!("🔧 Abriendo fuente con ffmpeg: {}", locator);

        let child = Command::new(&self.ffmpeg_path)
            .args(encoder_args(locator, &self.options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TransportError::Open(format!("{}: {}", self.ffmpeg_path, e)))?;

        Ok(ChildContainer::from(child).into())
    }

    async fn play(&self, stream: Input, on_end: TrackEndNotifier) -> Result<(), TransportError> {
        let handle = {
            let mut call = self.call.lock().await;
            if call.current_channel().is_none() {
                return Err(TransportError::NotConnected);
            }
            call.play_input(stream)
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEndRelay {
                        notifier: on_end.clone(),
                    },
                )
                .map_err(|e| TransportError::Control(format!("{e:?}")))?;
        }

        if let Err(e) = handle.make_playable_async().await {
            let _ = handle.stop();
            return Err(TransportError::Start(format!("{e:?}")));
        }

        info!("🔊 Stream {} en reproducción en guild {}", on_end.stream(), self.guild_id);
        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        let previous = self.current.lock().take();
        if let Some(track) = previous {
            let _ = track.stop();
        }
        self.call.lock().await.stop();
    }

    async fn pause(&self) -> Result<(), TransportError> {
        let track = self
            .current_track()
            .ok_or_else(|| TransportError::Control("no hay track activo".to_string()))?;
        track
            .pause()
            .map_err(|e| TransportError::Control(format!("{e:?}")))
    }

    async fn resume(&self) -> Result<(), TransportError> {
        let track = self
            .current_track()
            .ok_or_else(|| TransportError::Control("no hay track activo".to_string()))?;
        track
            .play()
            .map_err(|e| TransportError::Control(format!("{e:?}")))
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }

    async fn is_connected(&self) -> bool {
        self.call.lock().await.current_channel().is_some()
    }

    async fn disconnect(&self) {
        if let Err(e) = self.manager.remove(self.guild_id).await {
            error!("Error al salir del canal de voz: {:?}", e);
        } else {
            info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        }
    }
}

/// Reenvía el fin (o error) de un track al buzón de la sesión
struct TrackEndRelay {
    notifier: TrackEndNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackEndRelay {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let mut error = None;
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                if let PlayMode::Errored(e) = &state.playing {
                    error = Some(format!("{e:?}"));
                }
            }
        }

        debug!("Track {} terminó", self.notifier.stream());
        self.notifier.notify(error);

        Some(Event::Cancel)
    }
}
