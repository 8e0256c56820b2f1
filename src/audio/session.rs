//! Playback session: the per-guild state machine behind the jukebox.
//!
//! Every mutation of the queue, the current item, the loop flag and the
//! transport state happens inside [`PlaybackSession::run`], which drains a
//! single mailbox. User controls, routed items, retry timers and the
//! transport's completion callbacks are all messages on that mailbox, so
//! they are totally ordered relative to each other.

use serenity::model::id::GuildId;
use std::{
    ops::ControlFlow,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::{MediaItem, SongQueue},
        registry::SessionSlots,
        transport::{AudioTransport, StreamId, TrackEndNotifier},
    },
    error::{SessionError, TransportError},
    ui::{buttons::ControlEvent, status, ControlSurface, Indicator},
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Mensajes del buzón de la sesión
#[derive(Debug)]
pub enum Command {
    Enqueue(MediaItem),
    Advance,
    PlayIfIdle,
    Pause,
    Resume,
    PlayPause,
    Skip,
    ToggleLoop,
    Stop,
    ConnectionLost,
    TrackEnded {
        stream: StreamId,
        error: Option<String>,
    },
    RetryStart {
        attempt: u64,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Estado actual de la sesión, leído a través del buzón
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current: Option<MediaItem>,
    pub queue: Vec<MediaItem>,
    pub looping: bool,
    pub state: TransportState,
    pub connected: bool,
    pub streaming: bool,
    pub paused: bool,
}

/// Lado emisor clonable de una sesión
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    guild_id: GuildId,
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// Crea el handle y el buzón de la sesión
    pub fn channel(guild_id: GuildId) -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            guild_id,
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// La sesión ya se detuvo
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Espera a que la sesión termine de cerrarse
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.tx.send(command).map_err(|_| SessionError::Closed)
    }

    pub fn enqueue(&self, item: MediaItem) -> Result<(), SessionError> {
        self.send(Command::Enqueue(item))
    }

    pub fn advance(&self) -> Result<(), SessionError> {
        self.send(Command::Advance)
    }

    pub fn play_if_idle(&self) -> Result<(), SessionError> {
        self.send(Command::PlayIfIdle)
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.send(Command::Resume)
    }

    pub fn play_pause(&self) -> Result<(), SessionError> {
        self.send(Command::PlayPause)
    }

    pub fn skip(&self) -> Result<(), SessionError> {
        self.send(Command::Skip)
    }

    pub fn toggle_loop(&self) -> Result<(), SessionError> {
        self.send(Command::ToggleLoop)
    }

    /// Idempotente
    pub fn stop(&self) {
        if self.send(Command::Stop).is_err() {
            debug!("Sesión {} ya estaba detenida", self.id);
        }
    }

    pub fn connection_lost(&self) {
        if self.send(Command::ConnectionLost).is_err() {
            debug!("Sesión {} ya estaba detenida", self.id);
        }
    }

    /// Traduce un botón a su operación
    pub fn control(&self, event: ControlEvent) -> Result<(), SessionError> {
        match event {
            ControlEvent::PlayPause => self.play_pause(),
            ControlEvent::Skip => self.skip(),
            ControlEvent::ToggleLoop => self.toggle_loop(),
            ControlEvent::Stop => {
                self.stop();
                Ok(())
            }
        }
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        response.await.map_err(|_| SessionError::Closed)
    }
}

struct PendingRetry {
    attempt: u64,
    cancel: CancellationToken,
}

pub struct PlaybackSession<T: AudioTransport, S: ControlSurface> {
    id: u64,
    guild_id: GuildId,
    queue: SongQueue,
    state: TransportState,
    transport: T,
    surface: S,
    mailbox: mpsc::UnboundedSender<Command>,
    slots: SessionSlots,
    retry_delay: Duration,
    active_stream: Option<StreamId>,
    next_stream: u64,
    pending_retry: Option<PendingRetry>,
    next_attempt: u64,
    // Se muestra junto al próximo estado para que no lo pise.
    notice: Option<String>,
}

impl<T: AudioTransport, S: ControlSurface> PlaybackSession<T, S> {
    pub fn new(
        handle: &SessionHandle,
        transport: T,
        surface: S,
        retry_delay: Duration,
        slots: SessionSlots,
    ) -> Self {
        Self {
            id: handle.id,
            guild_id: handle.guild_id,
            queue: SongQueue::new(),
            state: TransportState::Idle,
            transport,
            surface,
            mailbox: handle.tx.clone(),
            slots,
            retry_delay,
            active_stream: None,
            next_stream: 0,
            pending_retry: None,
            next_attempt: 0,
            notice: None,
        }
    }

    /// Lanza la sesión en su propia tarea
    pub fn spawn(self, mailbox: mpsc::UnboundedReceiver<Command>) -> JoinHandle<()> {
        tokio::spawn(self.run(mailbox))
    }

    pub async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<Command>) {
        info!("🎶 Sesión {} iniciada en guild {}", self.id, self.guild_id);

        while let Some(command) = mailbox.recv().await {
            if self.handle(command).await.is_break() {
                break;
            }
        }

        info!("👋 Sesión {} finalizada en guild {}", self.id, self.guild_id);
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Enqueue(item) => self.enqueue(item).await,
            Command::Advance => self.advance().await,
            Command::PlayIfIdle => {
                if self.state == TransportState::Idle && !self.queue.is_empty() {
                    self.advance().await;
                }
            }
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::PlayPause => match self.state {
                TransportState::Paused => self.resume().await,
                TransportState::Playing => self.pause().await,
                _ => debug!("Nada que pausar en guild {}", self.guild_id),
            },
            Command::Skip => self.skip().await,
            Command::ToggleLoop => self.toggle_loop().await,
            Command::TrackEnded { stream, error } => self.on_track_end(stream, error).await,
            Command::RetryStart { attempt } => self.retry_start(attempt).await,
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot().await);
            }
            Command::Stop => {
                self.terminate().await;
                return ControlFlow::Break(());
            }
            Command::ConnectionLost => {
                warn!("🔌 Conexión de voz perdida en guild {}", self.guild_id);
                self.surface.post_status(status::CONNECTION_LOST).await;
                self.terminate().await;
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    async fn enqueue(&mut self, item: MediaItem) {
        self.queue.push(item);

        if let Some(current) = self.queue.current() {
            let text = status::now_playing(current.display_name(), self.queue.len());
            self.surface.post_status(&text).await;
        }
    }

    /// Único punto de avance al siguiente track
    async fn advance(&mut self) {
        self.cancel_retry();

        if self.queue.advance().is_some() {
            self.state = TransportState::Playing;
            self.start_current().await;
        } else {
            self.state = TransportState::Idle;
            self.surface.update_indicator(Indicator::Playing, false).await;
            let text = status::with_notice(self.notice.take().as_deref(), status::QUEUE_FINISHED);
            self.surface.post_status(&text).await;
        }
    }

    /// Arranca el item cargado; si falla, programa un reintento
    async fn start_current(&mut self) {
        self.cancel_retry();

        let Some(item) = self.queue.current().cloned() else {
            return;
        };

        if !self.transport.is_connected().await {
            // Routed through the mailbox so teardown runs on the normal path.
            let _ = self.mailbox.send(Command::ConnectionLost);
            return;
        }

        info!("🎵 Reproduciendo: {}", item.display_name());
        self.surface.update_indicator(Indicator::Paused, false).await;
        self.surface.update_indicator(Indicator::Playing, true).await;
        let text = status::with_notice(
            self.notice.take().as_deref(),
            &status::now_playing(item.display_name(), self.queue.len()),
        );
        self.surface.post_status(&text).await;

        if let Err(e) = self.open_and_play(&item).await {
            warn!(
                "⚠️ No se pudo iniciar {} ({}), reintentando en {:?}",
                item.display_name(),
                e,
                self.retry_delay
            );
            self.schedule_retry();
        }
    }

    async fn open_and_play(&mut self, item: &MediaItem) -> Result<(), TransportError> {
        let stream = self.transport.open_source(item.source_locator()).await?;
        self.play_source(stream).await
    }

    async fn play_source(&mut self, stream: T::Stream) -> Result<(), TransportError> {
        // At most one stream per voice connection.
        self.transport.stop().await;

        let id = StreamId(self.next_stream);
        self.next_stream += 1;
        self.active_stream = Some(id);

        let notifier = TrackEndNotifier::new(id, self.mailbox.clone());
        match self.transport.play(stream, notifier).await {
            Ok(()) => {
                debug!("Stream {} iniciado en guild {}", id, self.guild_id);
                Ok(())
            }
            Err(e) => {
                self.active_stream = None;
                Err(e)
            }
        }
    }

    fn schedule_retry(&mut self) {
        let attempt = self.next_attempt;
        self.next_attempt += 1;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mailbox = self.mailbox.clone();
        let delay = self.retry_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = mailbox.send(Command::RetryStart { attempt });
                }
            }
        });

        self.pending_retry = Some(PendingRetry { attempt, cancel });
    }

    fn cancel_retry(&mut self) {
        if let Some(pending) = self.pending_retry.take() {
            debug!("Reintento {} cancelado", pending.attempt);
            pending.cancel.cancel();
        }
    }

    async fn retry_start(&mut self, attempt: u64) {
        match &self.pending_retry {
            Some(pending) if pending.attempt == attempt => self.pending_retry = None,
            _ => {
                debug!("Reintento {} obsoleto, ignorado", attempt);
                return;
            }
        }

        let Some(item) = self.queue.current().cloned() else {
            return;
        };

        match self.open_and_play(&item).await {
            Ok(()) => info!("✅ Reintento exitoso para: {}", item.display_name()),
            Err(e) => {
                error!("❌ Reintento fallido para {}: {}", item.display_name(), e);
                self.notice = Some(status::could_not_play(item.display_name()));
                self.advance().await;
            }
        }
    }

    /// Fin de stream, ya recibido por el buzón
    async fn on_track_end(&mut self, stream: StreamId, error: Option<String>) {
        if self.active_stream != Some(stream) {
            debug!("Fin de stream {} obsoleto, ignorado", stream);
            return;
        }
        self.active_stream = None;

        if let Some(e) = error {
            warn!("⚠️ Stream {} terminó con error: {}", stream, e);
        }

        if self.queue.is_looping() && self.queue.current().is_some() {
            self.state = TransportState::Playing;
            self.start_current().await;
        } else {
            self.advance().await;
        }
    }

    async fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }

        match self.transport.pause().await {
            Ok(()) => {
                self.state = TransportState::Paused;
                info!("⏸️ Reproducción pausada");
                self.surface.update_indicator(Indicator::Playing, false).await;
                self.surface.update_indicator(Indicator::Paused, true).await;
            }
            Err(e) => warn!("No se pudo pausar: {}", e),
        }
    }

    async fn resume(&mut self) {
        if self.state != TransportState::Paused {
            return;
        }

        match self.transport.resume().await {
            Ok(()) => {
                self.state = TransportState::Playing;
                info!("▶️ Reproducción reanudada");
                self.surface.update_indicator(Indicator::Paused, false).await;
                self.surface.update_indicator(Indicator::Playing, true).await;
            }
            Err(e) => warn!("No se pudo reanudar: {}", e),
        }
    }

    /// Detiene el stream; su fin decide qué sigue
    async fn skip(&mut self) {
        if self.active_stream.is_some() {
            info!("⏭️ Saltando canción en guild {}", self.guild_id);
            self.transport.stop().await;
        } else if self.pending_retry.is_some() {
            info!("⏭️ Saltando canción con reintento pendiente");
            self.cancel_retry();
            self.advance().await;
        } else {
            debug!("Nada que saltar en guild {}", self.guild_id);
        }
    }

    async fn toggle_loop(&mut self) {
        let looping = self.queue.toggle_loop();
        self.surface.update_indicator(Indicator::Looping, looping).await;
    }

    async fn terminate(&mut self) {
        self.cancel_retry();
        self.notice = None;
        self.queue.clear();
        self.state = TransportState::Stopped;
        self.active_stream = None;

        self.transport.stop().await;
        self.transport.disconnect().await;
        self.surface.clear().await;

        self.slots
            .remove_if(&self.guild_id, |_, handle| handle.id() == self.id);

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
    }

    async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current: self.queue.current().cloned(),
            queue: self.queue.items().cloned().collect(),
            looping: self.queue.is_looping(),
            state: self.state,
            connected: self.transport.is_connected().await,
            streaming: self.transport.is_playing().await,
            paused: self.transport.is_paused().await,
        }
    }
}
