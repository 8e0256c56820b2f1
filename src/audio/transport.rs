//! Frontera con el transporte de audio externo.
//!
//! The transport runs on its own execution context (songbird's driver
//! threads). Its only way back into a session is the [`TrackEndNotifier`],
//! which posts a message onto the session's mailbox instead of touching
//! session state.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::{audio::session::Command, error::TransportError};

/// Identidad de un stream iniciado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opciones fijas del encoder
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    pub reconnect: bool,
    pub reconnect_delay_max: Duration,
    pub audio_only: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            reconnect_delay_max: Duration::from_secs(5),
            audio_only: true,
        }
    }
}

/// Avisa a la sesión cuando termina un stream
#[derive(Debug, Clone)]
pub struct TrackEndNotifier {
    stream: StreamId,
    mailbox: UnboundedSender<Command>,
}

impl TrackEndNotifier {
    pub(crate) fn new(stream: StreamId, mailbox: UnboundedSender<Command>) -> Self {
        Self { stream, mailbox }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Envía el fin del stream al buzón; se puede llamar más de una vez
    pub fn notify(&self, error: Option<String>) {
        let sent = self.mailbox.send(Command::TrackEnded {
            stream: self.stream,
            error,
        });
        if sent.is_err() {
            debug!("Sesión cerrada, fin de stream {} descartado", self.stream);
        }
    }
}

/// Salida de voz de una sesión
#[async_trait]
pub trait AudioTransport: Send + Sync + 'static {
    /// Fuente abierta, aún sin reproducir
    type Stream: Send + 'static;

    /// Abre `locator` con el encoder externo
    async fn open_source(&self, locator: &str) -> Result<Self::Stream, TransportError>;

    /// Reproduce `stream`; `on_end` se dispara al terminar
    async fn play(
        &self,
        stream: Self::Stream,
        on_end: TrackEndNotifier,
    ) -> Result<(), TransportError>;

    /// Detiene lo que suena
    async fn stop(&self);

    async fn pause(&self) -> Result<(), TransportError>;

    async fn resume(&self) -> Result<(), TransportError>;

    async fn is_playing(&self) -> bool;

    async fn is_paused(&self) -> bool;

    async fn is_connected(&self) -> bool;

    /// Libera la conexión de voz
    async fn disconnect(&self);
}
