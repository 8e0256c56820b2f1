use thiserror::Error;

/// Un enlace o adjunto no se pudo resolver
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("unsupported media reference: {0}")]
    Unsupported(String),

    #[error("resolver tool failed: {0}")]
    Tool(String),

    #[error("could not parse resolver output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("media is private or restricted: {0}")]
    Restricted(String),
}

/// El transporte no pudo abrir o iniciar un stream
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("could not open source: {0}")]
    Open(String),

    #[error("stream did not start: {0}")]
    Start(String),

    #[error("voice connection is not live")]
    NotConnected,

    #[error("track control failed: {0}")]
    Control(String),
}

/// Errores de una sesión de reproducción
#[derive(Debug, Error)]
pub enum SessionError {
    /// La sesión ya se detuvo
    #[error("playback session is closed")]
    Closed,

    #[error("could not establish voice session: {0}")]
    Connect(String),
}
