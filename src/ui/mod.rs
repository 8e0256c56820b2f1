//! # UI Module
//!
//! Control surface for a playback session: one status message per session,
//! four buttons under it, and reaction glyphs used as indicators.
//!
//! The session never renders anything itself. It calls the
//! [`ControlSurface`] trait, implemented for Discord by
//! [`discord::StatusMessage`].

use async_trait::async_trait;

pub mod buttons;
pub mod discord;
pub mod status;

/// Indicadores mostrados como reacciones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Playing,
    Paused,
    Looping,
}

impl Indicator {
    pub fn glyph(&self) -> &'static str {
        match self {
            Indicator::Playing => "▶",
            Indicator::Paused => "⏸",
            Indicator::Looping => "🔁",
        }
    }
}

/// Superficie de control de una sesión; los errores se registran, no se propagan
#[async_trait]
pub trait ControlSurface: Send + Sync + 'static {
    async fn post_status(&self, text: &str);

    async fn update_indicator(&self, indicator: Indicator, on: bool);

    /// Quita indicadores y controles al terminar la sesión
    async fn clear(&self);
}
