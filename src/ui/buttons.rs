use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

/// IDs personalizados para los botones
pub mod button_ids {
    pub const PLAY_PAUSE: &str = "jukebox_play_pause";
    pub const STOP: &str = "jukebox_stop";
    pub const SKIP: &str = "jukebox_skip";
    pub const LOOP: &str = "jukebox_loop";
}

/// Acción de usuario sobre la sesión activa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    PlayPause,
    Stop,
    Skip,
    ToggleLoop,
}

impl ControlEvent {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            button_ids::PLAY_PAUSE => Some(Self::PlayPause),
            button_ids::STOP => Some(Self::Stop),
            button_ids::SKIP => Some(Self::Skip),
            button_ids::LOOP => Some(Self::ToggleLoop),
            _ => None,
        }
    }

    pub fn custom_id(&self) -> &'static str {
        match self {
            Self::PlayPause => button_ids::PLAY_PAUSE,
            Self::Stop => button_ids::STOP,
            Self::Skip => button_ids::SKIP,
            Self::ToggleLoop => button_ids::LOOP,
        }
    }

    fn emoji(&self) -> char {
        match self {
            Self::PlayPause => '⏯',
            Self::Stop => '⏹',
            Self::Skip => '⏩',
            Self::ToggleLoop => '🔁',
        }
    }
}

/// Crea la fila de controles del reproductor
pub fn player_controls() -> Vec<CreateActionRow> {
    let buttons = [
        ControlEvent::PlayPause,
        ControlEvent::Stop,
        ControlEvent::Skip,
        ControlEvent::ToggleLoop,
    ]
    .iter()
    .map(|event| {
        CreateButton::new(event.custom_id())
            .emoji(event.emoji())
            .style(ButtonStyle::Secondary)
    })
    .collect();

    vec![CreateActionRow::Buttons(buttons)]
}
