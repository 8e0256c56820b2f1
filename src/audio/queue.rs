use std::collections::VecDeque;
use tracing::info;

/// Referencia reproducible ya resuelta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    display_name: String,
    source_locator: String,
}

impl MediaItem {
    pub fn new(display_name: impl Into<String>, source_locator: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            source_locator: source_locator.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }
}

/// Cola FIFO más el item cargado actualmente
#[derive(Debug, Default)]
pub struct SongQueue {
    items: VecDeque<MediaItem>,
    current: Option<MediaItem>,
    looping: bool,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un item al final de la cola
    pub fn push(&mut self, item: MediaItem) {
        info!("➕ Agregado a la cola: {}", item.display_name());
        self.items.push_back(item);
    }

    /// Pasa el primer item a `current`; `None` si la cola está vacía
    pub fn advance(&mut self) -> Option<&MediaItem> {
        self.current = self.items.pop_front();
        match &self.current {
            Some(item) => info!("➡️ Siguiente en cola: {}", item.display_name()),
            None => info!("📭 Cola vacía, no hay siguiente canción"),
        }
        self.current.as_ref()
    }

    /// Vacía la cola y desactiva el loop
    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
        self.looping = false;
        info!("🗑️ Cola limpiada");
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        if self.looping {
            info!("🔂 Repetir canción activado");
        } else {
            info!("➡️ Repetición desactivada");
        }
        self.looping
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.current.as_ref()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }
}
