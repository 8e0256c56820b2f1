//! In-memory transport and control surface for session tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    audio::{
        session::{SessionHandle, SessionSnapshot},
        transport::{AudioTransport, TrackEndNotifier},
    },
    error::TransportError,
    ui::{ControlSurface, Indicator},
};

#[derive(Default)]
struct FakeState {
    connected: bool,
    disconnected: bool,
    attempts: Vec<String>,
    started: Vec<String>,
    active: Option<TrackEndNotifier>,
    paused: bool,
    fail_starts: usize,
    overlapping_starts: usize,
    pause_calls: usize,
}

/// Transporte en memoria; `stop` dispara el fin del stream como songbird
#[derive(Clone)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                connected: true,
                ..Default::default()
            })),
        }
    }

    /// Rechaza las próximas `count` llamadas a `play`
    pub fn fail_next_starts(&self, count: usize) {
        self.state.lock().fail_starts = count;
    }

    pub fn drop_connection(&self) {
        self.state.lock().connected = false;
    }

    /// Fin natural del stream activo
    pub fn finish_current(&self) {
        let ended = self.state.lock().active.take();
        if let Some(notifier) = ended {
            notifier.notify(None);
        }
    }

    /// Reporta el mismo fin dos veces
    pub fn finish_current_twice(&self) {
        let ended = self.state.lock().active.take();
        if let Some(notifier) = ended {
            notifier.notify(None);
            notifier.notify(Some("late duplicate".to_string()));
        }
    }

    /// Todos los locators pasados a `play`, incluso rechazados
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().attempts.clone()
    }

    /// Locators que sí arrancaron
    pub fn started(&self) -> Vec<String> {
        self.state.lock().started.clone()
    }

    /// Arranques con otro stream aún activo
    pub fn overlapping_starts(&self) -> usize {
        self.state.lock().overlapping_starts
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().pause_calls
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.lock().disconnected
    }
}

#[async_trait]
impl AudioTransport for FakeTransport {
    type Stream = String;

    async fn open_source(&self, locator: &str) -> Result<String, TransportError> {
        Ok(locator.to_string())
    }

    async fn play(&self, stream: String, on_end: TrackEndNotifier) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.attempts.push(stream.clone());

        if state.fail_starts > 0 {
            state.fail_starts -= 1;
            return Err(TransportError::Start("codec unavailable".to_string()));
        }

        if state.active.is_some() {
            state.overlapping_starts += 1;
        }
        state.started.push(stream);
        state.active = Some(on_end);
        state.paused = false;
        Ok(())
    }

    async fn stop(&self) {
        let ended = {
            let mut state = self.state.lock();
            state.paused = false;
            state.active.take()
        };
        if let Some(notifier) = ended {
            notifier.notify(None);
        }
    }

    async fn pause(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.pause_calls += 1;
        if state.active.is_none() {
            return Err(TransportError::Control("nothing playing".to_string()));
        }
        state.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.active.is_none() {
            return Err(TransportError::Control("nothing playing".to_string()));
        }
        state.paused = false;
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.active.is_some() && !state.paused
    }

    async fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    async fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn disconnect(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.disconnected = true;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Status(String),
    Indicator(Indicator, bool),
    Clear,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    /// Estado final de un indicador
    pub fn indicator(&self, indicator: Indicator) -> bool {
        let mut shown = HashMap::new();
        for call in self.calls.lock().iter() {
            match call {
                SurfaceCall::Indicator(which, on) => {
                    shown.insert(*which, *on);
                }
                SurfaceCall::Clear => shown.clear(),
                SurfaceCall::Status(_) => {}
            }
        }
        shown.get(&indicator).copied().unwrap_or(false)
    }

    pub fn cleared(&self) -> bool {
        self.calls.lock().contains(&SurfaceCall::Clear)
    }
}

#[async_trait]
impl ControlSurface for RecordingSurface {
    async fn post_status(&self, text: &str) {
        self.calls.lock().push(SurfaceCall::Status(text.to_string()));
    }

    async fn update_indicator(&self, indicator: Indicator, on: bool) {
        self.calls.lock().push(SurfaceCall::Indicator(indicator, on));
    }

    async fn clear(&self) {
        self.calls.lock().push(SurfaceCall::Clear);
    }
}

/// Espera hasta que `ready` se cumpla (máximo dos segundos)
pub async fn wait_for<F>(handle: &SessionHandle, ready: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let polling = async {
        loop {
            let snapshot = handle.snapshot().await.expect("session closed while waiting");
            if ready(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(2), polling)
        .await
        .expect("timed out waiting for session state")
}
