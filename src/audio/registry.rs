use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        queue::MediaItem,
        session::{PlaybackSession, SessionHandle},
        transport::AudioTransport,
    },
    error::SessionError,
    ui::{buttons::ControlEvent, ControlSurface},
};

/// Un slot por guild; cada sesión borra el suyo al detenerse
pub type SessionSlots = Arc<DashMap<GuildId, SessionHandle>>;

/// Origen de un item y canales de su sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
}

/// Crea la conexión de voz y el mensaje de estado de una sesión nueva
#[async_trait]
pub trait SessionConnector: Send + Sync + 'static {
    type Transport: AudioTransport;
    type Surface: ControlSurface;

    /// `session` recibe los eventos de voz del transporte
    async fn connect(
        &self,
        target: &RouteTarget,
        session: &SessionHandle,
    ) -> Result<(Self::Transport, Self::Surface), SessionError>;
}

pub struct SessionRegistry<C: SessionConnector> {
    connector: C,
    slots: SessionSlots,
    creation_locks: DashMap<GuildId, Arc<Mutex<()>>>,
    retry_delay: Duration,
}

impl<C: SessionConnector> SessionRegistry<C> {
    pub fn new(connector: C, retry_delay: Duration) -> Self {
        Self {
            connector,
            slots: Arc::new(DashMap::new()),
            creation_locks: DashMap::new(),
            retry_delay,
        }
    }

    /// Encola un item en la sesión del guild, creándola si no existe
    pub async fn route_item(&self, target: &RouteTarget, item: MediaItem) -> Result<(), SessionError> {
        let guild_id = target.guild_id;
        let lock = self.creation_locks.entry(guild_id).or_default().clone();
        let _creating = lock.lock().await;

        if let Some(handle) = self.live_session(guild_id).await {
            if handle.enqueue(item.clone()).is_ok() {
                return handle.play_if_idle();
            }
            debug!("Sesión {} cerró durante el enrutamiento", handle.id());
        }

        let handle = self.create_session(target).await?;
        handle.enqueue(item)?;
        handle.advance()
    }

    /// Hay sesión y su conexión de voz sigue viva
    pub async fn is_active(&self, guild_id: GuildId) -> bool {
        match self.session(guild_id) {
            Some(handle) => handle
                .snapshot()
                .await
                .map(|snapshot| snapshot.connected)
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn session(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.slots.get(&guild_id).map(|handle| handle.clone())
    }

    /// Reenvía un botón; `false` si el guild no tiene sesión
    pub fn dispatch(&self, guild_id: GuildId, event: ControlEvent) -> Result<bool, SessionError> {
        match self.session(guild_id) {
            Some(handle) => handle.control(event).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn connection_lost(&self, guild_id: GuildId) {
        if let Some(handle) = self.session(guild_id) {
            handle.connection_lost();
        }
    }

    /// Detiene todas las sesiones y espera su cierre
    pub async fn stop_all(&self) {
        let sessions: Vec<SessionHandle> =
            self.slots.iter().map(|entry| entry.value().clone()).collect();

        info!("⏹️ Deteniendo {} sesiones", sessions.len());
        for session in &sessions {
            session.stop();
        }
        for session in sessions {
            session.closed().await;
        }
    }

    async fn live_session(&self, guild_id: GuildId) -> Option<SessionHandle> {
        let handle = self.session(guild_id)?;

        if self.is_active(guild_id).await {
            return Some(handle);
        }

        warn!("♻️ Sesión {} sin conexión de voz, reemplazando", handle.id());
        self.slots
            .remove_if(&guild_id, |_, existing| existing.id() == handle.id());
        handle.stop();
        // The old session must release the voice call before a new one joins.
        handle.closed().await;
        None
    }

    async fn create_session(&self, target: &RouteTarget) -> Result<SessionHandle, SessionError> {
        let (handle, mailbox) = SessionHandle::channel(target.guild_id);
        let (transport, surface) = self.connector.connect(target, &handle).await?;

        PlaybackSession::new(&handle, transport, surface, self.retry_delay, self.slots.clone())
            .spawn(mailbox);
        self.slots.insert(target.guild_id, handle.clone());

        info!(
            "🆕 Sesión {} creada en guild {} (voz {})",
            handle.id(),
            target.guild_id,
            target.voice_channel
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        session::TransportState,
        testing::{wait_for, FakeTransport, RecordingSurface},
    };
    use parking_lot::Mutex as SyncMutex;
    use pretty_assertions::assert_eq;

    #[derive(Clone, Default)]
    struct FakeConnector {
        transports: Arc<SyncMutex<Vec<FakeTransport>>>,
        surfaces: Arc<SyncMutex<Vec<RecordingSurface>>>,
        refuse: Arc<SyncMutex<bool>>,
    }

    impl FakeConnector {
        fn connects(&self) -> usize {
            self.transports.lock().len()
        }

        fn transport(&self, index: usize) -> FakeTransport {
            self.transports.lock()[index].clone()
        }
    }

    #[async_trait]
    impl SessionConnector for FakeConnector {
        type Transport = FakeTransport;
        type Surface = RecordingSurface;

        async fn connect(
            &self,
            _target: &RouteTarget,
            _session: &SessionHandle,
        ) -> Result<(FakeTransport, RecordingSurface), SessionError> {
            if *self.refuse.lock() {
                return Err(SessionError::Connect("missing permissions".to_string()));
            }
            let transport = FakeTransport::new();
            let surface = RecordingSurface::new();
            self.transports.lock().push(transport.clone());
            self.surfaces.lock().push(surface.clone());
            Ok((transport, surface))
        }
    }

    fn target() -> RouteTarget {
        RouteTarget {
            guild_id: GuildId::new(7),
            voice_channel: ChannelId::new(70),
            text_channel: ChannelId::new(71),
        }
    }

    fn item(name: &str) -> MediaItem {
        MediaItem::new(name, format!("https://cdn.example/{name}.mp3"))
    }

    fn registry(connector: &FakeConnector) -> SessionRegistry<FakeConnector> {
        SessionRegistry::new(connector.clone(), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_first_item_creates_session_and_plays() {
        let connector = FakeConnector::default();
        let registry = registry(&connector);

        registry.route_item(&target(), item("SongA")).await.unwrap();
        registry.route_item(&target(), item("SongB")).await.unwrap();

        let handle = registry.session(target().guild_id).unwrap();
        let snapshot = wait_for(&handle, |s| s.streaming && s.queue.len() == 1).await;

        assert_eq!(connector.connects(), 1);
        assert_eq!(snapshot.current, Some(item("SongA")));
        assert_eq!(snapshot.queue, vec![item("SongB")]);
        assert!(registry.is_active(target().guild_id).await);
        assert_eq!(
            connector.surfaces.lock()[0].last_status().as_deref(),
            Some("**Now Playing:** SongA\n**Queue Size:** 1")
        );
    }

    #[tokio::test]
    async fn test_item_for_idle_session_restarts_playback() {
        let connector = FakeConnector::default();
        let registry = registry(&connector);

        registry.route_item(&target(), item("a")).await.unwrap();
        let handle = registry.session(target().guild_id).unwrap();
        wait_for(&handle, |s| s.streaming).await;
        connector.transport(0).finish_current();
        wait_for(&handle, |s| s.state == TransportState::Idle).await;

        registry.route_item(&target(), item("b")).await.unwrap();
        let snapshot = wait_for(&handle, |s| s.streaming).await;

        assert_eq!(snapshot.current, Some(item("b")));
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn test_stopped_session_is_replaced() {
        let connector = FakeConnector::default();
        let registry = registry(&connector);

        registry.route_item(&target(), item("a")).await.unwrap();
        let first = registry.session(target().guild_id).unwrap();
        assert!(registry.dispatch(target().guild_id, ControlEvent::Stop).unwrap());
        tokio::time::timeout(Duration::from_secs(2), first.closed())
            .await
            .unwrap();
        assert!(!registry.is_active(target().guild_id).await);

        registry.route_item(&target(), item("b")).await.unwrap();
        let second = registry.session(target().guild_id).unwrap();
        let snapshot = wait_for(&second, |s| s.streaming).await;

        assert_ne!(first.id(), second.id());
        assert_eq!(snapshot.current, Some(item("b")));
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_dead_voice_link_is_replaced() {
        let connector = FakeConnector::default();
        let registry = registry(&connector);

        registry.route_item(&target(), item("a")).await.unwrap();
        let first = registry.session(target().guild_id).unwrap();
        wait_for(&first, |s| s.streaming).await;
        connector.transport(0).drop_connection();

        assert!(!registry.is_active(target().guild_id).await);
        registry.route_item(&target(), item("b")).await.unwrap();

        let second = registry.session(target().guild_id).unwrap();
        assert_ne!(first.id(), second.id());
        assert!(first.is_closed());
        assert!(connector.transport(0).is_disconnected());
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_items_share_one_session() {
        let connector = FakeConnector::default();
        let registry = registry(&connector);

        let (target_a, target_b) = (target(), target());
        let (a, b) = tokio::join!(
            registry.route_item(&target_a, item("a")),
            registry.route_item(&target_b, item("b")),
        );
        a.unwrap();
        b.unwrap();

        let handle = registry.session(target().guild_id).unwrap();
        let snapshot = wait_for(&handle, |s| s.streaming && s.queue.len() == 1).await;

        assert_eq!(connector.connects(), 1);
        assert!(snapshot.current.is_some());
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_no_session() {
        let connector = FakeConnector::default();
        *connector.refuse.lock() = true;
        let registry = registry(&connector);

        let result = registry.route_item(&target(), item("a")).await;

        assert!(matches!(result, Err(SessionError::Connect(_))));
        assert!(registry.session(target().guild_id).is_none());
    }

    #[tokio::test]
    async fn test_stop_all_tears_down_every_guild() {
        let connector = FakeConnector::default();
        let registry = registry(&connector);
        let other = RouteTarget {
            guild_id: GuildId::new(8),
            ..target()
        };

        registry.route_item(&target(), item("a")).await.unwrap();
        registry.route_item(&other, item("b")).await.unwrap();
        registry.stop_all().await;

        assert!(registry.session(target().guild_id).is_none());
        assert!(registry.session(other.guild_id).is_none());
        assert!(connector.transport(0).is_disconnected());
        assert!(connector.transport(1).is_disconnected());
    }

    #[tokio::test]
    async fn test_dispatch_without_session() {
        let registry = registry(&FakeConnector::default());
        assert!(!registry
            .dispatch(target().guild_id, ControlEvent::Skip)
            .unwrap());
    }
}
