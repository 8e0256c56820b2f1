use serenity::{async_trait, model::id::GuildId};
use songbird::{
    events::CoreEvent, Call, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
};
use tracing::{info, warn};

use crate::audio::session::SessionHandle;

/// Handler para desconexiones del driver de voz
pub struct VoiceDisconnectHandler {
    pub guild_id: GuildId,
    pub session: SessionHandle,
}

#[async_trait]
impl VoiceEventHandler for VoiceDisconnectHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::DriverDisconnect(data) = ctx {
            warn!(
                "🔌 Driver de voz desconectado en guild {}: {:?}",
                self.guild_id, data.reason
            );
            self.session.connection_lost();
        }

        None
    }
}

/// Handler para reconexiones del driver
pub struct ReconnectHandler {
    pub guild_id: GuildId,
}

#[async_trait]
impl VoiceEventHandler for ReconnectHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        info!("🔄 Driver de voz reconectado en guild {}", self.guild_id);
        None
    }
}

/// Registra los event handlers de voz de una sesión
pub fn register_voice_events(handler: &mut Call, guild_id: GuildId, session: SessionHandle) {
    handler.add_global_event(
        VoiceEvent::Core(CoreEvent::DriverDisconnect),
        VoiceDisconnectHandler { guild_id, session },
    );

    handler.add_global_event(
        VoiceEvent::Core(CoreEvent::DriverReconnect),
        ReconnectHandler { guild_id },
    );
}
