use anyhow::Result;
use async_trait::async_trait;
use serenity::{
    all::{ChannelId, MessageId, ReactionType},
    builder::{CreateMessage, EditMessage},
    http::Http,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{buttons, status, ControlSurface, Indicator};

/// Mensaje de estado con botones, propiedad exclusiva de una sesión
pub struct StatusMessage {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
}

impl StatusMessage {
    /// Publica el mensaje de estado inicial con los botones
    pub async fn post(http: Arc<Http>, channel_id: ChannelId) -> Result<Self> {
        let message = channel_id
            .send_message(
                &http,
                CreateMessage::new()
                    .content(status::PLACEHOLDER)
                    .components(buttons::player_controls()),
            )
            .await?;

        debug!("📨 Mensaje de estado creado: {}", message.id);

        Ok(Self {
            http,
            channel_id,
            message_id: message.id,
        })
    }

    fn reaction(indicator: Indicator) -> ReactionType {
        ReactionType::Unicode(indicator.glyph().to_string())
    }
}

#[async_trait]
impl ControlSurface for StatusMessage {
    async fn post_status(&self, text: &str) {
        if let Err(e) = self
            .channel_id
            .edit_message(&self.http, self.message_id, EditMessage::new().content(text))
            .await
        {
            warn!("No se pudo actualizar el mensaje de estado: {:?}", e);
        }
    }

    async fn update_indicator(&self, indicator: Indicator, on: bool) {
        let reaction = Self::reaction(indicator);
        let result = if on {
            self.channel_id
                .create_reaction(&self.http, self.message_id, reaction)
                .await
        } else {
            self.channel_id
                .delete_reaction(&self.http, self.message_id, None, reaction)
                .await
        };

        if let Err(e) = result {
            warn!("No se pudo cambiar el indicador {:?}: {:?}", indicator, e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self
            .channel_id
            .delete_reactions(&self.http, self.message_id)
            .await
        {
            warn!("No se pudieron limpiar las reacciones: {:?}", e);
        }

        if let Err(e) = self
            .channel_id
            .edit_message(
                &self.http,
                self.message_id,
                EditMessage::new().components(Vec::new()),
            )
            .await
        {
            warn!("No se pudieron quitar los controles: {:?}", e);
        }
    }
}
