use anyhow::Result;
use serenity::{
    all::{ChannelId, ComponentInteraction, Context, GuildId, Message, UserId},
    builder::CreateInteractionResponse,
};
use tracing::{debug, info, warn};

use super::JukeboxBot;
use crate::{
    audio::registry::RouteTarget,
    sources::{collect_media, video_links, AttachmentRef},
    ui::buttons::ControlEvent,
};

/// Encola enlaces de video y adjuntos MP3 de un mensaje
pub async fn handle_message(ctx: &Context, msg: &Message, bot: &JukeboxBot) -> Result<()> {
    if msg.author.id == ctx.cache.current_user().id {
        return Ok(());
    }

    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let attachments: Vec<AttachmentRef> = msg.attachments.iter().map(AttachmentRef::from).collect();
    if video_links(&msg.content).is_empty() && !attachments.iter().any(AttachmentRef::is_audio_mpeg) {
        return Ok(());
    }

    let Some(voice_channel) = author_voice_channel(ctx, guild_id, msg.author.id) else {
        debug!(
            "🔇 {} no está en un canal de voz en guild {}, mensaje ignorado",
            msg.author.name, guild_id
        );
        return Ok(());
    };

    let items = collect_media(&msg.content, &attachments, bot.resolver.as_ref()).await;
    if items.is_empty() {
        return Ok(());
    }

    let target = RouteTarget {
        guild_id,
        voice_channel,
        text_channel: msg.channel_id,
    };

    let mut queued = 0;
    for item in items {
        let name = item.display_name().to_string();
        match bot.registry.route_item(&target, item).await {
            Ok(()) => {
                info!("➕ {} añadido a la cola en guild {}", name, guild_id);
                queued += 1;
            }
            Err(e) => {
                warn!("⚠️ No se pudo encolar {} en guild {}: {}", name, guild_id, e);
                break;
            }
        }
    }

    if queued > 0 && bot.config.delete_source_messages {
        if let Err(e) = msg.delete(ctx).await {
            warn!("No se pudo borrar el mensaje original: {:?}", e);
        }
    }

    Ok(())
}

/// Maneja botones del mensaje de estado
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    component
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await?;

    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };

    let Some(event) = ControlEvent::from_custom_id(&component.data.custom_id) else {
        debug!("Componente desconocido: {}", component.data.custom_id);
        return Ok(());
    };

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    match bot.registry.dispatch(guild_id, event) {
        Ok(true) => {}
        Ok(false) => debug!("Sin sesión activa en guild {}, botón ignorado", guild_id),
        Err(e) => debug!("Sesión de guild {} no aceptó {:?}: {}", guild_id, event, e),
    }

    Ok(())
}

fn author_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}
