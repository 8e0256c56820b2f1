pub mod attachment;
pub mod youtube;

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::{audio::queue::MediaItem, error::ResolutionError};

pub use attachment::AttachmentRef;
pub use youtube::YtDlpResolver;

static VIDEO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/)[\w\-]{11}")
        .expect("video link pattern is valid")
});

/// Enlace de video ya resuelto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub title: String,
    pub playable_locator: String,
}

/// Resuelve un enlace de video a una URL de stream
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ResolutionError>;
}

/// Enlaces de video en orden de aparición
pub fn video_links(text: &str) -> Vec<&str> {
    VIDEO_LINK.find_iter(text).map(|m| m.as_str()).collect()
}

/// Extrae los items de un mensaje: enlaces primero, luego adjuntos
pub async fn collect_media<R>(
    text: &str,
    attachments: &[AttachmentRef],
    resolver: &R,
) -> Vec<MediaItem>
where
    R: MediaResolver + ?Sized,
{
    let mut items = Vec::new();

    for link in video_links(text) {
        match resolver.resolve(link).await {
            Ok(media) => {
                debug!("🔗 Enlace resuelto: {} -> {}", link, media.title);
                items.push(MediaItem::new(media.title, media.playable_locator));
            }
            Err(e) => warn!("⚠️ No se pudo resolver {}: {}", link, e),
        }
    }

    for attachment in attachments.iter().filter(|a| a.is_audio_mpeg()) {
        match attachment.to_item() {
            Ok(item) => items.push(item),
            Err(e) => warn!("⚠️ Adjunto ignorado {}: {}", attachment.filename, e),
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn mp3(name: &str) -> AttachmentRef {
        AttachmentRef {
            filename: name.to_string(),
            url: format!("https://cdn.discordapp.com/attachments/1/2/{name}"),
            content_type: Some("audio/mpeg".to_string()),
        }
    }

    #[test]
    fn test_video_links_in_text_order() {
        let text = "first https://youtu.be/aaaaaaaaaaa then \
                    www.youtube.com/watch?v=bbbbbbbbbbb and https://example.com/x";

        assert_eq!(
            video_links(text),
            vec![
                "https://youtu.be/aaaaaaaaaaa",
                "www.youtube.com/watch?v=bbbbbbbbbbb"
            ]
        );
    }

    #[test]
    fn test_short_ids_are_not_links() {
        assert!(video_links("https://youtu.be/short").is_empty());
        assert!(video_links("https://vimeo.com/123456789").is_empty());
    }

    #[tokio::test]
    async fn test_collects_links_then_attachments() {
        let mut resolver = MockMediaResolver::new();
        resolver
            .expect_resolve()
            .with(eq("https://youtu.be/aaaaaaaaaaa"))
            .times(1)
            .returning(|_| {
                Ok(ResolvedMedia {
                    title: "Song A".to_string(),
                    playable_locator: "https://stream.example/a".to_string(),
                })
            });

        let items = collect_media(
            "play https://youtu.be/aaaaaaaaaaa",
            &[mp3("b.mp3")],
            &resolver,
        )
        .await;

        assert_eq!(
            items,
            vec![
                MediaItem::new("Song A", "https://stream.example/a"),
                MediaItem::new(
                    "b.mp3",
                    "https://cdn.discordapp.com/attachments/1/2/b.mp3"
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_link_does_not_drop_siblings() {
        let mut resolver = MockMediaResolver::new();
        resolver
            .expect_resolve()
            .with(eq("https://youtu.be/privateaaaa"))
            .returning(|url| Err(ResolutionError::Restricted(url.to_string())));
        resolver
            .expect_resolve()
            .with(eq("https://youtu.be/bbbbbbbbbbb"))
            .returning(|_| {
                Ok(ResolvedMedia {
                    title: "Song B".to_string(),
                    playable_locator: "https://stream.example/b".to_string(),
                })
            });

        let items = collect_media(
            "https://youtu.be/privateaaaa https://youtu.be/bbbbbbbbbbb",
            &[],
            &resolver,
        )
        .await;

        assert_eq!(
            items,
            vec![MediaItem::new("Song B", "https://stream.example/b")]
        );
    }

    #[tokio::test]
    async fn test_non_mpeg_attachments_are_ignored() {
        let resolver = MockMediaResolver::new();
        let image = AttachmentRef {
            filename: "cover.png".to_string(),
            url: "https://cdn.discordapp.com/attachments/1/2/cover.png".to_string(),
            content_type: Some("image/png".to_string()),
        };

        let items = collect_media("no links here", &[image], &resolver).await;

        assert!(items.is_empty());
    }
}
