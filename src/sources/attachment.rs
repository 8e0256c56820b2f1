use serenity::model::channel::Attachment;
use url::Url;

use crate::{audio::queue::MediaItem, error::ResolutionError};

const AUDIO_MPEG: &str = "audio/mpeg";

/// Datos de un adjunto del mensaje
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
    pub url: String,
    pub content_type: Option<String>,
}

impl AttachmentRef {
    pub fn is_audio_mpeg(&self) -> bool {
        self.content_type.as_deref() == Some(AUDIO_MPEG)
    }

    /// Convierte el adjunto en item reproducible
    pub fn to_item(&self) -> Result<MediaItem, ResolutionError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ResolutionError::Unsupported(format!("{}: {}", self.url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResolutionError::Unsupported(self.url.clone()));
        }

        Ok(MediaItem::new(self.filename.clone(), url.to_string()))
    }
}

impl From<&Attachment> for AttachmentRef {
    fn from(attachment: &Attachment) -> Self {
        Self {
            filename: attachment.filename.clone(),
            url: attachment.url.clone(),
            content_type: attachment.content_type.clone(),
        }
    }
}
