use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{MediaResolver, ResolvedMedia};
use crate::error::ResolutionError;

/// Mensajes de yt-dlp para contenido restringido
const RESTRICTED_MARKERS: &[&str] = &[
    "Private video",
    "Sign in to confirm your age",
    "members-only",
    "not available in your country",
    "This video is unavailable",
];

/// Cliente de resolución con yt-dlp
pub struct YtDlpResolver {
    program: String,
    format: String,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    url: Option<String>,
    is_live: Option<bool>,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: format.into(),
        }
    }

    fn args<'a>(&'a self, url: &'a str) -> [&'a str; 6] {
        ["--dump-json", "--no-playlist", "-f", &self.format, "--no-warnings", url]
    }
}

fn classify_failure(stderr: &str) -> ResolutionError {
    let message = stderr.trim().to_string();
    if RESTRICTED_MARKERS.iter().any(|marker| message.contains(marker)) {
        ResolutionError::Restricted(message)
    } else {
        ResolutionError::Tool(message)
    }
}

fn parse_info(stdout: &str) -> Result<ResolvedMedia, ResolutionError> {
    let info: YtDlpInfo = serde_json::from_str(stdout.trim())?;

    if info.is_live.unwrap_or(false) {
        debug!("📡 Transmisión en vivo: {}", info.title);
    }

    match info.url {
        Some(url) if !url.is_empty() => Ok(ResolvedMedia {
            title: info.title,
            playable_locator: url,
        }),
        _ => Err(ResolutionError::Tool(format!(
            "yt-dlp no devolvió URL de stream para {}",
            info.title
        ))),
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ResolutionError> {
        debug!("📊 Obteniendo info de: {}", url);

        let output = Command::new(&self.program)
            .args(self.args(url))
            .output()
            .await
            .map_err(|e| ResolutionError::Tool(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        let media = parse_info(&String::from_utf8_lossy(&output.stdout))?;
        info!("🎵 Resuelto: {}", media.title);
        Ok(media)
    }
}
