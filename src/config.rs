use anyhow::{Context, Result};
use std::time::Duration;

use crate::audio::transport::TransportOptions;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Reproducción
    pub start_retry_delay: Duration,
    pub reconnect_delay_max: Duration,

    // Herramientas externas
    pub ffmpeg_path: String,
    pub ytdlp_path: String,
    pub ytdlp_format: String,

    // Features
    pub delete_source_messages: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to
    /// [`Config::default`] for everything except the token.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let duration = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(value) => humantime::parse_duration(value.trim())
                    .with_context(|| format!("{} inválido: {:?}", key, value)),
                None => Ok(default),
            }
        };

        let config = Self {
            // Discord
            discord_token: lookup("DISCORD_TOKEN").context("DISCORD_TOKEN no está definido")?,

            // Reproducción
            start_retry_delay: duration("START_RETRY_DELAY", defaults.start_retry_delay)?,
            reconnect_delay_max: duration("RECONNECT_DELAY_MAX", defaults.reconnect_delay_max)?,

            // Herramientas externas
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ytdlp_path: lookup("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            ytdlp_format: lookup("YTDLP_FORMAT").unwrap_or(defaults.ytdlp_format),

            // Features
            delete_source_messages: match lookup("DELETE_SOURCE_MESSAGES") {
                Some(value) => value
                    .trim()
                    .parse()
                    .with_context(|| format!("DELETE_SOURCE_MESSAGES inválido: {:?}", value))?,
                None => defaults.delete_source_messages,
            },
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token must not be empty
    /// - The start retry delay must be greater than zero
    /// - The encoder reconnect bound must be at least one second
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token must not be empty");
        }

        if self.start_retry_delay.is_zero() {
            anyhow::bail!("Start retry delay must be greater than 0");
        }

        if self.reconnect_delay_max.as_secs() == 0 {
            anyhow::bail!(
                "Reconnect delay max must be at least 1s, got: {}",
                humantime::format_duration(self.reconnect_delay_max)
            );
        }

        if self.ytdlp_format.trim().is_empty() {
            anyhow::bail!("yt-dlp format selector must not be empty");
        }

        Ok(())
    }

    /// Encoder options derived from the configuration.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            reconnect_delay_max: self.reconnect_delay_max,
            ..TransportOptions::default()
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Never includes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Playback: retry after {}, reconnect up to {}\n  \
            Tools: ffmpeg={}, yt-dlp={} (format {})\n  \
            Features: delete source messages={}",
            humantime::format_duration(self.start_retry_delay),
            humantime::format_duration(self.reconnect_delay_max),
            self.ffmpeg_path,
            self.ytdlp_path,
            self.ytdlp_format,
            self.delete_source_messages
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),

            start_retry_delay: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(5),

            ffmpeg_path: "ffmpeg".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            ytdlp_format: "m4a/bestaudio/best".to_string(),

            delete_source_messages: true,
        }
    }
}
