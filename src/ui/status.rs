/// Texto inicial del mensaje de estado
pub const PLACEHOLDER: &str = "Now Playing...";

pub const QUEUE_FINISHED: &str = "**Queue finished.**";

pub const CONNECTION_LOST: &str = "**Voice connection lost.**";

pub fn now_playing(name: &str, queue_len: usize) -> String {
    format!("**Now Playing:** {name}\n**Queue Size:** {queue_len}")
}

pub fn could_not_play(name: &str) -> String {
    format!("**Could not play:** {name}")
}

/// Antepone un aviso pendiente al siguiente estado
pub fn with_notice(notice: Option<&str>, text: &str) -> String {
    match notice {
        Some(notice) => format!("{notice}\n{text}"),
        None => text.to_string(),
    }
}
