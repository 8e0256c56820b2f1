//! # Audio Module
//!
//! Per-guild playback coordination for the jukebox.
//!
//! ## Architecture
//!
//! ### [`session`] - Playback Session
//! - One actor task per guild, driven by a command mailbox
//! - Owns the queue, the transport and the control surface
//! - Auto-advances on completion, retries a failed start once
//!
//! ### [`queue`] - Queue Management
//! - FIFO of pending items plus the current one
//! - Loop flag replays the current item instead of advancing
//!
//! ### [`registry`] - Session Registry
//! - At most one live session per guild
//! - Creates sessions on first arrival, replaces dead ones
//!
//! ### [`transport`] / [`player`] - Audio Output
//! - `AudioTransport` seam used by sessions
//! - `SongbirdPlayer` implements it on a songbird call with ffmpeg inputs

pub mod player;
pub mod queue;
pub mod registry;
pub mod session;
pub mod transport;

#[cfg(test)]
pub mod testing;
