//! Error types for the playback core and the job client.
//!
//! Nothing in here is fatal to the process. Load failures are recovered at
//! the session boundary and contract violations (transport before every
//! stem is ready, seeking a follower) come back as values the caller may
//! ignore.

use crate::stems::Stem;
use thiserror::Error;

/// Why a single stem could not be acquired or decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("stem unreachable: {0}")]
    Unreachable(String),

    #[error("server answered HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("stem is not decodable: {0}")]
    Undecodable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("audio output unavailable: {0}")]
    Output(String),

    /// A newer session started before this load finished.
    #[error("load superseded by a newer session")]
    Superseded,
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                LoadError::Unreachable(e.to_string())
            }
            _ => LoadError::Io(e.to_string()),
        }
    }
}

/// Contract violations and lookup failures on the player surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// Transport or seek issued before the tracks involved are ready.
    #[error("transport is not available until all stems are ready")]
    TransportOnUnready,

    /// Direct user seek on a follower; only the master track is interactive.
    #[error("{0} does not accept seek interaction")]
    InteractionDisabled(Stem),

    #[error("seek fraction must be within 0.0..=1.0, got {0}")]
    InvalidFraction(f64),

    #[error("no playback session is active")]
    NoSession,

    #[error("invalid stem set: {0}")]
    InvalidStemSet(String),

    #[error("audio output error: {0}")]
    Output(String),
}

/// Failures talking to the separation backend.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("{}", friendly_network_error(.0))]
    Network(#[from] reqwest::Error),

    #[error("separation job failed with status {0}")]
    Status(u16),

    #[error("separation job rejected: {0}")]
    Rejected(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error(transparent)]
    StemSet(#[from] PlayerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn friendly_network_error(e: &reqwest::Error) -> String {
    if e.is_builder() {
        if let Some(url) = e.url() {
            return format!("Invalid URL: {url}");
        }
        return "Invalid URL".to_string();
    }
    if e.is_connect() {
        if let Some(url) = e.url() {
            return format!("Could not connect to {}", url.host_str().unwrap_or("server"));
        }
        return "Could not connect to server".to_string();
    }
    if e.is_decode() {
        return "Invalid response from server".to_string();
    }
    format!("Network error: {e}")
}
