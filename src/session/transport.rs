//! The single play/pause switch shared by every track.
//!
//! Calls to the individual tracks go out back to back in stem order. That is
//! best-effort alignment: each decoder keeps its own clock, so the start is
//! not sample-accurate across tracks.

use super::track::TrackHandle;
use crate::error::PlayerError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Disabled,
    Paused,
    Playing,
}

#[derive(Debug, Clone)]
pub struct TransportController {
    state: TransportState,
}

impl Default for TransportController {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportController {
    pub fn new() -> Self {
        Self {
            state: TransportState::Disabled,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != TransportState::Disabled
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Unlock the transport in the paused state. Never starts playback.
    pub fn enable(&mut self) {
        if self.state == TransportState::Disabled {
            self.state = TransportState::Paused;
        }
    }

    pub fn disable(&mut self) {
        self.state = TransportState::Disabled;
    }

    pub fn toggle(&mut self, tracks: &mut [TrackHandle]) -> Result<bool, PlayerError> {
        let target = !self.is_playing();
        self.set_playing(target, tracks)
    }

    /// Drive every ready track to `playing`. Tracks that never became ready
    /// (only possible under fail-open) are skipped.
    pub fn set_playing(&mut self, playing: bool, tracks: &mut [TrackHandle]) -> Result<bool, PlayerError> {
        if !self.is_enabled() {
            log::debug!("Transport request ignored: not all stems ready");
            return Err(PlayerError::TransportOnUnready);
        }

        for track in tracks.iter_mut().filter(|t| t.is_ready()) {
            if let Err(e) = track.set_playing(playing) {
                log::warn!("Transport on {} failed: {e}", track.stem());
            }
        }

        self.state = if playing {
            TransportState::Playing
        } else {
            TransportState::Paused
        };
        log::info!("Transport {}", if playing { "playing" } else { "paused" });
        Ok(playing)
    }
}
