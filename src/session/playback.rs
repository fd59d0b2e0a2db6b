//! One playback attempt: the tracks for a single [`StemSet`], wired to the
//! readiness, transport and seek components, with one teardown path.

use super::events::{AudioOutput, LoadOutcome, MediaLoader, PlayerEvent, SessionNotice};
use super::readiness::{FailurePolicy, ReadinessAggregator};
use super::seek::SeekCoordinator;
use super::track::{SeekOrigin, TrackHandle};
use super::transport::TransportController;
use crate::constants::DEFAULT_VOLUME;
use crate::error::{LoadError, PlayerError};
use crate::stems::{Stem, StemSet};
use std::sync::mpsc::Sender;

/// Per-session knobs, usually derived from [`crate::config::Config`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub default_volume: f32,
    pub failure_policy: FailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            failure_policy: FailurePolicy::FailClosed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    AwaitingStems,
    Ready,
    /// Stems whose failure made the session unplayable.
    Failed(Vec<Stem>),
    TornDown,
}

pub struct PlaybackSession {
    generation: u64,
    stems: StemSet,
    tracks: Vec<TrackHandle>,
    readiness: ReadinessAggregator,
    transport: TransportController,
    seek: SeekCoordinator,
    status: SessionStatus,
}

impl PlaybackSession {
    /// Create a track per stem and issue every load, in stem order.
    pub fn start(
        generation: u64,
        stems: StemSet,
        config: SessionConfig,
        loader: &dyn MediaLoader,
        events: &Sender<PlayerEvent>,
    ) -> Self {
        let mut tracks: Vec<TrackHandle> = stems
            .iter()
            .map(|(stem, url)| TrackHandle::new(stem, url, config.default_volume))
            .collect();

        log::info!(
            "Starting session {generation} ({} stems, {})",
            tracks.len(),
            config.failure_policy
        );
        for track in &mut tracks {
            track.load(generation, loader, events);
        }

        Self {
            generation,
            stems,
            tracks,
            readiness: ReadinessAggregator::new(Stem::ALL, config.failure_policy),
            transport: TransportController::new(),
            seek: SeekCoordinator::new(Stem::MASTER),
            status: SessionStatus::AwaitingStems,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stems(&self) -> &StemSet {
        &self.stems
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn ready_count(&self) -> usize {
        self.readiness.ready_count()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn transport(&self) -> &TransportController {
        &self.transport
    }

    pub fn tracks(&self) -> &[TrackHandle] {
        &self.tracks
    }

    pub fn track(&self, stem: Stem) -> &TrackHandle {
        &self.tracks[stem.index()]
    }

    fn track_mut(&mut self, stem: Stem) -> &mut TrackHandle {
        &mut self.tracks[stem.index()]
    }

    /// Apply a load completion. Events from another generation, or arriving
    /// after teardown, are discarded.
    pub fn handle_event(&mut self, event: PlayerEvent, output: &dyn AudioOutput) -> Vec<SessionNotice> {
        if event.generation != self.generation || self.status == SessionStatus::TornDown {
            log::debug!(
                "Discarding stale {} event from session {} (current {})",
                event.stem,
                event.generation,
                self.generation
            );
            return Vec::new();
        }

        let mut notices = Vec::new();
        let stem = event.stem;

        match event.outcome {
            LoadOutcome::Loaded(media) => match self.track_mut(stem).on_loaded(&media, output) {
                Ok(true) => self.on_track_ready(stem, &mut notices),
                Ok(false) => log::debug!("Ignoring repeated ready for {stem}"),
                Err(error) => self.on_track_failed(stem, error, &mut notices),
            },
            LoadOutcome::Failed(error) => {
                if self.track_mut(stem).on_failed(error.clone()) {
                    self.on_track_failed(stem, error, &mut notices);
                }
            }
        }

        notices
    }

    fn on_track_ready(&mut self, stem: Stem, notices: &mut Vec<SessionNotice>) {
        if self.status != SessionStatus::AwaitingStems {
            return;
        }
        if self.readiness.mark_ready(stem) {
            self.become_ready(notices);
        } else {
            log::info!(
                "{} of {} stems ready",
                self.readiness.ready_count(),
                self.readiness.expected_count()
            );
        }
    }

    fn on_track_failed(
        &mut self,
        stem: Stem,
        error: LoadError,
        notices: &mut Vec<SessionNotice>,
    ) {
        notices.push(SessionNotice::LoadFailed { stem, error });

        if let SessionStatus::Failed(stems) = &mut self.status {
            if !stems.contains(&stem) {
                stems.push(stem);
            }
            return;
        }
        if self.status != SessionStatus::AwaitingStems {
            return;
        }

        if self.readiness.mark_failed(stem) {
            self.become_ready(notices);
        } else if self.readiness.is_blocked() {
            let failed: Vec<Stem> = self.readiness.failed().collect();
            log::warn!("Session {} failed: {failed:?}", self.generation);
            self.status = SessionStatus::Failed(failed);
        }
    }

    fn become_ready(&mut self, notices: &mut Vec<SessionNotice>) {
        log::info!("All stems ready for session {}", self.generation);
        self.status = SessionStatus::Ready;
        self.transport.enable();
        notices.push(SessionNotice::AllReady);
    }

    pub fn toggle_transport(&mut self) -> Result<bool, PlayerError> {
        self.transport.toggle(&mut self.tracks)
    }

    pub fn set_transport(&mut self, playing: bool) -> Result<bool, PlayerError> {
        self.transport.set_playing(playing, &mut self.tracks)
    }

    /// User scrub on a track's timeline. Only the master is interactive;
    /// its seek is then fanned out to the followers.
    pub fn user_seek(&mut self, stem: Stem, fraction: f64) -> Result<usize, PlayerError> {
        if self.status == SessionStatus::TornDown {
            return Err(PlayerError::NoSession);
        }
        match self.track_mut(stem).seek_to(fraction, SeekOrigin::User)? {
            Some(event) => Ok(self.seek.on_seek_event(event, &mut self.tracks)),
            None => Ok(0),
        }
    }

    pub fn seek_master(&mut self, fraction: f64) -> Result<usize, PlayerError> {
        self.user_seek(self.seek.master(), fraction)
    }

    pub fn set_volume(&mut self, stem: Stem, volume: f32) {
        self.track_mut(stem).set_volume(volume);
    }

    pub fn set_muted(&mut self, stem: Stem, muted: bool) {
        self.track_mut(stem).set_muted(muted);
    }

    /// Master position as a fraction, 0.0 until the master is ready.
    pub fn master_progress(&self) -> f64 {
        self.track(self.seek.master()).progress().unwrap_or(0.0)
    }

    /// Destroy every track, reset readiness, disable the transport.
    /// The only teardown path; safe to call more than once.
    pub fn teardown(&mut self) {
        if self.status == SessionStatus::TornDown {
            return;
        }
        for track in &mut self.tracks {
            track.destroy();
        }
        self.readiness.reset();
        self.transport.disable();
        self.seek.reset();
        self.status = SessionStatus::TornDown;
        log::info!("Session {} torn down", self.generation);
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
