//! UI-facing controller. Holds at most one [`PlaybackSession`], hands out
//! session generations, and drains load completions on the caller's thread.

use super::events::{AudioOutput, MediaLoader, PlayerEvent, SessionNotice};
use super::playback::{PlaybackSession, SessionConfig, SessionStatus};
use super::track::LoadState;
use crate::error::PlayerError;
use crate::stems::{Stem, StemSet};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlayerStatus {
    Idle,
    Submitting,
    AwaitingStems,
    Ready,
    Failed { reason: FailureReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Stems(Vec<Stem>),
    Submission(String),
}

/// Snapshot of the aggregate state the UI renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    #[serde(flatten)]
    pub status: PlayerStatus,
    pub ready_count: usize,
    pub playing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub stem: Stem,
    pub load_state: LoadState,
    pub volume: f32,
    pub muted: bool,
    pub playing: bool,
    pub interactive: bool,
    pub duration_secs: Option<f64>,
    pub progress: Option<f64>,
    pub error: Option<String>,
}

pub struct StemPlayer {
    loader: Box<dyn MediaLoader>,
    output: Box<dyn AudioOutput>,
    config: SessionConfig,
    events_tx: Sender<PlayerEvent>,
    events_rx: Receiver<PlayerEvent>,
    next_generation: u64,
    session: Option<PlaybackSession>,
    status: PlayerStatus,
}

impl StemPlayer {
    pub fn new(loader: Box<dyn MediaLoader>, output: Box<dyn AudioOutput>, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            loader,
            output,
            config,
            events_tx,
            events_rx,
            next_generation: 1,
            session: None,
            status: PlayerStatus::Idle,
        }
    }

    /// Sender that load workers report on. Exposed so callers can inject
    /// completions from their own loaders.
    pub fn events_sender(&self) -> Sender<PlayerEvent> {
        self.events_tx.clone()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// A new source was submitted; the previous session is torn down now.
    pub fn begin_submit(&mut self) {
        self.teardown_session();
        self.status = PlayerStatus::Submitting;
    }

    pub fn submit_failed(&mut self, reason: impl Into<String>) {
        self.teardown_session();
        self.status = PlayerStatus::Failed {
            reason: FailureReason::Submission(reason.into()),
        };
    }

    /// Replace any active session with one for `stems`. Returns the new
    /// session's generation.
    pub fn load_stems(&mut self, stems: StemSet) -> u64 {
        self.teardown_session();

        let generation = self.next_generation;
        self.next_generation += 1;

        self.session = Some(PlaybackSession::start(
            generation,
            stems,
            self.config,
            self.loader.as_ref(),
            &self.events_tx,
        ));
        self.status = PlayerStatus::AwaitingStems;
        generation
    }

    /// Restart the current stem set from scratch. This is the only retry.
    pub fn reload(&mut self) -> Result<u64, PlayerError> {
        let stems = self
            .session
            .as_ref()
            .map(|s| s.stems().clone())
            .ok_or(PlayerError::NoSession)?;
        log::info!("Reloading stems");
        Ok(self.load_stems(stems))
    }

    /// Drain pending load completions and apply them in arrival order.
    pub fn pump(&mut self) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            notices.extend(self.handle_event(event));
        }
        notices
    }

    pub fn handle_event(&mut self, event: PlayerEvent) -> Vec<SessionNotice> {
        let Some(session) = self.session.as_mut() else {
            log::debug!("Discarding {} event: no active session", event.stem);
            return Vec::new();
        };
        let notices = session.handle_event(event, self.output.as_ref());
        self.sync_status();
        notices
    }

    fn sync_status(&mut self) {
        if let Some(session) = &self.session {
            self.status = match session.status() {
                SessionStatus::AwaitingStems => PlayerStatus::AwaitingStems,
                SessionStatus::Ready => PlayerStatus::Ready,
                SessionStatus::Failed(stems) => PlayerStatus::Failed {
                    reason: FailureReason::Stems(stems.clone()),
                },
                SessionStatus::TornDown => PlayerStatus::Idle,
            };
        }
    }

    fn session_mut(&mut self) -> Result<&mut PlaybackSession, PlayerError> {
        self.session.as_mut().ok_or(PlayerError::NoSession)
    }

    pub fn set_transport(&mut self, playing: bool) -> Result<bool, PlayerError> {
        self.session_mut()?.set_transport(playing)
    }

    pub fn toggle_transport(&mut self) -> Result<bool, PlayerError> {
        self.session_mut()?.toggle_transport()
    }

    pub fn set_stem_volume(&mut self, stem: Stem, volume: f32) -> Result<(), PlayerError> {
        self.session_mut()?.set_volume(stem, volume);
        Ok(())
    }

    pub fn set_stem_muted(&mut self, stem: Stem, muted: bool) -> Result<(), PlayerError> {
        self.session_mut()?.set_muted(stem, muted);
        Ok(())
    }

    pub fn seek_master(&mut self, fraction: f64) -> Result<usize, PlayerError> {
        self.session_mut()?.seek_master(fraction)
    }

    /// Seek gesture on any track's timeline; followers reject it.
    pub fn user_seek(&mut self, stem: Stem, fraction: f64) -> Result<usize, PlayerError> {
        self.session_mut()?.user_seek(stem, fraction)
    }

    pub fn master_progress(&self) -> f64 {
        self.session.as_ref().map_or(0.0, PlaybackSession::master_progress)
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            status: self.status.clone(),
            ready_count: self.session.as_ref().map_or(0, PlaybackSession::ready_count),
            playing: self.session.as_ref().is_some_and(PlaybackSession::is_playing),
        }
    }

    pub fn tracks(&self) -> Vec<TrackSnapshot> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        session
            .tracks()
            .iter()
            .map(|t| TrackSnapshot {
                stem: t.stem(),
                load_state: t.load_state(),
                volume: t.volume(),
                muted: t.is_muted(),
                playing: t.is_playing(),
                interactive: t.accepts_interaction(),
                duration_secs: t.duration().map(|d| d.as_secs_f64()),
                progress: t.progress(),
                error: t.error().map(ToString::to_string),
            })
            .collect()
    }

    fn teardown_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }

    /// End playback entirely, e.g. when the view goes away.
    pub fn teardown(&mut self) {
        self.teardown_session();
        self.status = PlayerStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::{self, FakeOutput, ManualLoader, OutputOp};

    fn player() -> (StemPlayer, ManualLoader, FakeOutput) {
        let loader = ManualLoader::new();
        let output = FakeOutput::new();
        let player = StemPlayer::new(
            Box::new(loader.clone()),
            Box::new(output.clone()),
            SessionConfig::default(),
        );
        (player, loader, output)
    }

    #[test]
    fn test_initial_state() {
        let (player, _loader, _output) = player();
        assert_eq!(
            player.state(),
            SessionState {
                status: PlayerStatus::Idle,
                ready_count: 0,
                playing: false
            }
        );
        assert!(player.tracks().is_empty());
    }

    #[test]
    fn test_controls_without_session() {
        let (mut player, _loader, _output) = player();
        assert_eq!(player.toggle_transport(), Err(PlayerError::NoSession));
        assert_eq!(player.seek_master(0.5), Err(PlayerError::NoSession));
        assert_eq!(player.reload(), Err(PlayerError::NoSession));
        assert_eq!(player.master_progress(), 0.0);
    }

    #[test]
    fn test_pump_applies_sent_events() {
        let (mut player, _loader, _output) = player();
        let generation = player.load_stems(StemSet::from_base("job", "mp3"));
        let tx = player.events_sender();

        for stem in Stem::ALL {
            tx.send(fake::loaded(generation, stem, 30.0)).unwrap();
        }
        assert_eq!(player.pump(), vec![SessionNotice::AllReady]);
        assert_eq!(player.status(), &PlayerStatus::Ready);
        assert_eq!(player.state().ready_count, 5);
    }

    #[test]
    fn test_generations_increase() {
        let (mut player, _loader, _output) = player();
        let first = player.load_stems(StemSet::from_base("a", "mp3"));
        let second = player.load_stems(StemSet::from_base("b", "mp3"));
        assert!(second > first);
    }

    #[test]
    fn test_submit_lifecycle() {
        let (mut player, _loader, output) = player();
        let generation = player.load_stems(StemSet::from_base("a", "mp3"));
        player.handle_event(fake::loaded(generation, Stem::Original, 10.0));

        player.begin_submit();
        assert_eq!(player.status(), &PlayerStatus::Submitting);
        assert!(player.session().is_none());
        assert_eq!(output.count(&OutputOp::Stop), 1);

        player.submit_failed("timeout");
        assert_eq!(
            player.status(),
            &PlayerStatus::Failed {
                reason: FailureReason::Submission("timeout".to_string())
            }
        );
    }

    #[test]
    fn test_reload_restarts_same_stems() {
        let (mut player, loader, _output) = player();
        let first = player.load_stems(StemSet::from_base("job", "mp3"));
        player.handle_event(fake::failed(first, Stem::Bass));
        assert!(matches!(player.status(), PlayerStatus::Failed { .. }));

        let second = player.reload().unwrap();
        assert_eq!(player.status(), &PlayerStatus::AwaitingStems);
        assert_eq!(loader.requests_for(second).len(), 5);
        assert_eq!(loader.requests_for(second)[1].url, "job/bass.mp3");
    }

    #[test]
    fn test_state_serializes_flat() {
        let (player, _loader, _output) = player();
        let json = serde_json::to_value(player.state()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["ready_count"], 0);
        assert_eq!(json["playing"], false);
    }

    #[test]
    fn test_track_snapshots_mark_master_interactive() {
        let (mut player, _loader, _output) = player();
        player.load_stems(StemSet::from_base("job", "mp3"));
        let interactive: Vec<Stem> = player
            .tracks()
            .into_iter()
            .filter(|t| t.interactive)
            .map(|t| t.stem)
            .collect();
        assert_eq!(interactive, vec![Stem::Original]);
    }
}
