//! One stem's player: load state, gain, mute, seek and transport for exactly
//! one decoder instance.

use super::events::{
    AudioOutput, LoadRequest, LoadedMedia, MediaLoader, PlayerEvent, SeekEvent, TrackOutput,
};
use crate::error::{LoadError, PlayerError};
use crate::stems::Stem;
use serde::Serialize;
use std::sync::mpsc::Sender;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// Who asked for a seek. Only user seeks are re-emitted as [`SeekEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    User,
    Coordinator,
}

pub struct TrackHandle {
    stem: Stem,
    url: String,
    load_state: LoadState,
    muted: bool,
    volume: f32,
    playing: bool,
    duration: Option<Duration>,
    pending_seek: Option<f64>,
    output: Option<Box<dyn TrackOutput>>,
    error: Option<LoadError>,
    destroyed: bool,
}

impl TrackHandle {
    pub fn new(stem: Stem, url: impl Into<String>, volume: f32) -> Self {
        Self {
            stem,
            url: url.into(),
            load_state: LoadState::Unloaded,
            muted: false,
            volume: clamp_volume(volume),
            playing: false,
            duration: None,
            pending_seek: None,
            output: None,
            error: None,
            destroyed: false,
        }
    }

    pub fn stem(&self) -> Stem {
        self.stem
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_ready(&self) -> bool {
        self.load_state == LoadState::Ready && !self.destroyed
    }

    pub fn is_master(&self) -> bool {
        self.stem.is_master()
    }

    /// Followers are not interactive; their position is driven by the master.
    pub fn accepts_interaction(&self) -> bool {
        self.is_master() && !self.destroyed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn pending_seek(&self) -> Option<f64> {
        self.pending_seek
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Begin asynchronous acquisition. The outcome comes back as a
    /// [`PlayerEvent`] carrying `generation`.
    pub fn load(&mut self, generation: u64, loader: &dyn MediaLoader, events: &Sender<PlayerEvent>) {
        if self.destroyed {
            return;
        }

        if let Some(mut output) = self.output.take() {
            output.stop();
        }
        self.load_state = LoadState::Loading;
        self.playing = false;
        self.duration = None;
        self.error = None;

        log::info!("Loading {} from {}", self.stem, self.url);
        loader.spawn(
            LoadRequest {
                generation,
                stem: self.stem,
                url: self.url.clone(),
            },
            events.clone(),
        );
    }

    /// Attach loaded media. Returns `Ok(true)` when this call made the track
    /// ready, `Ok(false)` for a duplicate or stale completion.
    pub fn on_loaded(&mut self, media: &LoadedMedia, output: &dyn AudioOutput) -> Result<bool, LoadError> {
        if self.destroyed || self.load_state != LoadState::Loading {
            return Ok(false);
        }

        let mut attached = match output.attach(self.stem, media) {
            Ok(attached) => attached,
            Err(e) => {
                self.on_failed(e.clone());
                return Err(e);
            }
        };
        attached.pause();
        attached.set_gain(self.effective_gain());

        self.output = Some(attached);
        self.duration = Some(media.duration);
        self.load_state = LoadState::Ready;
        log::info!(
            "{} ready: {:.2}s, {} Hz, {} ch",
            self.stem,
            media.duration.as_secs_f64(),
            media.sample_rate,
            media.channels
        );

        if let Some(fraction) = self.pending_seek.take() {
            log::debug!("Applying queued seek {fraction:.3} to {}", self.stem);
            if let Err(e) = self.apply_seek(fraction) {
                log::warn!("Queued seek on {} failed: {e}", self.stem);
            }
        }

        Ok(true)
    }

    /// Returns true when this call moved the track into `Failed`.
    pub fn on_failed(&mut self, error: LoadError) -> bool {
        if self.destroyed || self.load_state != LoadState::Loading {
            return false;
        }
        log::warn!("{} failed to load: {error}", self.stem);
        self.load_state = LoadState::Failed;
        self.pending_seek = None;
        self.error = Some(error);
        true
    }

    pub fn play_pause(&mut self) -> Result<bool, PlayerError> {
        let target = !self.playing;
        self.set_playing(target)?;
        Ok(target)
    }

    pub fn set_playing(&mut self, playing: bool) -> Result<(), PlayerError> {
        let output = match (&mut self.output, self.load_state) {
            (Some(output), LoadState::Ready) => output,
            _ => return Err(PlayerError::TransportOnUnready),
        };

        if playing {
            output.play();
        } else {
            output.pause();
        }
        self.playing = playing;
        Ok(())
    }

    /// Reposition to `fraction * duration`.
    ///
    /// A user seek on the master is echoed back as a [`SeekEvent`] for the
    /// coordinator; coordinator seeks never are. Seeks on a track that is
    /// still loading are queued and applied once it becomes ready.
    pub fn seek_to(&mut self, fraction: f64, origin: SeekOrigin) -> Result<Option<SeekEvent>, PlayerError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(PlayerError::InvalidFraction(fraction));
        }
        if origin == SeekOrigin::User && !self.accepts_interaction() {
            return Err(PlayerError::InteractionDisabled(self.stem));
        }

        match self.load_state {
            LoadState::Ready => self.apply_seek(fraction)?,
            LoadState::Unloaded | LoadState::Loading if !self.destroyed => {
                if origin == SeekOrigin::User {
                    return Err(PlayerError::TransportOnUnready);
                }
                log::debug!("Queueing seek {fraction:.3} on {} until ready", self.stem);
                self.pending_seek = Some(fraction);
                return Ok(None);
            }
            _ => return Err(PlayerError::TransportOnUnready),
        }

        Ok(match origin {
            SeekOrigin::User => Some(SeekEvent {
                stem: self.stem,
                fraction,
            }),
            SeekOrigin::Coordinator => None,
        })
    }

    fn apply_seek(&mut self, fraction: f64) -> Result<(), PlayerError> {
        let (Some(output), Some(duration)) = (&mut self.output, self.duration) else {
            return Err(PlayerError::TransportOnUnready);
        };
        output.seek(duration.mul_f64(fraction))
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
        self.apply_gain();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_gain();
    }

    fn effective_gain(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    fn apply_gain(&mut self) {
        let gain = self.effective_gain();
        if let Some(output) = &mut self.output {
            output.set_gain(gain);
        }
    }

    /// Playback position as a fraction of the duration, once ready.
    pub fn progress(&self) -> Option<f64> {
        let (output, duration) = (self.output.as_ref()?, self.duration?);
        if duration.is_zero() {
            return Some(0.0);
        }
        Some((output.position().as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }

    /// Stop playback and release the decoder. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(mut output) = self.output.take() {
            output.stop();
        }
        self.destroyed = true;
        self.playing = false;
        self.pending_seek = None;
        if self.load_state == LoadState::Loading {
            self.load_state = LoadState::Unloaded;
        }
        log::debug!("Destroyed {} track", self.stem);
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

impl Drop for TrackHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::{self, FakeOutput, ManualLoader, OutputOp};
    use std::sync::mpsc;

    fn loading(stem: Stem) -> (TrackHandle, ManualLoader) {
        let loader = ManualLoader::new();
        let (tx, _rx) = mpsc::channel();
        let mut track = TrackHandle::new(stem, format!("{stem}.mp3"), 0.8);
        track.load(1, &loader, &tx);
        (track, loader)
    }

    #[test]
    fn test_new_track_initial_state() {
        let track = TrackHandle::new(Stem::Bass, "b.mp3", 0.8);
        assert_eq!(track.load_state(), LoadState::Unloaded);
        assert!(!track.is_master());
        assert!(!track.is_playing());
        assert!(!track.is_muted());
        assert_eq!(track.volume(), 0.8);
    }

    #[test]
    fn test_load_issues_request() {
        let (track, loader) = loading(Stem::Drums);
        assert_eq!(track.load_state(), LoadState::Loading);
        assert_eq!(loader.requests().len(), 1);
        assert_eq!(loader.requests()[0].url, "drums.mp3");
        assert_eq!(loader.requests()[0].generation, 1);
    }

    #[test]
    fn test_ready_fires_once_per_load() {
        let (mut track, _loader) = loading(Stem::Vocals);
        let output = FakeOutput::new();
        let media = fake::media(10.0);

        assert!(track.on_loaded(&media, &output).unwrap());
        assert!(!track.on_loaded(&media, &output).unwrap());
        assert_eq!(output.attach_count(), 1);
        assert!(track.is_ready());
    }

    #[test]
    fn test_attach_failure_marks_failed() {
        let (mut track, _loader) = loading(Stem::Other);
        let output = FakeOutput::new().failing(Stem::Other);

        assert!(track.on_loaded(&fake::media(1.0), &output).is_err());
        assert_eq!(track.load_state(), LoadState::Failed);
        assert!(track.error().is_some());
    }

    #[test]
    fn test_play_pause_noop_until_ready() {
        let (mut track, _loader) = loading(Stem::Bass);
        assert_eq!(track.play_pause(), Err(PlayerError::TransportOnUnready));
        assert!(!track.is_playing());

        let output = FakeOutput::new();
        track.on_loaded(&fake::media(5.0), &output).unwrap();
        assert_eq!(track.play_pause(), Ok(true));
        assert_eq!(track.play_pause(), Ok(false));
        assert_eq!(output.ops(Stem::Bass).iter().filter(|op| **op == OutputOp::Play).count(), 1);
    }

    #[test]
    fn test_user_seek_on_follower_is_disabled() {
        let (mut track, _loader) = loading(Stem::Bass);
        track.on_loaded(&fake::media(5.0), &FakeOutput::new()).unwrap();
        assert_eq!(
            track.seek_to(0.5, SeekOrigin::User),
            Err(PlayerError::InteractionDisabled(Stem::Bass))
        );
    }

    #[test]
    fn test_user_seek_on_master_emits_event() {
        let (mut track, _loader) = loading(Stem::Original);
        let output = FakeOutput::new();
        track.on_loaded(&fake::media(100.0), &output).unwrap();

        let event = track.seek_to(0.25, SeekOrigin::User).unwrap();
        assert_eq!(
            event,
            Some(SeekEvent {
                stem: Stem::Original,
                fraction: 0.25
            })
        );
        assert_eq!(output.seeks(Stem::Original), vec![Duration::from_secs(25)]);
    }

    #[test]
    fn test_coordinator_seek_does_not_emit() {
        let (mut track, _loader) = loading(Stem::Drums);
        let output = FakeOutput::new();
        track.on_loaded(&fake::media(10.0), &output).unwrap();

        assert_eq!(track.seek_to(0.5, SeekOrigin::Coordinator), Ok(None));
        assert_eq!(output.seeks(Stem::Drums), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn test_seek_while_loading_is_queued() {
        let (mut track, _loader) = loading(Stem::Bass);
        let output = FakeOutput::new();

        assert_eq!(track.seek_to(0.42, SeekOrigin::Coordinator), Ok(None));
        assert_eq!(track.pending_seek(), Some(0.42));
        assert!(output.seeks(Stem::Bass).is_empty());

        track.on_loaded(&fake::media(100.0), &output).unwrap();
        assert_eq!(track.pending_seek(), None);
        assert_eq!(output.seeks(Stem::Bass), vec![Duration::from_secs_f64(42.0)]);
    }

    #[test]
    fn test_later_queued_seek_replaces_earlier() {
        let (mut track, _loader) = loading(Stem::Vocals);
        track.seek_to(0.1, SeekOrigin::Coordinator).unwrap();
        track.seek_to(0.9, SeekOrigin::Coordinator).unwrap();
        assert_eq!(track.pending_seek(), Some(0.9));
    }

    #[test]
    fn test_seek_rejects_out_of_range() {
        let (mut track, _loader) = loading(Stem::Original);
        assert_eq!(
            track.seek_to(1.5, SeekOrigin::Coordinator),
            Err(PlayerError::InvalidFraction(1.5))
        );
        assert!(track.seek_to(f64::NAN, SeekOrigin::Coordinator).is_err());
    }

    #[test]
    fn test_volume_clamps_and_mute_keeps_volume() {
        let (mut track, _loader) = loading(Stem::Drums);
        let output = FakeOutput::new();
        track.on_loaded(&fake::media(1.0), &output).unwrap();

        track.set_volume(1.7);
        assert_eq!(track.volume(), 1.0);
        track.set_volume(-0.3);
        assert_eq!(track.volume(), 0.0);

        track.set_volume(0.6);
        track.set_muted(true);
        assert_eq!(output.last_gain(Stem::Drums), Some(0.0));
        track.set_muted(false);
        assert_eq!(output.last_gain(Stem::Drums), Some(0.6));
    }

    #[test]
    fn test_initial_volume_is_sanitized() {
        assert_eq!(TrackHandle::new(Stem::Bass, "b.mp3", f32::NAN).volume(), 0.0);
        assert_eq!(TrackHandle::new(Stem::Bass, "b.mp3", 2.5).volume(), 1.0);

        let mut track = TrackHandle::new(Stem::Bass, "b.mp3", f32::NAN);
        let output = FakeOutput::new();
        let (tx, _rx) = mpsc::channel();
        track.load(1, &ManualLoader::new(), &tx);
        track.on_loaded(&fake::media(1.0), &output).unwrap();
        assert_eq!(output.last_gain(Stem::Bass), Some(0.0));
    }

    #[test]
    fn test_failure_only_from_loading() {
        let mut track = TrackHandle::new(Stem::Other, "o.mp3", 0.8);
        assert!(!track.on_failed(LoadError::Undecodable("x".into())));
        assert_eq!(track.load_state(), LoadState::Unloaded);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (mut track, _loader) = loading(Stem::Original);
        let output = FakeOutput::new();
        track.on_loaded(&fake::media(3.0), &output).unwrap();
        track.set_playing(true).unwrap();

        track.destroy();
        track.destroy();

        assert!(track.is_destroyed());
        assert!(!track.is_ready());
        assert!(!track.is_playing());
        assert_eq!(
            output.ops(Stem::Original).iter().filter(|op| **op == OutputOp::Stop).count(),
            1
        );
        assert_eq!(track.set_playing(true), Err(PlayerError::TransportOnUnready));
    }

    #[test]
    fn test_completion_after_destroy_is_ignored() {
        let (mut track, _loader) = loading(Stem::Bass);
        let output = FakeOutput::new();
        track.destroy();

        assert!(!track.on_loaded(&fake::media(1.0), &output).unwrap());
        assert_eq!(output.attach_count(), 0);
    }
}
