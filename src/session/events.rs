//! Messages crossing from load workers back to the UI thread, and the seams
//! a session needs from the outside world (media acquisition, audio output).

use crate::error::{LoadError, PlayerError};
use crate::stems::Stem;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Fully fetched and probed stem audio, ready to attach to an output.
#[derive(Debug, Clone)]
pub struct LoadedMedia {
    pub data: Arc<[u8]>,
    pub duration: Duration,
    pub channels: u16,
    pub sample_rate: u32,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(LoadedMedia),
    Failed(LoadError),
}

/// Completion of one asynchronous load, tagged with the session generation
/// that issued it so late arrivals from a replaced session can be dropped.
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    pub generation: u64,
    pub stem: Stem,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub generation: u64,
    pub stem: Stem,
    pub url: String,
}

/// What the UI layer is told after events are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    AllReady,
    LoadFailed { stem: Stem, error: LoadError },
}

/// A seek emitted by a track because of user interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekEvent {
    pub stem: Stem,
    pub fraction: f64,
}

/// Starts acquisition of one stem; the result must arrive on `events`.
pub trait MediaLoader {
    fn spawn(&self, request: LoadRequest, events: Sender<PlayerEvent>);
}

/// Turns loaded media into a playable, initially paused output.
pub trait AudioOutput {
    fn attach(&self, stem: Stem, media: &LoadedMedia) -> Result<Box<dyn TrackOutput>, LoadError>;
}

/// The imperative decoder/player behind one track.
pub trait TrackOutput {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), PlayerError>;
    fn set_gain(&mut self, gain: f32);
    fn position(&self) -> Duration;
    fn stop(&mut self);
}
