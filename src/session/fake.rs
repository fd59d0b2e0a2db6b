//! In-memory loader and output used to drive sessions without touching the
//! network or an audio device.

use super::events::{
    AudioOutput, LoadOutcome, LoadRequest, LoadedMedia, MediaLoader, PlayerEvent, TrackOutput,
};
use crate::error::{LoadError, PlayerError};
use crate::stems::Stem;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

pub fn media(seconds: f64) -> LoadedMedia {
    LoadedMedia {
        data: Arc::from(Vec::new()),
        duration: Duration::from_secs_f64(seconds),
        channels: 2,
        sample_rate: 44_100,
    }
}

pub fn loaded(generation: u64, stem: Stem, seconds: f64) -> PlayerEvent {
    PlayerEvent {
        generation,
        stem,
        outcome: LoadOutcome::Loaded(media(seconds)),
    }
}

pub fn failed(generation: u64, stem: Stem) -> PlayerEvent {
    PlayerEvent {
        generation,
        stem,
        outcome: LoadOutcome::Failed(LoadError::Unreachable(format!("{stem}: 404"))),
    }
}

/// Records load requests; completions are delivered by the test.
#[derive(Clone, Default)]
pub struct ManualLoader {
    requests: Rc<RefCell<Vec<LoadRequest>>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<LoadRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_for(&self, generation: u64) -> Vec<LoadRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.generation == generation)
            .cloned()
            .collect()
    }
}

impl MediaLoader for ManualLoader {
    fn spawn(&self, request: LoadRequest, _events: Sender<PlayerEvent>) {
        self.requests.borrow_mut().push(request);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputOp {
    Play,
    Pause,
    Seek(Duration),
    Gain(f32),
    Stop,
}

#[derive(Default)]
struct OutputLog {
    attached: usize,
    ops: Vec<(Stem, OutputOp)>,
}

/// Output whose tracks log every call into a shared journal.
#[derive(Clone, Default)]
pub struct FakeOutput {
    log: Rc<RefCell<OutputLog>>,
    failing: BTreeSet<Stem>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `attach` fail for `stem`, as an undecodable file would.
    pub fn failing(mut self, stem: Stem) -> Self {
        self.failing.insert(stem);
        self
    }

    pub fn attach_count(&self) -> usize {
        self.log.borrow().attached
    }

    pub fn ops(&self, stem: Stem) -> Vec<OutputOp> {
        self.log
            .borrow()
            .ops
            .iter()
            .filter(|(s, _)| *s == stem)
            .map(|(_, op)| op.clone())
            .collect()
    }

    pub fn seeks(&self, stem: Stem) -> Vec<Duration> {
        self.ops(stem)
            .into_iter()
            .filter_map(|op| match op {
                OutputOp::Seek(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    pub fn last_gain(&self, stem: Stem) -> Option<f32> {
        self.ops(stem).into_iter().rev().find_map(|op| match op {
            OutputOp::Gain(gain) => Some(gain),
            _ => None,
        })
    }

    pub fn count(&self, op: &OutputOp) -> usize {
        self.log.borrow().ops.iter().filter(|(_, o)| o == op).count()
    }
}

impl AudioOutput for FakeOutput {
    fn attach(&self, stem: Stem, _media: &LoadedMedia) -> Result<Box<dyn TrackOutput>, LoadError> {
        if self.failing.contains(&stem) {
            return Err(LoadError::Undecodable(format!("{stem}: bad frame header")));
        }
        self.log.borrow_mut().attached += 1;
        Ok(Box::new(FakeTrack {
            stem,
            log: Rc::clone(&self.log),
            position: Duration::ZERO,
        }))
    }
}

struct FakeTrack {
    stem: Stem,
    log: Rc<RefCell<OutputLog>>,
    position: Duration,
}

impl FakeTrack {
    fn record(&self, op: OutputOp) {
        self.log.borrow_mut().ops.push((self.stem, op));
    }
}

impl TrackOutput for FakeTrack {
    fn play(&mut self) {
        self.record(OutputOp::Play);
    }

    fn pause(&mut self) {
        self.record(OutputOp::Pause);
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlayerError> {
        self.position = position;
        self.record(OutputOp::Seek(position));
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        self.record(OutputOp::Gain(gain));
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn stop(&mut self) {
        self.record(OutputOp::Stop);
    }
}
