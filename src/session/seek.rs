//! Keeps follower tracks aligned with the master when the master is scrubbed.

use super::events::SeekEvent;
use super::track::{SeekOrigin, TrackHandle};
use crate::stems::Stem;

#[derive(Debug, Clone)]
pub struct SeekCoordinator {
    master: Stem,
    last_fraction: Option<f64>,
}

impl SeekCoordinator {
    pub fn new(master: Stem) -> Self {
        Self {
            master,
            last_fraction: None,
        }
    }

    pub fn master(&self) -> Stem {
        self.master
    }

    pub fn last_fraction(&self) -> Option<f64> {
        self.last_fraction
    }

    /// Apply a seek event. Only the master's channel is honored; events from
    /// any other track are dropped. Returns how many followers were driven.
    pub fn on_seek_event(&mut self, event: SeekEvent, tracks: &mut [TrackHandle]) -> usize {
        if event.stem != self.master {
            log::debug!("Discarding seek from follower {}", event.stem);
            return 0;
        }

        self.last_fraction = Some(event.fraction);
        let mut driven = 0;

        for track in tracks.iter_mut().filter(|t| t.stem() != self.master) {
            match track.seek_to(event.fraction, SeekOrigin::Coordinator) {
                Ok(_) => driven += 1,
                Err(e) => log::debug!("Follower {} skipped seek: {e}", track.stem()),
            }
        }

        log::debug!(
            "Master seek {:.3} propagated to {driven} follower(s)",
            event.fraction
        );
        driven
    }

    pub fn reset(&mut self) {
        self.last_fraction = None;
    }
}
