//! Folds unordered per-track ready/failed events into one "all ready" edge.

use crate::stems::Stem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What a failed stem does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failed stem blocks playback for the whole session.
    #[default]
    FailClosed,
    /// Failed stems are dropped from the expected set; the rest play.
    /// The master stem is still required.
    FailOpen,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailurePolicy::FailClosed => "fail_closed",
            FailurePolicy::FailOpen => "fail_open",
        })
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            other => Err(format!(
                "Unknown failure policy '{other}' (expected fail_closed or fail_open)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadinessAggregator {
    expected: BTreeSet<Stem>,
    ready: BTreeSet<Stem>,
    failed: BTreeSet<Stem>,
    policy: FailurePolicy,
    fired: bool,
}

impl ReadinessAggregator {
    pub fn new(expected: impl IntoIterator<Item = Stem>, policy: FailurePolicy) -> Self {
        Self {
            expected: expected.into_iter().collect(),
            ready: BTreeSet::new(),
            failed: BTreeSet::new(),
            policy,
            fired: false,
        }
    }

    /// Record a ready event. Returns true exactly once per session, on the
    /// event that completes the expected set.
    pub fn mark_ready(&mut self, stem: Stem) -> bool {
        if self.fired || self.is_blocked() {
            return false;
        }
        if !self.expected.contains(&stem) || self.failed.contains(&stem) {
            return false;
        }
        if !self.ready.insert(stem) {
            log::debug!("Duplicate ready for {stem} ignored");
            return false;
        }
        self.check_complete()
    }

    /// Record a failure. Under [`FailurePolicy::FailOpen`] this can complete
    /// the set, in which case true is returned.
    pub fn mark_failed(&mut self, stem: Stem) -> bool {
        if self.fired || !self.expected.contains(&stem) || self.ready.contains(&stem) {
            return false;
        }
        if !self.failed.insert(stem) {
            return false;
        }
        match self.policy {
            FailurePolicy::FailClosed => false,
            FailurePolicy::FailOpen => !self.is_blocked() && self.check_complete(),
        }
    }

    fn check_complete(&mut self) -> bool {
        let required = self.expected.len() - self.failed.len();
        if required > 0 && self.ready.len() == required {
            self.fired = true;
            true
        } else {
            false
        }
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    pub fn expected_count(&self) -> usize {
        match self.policy {
            FailurePolicy::FailClosed => self.expected.len(),
            FailurePolicy::FailOpen => self.expected.len() - self.failed.len(),
        }
    }

    pub fn is_all_ready(&self) -> bool {
        self.fired
    }

    /// True when no further event can ever complete the set.
    pub fn is_blocked(&self) -> bool {
        if self.failed.is_empty() {
            return false;
        }
        match self.policy {
            FailurePolicy::FailClosed => true,
            FailurePolicy::FailOpen => {
                self.failed.contains(&Stem::MASTER) || self.failed.len() == self.expected.len()
            }
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = Stem> + '_ {
        self.failed.iter().copied()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn reset(&mut self) {
        self.ready.clear();
        self.failed.clear();
        self.fired = false;
    }
}
