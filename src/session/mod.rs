//! Multi-track synchronized playback core.
//!
//! Five independently loading tracks are driven as one logical player:
//! readiness is aggregated into a single edge, play/pause fans out through
//! one transport, and seeks flow only from the master track to the
//! followers. Everything here runs on the caller's thread; load workers
//! report back over a channel and each report carries the generation of the
//! session that issued it.

pub mod events;
// Public so the integration tests and the binary's player tests, which link
// the library without `cfg(test)`, can drive sessions headless. It holds no
// state until a test constructs it.
#[doc(hidden)]
pub mod fake;
pub mod playback;
pub mod player;
pub mod readiness;
pub mod seek;
pub mod track;
pub mod transport;

pub use events::{
    AudioOutput, LoadOutcome, LoadRequest, LoadedMedia, MediaLoader, PlayerEvent, SeekEvent,
    SessionNotice, TrackOutput,
};
pub use playback::{PlaybackSession, SessionConfig, SessionStatus};
pub use player::{FailureReason, PlayerStatus, SessionState, StemPlayer, TrackSnapshot};
pub use readiness::{FailurePolicy, ReadinessAggregator};
pub use seek::SeekCoordinator;
pub use track::{LoadState, SeekOrigin, TrackHandle};
pub use transport::{TransportController, TransportState};
