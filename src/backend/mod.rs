//! Device and network side of the player: the rodio output and the
//! threaded loader that feeds the session.

pub mod fetch;
pub mod output;

pub use fetch::{ThreadedLoader, fetch_bytes, probe};
pub use output::RodioOutput;

use crate::config::Config;
use crate::session::StemPlayer;
use std::error::Error;
use std::time::Duration;

/// A player wired to the default audio device and the threaded loader.
pub fn open_player(config: &Config) -> Result<StemPlayer, Box<dyn Error>> {
    let loader = ThreadedLoader::new(Duration::from_secs(config.fetch_timeout_secs))?;
    let output = RodioOutput::open_default()?;
    Ok(StemPlayer::new(
        Box::new(loader),
        Box::new(output),
        config.session_config(),
    ))
}
