pub mod config;
pub mod constants;
pub mod error;
pub mod job;
pub mod session;
pub mod stems;
pub mod utils;

#[cfg(feature = "player")]
pub mod backend;
