//! Project-wide constants used across multiple modules.

/// Spinner animation characters for progress indicators
pub const SPINNER_CHARS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Where the separation backend lives unless configured otherwise
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/";

/// File extension the backend writes stems with
pub const DEFAULT_STEM_EXTENSION: &str = "mp3";

/// Starting gain for every stem
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Player log file, created in the temp dir
pub const LOG_FILE_NAME: &str = "stemdeck-player.log";

/// Master seek step for the arrow keys, as a fraction of the track
pub const SEEK_STEP: f64 = 0.05;

/// Volume step for +/-
pub const VOLUME_STEP: f32 = 0.05;
