//! Spinner used while a separation job is running.

use crate::constants::SPINNER_CHARS;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a standard progress spinner with consistent styling.
///
/// The spinner ticks on its own; callers only update the message and
/// clear it when the step finishes.
///
/// ```ignore
/// let spinner = create_progress_spinner();
/// spinner.set_message("Fetching video info...");
/// // ... blocking request ...
/// spinner.finish_and_clear();
/// ```
pub fn create_progress_spinner() -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER_CHARS);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
