use owo_colors::OwoColorize;
use serde_json::json;
use std::error::Error;
use std::path::Path;
use stemdeck::config::Config;
use stemdeck::job::{self, HttpJobClient, SubmitPhase, UploadOutcome, VideoInfo};
use stemdeck::stems::StemSet;
use stemdeck::utils::progress::create_progress_spinner;

/// Local files go through the upload endpoint, which usually separates them
/// on the spot; anything else is passed to the backend as-is.
pub fn prepare_source(
    client: &HttpJobClient,
    source: &str,
) -> Result<UploadOutcome, Box<dyn Error>> {
    let expanded = shellexpand::tilde(source);
    let path = Path::new(expanded.as_ref());
    if !path.is_file() {
        return Ok(UploadOutcome::Source(source.to_string()));
    }

    let spinner = create_progress_spinner();
    spinner.set_message(format!("Uploading and separating {}...", path.display()));
    let uploaded = client.upload(path);
    spinner.finish_and_clear();

    let outcome = uploaded?;
    match &outcome {
        UploadOutcome::Separated(_) => log::info!("Uploaded and separated {}", path.display()),
        UploadOutcome::Source(id) => log::info!("Uploaded {} as {id}", path.display()),
    }
    Ok(outcome)
}

/// Display name for an uploaded file: its file name.
pub fn file_title(source: &str) -> Option<String> {
    let expanded = shellexpand::tilde(source);
    Path::new(expanded.as_ref())
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

pub fn run_submission(
    config: &Config,
    source: &str,
) -> Result<(VideoInfo, StemSet), Box<dyn Error>> {
    let client = HttpJobClient::from_config(config)?;
    let source = match prepare_source(&client, source)? {
        UploadOutcome::Separated(stems) => {
            let info = VideoInfo {
                title: file_title(source),
                ..Default::default()
            };
            return Ok((info, stems));
        }
        UploadOutcome::Source(source) => source,
    };

    let spinner = create_progress_spinner();
    let result = job::submit(&client, &source, |phase, info| match phase {
        SubmitPhase::FetchingInfo => spinner.set_message("Fetching source info..."),
        SubmitPhase::Demuxing => spinner.set_message(format!(
            "Separating {}...",
            info.and_then(VideoInfo::display_name).unwrap_or("source")
        )),
    });
    spinner.finish_and_clear();

    Ok(result?)
}

pub fn handle_submit(source: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let (info, stems) = run_submission(&config, source)?;

    if as_json {
        let out = json!({ "info": info, "stem_urls": stems, "status": 200 });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} Separated {}",
        "✓".green(),
        info.display_name().unwrap_or(source).cyan().bold()
    );
    super::stems::print_stems(&stems);
    Ok(())
}
