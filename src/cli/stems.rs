use owo_colors::OwoColorize;
use std::error::Error;
use stemdeck::config::Config;
use stemdeck::stems::StemSet;

pub fn print_stems(stems: &StemSet) {
    for (stem, url) in stems.iter() {
        let marker = if stem.is_master() { "◆" } else { " " };
        println!("  {} {:<8} {}", marker.blue(), stem.as_str(), url.bright_black());
    }
}

pub fn handle_stems(base: &str, extension: Option<&str>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let extension = extension.unwrap_or(&config.stem_extension);
    let stems = StemSet::from_base(base, extension);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stems)?);
    } else {
        print_stems(&stems);
    }
    Ok(())
}
