use std::error::Error;

/// Where the stems to play come from. Exactly one source is expected;
/// clap enforces that.
#[cfg_attr(not(feature = "player"), allow(dead_code))]
pub struct PlayArgs<'a> {
    pub base: Option<&'a str>,
    pub json: Option<&'a str>,
    pub submit: Option<&'a str>,
    pub extension: Option<&'a str>,
}

pub fn handle_play(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "player")]
    {
        let config = stemdeck::config::Config::load()?;
        let target = resolve_target(&config, &args)?;
        crate::player::run(config, target)
    }

    #[cfg(not(feature = "player"))]
    {
        let _ = args;
        use owo_colors::OwoColorize;
        println!("{} {}", "🎚".cyan(), "Stem Player".bold());
        println!();
        println!(
            "{} The stem player requires the 'player' feature to be enabled.",
            "Note:".yellow()
        );
        println!();
        println!("To enable it, install with:");
        println!("  {}", "cargo install stemdeck --features player".cyan());
        println!();
        println!("Or if building from source:");
        println!("  {}", "cargo build --release --features player".cyan());

        Ok(())
    }
}

#[cfg(feature = "player")]
fn resolve_target(
    config: &stemdeck::config::Config,
    args: &PlayArgs,
) -> Result<crate::player::PlayTarget, Box<dyn Error>> {
    use crate::player::PlayTarget;
    use stemdeck::job::{HttpJobClient, UploadOutcome};
    use stemdeck::stems::StemSet;

    if let Some(source) = args.submit {
        let client = HttpJobClient::from_config(config)?;
        return Ok(match super::submit::prepare_source(&client, source)? {
            UploadOutcome::Separated(stems) => PlayTarget::Stems {
                stems,
                title: super::submit::file_title(source),
            },
            UploadOutcome::Source(source) => PlayTarget::Submit { source },
        });
    }

    if let Some(path) = args.json {
        let expanded = shellexpand::tilde(path);
        let text = std::fs::read_to_string(expanded.as_ref())
            .map_err(|e| format!("Could not read {path}: {e}"))?;
        let stems = StemSet::from_json(&text)?;
        return Ok(PlayTarget::Stems { stems, title: None });
    }

    let base = args
        .base
        .ok_or("Nothing to play. Pass a stem folder, --json <file> or --submit <url>.")?;
    let extension = args.extension.unwrap_or(&config.stem_extension);
    Ok(PlayTarget::Stems {
        stems: StemSet::from_base(base, extension),
        title: Some(base.trim_end_matches('/').to_string()),
    })
}
