//! stemdeck - play separated stems back as one synchronized performance.
//!
//! Submit a song to a separation backend, then play its five stems
//! (original, bass, drums, other, vocals) with a shared transport and
//! per-stem volume. Seeking happens on the original track only; the other
//! stems follow it.

use clap::{ArgGroup, CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;

mod cli;

#[cfg(feature = "player")]
mod player;

#[derive(Parser)]
#[command(name = "stemdeck")]
#[command(about = "Synchronized multi-stem player for source-separated audio")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Separation backend API base URL
        #[arg(long)]
        api: Option<String>,
    },
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Submit a source URL or local file for separation and print its stems
    Submit {
        /// Source URL, or a local file to upload
        source: String,
        /// Print the stem set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the stem set rooted at a folder or URL prefix
    Stems {
        /// Folder or URL prefix holding <stem>.<ext> files
        base: String,
        /// Stem file extension (defaults to the configured one)
        #[arg(short, long)]
        ext: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play a stem set in the terminal player
    #[command(group(ArgGroup::new("stems_source").args(["base", "json", "submit"]).required(true)))]
    Play {
        /// Folder or URL prefix holding <stem>.<ext> files
        base: Option<String>,
        /// Read the stem set from a JSON file
        #[arg(long, value_name = "FILE")]
        json: Option<String>,
        /// Submit a source for separation, then play the result
        #[arg(long, value_name = "SOURCE")]
        submit: Option<String>,
        /// Stem file extension (defaults to the configured one)
        #[arg(short, long)]
        ext: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new([
            "api_base_url",
            "info_timeout_secs",
            "demux_timeout_secs",
            "fetch_timeout_secs",
            "stem_extension",
            "default_volume",
            "failure_policy",
        ]))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { api } => {
            cli::init::handle_init(api.as_deref())?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
        Commands::Submit { source, json } => {
            cli::submit::handle_submit(&source, json)?;
        }
        Commands::Stems { base, ext, json } => {
            cli::stems::handle_stems(&base, ext.as_deref(), json)?;
        }
        Commands::Play {
            base,
            json,
            submit,
            ext,
        } => {
            cli::play::handle_play(cli::play::PlayArgs {
                base: base.as_deref(),
                json: json.as_deref(),
                submit: submit.as_deref(),
                extension: ext.as_deref(),
            })?;
        }
    }

    Ok(())
}
