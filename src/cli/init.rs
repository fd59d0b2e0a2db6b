use owo_colors::OwoColorize;
use std::error::Error;
use stemdeck::config::Config;

pub fn handle_init(api_base_url: Option<&str>) -> Result<(), Box<dyn Error>> {
    if Config::exists()? {
        return Err(
            "stemdeck is already initialized. Use 'stemdeck config set <key> <value>' to change it."
                .into(),
        );
    }

    let mut config = Config::new();
    if let Some(url) = api_base_url {
        config.set_value("api_base_url", url)?;
    }
    config.save()?;

    println!("{} stemdeck initialized", "✓".green());
    println!("  Backend: {}", config.api_base_url.cyan());
    println!(
        "  Configuration saved to: {}",
        Config::config_path()?.display()
    );

    Ok(())
}
