use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{
    apply_update, generate::generate_starter_config, load_config, save_config, user_config_path,
    ConfigField, SYSTEM_CONFIG_PATH,
};

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Prefer ~/.config/powerband/config.yml, fall back to /etc/powerband/config.yml
    let config_path = match user_config_path() {
        Some(user_config) => match user_config.parent().map(fs::create_dir_all) {
            Some(Err(_)) => {
                eprintln!("Warning: Could not create directory for {}", user_config.display());
                eprintln!("Falling back to {}", SYSTEM_CONFIG_PATH);
                PathBuf::from(SYSTEM_CONFIG_PATH)
            }
            _ => user_config,
        },
        None => PathBuf::from(SYSTEM_CONFIG_PATH),
    };

    if config_path.exists() {
        eprintln!(
            "Error: Config file already exists at {}",
            config_path.display()
        );
        eprintln!("Remove it first or use --stdout to print the config");
        std::process::exit(1);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// Change one field of an existing config file in place.
pub fn set(config_path: Option<PathBuf>, field: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;
    let field: ConfigField = field.parse()?;

    let updated = set_field(&path, field, value)?;
    info!(field = %field, path = %path.display(), "Config updated");

    println!("{} updated in {}", field, path.display());
    if field.triggers_recompute() {
        println!(
            "Run 'powerband run' to recompute the distribution for series '{}'",
            updated.series.id
        );
    }
    Ok(())
}

fn set_field(path: &Path, field: ConfigField, value: &str) -> Result<crate::config::Config, crate::config::ConfigError> {
    let config = load_config(path)?;
    let updated = apply_update(&config, field, value)?;
    save_config(&updated, path)?;
    Ok(updated)
}

pub fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;

    println!("Validating config file: {}", path.display());

    match load_config(&path) {
        Ok(_) => {
            println!("✓ Config is valid");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Config validation failed:\n{}", e);
            std::process::exit(1);
        }
    }
}
