use clap::{Parser, Subcommand};
use powerband::cli::run::OutputFormat;
use powerband::config::{load_config, resolve_config_path};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "powerband")]
#[command(about = "Monthly power band distribution", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the distribution once and print it
    Run {
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config
    Init {
        #[arg(long)]
        stdout: bool,
    },
    /// Set one field, e.g. `analysis.months 24`
    Set { field: String, value: String },
    /// Check that the config loads
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Resolve config path
    let config_path = resolve_config_path(cli.config.as_deref());

    // Loaded once; the debug switch picks the default filter, RUST_LOG still wins
    let loaded = config_path.as_deref().map(load_config);
    let default_directive = match &loaded {
        Some(Ok(config)) => config.log_directive(),
        _ => "powerband=info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Some(Commands::Run { json }) => {
            let format = if json { OutputFormat::Json } else { OutputFormat::Text };
            powerband::cli::run::run(loaded, format).await?;
        }
        None => {
            // Default behavior is a text run
            powerband::cli::run::run(loaded, OutputFormat::Text).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                powerband::cli::config::init(stdout)?;
            }
            ConfigAction::Set { field, value } => {
                powerband::cli::config::set(config_path, &field, &value)?;
            }
            ConfigAction::Validate => {
                powerband::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
