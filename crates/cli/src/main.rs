//! cascade-config - resolve a configuration cascade and print the result

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod settings;

use app::Application;
use settings::{OutputFormat, Overrides, Settings, DEFAULT_SETTINGS_FILE};

/// Resolve a cascade manifest into one configuration tree
#[derive(Debug, Parser)]
#[command(name = "cascade-config", version, about)]
struct Cli {
    /// Cascade manifest to resolve
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Environment name exposed to templates as `{env}`
    #[arg(short, long = "env")]
    env_name: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Print only the value at this path (e.g. `db.hosts[0]`)
    #[arg(short, long)]
    get: Option<String>,

    /// Log level filter
    #[arg(long)]
    log_level: Option<String>,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Flags handed to `args` sources, after `--`
    #[arg(last = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_result = dotenvy::dotenv();

    let cli = Cli::parse();
    let overrides = Overrides {
        manifest: cli.manifest.clone(),
        env_name: cli.env_name.clone(),
        output_format: cli.output,
        log_level: cli.log_level.clone(),
    };
    let settings = Settings::load(&cli.settings, &overrides).context("Failed to load settings")?;

    init_logging(&settings)?;

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded environment variables from .env file"),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not load .env file: {}", e),
    }

    let app = Application::new(settings).context("Failed to create application")?;
    let output = app.run(cli.get.as_deref(), &cli.args).await?;
    println!("{}", output);
    Ok(())
}

/// Initialize logging to stderr so stdout carries only the rendered tree
fn init_logging(settings: &Settings) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level));

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.log_format.clone());
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "pretty" => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        _ => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    if settings.log_level == "trace" || settings.log_level == "debug" {
        warn!("Debug/trace logging enabled - output includes per-source detail");
    }

    Ok(())
}
