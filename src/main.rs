//! HTTP Mock Server - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use http_mock_server::{server, Config};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "http-mock-server",
    about = "Configurable HTTP mock server - declarative request matching and response stubbing",
    version
)]
struct Args {
    /// Path to configuration file (default: search config.yaml, config/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Print example config if requested
    if args.print_config {
        print!("{}", include_str!("../config.example.yaml"));
        return Ok(());
    }

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::from_file(path)?
        }
        None => Config::load()?,
    };
    config.validate()?;

    // Validate and exit if requested
    if args.validate {
        println!(
            "Configuration is valid ({} request rules defined)",
            config.requests.len()
        );
        return Ok(());
    }

    let mut config = config;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        rules = config.requests.len(),
        "starting HTTP mock server"
    );
    for (i, rule) in config.requests.iter().enumerate() {
        debug!(
            rule = i,
            path = %rule.path,
            method = %rule.method,
            headers = rule.headers.len(),
            query_params = rule.query_params.len(),
            "loaded rule"
        );
    }

    server::run(config).await
}
