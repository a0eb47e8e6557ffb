//! pricesync - real-time price synchronization client.

use anyhow::Result;
use clap::Parser;
use pricesync_core::Symbol;
use tracing::info;

/// Real-time price synchronization client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PRICESYNC_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Symbol to track; repeat to track several (overrides config)
    #[arg(short, long = "symbol")]
    symbols: Vec<String>,

    /// Page origin the stream URL is derived from (overrides config)
    #[arg(long)]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    pricesync_ws::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > PRICESYNC_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PRICESYNC_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config = pricesync_app::AppConfig::from_file(&config_path)?;

    match config.telemetry.log_level.as_deref() {
        Some(level) => pricesync_telemetry::init_logging_with_level(level)?,
        None => pricesync_telemetry::init_logging()?,
    }
    info!("Starting pricesync v{}", env!("CARGO_PKG_VERSION"));

    if !args.symbols.is_empty() {
        config.symbols = args
            .symbols
            .iter()
            .map(Symbol::parse)
            .collect::<pricesync_core::Result<Vec<_>>>()?;
    }
    if let Some(origin) = args.origin {
        config.origin = origin;
    }

    info!(
        config_path = %config_path,
        origin = %config.origin,
        symbols = ?config.symbols.iter().map(Symbol::as_str).collect::<Vec<_>>(),
        "Configuration loaded"
    );

    let app = pricesync_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
