//! tally — a Discord counting-game bot.

use std::sync::Arc;

use {
    anyhow::Context as _,
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    tally_counting::{CounterStore, CountingEngine, store_file::FileStore},
    tally_discord::build_client,
};

#[derive(Parser)]
#[command(name = "tally", about = "tally — Discord counting-game bot", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Config file path (overrides discovery in ./ and ~/.config/tally/).
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Directory for the counter state file (overrides config value).
    #[arg(long, env = "TALLY_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match &cli.config {
        Some(path) => tally_config::load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => tally_config::discover_and_load(),
    };

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| tally_config::data_dir(&config));
    let store = Arc::new(FileStore::in_dir(&data_dir));
    // A present-but-malformed counter file refuses to start the process.
    store
        .load()
        .await
        .context("loading counter state; fix or remove the file to start")?;
    info!(data_dir = %data_dir.display(), "counter state loaded");

    let engine = Arc::new(CountingEngine::new(
        store.clone(),
        config.milestones.clone(),
    ));

    let mut client = build_client(&config.discord, engine)
        .await
        .context("building Discord client")?;
    info!("connecting to Discord gateway");
    client.start().await.context("gateway connection failed")?;
    Ok(())
}
