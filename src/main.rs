use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use socratic::{config::GatewayConfig, server, utils::log::Logger};

#[derive(Parser, Debug)]
#[command(name = "socratic", about = "Socratic tutor completion gateway")]
struct Args {
    /// Path to the config file (or a directory containing config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long)]
    log_level: Option<LevelFilter>,

    /// Fallback API key when neither the config nor the caller provide one
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    Logger::init(args.log_level);

    let config = GatewayConfig::read(args.config)?;
    let credential = config.default_credential(args.api_key);

    if credential.is_none() {
        log::warn!("no default API key configured, callers must provide their own");
    }

    let state = server::AppState::from_config(&config, credential)?;

    server::serve(&config, state).await
}
