//! Tokobot - Automated Play-Session Bot
//!
//! Command-line entry point. Loads configuration, wires the gateway and
//! orchestrator from `tokobot-core`, and runs the session until Ctrl-C or
//! SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (tokens.json and data.txt in the working directory)
//! tokobot
//!
//! # With a config file
//! tokobot --config ~/.config/tokobot/config.toml
//!
//! # Override credential locations
//! tokobot --token-file /tmp/tokens.json --data-file /tmp/data.txt
//!
//! # Verbose logging
//! RUST_LOG=debug tokobot
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: graceful shutdown at the next timer boundary

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use tokobot_core::{
    shutdown_pair, ApiGateway, BotConfig, ChannelSink, ConfigSource, CredentialStore,
    IdentityResolver, Orchestrator, TimerSettings, UniformScorePolicy,
};

/// Tokobot - automated play-session bot
#[derive(Parser, Debug)]
#[command(name = "tokobot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "TOKOBOT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Remote API root, overriding the configured value
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Credential file path, overriding the configured value
    #[arg(long, value_name = "PATH")]
    token_file: Option<PathBuf>,

    /// Init-data file path, overriding the configured value
    #[arg(long, value_name = "PATH")]
    data_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "TOKOBOT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("tokobot={level},tokobot_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_cli_overrides(config: &mut BotConfig, args: &Args) {
    if let Some(ref base_url) = args.base_url {
        config.base_url = base_url.clone();
        config.set_source(ConfigSource::Cli);
    }
    if let Some(ref token_file) = args.token_file {
        config.token_file = token_file.clone();
        config.set_source(ConfigSource::Cli);
    }
    if let Some(ref data_file) = args.data_file {
        config.init_data_file = data_file.clone();
        config.set_source(ConfigSource::Cli);
    }
}

/// Whether any credential source exists: a stored token or a readable
/// init-data payload. Startup without a resolved identity is only fatal
/// when both are absent.
fn has_credential_source(config: &BotConfig) -> bool {
    CredentialStore::new(&config.token_file).load().is_some()
        || IdentityResolver::new(&config.init_data_file).raw().is_some()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Tokobot starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = BotConfig::load_or_default(args.config.clone());
    apply_cli_overrides(&mut config, &args);
    config.validate()?;
    info!(source = %config.source(), base_url = %config.base_url, "Configuration loaded");

    let gateway = ApiGateway::new(&config);
    if gateway.user_id().is_none() {
        if !has_credential_source(&config) {
            bail!(
                "No user identity and no credential source: could not read {} \
                 and no token is stored at {}. Place the init-data payload and retry.",
                config.init_data_file.display(),
                config.token_file.display()
            );
        }
        warn!(
            path = %config.init_data_file.display(),
            "No user identity resolved; identity-scoped calls will fail and be retried"
        );
    }

    let (handle, shutdown) = shutdown_pair();

    // Graceful shutdown on Ctrl-C or SIGTERM
    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, initiating shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown");
            }
        }
        handle.trigger();
    });

    let (sink, mut status_rx) = ChannelSink::new();
    tokio::spawn(async move {
        while let Some(stats) = status_rx.recv().await {
            let line = stats
                .labeled_metrics()
                .iter()
                .map(|(label, value)| format!("{label}: {value}"))
                .collect::<Vec<_>>()
                .join(" | ");
            info!("{line}");
        }
    });

    let orchestrator = Orchestrator::new(
        gateway,
        UniformScorePolicy::from_config(&config.game),
        sink,
        TimerSettings::from_game(&config.game),
        shutdown,
    );

    let stats = orchestrator.run().await;

    info!("Session summary:");
    for (label, value) in stats.labeled_metrics() {
        info!("  {label}: {value}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> BotConfig {
        let mut config = BotConfig::default();
        config.token_file = dir.path().join("tokens.json");
        config.init_data_file = dir.path().join("data.txt");
        config
    }

    #[test]
    fn test_stored_token_is_a_credential_source() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        CredentialStore::new(&config.token_file).save("tok").unwrap();
        assert!(has_credential_source(&config));
    }

    #[test]
    fn test_init_data_is_a_credential_source() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        // Even an unparsable payload can still back a token exchange
        std::fs::write(&config.init_data_file, "query_id=AAF0x1&hash=deadbeef").unwrap();
        assert!(has_credential_source(&config));
    }

    #[test]
    fn test_no_sources_means_unrecoverable_startup() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        assert!(!has_credential_source(&config));
    }
}
