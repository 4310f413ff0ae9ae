use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::env::CliArgs;
use super::runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig};
use crate::adapter::CdpConnector;
use crate::metrics;
use crate::session::run_session;

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    let _log_guard = init_logging(&cli.log_level, cli.debug, cli.log_format, &cli.log_dir)?;
    metrics::register_metrics();

    info!(
        "Starting clicker-bot v{} ({} built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE")
    );

    let LoadedConfig { mut config, path } = load_config(cli.config.as_ref()).await?;
    cli.apply(&mut config);
    info!(
        config = ?path,
        game_time_minutes = config.session.game_time_minutes,
        report_every_minutes = config.session.report_every_minutes,
        endpoint = %config.backend.endpoint,
        "Configuration ready"
    );

    let cancel = CancellationToken::new();
    let listener = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Ctrl-C received; finishing the current tick");
                    cancel.cancel();
                }
                Err(err) => error!(?err, "failed to listen for Ctrl-C"),
            }
        })
    };

    let connector = CdpConnector::new(config.cdp_config());
    let result = run_session(&connector, &config, &cancel).await;
    listener.abort();

    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            error!("Bot stopped: {}", err);
            Err(err.into())
        }
    }
}
