//! One bot session: acquire the browser, bring the game up, run the loop, always close.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapter::{Connector, InteractionAdapter, Selector};
use crate::config::{BotConfig, Selectors};
use crate::control::{ControlLoop, SessionSummary, StopReason};
use crate::errors::{BotError, InteractionError};
use crate::metrics;

pub async fn run_session<C: Connector>(
    connector: &C,
    config: &BotConfig,
    cancel: &CancellationToken,
) -> Result<SessionSummary, BotError> {
    config.validate()?;

    if !config.session.connect_delay.is_zero() {
        info!(
            delay = %humantime::format_duration(config.session.connect_delay),
            "Waiting for the browser to come up"
        );
        pause(config.session.connect_delay, cancel).await;
    }
    if cancel.is_cancelled() {
        info!("Interrupted before connecting");
        let summary = SessionSummary {
            ticks: 0,
            reports: 0,
            last_snapshot: None,
            thresholds: config.thresholds()?,
            stop: StopReason::Cancelled,
            metrics: metrics::snapshot(),
        };
        log_summary(&summary);
        return Ok(summary);
    }

    let adapter = match connector.connect().await {
        Ok(adapter) => adapter,
        Err(err) => {
            error!(
                %err,
                endpoint = %config.backend.endpoint,
                "Can't connect to the browser. Make sure it is running with remote debugging enabled and reachable at the configured endpoint"
            );
            return Err(err);
        }
    };
    info!(endpoint = %config.backend.endpoint, "Connected to the browser");

    let result = play(&adapter, config, cancel).await;
    if let Err(err) = adapter.close().await {
        warn!(%err, "failed to close the browser session");
    }

    match &result {
        Ok(summary) => log_summary(summary),
        Err(err) => error!(%err, "session aborted"),
    }
    result
}

async fn play<A: InteractionAdapter>(
    adapter: &A,
    config: &BotConfig,
    cancel: &CancellationToken,
) -> Result<SessionSummary, BotError> {
    adapter.navigate(&config.game_url).await?;
    info!(url = %config.game_url, "Opened the game");
    pause(config.session.settle_delay, cancel).await;

    prepare_game(adapter, &config.selectors).await?;
    info!("The game has been started");

    let mut control = ControlLoop::new(adapter, config)?;
    Ok(control.run(cancel).await?)
}

/// Dismiss the language prompt shown on first visit. Missing buttons are fine.
pub async fn prepare_game<A: InteractionAdapter>(
    adapter: &A,
    selectors: &Selectors,
) -> Result<(), InteractionError> {
    for selector in [&selectors.language_button, &selectors.prompt_close] {
        click_if_present(adapter, selector).await?;
    }
    Ok(())
}

async fn click_if_present<A: InteractionAdapter>(
    adapter: &A,
    selector: &Selector,
) -> Result<(), InteractionError> {
    let result = match adapter.find(selector).await {
        Ok(Some(element)) => adapter.click(&element).await,
        Ok(None) => {
            debug!(%selector, "not on the page; skipping");
            return Ok(());
        }
        Err(err) => Err(err),
    };
    match result {
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            warn!(%err, %selector, "could not click");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

async fn pause(duration: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = sleep(duration) => {}
        _ = cancel.cancelled() => debug!("pause interrupted"),
    }
}

fn log_summary(summary: &SessionSummary) {
    let currency = summary
        .last_snapshot
        .as_ref()
        .map(|snapshot| snapshot.effective_currency())
        .unwrap_or_default();
    info!(
        stop = %summary.stop,
        ticks = summary.ticks,
        reports = summary.reports,
        currency,
        buy_building_at = summary.thresholds.buy_building_at(),
        buy_upgrade_at = summary.thresholds.buy_upgrade_at(),
        buildings_bought = summary.metrics.buildings_bought,
        upgrades_bought = summary.metrics.upgrades_bought,
        bonus_clicks = summary.metrics.bonus_clicks,
        retries_exhausted = summary.metrics.retries_exhausted,
        "Session finished"
    );
    debug!(metrics = %metrics::render(), "final metrics");
}
