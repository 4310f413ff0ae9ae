//! The tick loop: click, collect, read, buy, report.

use std::fmt;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::InteractionAdapter;
use crate::click::{click_with_retry, ClickMode, ClickRequest};
use crate::config::{BotConfig, ConfigError, Selectors};
use crate::decision::{decide, PurchaseCandidate, PurchaseKind, Thresholds};
use crate::errors::{InteractionError, ReadError};
use crate::metrics::{self, MetricsSnapshot};
use crate::reader::{GameSnapshot, GameStateReader, ProductionRate};
use crate::timer::SessionTimer;
use crate::wait::WaitSpec;

/// Currency and production rate as of the latest successful read.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressReport {
    pub currency: Option<f64>,
    pub production_rate: ProductionRate,
}

impl ProgressReport {
    fn from_snapshot(snapshot: Option<&GameSnapshot>) -> Self {
        match snapshot {
            Some(snapshot) => Self {
                currency: Some(snapshot.effective_currency()),
                production_rate: snapshot.production_rate.clone(),
            },
            None => Self {
                currency: None,
                production_rate: ProductionRate::Unavailable,
            },
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency {
            Some(currency) => write!(f, "Total cookies: {currency}")?,
            None => f.write_str("Total cookies: unknown")?,
        }
        write!(f, ", cookies per second: {}", self.production_rate)
    }
}

/// What a single tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub purchase: Option<PurchaseKind>,
    pub report: Option<ProgressReport>,
    pub ended: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Deadline => f.write_str("deadline"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub ticks: u64,
    pub reports: u64,
    pub last_snapshot: Option<GameSnapshot>,
    pub thresholds: Thresholds,
    pub stop: StopReason,
    pub metrics: MetricsSnapshot,
}

pub struct ControlLoop<'a, A: InteractionAdapter> {
    adapter: &'a A,
    reader: GameStateReader,
    selectors: Selectors,
    click_wait: WaitSpec,
    thresholds: Thresholds,
    timer: SessionTimer,
    last_snapshot: Option<GameSnapshot>,
    ticks: u64,
    reports: u64,
}

impl<'a, A: InteractionAdapter> ControlLoop<'a, A> {
    /// Builds the loop and starts the session clock.
    pub fn new(adapter: &'a A, config: &BotConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            adapter,
            reader: GameStateReader::new(config.selectors.clone(), config.rate_wait()),
            selectors: config.selectors.clone(),
            click_wait: config.click_wait(),
            thresholds: config.thresholds()?,
            timer: SessionTimer::start(config.report_interval(), config.session_length()),
            last_snapshot: None,
            ticks: 0,
            reports: 0,
        })
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_snapshot(&self) -> Option<&GameSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Tick until the deadline passes or `cancel` fires. Only a lost session is an error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<SessionSummary, InteractionError> {
        let stop = loop {
            if cancel.is_cancelled() {
                info!("Interrupted; stopping after {} ticks", self.ticks);
                break StopReason::Cancelled;
            }
            if self.tick().await?.ended {
                info!(ticks = self.ticks, "Time's up");
                break StopReason::Deadline;
            }
            tokio::task::yield_now().await;
        };

        Ok(SessionSummary {
            ticks: self.ticks,
            reports: self.reports,
            last_snapshot: self.last_snapshot.clone(),
            thresholds: self.thresholds,
            stop,
            metrics: metrics::snapshot(),
        })
    }

    pub async fn tick(&mut self) -> Result<TickReport, InteractionError> {
        let mut report = TickReport::default();

        self.click_accumulator().await?;
        self.collect_bonus().await?;

        if let Some(snapshot) = self.read_state().await? {
            report.purchase = self.buy(&snapshot).await?;
            self.last_snapshot = Some(snapshot);
        }

        let advance = self.timer.advance(Instant::now());
        if advance.report_due {
            let progress = ProgressReport::from_snapshot(self.last_snapshot.as_ref());
            info!(
                currency = progress.currency.unwrap_or_default(),
                production_rate = %progress.production_rate,
                "{progress}"
            );
            self.reports += 1;
            report.report = Some(progress);
        }
        report.ended = advance.ended();

        self.ticks += 1;
        metrics::record_tick();
        Ok(report)
    }

    /// Only a lost session escapes; anything else is logged and the tick goes on.
    async fn click_accumulator(&self) -> Result<(), InteractionError> {
        let adapter = self.adapter;
        let selector = &self.selectors.accumulator;
        let result = click_with_retry(
            adapter,
            ClickRequest::new("accumulator"),
            move || adapter.find(selector),
            self.click_wait,
        )
        .await;

        match result {
            Ok(outcome) if outcome.is_success() => metrics::record_accumulator_click(),
            Ok(_) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => warn!(%err, "accumulator click failed"),
        }
        Ok(())
    }

    /// One attempt at the newest bonus object; most ticks there is none.
    async fn collect_bonus(&self) -> Result<(), InteractionError> {
        let bonus = match self.adapter.find_all(&self.selectors.bonus).await {
            Ok(mut found) => found.pop(),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(%err, "bonus lookup failed");
                None
            }
        };
        let Some(bonus) = bonus else {
            return Ok(());
        };

        match self.adapter.move_and_click(&bonus).await {
            Ok(()) => {
                metrics::record_bonus_click();
                info!("Collected a golden cookie");
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => debug!(%err, "bonus click missed"),
        }
        Ok(())
    }

    async fn read_state(&self) -> Result<Option<GameSnapshot>, InteractionError> {
        match self.reader.read(self.adapter).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(ReadError::Interaction(err)) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(%err, "skipping purchase decision this tick");
                metrics::record_unavailable_state();
                Ok(None)
            }
        }
    }

    async fn buy(&mut self, snapshot: &GameSnapshot) -> Result<Option<PurchaseKind>, InteractionError> {
        let candidates = match self.reader.candidates(self.adapter).await {
            Ok(candidates) => candidates,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(%err, "could not list purchasables");
                return Ok(None);
            }
        };

        let Some(candidate) = decide(snapshot, &self.thresholds, candidates).into_purchase() else {
            return Ok(None);
        };
        self.purchase(candidate).await
    }

    async fn purchase(
        &mut self,
        candidate: PurchaseCandidate<A::Element>,
    ) -> Result<Option<PurchaseKind>, InteractionError> {
        let PurchaseCandidate { kind, handle } = candidate;
        let adapter = self.adapter;
        let reader = &self.reader;
        let result = click_with_retry(
            adapter,
            ClickRequest::new(kind.as_str())
                .with_initial(handle)
                .with_mode(ClickMode::MoveAndClick),
            move || reader.candidate(adapter, kind),
            self.click_wait,
        )
        .await;

        match result {
            Ok(outcome) if outcome.is_success() => {}
            Ok(_) => return Ok(None),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(%err, %kind, "purchase click failed");
                return Ok(None);
            }
        }

        self.thresholds.record_purchase(kind);
        metrics::record_purchase(kind);
        info!(
            %kind,
            buy_building_at = self.thresholds.buy_building_at(),
            buy_upgrade_at = self.thresholds.buy_upgrade_at(),
            "Bought {kind}"
        );

        if kind == PurchaseKind::Building {
            self.reveal_locked_building().await;
        }
        Ok(Some(kind))
    }

    /// Keep the next locked building in view. Purely cosmetic, so every failure is dropped.
    async fn reveal_locked_building(&self) {
        let target = match self.adapter.find_all(&self.selectors.locked_building).await {
            Ok(mut locked) if locked.len() >= 2 => Some(locked.swap_remove(1)),
            Ok(_) => self
                .adapter
                .find(&self.selectors.fallback_anchor)
                .await
                .unwrap_or_default(),
            Err(err) => {
                debug!(%err, "locked building lookup failed");
                None
            }
        };

        if let Some(target) = target {
            if let Err(err) = self.adapter.move_to(&target).await {
                debug!(%err, "pointer move failed");
            }
        }
    }
}
