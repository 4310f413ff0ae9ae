use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use cdp_adapter::metrics as cdp_metrics;
use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing::error;

use crate::decision::PurchaseKind;

/// Session totals, logged with the summary when the loop ends.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub accumulator_clicks: u64,
    pub bonus_clicks: u64,
    pub buildings_bought: u64,
    pub upgrades_bought: u64,
    pub retries_exhausted: u64,
    pub unavailable_state_ticks: u64,
}

static TICKS: AtomicU64 = AtomicU64::new(0);
static ACCUMULATOR_CLICKS: AtomicU64 = AtomicU64::new(0);
static BONUS_CLICKS: AtomicU64 = AtomicU64::new(0);
static BUILDINGS: AtomicU64 = AtomicU64::new(0);
static UPGRADES: AtomicU64 = AtomicU64::new(0);
static RETRIES_EXHAUSTED: AtomicU64 = AtomicU64::new(0);
static UNAVAILABLE_STATE: AtomicU64 = AtomicU64::new(0);

static REGISTER_ONCE: Once = Once::new();

lazy_static! {
    static ref GLOBAL_REGISTRY: Registry = Registry::new();
    static ref TICKS_TOTAL: IntCounter =
        IntCounter::new("clicker_ticks_total", "Control loop ticks completed").unwrap();
    static ref CLICKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("clicker_clicks_total", "Successful clicks by target"),
        &["target"]
    )
    .unwrap();
    static ref PURCHASES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("clicker_purchases_total", "Completed purchases by kind"),
        &["kind"]
    )
    .unwrap();
    static ref RETRY_EXHAUSTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "clicker_retry_exhausted_total",
            "Clicks abandoned after the retry window elapsed"
        ),
        &["target"]
    )
    .unwrap();
    static ref UNAVAILABLE_STATE_TOTAL: IntCounter = IntCounter::new(
        "clicker_state_unavailable_total",
        "Ticks whose game state could not be read"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector)) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register bot metric");
        }
    }
}

pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let registry = global_registry();
        register(registry, TICKS_TOTAL.clone());
        register(registry, CLICKS_TOTAL.clone());
        register(registry, PURCHASES_TOTAL.clone());
        register(registry, RETRY_EXHAUSTED_TOTAL.clone());
        register(registry, UNAVAILABLE_STATE_TOTAL.clone());
        cdp_metrics::register_metrics(registry);
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Prometheus text exposition of everything registered.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&global_registry().gather(), &mut buffer) {
        error!(?err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    TICKS_TOTAL.inc();
}

pub fn record_accumulator_click() {
    ACCUMULATOR_CLICKS.fetch_add(1, Ordering::Relaxed);
    CLICKS_TOTAL.with_label_values(&["accumulator"]).inc();
}

pub fn record_bonus_click() {
    BONUS_CLICKS.fetch_add(1, Ordering::Relaxed);
    CLICKS_TOTAL.with_label_values(&["bonus"]).inc();
}

pub fn record_purchase(kind: PurchaseKind) {
    match kind {
        PurchaseKind::Building => BUILDINGS.fetch_add(1, Ordering::Relaxed),
        PurchaseKind::Upgrade => UPGRADES.fetch_add(1, Ordering::Relaxed),
    };
    PURCHASES_TOTAL.with_label_values(&[kind.as_str()]).inc();
}

pub fn record_retry_exhausted(target: &str) {
    RETRIES_EXHAUSTED.fetch_add(1, Ordering::Relaxed);
    RETRY_EXHAUSTED_TOTAL.with_label_values(&[target]).inc();
}

pub fn record_unavailable_state() {
    UNAVAILABLE_STATE.fetch_add(1, Ordering::Relaxed);
    UNAVAILABLE_STATE_TOTAL.inc();
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        ticks: TICKS.load(Ordering::Relaxed),
        accumulator_clicks: ACCUMULATOR_CLICKS.load(Ordering::Relaxed),
        bonus_clicks: BONUS_CLICKS.load(Ordering::Relaxed),
        buildings_bought: BUILDINGS.load(Ordering::Relaxed),
        upgrades_bought: UPGRADES.load(Ordering::Relaxed),
        retries_exhausted: RETRIES_EXHAUSTED.load(Ordering::Relaxed),
        unavailable_state_ticks: UNAVAILABLE_STATE.load(Ordering::Relaxed),
    }
}
