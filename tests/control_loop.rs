mod support;

use std::time::Duration;

use clicker_bot::config::BotConfig;
use clicker_bot::control::{ControlLoop, StopReason};
use clicker_bot::decision::{PurchaseKind, Thresholds};
use clicker_bot::errors::{BotError, InteractionError};
use clicker_bot::reader::ProductionRate;
use clicker_bot::session::run_session;
use support::{FakeAdapter, FakeConnector};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const BUILDINGS: &str = "div .product.unlocked.enabled";
const UPGRADES: &str = "div .crate.upgrade.enabled";
const LOCKED: &str = "div .product.locked.disabled";

fn short_session(minutes: u64) -> BotConfig {
    let mut config = BotConfig::default();
    config.session.game_time_minutes = minutes;
    config.session.report_every_minutes = 1;
    config
}

#[tokio::test(start_paused = true)]
async fn building_purchase_updates_thresholds_and_reveals_next_locked() {
    let fake = FakeAdapter::cookie_page("1,234 million cookies");
    fake.set_elements(BUILDINGS, &["cursor", "grandma"]);
    fake.set_elements(UPGRADES, &["reinforced-finger"]);
    fake.set_elements(LOCKED, &["farm", "mine", "factory"]);

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let tick = control.tick().await.unwrap();

    assert_eq!(tick.purchase, Some(PurchaseKind::Building));
    assert_eq!(control.thresholds(), Thresholds::new(300, 1240).unwrap());
    assert_eq!(fake.clicks(), vec!["cookie".to_string(), "grandma".to_string()]);
    assert_eq!(fake.moves(), vec!["grandma".to_string(), "mine".to_string()]);
    assert_eq!(
        control.last_snapshot().map(|s| s.effective_currency()),
        Some(1_234_000_000.0)
    );
}

#[tokio::test(start_paused = true)]
async fn few_locked_buildings_fall_back_to_the_anchor() {
    let fake = FakeAdapter::cookie_page("500 cookies");
    fake.set_elements(BUILDINGS, &["cursor"]);
    fake.set_elements(LOCKED, &["farm"]);
    fake.set_elements("#support", &["support"]);

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    control.tick().await.unwrap();

    assert_eq!(fake.moves(), vec!["cursor".to_string(), "support".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn upgrade_purchase_leaves_thresholds_alone() {
    let fake = FakeAdapter::cookie_page("2,000 cookies");
    fake.set_elements(UPGRADES, &["reinforced-finger", "carpal-tunnel"]);

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let tick = control.tick().await.unwrap();

    assert_eq!(tick.purchase, Some(PurchaseKind::Upgrade));
    assert_eq!(control.thresholds(), Thresholds::default());
    assert!(fake.clicks().contains(&"carpal-tunnel".to_string()));
    assert_eq!(fake.moves(), vec!["carpal-tunnel".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn failed_purchase_keeps_thresholds() {
    let fake = FakeAdapter::cookie_page("1,234 million cookies");
    fake.set_elements(BUILDINGS, &["grandma"]);
    fake.fail_clicks("grandma", InteractionError::Intercepted("tooltip".into()));

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let started = Instant::now();
    let tick = control.tick().await.unwrap();

    assert_eq!(tick.purchase, None);
    assert_eq!(control.thresholds(), Thresholds::default());
    assert!(started.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn bonus_object_is_moved_to_and_clicked() {
    let fake = FakeAdapter::cookie_page("5 cookies");
    fake.set_elements("#shimmers > div", &["golden-a", "golden-b"]);

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    control.tick().await.unwrap();

    assert_eq!(fake.moves(), vec!["golden-b".to_string()]);
    assert!(fake.clicks().contains(&"golden-b".to_string()));
}

#[tokio::test(start_paused = true)]
async fn missed_bonus_does_not_disturb_the_tick() {
    let fake = FakeAdapter::cookie_page("5 cookies");
    fake.set_elements("#shimmers > div", &["golden"]);
    fake.fail_clicks("golden", InteractionError::Stale("faded".into()));

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let started = Instant::now();
    control.tick().await.unwrap();

    assert_eq!(fake.attempts().iter().filter(|name| *name == "golden").count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn unreadable_state_skips_the_purchase() {
    let fake = FakeAdapter::new();
    fake.set_elements("#bigCookie", &["cookie"]);
    fake.set_elements(BUILDINGS, &["cursor"]);

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let tick = control.tick().await.unwrap();

    assert_eq!(tick.purchase, None);
    assert_eq!(fake.clicks(), vec!["cookie".to_string()]);
    assert!(control.last_snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn exhausted_accumulator_click_does_not_end_the_tick() {
    let fake = FakeAdapter::cookie_page("5 cookies");
    fake.fail_clicks("cookie", InteractionError::Intercepted("prompt".into()));

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let started = Instant::now();
    control.tick().await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(20));
    assert_eq!(control.ticks(), 1);
    assert!(control.last_snapshot().is_some());
}

#[tokio::test(start_paused = true)]
async fn backend_error_on_the_accumulator_keeps_the_session_going() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    fake.set_click_latency(Duration::from_secs(1));
    fake.script_clicks(
        "cookie",
        vec![Err(InteractionError::Backend("Request timed out.".into()))],
    );

    let config = short_session(1);
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let summary = control.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.stop, StopReason::Deadline);
    assert_eq!(summary.ticks, 60);
    assert_eq!(fake.attempts().iter().filter(|name| *name == "cookie").count(), 60);
    assert_eq!(fake.clicks().len(), 59);
    assert!(summary.last_snapshot.is_some());
}

#[tokio::test(start_paused = true)]
async fn lost_session_ends_the_tick_with_an_error() {
    let fake = FakeAdapter::cookie_page("5 cookies");
    fake.fail_clicks("cookie", InteractionError::Disconnected("ws closed".into()));

    let config = BotConfig::default();
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let err = control.tick().await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn three_minute_session_reports_each_minute() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    fake.set_click_latency(Duration::from_secs(1));

    let config = short_session(3);
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let summary = control.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.stop, StopReason::Deadline);
    assert_eq!(summary.ticks, 180);
    assert_eq!(summary.reports, 3);
    assert_eq!(
        summary.last_snapshot.map(|s| s.production_rate),
        Some(ProductionRate::Known("per second : 1.5".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn report_carries_the_latest_snapshot() {
    let fake = FakeAdapter::cookie_page("2.5 billion cookies");
    fake.set_click_latency(Duration::from_secs(30));

    let config = short_session(10);
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    assert!(control.tick().await.unwrap().report.is_none());
    let report = control.tick().await.unwrap().report.unwrap();
    assert_eq!(report.currency, Some(2_500_000_000.0));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_ticks() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = short_session(0);
    let mut control = ControlLoop::new(&fake, &config).unwrap();
    let summary = control.run(&cancel).await.unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.ticks, 0);
    assert!(fake.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn session_bootstraps_plays_and_closes() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    fake.set_elements("#changeLanguage", &["english"]);
    fake.set_elements("#promptClose", &["close-prompt"]);
    fake.set_click_latency(Duration::from_secs(1));
    let connector = FakeConnector::new(fake.clone());

    let config = short_session(1);
    let summary = run_session(&connector, &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.stop, StopReason::Deadline);
    assert_eq!(summary.ticks, 60);
    assert_eq!(fake.navigations(), vec![config.game_url.clone()]);
    assert_eq!(&fake.clicks()[..3], ["english", "close-prompt", "cookie"]);
    assert_eq!(fake.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_still_closes_the_browser() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    fake.fail_navigation(InteractionError::Backend("net::ERR_NAME_NOT_RESOLVED".into()));
    let connector = FakeConnector::new(fake.clone());

    let err = run_session(&connector, &short_session(1), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::Interaction(InteractionError::Backend(_))));
    assert_eq!(fake.close_count(), 1);
    assert!(fake.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn lost_session_mid_game_still_closes_the_browser() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    fake.fail_clicks("cookie", InteractionError::Disconnected("target crashed".into()));
    let connector = FakeConnector::new(fake.clone());

    let err = run_session(&connector, &short_session(1), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::Interaction(InteractionError::Disconnected(_))));
    assert_eq!(fake.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreachable_backend_never_enters_the_loop() {
    let connector = FakeConnector::refusing();
    let err = run_session(&connector, &short_session(1), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::Connect(_)));
    assert_eq!(connector.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_configuration_is_rejected_before_connecting() {
    let connector = FakeConnector::new(FakeAdapter::new());
    let mut config = short_session(1);
    config.session.report_every_minutes = 0;

    let err = run_session(&connector, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::Config(_)));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_the_settle_pause_skips_the_loop_and_closes() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    let connector = FakeConnector::new(fake.clone());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = run_session(&connector, &short_session(0), &cancel)
        .await
        .unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.ticks, 0);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(fake.navigations().len(), 1);
    assert_eq!(fake.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_the_connect_delay_never_connects() {
    let fake = FakeAdapter::cookie_page("42 cookies");
    let connector = FakeConnector::new(fake.clone());
    let mut config = short_session(0);
    config.session.connect_delay = Duration::from_secs(50);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = run_session(&connector, &config, &cancel).await.unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.ticks, 0);
    assert!(started.elapsed() < Duration::from_secs(50));
    assert_eq!(connector.connects(), 0);
    assert!(fake.navigations().is_empty());
    assert_eq!(fake.close_count(), 0);
}
