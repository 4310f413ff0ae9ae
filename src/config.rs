//! Bot configuration.
//!
//! Read from YAML (see `cli::runtime::load_config`), then overridden by command-line flags and
//! environment variables. Every section has defaults tuned for the Cookie Clicker page, so an
//! empty file or no file at all yields a working configuration.

use std::time::Duration;

use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::Selector;
use crate::decision::Thresholds;
use crate::wait::WaitSpec;

pub const DEFAULT_GAME_URL: &str = "https://orteil.dashnet.org/cookieclicker/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is empty")]
    Empty { field: &'static str },

    #[error("invalid backend settings: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub game_url: String,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub retry: RetryConfig,
    pub thresholds: ThresholdConfig,
    pub selectors: Selectors,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            game_url: DEFAULT_GAME_URL.to_string(),
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
            retry: RetryConfig::default(),
            thresholds: ThresholdConfig::default(),
            selectors: Selectors::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// DevTools endpoint of the browser to drive
    pub endpoint: String,
    pub window_width: u32,
    pub window_height: u32,
    #[serde(with = "humantime_duration")]
    pub command_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let cdp = CdpConfig::default();
        Self {
            endpoint: cdp.endpoint,
            window_width: cdp.window_width,
            window_height: cdp.window_height,
            command_timeout: Duration::from_millis(cdp.default_deadline_ms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session length in minutes; 0 disables the hard deadline
    pub game_time_minutes: u64,
    /// Minutes between progress reports
    pub report_every_minutes: u64,
    /// Pause before dialing the backend, for browsers that are still starting up
    #[serde(with = "humantime_duration")]
    pub connect_delay: Duration,
    /// Pause after navigation so the game can finish loading
    #[serde(with = "humantime_duration")]
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_time_minutes: 10,
            report_every_minutes: 1,
            connect_delay: Duration::ZERO,
            settle_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(with = "humantime_duration")]
    pub click_window: Duration,
    #[serde(with = "humantime_duration")]
    pub production_rate_window: Duration,
    #[serde(with = "humantime_duration")]
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            click_window: Duration::from_secs(20),
            production_rate_window: Duration::from_secs(40),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Initial purchase thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub building: u64,
    pub upgrade: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            building: thresholds.buy_building_at(),
            upgrade: thresholds.buy_upgrade_at(),
        }
    }
}

/// Every DOM selector the bot touches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub currency: Selector,
    pub production_rate: Selector,
    pub accumulator: Selector,
    pub bonus: Selector,
    pub building: Selector,
    pub upgrade: Selector,
    pub locked_building: Selector,
    pub fallback_anchor: Selector,
    pub language_button: Selector,
    pub prompt_close: Selector,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            currency: "#cookies".into(),
            production_rate: "#cookiesPerSecond".into(),
            accumulator: "#bigCookie".into(),
            bonus: "#shimmers > div".into(),
            building: "div .product.unlocked.enabled".into(),
            upgrade: "div .crate.upgrade.enabled".into(),
            locked_building: "div .product.locked.disabled".into(),
            fallback_anchor: "#support".into(),
            language_button: "#changeLanguage".into(),
            prompt_close: "#promptClose".into(),
        }
    }
}

impl Selectors {
    fn all(&self) -> [(&'static str, &Selector); 10] {
        [
            ("selectors.currency", &self.currency),
            ("selectors.production_rate", &self.production_rate),
            ("selectors.accumulator", &self.accumulator),
            ("selectors.bonus", &self.bonus),
            ("selectors.building", &self.building),
            ("selectors.upgrade", &self.upgrade),
            ("selectors.locked_building", &self.locked_building),
            ("selectors.fallback_anchor", &self.fallback_anchor),
            ("selectors.language_button", &self.language_button),
            ("selectors.prompt_close", &self.prompt_close),
        ]
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_url.trim().is_empty() {
            return Err(ConfigError::Empty { field: "game_url" });
        }
        if self.session.report_every_minutes == 0 {
            return Err(ConfigError::Zero {
                field: "session.report_every_minutes",
            });
        }
        if self.thresholds.building == 0 {
            return Err(ConfigError::Zero {
                field: "thresholds.building",
            });
        }
        if self.thresholds.upgrade == 0 {
            return Err(ConfigError::Zero {
                field: "thresholds.upgrade",
            });
        }
        for (field, window) in [
            ("retry.click_window", self.retry.click_window),
            ("retry.production_rate_window", self.retry.production_rate_window),
            ("retry.poll_interval", self.retry.poll_interval),
        ] {
            if window.is_zero() {
                return Err(ConfigError::Zero { field });
            }
        }
        if let Some((field, _)) = self
            .selectors
            .all()
            .into_iter()
            .find(|(_, selector)| selector.as_str().trim().is_empty())
        {
            return Err(ConfigError::Empty { field });
        }
        self.cdp_config()
            .validate()
            .map_err(|err| ConfigError::Backend(err.to_string()))
    }

    pub fn cdp_config(&self) -> CdpConfig {
        CdpConfig {
            window_width: self.backend.window_width,
            window_height: self.backend.window_height,
            default_deadline_ms: self.backend.command_timeout.as_millis() as u64,
            ..CdpConfig::default().with_endpoint(self.backend.endpoint.clone())
        }
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.thresholds.building, self.thresholds.upgrade).ok_or(
            ConfigError::Zero {
                field: "thresholds",
            },
        )
    }

    pub fn report_interval(&self) -> Duration {
        minutes(self.session.report_every_minutes)
    }

    /// `None` when the session runs until interrupted.
    pub fn session_length(&self) -> Option<Duration> {
        (self.session.game_time_minutes > 0).then(|| minutes(self.session.game_time_minutes))
    }

    pub fn click_wait(&self) -> WaitSpec {
        WaitSpec::new(self.retry.click_window, self.retry.poll_interval)
    }

    pub fn rate_wait(&self) -> WaitSpec {
        WaitSpec::new(self.retry.production_rate_window, self.retry.poll_interval)
    }
}

fn minutes(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(60))
}

/// Durations written the human way in YAML: `500ms`, `20s`, `1m 30s`.
mod humantime_duration {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|err| D::Error::custom(format!("invalid duration '{raw}': {err}")))
    }
}
