use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::env::LogFormat;
use crate::config::BotConfig;

pub const LOG_FILE_NAME: &str = "clicker_bot.log";

pub fn load_local_env_overrides() {
    load_env_file(Path::new("config/local.env"));
}

/// `KEY=value` lines; variables already set in the process win.
pub fn load_env_file(path: &Path) {
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unescape_value(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

/// Console plus `<log_dir>/clicker_bot.log`. Keep the guard alive until exit so the file
/// writer flushes.
pub fn init_logging(
    level: &str,
    debug: bool,
    format: LogFormat,
    log_dir: &Path,
) -> Result<WorkerGuard> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    stdfs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE_NAME));

    let (human, json) = match format {
        LogFormat::Human => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .with(human)
        .with(json)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(guard)
}

pub struct LoadedConfig {
    pub config: BotConfig,
    pub path: Option<PathBuf>,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let Some(config_path) = config_path.cloned().or_else(default_config_path) else {
        warn!("No configuration directory; using defaults");
        return Ok(LoadedConfig {
            config: BotConfig::default(),
            path: None,
        });
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: BotConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: Some(config_path),
        })
    } else {
        info!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: BotConfig::default(),
            path: Some(config_path),
        })
    }
}

// Priority: ./config/clicker.yaml > <config_dir>/clicker-bot/config.yaml
fn default_config_path() -> Option<PathBuf> {
    let local_config = PathBuf::from("config/clicker.yaml");
    if local_config.exists() {
        return Some(local_config);
    }
    let mut path = dirs::config_dir()?;
    path.push("clicker-bot");
    path.push("config.yaml");
    Some(path)
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}
