use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::BotConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    /// Directory for clicker_bot.log
    #[arg(long, env = "BOT_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Session length in minutes; 0 plays until interrupted
    #[arg(long, env = "GAME_TIME", value_name = "MINUTES")]
    pub game_time: Option<u64>,

    /// Minutes between progress reports
    #[arg(long, env = "REPORT_TIMEOUT", value_name = "MINUTES")]
    pub report_timeout: Option<u64>,

    /// DevTools endpoint of the browser to drive
    #[arg(long, env = "CDP_ENDPOINT", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Page hosting the game
    #[arg(long, env = "GAME_URL", value_name = "URL")]
    pub game_url: Option<String>,
}

impl CliArgs {
    /// Flags and environment variables win over the configuration file.
    pub fn apply(&self, config: &mut BotConfig) {
        if let Some(minutes) = self.game_time {
            config.session.game_time_minutes = minutes;
        }
        if let Some(minutes) = self.report_timeout {
            config.session.report_every_minutes = minutes;
        }
        if let Some(endpoint) = &self.endpoint {
            config.backend.endpoint = endpoint.clone();
        }
        if let Some(url) = &self.game_url {
            config.game_url = url.clone();
        }
    }
}
