//! Clicker bot library
//!
//! Exposes the game loop and its parts for the binary and for integration testing

pub mod adapter;
pub mod cli;
pub mod click;
pub mod config;
pub mod control;
pub mod decision;
pub mod errors;
pub mod metrics;
pub mod reader;
pub mod session;
pub mod timer;
pub mod wait;

pub use adapter::{CdpConnector, Connector, InteractionAdapter, Selector};
pub use config::BotConfig;
pub use control::{ControlLoop, SessionSummary, StopReason};
pub use errors::{BotError, InteractionError, ReadError};
pub use session::run_session;
