//! Binary entry: arguments, logging, configuration and signal handling.

mod app;
pub mod env;
pub mod runtime;

pub use app::run;
pub use env::{CliArgs, LogFormat};
