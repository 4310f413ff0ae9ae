//! Resilient click executor.

pub mod model;
pub mod runner;

pub use model::{ClickMode, ClickOutcome, ClickRequest, InteractionOutcome};
pub use runner::click_with_retry;
