//! Error taxonomy for the bot.
//!
//! Interaction failures are split by whether a short wait can fix them: stale elements and
//! intercepted clicks are transient, everything else is surfaced to the caller.

use std::fmt;

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

use crate::config::ConfigError;

/// The transient failure classes the click executor recovers from locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransientKind {
    Stale,
    Intercepted,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientKind::Stale => write!(f, "stale"),
            TransientKind::Intercepted => write!(f, "intercepted"),
        }
    }
}

/// Failure of a single adapter primitive.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    /// The element was detached between lookup and use
    #[error("element went stale: {0}")]
    Stale(String),

    /// Another element would receive the click
    #[error("click intercepted: {0}")]
    Intercepted(String),

    #[error("element not found: {0}")]
    NotFound(String),

    /// The browser session is gone; nothing further can succeed
    #[error("browser session lost: {0}")]
    Disconnected(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl InteractionError {
    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            InteractionError::Stale(_) => Some(TransientKind::Stale),
            InteractionError::Intercepted(_) => Some(TransientKind::Intercepted),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient_kind().is_some()
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, InteractionError::Stale(_))
    }

    /// Errors that end the session instead of the current step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InteractionError::Disconnected(_))
    }
}

impl From<AdapterError> for InteractionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::StaleElement => InteractionError::Stale(message),
            AdapterErrorKind::ClickIntercepted => InteractionError::Intercepted(message),
            AdapterErrorKind::TargetNotFound => InteractionError::NotFound(message),
            AdapterErrorKind::Connect | AdapterErrorKind::SessionClosed => {
                InteractionError::Disconnected(message)
            }
            AdapterErrorKind::NavTimeout | AdapterErrorKind::CdpIo | AdapterErrorKind::Internal => {
                InteractionError::Backend(message)
            }
        }
    }
}

/// Failure to turn the page into a game snapshot this tick.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("game state unavailable: no element matches '{0}'")]
    Unavailable(String),

    #[error("unrecognised currency display: '{0}'")]
    Malformed(String),

    #[error(transparent)]
    Interaction(#[from] InteractionError),
}

impl ReadError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReadError::Interaction(err) if err.is_fatal())
    }
}

/// Session-level failures reported by the binary.
#[derive(Debug, Error)]
pub enum BotError {
    /// The automation backend could not be acquired
    #[error("cannot connect to the automation backend: {0}")]
    Connect(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),
}
