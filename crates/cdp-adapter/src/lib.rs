//! Chromium DevTools Protocol backend for the clicker bot.
//!
//! The crate owns every browser concern: dialing a remote DevTools endpoint, sizing the
//! window, resolving CSS selectors to elements and dispatching pointer input. Higher layers
//! only see [`CdpSession`] and the error taxonomy in [`error`].

pub mod metrics;
mod session;

pub use chromiumoxide::Element;
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use ids::SessionId;
pub use session::CdpSession;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use uuid::Uuid;

    /// Unique identifier for one connection to the DevTools endpoint.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct SessionId(pub Uuid);

    impl SessionId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for SessionId {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Display for SessionId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("could not reach the devtools endpoint")]
        Connect,
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("element is no longer attached to the document")]
        StaleElement,
        #[error("click would land on another element")]
        ClickIntercepted,
        #[error("browser session closed")]
        SessionClosed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: matches!(
                    kind,
                    AdapterErrorKind::StaleElement | AdapterErrorKind::ClickIntercepted
                ),
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }
    }

    const STALE_MARKERS: &[&str] = &[
        "no node with given id",
        "could not find node with given id",
        "node is detached",
        "cannot find context with specified id",
        "could not compute box model",
        "node does not have a layout object",
    ];

    const CLOSED_MARKERS: &[&str] = &["websocket", "channel", "connection closed", "target closed"];

    /// Classify a raw protocol failure message into an adapter error kind.
    pub fn classify(message: &str) -> AdapterErrorKind {
        let lower = message.to_ascii_lowercase();
        if STALE_MARKERS.iter().any(|marker| lower.contains(marker)) {
            AdapterErrorKind::StaleElement
        } else if CLOSED_MARKERS.iter().any(|marker| lower.contains(marker)) {
            AdapterErrorKind::SessionClosed
        } else if lower.contains("timed out") || lower.contains("timeout") {
            AdapterErrorKind::NavTimeout
        } else {
            AdapterErrorKind::CdpIo
        }
    }

}

pub mod config {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    use crate::error::{AdapterError, AdapterErrorKind};

    /// Configuration for dialing and tuning the devtools session.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        /// `http://host:port` of a remote-debugging Chromium, or its `ws://` browser url.
        pub endpoint: String,
        pub window_width: u32,
        pub window_height: u32,
        pub default_deadline_ms: u64,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                endpoint: "http://127.0.0.1:9222".to_string(),
                window_width: 1400,
                window_height: 900,
                default_deadline_ms: 30_000,
            }
        }
    }

    impl CdpConfig {
        pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
            self.endpoint = endpoint.into();
            self
        }

        pub fn default_deadline(&self) -> Duration {
            Duration::from_millis(self.default_deadline_ms)
        }

        pub fn validate(&self) -> Result<(), AdapterError> {
            let parsed = url::Url::parse(&self.endpoint).map_err(|err| {
                AdapterError::new(AdapterErrorKind::Connect)
                    .with_hint(format!("invalid endpoint '{}': {}", self.endpoint, err))
            })?;
            match parsed.scheme() {
                "http" | "https" | "ws" | "wss" => Ok(()),
                other => Err(AdapterError::new(AdapterErrorKind::Connect)
                    .with_hint(format!("unsupported endpoint scheme '{}'", other))),
            }
        }
    }

}
