//! The interaction port the bot drives, and its DevTools-backed implementation.

use std::fmt;

use async_trait::async_trait;
use cdp_adapter::{CdpConfig, CdpSession, Element};
use serde::{Deserialize, Serialize};

use crate::errors::{BotError, InteractionError};

/// A CSS selector understood by the adapter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(String);

impl Selector {
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Selector {
    fn from(css: &str) -> Self {
        Self::new(css)
    }
}

/// Browser/DOM primitives. Elements are opaque handles valid until the page re-renders them.
#[async_trait]
pub trait InteractionAdapter: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), InteractionError>;

    /// Zero or one element.
    async fn find(&self, selector: &Selector) -> Result<Option<Self::Element>, InteractionError>;

    /// Every match, in display order.
    async fn find_all(&self, selector: &Selector) -> Result<Vec<Self::Element>, InteractionError>;

    async fn click(&self, element: &Self::Element) -> Result<(), InteractionError>;

    async fn move_to(&self, element: &Self::Element) -> Result<(), InteractionError>;

    async fn move_and_click(&self, element: &Self::Element) -> Result<(), InteractionError> {
        self.move_to(element).await?;
        self.click(element).await
    }

    async fn text(&self, element: &Self::Element) -> Result<String, InteractionError>;

    /// Release the browser session. Called exactly once per acquired session.
    async fn close(&self) -> Result<(), InteractionError>;
}

/// Acquires adapter sessions from an automation backend.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: InteractionAdapter;

    async fn connect(&self) -> Result<Self::Session, BotError>;
}

/// Connects to a remote-debugging Chromium.
#[derive(Clone, Debug)]
pub struct CdpConnector {
    config: CdpConfig,
}

impl CdpConnector {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for CdpConnector {
    type Session = CdpSession;

    async fn connect(&self) -> Result<CdpSession, BotError> {
        CdpSession::connect(self.config.clone())
            .await
            .map_err(|err| BotError::Connect(err.to_string()))
    }
}

#[async_trait]
impl InteractionAdapter for CdpSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), InteractionError> {
        Ok(CdpSession::navigate(self, url).await?)
    }

    async fn find(&self, selector: &Selector) -> Result<Option<Element>, InteractionError> {
        Ok(self.query(selector.as_str()).await?)
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<Element>, InteractionError> {
        Ok(self.query_all(selector.as_str()).await?)
    }

    async fn click(&self, element: &Element) -> Result<(), InteractionError> {
        Ok(CdpSession::click(self, element).await?)
    }

    async fn move_to(&self, element: &Element) -> Result<(), InteractionError> {
        Ok(self.hover(element).await?)
    }

    async fn text(&self, element: &Element) -> Result<String, InteractionError> {
        Ok(self.inner_text(element).await?)
    }

    async fn close(&self) -> Result<(), InteractionError> {
        Ok(CdpSession::close(self).await?)
    }
}
