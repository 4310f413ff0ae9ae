use std::future::Future;
use std::time::Instant;

use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::CdpConfig;
use crate::error::{classify, AdapterError, AdapterErrorKind};
use crate::ids::SessionId;
use crate::metrics;

const HIT_TEST_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    return hit === null || hit === this || this.contains(hit);
}"#;

/// One live connection to a remote Chromium, driving a single page.
pub struct CdpSession {
    id: SessionId,
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    config: CdpConfig,
}

impl CdpSession {
    /// Dial the devtools endpoint and open the page the bot will drive.
    #[instrument(skip_all, fields(endpoint = %config.endpoint))]
    pub async fn connect(config: CdpConfig) -> Result<Self, AdapterError> {
        config.validate()?;
        let (mut browser, mut handler) = Browser::connect(config.endpoint.clone())
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::Connect).with_hint(err.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(%err, "devtools handler stopped");
                    break;
                }
            }
        });

        let page = match open_page(&browser, &config).await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    warn!(%close_err, "failed to close browser after page setup error");
                }
                handler.abort();
                return Err(err);
            }
        };

        let id = SessionId::new();
        info!(session = %id, "devtools session established");
        Ok(Self {
            id,
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            config,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        let deadline = self.config.default_deadline();
        tracked("Page.navigate", async {
            match tokio::time::timeout(deadline, self.page.goto(url)).await {
                Ok(result) => result.map(|_| ()).map_err(from_cdp),
                Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!("{} not loaded after {:?}", url, deadline))),
            }
        })
        .await
    }

    /// All elements matching a CSS selector, in document order.
    pub async fn query_all(&self, selector: &str) -> Result<Vec<Element>, AdapterError> {
        tracked("DOM.querySelectorAll", async {
            self.page.find_elements(selector).await.map_err(from_cdp)
        })
        .await
    }

    /// First element matching a CSS selector, if any.
    pub async fn query(&self, selector: &str) -> Result<Option<Element>, AdapterError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    /// Click the element's center, refusing when another element sits on top of it.
    pub async fn click(&self, element: &Element) -> Result<(), AdapterError> {
        tracked("Input.dispatchMouseEvent", async {
            element.scroll_into_view().await.map_err(from_cdp)?;
            if !is_hit_target(element).await? {
                return Err(AdapterError::new(AdapterErrorKind::ClickIntercepted)
                    .with_hint("element center is covered by another node"));
            }
            element.click().await.map(|_| ()).map_err(from_cdp)
        })
        .await
    }

    /// Move the pointer over the element without clicking.
    pub async fn hover(&self, element: &Element) -> Result<(), AdapterError> {
        tracked("Input.dispatchMouseEvent", async {
            element.hover().await.map(|_| ()).map_err(from_cdp)
        })
        .await
    }

    pub async fn inner_text(&self, element: &Element) -> Result<String, AdapterError> {
        tracked("Runtime.callFunctionOn", async {
            element
                .inner_text()
                .await
                .map(Option::unwrap_or_default)
                .map_err(from_cdp)
        })
        .await
    }

    /// Close the remote browser and stop the protocol handler. Safe to call twice.
    pub async fn close(&self) -> Result<(), AdapterError> {
        let browser = self.browser.lock().await.take();
        let result = match browser {
            Some(mut browser) => browser.close().await.map(|_| ()).map_err(from_cdp),
            None => Ok(()),
        };
        self.handler.abort();
        let snapshot = metrics::snapshot();
        info!(
            session = %self.id,
            commands = snapshot.commands,
            failures = snapshot.command_failures,
            "devtools session closed"
        );
        result
    }
}

async fn open_page(browser: &Browser, config: &CdpConfig) -> Result<Page, AdapterError> {
    let page = browser.new_page("about:blank").await.map_err(from_cdp)?;
    page.execute(SetDeviceMetricsOverrideParams::new(
        config.window_width as i64,
        config.window_height as i64,
        1.0,
        false,
    ))
    .await
    .map_err(from_cdp)?;
    Ok(page)
}

async fn is_hit_target(element: &Element) -> Result<bool, AdapterError> {
    let returns = element
        .call_js_fn(HIT_TEST_FN, false)
        .await
        .map_err(from_cdp)?;
    Ok(returns
        .result
        .value
        .and_then(|value| value.as_bool())
        .unwrap_or(true))
}

async fn tracked<T, F>(method: &str, fut: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    metrics::record_command(method);
    let started = Instant::now();
    let result = fut.await;
    match &result {
        Ok(_) => metrics::record_command_success(method, started.elapsed()),
        Err(err) => {
            metrics::record_command_failure(method);
            debug!(method, %err, "cdp command failed");
        }
    }
    result
}

fn from_cdp(err: CdpError) -> AdapterError {
    let message = err.to_string();
    AdapterError::new(classify(&message)).with_hint(message)
}
