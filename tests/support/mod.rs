#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clicker_bot::adapter::{Connector, InteractionAdapter, Selector};
use clicker_bot::errors::{BotError, InteractionError};
use parking_lot::Mutex;

/// Named stand-in for a DOM node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeElement(pub String);

#[derive(Default)]
struct State {
    elements: HashMap<String, Vec<FakeElement>>,
    texts: HashMap<String, String>,
    text_script: HashMap<String, VecDeque<Result<String, InteractionError>>>,
    click_script: HashMap<String, VecDeque<Result<(), InteractionError>>>,
    click_failure: HashMap<String, InteractionError>,
    navigate_failure: Option<InteractionError>,
    click_latency: Duration,
    attempts: Vec<String>,
    clicks: Vec<String>,
    moves: Vec<String>,
    navigations: Vec<String>,
    closed: usize,
}

/// Scripted adapter: pages are maps from selector to named elements.
#[derive(Clone, Default)]
pub struct FakeAdapter {
    state: Arc<Mutex<State>>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator, currency counter and production rate wired to the default selectors.
    pub fn cookie_page(currency: &str) -> Self {
        let fake = Self::new();
        fake.set_elements("#bigCookie", &["cookie"]);
        fake.set_elements("#cookies", &["counter"]);
        fake.set_elements("#cookiesPerSecond", &["rate"]);
        fake.set_text("counter", currency);
        fake.set_text("rate", "per second : 1.5");
        fake
    }

    pub fn set_elements(&self, selector: &str, names: &[&str]) {
        let elements = names.iter().map(|name| FakeElement(name.to_string())).collect();
        self.state.lock().elements.insert(selector.to_string(), elements);
    }

    pub fn set_text(&self, name: &str, text: &str) {
        self.state
            .lock()
            .texts
            .insert(name.to_string(), text.to_string());
    }

    /// Results for the next text reads of `name`; afterwards the static text applies.
    pub fn script_text(&self, name: &str, results: Vec<Result<String, InteractionError>>) {
        self.state
            .lock()
            .text_script
            .insert(name.to_string(), results.into());
    }

    /// Results for the next clicks on `name`; afterwards clicks succeed.
    pub fn script_clicks(&self, name: &str, results: Vec<Result<(), InteractionError>>) {
        self.state
            .lock()
            .click_script
            .insert(name.to_string(), results.into());
    }

    /// Every click on `name` fails with `err`.
    pub fn fail_clicks(&self, name: &str, err: InteractionError) {
        self.state
            .lock()
            .click_failure
            .insert(name.to_string(), err);
    }

    pub fn fail_navigation(&self, err: InteractionError) {
        self.state.lock().navigate_failure = Some(err);
    }

    /// Virtual time each click takes.
    pub fn set_click_latency(&self, latency: Duration) {
        self.state.lock().click_latency = latency;
    }

    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().attempts.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn moves(&self) -> Vec<String> {
        self.state.lock().moves.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closed
    }
}

#[async_trait]
impl InteractionAdapter for FakeAdapter {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), InteractionError> {
        let mut state = self.state.lock();
        state.navigations.push(url.to_string());
        match &state.navigate_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn find(&self, selector: &Selector) -> Result<Option<FakeElement>, InteractionError> {
        Ok(self
            .state
            .lock()
            .elements
            .get(selector.as_str())
            .and_then(|found| found.first().cloned()))
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<FakeElement>, InteractionError> {
        Ok(self
            .state
            .lock()
            .elements
            .get(selector.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, element: &FakeElement) -> Result<(), InteractionError> {
        let latency = self.state.lock().click_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        state.attempts.push(element.0.clone());
        let scripted = state
            .click_script
            .get_mut(&element.0)
            .and_then(|script| script.pop_front());
        let result = match scripted {
            Some(result) => result,
            None => match state.click_failure.get(&element.0) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            },
        };
        if result.is_ok() {
            state.clicks.push(element.0.clone());
        }
        result
    }

    async fn move_to(&self, element: &FakeElement) -> Result<(), InteractionError> {
        self.state.lock().moves.push(element.0.clone());
        Ok(())
    }

    async fn text(&self, element: &FakeElement) -> Result<String, InteractionError> {
        let mut state = self.state.lock();
        if let Some(result) = state
            .text_script
            .get_mut(&element.0)
            .and_then(|script| script.pop_front())
        {
            return result;
        }
        state
            .texts
            .get(&element.0)
            .cloned()
            .ok_or_else(|| InteractionError::NotFound(element.0.clone()))
    }

    async fn close(&self) -> Result<(), InteractionError> {
        self.state.lock().closed += 1;
        Ok(())
    }
}

/// Hands out one shared fake, or refuses like an unreachable backend.
pub struct FakeConnector {
    adapter: Option<FakeAdapter>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(adapter: FakeAdapter) -> Self {
        Self {
            adapter: Some(adapter),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn refusing() -> Self {
        Self {
            adapter: None,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Session = FakeAdapter;

    async fn connect(&self) -> Result<FakeAdapter, BotError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.adapter
            .clone()
            .ok_or_else(|| BotError::Connect("connection refused".into()))
    }
}
