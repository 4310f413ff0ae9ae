//! Turns what the page displays into typed game state.

use std::fmt;

use tracing::debug;

use crate::adapter::{InteractionAdapter, Selector};
use crate::config::Selectors;
use crate::decision::{Candidates, PurchaseKind};
use crate::errors::{InteractionError, ReadError};
use crate::wait::{wait_until, WaitError, WaitSpec};

/// Magnitude word printed after the currency amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CurrencyUnit {
    #[default]
    None,
    Million,
    Billion,
}

impl CurrencyUnit {
    /// Substring match, so plurals and trailing punctuation still resolve.
    pub fn from_token(token: &str) -> Self {
        let lower = token.to_ascii_lowercase();
        if lower.contains("million") {
            CurrencyUnit::Million
        } else if lower.contains("billion") {
            CurrencyUnit::Billion
        } else {
            CurrencyUnit::None
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            CurrencyUnit::None => 1.0,
            CurrencyUnit::Million => 1e6,
            CurrencyUnit::Billion => 1e9,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ProductionRate {
    Known(String),
    #[default]
    Unavailable,
}

impl fmt::Display for ProductionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductionRate::Known(text) => f.write_str(text),
            ProductionRate::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// What the page showed at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSnapshot {
    pub currency: f64,
    pub currency_units: CurrencyUnit,
    pub production_rate: ProductionRate,
}

impl GameSnapshot {
    /// Currency after applying the unit multiplier; this is what thresholds compare against.
    pub fn effective_currency(&self) -> f64 {
        self.currency * self.currency_units.multiplier()
    }
}

/// Split a currency display into amount and unit.
///
/// `"1,234 million cookies"` yields `(1234.0, Million)`; a missing unit token means no
/// multiplier.
pub fn parse_currency(text: &str) -> Result<(f64, CurrencyUnit), ReadError> {
    let mut tokens = text.split_whitespace();
    let numeric = tokens
        .next()
        .ok_or_else(|| ReadError::Malformed(text.to_string()))?;
    let unit = CurrencyUnit::from_token(tokens.next().unwrap_or_default());

    let digits: String = numeric.chars().filter(|c| *c != ',').collect();
    let amount = digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ReadError::Malformed(text.to_string()))?;
    Ok((amount, unit))
}

#[derive(Clone, Debug)]
pub struct GameStateReader {
    selectors: Selectors,
    rate_wait: WaitSpec,
}

impl GameStateReader {
    pub fn new(selectors: Selectors, rate_wait: WaitSpec) -> Self {
        Self {
            selectors,
            rate_wait,
        }
    }

    pub async fn read<A: InteractionAdapter>(&self, adapter: &A) -> Result<GameSnapshot, ReadError> {
        let selector = &self.selectors.currency;
        let display = adapter
            .find(selector)
            .await?
            .ok_or_else(|| ReadError::Unavailable(selector.to_string()))?;
        let text = adapter.text(&display).await?;
        let (currency, currency_units) = parse_currency(&text)?;
        let production_rate = self.production_rate(adapter).await?;

        Ok(GameSnapshot {
            currency,
            currency_units,
            production_rate,
        })
    }

    /// Text of the last production-rate display, re-fetched while it keeps going stale.
    pub async fn production_rate<A: InteractionAdapter>(
        &self,
        adapter: &A,
    ) -> Result<ProductionRate, InteractionError> {
        let selector = &self.selectors.production_rate;
        let check = || async move {
            let Some(display) = adapter.find_all(selector).await?.pop() else {
                return Ok::<_, InteractionError>(Some(ProductionRate::Unavailable));
            };
            adapter
                .text(&display)
                .await
                .map(|text| Some(ProductionRate::Known(text.trim().to_string())))
        };

        match wait_until(self.rate_wait, InteractionError::is_stale, check).await {
            Ok(rate) => Ok(rate),
            Err(WaitError::Timeout { waited, .. }) => {
                debug!(?waited, "production rate kept going stale");
                Ok(ProductionRate::Unavailable)
            }
            Err(WaitError::Failed(err)) => Err(err),
        }
    }

    /// The most expensive purchasable of each kind currently on offer.
    pub async fn candidates<A: InteractionAdapter>(
        &self,
        adapter: &A,
    ) -> Result<Candidates<A::Element>, InteractionError> {
        Ok(Candidates {
            building: self.candidate(adapter, PurchaseKind::Building).await?,
            upgrade: self.candidate(adapter, PurchaseKind::Upgrade).await?,
        })
    }

    /// Display order puts cheaper items first, so the last enabled entry is the priciest one
    /// the player can afford.
    pub async fn candidate<A: InteractionAdapter>(
        &self,
        adapter: &A,
        kind: PurchaseKind,
    ) -> Result<Option<A::Element>, InteractionError> {
        Ok(adapter.find_all(self.purchasable(kind)).await?.pop())
    }

    fn purchasable(&self, kind: PurchaseKind) -> &Selector {
        match kind {
            PurchaseKind::Building => &self.selectors.building,
            PurchaseKind::Upgrade => &self.selectors.upgrade,
        }
    }
}
