//! Cost-aware purchase heuristic.
//!
//! Buildings win whenever they are affordable; upgrades are bought only when no building
//! purchase applies. Every building purchase raises the building threshold by a fixed step and
//! re-derives the upgrade threshold from it, so upgrades end up bought more often than
//! buildings once both thresholds are met.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reader::GameSnapshot;

/// Added to the building threshold after each building purchase.
pub const BUILDING_STEP: u64 = 200;
/// Constant part of the derived upgrade threshold.
pub const UPGRADE_BASE: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    Building,
    Upgrade,
}

impl PurchaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseKind::Building => "building",
            PurchaseKind::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for PurchaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchasable on offer this tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseCandidate<E> {
    pub kind: PurchaseKind,
    pub handle: E,
}

/// At most one candidate per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidates<E> {
    pub building: Option<E>,
    pub upgrade: Option<E>,
}

impl<E> Default for Candidates<E> {
    fn default() -> Self {
        Self {
            building: None,
            upgrade: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action<E> {
    BuyBuilding(E),
    BuyUpgrade(E),
    NoAction,
}

impl<E> Action<E> {
    pub fn into_purchase(self) -> Option<PurchaseCandidate<E>> {
        match self {
            Action::BuyBuilding(handle) => Some(PurchaseCandidate {
                kind: PurchaseKind::Building,
                handle,
            }),
            Action::BuyUpgrade(handle) => Some(PurchaseCandidate {
                kind: PurchaseKind::Upgrade,
                handle,
            }),
            Action::NoAction => None,
        }
    }
}

/// Currency levels above which a purchase is attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    buy_building_at: u64,
    buy_upgrade_at: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            buy_building_at: 100,
            buy_upgrade_at: 1000,
        }
    }
}

impl Thresholds {
    /// Both values must be positive.
    pub fn new(buy_building_at: u64, buy_upgrade_at: u64) -> Option<Self> {
        (buy_building_at > 0 && buy_upgrade_at > 0).then_some(Self {
            buy_building_at,
            buy_upgrade_at,
        })
    }

    pub fn buy_building_at(&self) -> u64 {
        self.buy_building_at
    }

    pub fn buy_upgrade_at(&self) -> u64 {
        self.buy_upgrade_at
    }

    /// Apply the post-purchase rule. Only call after the purchase click succeeded.
    pub fn record_purchase(&mut self, kind: PurchaseKind) {
        if kind == PurchaseKind::Building {
            self.buy_building_at = self.buy_building_at.saturating_add(BUILDING_STEP);
            // floor(buy_building_at * 0.8)
            self.buy_upgrade_at = UPGRADE_BASE + self.buy_building_at / 5 * 4
                + self.buy_building_at % 5 * 4 / 5;
        }
    }
}

/// Pick this tick's purchase. Pure: no I/O and no threshold mutation.
pub fn decide<E>(
    snapshot: &GameSnapshot,
    thresholds: &Thresholds,
    candidates: Candidates<E>,
) -> Action<E> {
    let effective_currency = snapshot.effective_currency();
    let Candidates { building, upgrade } = candidates;
    match (building, upgrade) {
        (Some(handle), _) if effective_currency > thresholds.buy_building_at as f64 => {
            Action::BuyBuilding(handle)
        }
        (_, Some(handle)) if effective_currency > thresholds.buy_upgrade_at as f64 => {
            Action::BuyUpgrade(handle)
        }
        _ => Action::NoAction,
    }
}
