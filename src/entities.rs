//! Derived time-series records
//!
//! Every record is a plain value the store owns; the trackers load (or
//! zero-initialize), recompute and save them. Ids follow the conventions of
//! the subgraph schema this engine feeds: day/hour bucket timestamps for
//! time series, `holder-bucket` composites for balance snapshots.

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// HOLDERS
// ============================================

/// A token holder. `active` tracks whether the holder currently counts
/// toward the global holder figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holder {
    pub id: Address,
    pub active: bool,
    /// Id of the latest balance snapshot, once one exists.
    pub last_balance: Option<String>,
}

impl Holder {
    pub fn new(id: Address) -> Self {
        Self {
            id,
            active: true,
            last_balance: None,
        }
    }
}

/// Per-holder balance snapshot at a day bucket. Superseded, never mutated,
/// by the next bucket's snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderBalance {
    pub id: String,
    pub holder: Address,
    pub timestamp: i64,
    pub base_balance: Decimal,
    pub staked_balance: Decimal,
    /// Sum of pending bond payouts across eligible markets.
    pub bond_balance: Decimal,
    /// (base + staked + bond) x current token USD rate.
    pub dollar_balance: Decimal,
    /// Ordered bond position ids appended this snapshot.
    pub bond_positions: Vec<String>,
}

impl HolderBalance {
    pub fn id_for(holder: Address, day: i64) -> String {
        format!("{holder:?}-{day}")
    }

    pub fn new(holder: Address, day: i64, timestamp: i64) -> Self {
        Self {
            id: Self::id_for(holder, day),
            holder,
            timestamp,
            base_balance: Decimal::ZERO,
            staked_balance: Decimal::ZERO,
            bond_balance: Decimal::ZERO,
            dollar_balance: Decimal::ZERO,
            bond_positions: Vec::new(),
        }
    }
}

/// One pending bond observed for a holder at a point in time. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondPosition {
    pub id: String,
    /// Display name of the bonded principal.
    pub name: String,
    /// Depository contract the pending amount was read from.
    pub contract: Address,
    pub amount: Decimal,
}

impl BondPosition {
    pub fn id_for(holder: Address, timestamp: i64, label: &str) -> String {
        format!("{holder:?}-{timestamp}-{label}")
    }
}

// ============================================
// BOND DISCOUNTS
// ============================================

/// Hourly record of each tracked market's discount to spot, in percent.
/// A market's entry keeps its previous value when the price read reverts
/// or the market is not yet active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondDiscount {
    /// Hour bucket key.
    pub id: i64,
    pub timestamp: i64,
    /// Market label -> discount %, zero-initialized for every tracked market.
    pub discounts: BTreeMap<String, Decimal>,
}

impl BondDiscount {
    pub fn new(hour: i64, timestamp: i64, tracked_labels: impl Iterator<Item = String>) -> Self {
        Self {
            id: hour,
            timestamp,
            discounts: tracked_labels.map(|l| (l, Decimal::ZERO)).collect(),
        }
    }
}

// ============================================
// PROTOCOL METRICS
// ============================================

/// Runway projection in days: eight fixed reference rates plus the current
/// rebase rate. All zero when any precondition (staked supply, risk-free
/// value, rebase rate) is non-positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayProjection {
    pub p2500: Decimal,
    pub p5000: Decimal,
    pub p7500: Decimal,
    pub p10000: Decimal,
    pub p20000: Decimal,
    pub p50000: Decimal,
    pub p70000: Decimal,
    pub p100000: Decimal,
    pub current: Decimal,
}

impl RunwayProjection {
    /// The eight fixed-rate slots in rate order.
    pub fn fixed_slots(&self) -> [Decimal; 8] {
        [
            self.p2500, self.p5000, self.p7500, self.p10000, self.p20000, self.p50000,
            self.p70000, self.p100000,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.fixed_slots().iter().all(|d| d.is_zero()) && self.current.is_zero()
    }
}

/// Daily protocol-wide metrics record. Exactly one per day bucket; later
/// events in the same day overwrite the derived fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMetric {
    /// Day bucket key.
    pub id: i64,
    pub timestamp: i64,
    pub total_supply: Decimal,
    pub circulating_supply: Decimal,
    pub staked_circulating_supply: Decimal,
    pub token_price: Decimal,
    pub market_cap: Decimal,
    pub total_value_locked: Decimal,
    /// Cumulative externally-managed reserves folded into treasury value.
    pub managed: Decimal,
    pub treasury_market_value: Decimal,
    pub treasury_risk_free_value: Decimal,
    /// ETH-denominated breakdowns: LP valuation plus the raw reserve-asset
    /// balance, in the risk-free and mark-to-market variants.
    pub treasury_eth_risk_free_value: Decimal,
    pub treasury_eth_market_value: Decimal,
    /// Percentage of the reference pair's total LP supply held by treasury.
    pub treasury_pol: Decimal,
    pub next_epoch_rebase: Decimal,
    pub next_distributed: Decimal,
    pub current_apy: Decimal,
    pub runway: RunwayProjection,
    pub holders: u64,
}

impl ProtocolMetric {
    pub fn new(day: i64, timestamp: i64) -> Self {
        Self {
            id: day,
            timestamp,
            total_supply: Decimal::ZERO,
            circulating_supply: Decimal::ZERO,
            staked_circulating_supply: Decimal::ZERO,
            token_price: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            total_value_locked: Decimal::ZERO,
            managed: Decimal::ZERO,
            treasury_market_value: Decimal::ZERO,
            treasury_risk_free_value: Decimal::ZERO,
            treasury_eth_risk_free_value: Decimal::ZERO,
            treasury_eth_market_value: Decimal::ZERO,
            treasury_pol: Decimal::ZERO,
            next_epoch_rebase: Decimal::ZERO,
            next_distributed: Decimal::ZERO,
            current_apy: Decimal::ZERO,
            runway: RunwayProjection::default(),
            holders: 0,
        }
    }
}

// ============================================
// TREASURY
// ============================================

/// Cumulative externally-managed reserve amount per asset symbol.
/// Additive only; replaying an event adds again by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedReserve {
    pub id: String,
    pub amount: Decimal,
}

impl ManagedReserve {
    pub fn new(symbol: &str) -> Self {
        Self {
            id: symbol.to_string(),
            amount: Decimal::ZERO,
        }
    }
}

// ============================================
// BOND ACTIVITY
// ============================================

/// A bond deposit, valued at the spot pair price at deposit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    /// Transaction id.
    pub id: String,
    pub holder: Address,
    /// Bonded principal name.
    pub token: String,
    pub amount: Decimal,
    pub value: Decimal,
    pub max_premium: Decimal,
    pub timestamp: i64,
}

/// A bond redemption marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    /// Transaction id.
    pub id: String,
    pub holder: Address,
    pub token: String,
    pub timestamp: i64,
}

/// Per (day, token) rollup of bond deposits. Accumulates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBond {
    pub id: String,
    pub timestamp: i64,
    pub token: String,
    pub amount: Decimal,
    pub value: Decimal,
}

impl DailyBond {
    pub fn id_for(day: i64, token: &str) -> String {
        format!("{day}-{token}")
    }

    pub fn new(day: i64, token: &str) -> Self {
        Self {
            id: Self::id_for(day, token),
            timestamp: day,
            token: token.to_string(),
            amount: Decimal::ZERO,
            value: Decimal::ZERO,
        }
    }
}
