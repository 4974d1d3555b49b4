//! Raw on-chain state access
//!
//! The engine never talks to an RPC node. Everything it needs from the chain
//! at a given transaction is behind [`ChainView`], and every read can revert.
//! Replay feeds and tests supply a [`SnapshotChain`] of already-fetched
//! values; a missing value behaves exactly like a reverted call.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{CallResult, RevertedCall};

// ============================================
// RAW CALL RESULTS
// ============================================

/// Uniswap-V2 style pair state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_supply: U256,
}

/// Per-holder state of a bond depository.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BondInfo {
    /// Total payout owed to the holder.
    pub payout: U256,
    /// Payout still pending vesting (the figure the trackers use).
    pub pending: U256,
}

// ============================================
// CAPABILITY SET
// ============================================

/// Blocking reads of raw on-chain quantities at the current transaction.
///
/// Calls may revert but never hang; a revert is a value (`Err(RevertedCall)`),
/// not a panic, and callers decide the per-field fallback.
pub trait ChainView {
    fn balance_of(&self, token: Address, owner: Address) -> CallResult<U256>;

    fn total_supply(&self, token: Address) -> CallResult<U256>;

    /// Circulating supply as reported by the staked token contract.
    fn circulating_supply(&self, token: Address) -> CallResult<U256>;

    /// Current bond price of a depository market, USD at 18 decimals.
    fn bond_price_in_usd(&self, market: Address) -> CallResult<U256>;

    /// Per-holder bond state of a depository market.
    fn bond_info(&self, market: Address, holder: Address) -> CallResult<BondInfo>;

    /// Distribution amount of the staking contract's current epoch.
    fn epoch_distribution(&self, staking: Address) -> CallResult<U256>;

    fn pair_reserves(&self, pair: Address) -> CallResult<PairReserves>;
}

// ============================================
// SNAPSHOT FIXTURE
// ============================================

/// A bag of pre-fetched on-chain values for one transaction context.
///
/// Absent entries revert. Deserializable so a replay feed can carry one
/// snapshot per event line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotChain {
    #[serde(default)]
    balances: HashMap<String, U256>,
    #[serde(default)]
    total_supplies: HashMap<Address, U256>,
    #[serde(default)]
    circulating_supplies: HashMap<Address, U256>,
    #[serde(default)]
    bond_prices: HashMap<Address, U256>,
    #[serde(default)]
    bond_infos: HashMap<String, BondInfo>,
    #[serde(default)]
    epoch_distributions: HashMap<Address, U256>,
    #[serde(default)]
    pair_reserves: HashMap<Address, PairReserves>,
}

fn pair_key(a: Address, b: Address) -> String {
    format!("{a:?}:{b:?}")
}

impl SnapshotChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, token: Address, owner: Address, raw: U256) -> &mut Self {
        self.balances.insert(pair_key(token, owner), raw);
        self
    }

    pub fn set_total_supply(&mut self, token: Address, raw: U256) -> &mut Self {
        self.total_supplies.insert(token, raw);
        self
    }

    pub fn set_circulating_supply(&mut self, token: Address, raw: U256) -> &mut Self {
        self.circulating_supplies.insert(token, raw);
        self
    }

    pub fn set_bond_price(&mut self, market: Address, raw: U256) -> &mut Self {
        self.bond_prices.insert(market, raw);
        self
    }

    pub fn clear_bond_price(&mut self, market: Address) -> &mut Self {
        self.bond_prices.remove(&market);
        self
    }

    pub fn set_bond_info(&mut self, market: Address, holder: Address, info: BondInfo) -> &mut Self {
        self.bond_infos.insert(pair_key(market, holder), info);
        self
    }

    pub fn set_epoch_distribution(&mut self, staking: Address, raw: U256) -> &mut Self {
        self.epoch_distributions.insert(staking, raw);
        self
    }

    pub fn set_pair_reserves(&mut self, pair: Address, reserves: PairReserves) -> &mut Self {
        self.pair_reserves.insert(pair, reserves);
        self
    }
}

impl ChainView for SnapshotChain {
    fn balance_of(&self, token: Address, owner: Address) -> CallResult<U256> {
        self.balances
            .get(&pair_key(token, owner))
            .copied()
            .ok_or(RevertedCall)
    }

    fn total_supply(&self, token: Address) -> CallResult<U256> {
        self.total_supplies.get(&token).copied().ok_or(RevertedCall)
    }

    fn circulating_supply(&self, token: Address) -> CallResult<U256> {
        self.circulating_supplies
            .get(&token)
            .copied()
            .ok_or(RevertedCall)
    }

    fn bond_price_in_usd(&self, market: Address) -> CallResult<U256> {
        self.bond_prices.get(&market).copied().ok_or(RevertedCall)
    }

    fn bond_info(&self, market: Address, holder: Address) -> CallResult<BondInfo> {
        self.bond_infos
            .get(&pair_key(market, holder))
            .copied()
            .ok_or(RevertedCall)
    }

    fn epoch_distribution(&self, staking: Address) -> CallResult<U256> {
        self.epoch_distributions
            .get(&staking)
            .copied()
            .ok_or(RevertedCall)
    }

    fn pair_reserves(&self, pair: Address) -> CallResult<PairReserves> {
        self.pair_reserves.get(&pair).copied().ok_or(RevertedCall)
    }
}
