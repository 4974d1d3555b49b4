//! Entity persistence
//!
//! Load/create/save repository over the derived records. The engine only
//! sees the [`EntityStore`] trait; nothing assumes a storage engine beyond
//! get-by-key and put. [`MemoryStore`] backs the replay binary and tests.
//!
//! The global holder counter lives here too: it is shared mutable state and
//! belongs behind the same handle the records do, not in an ambient global.

use alloy_primitives::Address;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::entities::{
    BondDiscount, BondPosition, DailyBond, Deposit, Holder, HolderBalance, ManagedReserve,
    ProtocolMetric, Redemption,
};

// ============================================
// REPOSITORY TRAIT
// ============================================

pub trait EntityStore {
    fn protocol_metric(&self, day: i64) -> Option<ProtocolMetric>;
    fn save_protocol_metric(&mut self, record: ProtocolMetric);

    fn bond_discount(&self, hour: i64) -> Option<BondDiscount>;
    fn save_bond_discount(&mut self, record: BondDiscount);

    fn holder(&self, id: Address) -> Option<Holder>;
    fn save_holder(&mut self, holder: Holder);

    fn holder_balance(&self, id: &str) -> Option<HolderBalance>;
    fn save_holder_balance(&mut self, balance: HolderBalance);

    fn bond_position(&self, id: &str) -> Option<BondPosition>;
    fn save_bond_position(&mut self, position: BondPosition);

    fn managed_reserve(&self, symbol: &str) -> Option<ManagedReserve>;
    fn save_managed_reserve(&mut self, reserve: ManagedReserve);

    fn deposit(&self, id: &str) -> Option<Deposit>;
    fn save_deposit(&mut self, deposit: Deposit);

    fn save_redemption(&mut self, redemption: Redemption);

    fn daily_bond(&self, id: &str) -> Option<DailyBond>;
    fn save_daily_bond(&mut self, record: DailyBond);

    // ========== Global holder counter ==========
    fn holder_count(&self) -> u64;
    fn increment_holder_count(&mut self);
    fn decrement_holder_count(&mut self);
}

// ============================================
// IN-MEMORY STORE
// ============================================

/// BTreeMap-backed store: deterministic iteration order so replay dumps
/// are diffable.
#[derive(Debug, Default, Serialize)]
pub struct MemoryStore {
    protocol_metrics: BTreeMap<i64, ProtocolMetric>,
    bond_discounts: BTreeMap<i64, BondDiscount>,
    holders: BTreeMap<Address, Holder>,
    holder_balances: BTreeMap<String, HolderBalance>,
    bond_positions: BTreeMap<String, BondPosition>,
    managed_reserves: BTreeMap<String, ManagedReserve>,
    deposits: BTreeMap<String, Deposit>,
    redemptions: BTreeMap<String, Redemption>,
    daily_bonds: BTreeMap<String, DailyBond>,
    holder_count: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All daily metric records in day order, for the replay summary.
    pub fn metrics(&self) -> impl Iterator<Item = &ProtocolMetric> {
        self.protocol_metrics.values()
    }

    pub fn record_counts(&self) -> String {
        format!(
            "{} metrics, {} discounts, {} holders, {} balances, {} positions, {} deposits",
            self.protocol_metrics.len(),
            self.bond_discounts.len(),
            self.holders.len(),
            self.holder_balances.len(),
            self.bond_positions.len(),
            self.deposits.len(),
        )
    }
}

impl EntityStore for MemoryStore {
    fn protocol_metric(&self, day: i64) -> Option<ProtocolMetric> {
        self.protocol_metrics.get(&day).cloned()
    }

    fn save_protocol_metric(&mut self, record: ProtocolMetric) {
        self.protocol_metrics.insert(record.id, record);
    }

    fn bond_discount(&self, hour: i64) -> Option<BondDiscount> {
        self.bond_discounts.get(&hour).cloned()
    }

    fn save_bond_discount(&mut self, record: BondDiscount) {
        self.bond_discounts.insert(record.id, record);
    }

    fn holder(&self, id: Address) -> Option<Holder> {
        self.holders.get(&id).cloned()
    }

    fn save_holder(&mut self, holder: Holder) {
        self.holders.insert(holder.id, holder);
    }

    fn holder_balance(&self, id: &str) -> Option<HolderBalance> {
        self.holder_balances.get(id).cloned()
    }

    fn save_holder_balance(&mut self, balance: HolderBalance) {
        self.holder_balances.insert(balance.id.clone(), balance);
    }

    fn bond_position(&self, id: &str) -> Option<BondPosition> {
        self.bond_positions.get(id).cloned()
    }

    fn save_bond_position(&mut self, position: BondPosition) {
        self.bond_positions.insert(position.id.clone(), position);
    }

    fn managed_reserve(&self, symbol: &str) -> Option<ManagedReserve> {
        self.managed_reserves.get(symbol).cloned()
    }

    fn save_managed_reserve(&mut self, reserve: ManagedReserve) {
        self.managed_reserves.insert(reserve.id.clone(), reserve);
    }

    fn deposit(&self, id: &str) -> Option<Deposit> {
        self.deposits.get(id).cloned()
    }

    fn save_deposit(&mut self, deposit: Deposit) {
        self.deposits.insert(deposit.id.clone(), deposit);
    }

    fn save_redemption(&mut self, redemption: Redemption) {
        self.redemptions.insert(redemption.id.clone(), redemption);
    }

    fn daily_bond(&self, id: &str) -> Option<DailyBond> {
        self.daily_bonds.get(id).cloned()
    }

    fn save_daily_bond(&mut self, record: DailyBond) {
        self.daily_bonds.insert(record.id.clone(), record);
    }

    fn holder_count(&self) -> u64 {
        self.holder_count
    }

    fn increment_holder_count(&mut self) {
        self.holder_count += 1;
    }

    fn decrement_holder_count(&mut self) {
        self.holder_count = self.holder_count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_absent_returns_none() {
        let store = MemoryStore::new();
        assert!(store.protocol_metric(0).is_none());
        assert!(store.managed_reserve("ETH").is_none());
        assert!(store.holder(Address::repeat_byte(1)).is_none());
    }

    #[test]
    fn test_save_overwrites_same_key() {
        let mut store = MemoryStore::new();
        let mut record = ProtocolMetric::new(86400, 90000);
        record.holders = 5;
        store.save_protocol_metric(record.clone());

        record.holders = 9;
        store.save_protocol_metric(record);

        assert_eq!(store.protocol_metric(86400).unwrap().holders, 9);
        assert_eq!(store.metrics().count(), 1);
    }

    #[test]
    fn test_holder_counter_never_underflows() {
        let mut store = MemoryStore::new();
        store.decrement_holder_count();
        assert_eq!(store.holder_count(), 0);
        store.increment_holder_count();
        store.increment_holder_count();
        store.decrement_holder_count();
        assert_eq!(store.holder_count(), 1);
    }
}
