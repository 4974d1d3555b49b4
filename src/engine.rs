//! Event-driven engine
//!
//! Ties the chain view, the entity store and the configuration together and
//! processes one upstream event to completion at a time. Each handler
//! finishes every nested read, the holder update, the metrics recompute and
//! the cascaded discount update before returning; there is no parallelism
//! and no partially-updated record is ever observable between events.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::chain::ChainView;
use crate::config::{BondMarket, Config};
use crate::dates::day_bucket;
use crate::decimals::{to_decimal, ETHER_DECIMALS};
use crate::entities::{DailyBond, Deposit, ManagedReserve, Redemption};
use crate::events::{Event, Transaction};
use crate::holders::{load_or_create_holder, update_holder_balance};
use crate::metrics::update_protocol_metrics;
use crate::price::pair_usd_value;
use crate::store::EntityStore;

pub struct Engine<C: ChainView, S: EntityStore> {
    pub config: Config,
    pub chain: C,
    pub store: S,
}

impl<C: ChainView, S: EntityStore> Engine<C, S> {
    pub fn new(config: Config, chain: C, store: S) -> Self {
        Self {
            config,
            chain,
            store,
        }
    }

    /// Process one upstream event fully.
    pub fn process(&mut self, tx: &Transaction, event: &Event) {
        match event {
            Event::Deposit {
                market,
                amount,
                max_price,
            } => self.handle_deposit(tx, market, *amount, *max_price),
            Event::Redeem { market } => self.handle_redeem(tx, market),
            Event::ReservesManaged { token, amount } => {
                self.handle_reserves_managed(tx, *token, *amount)
            }
        }
    }

    fn market(&self, label: &str) -> Option<BondMarket> {
        let market = self
            .config
            .bond_markets
            .iter()
            .find(|m| m.label == label)
            .cloned();
        if market.is_none() {
            warn!("event references unknown bond market {label}, skipping");
        }
        market
    }

    fn handle_deposit(
        &mut self,
        tx: &Transaction,
        market_label: &str,
        amount: U256,
        max_price: U256,
    ) {
        let Some(market) = self.market(market_label) else {
            return;
        };

        let mut holder = load_or_create_holder(&mut self.store, tx.from);

        let amount_dec = to_decimal(amount, ETHER_DECIMALS);
        // LP principals are valued at the pair's spot price; a plain
        // reserve-asset principal is its own value
        let value = match market.principal_pair {
            Some(pair) => pair_usd_value(&self.chain, &self.config, amount, pair),
            None => amount_dec,
        };

        let deposit = Deposit {
            id: tx.id.clone(),
            holder: holder.id,
            token: market.name.clone(),
            amount: amount_dec,
            value,
            max_premium: to_decimal(max_price, ETHER_DECIMALS),
            timestamp: tx.timestamp,
        };
        debug!(
            "deposit {} {} (${}) into {} by {}",
            deposit.amount, market.name, deposit.value, market.label, holder.id
        );
        self.store.save_deposit(deposit.clone());

        self.record_daily_bond(tx, &market.name, deposit.amount, deposit.value);

        update_holder_balance(&self.chain, &mut self.store, &self.config, &mut holder, tx);
        update_protocol_metrics(&self.chain, &mut self.store, &self.config, tx);
    }

    fn handle_redeem(&mut self, tx: &Transaction, market_label: &str) {
        let Some(market) = self.market(market_label) else {
            return;
        };

        let mut holder = load_or_create_holder(&mut self.store, tx.from);

        self.store.save_redemption(Redemption {
            id: tx.id.clone(),
            holder: holder.id,
            token: market.name.clone(),
            timestamp: tx.timestamp,
        });
        debug!("redemption from {} by {}", market.label, holder.id);

        update_holder_balance(&self.chain, &mut self.store, &self.config, &mut holder, tx);
        update_protocol_metrics(&self.chain, &mut self.store, &self.config, tx);
    }

    fn handle_reserves_managed(
        &mut self,
        tx: &Transaction,
        token: Address,
        amount: U256,
    ) {
        // only the designated reserve asset feeds the accumulator
        if token != self.config.reserve_asset {
            debug!("reserves managed for untracked token {token}, ignoring");
            return;
        }

        let mut reserve = self
            .store
            .managed_reserve(&self.config.reserve_symbol)
            .unwrap_or_else(|| ManagedReserve::new(&self.config.reserve_symbol));
        reserve.amount += to_decimal(amount, ETHER_DECIMALS);
        info!(
            "managed {} now {}",
            self.config.reserve_symbol, reserve.amount
        );
        self.store.save_managed_reserve(reserve);

        update_protocol_metrics(&self.chain, &mut self.store, &self.config, tx);
    }

    /// Accumulate the per-day, per-token bond deposit rollup.
    fn record_daily_bond(&mut self, tx: &Transaction, token: &str, amount: Decimal, value: Decimal) {
        let day = day_bucket(tx.timestamp);
        let mut record = self
            .store
            .daily_bond(&DailyBond::id_for(day, token))
            .unwrap_or_else(|| DailyBond::new(day, token));
        record.amount += amount;
        record.value += value;
        self.store.save_daily_bond(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PairReserves, SnapshotChain};
    use crate::store::MemoryStore;
    use alloy_primitives::{Address, U256};
    use rust_decimal::Decimal;

    const WEI: u128 = 1_000_000_000_000_000_000;

    fn depositor() -> Address {
        Address::repeat_byte(0xbb)
    }

    fn test_tx(id: &str, timestamp: i64, block_number: u64) -> Transaction {
        Transaction {
            id: id.to_string(),
            from: depositor(),
            timestamp,
            block_number,
        }
    }

    /// Engine over a snapshot where one LP token is worth $50.
    fn test_engine(cfg: Config) -> Engine<SnapshotChain, MemoryStore> {
        let mut chain = SnapshotChain::new();
        chain.set_pair_reserves(
            cfg.reference_pair,
            PairReserves {
                reserve0: U256::from(1_000_000_000_000u128),
                reserve1: U256::from(2500 * WEI),
                total_supply: U256::from(100 * WEI),
            },
        );
        Engine::new(cfg, chain, MemoryStore::new())
    }

    #[test]
    fn test_deposit_of_one_lp_token_valued_at_fifty() {
        let cfg = Config::default();
        let mut engine = test_engine(cfg);
        let tx = test_tx("0xdep1", 1_636_120_053, 14_000_000);

        engine.process(
            &tx,
            &Event::Deposit {
                market: "SQUIDETHLPBond".to_string(),
                amount: U256::from(WEI), // 1.0 at 18 decimals
                max_price: U256::ZERO,
            },
        );

        let deposit = engine.store.deposit("0xdep1").unwrap();
        assert_eq!(deposit.amount, Decimal::ONE);
        assert_eq!(deposit.value, Decimal::from(50));
        assert_eq!(deposit.token, "SQUID-ETH");

        // cascade reached the metrics record and counted the holder
        let pm = engine
            .store
            .protocol_metric(day_bucket(tx.timestamp))
            .unwrap();
        assert_eq!(pm.holders, 1);
    }

    #[test]
    fn test_daily_bond_rollup_accumulates() {
        let cfg = Config::default();
        let mut engine = test_engine(cfg);

        for (id, ts) in [("0xd1", 1_636_120_053i64), ("0xd2", 1_636_121_053)] {
            engine.process(
                &test_tx(id, ts, 14_000_000),
                &Event::Deposit {
                    market: "SQUIDETHLPBond".to_string(),
                    amount: U256::from(WEI),
                    max_price: U256::ZERO,
                },
            );
        }

        let day = day_bucket(1_636_120_053);
        let rollup = engine
            .store
            .daily_bond(&DailyBond::id_for(day, "SQUID-ETH"))
            .unwrap();
        assert_eq!(rollup.amount, Decimal::TWO);
        assert_eq!(rollup.value, Decimal::from(100));
    }

    #[test]
    fn test_weth_principal_valued_at_face() {
        let cfg = Config::default();
        let mut engine = test_engine(cfg);
        let tx = test_tx("0xdep2", 1_636_120_053, 14_000_000);

        engine.process(
            &tx,
            &Event::Deposit {
                market: "WETHBondV1".to_string(),
                amount: U256::from(3 * WEI),
                max_price: U256::ZERO,
            },
        );

        let deposit = engine.store.deposit("0xdep2").unwrap();
        assert_eq!(deposit.value, Decimal::from(3));
    }

    #[test]
    fn test_reserves_managed_accumulates_and_is_not_idempotent() {
        let cfg = Config::default();
        let reserve_asset = cfg.reserve_asset;
        let symbol = cfg.reserve_symbol.clone();
        let mut engine = test_engine(cfg);
        let tx = test_tx("0xmng", 1_636_120_053, 14_000_000);
        let event = Event::ReservesManaged {
            token: reserve_asset,
            amount: U256::from(2 * WEI), // 2.0 at 18 decimals
        };

        engine.process(&tx, &event);
        assert_eq!(
            engine.store.managed_reserve(&symbol).unwrap().amount,
            Decimal::TWO
        );

        // replaying the same event adds again: accumulator, not idempotent
        engine.process(&tx, &event);
        assert_eq!(
            engine.store.managed_reserve(&symbol).unwrap().amount,
            Decimal::from(4)
        );

        // the metric record folded the accumulator in
        let pm = engine
            .store
            .protocol_metric(day_bucket(tx.timestamp))
            .unwrap();
        assert_eq!(pm.managed, Decimal::from(4));
    }

    #[test]
    fn test_reserves_managed_ignores_other_tokens() {
        let cfg = Config::default();
        let symbol = cfg.reserve_symbol.clone();
        let mut engine = test_engine(cfg);
        let tx = test_tx("0xmng2", 1_636_120_053, 14_000_000);

        engine.process(
            &tx,
            &Event::ReservesManaged {
                token: Address::repeat_byte(0x99),
                amount: U256::from(5 * WEI),
            },
        );

        assert!(engine.store.managed_reserve(&symbol).is_none());
        // the event was ignored entirely: no metric record either
        assert!(engine
            .store
            .protocol_metric(day_bucket(tx.timestamp))
            .is_none());
    }

    #[test]
    fn test_redeem_records_marker_and_updates_holder() {
        let cfg = Config::default();
        let mut engine = test_engine(cfg);
        let tx = test_tx("0xrdm", 1_636_120_053, 14_000_000);

        engine.process(
            &tx,
            &Event::Redeem {
                market: "SQUIDETHLPBond".to_string(),
            },
        );

        let holder = engine.store.holder(depositor()).unwrap();
        assert!(holder.last_balance.is_some());
        // zero balances everywhere: holder immediately drops to inactive
        assert_eq!(engine.store.holder_count(), 0);
    }

    #[test]
    fn test_unknown_market_is_skipped() {
        let cfg = Config::default();
        let mut engine = test_engine(cfg);
        let tx = test_tx("0xunk", 1_636_120_053, 14_000_000);

        engine.process(
            &tx,
            &Event::Deposit {
                market: "NoSuchBond".to_string(),
                amount: U256::from(WEI),
                max_price: U256::ZERO,
            },
        );

        assert!(engine.store.deposit("0xunk").is_none());
        assert_eq!(engine.store.holder_count(), 0);
    }
}
