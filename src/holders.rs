//! Holder Balance Tracker
//!
//! Per-address balance snapshots at day buckets, pending-bond accounting
//! across the configured market list, and the global active-holder counter.
//!
//! Counter rules: creation counts the holder as active; after that the
//! only transitions are active -> inactive when both base and staked
//! balances drop below the dust threshold, and inactive -> active when
//! either rises above it. Re-evaluating an unchanged state never touches
//! the counter.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use tracing::debug;

use crate::chain::ChainView;
use crate::config::Config;
use crate::dates::day_bucket;
use crate::decimals::{to_decimal, PROTOCOL_TOKEN_DECIMALS};
use crate::entities::{BondPosition, Holder, HolderBalance};
use crate::events::Transaction;
use crate::price::token_usd_rate;
use crate::store::EntityStore;

/// Fetch the holder record, creating it (and counting it) on first sight.
pub fn load_or_create_holder<S: EntityStore>(store: &mut S, address: Address) -> Holder {
    if let Some(holder) = store.holder(address) {
        return holder;
    }

    store.increment_holder_count();
    let holder = Holder::new(address);
    store.save_holder(holder.clone());
    debug!("new holder {address}, count now {}", store.holder_count());
    holder
}

/// Recompute the holder's bucketed snapshot from current chain state.
pub fn update_holder_balance<C: ChainView, S: EntityStore>(
    chain: &C,
    store: &mut S,
    cfg: &Config,
    holder: &mut Holder,
    tx: &Transaction,
) {
    let day = day_bucket(tx.timestamp);
    let mut balance = store
        .holder_balance(&HolderBalance::id_for(holder.id, day))
        .unwrap_or_else(|| HolderBalance::new(holder.id, day, tx.timestamp));

    balance.base_balance = chain
        .balance_of(cfg.protocol_token, holder.id)
        .map(|raw| to_decimal(raw, PROTOCOL_TOKEN_DECIMALS))
        .unwrap_or(Decimal::ZERO);
    balance.staked_balance = chain
        .balance_of(cfg.staked_token, holder.id)
        .map(|raw| to_decimal(raw, PROTOCOL_TOKEN_DECIMALS))
        .unwrap_or(Decimal::ZERO);

    apply_activity_transition(store, holder, &balance, cfg.dust_threshold);

    for market in &cfg.bond_markets {
        if tx.block_number <= market.activation_block {
            continue;
        }

        let pending = match chain.bond_info(market.contract, holder.id) {
            Ok(info) => info.pending,
            Err(_) => continue,
        };
        if pending == U256::ZERO {
            continue;
        }

        let pending_bond = to_decimal(pending, PROTOCOL_TOKEN_DECIMALS);
        balance.bond_balance += pending_bond;

        let position = BondPosition {
            id: BondPosition::id_for(holder.id, tx.timestamp, &market.label),
            name: market.name.clone(),
            contract: market.contract,
            amount: pending_bond,
        };
        debug!(
            "holder {} pending {} {} on tx {}",
            holder.id, market.label, pending_bond, tx.id
        );
        balance.bond_positions.push(position.id.clone());
        store.save_bond_position(position);
    }

    let usd_rate = token_usd_rate(chain, cfg);
    balance.dollar_balance =
        (balance.base_balance + balance.staked_balance + balance.bond_balance) * usd_rate;

    holder.last_balance = Some(balance.id.clone());
    store.save_holder_balance(balance);
    store.save_holder(holder.clone());
}

/// Exactly-once counter updates on activity threshold crossings.
fn apply_activity_transition<S: EntityStore>(
    store: &mut S,
    holder: &mut Holder,
    balance: &HolderBalance,
    dust: Decimal,
) {
    if holder.active && balance.base_balance < dust && balance.staked_balance < dust {
        store.decrement_holder_count();
        holder.active = false;
        debug!("holder {} inactive, count now {}", holder.id, store.holder_count());
    } else if !holder.active && (balance.base_balance > dust || balance.staked_balance > dust) {
        store.increment_holder_count();
        holder.active = true;
        debug!("holder {} active again, count now {}", holder.id, store.holder_count());
    }
}
