//! Bond Discount Tracker
//!
//! Maintains the hourly record of each tracked market's discount to the
//! token's spot price. Markets are evaluated uniformly from the configured
//! list; a market whose activation block is still ahead, whose price call
//! reverts, or whose price is non-positive keeps its previous stored value.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use tracing::debug;

use crate::chain::ChainView;
use crate::config::Config;
use crate::dates::{bucket_label, hour_bucket};
use crate::decimals::{to_decimal, ETHER_DECIMALS};
use crate::entities::BondDiscount;
use crate::events::Transaction;
use crate::price::token_usd_rate;
use crate::store::EntityStore;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Evaluate every tracked market at the transaction's hour bucket and save
/// the record once at the end.
pub fn update_bond_discounts<C: ChainView, S: EntityStore>(
    chain: &C,
    store: &mut S,
    cfg: &Config,
    tx: &Transaction,
) {
    let hour = hour_bucket(tx.timestamp);
    let mut record = store.bond_discount(hour).unwrap_or_else(|| {
        BondDiscount::new(
            hour,
            tx.timestamp,
            cfg.bond_markets
                .iter()
                .filter(|m| m.tracks_discount)
                .map(|m| m.label.clone()),
        )
    });

    let rate = token_usd_rate(chain, cfg);

    for market in cfg.bond_markets.iter().filter(|m| m.tracks_discount) {
        if tx.block_number <= market.activation_block {
            continue;
        }

        match chain.bond_price_in_usd(market.contract) {
            Ok(raw_price) if raw_price > U256::ZERO => {
                let bond_price = to_decimal(raw_price, ETHER_DECIMALS);
                let discount = (rate / bond_price - Decimal::ONE) * HUNDRED;
                debug!(
                    "{} discount: spot {} bond price {} -> {}%",
                    market.label, rate, bond_price, discount
                );
                record.discounts.insert(market.label.clone(), discount);
            }
            // reverted or non-positive price: keep whatever is stored
            _ => debug!("{} price unavailable, keeping previous discount", market.label),
        }
    }

    debug!("saving bond discounts for {}", bucket_label(hour));
    store.save_bond_discount(record);
}
