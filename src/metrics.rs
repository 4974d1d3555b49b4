//! Protocol Metrics Aggregator
//!
//! Recomputes the daily protocol record from current chain state: supply
//! figures, treasury market / risk-free value, rebase and APY projection,
//! and the runway ladder. Every derived field overwrites; only the managed
//! reserve it folds in is accumulative (and that accumulates elsewhere).
//!
//! The APY and runway projections go through f64: they are transcendental
//! (pow/log) and the results are display figures, not accounting inputs.

use rust_decimal::prelude::*;
use tracing::debug;

use crate::chain::ChainView;
use crate::config::{Config, APY_COMPOUND_PERIODS, REBASES_PER_DAY, RUNWAY_REFERENCE_RATES};
use crate::dates::{bucket_label, day_bucket};
use crate::decimals::{to_decimal, ETHER_DECIMALS, PROTOCOL_TOKEN_DECIMALS};
use crate::discounts::update_bond_discounts;
use crate::entities::{ProtocolMetric, RunwayProjection};
use crate::events::Transaction;
use crate::price::{discounted_pair_usd_value, pair_usd_value, token_usd_rate};
use crate::store::EntityStore;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ============================================
// TREASURY VALUATION
// ============================================

#[derive(Debug, Clone, Copy)]
struct TreasuryValuation {
    market_value: Decimal,
    risk_free_value: Decimal,
    eth_risk_free_value: Decimal,
    eth_market_value: Decimal,
    pol: Decimal,
}

/// Sum the treasury's reserve-asset balance with the spot / risk-free
/// valuations of its LP holdings, and derive the protocol-owned-liquidity
/// percentage.
fn treasury_valuation<C: ChainView>(chain: &C, cfg: &Config) -> TreasuryValuation {
    let stable = chain
        .balance_of(cfg.reserve_asset, cfg.treasury)
        .map(|raw| to_decimal(raw, ETHER_DECIMALS))
        .unwrap_or(Decimal::ZERO);

    let lp_raw = chain
        .balance_of(cfg.reference_pair, cfg.treasury)
        .unwrap_or_default();
    let lp_balance = to_decimal(lp_raw, ETHER_DECIMALS);

    let total_lp = chain
        .pair_reserves(cfg.reference_pair)
        .map(|r| to_decimal(r.total_supply, ETHER_DECIMALS))
        .unwrap_or(Decimal::ZERO);
    let pol = if total_lp.is_zero() {
        Decimal::ZERO
    } else {
        lp_balance / total_lp * HUNDRED
    };

    let lp_value = pair_usd_value(chain, cfg, lp_raw, cfg.reference_pair);
    let lp_rfv = discounted_pair_usd_value(chain, cfg, lp_raw, cfg.reference_pair);

    let market_value = stable + lp_value;
    let risk_free_value = stable + lp_rfv;
    debug!("treasury market value {market_value}, risk-free value {risk_free_value}");

    TreasuryValuation {
        market_value,
        risk_free_value,
        // identical sums while WETH is the only stable asset; the record
        // keeps both breakdowns the schema exposes
        eth_risk_free_value: lp_rfv + stable,
        eth_market_value: lp_value + stable,
        pol,
    }
}

// ============================================
// REBASE / APY / RUNWAY
// ============================================

/// Distribution amount of the next epoch, zero before the staking contract
/// activates or when the read reverts.
fn next_distribution<C: ChainView>(chain: &C, cfg: &Config, tx: &Transaction) -> Decimal {
    if tx.block_number <= cfg.staking_activation_block {
        return Decimal::ZERO;
    }
    chain
        .epoch_distribution(cfg.staking_contract)
        .map(|raw| to_decimal(raw, PROTOCOL_TOKEN_DECIMALS))
        .unwrap_or(Decimal::ZERO)
}

/// Next-epoch rebase percentage and the APY it compounds to.
///
/// APY = ((rebase%/100 + 1)^1094 - 1) * 100. Only meaningful with a
/// positive staked supply; both figures are zero otherwise.
fn apy_and_rebase(staked_supply: Decimal, distributed: Decimal) -> (Decimal, Decimal) {
    if staked_supply <= Decimal::ZERO {
        return (Decimal::ZERO, Decimal::ZERO);
    }

    let rebase = distributed / staked_supply * HUNDRED;
    let rebase_fraction = rebase.to_f64().unwrap_or(0.0) / 100.0;
    let apy = ((rebase_fraction + 1.0).powf(APY_COMPOUND_PERIODS) - 1.0) * 100.0;

    let apy = if apy.is_finite() {
        Decimal::from_f64(apy).unwrap_or(Decimal::MAX)
    } else {
        Decimal::MAX
    };

    debug!("next rebase {rebase}%, current APY {apy}%");
    (apy, rebase)
}

/// Days of runway at each reference rebase rate, plus at the current rate.
///
/// runway_days = ln(rfv / staked) / ln(1 + rate) / 3. All slots are zero
/// unless staked supply, risk-free value and rebase rate are all positive.
fn runway(staked_supply: Decimal, rfv: Decimal, rebase: Decimal) -> RunwayProjection {
    if staked_supply <= Decimal::ZERO || rfv <= Decimal::ZERO || rebase <= Decimal::ZERO {
        return RunwayProjection::default();
    }

    let backing_ratio = (rfv / staked_supply).to_f64().unwrap_or(0.0);
    if backing_ratio <= 0.0 {
        return RunwayProjection::default();
    }

    let days_at = |rate: f64| -> Decimal {
        let days = backing_ratio.ln() / (1.0 + rate).ln() / REBASES_PER_DAY;
        Decimal::from_f64(days).unwrap_or(Decimal::ZERO)
    };

    let [r2500, r5000, r7500, r10000, r20000, r50000, r70000, r100000] =
        RUNWAY_REFERENCE_RATES.map(|rate| days_at(rate));
    let current_rate = rebase.to_f64().unwrap_or(0.0) / 100.0;

    RunwayProjection {
        p2500: r2500,
        p5000: r5000,
        p7500: r7500,
        p10000: r10000,
        p20000: r20000,
        p50000: r50000,
        p70000: r70000,
        p100000: r100000,
        current: days_at(current_rate),
    }
}

// ============================================
// AGGREGATOR
// ============================================

/// Recompute the day-bucket metric record for this transaction, save it,
/// then cascade into the hourly bond discount tracker.
pub fn update_protocol_metrics<C: ChainView, S: EntityStore>(
    chain: &C,
    store: &mut S,
    cfg: &Config,
    tx: &Transaction,
) {
    let day = day_bucket(tx.timestamp);
    let mut pm = store
        .protocol_metric(day)
        .unwrap_or_else(|| ProtocolMetric::new(day, tx.timestamp));

    pm.total_supply = chain
        .total_supply(cfg.protocol_token)
        .map(|raw| to_decimal(raw, PROTOCOL_TOKEN_DECIMALS))
        .unwrap_or(Decimal::ZERO);
    pm.circulating_supply = pm.total_supply;
    pm.staked_circulating_supply = chain
        .circulating_supply(cfg.staked_token)
        .map(|raw| to_decimal(raw, PROTOCOL_TOKEN_DECIMALS))
        .unwrap_or(Decimal::ZERO);

    pm.token_price = token_usd_rate(chain, cfg);
    pm.market_cap = pm.circulating_supply * pm.token_price;
    pm.total_value_locked = pm.staked_circulating_supply * pm.token_price;

    pm.managed = store
        .managed_reserve(&cfg.reserve_symbol)
        .map(|r| r.amount)
        .unwrap_or(Decimal::ZERO);

    let valuation = treasury_valuation(chain, cfg);
    pm.treasury_market_value = valuation.market_value + pm.managed;
    pm.treasury_risk_free_value = valuation.risk_free_value + pm.managed;
    pm.treasury_eth_risk_free_value = valuation.eth_risk_free_value + pm.managed;
    pm.treasury_eth_market_value = valuation.eth_market_value + pm.managed;
    pm.treasury_pol = valuation.pol;

    pm.next_distributed = next_distribution(chain, cfg, tx);
    let (apy, rebase) = apy_and_rebase(pm.staked_circulating_supply, pm.next_distributed);
    pm.current_apy = apy;
    pm.next_epoch_rebase = rebase;

    pm.runway = runway(
        pm.staked_circulating_supply,
        pm.treasury_risk_free_value,
        pm.next_epoch_rebase,
    );

    pm.holders = store.holder_count();

    debug!("saving protocol metrics for {}", bucket_label(day));
    store.save_protocol_metric(pm);

    update_bond_discounts(chain, store, cfg, tx);
}
