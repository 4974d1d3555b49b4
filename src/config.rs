//! Configuration for the metrics engine
//!
//! Contract addresses, activation block heights, decimal conventions and the
//! data-driven bond market list. Defaults describe the mainnet deployment;
//! a TOML file can override everything for other deployments or tests.

use alloy_primitives::{address, Address};
use eyre::{Result, WrapErr};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================
// FIXED PROJECTION CONSTANTS
// ============================================

/// Rebases per day (one per 8-hour epoch).
pub const REBASES_PER_DAY: f64 = 3.0;

/// Compounding periods used for the APY projection: (365 * 3) - 1.
pub const APY_COMPOUND_PERIODS: f64 = 1094.0;

/// The 8 fixed per-rebase reference rates for the runway projection,
/// ordered from the lowest supported rate to the highest. The ninth runway
/// slot uses the current rebase rate instead of a fixed one.
pub const RUNWAY_REFERENCE_RATES: [f64; 8] = [
    0.0029438, 0.003579, 0.0039507, 0.00421449, 0.00485037, 0.00569158, 0.00600065, 0.00632839,
];

// ============================================
// BOND MARKETS
// ============================================

/// One bond depository market, gated by its activation block height.
///
/// The list is iterated uniformly; two entries may point at the same
/// depository contract (the legacy/v2 transition did exactly that), in
/// which case both contribute pending balance once both gates are open.
/// That double accounting is a configuration property, not engine logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondMarket {
    /// Display name of the bonded principal ("SQUID-ETH", "WETH").
    pub name: String,

    /// Unique key for bond position records ("SQUIDETHLPBond", "WETHBondV1", ...).
    pub label: String,

    /// Depository contract address.
    pub contract: Address,

    /// Block height after which the market is queried at all.
    pub activation_block: u64,

    /// Whether the hourly discount record tracks this market.
    pub tracks_discount: bool,

    /// Liquidity pair valuing the bonded principal; `None` when the
    /// principal is the reserve asset itself and is its own value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_pair: Option<Address>,
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Protocol Tokens ==========
    /// Base protocol token (9 decimals).
    pub protocol_token: Address,

    /// Staked (rebasing) token (9 decimals).
    pub staked_token: Address,

    // ========== Staking ==========
    /// Staking contract supplying the epoch distribution figure.
    pub staking_contract: Address,

    /// Block height after which the staking contract is live.
    pub staking_activation_block: u64,

    // ========== Treasury ==========
    /// Treasury address whose balances back the protocol.
    pub treasury: Address,

    /// Reserve asset held by the treasury and tracked by the managed
    /// reserve accumulator (WETH on mainnet).
    pub reserve_asset: Address,

    /// Symbol keying the managed reserve record.
    pub reserve_symbol: String,

    // ========== Reference Pair ==========
    /// Protocol-token / reserve-asset liquidity pair used for the USD rate
    /// and for valuing treasury LP holdings.
    pub reference_pair: Address,

    /// Decimals of reserve0 (the protocol token leg).
    pub pair_base_decimals: u32,

    /// Decimals of reserve1 (the reserve asset leg).
    pub pair_quote_decimals: u32,

    // ========== Bond Markets ==========
    pub bond_markets: Vec<BondMarket>,

    // ========== Holder Accounting ==========
    /// Balance below which a holder counts as inactive (token units).
    pub dust_threshold: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        let weth_bond = address!("31d0b3e2d8a47ef10c4d8d5b1e6b8b5e2b8a0c77");
        let reference_pair = address!("2001f950c4a664e5a3f50c8bbcf59d2f1b46423e");

        Self {
            protocol_token: address!("21ad647b8f4fe333212e735bfc1f36b4941e6ad2"),
            staked_token: address!("9d49bfc921f36448234b0efa67b5f91b3c691515"),
            staking_contract: address!("fa1ba18067ac6884fb26e329e60273488a247fc3"),
            staking_activation_block: 13_221_976,
            treasury: address!("61d8a57b3919e9f4777c80b6cf1138962855d2ca"),
            reserve_asset: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            reserve_symbol: "ETH".to_string(),
            reference_pair,
            pair_base_decimals: 9,
            pair_quote_decimals: 18,
            bond_markets: vec![
                BondMarket {
                    name: "SQUID-ETH".to_string(),
                    label: "SQUIDETHLPBond".to_string(),
                    contract: address!("8b7bf7b8f6e49c5a4f4c6fbbd4db7d6ab4b8a49f"),
                    activation_block: 13_239_370,
                    tracks_discount: true,
                    principal_pair: Some(reference_pair),
                },
                BondMarket {
                    name: "WETH".to_string(),
                    label: "WETHBondV1".to_string(),
                    contract: weth_bond,
                    activation_block: 13_239_372,
                    tracks_discount: true,
                    principal_pair: None,
                },
                // The v2 rollout kept taking deposits through the v1
                // depository, so this entry reuses the same contract under
                // a later gate. Once both gates are open the pending
                // balance is counted twice, matching the deployed indexer.
                BondMarket {
                    name: "WETH".to_string(),
                    label: "WETHBondV2".to_string(),
                    contract: weth_bond,
                    activation_block: 13_409_363,
                    tracks_discount: false,
                    principal_pair: None,
                },
            ],
            dust_threshold: Decimal::new(1, 2), // 0.01
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .wrap_err_with(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check the market list and decimal conventions.
    pub fn validate(&self) -> Result<()> {
        if self.bond_markets.is_empty() {
            eyre::bail!("at least one bond market must be configured");
        }

        let mut labels: Vec<&str> = self.bond_markets.iter().map(|m| m.label.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        if labels.len() != self.bond_markets.len() {
            eyre::bail!("bond market labels must be unique");
        }

        if self.pair_base_decimals > 28 || self.pair_quote_decimals > 28 {
            eyre::bail!("pair decimals out of range");
        }

        Ok(())
    }
}
