//! Upstream feed types
//!
//! The upstream feed delivers one normalized event at a time: a transaction
//! context plus an event-specific payload, together with the snapshot of
//! on-chain values fetched at that transaction. The engine processes each
//! line fully before the next is presented.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::chain::SnapshotChain;

/// Context of the transaction that triggered an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash, hex-encoded.
    pub id: String,
    pub from: Address,
    pub timestamp: i64,
    pub block_number: u64,
}

/// Event payloads the engine reacts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Bond deposit into one of the configured markets.
    Deposit {
        /// Label of the bond market the deposit went into.
        market: String,
        /// Raw principal amount (18 decimals).
        amount: U256,
        /// Raw max-price bound the depositor accepted.
        max_price: U256,
    },

    /// Bond redemption from one of the configured markets.
    Redeem { market: String },

    /// Treasury moved reserves into external management.
    ReservesManaged { token: Address, amount: U256 },
}

/// One replay feed line: the event and the chain state observed at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedLine {
    pub transaction: Transaction,
    pub event: Event,
    #[serde(default)]
    pub snapshot: SnapshotChain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_line_parses_deposit() {
        let raw = r#"{
            "transaction": {
                "id": "0xabc",
                "from": "0x1111111111111111111111111111111111111111",
                "timestamp": 1636120053,
                "block_number": 13560000
            },
            "event": {
                "kind": "deposit",
                "market": "SQUIDETHLPBond",
                "amount": "0xde0b6b3a7640000",
                "max_price": "0x0"
            }
        }"#;

        let line: FeedLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.transaction.block_number, 13_560_000);
        match line.event {
            Event::Deposit { amount, .. } => {
                assert_eq!(amount, U256::from(1_000_000_000_000_000_000u128));
            }
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn test_feed_line_parses_reserves_managed() {
        let raw = r#"{
            "transaction": {
                "id": "0xdef",
                "from": "0x2222222222222222222222222222222222222222",
                "timestamp": 1636120053,
                "block_number": 13560001
            },
            "event": {
                "kind": "reserves_managed",
                "token": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
                "amount": "0x1bc16d674ec80000"
            }
        }"#;

        let line: FeedLine = serde_json::from_str(raw).unwrap();
        match line.event {
            Event::ReservesManaged { amount, .. } => {
                assert_eq!(amount, U256::from(2_000_000_000_000_000_000u128));
            }
            _ => panic!("expected reserves_managed"),
        }
    }
}
