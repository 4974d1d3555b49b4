//! Decimal Engine
//!
//! Converts raw on-chain integer amounts (fixed-point with an implicit
//! decimal exponent, 9 for the protocol token, 18 for most reserve assets)
//! into exact `Decimal` values. All derived figures and accumulators use
//! `Decimal` so that repeated accumulation (e.g. the managed-reserve total)
//! never drifts.

use alloy_primitives::U256;
use rust_decimal::prelude::*;
use tracing::warn;

use crate::errors::ArithmeticError;

/// Decimal places of the protocol token and its staked counterpart.
pub const PROTOCOL_TOKEN_DECIMALS: u32 = 9;

/// Decimal places of standard 18-decimal ERC-20s (WETH, LP tokens).
pub const ETHER_DECIMALS: u32 = 18;

/// Scale a raw integer token amount by 10^-decimals.
///
/// Amounts beyond the 96-bit `Decimal` mantissa are clamped to
/// `Decimal::MAX`; that only happens for values no real token balance
/// reaches, and a clamped treasury is more useful than a crash.
pub fn to_decimal(raw: U256, decimals: u32) -> Decimal {
    let mantissa: u128 = match raw.try_into() {
        Ok(v) => v,
        Err(_) => {
            warn!("raw amount {} exceeds u128, clamping", raw);
            u128::MAX
        }
    };

    let value = Decimal::from_u128(mantissa).unwrap_or(Decimal::MAX);

    if decimals == 0 {
        return value;
    }

    // 10^-decimals as an exact Decimal (token decimals never exceed 28)
    value * Decimal::new(1, decimals)
}

/// Division with an explicit zero-denominator check.
///
/// The engine guards every division site with a positivity precondition;
/// this exists for the places where the denominator comes straight from
/// chain state and the guard wants to be visible in the signature.
pub fn checked_div(numerator: Decimal, denominator: Decimal) -> Result<Decimal, ArithmeticError> {
    if denominator.is_zero() {
        return Err(ArithmeticError);
    }
    Ok(numerator / denominator)
}
