//! Error taxonomy for the metrics engine
//!
//! Two failure classes exist:
//! - `RevertedCall`: an on-chain read reverted. Always recoverable; every
//!   consumer falls back per-field (skip the update, keep the previous
//!   value, or treat as zero). Never aborts the rest of an aggregation.
//! - `ArithmeticError`: a division hit a zero denominator. Callers are
//!   expected to precondition-guard every division; reaching this at
//!   runtime means a bug, not a recoverable condition.

use thiserror::Error;

/// An on-chain read failed (the call reverted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("contract call reverted")]
pub struct RevertedCall;

/// Result of a single on-chain read.
pub type CallResult<T> = Result<T, RevertedCall>;

/// A division-based formula was invoked with a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arithmetic error: division by zero")]
pub struct ArithmeticError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RevertedCall.to_string(), "contract call reverted");
        assert_eq!(
            ArithmeticError.to_string(),
            "arithmetic error: division by zero"
        );
    }
}
