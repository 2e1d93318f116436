//! Fee and gas-limit policy for dynamic-fee transactions

use crate::error::{TransferError, TransferResult};

use ethers::types::U256;
use std::fmt;

/// Gas used by a plain value transfer to an externally owned account
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Fee parameters for one EIP-1559 transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicFees {
    pub base_fee: U256,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
}

impl DynamicFees {
    /// Derive the fee cap from the latest base fee and the suggested tip.
    ///
    /// The cap is `base_fee * 2 + priority_fee`. The tip is passed through
    /// unchanged.
    pub fn from_base_fee(base_fee: U256, priority_fee: U256) -> TransferResult<Self> {
        let max_fee_per_gas = base_fee
            .checked_mul(U256::from(2))
            .and_then(|doubled| doubled.checked_add(priority_fee))
            .ok_or(TransferError::Overflow("fee cap"))?;

        Ok(Self {
            base_fee,
            max_priority_fee_per_gas: priority_fee,
            max_fee_per_gas,
        })
    }

    /// Upper bound on the fee paid for `gas_limit` units
    pub fn max_cost(&self, gas_limit: U256) -> Option<U256> {
        gas_limit.checked_mul(self.max_fee_per_gas)
    }
}

/// How the gas limit of a native transfer is chosen.
///
/// Token transfers always estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeGasLimit {
    Fixed(u64),
    Estimate,
}

impl Default for NativeGasLimit {
    fn default() -> Self {
        NativeGasLimit::Fixed(NATIVE_TRANSFER_GAS)
    }
}

impl fmt::Display for NativeGasLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeGasLimit::Fixed(limit) => write!(f, "fixed {}", limit),
            NativeGasLimit::Estimate => f.write_str("estimated"),
        }
    }
}
