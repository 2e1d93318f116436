//! Human-readable decimal amounts and their conversion to base units

use crate::error::{TransferError, TransferResult};

use ethers::types::U256;
use std::fmt;
use std::str::FromStr;

/// Decimals of the native coin (wei per ether)
pub const NATIVE_DECIMALS: u8 = 18;

/// Largest power of ten that fits in a uint256
const MAX_EXPONENT: i64 = 77;

/// A non-negative decimal amount, kept exact as `digits × 10^-scale`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    raw: String,
    /// All significant digits with the decimal point removed
    digits: String,
    /// Number of digits after the decimal point once any exponent is applied
    scale: i64,
}

impl TokenAmount {
    pub fn is_zero(&self) -> bool {
        self.digits.bytes().all(|b| b == b'0')
    }

    /// Multiply by `10^decimals` and truncate toward zero
    pub fn to_base_units(&self, decimals: u8) -> TransferResult<U256> {
        let shift = i64::from(decimals) - self.scale;

        let units = if shift >= 0 {
            if shift > MAX_EXPONENT {
                return Err(self.overflow());
            }
            let digits = U256::from_dec_str(&self.digits).map_err(|_| self.overflow())?;
            digits
                .checked_mul(U256::exp10(shift as usize))
                .ok_or_else(|| self.overflow())?
        } else {
            let drop = shift.unsigned_abs() as usize;
            if drop >= self.digits.len() {
                U256::zero()
            } else {
                let kept = &self.digits[..self.digits.len() - drop];
                U256::from_dec_str(kept).map_err(|_| self.overflow())?
            }
        };

        Ok(units)
    }

    fn overflow(&self) -> TransferError {
        TransferError::Amount {
            value: self.raw.clone(),
            message: "amount does not fit in uint256".to_string(),
        }
    }
}

impl FromStr for TokenAmount {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |message: &str| TransferError::Amount {
            value: raw.to_string(),
            message: message.to_string(),
        };

        if raw.starts_with('-') {
            return Err(invalid("amount must not be negative"));
        }
        let unsigned = raw.strip_prefix('+').unwrap_or(raw);

        let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
            Some(idx) => {
                let exponent = unsigned[idx + 1..]
                    .parse::<i32>()
                    .map_err(|_| invalid("malformed exponent"))?;
                (&unsigned[..idx], i64::from(exponent))
            }
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a decimal number"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }

        let digits = format!("{}{}", int_part, frac_part);
        let digits = match digits.trim_start_matches('0') {
            "" => "0".to_string(),
            trimmed => trimmed.to_string(),
        };

        Ok(Self {
            raw: raw.to_string(),
            digits,
            scale: frac_part.len() as i64 - exponent,
        })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
