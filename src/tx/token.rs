//! ERC-20 helpers: ABI loading, `decimals()` lookup and `transfer` encoding

use crate::error::{TransferError, TransferResult};

use ethers::abi::{Abi, Token};
use ethers::types::{Address, Bytes, U256};

/// Function selector for `decimals()`: `0x313ce567`
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

const TRANSFER_FUNCTION: &str = "transfer";

/// A user-supplied token ABI that declares `transfer`
#[derive(Debug, Clone)]
pub struct TokenAbi {
    abi: Abi,
}

impl TokenAbi {
    /// Parse an ABI JSON document
    pub fn from_json(json: &str) -> TransferResult<Self> {
        let abi: Abi =
            serde_json::from_str(json).map_err(|e| TransferError::Abi(e.to_string()))?;

        abi.function(TRANSFER_FUNCTION).map_err(|e| {
            TransferError::Abi(format!("ABI does not declare {}: {}", TRANSFER_FUNCTION, e))
        })?;

        Ok(Self { abi })
    }

    /// Encode `transfer(to, amount)` as call data
    pub fn encode_transfer(&self, to: Address, amount: U256) -> TransferResult<Bytes> {
        let function = self
            .abi
            .function(TRANSFER_FUNCTION)
            .map_err(|e| TransferError::Abi(e.to_string()))?;

        function
            .encode_input(&[Token::Address(to), Token::Uint(amount)])
            .map(Bytes::from)
            .map_err(|e| TransferError::Abi(format!("failed to pack transfer data: {}", e)))
    }
}

/// Call data for `decimals()`
pub fn decimals_call_data() -> Bytes {
    Bytes::from(DECIMALS_SELECTOR.to_vec())
}

/// Read `decimals()` output: a uint8 right-aligned in a 32-byte word
pub fn decode_decimals(output: &[u8]) -> TransferResult<u8> {
    output
        .last()
        .copied()
        .ok_or_else(|| TransferError::query("get token decimals", "empty result from decimals()"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"constant":true,"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint8"}],"type":"function"},
        {"constant":false,"inputs":[{"name":"_to","type":"address"},{"name":"_value","type":"uint256"}],"name":"transfer","outputs":[{"name":"","type":"bool"}],"type":"function"}
    ]"#;

    fn receiver() -> Address {
        "0x000000000000000000000000000000000000dEaD".parse().unwrap()
    }

    #[test]
    fn decimals_selector_matches_signature_hash() {
        assert_eq!(ethers::utils::id("decimals()"), DECIMALS_SELECTOR);
        assert_eq!(decimals_call_data().as_ref(), &DECIMALS_SELECTOR);
    }

    #[test]
    fn decimals_reads_last_byte_of_padded_word() {
        let mut word = [0u8; 32];
        word[31] = 0x06;
        assert_eq!(decode_decimals(&word).unwrap(), 6);

        word[31] = 18;
        assert_eq!(decode_decimals(&word).unwrap(), 18);
    }

    #[test]
    fn decimals_empty_result_is_an_error() {
        assert!(matches!(
            decode_decimals(&[]),
            Err(TransferError::Query { .. })
        ));
    }

    #[test]
    fn encode_transfer_layout() {
        let abi = TokenAbi::from_json(ERC20_ABI).unwrap();
        let data = abi
            .encode_transfer(receiver(), U256::from(1_500_000u64))
            .unwrap();

        // selector + address word + amount word
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], receiver().as_bytes());
        assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(1_500_000u64));
    }

    #[test]
    fn abi_without_transfer_is_rejected() {
        let abi = r#"[{"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint8"}],"type":"function","stateMutability":"view"}]"#;
        let err = TokenAbi::from_json(abi).unwrap_err();
        assert!(err.to_string().contains("transfer"));
    }

    #[test]
    fn malformed_abi_is_rejected() {
        assert!(matches!(
            TokenAbi::from_json("[{not json"),
            Err(TransferError::Abi(_))
        ));
    }
}
