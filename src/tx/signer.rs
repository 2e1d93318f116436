//! Sender account and transaction signing

use crate::error::{TransferError, TransferResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, H256};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// The sending account. The key never leaves this type.
pub struct Account {
    wallet: LocalWallet,
}

impl Account {
    /// Parse a hex private key, with or without a `0x` prefix
    pub fn from_private_key(key: &SecretString) -> TransferResult<Self> {
        let wallet = key
            .expose_secret()
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| TransferError::PrivateKey(e.to_string()))?;

        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign `tx` for `chain_id`, producing the broadcastable envelope
    pub async fn sign(&self, mut tx: TypedTransaction, chain_id: u64) -> TransferResult<SignedTransfer> {
        tx.set_chain_id(chain_id);
        let wallet = self.wallet.clone().with_chain_id(chain_id);

        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| TransferError::Signing(e.to_string()))?;

        Ok(SignedTransfer {
            raw: tx.rlp_signed(&signature),
            hash: tx.hash(&signature),
        })
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// A signed transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    /// EIP-2718 envelope: `0x02 || rlp(fields, y_parity, r, s)`
    pub raw: Bytes,
    pub hash: H256,
}
