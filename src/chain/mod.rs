//! Chain module - the node RPC collaborator
//!
//! The transfer pipeline only ever talks to the node through [`NodeClient`].
//! [`connect`] picks an HTTP or WebSocket transport from the URL scheme.

pub mod provider;

pub use provider::ChainProvider;

use crate::error::{TransferError, TransferResult};

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, H256, U256};
use std::time::Duration;
use tracing::debug;

/// The remote calls a transfer run needs from an Ethereum node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> TransferResult<u64>;

    /// Transaction count for `address` including pending transactions
    async fn pending_nonce(&self, address: Address) -> TransferResult<U256>;

    /// `baseFeePerGas` of the latest block
    async fn latest_base_fee(&self) -> TransferResult<U256>;

    /// `eth_maxPriorityFeePerGas`
    async fn suggest_priority_fee(&self) -> TransferResult<U256>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> TransferResult<U256>;

    /// `eth_call` against the latest block
    async fn call(&self, tx: &TypedTransaction) -> TransferResult<Bytes>;

    /// `eth_sendRawTransaction`, returning the hash reported by the node
    async fn send_raw_transaction(&self, raw: Bytes) -> TransferResult<H256>;
}

/// Open a client session for `url`
pub async fn connect(url: &str, request_timeout: Duration) -> TransferResult<Box<dyn NodeClient>> {
    let scheme = url
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| TransferError::Connection {
            url: url.to_string(),
            message: "missing URL scheme".to_string(),
        })?;

    debug!("Connecting to {} endpoint", scheme);

    match scheme.as_str() {
        "http" | "https" => Ok(Box::new(ChainProvider::http(url, request_timeout)?)),
        "ws" | "wss" => Ok(Box::new(ChainProvider::ws(url, request_timeout).await?)),
        other => Err(TransferError::Connection {
            url: url.to_string(),
            message: format!("unsupported URL scheme {:?}", other),
        }),
    }
}
