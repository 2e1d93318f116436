//! ethers-backed node client with per-request timeouts

use super::NodeClient;
use crate::error::{TransferError, TransferResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, JsonRpcClient, Provider, Ws};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// A single-endpoint provider; every request is bounded by `request_timeout`
pub struct ChainProvider<P> {
    provider: Provider<P>,
    request_timeout: Duration,
}

impl ChainProvider<Http> {
    /// Create an HTTP provider. No request is made until the first call.
    pub fn http(url: &str, request_timeout: Duration) -> TransferResult<Self> {
        let provider =
            Provider::<Http>::try_from(url).map_err(|e| TransferError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            provider,
            request_timeout,
        })
    }
}

impl ChainProvider<Ws> {
    /// Create a WebSocket provider, completing the handshake
    pub async fn ws(url: &str, request_timeout: Duration) -> TransferResult<Self> {
        let provider = match timeout(request_timeout, Provider::<Ws>::connect(url)).await {
            Ok(Ok(provider)) => provider,
            Ok(Err(e)) => {
                return Err(TransferError::Connection {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransferError::Timeout {
                    operation: "WebSocket handshake",
                })
            }
        };

        Ok(Self {
            provider,
            request_timeout,
        })
    }
}

impl<P: JsonRpcClient> ChainProvider<P> {
    async fn bounded<F, T>(&self, operation: &'static str, fut: F) -> TransferResult<Result<T, ProviderError>>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        timeout(self.request_timeout, fut)
            .await
            .map_err(|_| TransferError::Timeout { operation })
    }
}

#[async_trait]
impl<P: JsonRpcClient> NodeClient for ChainProvider<P> {
    async fn chain_id(&self) -> TransferResult<u64> {
        let id = self
            .bounded("get chain ID", self.provider.get_chainid())
            .await?
            .map_err(|e| TransferError::query("get chain ID", e))?;

        if id > U256::from(u64::MAX) {
            return Err(TransferError::query(
                "get chain ID",
                format!("chain ID {} does not fit in 64 bits", id),
            ));
        }
        Ok(id.as_u64())
    }

    async fn pending_nonce(&self, address: Address) -> TransferResult<U256> {
        self.bounded(
            "get nonce",
            self.provider
                .get_transaction_count(address, Some(BlockNumber::Pending.into())),
        )
        .await?
        .map_err(|e| TransferError::query("get nonce", e))
    }

    async fn latest_base_fee(&self) -> TransferResult<U256> {
        let block = self
            .bounded("get latest header", self.provider.get_block(BlockNumber::Latest))
            .await?
            .map_err(|e| TransferError::query("get latest header", e))?
            .ok_or_else(|| TransferError::query("get latest header", "no latest block"))?;

        debug!("Latest block: {:?}", block.number);

        block.base_fee_per_gas.ok_or_else(|| {
            TransferError::query("get latest header", "latest block has no base fee")
        })
    }

    async fn suggest_priority_fee(&self) -> TransferResult<U256> {
        self.bounded(
            "suggest gas tip cap",
            self.provider.request::<_, U256>("eth_maxPriorityFeePerGas", ()),
        )
        .await?
        .map_err(|e| TransferError::query("suggest gas tip cap", e))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> TransferResult<U256> {
        self.bounded("estimate gas", self.provider.estimate_gas(tx, None))
            .await?
            .map_err(|e| TransferError::GasEstimation(e.to_string()))
    }

    async fn call(&self, tx: &TypedTransaction) -> TransferResult<Bytes> {
        self.bounded("call contract", self.provider.call(tx, None))
            .await?
            .map_err(|e| TransferError::query("call contract", e))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> TransferResult<H256> {
        let pending = self
            .bounded("send transaction", self.provider.send_raw_transaction(raw))
            .await?
            .map_err(|e| TransferError::Broadcast(e.to_string()))?;

        Ok(pending.tx_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{MockError, MockProvider};
    use serde::{de::DeserializeOwned, Serialize};
    use std::fmt::Debug;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn mocked() -> (ChainProvider<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (
            ChainProvider {
                provider,
                request_timeout: TIMEOUT,
            },
            mock,
        )
    }

    /// A transport that never answers
    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl JsonRpcClient for Stalled {
        type Error = MockError;

        async fn request<T, R>(&self, _method: &str, _params: T) -> Result<R, Self::Error>
        where
            T: Debug + Serialize + Send + Sync,
            R: DeserializeOwned + Send,
        {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn base_fee_is_read_from_latest_block() {
        let (client, mock) = mocked();
        let block = Block::<H256> {
            base_fee_per_gas: Some(U256::from(100_000_000u64)),
            ..Default::default()
        };
        mock.push(block).unwrap();

        assert_eq!(client.latest_base_fee().await.unwrap(), U256::from(100_000_000u64));
        mock.assert_request("eth_getBlockByNumber", ("latest", false))
            .unwrap();
    }

    #[tokio::test]
    async fn block_without_base_fee_is_a_query_error() {
        let (client, mock) = mocked();
        mock.push(Block::<H256>::default()).unwrap();

        assert!(matches!(
            client.latest_base_fee().await,
            Err(TransferError::Query { operation: "get latest header", .. })
        ));
    }

    #[tokio::test]
    async fn nonce_uses_the_pending_block_tag() {
        let (client, mock) = mocked();
        let address: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        mock.push(U256::from(3u64)).unwrap();

        assert_eq!(client.pending_nonce(address).await.unwrap(), U256::from(3u64));
        mock.assert_request("eth_getTransactionCount", (address, "pending"))
            .unwrap();
    }

    #[tokio::test]
    async fn chain_id_and_tip_are_decoded() {
        let (client, mock) = mocked();
        mock.push(U256::from(421614u64)).unwrap();
        assert_eq!(client.chain_id().await.unwrap(), 421614);

        mock.push(U256::from(7u64)).unwrap();
        assert_eq!(client.suggest_priority_fee().await.unwrap(), U256::from(7u64));
    }

    #[tokio::test]
    async fn chain_id_wider_than_u64_is_rejected() {
        let (client, mock) = mocked();
        mock.push(U256::MAX).unwrap();

        assert!(matches!(
            client.chain_id().await,
            Err(TransferError::Query { operation: "get chain ID", .. })
        ));
    }

    #[tokio::test]
    async fn node_errors_map_to_their_failure_class() {
        // An empty mock fails every request
        let (client, _mock) = mocked();
        let tx: TypedTransaction = Eip1559TransactionRequest::new().into();

        assert!(matches!(
            client.estimate_gas(&tx).await,
            Err(TransferError::GasEstimation(_))
        ));
        assert!(matches!(
            client.send_raw_transaction(Bytes::from(vec![0x02])).await,
            Err(TransferError::Broadcast(_))
        ));
        assert!(matches!(
            client.call(&tx).await,
            Err(TransferError::Query { operation: "call contract", .. })
        ));
    }

    #[tokio::test]
    async fn broadcast_returns_the_node_hash() {
        let (client, mock) = mocked();
        let hash = H256::repeat_byte(0xab);
        mock.push(hash).unwrap();

        assert_eq!(
            client.send_raw_transaction(Bytes::from(vec![0x02])).await.unwrap(),
            hash
        );
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let client = ChainProvider {
            provider: Provider::new(Stalled),
            request_timeout: Duration::from_millis(20),
        };

        assert!(matches!(
            client.pending_nonce(Address::zero()).await,
            Err(TransferError::Timeout { operation: "get nonce" })
        ));
        assert!(matches!(
            client.latest_base_fee().await,
            Err(TransferError::Timeout { operation: "get latest header" })
        ));
    }
}
