//! Transfer pipeline: resolve, price, build, sign and broadcast one transaction

use super::amount::{TokenAmount, NATIVE_DECIMALS};
use super::gas::{DynamicFees, NativeGasLimit};
use super::signer::{Account, SignedTransfer};
use super::token::{self, TokenAbi};
use crate::chain::NodeClient;
use crate::config::Settings;
use crate::error::{TransferError, TransferResult};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, U256};
use ethers::utils::to_checksum;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// ERC-20 leg of a transfer
#[derive(Debug, Clone)]
pub struct TokenTransfer {
    pub contract: Address,
    pub abi: TokenAbi,
}

/// A validated transfer, parsed from settings before any network call
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub receiver: Address,
    pub amount: TokenAmount,
    pub token: Option<TokenTransfer>,
    /// `None` means query the endpoint
    pub chain_id: Option<u64>,
    pub native_gas: NativeGasLimit,
}

impl TransferRequest {
    pub fn from_settings(settings: &Settings) -> TransferResult<Self> {
        let receiver = parse_address("receiver", &settings.receiver)?;

        let token = match &settings.token {
            Some(token) => Some(TokenTransfer {
                contract: parse_address("token contract", &token.contract)?,
                abi: TokenAbi::from_json(&token.abi)?,
            }),
            None => None,
        };

        Ok(Self {
            receiver,
            amount: settings.token_value.clone(),
            token,
            chain_id: settings.chain_id,
            native_gas: settings.native_gas,
        })
    }
}

/// Everything resolved during a run
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub chain_id: u64,
    pub sender: Address,
    pub nonce: U256,
    /// Receiver for native transfers, token contract for ERC-20 transfers
    pub destination: Address,
    /// Transfer amount in base units (wei or token units)
    pub amount_units: U256,
    pub fees: DynamicFees,
    pub gas_limit: U256,
    pub signed: SignedTransfer,
    pub broadcast: bool,
}

/// Resolved destination, value and call data
struct Payload {
    destination: Address,
    value: U256,
    data: Option<Bytes>,
    amount_units: U256,
}

/// Runs the transfer pipeline against one node for one account
pub struct TransferSender {
    node: Box<dyn NodeClient>,
    account: Account,
}

impl TransferSender {
    pub fn new(node: Box<dyn NodeClient>, account: Account) -> Self {
        Self { node, account }
    }

    /// Build, sign and (unless `dry_run`) broadcast `request`
    pub async fn send(&self, request: &TransferRequest, dry_run: bool) -> TransferResult<TransferOutcome> {
        let chain_id = self.resolve_chain_id(request.chain_id).await?;

        let sender = self.account.address();
        info!("Sender's address: {}", to_checksum(&sender, None));
        info!("Receiver address: {}", to_checksum(&request.receiver, None));

        let nonce = self.node.pending_nonce(sender).await?;
        info!("nonce: {}", nonce);

        let payload = self.resolve_payload(request).await?;

        let priority_fee = self.node.suggest_priority_fee().await?;
        let base_fee = self.node.latest_base_fee().await?;
        let fees = DynamicFees::from_base_fee(base_fee, priority_fee)?;
        info!(
            "Base fee: {} wei, priority fee: {} wei, fee cap: {} wei",
            fees.base_fee, fees.max_priority_fee_per_gas, fees.max_fee_per_gas
        );

        let gas_limit = self.resolve_gas_limit(request, &payload, sender).await?;
        info!("Gas limit: {}", gas_limit);
        if let Some(max_cost) = fees.max_cost(gas_limit) {
            debug!("Maximum fee for this transaction: {} wei", max_cost);
        }

        let mut tx = Eip1559TransactionRequest::new()
            .from(sender)
            .to(payload.destination)
            .value(payload.value)
            .nonce(nonce)
            .gas(gas_limit)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .chain_id(chain_id);
        if let Some(data) = payload.data {
            tx = tx.data(data);
        }

        let signed = self.account.sign(tx.into(), chain_id).await?;
        debug!("Signed transaction {:?} ({} bytes)", signed.hash, signed.raw.len());

        if dry_run {
            info!("Dry run: transaction not broadcast");
        } else {
            let node_hash = self.node.send_raw_transaction(signed.raw.clone()).await?;
            if node_hash != signed.hash {
                warn!(
                    "Node reported hash {:?}, expected {:?}",
                    node_hash, signed.hash
                );
            }
        }

        Ok(TransferOutcome {
            chain_id,
            sender,
            nonce,
            destination: payload.destination,
            amount_units: payload.amount_units,
            fees,
            gas_limit,
            signed,
            broadcast: !dry_run,
        })
    }

    async fn resolve_chain_id(&self, requested: Option<u64>) -> TransferResult<u64> {
        match requested {
            Some(chain_id) => {
                info!("Using specified chain ID: {}", chain_id);
                Ok(chain_id)
            }
            None => {
                let chain_id = self.node.chain_id().await?;
                info!("Automatically obtained chain ID: {}", chain_id);
                Ok(chain_id)
            }
        }
    }

    async fn resolve_payload(&self, request: &TransferRequest) -> TransferResult<Payload> {
        match &request.token {
            None => {
                let wei = request.amount.to_base_units(NATIVE_DECIMALS)?;
                info!(
                    "Transfer amount: {} tokens (equivalent to {} Wei)",
                    request.amount, wei
                );
                warn_if_zero(&request.amount, wei);

                Ok(Payload {
                    destination: request.receiver,
                    value: wei,
                    data: None,
                    amount_units: wei,
                })
            }
            Some(token) => {
                let decimals = self.token_decimals(token.contract).await?;
                let units = request.amount.to_base_units(decimals)?;
                info!(
                    "Transferring ERC20 token: {} (decimals: {}, base units: {})",
                    request.amount, decimals, units
                );
                warn_if_zero(&request.amount, units);

                let data = token.abi.encode_transfer(request.receiver, units)?;

                Ok(Payload {
                    destination: token.contract,
                    value: U256::zero(),
                    data: Some(data),
                    amount_units: units,
                })
            }
        }
    }

    async fn token_decimals(&self, contract: Address) -> TransferResult<u8> {
        let call: TypedTransaction = Eip1559TransactionRequest::new()
            .to(contract)
            .data(token::decimals_call_data())
            .into();

        let output = self
            .node
            .call(&call)
            .await
            .map_err(|e| match e {
                TransferError::Query { message, .. } => {
                    TransferError::query("get token decimals", message)
                }
                other => other,
            })?;

        token::decode_decimals(&output)
    }

    async fn resolve_gas_limit(
        &self,
        request: &TransferRequest,
        payload: &Payload,
        sender: Address,
    ) -> TransferResult<U256> {
        if request.token.is_none() {
            debug!("Native gas limit policy: {}", request.native_gas);
        }

        let estimate = match (&request.token, request.native_gas) {
            (None, NativeGasLimit::Fixed(limit)) => return Ok(U256::from(limit)),
            (None, NativeGasLimit::Estimate) => Eip1559TransactionRequest::new()
                .from(sender)
                .to(payload.destination)
                .value(payload.value),
            (Some(_), _) => {
                let mut call = Eip1559TransactionRequest::new()
                    .from(sender)
                    .to(payload.destination);
                if let Some(data) = &payload.data {
                    call = call.data(data.clone());
                }
                call
            }
        };

        let estimate: TypedTransaction = estimate.into();
        self.node.estimate_gas(&estimate).await
    }
}

fn parse_address(field: &'static str, value: &str) -> TransferResult<Address> {
    Address::from_str(value.trim()).map_err(|e| TransferError::Address {
        field,
        value: value.to_string(),
        message: e.to_string(),
    })
}

fn warn_if_zero(amount: &TokenAmount, units: U256) {
    if units.is_zero() {
        warn!(
            "Amount {} truncates to zero base units; the transfer will move nothing",
            amount
        );
    }
}
