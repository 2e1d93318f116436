//! Configuration management for dynfee-send
//!
//! Values come from command-line flags, environment variables and an
//! optional TOML file, in that order of precedence. The file supports
//! `${VAR_NAME}` environment substitution.

use crate::cli::Cli;
use crate::error::{TransferError, TransferResult};
use crate::tx::{NativeGasLimit, TokenAmount, NATIVE_TRANSFER_GAS};

use anyhow::{Context, Result};
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Default per-request RPC timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Contents of the optional config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub network: NetworkConfig,
    pub signer: SignerConfig,
    pub gas: GasConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignerConfig {
    pub private_key: Option<String>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GasConfig {
    pub native_gas_limit: Option<u64>,
    pub estimate_native_gas: Option<bool>,
}

impl FileConfig {
    /// Load a config file, substituting environment variables
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config_str = substitute_env_vars(&config_str);

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration: {:?}", path))
    }
}

/// Token transfer parameters, present only for ERC-20 transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub contract: String,
    pub abi: String,
}

/// Fully resolved settings for one run
pub struct Settings {
    pub rpc_url: String,
    /// `None` means query the endpoint
    pub chain_id: Option<u64>,
    pub private_key: SecretString,
    pub receiver: String,
    pub token_value: TokenAmount,
    pub token: Option<TokenSettings>,
    pub native_gas: NativeGasLimit,
    pub request_timeout: Duration,
    pub dry_run: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("private_key", &"[REDACTED]")
            .field("receiver", &self.receiver)
            .field("token_value", &self.token_value)
            .field("token", &self.token)
            .field("native_gas", &self.native_gas)
            .field("request_timeout", &self.request_timeout)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Settings {
    /// Load settings from the command line and the optional config file
    pub fn load(cli: Cli) -> Result<Self> {
        require_flag_only_values(&cli)?;

        let file = match cli.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Ok(Self::resolve(cli, file)?)
    }

    /// Merge flags over file values and validate the result.
    ///
    /// Every failure here is reported before any network activity.
    pub fn resolve(cli: Cli, file: FileConfig) -> TransferResult<Self> {
        let private_key = non_empty(cli.private_key).or_else(|| non_empty(file.signer.private_key));
        let rpc_url = non_empty(cli.rpc_url).or_else(|| non_empty(file.network.rpc_url));
        let receiver = non_empty(cli.receiver);
        let token_value = non_empty(cli.token_value);

        let missing: Vec<&str> = [
            ("-privateKey", private_key.is_none()),
            ("-receiver", receiver.is_none()),
            ("-rpcURL", rpc_url.is_none()),
            ("-tokenValue", token_value.is_none()),
        ]
        .into_iter()
        .filter_map(|(flag, absent)| absent.then_some(flag))
        .collect();

        let (Some(private_key), Some(rpc_url), Some(receiver), Some(token_value)) =
            (private_key, rpc_url, receiver, token_value)
        else {
            return Err(TransferError::Usage(format!(
                "Missing required parameters: {}",
                missing.join(", ")
            )));
        };

        let token_value: TokenAmount = token_value
            .parse()
            .map_err(|e: TransferError| TransferError::Usage(e.to_string()))?;
        if token_value.is_zero() {
            return Err(TransferError::Usage(
                "Missing required parameters: -tokenValue must be positive".to_string(),
            ));
        }

        let token = match (non_empty(cli.token_contract), non_empty(cli.token_abi)) {
            (Some(contract), Some(abi)) => Some(TokenSettings { contract, abi }),
            (None, None) => None,
            _ => {
                return Err(TransferError::Usage(
                    "Both tokenContract and tokenABI must be provided for ERC20 transfers"
                        .to_string(),
                ))
            }
        };

        let chain_id = cli
            .chain_id
            .or(file.network.chain_id)
            .filter(|id| *id != 0);

        let timeout_secs = cli
            .rpc_timeout
            .or(file.network.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(TransferError::Usage(
                "-rpcTimeout must be at least 1 second".to_string(),
            ));
        }

        let native_gas = if cli.estimate_native_gas || file.gas.estimate_native_gas.unwrap_or(false) {
            NativeGasLimit::Estimate
        } else {
            match file.gas.native_gas_limit.unwrap_or(NATIVE_TRANSFER_GAS) {
                0 => {
                    return Err(TransferError::Config(
                        "gas.native_gas_limit must be positive".to_string(),
                    ))
                }
                limit => NativeGasLimit::Fixed(limit),
            }
        };

        Ok(Self {
            rpc_url,
            chain_id,
            private_key: SecretString::from(private_key),
            receiver,
            token_value,
            token,
            native_gas,
            request_timeout: Duration::from_secs(timeout_secs),
            dry_run: cli.dry_run,
        })
    }
}

/// `-receiver` and `-tokenValue` have no file equivalent
fn require_flag_only_values(cli: &Cli) -> TransferResult<()> {
    let missing: Vec<&str> = [("-receiver", &cli.receiver), ("-tokenValue", &cli.token_value)]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(flag, _)| flag)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TransferError::Usage(format!(
            "Missing required parameters: {}",
            missing.join(", ")
        )))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    let re = ENV_VAR.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
    });

    re.replace_all(input, |caps: &regex::Captures| {
        env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}
