//! Command-line flags
//!
//! Flags keep their single-dash camelCase spelling (`-privateKey 0x..`);
//! [`normalize_args`] rewrites them to the `--privateKey` form clap expects.

use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

const EXAMPLES: &str = "\
Example for ETH transfer:
  dynfee-send -privateKey 0x... -receiver 0x... -rpcURL https://... -chainID 1 -tokenValue 0.1

Example for ERC20 transfer:
  dynfee-send -privateKey 0x... -receiver 0x... -rpcURL https://... -chainID 1 -tokenValue 0.1 -tokenContract 0x... -tokenABI '[...]'";

/// Build, sign and broadcast one EIP-1559 transfer
#[derive(Parser)]
#[command(name = "dynfee-send", version, after_help = EXAMPLES)]
pub struct Cli {
    /// Sender's private key
    #[arg(
        long = "privateKey",
        value_name = "HEX",
        env = "DYNFEE_PRIVATE_KEY",
        hide_env_values = true
    )]
    pub private_key: Option<String>,

    /// Receiver's address
    #[arg(long = "receiver", value_name = "ADDRESS")]
    pub receiver: Option<String>,

    /// RPC URL
    #[arg(long = "rpcURL", value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Chain ID (if 0, it will be automatically obtained)
    #[arg(long = "chainID", value_name = "ID")]
    pub chain_id: Option<u64>,

    /// Transfer amount
    #[arg(long = "tokenValue", value_name = "AMOUNT")]
    pub token_value: Option<String>,

    /// Token contract address (if not provided, ETH will be transferred)
    #[arg(long = "tokenContract", value_name = "ADDRESS")]
    pub token_contract: Option<String>,

    /// Token ABI JSON string (required only for ERC20 transfers)
    #[arg(long = "tokenABI", value_name = "JSON")]
    pub token_abi: Option<String>,

    /// TOML configuration file
    #[arg(long = "config", value_name = "PATH", env = "DYNFEE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Estimate gas for native transfers instead of using 21000
    #[arg(long = "estimateNativeGas")]
    pub estimate_native_gas: bool,

    /// Per-request RPC timeout in seconds
    #[arg(long = "rpcTimeout", value_name = "SECS")]
    pub rpc_timeout: Option<u64>,

    /// Sign and print the raw transaction without broadcasting it
    #[arg(long = "dryRun")]
    pub dry_run: bool,
}

impl Cli {
    /// Parse the process arguments, exiting with usage on malformed flags
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Rendered help text, shown alongside usage errors
    pub fn usage() -> String {
        Self::command().render_help().to_string()
    }
}

/// Rewrite `-name` and `-name=value` to `--name`/`--name=value`.
///
/// Single-letter flags such as `-h`, arguments after `--` and values that do
/// not look like flags are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;

    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(idx, arg)| {
            if idx == 0 || passthrough {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    passthrough = true;
                    arg
                }
                Some(s) if is_single_dash_long(s) => OsString::from(format!("-{}", s)),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(arg: &str) -> bool {
    let mut chars = arg.chars();
    chars.next() == Some('-')
        && chars.next().map_or(false, |c| c.is_ascii_alphabetic())
        && chars.next().map_or(false, |c| c != '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["dynfee-send"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(normalize_args(argv)).unwrap()
    }

    #[test]
    fn single_dash_flags_are_accepted() {
        let cli = parse(&[
            "-privateKey",
            "0xabc",
            "-receiver",
            "0xdead",
            "-rpcURL",
            "http://localhost:8545",
            "-chainID",
            "421614",
            "-tokenValue",
            "0.001",
        ]);

        assert_eq!(cli.private_key.as_deref(), Some("0xabc"));
        assert_eq!(cli.receiver.as_deref(), Some("0xdead"));
        assert_eq!(cli.rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(cli.chain_id, Some(421614));
        assert_eq!(cli.token_value.as_deref(), Some("0.001"));
        assert!(cli.token_contract.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn double_dash_and_equals_forms_are_accepted() {
        let cli = parse(&["--receiver=0xdead", "-tokenValue=1.5", "-dryRun", "-estimateNativeGas"]);
        assert_eq!(cli.receiver.as_deref(), Some("0xdead"));
        assert_eq!(cli.token_value.as_deref(), Some("1.5"));
        assert!(cli.dry_run);
        assert!(cli.estimate_native_gas);
    }

    #[test]
    fn normalize_leaves_values_and_short_flags_alone() {
        let args = normalize_args(["bin", "-h", "-tokenABI", "[{\"type\":\"function\"}]", "--", "-x1"]);
        let args: Vec<_> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            ["bin", "-h", "--tokenABI", "[{\"type\":\"function\"}]", "--", "-x1"]
        );
    }

    #[test]
    fn negative_chain_id_is_a_usage_error() {
        let result = Cli::try_parse_from(normalize_args(["bin", "-chainID", "-1"]));
        assert!(result.is_err());
    }

    #[test]
    fn usage_lists_flags_and_examples() {
        let usage = Cli::usage();
        assert!(usage.contains("--privateKey"));
        assert!(usage.contains("--tokenABI"));
        assert!(usage.contains("Example for ERC20 transfer"));
    }
}
