//! dynfee-send - build, sign and broadcast a single EIP-1559 transfer
//!
//! Sends either native coin or an ERC-20 token amount from the account behind
//! `-privateKey` to `-receiver`, pricing the transaction from the node's
//! latest base fee and suggested priority fee.

use anyhow::Result;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{debug, error, info};

mod chain;
mod cli;
mod config;
mod error;
mod tx;

use cli::Cli;
use config::Settings;
use error::TransferError;
use tx::{Account, TransferOutcome, TransferRequest, TransferSender};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<TransferError>() {
            Some(transfer_err) if transfer_err.is_usage() => {
                eprintln!("Error: {}", transfer_err);
                eprintln!();
                eprintln!("{}", Cli::usage());
                ExitCode::from(transfer_err.exit_code())
            }
            Some(transfer_err) => {
                error!("{:#}", err);
                ExitCode::from(transfer_err.exit_code())
            }
            None => {
                error!("{:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli)?;
    debug!("Resolved settings: {:?}", settings);

    // Parse everything local before dialing the endpoint
    let request = TransferRequest::from_settings(&settings)?;
    let account = Account::from_private_key(&settings.private_key)?;

    let node = chain::connect(&settings.rpc_url, settings.request_timeout).await?;
    info!("Connected to the RPC URL {}", settings.rpc_url);

    let sender = TransferSender::new(node, account);
    let outcome = sender.send(&request, settings.dry_run).await?;

    report(&outcome);
    Ok(())
}

fn report(outcome: &TransferOutcome) {
    debug!(
        "chain {} nonce {} from {:?} to {:?}: {} base units, gas limit {}, fee cap {} wei",
        outcome.chain_id,
        outcome.nonce,
        outcome.sender,
        outcome.destination,
        outcome.amount_units,
        outcome.gas_limit,
        outcome.fees.max_fee_per_gas
    );

    if outcome.broadcast {
        println!(
            "Transaction sent successfully! Transaction hash: {:?}",
            outcome.signed.hash
        );
        println!("Please check the transaction status on the blockchain explorer");
    } else {
        println!("Signed transaction (not broadcast): {}", outcome.signed.raw);
        println!("Transaction hash: {:?}", outcome.signed.hash);
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dynfee_send=info,ethers=warn"));

    let json = std::env::var("DYNFEE_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(wants_ansi(&std::io::stdout())),
            )
            .init();
    }
}

/// Colour only when writing to a terminal and `NO_COLOR` is unset
fn wants_ansi(out: &impl IsTerminal) -> bool {
    out.is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirected_output_is_not_coloured() {
        let file = tempfile::tempfile().unwrap();
        assert!(!wants_ansi(&file));
    }
}
