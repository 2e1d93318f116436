//! Transaction construction, signing and submission

mod amount;
mod gas;
mod sender;
mod signer;
mod token;

pub use amount::TokenAmount;
pub use gas::{NativeGasLimit, NATIVE_TRANSFER_GAS};
pub use sender::{TransferOutcome, TransferRequest, TransferSender};
pub use signer::Account;
