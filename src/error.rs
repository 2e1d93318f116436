//! Error types for dynfee-send

use thiserror::Error;

/// Main error type for a transfer run
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to the RPC URL {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Failed to parse private key: {0}")]
    PrivateKey(String),

    #[error("Invalid {field} address {value:?}: {message}")]
    Address {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("Invalid transfer amount {value:?}: {message}")]
    Amount { value: String, message: String },

    #[error("Failed to parse ABI: {0}")]
    Abi(String),

    #[error("Failed to {operation}: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to estimate gas: {0}")]
    GasEstimation(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error("Failed to send transaction: {0}")]
    Broadcast(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: &'static str },

    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

impl TransferError {
    /// Errors detected from the command line alone, before any I/O
    pub fn is_usage(&self) -> bool {
        matches!(self, TransferError::Usage(_))
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_usage() {
            2
        } else {
            1
        }
    }

    pub(crate) fn query(operation: &'static str, err: impl std::fmt::Display) -> Self {
        TransferError::Query {
            operation,
            message: err.to_string(),
        }
    }
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_with_two() {
        let err = TransferError::Usage("missing -receiver".into());
        assert!(err.is_usage());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn runtime_errors_exit_with_one() {
        let err = TransferError::Broadcast("nonce too low".into());
        assert!(!err.is_usage());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn query_error_names_the_operation() {
        let err = TransferError::query("get nonce", "connection reset");
        assert_eq!(err.to_string(), "Failed to get nonce: connection reset");
    }

    #[test]
    fn connection_error_includes_url() {
        let err = TransferError::Connection {
            url: "http://localhost:8545".into(),
            message: "relative URL without a base".into(),
        };
        assert!(err.to_string().contains("http://localhost:8545"));
    }
}
