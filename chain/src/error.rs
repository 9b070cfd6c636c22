use {
    alloy_primitives::{Address, Bytes},
    std::time::Duration,
    thiserror::Error,
};

/// Errors produced by [`crate::ChainReader`] calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Transient network or node failure, including timeouts.
    /// The next scheduled poll retries.
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    /// No faucet contract address is configured.
    #[error("Faucet contract address is not configured")]
    ContractNotConfigured,

    /// Nothing answering the faucet ABI lives at the configured address.
    #[error("Faucet contract not found at {address}: {reason}")]
    ContractNotFound { address: Address, reason: String },

    /// A call returned data that does not match the expected ABI shape.
    #[error("Unexpected response from {method}: {reason}")]
    DecodeError { method: &'static str, reason: String },

    /// The provider is connected to another chain.
    #[error("Wrong network: expected chain id {expected}, provider is on {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
}

impl ChainError {
    /// Misconfiguration is surfaced persistently and not worth retrying.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Self::ContractNotConfigured | Self::ContractNotFound { .. } | Self::WrongNetwork { .. }
        )
    }
}

/// Errors produced by a [`crate::Provider`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never produced a JSON-RPC response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request did not complete in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Bytes>,
    },

    /// The wallet declined to sign (EIP-1193 code 4001).
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// The provider has no account to act for.
    #[error("No account available")]
    NoAccount,

    /// The response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// EIP-1193 "user rejected request".
    pub const USER_REJECTED_CODE: i64 = 4001;
    /// Geth's error code for `execution reverted` with revert data.
    pub const EXECUTION_REVERTED_CODE: i64 = 3;

    /// Whether this looks like a contract-level revert rather than a node or
    /// transport problem.
    pub fn is_revert(&self) -> bool {
        match self {
            Self::Rpc { code, message, data } => {
                *code == Self::EXECUTION_REVERTED_CODE
                    || data.is_some()
                    || message.to_ascii_lowercase().contains("revert")
            }
            _ => false,
        }
    }

    /// Revert payload attached to the error, if any.
    pub fn revert_data(&self) -> Option<&[u8]> {
        match self {
            Self::Rpc {
                data: Some(data), ..
            } => Some(data.as_ref()),
            _ => None,
        }
    }

    /// Maps a provider failure during a read-only contract call.
    pub(crate) fn into_read_error(self, contract: Address) -> ChainError {
        if self.is_revert() {
            return ChainError::ContractNotFound {
                address: contract,
                reason: self.to_string(),
            };
        }
        match self {
            Self::InvalidResponse(reason) => ChainError::DecodeError {
                method: "eth_call",
                reason,
            },
            other => ChainError::ChainUnavailable(other.to_string()),
        }
    }
}
