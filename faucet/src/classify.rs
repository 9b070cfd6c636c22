//! Classification of claim failures into user-facing categories.

use {
    tap_chain::{abi::decode_revert_data, ProviderError},
    thiserror::Error,
};

/// Why the faucet contract rejected a claim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    #[error("cooldown still active")]
    CooldownActive,

    #[error("faucet is paused")]
    Paused,

    #[error("maximum supply exceeded")]
    SupplyExceeded,

    #[error("{0}")]
    Unrecognized(String),
}

/// A claim that reached the provider but did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimFailure {
    /// The signer declined.
    #[error("claim rejected by the signer")]
    UserRejected,

    #[error("insufficient funds for gas")]
    GasInsufficient,

    #[error("claim reverted: {0}")]
    Reverted(RevertReason),

    /// Transport failure or timeout while broadcasting or awaiting the receipt.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("claim failed: {0}")]
    Failed(String),
}

impl ClaimFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserRejected => "Transaction was rejected by user.",
            Self::GasInsufficient => "Insufficient ETH for gas fees.",
            Self::Reverted(RevertReason::CooldownActive) => "You are still in cooldown period.",
            Self::Reverted(RevertReason::Paused) => "Faucet is currently paused.",
            Self::Reverted(RevertReason::SupplyExceeded) => "Maximum token supply reached.",
            Self::Reverted(RevertReason::Unrecognized(_)) => {
                "Smart contract rejected the transaction."
            }
            Self::ChainUnavailable(_) => "Network connection issue.",
            Self::Failed(_) => "Please try again or check your connection.",
        }
    }

    /// Failures the user did not cause and can retry as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ChainUnavailable(_))
    }
}

pub fn classify_provider_error(err: &ProviderError) -> ClaimFailure {
    match err {
        ProviderError::UserRejected(_) => ClaimFailure::UserRejected,
        ProviderError::Transport(reason) => ClaimFailure::ChainUnavailable(reason.clone()),
        ProviderError::Timeout(_) => ClaimFailure::ChainUnavailable(err.to_string()),
        ProviderError::Rpc { code, message, .. } => {
            let lowered = message.to_ascii_lowercase();
            if *code == ProviderError::USER_REJECTED_CODE
                || lowered.contains("user rejected")
                || message.contains("ACTION_REJECTED")
            {
                ClaimFailure::UserRejected
            } else if lowered.contains("insufficient funds") {
                ClaimFailure::GasInsufficient
            } else if err.is_revert() {
                let reason = err
                    .revert_data()
                    .and_then(decode_revert_data)
                    .unwrap_or_else(|| message.clone());
                ClaimFailure::Reverted(classify_revert(&reason))
            } else if lowered.contains("network") {
                ClaimFailure::ChainUnavailable(message.clone())
            } else {
                ClaimFailure::Failed(message.clone())
            }
        }
        ProviderError::NoAccount | ProviderError::InvalidResponse(_) => {
            ClaimFailure::Failed(err.to_string())
        }
    }
}

/// Matches a decoded revert reason or error message against the faucet's
/// known failure modes.
pub fn classify_revert(reason: &str) -> RevertReason {
    let lowered = reason.to_ascii_lowercase();
    if reason.contains("CooldownActive") || lowered.contains("cannot claim yet") {
        RevertReason::CooldownActive
    } else if reason.contains("EnforcedPause") || lowered.contains("paused") {
        RevertReason::Paused
    } else if reason.contains("MaxSupplyExceeded") || lowered.contains("max supply exceeded") {
        RevertReason::SupplyExceeded
    } else {
        RevertReason::Unrecognized(reason.to_string())
    }
}
