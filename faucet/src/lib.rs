//! Claim eligibility and claim submission for the Token Tap faucet.
//!
//! - [`engine`]: the eligibility state machine and local cooldown countdown.
//! - [`poller`]: periodic tick and refresh tasks driving an engine.
//! - [`coordinator`]: submits `claim()` and tracks the transaction lifecycle.
//! - [`classify`]: maps provider failures and revert reasons to
//!   [`ClaimFailure`]s.
//!
//! ```no_run
//! use {
//!     std::sync::Arc,
//!     tap_chain::{ContractChainReader, HttpProvider},
//!     tap_faucet::{ClaimCoordinator, CoordinatorConfig, EligibilityEngine},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(HttpProvider::new("http://127.0.0.1:8545".parse()?));
//! let contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse()?;
//! let reader = Arc::new(ContractChainReader::new(provider.clone(), Some(contract)));
//! let engine = Arc::new(EligibilityEngine::with_system_clock(reader));
//! let coordinator = ClaimCoordinator::new(
//!     provider,
//!     &engine,
//!     CoordinatorConfig {
//!         contract: Some(contract),
//!         ..CoordinatorConfig::default()
//!     },
//! );
//!
//! let user = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse()?;
//! engine.refresh(user).await;
//! let lifecycle = coordinator.submit_claim(Some(user)).await?;
//! println!("{lifecycle:?}");
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod clock;
pub mod coordinator;
pub mod engine;
pub mod format;
pub mod poller;
#[cfg(test)]
mod test_utils;

pub use {
    classify::{classify_provider_error, classify_revert, ClaimFailure, RevertReason},
    clock::{Clock, SystemClock},
    coordinator::{ClaimCoordinator, ClaimRejection, CoordinatorConfig, TransactionLifecycle},
    engine::{
        has_minimum_gas, EligibilityEngine, EligibilityState, EngineSnapshot, RefreshOutcome,
        TickOutcome, DEFAULT_MIN_GAS_WEI,
    },
    format::{format_time_remaining, truncate_address},
    poller::{Poller, PollerConfig},
};

#[cfg(feature = "dev-context-only-utils")]
pub use clock::ManualClock;
