//! Claim submission and transaction lifecycle tracking.

use {
    crate::{
        classify::{classify_provider_error, ClaimFailure, RevertReason},
        engine::{EligibilityEngine, EligibilityState, DEFAULT_MIN_GAS_WEI},
    },
    alloy_sol_types::SolCall,
    log::*,
    parking_lot::Mutex,
    std::{
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc, Weak,
        },
        time::Duration,
    },
    tap_chain::{abi::IFaucetToken, Address, ContractCall, Provider, TxHash, U256},
    thiserror::Error,
    tokio::{sync::watch, task::JoinHandle},
    tokio_stream::wrappers::WatchStream,
};

pub const DEFAULT_POST_CLAIM_REFRESH_DELAY: Duration = Duration::from_secs(2);

/// `Idle -> Pending -> (Success | Error) -> Idle`; the last step only
/// through [`ClaimCoordinator::reset_transaction`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum TransactionLifecycle {
    #[default]
    Idle,
    /// `tx_hash` is set once the transaction was broadcast.
    Pending { tx_hash: Option<TxHash> },
    Success { tx_hash: TxHash },
    /// Reverts caught before mining carry the decoded [`RevertReason`]. A
    /// receipt that reports a revert has no revert data, so a claim that
    /// reverts after mining is always [`RevertReason::Unrecognized`] with
    /// `"transaction reverted"`.
    Error {
        tx_hash: Option<TxHash>,
        failure: ClaimFailure,
    },
}

impl TransactionLifecycle {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Idle => None,
            Self::Pending { tx_hash } | Self::Error { tx_hash, .. } => *tx_hash,
            Self::Success { tx_hash } => Some(*tx_hash),
        }
    }
}

/// A claim refused before anything was sent to the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimRejection {
    #[error("No wallet connected")]
    NotConnected,

    #[error("A claim is already pending")]
    AlreadyPending,

    #[error("Faucet contract address is not configured")]
    ContractNotConfigured,

    /// `state` is `None` when the eligibility engine is gone.
    #[error("Not eligible to claim ({})", .state.map(|state| state.to_string()).unwrap_or_else(|| "no eligibility data".to_string()))]
    NotEligible { state: Option<EligibilityState> },

    #[error("Insufficient native balance for gas: have {balance} wei, need {required} wei")]
    InsufficientGas { balance: U256, required: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub contract: Option<Address>,
    /// Minimum native balance in wei.
    pub min_gas_balance: U256,
    pub post_claim_refresh_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            contract: None,
            min_gas_balance: DEFAULT_MIN_GAS_WEI,
            post_claim_refresh_delay: DEFAULT_POST_CLAIM_REFRESH_DELAY,
        }
    }
}

pub struct ClaimCoordinator {
    provider: Arc<dyn Provider>,
    engine: Weak<EligibilityEngine>,
    config: CoordinatorConfig,
    lifecycle: watch::Sender<TransactionLifecycle>,
    /// Bumped by every reset; updates from an older epoch are not published.
    epoch: AtomicU64,
    scheduled_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl ClaimCoordinator {
    pub fn new(
        provider: Arc<dyn Provider>,
        engine: &Arc<EligibilityEngine>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            provider,
            engine: Arc::downgrade(engine),
            config,
            lifecycle: watch::Sender::new(TransactionLifecycle::Idle),
            epoch: AtomicU64::new(0),
            scheduled_refresh: Mutex::new(None),
        }
    }

    pub fn lifecycle(&self) -> TransactionLifecycle {
        self.lifecycle.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionLifecycle> {
        self.lifecycle.subscribe()
    }

    /// Lifecycle updates as a stream, starting with the current value.
    pub fn lifecycle_stream(&self) -> WatchStream<TransactionLifecycle> {
        WatchStream::new(self.lifecycle.subscribe())
    }

    /// Claims for `address` and drives the transaction to a terminal state.
    ///
    /// Preconditions are checked against the engine's latest committed
    /// snapshot; a failed check is returned as a [`ClaimRejection`] without
    /// contacting the provider. On confirmed success a single engine refresh
    /// is scheduled after the configured delay.
    pub async fn submit_claim(
        &self,
        address: Option<Address>,
    ) -> Result<TransactionLifecycle, ClaimRejection> {
        let address = address.ok_or(ClaimRejection::NotConnected)?;
        if self.lifecycle.borrow().is_pending() {
            return Err(ClaimRejection::AlreadyPending);
        }
        let contract = self
            .config
            .contract
            .ok_or(ClaimRejection::ContractNotConfigured)?;
        self.check_eligibility(address)?;

        let mut epoch = 0;
        let claimed = self.lifecycle.send_if_modified(|lifecycle| {
            if lifecycle.is_pending() {
                return false;
            }
            epoch = self.epoch.load(Ordering::SeqCst);
            *lifecycle = TransactionLifecycle::Pending { tx_hash: None };
            true
        });
        if !claimed {
            return Err(ClaimRejection::AlreadyPending);
        }

        info!("submitting claim for {address}");
        let call = ContractCall::new(contract, IFaucetToken::claimCall {}.abi_encode());
        let tx_hash = match self.provider.send_transaction(address, call).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                let failure = classify_provider_error(&err);
                warn!("claim for {address} was not broadcast: {err}");
                return Ok(self.finish(
                    epoch,
                    TransactionLifecycle::Error {
                        tx_hash: None,
                        failure,
                    },
                ));
            }
        };
        info!("claim broadcast as {tx_hash}");
        self.publish(epoch, TransactionLifecycle::Pending {
            tx_hash: Some(tx_hash),
        });

        let terminal = match self.provider.wait_for_receipt(tx_hash).await {
            Ok(receipt) if receipt.status => {
                info!("claim {tx_hash} confirmed in block {:?}", receipt.block_number);
                self.schedule_refresh(address);
                TransactionLifecycle::Success { tx_hash }
            }
            Ok(_) => {
                warn!("claim {tx_hash} reverted on-chain");
                TransactionLifecycle::Error {
                    tx_hash: Some(tx_hash),
                    failure: ClaimFailure::Reverted(RevertReason::Unrecognized(
                        "transaction reverted".to_string(),
                    )),
                }
            }
            Err(err) => {
                warn!("no receipt for claim {tx_hash}: {err}");
                TransactionLifecycle::Error {
                    tx_hash: Some(tx_hash),
                    failure: classify_provider_error(&err),
                }
            }
        };
        Ok(self.finish(epoch, terminal))
    }

    /// Forces the lifecycle back to `Idle`, even while a claim is pending.
    /// The pending claim keeps running but no longer publishes updates.
    pub fn reset_transaction(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.lifecycle.send_replace(TransactionLifecycle::Idle);
        debug!("claim lifecycle reset");
    }

    /// Waits for the post-claim refresh, if one is scheduled. Returns whether
    /// a scheduled refresh ran to completion.
    pub async fn wait_for_scheduled_refresh(&self) -> bool {
        let handle = self.scheduled_refresh.lock().take();
        let Some(handle) = handle else {
            return false;
        };
        match handle.await {
            Ok(()) => true,
            Err(err) if err.is_panic() => {
                warn!("post-claim refresh panicked: {err}");
                false
            }
            Err(err) => {
                debug!("post-claim refresh cancelled: {err}");
                false
            }
        }
    }

    /// Cancels a scheduled post-claim refresh.
    pub fn shutdown(&self) {
        if let Some(handle) = self.scheduled_refresh.lock().take() {
            handle.abort();
        }
    }

    fn check_eligibility(&self, address: Address) -> Result<(), ClaimRejection> {
        let snapshot = self
            .engine
            .upgrade()
            .filter(|engine| !engine.is_shut_down())
            .map(|engine| engine.snapshot())
            .ok_or(ClaimRejection::NotEligible { state: None })?;
        if !snapshot.is_eligible_for(address) {
            return Err(ClaimRejection::NotEligible {
                state: Some(snapshot.state),
            });
        }
        if !snapshot.has_minimum_gas(self.config.min_gas_balance) {
            return Err(ClaimRejection::InsufficientGas {
                balance: snapshot
                    .native_balance
                    .map(|balance| balance.raw)
                    .unwrap_or_default(),
                required: self.config.min_gas_balance,
            });
        }
        Ok(())
    }

    fn publish(&self, epoch: u64, next: TransactionLifecycle) -> bool {
        self.lifecycle.send_if_modified(|lifecycle| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *lifecycle = next;
            true
        })
    }

    fn finish(&self, epoch: u64, terminal: TransactionLifecycle) -> TransactionLifecycle {
        if !self.publish(epoch, terminal.clone()) {
            debug!("lifecycle was reset, not publishing {terminal:?}");
        }
        terminal
    }

    fn schedule_refresh(&self, address: Address) {
        let engine = self.engine.clone();
        let delay = self.config.post_claim_refresh_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match engine.upgrade() {
                Some(engine) => {
                    debug!("post-claim refresh for {address}");
                    engine.refresh(address).await;
                }
                None => debug!("engine dropped before post-claim refresh"),
            }
        });
        if let Some(previous) = self.scheduled_refresh.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for ClaimCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
