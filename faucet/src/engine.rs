//! Claim eligibility state machine.
//!
//! The [`EligibilityEngine`] owns the most recent chain snapshot for one
//! watched address together with a local countdown. Eligibility is always
//! taken from the contract's `canClaim` answer: when the local countdown
//! reaches zero the engine reports [`TickOutcome::Expired`] and the driver
//! re-reads the chain instead of assuming the cooldown is over.
//!
//! Snapshots are published on a [`watch`] channel. Only [`refresh`] and
//! [`tick`] ever modify them.
//!
//! [`refresh`]: EligibilityEngine::refresh
//! [`tick`]: EligibilityEngine::tick

use {
    crate::clock::{Clock, SystemClock},
    log::*,
    parking_lot::Mutex,
    std::{
        fmt,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    },
    tap_chain::{
        Address, ChainError, ChainReader, ClaimRecord, FaucetParameters, NativeBalance,
        TokenBalance, U256,
    },
    tokio::sync::watch,
};

/// 0.0001 native units, in wei.
pub const DEFAULT_MIN_GAS_WEI: U256 = U256::from_limbs([100_000_000_000_000, 0, 0, 0]);

/// Whether `balance` (wei) covers the gas for a claim.
pub fn has_minimum_gas(balance: U256, threshold: U256) -> bool {
    balance >= threshold
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EligibilityState {
    /// No refresh has completed yet.
    #[default]
    Unknown,
    Cooldown,
    Eligible,
    Paused,
    /// The last refresh could not read parameters or the claim record.
    Unreachable,
}

impl fmt::Display for EligibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Unknown => "unknown",
            Self::Cooldown => "cooldown",
            Self::Eligible => "eligible",
            Self::Paused => "paused",
            Self::Unreachable => "unreachable",
        };
        f.write_str(state)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub state: EligibilityState,
    /// Address the claim record and balances belong to.
    pub address: Option<Address>,
    pub parameters: Option<FaucetParameters>,
    pub claim_record: Option<ClaimRecord>,
    pub token_balance: Option<TokenBalance>,
    pub native_balance: Option<NativeBalance>,
    /// Local countdown; only meaningful in [`EligibilityState::Cooldown`].
    pub seconds_remaining: u64,
    /// Error that put the engine in [`EligibilityState::Unreachable`].
    pub last_error: Option<ChainError>,
    /// Clock reading at the last committed refresh.
    pub refreshed_at: Option<u64>,
    /// Number of committed refreshes.
    pub refresh_count: u64,
}

impl EngineSnapshot {
    /// Cooldown progress in percent, clamped to `0..=100`.
    pub fn progress_pct(&self) -> u8 {
        let cooldown = self
            .parameters
            .as_ref()
            .map(|parameters| parameters.cooldown_seconds)
            .unwrap_or_default();
        if self.state != EligibilityState::Cooldown || cooldown == 0 {
            return 100;
        }
        let elapsed = cooldown.saturating_sub(self.seconds_remaining.min(cooldown));
        let pct = u128::from(elapsed)
            .saturating_mul(100)
            .checked_div(u128::from(cooldown))
            .unwrap_or(100);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    /// `false` until a native balance has been read.
    pub fn has_minimum_gas(&self, threshold: U256) -> bool {
        self.native_balance
            .is_some_and(|balance| has_minimum_gas(balance.raw, threshold))
    }

    pub fn is_eligible_for(&self, address: Address) -> bool {
        self.state == EligibilityState::Eligible && self.address == Some(address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This call ran the chain reads and committed their result.
    Committed(EngineSnapshot),
    /// Another refresh was already in flight; this is the snapshot it left.
    Joined(EngineSnapshot),
    /// The engine was shut down; nothing was committed.
    Detached,
}

impl RefreshOutcome {
    pub fn snapshot(&self) -> Option<&EngineSnapshot> {
        match self {
            Self::Committed(snapshot) | Self::Joined(snapshot) => Some(snapshot),
            Self::Detached => None,
        }
    }

    pub fn into_snapshot(self) -> Option<EngineSnapshot> {
        match self {
            Self::Committed(snapshot) | Self::Joined(snapshot) => Some(snapshot),
            Self::Detached => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not counting down.
    Idle,
    /// Seconds left on the local countdown.
    Counting(u64),
    /// The countdown just reached zero. Reported once per cooldown.
    Expired,
}

pub struct EligibilityEngine {
    reader: Arc<dyn ChainReader>,
    clock: Arc<dyn Clock>,
    snapshot: watch::Sender<EngineSnapshot>,
    /// Single-flight gate: set while a refresh batch is running.
    in_flight: Mutex<bool>,
    /// Number of finished refresh batches, committed or not.
    completed: watch::Sender<u64>,
    /// The countdown reports [`TickOutcome::Expired`] when it hits zero.
    /// Only touched while the snapshot is locked for writing.
    expiry_armed: AtomicBool,
    shut_down: AtomicBool,
}

impl EligibilityEngine {
    pub fn new(reader: Arc<dyn ChainReader>, clock: Arc<dyn Clock>) -> Self {
        Self {
            reader,
            clock,
            snapshot: watch::Sender::new(EngineSnapshot::default()),
            in_flight: Mutex::new(false),
            completed: watch::Sender::new(0),
            expiry_armed: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_system_clock(reader: Arc<dyn ChainReader>) -> Self {
        Self::new(reader, Arc::new(SystemClock))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot.subscribe()
    }

    /// Detaches the engine: later refreshes and ticks do nothing, and reads
    /// already in flight are dropped when they complete.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("eligibility engine shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Re-reads faucet parameters, the claim record and both balances of
    /// `address`, and commits the derived state.
    ///
    /// At most one batch of chain reads runs at a time. A call made while a
    /// batch is in flight waits for it and returns
    /// [`RefreshOutcome::Joined`] instead of starting another one.
    pub async fn refresh(&self, address: Address) -> RefreshOutcome {
        if self.is_shut_down() {
            return RefreshOutcome::Detached;
        }
        let join_target = {
            let mut in_flight = self.in_flight.lock();
            if *in_flight {
                Some(self.completed.borrow().saturating_add(1))
            } else {
                *in_flight = true;
                None
            }
        };
        match join_target {
            Some(target) => self.join(target).await,
            None => self.run_batch(address).await,
        }
    }

    async fn join(&self, target: u64) -> RefreshOutcome {
        trace!("refresh already in flight, joining");
        let mut completed = self.completed.subscribe();
        let finished = completed.wait_for(|count| *count >= target).await.is_ok();
        if !finished || self.is_shut_down() {
            return RefreshOutcome::Detached;
        }
        RefreshOutcome::Joined(self.snapshot())
    }

    async fn run_batch(&self, address: Address) -> RefreshOutcome {
        let _in_flight = InFlight(self);
        debug!("refreshing faucet state for {address}");
        let (parameters, claim_record, token_balance, native_balance) = tokio::join!(
            self.reader.fetch_parameters(),
            self.reader.fetch_claim_record(address),
            self.reader.fetch_token_balance(address),
            self.reader.fetch_native_balance(address),
        );
        if self.is_shut_down() {
            debug!("dropping refresh results for {address}: engine shut down");
            return RefreshOutcome::Detached;
        }

        let reads = Reads {
            parameters,
            claim_record,
            token_balance,
            native_balance,
        };
        let now = self.clock.now();
        let mut committed = EngineSnapshot::default();
        self.snapshot.send_modify(|snapshot| {
            let previous = snapshot.state;
            let armed = reads.apply(snapshot, address, now);
            self.expiry_armed.store(armed, Ordering::SeqCst);
            if snapshot.state != previous {
                info!("{address}: {previous} -> {}", snapshot.state);
            }
            committed = snapshot.clone();
        });
        RefreshOutcome::Committed(committed)
    }

    /// Advances the local countdown by one second.
    ///
    /// Ticks never raise the countdown and never exceed what the clock says
    /// is left of the cooldown. Reaching zero yields [`TickOutcome::Expired`]
    /// once per countdown; the state stays [`EligibilityState::Cooldown`]
    /// until a refresh says otherwise. If that refresh still finds the
    /// account cooling down, the countdown restarts from the clock.
    pub fn tick(&self) -> TickOutcome {
        if self.is_shut_down() {
            return TickOutcome::Idle;
        }
        let now = self.clock.now();
        let mut outcome = TickOutcome::Idle;
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.state != EligibilityState::Cooldown {
                return false;
            }
            let clock_remaining = snapshot
                .claim_record
                .map(|record| record.seconds_remaining(now))
                .unwrap_or_default();
            let remaining = snapshot
                .seconds_remaining
                .saturating_sub(1)
                .min(clock_remaining);
            let changed = remaining != snapshot.seconds_remaining;
            snapshot.seconds_remaining = remaining;
            if remaining > 0 {
                outcome = TickOutcome::Counting(remaining);
                return changed;
            }
            if self.expiry_armed.swap(false, Ordering::SeqCst) {
                info!("cooldown elapsed locally, re-reading eligibility");
                outcome = TickOutcome::Expired;
                return true;
            }
            changed
        });
        outcome
    }

    /// [`tick`](Self::tick), followed by exactly one refresh when the
    /// countdown expires.
    pub async fn tick_and_reconcile(&self) -> TickOutcome {
        let outcome = self.tick();
        if outcome == TickOutcome::Expired {
            let address = self.snapshot.borrow().address;
            if let Some(address) = address {
                self.refresh(address).await;
            }
        }
        outcome
    }
}

/// Releases the single-flight gate, also when the refresh future is dropped.
struct InFlight<'a>(&'a EligibilityEngine);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.0.in_flight.lock();
        *in_flight = false;
        self.0
            .completed
            .send_modify(|count| *count = count.saturating_add(1));
    }
}

/// Results of one refresh batch.
struct Reads {
    parameters: Result<FaucetParameters, ChainError>,
    claim_record: Result<ClaimRecord, ChainError>,
    token_balance: Result<TokenBalance, ChainError>,
    native_balance: Result<NativeBalance, ChainError>,
}

impl Reads {
    /// Returns whether the countdown expiry is armed afterwards.
    fn apply(self, snapshot: &mut EngineSnapshot, address: Address, now: u64) -> bool {
        if snapshot.address != Some(address) {
            if let Some(previous) = snapshot.address {
                debug!("switching from {previous} to {address}, discarding its claim state");
            }
            snapshot.address = Some(address);
            snapshot.claim_record = None;
            snapshot.token_balance = None;
            snapshot.native_balance = None;
            snapshot.seconds_remaining = 0;
            if snapshot.state != EligibilityState::Unreachable {
                snapshot.state = EligibilityState::Unknown;
            }
        }
        let previous_state = snapshot.state;
        let previous_record = snapshot.claim_record;

        match self.token_balance {
            Ok(balance) => snapshot.token_balance = Some(balance),
            Err(err) => debug!("token balance of {address} unavailable: {err}"),
        }
        match self.native_balance {
            Ok(balance) => snapshot.native_balance = Some(balance),
            Err(err) => debug!("native balance of {address} unavailable: {err}"),
        }
        snapshot.refreshed_at = Some(now);
        snapshot.refresh_count = snapshot.refresh_count.saturating_add(1);

        let (parameters, record) = match (self.parameters, self.claim_record) {
            (Ok(parameters), Ok(record)) => (parameters, record),
            (parameters, claim_record) => {
                let mut error = None;
                match parameters {
                    Ok(parameters) => snapshot.parameters = Some(parameters),
                    Err(err) => {
                        warn!("faucet parameters unavailable: {err}");
                        error = Some(err);
                    }
                }
                match claim_record {
                    Ok(record) => snapshot.claim_record = Some(record),
                    Err(err) => {
                        warn!("claim record of {address} unavailable: {err}");
                        error.get_or_insert(err);
                    }
                }
                snapshot.state = EligibilityState::Unreachable;
                snapshot.last_error = error;
                return false;
            }
        };

        snapshot.last_error = None;
        snapshot.state = if parameters.is_paused {
            EligibilityState::Paused
        } else if record.can_claim_now {
            EligibilityState::Eligible
        } else {
            EligibilityState::Cooldown
        };
        snapshot.seconds_remaining = match snapshot.state {
            EligibilityState::Cooldown => {
                let computed = record.seconds_remaining(now);
                // A countdown already at zero has expired locally; the chain
                // still refusing starts a fresh one from the clock.
                let same_cooldown = previous_state == EligibilityState::Cooldown
                    && snapshot.seconds_remaining > 0
                    && previous_record.map(|previous| previous.cooldown_ends_at)
                        == Some(record.cooldown_ends_at);
                if same_cooldown {
                    computed.min(snapshot.seconds_remaining)
                } else {
                    computed
                }
            }
            _ => 0,
        };
        snapshot.parameters = Some(parameters);
        snapshot.claim_record = Some(record);
        snapshot.state == EligibilityState::Cooldown && snapshot.seconds_remaining > 0
    }
}
