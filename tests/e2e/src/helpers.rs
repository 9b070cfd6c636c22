//! Shared test utilities for Token Tap end-to-end tests.
//!
//! Provides a simulated faucet chain that:
//! - Answers `eth_call` for the faucet token ABI
//! - Executes `claim()` with the contract's cooldown, pause and supply rules
//! - Shares its block time with the client through a [`ManualClock`]
//! - Can go offline, lose receipts or have the wallet decline a signature

use {
    alloy_sol_types::{SolError, SolInterface, SolValue},
    async_trait::async_trait,
    parking_lot::Mutex,
    std::{collections::HashMap, sync::Arc, time::Duration},
    tap_chain::{
        abi::IFaucetToken::{self, IFaucetTokenCalls},
        Address, Bytes, ContractCall, ContractChainReader, Provider, ProviderError,
        TransactionReceipt, TxHash, B256, U256,
    },
    tap_faucet::{
        ClaimCoordinator, Clock, CoordinatorConfig, EligibilityEngine, ManualClock,
        DEFAULT_MIN_GAS_WEI,
    },
};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Base Sepolia.
pub const CHAIN_ID: u64 = 84_532;

/// Block time at the start of every scenario.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// The deployed faucet's cooldown.
pub const COOLDOWN_SECONDS: u64 = 86_400;

pub const CONTRACT: Address = Address::repeat_byte(0xfa);
pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
/// Funded with less than the client's gas floor.
pub const CAROL: Address = Address::repeat_byte(0xc0);

/// Wei charged for one `claim()`.
pub const CLAIM_GAS_COST_WEI: u64 = 50_000_000_000_000;

/// Post-claim refresh delay used by [`TestFaucet`].
pub const POST_CLAIM_REFRESH_DELAY: Duration = Duration::from_secs(2);

/// `amount` whole tokens at 18 decimals.
pub fn tokens(amount: u64) -> U256 {
    U256::from(amount).saturating_mul(U256::from(10u64).pow(U256::from(18u64)))
}

/// `milli` thousandths of one ether, in wei.
pub fn milli_ether(milli: u64) -> U256 {
    U256::from(milli).saturating_mul(U256::from(1_000_000_000_000_000u64))
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated faucet chain
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ChainState {
    chain_id: u64,
    block_number: u64,
    account: Option<Address>,

    claim_amount: U256,
    cooldown_seconds: u64,
    max_supply: U256,
    total_supply: U256,
    paused: bool,

    token_balances: HashMap<Address, U256>,
    native_balances: HashMap<Address, U256>,
    last_claim: HashMap<Address, u64>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    transactions: u64,

    offline: bool,
    reject_next_signature: bool,
    receipts_lost: bool,
}

impl ChainState {
    fn can_claim(&self, user: Address, now: u64) -> bool {
        match self.last_claim.get(&user) {
            Some(last) => now >= last.saturating_add(self.cooldown_seconds),
            None => true,
        }
    }
}

/// An in-memory chain with one faucet token contract deployed at
/// [`CONTRACT`].
pub struct SimulatedFaucet {
    clock: Arc<ManualClock>,
    state: Mutex<ChainState>,
}

impl SimulatedFaucet {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        let native_balances = HashMap::from([
            (ALICE, milli_ether(1_000)),
            (BOB, milli_ether(1_000)),
            (CAROL, U256::from(CLAIM_GAS_COST_WEI)),
        ]);
        Self {
            clock,
            state: Mutex::new(ChainState {
                chain_id: CHAIN_ID,
                block_number: 1,
                account: Some(ALICE),
                claim_amount: tokens(100_000),
                cooldown_seconds: COOLDOWN_SECONDS,
                max_supply: tokens(1_000_000_000),
                total_supply: tokens(1_000_000),
                paused: false,
                token_balances: HashMap::new(),
                native_balances,
                last_claim: HashMap::new(),
                receipts: HashMap::new(),
                transactions: 0,
                offline: false,
                reject_next_signature: false,
                receipts_lost: false,
            }),
        }
    }

    // ── Operator controls ────────────────────────────────────────────────

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
    }

    pub fn set_total_supply(&self, total_supply: U256) {
        self.state.lock().total_supply = total_supply;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().chain_id = chain_id;
    }

    pub fn set_account(&self, account: Option<Address>) {
        self.state.lock().account = account;
    }

    pub fn set_native_balance(&self, address: Address, wei: U256) {
        self.state.lock().native_balances.insert(address, wei);
    }

    /// Every request fails at the transport level while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Transactions are still executed, but their receipts never arrive.
    pub fn set_receipts_lost(&self, lost: bool) {
        self.state.lock().receipts_lost = lost;
    }

    /// The wallet declines the next signature request.
    pub fn reject_next_signature(&self) {
        self.state.lock().reject_next_signature = true;
    }

    /// Records a claim by `user` at the current block time, as if it had been
    /// submitted from somewhere else.
    pub fn record_claim(&self, user: Address) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let claim_amount = state.claim_amount;
        state.last_claim.insert(user, now);
        let balance = state.token_balances.entry(user).or_default();
        *balance = balance.saturating_add(claim_amount);
        state.total_supply = state.total_supply.saturating_add(claim_amount);
    }

    // ── Inspection ───────────────────────────────────────────────────────

    pub fn token_balance(&self, address: Address) -> U256 {
        self.state
            .lock()
            .token_balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn native_balance(&self, address: Address) -> U256 {
        self.state
            .lock()
            .native_balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.state.lock().total_supply
    }

    pub fn last_claim(&self, address: Address) -> Option<u64> {
        self.state.lock().last_claim.get(&address).copied()
    }

    /// Number of executed `claim()` transactions.
    pub fn transaction_count(&self) -> u64 {
        self.state.lock().transactions
    }

    fn call(&self, call: &ContractCall) -> Result<Bytes, ProviderError> {
        if call.to != CONTRACT {
            // No code at the address.
            return Ok(Bytes::new());
        }
        let decoded = IFaucetTokenCalls::abi_decode(&call.data)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
        let now = self.clock.now();
        let state = self.state.lock();
        let encoded = match decoded {
            IFaucetTokenCalls::name(_) => "Faucet Token".to_string().abi_encode(),
            IFaucetTokenCalls::symbol(_) => "FAUCET".to_string().abi_encode(),
            IFaucetTokenCalls::decimals(_) => {
                <alloy_sol_types::sol_data::Uint<8> as alloy_sol_types::SolType>::abi_encode(&18u8)
            }
            IFaucetTokenCalls::totalSupply(_) => state.total_supply.abi_encode(),
            IFaucetTokenCalls::balanceOf(call) => state
                .token_balances
                .get(&call.owner)
                .copied()
                .unwrap_or_default()
                .abi_encode(),
            IFaucetTokenCalls::claimAmount(_) => state.claim_amount.abi_encode(),
            IFaucetTokenCalls::cooldownTime(_) => U256::from(state.cooldown_seconds).abi_encode(),
            IFaucetTokenCalls::maxSupply(_) => state.max_supply.abi_encode(),
            IFaucetTokenCalls::paused(_) => state.paused.abi_encode(),
            IFaucetTokenCalls::lastClaimTime(call) => {
                U256::from(state.last_claim.get(&call.user).copied().unwrap_or_default())
                    .abi_encode()
            }
            IFaucetTokenCalls::canClaim(call) => state.can_claim(call.user, now).abi_encode(),
            IFaucetTokenCalls::claim(_) => Vec::new(),
        };
        Ok(encoded.into())
    }

    fn execute_claim(&self, from: Address, call: &ContractCall) -> Result<TxHash, ProviderError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if std::mem::take(&mut state.reject_next_signature) {
            return Err(ProviderError::UserRejected(
                "User denied transaction signature.".to_string(),
            ));
        }
        if call.to != CONTRACT
            || !matches!(
                IFaucetTokenCalls::abi_decode(&call.data),
                Ok(IFaucetTokenCalls::claim(_))
            )
        {
            return Err(ProviderError::Rpc {
                code: -32_000,
                message: "unsupported transaction".to_string(),
                data: None,
            });
        }

        let gas_cost = U256::from(CLAIM_GAS_COST_WEI);
        let native_balance = state.native_balances.get(&from).copied().unwrap_or_default();
        if native_balance < gas_cost {
            return Err(ProviderError::Rpc {
                code: -32_000,
                message: "insufficient funds for gas * price + value".to_string(),
                data: None,
            });
        }
        if state.paused {
            return Err(revert(IFaucetToken::EnforcedPause {}.abi_encode()));
        }
        if !state.can_claim(from, now) {
            return Err(revert(IFaucetToken::CooldownActive {}.abi_encode()));
        }
        let claim_amount = state.claim_amount;
        if state.total_supply.saturating_add(claim_amount) > state.max_supply {
            return Err(revert(IFaucetToken::MaxSupplyExceeded {}.abi_encode()));
        }

        state
            .native_balances
            .insert(from, native_balance.saturating_sub(gas_cost));
        let balance = state.token_balances.entry(from).or_default();
        *balance = balance.saturating_add(claim_amount);
        state.total_supply = state.total_supply.saturating_add(claim_amount);
        state.last_claim.insert(from, now);
        state.transactions = state.transactions.saturating_add(1);
        state.block_number = state.block_number.saturating_add(1);

        let tx_hash = tx_hash(state.transactions);
        let receipt = TransactionReceipt {
            transaction_hash: tx_hash,
            status: true,
            block_number: Some(state.block_number),
            gas_used: Some(50_000),
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }

    fn check_online(&self) -> Result<(), ProviderError> {
        if self.state.lock().offline {
            return Err(ProviderError::Transport(
                "error sending request: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for SimulatedFaucet {
    async fn get_address(&self) -> Result<Option<Address>, ProviderError> {
        self.check_online()?;
        Ok(self.state.lock().account)
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.check_online()?;
        Ok(self.state.lock().chain_id)
    }

    async fn read_contract(&self, call: ContractCall) -> Result<Bytes, ProviderError> {
        self.check_online()?;
        self.call(&call)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ProviderError> {
        self.check_online()?;
        Ok(self.native_balance(address))
    }

    async fn send_transaction(
        &self,
        from: Address,
        call: ContractCall,
    ) -> Result<TxHash, ProviderError> {
        self.check_online()?;
        self.execute_claim(from, &call)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ProviderError> {
        self.check_online()?;
        let state = self.state.lock();
        if state.receipts_lost {
            return Err(ProviderError::Timeout(Duration::from_secs(120)));
        }
        state
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("unknown transaction {tx_hash}")))
    }
}

fn revert(data: Vec<u8>) -> ProviderError {
    ProviderError::Rpc {
        code: ProviderError::EXECUTION_REVERTED_CODE,
        message: "execution reverted".to_string(),
        data: Some(data.into()),
    }
}

pub fn tx_hash(n: u64) -> TxHash {
    let mut bytes = [0xee; 32];
    bytes[24..].copy_from_slice(&n.to_be_bytes());
    B256::from(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Client fixture
// ─────────────────────────────────────────────────────────────────────────────

pub fn coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        contract: Some(CONTRACT),
        min_gas_balance: DEFAULT_MIN_GAS_WEI,
        post_claim_refresh_delay: POST_CLAIM_REFRESH_DELAY,
    }
}

/// A client wired to a fresh [`SimulatedFaucet`] the way the CLI wires one
/// to a node.
pub struct TestFaucet {
    pub clock: Arc<ManualClock>,
    pub chain: Arc<SimulatedFaucet>,
    pub reader: Arc<ContractChainReader<SimulatedFaucet>>,
    pub engine: Arc<EligibilityEngine>,
    pub coordinator: ClaimCoordinator,
}

impl TestFaucet {
    pub fn new() -> Self {
        Self::with_config(coordinator_config())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        let clock = Arc::new(ManualClock::new(GENESIS_TIME));
        let chain = Arc::new(SimulatedFaucet::new(clock.clone()));
        let reader = Arc::new(
            ContractChainReader::new(chain.clone(), config.contract)
                .with_timeout(Duration::from_secs(5)),
        );
        let engine = Arc::new(EligibilityEngine::new(reader.clone(), clock.clone()));
        let coordinator = ClaimCoordinator::new(chain.clone(), &engine, config);
        Self {
            clock,
            chain,
            reader,
            engine,
            coordinator,
        }
    }
}

impl Default for TestFaucet {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize logging for tests (only once).
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
