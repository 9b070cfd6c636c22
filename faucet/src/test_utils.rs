//! Scripted [`ChainReader`] and [`Provider`] shared by the unit tests.

use {
    async_trait::async_trait,
    parking_lot::Mutex,
    std::{
        collections::VecDeque,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    },
    tap_chain::{
        Address, ChainError, ChainReader, ClaimRecord, ContractCall, FaucetParameters,
        NativeBalance, Provider, ProviderError, TokenAmount, TokenBalance, TransactionReceipt,
        TxHash, B256, U256,
    },
};

pub(crate) const USER: Address = Address::repeat_byte(0x11);
pub(crate) const OTHER_USER: Address = Address::repeat_byte(0x22);
pub(crate) const CONTRACT: Address = Address::repeat_byte(0xfa);
pub(crate) const NOW: u64 = 1_700_000_000;
pub(crate) const COOLDOWN: u64 = 86_400;

pub(crate) fn parameters(is_paused: bool) -> FaucetParameters {
    FaucetParameters {
        name: "Faucet Token".to_string(),
        token_symbol: "FAUCET".to_string(),
        token_decimals: 18,
        claim_amount: TokenAmount::new(U256::from(100u64), 18),
        cooldown_seconds: COOLDOWN,
        max_supply: TokenAmount::new(U256::from(1_000_000u64), 18),
        total_supply: TokenAmount::new(U256::from(5_000u64), 18),
        is_paused,
    }
}

pub(crate) fn unavailable() -> ChainError {
    ChainError::ChainUnavailable("connection refused".to_string())
}

pub(crate) struct MockState {
    pub parameters: Result<FaucetParameters, ChainError>,
    pub claim_record: Result<ClaimRecord, ChainError>,
    pub token_balance: Result<TokenBalance, ChainError>,
    pub native_balance: Result<NativeBalance, ChainError>,
}

#[derive(Default)]
struct Counters {
    batches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub(crate) struct MockReader {
    state: Mutex<MockState>,
    counters: Counters,
    delay: Mutex<Duration>,
    panic_on_read: AtomicBool,
}

impl MockReader {
    fn with_record(claim_record: ClaimRecord) -> Self {
        Self {
            state: Mutex::new(MockState {
                parameters: Ok(parameters(false)),
                claim_record: Ok(claim_record),
                token_balance: Ok(TokenBalance {
                    raw: U256::from(300u64),
                    decimals: 18,
                    symbol: "FAUCET".to_string(),
                }),
                native_balance: Ok(NativeBalance {
                    raw: U256::from(10u64).pow(U256::from(15u64)),
                }),
            }),
            counters: Counters::default(),
            delay: Mutex::new(Duration::ZERO),
            panic_on_read: AtomicBool::new(false),
        }
    }

    /// Last claim 90000 s before [`NOW`], contract says claimable.
    pub(crate) fn eligible() -> Self {
        Self::with_record(ClaimRecord::from_chain(NOW - 90_000, COOLDOWN, true))
    }

    /// Cooldown ends `seconds_left` seconds after [`NOW`].
    pub(crate) fn cooling_down(seconds_left: u64) -> Self {
        Self::with_record(cooldown_record(seconds_left))
    }

    pub(crate) fn set(&self, update: impl FnOnce(&mut MockState)) {
        update(&mut self.state.lock());
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub(crate) fn set_panic_on_read(&self, panic: bool) {
        self.panic_on_read.store(panic, Ordering::SeqCst);
    }

    /// Number of refresh batches started, counted on `fetch_parameters`.
    pub(crate) fn batches(&self) -> usize {
        self.counters.batches.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }
}

pub(crate) fn cooldown_record(seconds_left: u64) -> ClaimRecord {
    ClaimRecord::from_chain(NOW - (COOLDOWN - seconds_left), COOLDOWN, false)
}

#[async_trait]
impl ChainReader for MockReader {
    async fn fetch_parameters(&self) -> Result<FaucetParameters, ChainError> {
        self.counters.batches.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_read.load(Ordering::SeqCst) {
            panic!("scripted read panic");
        }
        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state.lock().parameters.clone()
    }

    async fn fetch_claim_record(&self, _address: Address) -> Result<ClaimRecord, ChainError> {
        self.state.lock().claim_record.clone()
    }

    async fn fetch_token_balance(&self, _address: Address) -> Result<TokenBalance, ChainError> {
        self.state.lock().token_balance.clone()
    }

    async fn fetch_native_balance(&self, _address: Address) -> Result<NativeBalance, ChainError> {
        self.state.lock().native_balance.clone()
    }
}

/// How [`MockProvider`] answers the next claim.
#[derive(Clone)]
pub(crate) enum ClaimScript {
    Confirm,
    RevertOnChain,
    RejectBroadcast(ProviderError),
    FailReceipt(ProviderError),
}

pub(crate) struct MockProvider {
    scripts: Mutex<VecDeque<ClaimScript>>,
    pub sent: Mutex<Vec<(Address, ContractCall)>>,
    receipt_delay: Mutex<Duration>,
    next_hash: AtomicUsize,
}

impl MockProvider {
    pub(crate) fn new(scripts: impl IntoIterator<Item = ClaimScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
            receipt_delay: Mutex::new(Duration::ZERO),
            next_hash: AtomicUsize::new(1),
        }
    }

    pub(crate) fn set_receipt_delay(&self, delay: Duration) {
        *self.receipt_delay.lock() = delay;
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    fn script_for(&self, tx_hash: TxHash) -> ClaimScript {
        let index = usize::from(tx_hash.0[31]).saturating_sub(1);
        self.scripts
            .lock()
            .get(index)
            .cloned()
            .unwrap_or(ClaimScript::Confirm)
    }
}

pub(crate) fn tx_hash(n: u8) -> TxHash {
    let mut hash = B256::repeat_byte(0xee);
    hash.0[31] = n;
    hash
}

#[async_trait]
impl Provider for MockProvider {
    async fn get_address(&self) -> Result<Option<Address>, ProviderError> {
        Ok(Some(USER))
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(84_532)
    }

    async fn read_contract(&self, _call: ContractCall) -> Result<tap_chain::Bytes, ProviderError> {
        unreachable!("coordinator never reads through the provider")
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, ProviderError> {
        unreachable!("coordinator never reads through the provider")
    }

    async fn send_transaction(
        &self,
        from: Address,
        call: ContractCall,
    ) -> Result<TxHash, ProviderError> {
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        let hash = tx_hash(u8::try_from(n).unwrap());
        self.sent.lock().push((from, call));
        match self.script_for(hash) {
            ClaimScript::RejectBroadcast(err) => Err(err),
            _ => Ok(hash),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ProviderError> {
        let delay = *self.receipt_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let status = match self.script_for(tx_hash) {
            ClaimScript::FailReceipt(err) => return Err(err),
            ClaimScript::RevertOnChain => false,
            _ => true,
        };
        Ok(TransactionReceipt {
            transaction_hash: tx_hash,
            status,
            block_number: Some(42),
            gas_used: Some(52_000),
        })
    }
}
