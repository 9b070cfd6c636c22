//! Read-only access to faucet state.
//!
//! [`ContractChainReader`] issues the individual contract reads behind each
//! [`ChainReader`] call concurrently and settles them independently: a field
//! whose read fails keeps its last-known value, so one flaky `eth_call` never
//! corrupts the rest of a snapshot. A call only fails when every field
//! failed, or when a failed field has never been read successfully.

use {
    crate::{
        abi::IFaucetToken,
        error::ChainError,
        provider::{ContractCall, Provider},
        types::{ClaimRecord, FaucetParameters, NativeBalance, TokenAmount, TokenBalance},
    },
    alloy_primitives::{Address, U256},
    alloy_sol_types::SolCall,
    async_trait::async_trait,
    log::*,
    parking_lot::Mutex,
    std::{collections::HashMap, future::Future, sync::Arc, time::Duration},
};

/// Upper bound on any single provider call made by [`ContractChainReader`].
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(12);

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn fetch_parameters(&self) -> Result<FaucetParameters, ChainError>;
    async fn fetch_claim_record(&self, address: Address) -> Result<ClaimRecord, ChainError>;
    async fn fetch_token_balance(&self, address: Address) -> Result<TokenBalance, ChainError>;
    async fn fetch_native_balance(&self, address: Address) -> Result<NativeBalance, ChainError>;
}

/// Last successfully read value of every field, used to fill in fields whose
/// latest read failed.
#[derive(Debug, Default)]
struct FieldCache {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    claim_amount: Option<U256>,
    cooldown_time: Option<U256>,
    max_supply: Option<U256>,
    total_supply: Option<U256>,
    paused: Option<bool>,
    accounts: HashMap<Address, AccountCache>,
}

#[derive(Debug, Default)]
struct AccountCache {
    can_claim: Option<bool>,
    last_claim_time: Option<U256>,
    token_balance: Option<U256>,
    native_balance: Option<U256>,
}

/// Collects per-field outcomes of one all-settle batch.
#[derive(Default)]
struct Settlement {
    fields: usize,
    failures: Vec<(&'static str, ChainError)>,
}

impl Settlement {
    fn settle<T: Clone>(
        &mut self,
        field: &'static str,
        result: Result<T, ChainError>,
        last_known: &mut Option<T>,
    ) -> Option<T> {
        self.fields = self.fields.saturating_add(1);
        match result {
            Ok(value) => {
                *last_known = Some(value.clone());
                Some(value)
            }
            Err(err) => {
                if last_known.is_some() {
                    warn!("{field}: {err}; keeping last-known value");
                } else {
                    warn!("{field}: {err}; no previous value");
                }
                self.failures.push((field, err));
                last_known.clone()
            }
        }
    }

    fn first_error(&self) -> ChainError {
        self.failures
            .first()
            .map(|(_, err)| err.clone())
            .unwrap_or(ChainError::ChainUnavailable("no fields read".to_string()))
    }

    /// Fails the whole batch when nothing could be read.
    fn check_any_succeeded(&self) -> Result<(), ChainError> {
        if !self.failures.is_empty() && self.failures.len() == self.fields {
            return Err(self.first_error());
        }
        Ok(())
    }
}

pub struct ContractChainReader<P: Provider + ?Sized> {
    provider: Arc<P>,
    contract: Option<Address>,
    timeout: Duration,
    cache: Mutex<FieldCache>,
}

impl<P: Provider + ?Sized> ContractChainReader<P> {
    /// `contract: None` models a missing configuration value; every call then
    /// fails with [`ChainError::ContractNotConfigured`].
    pub fn new(provider: Arc<P>, contract: Option<Address>) -> Self {
        Self {
            provider,
            contract,
            timeout: DEFAULT_READ_TIMEOUT,
            cache: Mutex::new(FieldCache::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn contract(&self) -> Option<Address> {
        self.contract
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Fails with [`ChainError::WrongNetwork`] unless the provider is on
    /// `expected` chain.
    pub async fn check_network(&self, expected: u64) -> Result<(), ChainError> {
        let actual = self
            .bounded(self.provider.chain_id())
            .await?
            .map_err(|err| ChainError::ChainUnavailable(err.to_string()))?;
        if actual != expected {
            return Err(ChainError::WrongNetwork { expected, actual });
        }
        Ok(())
    }

    fn contract_address(&self) -> Result<Address, ChainError> {
        self.contract.ok_or(ChainError::ContractNotConfigured)
    }

    async fn bounded<F: Future>(&self, future: F) -> Result<F::Output, ChainError> {
        tokio::time::timeout(self.timeout, future)
            .await
            .map_err(|_| {
                ChainError::ChainUnavailable(format!("request timed out after {:?}", self.timeout))
            })
    }

    async fn read<C: SolCall + Send>(
        &self,
        contract: Address,
        call: C,
    ) -> Result<C::Return, ChainError> {
        let request = ContractCall::new(contract, call.abi_encode());
        let output = self
            .bounded(self.provider.read_contract(request))
            .await?
            .map_err(|err| err.into_read_error(contract))?;
        if output.is_empty() {
            // No code at the address, or a contract without this function.
            return Err(ChainError::ContractNotFound {
                address: contract,
                reason: format!("{} returned no data", C::SIGNATURE),
            });
        }
        C::abi_decode_returns(&output).map_err(|err| ChainError::DecodeError {
            method: C::SIGNATURE,
            reason: err.to_string(),
        })
    }
}

fn to_seconds(value: U256) -> u64 {
    value.saturating_to::<u64>()
}

#[async_trait]
impl<P: Provider + ?Sized> ChainReader for ContractChainReader<P> {
    async fn fetch_parameters(&self) -> Result<FaucetParameters, ChainError> {
        let contract = self.contract_address()?;
        let (
            name,
            symbol,
            decimals,
            claim_amount,
            cooldown_time,
            max_supply,
            total_supply,
            paused,
        ) = tokio::join!(
            self.read(contract, IFaucetToken::nameCall {}),
            self.read(contract, IFaucetToken::symbolCall {}),
            self.read(contract, IFaucetToken::decimalsCall {}),
            self.read(contract, IFaucetToken::claimAmountCall {}),
            self.read(contract, IFaucetToken::cooldownTimeCall {}),
            self.read(contract, IFaucetToken::maxSupplyCall {}),
            self.read(contract, IFaucetToken::totalSupplyCall {}),
            self.read(contract, IFaucetToken::pausedCall {}),
        );

        let mut settlement = Settlement::default();
        let mut cache = self.cache.lock();
        let name = settlement.settle("name", name, &mut cache.name);
        let symbol = settlement.settle("symbol", symbol, &mut cache.symbol);
        let decimals = settlement.settle("decimals", decimals, &mut cache.decimals);
        let claim_amount = settlement.settle("claimAmount", claim_amount, &mut cache.claim_amount);
        let cooldown_time =
            settlement.settle("cooldownTime", cooldown_time, &mut cache.cooldown_time);
        let max_supply = settlement.settle("maxSupply", max_supply, &mut cache.max_supply);
        let total_supply = settlement.settle("totalSupply", total_supply, &mut cache.total_supply);
        let paused = settlement.settle("paused", paused, &mut cache.paused);
        drop(cache);
        settlement.check_any_succeeded()?;

        let (
            Some(name),
            Some(symbol),
            Some(decimals),
            Some(claim_amount),
            Some(cooldown_time),
            Some(max_supply),
            Some(total_supply),
            Some(paused),
        ) = (
            name,
            symbol,
            decimals,
            claim_amount,
            cooldown_time,
            max_supply,
            total_supply,
            paused,
        )
        else {
            return Err(settlement.first_error());
        };

        Ok(FaucetParameters {
            name,
            token_symbol: symbol,
            token_decimals: decimals,
            claim_amount: TokenAmount::new(claim_amount, decimals),
            cooldown_seconds: to_seconds(cooldown_time),
            max_supply: TokenAmount::new(max_supply, decimals),
            total_supply: TokenAmount::new(total_supply, decimals),
            is_paused: paused,
        })
    }

    async fn fetch_claim_record(&self, address: Address) -> Result<ClaimRecord, ChainError> {
        let contract = self.contract_address()?;
        let (can_claim, last_claim_time, cooldown_time) = tokio::join!(
            self.read(contract, IFaucetToken::canClaimCall { user: address }),
            self.read(contract, IFaucetToken::lastClaimTimeCall { user: address }),
            self.read(contract, IFaucetToken::cooldownTimeCall {}),
        );

        let mut settlement = Settlement::default();
        let mut cache = self.cache.lock();
        let cooldown_time =
            settlement.settle("cooldownTime", cooldown_time, &mut cache.cooldown_time);
        let account = cache.accounts.entry(address).or_default();
        let can_claim = settlement.settle("canClaim", can_claim, &mut account.can_claim);
        let last_claim_time =
            settlement.settle("lastClaimTime", last_claim_time, &mut account.last_claim_time);
        drop(cache);
        settlement.check_any_succeeded()?;

        let (Some(can_claim), Some(last_claim_time), Some(cooldown_time)) =
            (can_claim, last_claim_time, cooldown_time)
        else {
            return Err(settlement.first_error());
        };
        Ok(ClaimRecord::from_chain(
            to_seconds(last_claim_time),
            to_seconds(cooldown_time),
            can_claim,
        ))
    }

    async fn fetch_token_balance(&self, address: Address) -> Result<TokenBalance, ChainError> {
        let contract = self.contract_address()?;
        let (balance, decimals, symbol) = tokio::join!(
            self.read(contract, IFaucetToken::balanceOfCall { owner: address }),
            self.read(contract, IFaucetToken::decimalsCall {}),
            self.read(contract, IFaucetToken::symbolCall {}),
        );

        let mut settlement = Settlement::default();
        let mut cache = self.cache.lock();
        let decimals = settlement.settle("decimals", decimals, &mut cache.decimals);
        let symbol = settlement.settle("symbol", symbol, &mut cache.symbol);
        let account = cache.accounts.entry(address).or_default();
        let balance = settlement.settle("balanceOf", balance, &mut account.token_balance);
        drop(cache);
        settlement.check_any_succeeded()?;

        let (Some(raw), Some(decimals), Some(symbol)) = (balance, decimals, symbol) else {
            return Err(settlement.first_error());
        };
        Ok(TokenBalance {
            raw,
            decimals,
            symbol,
        })
    }

    async fn fetch_native_balance(&self, address: Address) -> Result<NativeBalance, ChainError> {
        // Not a contract read, but a faucet without a contract has nothing to
        // report on.
        self.contract_address()?;
        let result = self
            .bounded(self.provider.get_balance(address))
            .await
            .and_then(|balance| {
                balance.map_err(|err| ChainError::ChainUnavailable(err.to_string()))
            });

        let mut settlement = Settlement::default();
        let mut cache = self.cache.lock();
        let account = cache.accounts.entry(address).or_default();
        let raw = settlement.settle("nativeBalance", result, &mut account.native_balance);
        drop(cache);
        match raw {
            Some(raw) => Ok(NativeBalance { raw }),
            None => Err(settlement.first_error()),
        }
    }
}
