//! The signer/provider capability.
//!
//! Everything above this crate talks to the chain through [`Provider`]. An
//! implementation may be a JSON-RPC endpoint ([`crate::HttpProvider`]), a
//! bridge to an injected browser wallet, or an in-memory simulation in tests.
//! The faucet client never discovers or negotiates wallets itself.

use {
    crate::error::ProviderError,
    alloy_primitives::{Address, Bytes, B256, U256},
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

pub type TxHash = B256;

/// A call against a contract: target plus ABI-encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
}

impl ContractCall {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
        }
    }
}

/// The parts of a mined transaction's receipt the faucet cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    /// `true` if execution succeeded (`status == 0x1`).
    pub status: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// The account this provider signs for, if a wallet is connected.
    async fn get_address(&self) -> Result<Option<Address>, ProviderError>;

    /// EIP-155 chain id of the connected network.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Executes a read-only call at the latest block and returns the raw
    /// return data.
    async fn read_contract(&self, call: ContractCall) -> Result<Bytes, ProviderError>;

    /// Native balance of `address`, in wei.
    async fn get_balance(&self, address: Address) -> Result<U256, ProviderError>;

    /// Signs and broadcasts `call` from `from`, returning once the node has
    /// accepted the transaction.
    async fn send_transaction(&self, from: Address, call: ContractCall)
        -> Result<TxHash, ProviderError>;

    /// Waits until `tx_hash` is mined.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ProviderError>;
}
