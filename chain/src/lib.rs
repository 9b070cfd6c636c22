//! # Token Tap chain access
//!
//! Read and write plumbing between the faucet client and an EVM node:
//!
//! - [`abi`]: `sol!` bindings for the faucet token contract.
//! - [`provider`]: the signer/provider capability the rest of the workspace
//!   depends on, independent of how a wallet is connected.
//! - [`rpc`]: [`HttpProvider`], a JSON-RPC implementation of [`Provider`].
//! - [`reader`]: [`ChainReader`] and its contract-backed implementation with
//!   all-settle field reads and per-call timeouts.
//! - [`explorer`]: block-explorer URL derivation.
//!
//! ## Quick start
//!
//! ```no_run
//! use {
//!     std::sync::Arc,
//!     tap_chain::{ChainReader, ContractChainReader, HttpProvider},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(HttpProvider::new("https://sepolia.base.org".parse()?));
//! let contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse()?;
//! let reader = ContractChainReader::new(provider, Some(contract));
//!
//! let parameters = reader.fetch_parameters().await?;
//! println!("{} per claim, every {}s", parameters.claim_amount, parameters.cooldown_seconds);
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod error;
pub mod explorer;
pub mod provider;
pub mod reader;
pub mod rpc;
pub mod types;

// Re-exports for convenience.
pub use {
    alloy_primitives::{Address, Bytes, B256, U256},
    error::{ChainError, ProviderError},
    explorer::Explorer,
    provider::{ContractCall, Provider, TransactionReceipt, TxHash},
    reader::{ChainReader, ContractChainReader, DEFAULT_READ_TIMEOUT},
    rpc::HttpProvider,
    types::{ClaimRecord, FaucetParameters, NativeBalance, TokenAmount, TokenBalance},
};
