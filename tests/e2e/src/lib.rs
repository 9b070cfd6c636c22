//! Token Tap End-to-End Test Suite
//!
//! Drives the eligibility engine, the poller and the claim coordinator
//! against an in-memory faucet chain that speaks the contract ABI, without
//! a running node.
//!
//! Each test file can be run independently:
//!
//! ```bash
//! cargo test -p tap-e2e-tests --test claim_lifecycle -- --nocapture
//! cargo test -p tap-e2e-tests --test cooldown_reconciliation -- --nocapture
//! cargo test -p tap-e2e-tests --test error_paths -- --nocapture
//! ```

pub mod helpers;
