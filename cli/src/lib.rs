//! The `token-tap` command-line faucet client.
//!
//! Each command family lives in its own module with the same shape: a
//! `*CliCommand` enum, a `*SubCommands` trait that adds its clap
//! subcommands, `parse_*_command` and `process_*_command`.

pub mod clap_app;
pub mod cli;
pub mod config;
pub mod explorer;
pub mod faucet;
pub mod output;
