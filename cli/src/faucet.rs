use {
    crate::{
        clap_app::is_valid_address,
        cli::{ChainContext, CliConfig, CliError, ProcessResult},
        output::{CliBalance, CliClaimResult, CliClaimStatus, CliFaucetInfo, OutputFormat},
    },
    clap::{App, Arg, ArgMatches, SubCommand},
    log::*,
    std::sync::Arc,
    tap_chain::{Address, ChainError, ChainReader},
    tap_cli_config::Settings,
    tap_faucet::{
        format_time_remaining, ClaimCoordinator, ClaimRejection, CoordinatorConfig,
        EligibilityEngine, EligibilityState, EngineSnapshot, Poller, PollerConfig,
        TransactionLifecycle,
    },
};

// ── CLI Command Enum Variants ───────────────────────────────────────
#[derive(Debug, PartialEq, Eq)]
pub enum FaucetCliCommand {
    Info,
    Status {
        address: Option<Address>,
    },
    Balance {
        address: Option<Address>,
    },
    Claim {
        address: Option<Address>,
        skip_network_check: bool,
    },
    Watch {
        address: Option<Address>,
    },
}

// ── Subcommand Definition (clap) ────────────────────────────────────
pub trait FaucetSubCommands {
    fn faucet_subcommands(self) -> Self;
}

fn address_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("address")
        .index(1)
        .value_name("ADDRESS")
        .takes_value(true)
        .validator(is_valid_address)
        .help("Account to query [default: the provider's account]")
}

impl FaucetSubCommands for App<'_, '_> {
    fn faucet_subcommands(self) -> Self {
        self.subcommand(
            SubCommand::with_name("info")
                .about("Show token metadata, claim amount, cooldown and supply"),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Show claim eligibility and time until the next claim")
                .arg(address_arg()),
        )
        .subcommand(
            SubCommand::with_name("balance")
                .about("Show token and gas balances")
                .arg(address_arg()),
        )
        .subcommand(
            SubCommand::with_name("claim")
                .about("Claim tokens from the faucet")
                .arg(address_arg().help("Account to claim for [default: the provider's account]"))
                .arg(
                    Arg::with_name("skip_network_check")
                        .long("skip-network-check")
                        .help("Do not verify the provider's chain id before claiming"),
                ),
        )
        .subcommand(
            SubCommand::with_name("watch")
                .about("Follow claim eligibility live until interrupted")
                .arg(address_arg()),
        )
    }
}

// ── Argument Parsing ────────────────────────────────────────────────
fn address_of(matches: &ArgMatches<'_>) -> Result<Option<Address>, CliError> {
    matches
        .value_of("address")
        .map(|value| {
            value
                .parse()
                .map_err(|err| CliError::BadParameter(format!("invalid address {value:?}: {err}")))
        })
        .transpose()
}

pub fn parse_faucet_command(
    name: &str,
    matches: &ArgMatches<'_>,
) -> Result<FaucetCliCommand, CliError> {
    let command = match name {
        "info" => FaucetCliCommand::Info,
        "status" => FaucetCliCommand::Status {
            address: address_of(matches)?,
        },
        "balance" => FaucetCliCommand::Balance {
            address: address_of(matches)?,
        },
        "claim" => FaucetCliCommand::Claim {
            address: address_of(matches)?,
            skip_network_check: matches.is_present("skip_network_check"),
        },
        "watch" => FaucetCliCommand::Watch {
            address: address_of(matches)?,
        },
        other => return Err(CliError::BadParameter(format!("unknown command {other:?}"))),
    };
    Ok(command)
}

// ── Command Processing ──────────────────────────────────────────────
pub async fn process_faucet_command(
    config: &CliConfig,
    command: &FaucetCliCommand,
) -> ProcessResult {
    let settings = config.settings()?;
    let chain = ChainContext::new(&settings);
    match command {
        FaucetCliCommand::Info => process_info(config, &settings, &chain).await,
        FaucetCliCommand::Status { address } => {
            process_status(config, &settings, &chain, *address).await
        }
        FaucetCliCommand::Balance { address } => {
            process_balance(config, &settings, &chain, *address).await
        }
        FaucetCliCommand::Claim {
            address,
            skip_network_check,
        } => process_claim(config, &settings, &chain, *address, *skip_network_check).await,
        FaucetCliCommand::Watch { address } => {
            process_watch(config, &settings, &chain, *address).await
        }
    }
}

async fn process_info(
    config: &CliConfig,
    settings: &Settings,
    chain: &ChainContext,
) -> ProcessResult {
    let contract = settings
        .contract_address
        .ok_or(ChainError::ContractNotConfigured)?;
    let parameters = chain.reader.fetch_parameters().await?;
    let info = CliFaucetInfo::new(&parameters, contract, &settings.explorer);
    Ok(config.output_format.formatted_string(&info)?)
}

/// One refresh for `address`. An unreachable chain is an error here, not a
/// state to report.
async fn refresh_once(
    engine: &EligibilityEngine,
    address: Address,
) -> Result<EngineSnapshot, CliError> {
    let snapshot = engine
        .refresh(address)
        .await
        .into_snapshot()
        .unwrap_or_else(|| engine.snapshot());
    match (&snapshot.state, &snapshot.last_error) {
        (EligibilityState::Unreachable, Some(err)) => Err(err.clone().into()),
        _ => Ok(snapshot),
    }
}

async fn process_status(
    config: &CliConfig,
    settings: &Settings,
    chain: &ChainContext,
    address: Option<Address>,
) -> ProcessResult {
    let address = chain.resolve_address(address).await?;
    let engine = EligibilityEngine::with_system_clock(chain.reader.clone());
    let snapshot = refresh_once(&engine, address).await?;
    let status = CliClaimStatus::new(address, &snapshot, settings.min_gas_balance);
    Ok(config.output_format.formatted_string(&status)?)
}

async fn process_balance(
    config: &CliConfig,
    settings: &Settings,
    chain: &ChainContext,
    address: Option<Address>,
) -> ProcessResult {
    let address = chain.resolve_address(address).await?;
    let (token_balance, native_balance) = tokio::join!(
        chain.reader.fetch_token_balance(address),
        chain.reader.fetch_native_balance(address),
    );
    let native_balance = native_balance?;
    let balance = CliBalance {
        address: address.to_string(),
        token_balance: token_balance?.to_string(),
        native_balance: native_balance.to_string(),
        has_minimum_gas: tap_faucet::has_minimum_gas(native_balance.raw, settings.min_gas_balance),
    };
    Ok(config.output_format.formatted_string(&balance)?)
}

async fn process_claim(
    config: &CliConfig,
    settings: &Settings,
    chain: &ChainContext,
    address: Option<Address>,
    skip_network_check: bool,
) -> ProcessResult {
    let address = chain.resolve_address(address).await?;
    if !skip_network_check {
        chain.reader.check_network(settings.chain_id).await?;
    }

    let engine = Arc::new(EligibilityEngine::with_system_clock(chain.reader.clone()));
    let coordinator = ClaimCoordinator::new(
        chain.provider.clone(),
        &engine,
        CoordinatorConfig {
            contract: settings.contract_address,
            min_gas_balance: settings.min_gas_balance,
            post_claim_refresh_delay: settings.post_claim_refresh_delay,
        },
    );

    let snapshot = refresh_once(&engine, address).await?;
    let lifecycle = match coordinator.submit_claim(Some(address)).await {
        Ok(lifecycle) => lifecycle,
        Err(ClaimRejection::NotEligible {
            state: Some(EligibilityState::Cooldown),
        }) => {
            return Err(CliError::CooldownActive(format_time_remaining(
                snapshot.seconds_remaining,
            )))
        }
        Err(rejection) => return Err(rejection.into()),
    };

    match lifecycle {
        TransactionLifecycle::Success { tx_hash } => {
            if config.output_format == OutputFormat::Display {
                println!("Claim confirmed, refreshing balances...");
            }
            coordinator.wait_for_scheduled_refresh().await;
            let result =
                CliClaimResult::new(address, tx_hash, &settings.explorer, &engine.snapshot());
            Ok(config.output_format.formatted_string(&result)?)
        }
        TransactionLifecycle::Error { tx_hash, failure } => Err(CliError::ClaimFailed {
            failure,
            tx_url: tx_hash.map(|tx_hash| settings.explorer.tx_url(&tx_hash)),
        }),
        other => {
            error!("claim ended in a non-terminal state: {other:?}");
            Err(CliError::BadParameter(format!(
                "claim did not complete: {other:?}"
            )))
        }
    }
}

fn render_watch_line(config: &CliConfig, status: &CliClaimStatus) -> Result<String, CliError> {
    match config.output_format {
        OutputFormat::Display => Ok(status.summary_line()),
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(status)?),
    }
}

async fn process_watch(
    config: &CliConfig,
    settings: &Settings,
    chain: &ChainContext,
    address: Option<Address>,
) -> ProcessResult {
    let address = chain.resolve_address(address).await?;
    let engine = Arc::new(EligibilityEngine::with_system_clock(chain.reader.clone()));
    let mut updates = engine.subscribe();
    let poller = Poller::start(
        engine,
        address,
        PollerConfig {
            refresh_interval: settings.refresh_interval,
            ..PollerConfig::default()
        },
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted, stopping watch");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.refresh_count == 0 {
                    continue;
                }
                let status = CliClaimStatus::new(address, &snapshot, settings.min_gas_balance);
                let line = render_watch_line(config, &status)?;
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
            }
        }
    }
    poller.stop();
    Ok(String::new())
}
