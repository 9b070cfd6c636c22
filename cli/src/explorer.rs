use {
    crate::{
        clap_app::{is_valid_address, is_valid_tx_hash},
        cli::{CliConfig, CliError, ProcessResult},
        output::CliExplorerLink,
    },
    clap::{App, AppSettings, Arg, ArgMatches, SubCommand},
    tap_chain::{Address, TxHash},
};

#[derive(Debug, PartialEq, Eq)]
pub enum ExplorerCliCommand {
    Tx { tx_hash: TxHash },
    /// `None` links the configured faucet contract.
    Address { address: Option<Address> },
}

pub trait ExplorerSubCommands {
    fn explorer_subcommands(self) -> Self;
}

impl ExplorerSubCommands for App<'_, '_> {
    fn explorer_subcommands(self) -> Self {
        self.subcommand(
            SubCommand::with_name("explorer")
                .about("Print block explorer links")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("tx")
                        .about("Link to a transaction")
                        .arg(
                            Arg::with_name("tx_hash")
                                .index(1)
                                .value_name("TX_HASH")
                                .takes_value(true)
                                .required(true)
                                .validator(is_valid_tx_hash)
                                .help("Transaction hash"),
                        ),
                )
                .subcommand(
                    SubCommand::with_name("address")
                        .about("Link to an address")
                        .arg(
                            Arg::with_name("address")
                                .index(1)
                                .value_name("ADDRESS")
                                .takes_value(true)
                                .validator(is_valid_address)
                                .help("Address to link [default: the faucet contract]"),
                        ),
                ),
        )
    }
}

pub fn parse_explorer_command(matches: &ArgMatches<'_>) -> Result<ExplorerCliCommand, CliError> {
    match matches.subcommand() {
        ("tx", Some(matches)) => {
            let value = matches.value_of("tx_hash").unwrap_or_default();
            let tx_hash = value.parse().map_err(|err| {
                CliError::BadParameter(format!("invalid transaction hash {value:?}: {err}"))
            })?;
            Ok(ExplorerCliCommand::Tx { tx_hash })
        }
        ("address", Some(matches)) => {
            let address = matches
                .value_of("address")
                .map(|value| {
                    value.parse().map_err(|err| {
                        CliError::BadParameter(format!("invalid address {value:?}: {err}"))
                    })
                })
                .transpose()?;
            Ok(ExplorerCliCommand::Address { address })
        }
        (name, _) => Err(CliError::BadParameter(format!(
            "unknown explorer command {name:?}"
        ))),
    }
}

pub fn process_explorer_command(config: &CliConfig, command: &ExplorerCliCommand) -> ProcessResult {
    let settings = config.settings()?;
    let url = match command {
        ExplorerCliCommand::Tx { tx_hash } => settings.explorer.tx_url(tx_hash),
        ExplorerCliCommand::Address { address } => {
            let address = address.or(settings.contract_address).ok_or_else(|| {
                CliError::BadParameter(
                    "no address given and no faucet contract configured".to_string(),
                )
            })?;
            settings.explorer.address_url(&address)
        }
    };
    Ok(config.output_format.formatted_string(&CliExplorerLink { url })?)
}
