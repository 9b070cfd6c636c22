use {
    crate::{
        config::{parse_config_command, process_config_command, ConfigCliCommand},
        explorer::{parse_explorer_command, process_explorer_command, ExplorerCliCommand},
        faucet::{parse_faucet_command, process_faucet_command, FaucetCliCommand},
        output::OutputFormat,
    },
    clap::ArgMatches,
    log::*,
    std::sync::Arc,
    tap_chain::{
        Address, ChainError, ContractChainReader, HttpProvider, Provider, ProviderError,
    },
    tap_cli_config::{default_config_file, Config, ConfigError, Settings},
    tap_faucet::{ClaimFailure, ClaimRejection},
    thiserror::Error,
};

#[derive(Debug, PartialEq, Eq)]
pub enum CliCommand {
    Faucet(FaucetCliCommand),
    Explorer(ExplorerCliCommand),
    Config(ConfigCliCommand),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("No account to claim for: pass an address or set `sender`")]
    NoAccount,

    #[error("{0}")]
    ClaimRejected(#[from] ClaimRejection),

    #[error("You are still in cooldown period. Next claim in {0}.")]
    CooldownActive(String),

    #[error("{}{}", .failure.user_message(), .tx_url.as_ref().map(|url| format!(" ({url})")).unwrap_or_default())]
    ClaimFailed {
        failure: ClaimFailure,
        tx_url: Option<String>,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ProcessResult = Result<String, CliError>;

pub struct CliConfig {
    pub command: CliCommand,
    /// Effective configuration: file, then environment, then flags.
    pub config: Config,
    pub config_file: Option<String>,
    pub output_format: OutputFormat,
}

impl CliConfig {
    pub fn settings(&self) -> Result<Settings, CliError> {
        Ok(self.config.resolve()?)
    }
}

/// Provider and reader for one command invocation.
pub struct ChainContext {
    pub provider: Arc<HttpProvider>,
    pub reader: Arc<ContractChainReader<HttpProvider>>,
}

impl ChainContext {
    pub fn new(settings: &Settings) -> Self {
        let mut provider = HttpProvider::new(settings.rpc_url.clone());
        if let Some(sender) = settings.sender {
            provider = provider.with_sender(sender);
        }
        let provider = Arc::new(provider);
        let reader = Arc::new(
            ContractChainReader::new(provider.clone(), settings.contract_address)
                .with_timeout(settings.rpc_timeout),
        );
        Self { provider, reader }
    }

    /// `explicit`, or else the provider's account.
    pub async fn resolve_address(&self, explicit: Option<Address>) -> Result<Address, CliError> {
        if let Some(address) = explicit {
            return Ok(address);
        }
        self.provider
            .get_address()
            .await?
            .ok_or(CliError::NoAccount)
    }
}

/// Value of a global argument, wherever on the command line it was given.
pub fn global_value<'a>(matches: &'a ArgMatches<'_>, name: &str) -> Option<&'a str> {
    let mut found = matches.value_of(name);
    let mut current = matches;
    while let (_, Some(sub_matches)) = current.subcommand() {
        if let Some(value) = sub_matches.value_of(name) {
            found = Some(value);
        }
        current = sub_matches;
    }
    found
}

/// Whether a global flag was given anywhere on the command line.
pub fn global_flag(matches: &ArgMatches<'_>, name: &str) -> bool {
    let mut present = matches.is_present(name);
    let mut current = matches;
    while let (_, Some(sub_matches)) = current.subcommand() {
        present |= sub_matches.is_present(name);
        current = sub_matches;
    }
    present
}

pub fn parse_command(matches: &ArgMatches<'_>) -> Result<CliCommand, CliError> {
    let command = match matches.subcommand() {
        ("config", Some(matches)) => CliCommand::Config(parse_config_command(matches)?),
        ("explorer", Some(matches)) => CliCommand::Explorer(parse_explorer_command(matches)?),
        (name, Some(matches)) => CliCommand::Faucet(parse_faucet_command(name, matches)?),
        (name, None) => return Err(CliError::BadParameter(format!("unknown command {name:?}"))),
    };
    Ok(command)
}

pub fn parse_args(matches: &ArgMatches<'_>) -> Result<CliConfig, CliError> {
    let config_file = global_value(matches, "config_file")
        .map(str::to_string)
        .or_else(default_config_file);
    let mut config = match &config_file {
        Some(config_file) => Config::load_or_default(config_file)?,
        None => Config::default(),
    };
    config.apply_env();

    if let Some(url) = global_value(matches, "json_rpc_url") {
        config.rpc_url = url.to_string();
    }
    if let Some(contract) = global_value(matches, "contract") {
        config.contract_address = contract.to_string();
    }
    if let Some(chain_id) = global_value(matches, "chain_id") {
        config.chain_id = chain_id
            .parse()
            .map_err(|_| CliError::BadParameter(format!("invalid chain id {chain_id:?}")))?;
    }
    if let Some(explorer_url) = global_value(matches, "explorer_url") {
        config.explorer_url = explorer_url.to_string();
    }
    if let Some(sender) = global_value(matches, "sender") {
        config.sender = sender.to_string();
    }

    let output_format = global_value(matches, "output_format")
        .map(str::parse::<OutputFormat>)
        .transpose()
        .map_err(CliError::BadParameter)?
        .unwrap_or_default();

    let command = parse_command(matches)?;
    debug!("parsed command {command:?}");
    Ok(CliConfig {
        command,
        config,
        config_file,
        output_format,
    })
}

pub async fn process_command(config: &CliConfig) -> ProcessResult {
    match &config.command {
        CliCommand::Faucet(command) => process_faucet_command(config, command).await,
        CliCommand::Explorer(command) => process_explorer_command(config, command),
        CliCommand::Config(command) => process_config_command(config, command),
    }
}
