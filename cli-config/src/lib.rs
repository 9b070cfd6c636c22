//! Loading and saving the Token Tap configuration file.
//!
//! Values are layered: built-in defaults, then the YAML file, then
//! environment variables, then command-line flags (applied by the caller).
//! [`Config`] keeps everything as plain strings so a half-written file still
//! loads; [`Config::resolve`] validates it into typed [`Settings`].

use {
    log::*,
    serde::{Deserialize, Serialize},
    std::{
        fs::{create_dir_all, File},
        io,
        path::Path,
        time::Duration,
    },
    tap_chain::{explorer::DEFAULT_EXPLORER_URL, Address, Explorer, TokenAmount, U256},
    thiserror::Error,
    url::Url,
};

pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";
/// Base Sepolia.
pub const DEFAULT_CHAIN_ID: u64 = 84_532;
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 12;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_POST_CLAIM_REFRESH_DELAY_SECS: u64 = 2;
/// Native balance below which claiming is disabled.
pub const DEFAULT_MIN_GAS_BALANCE: &str = "0.0001";

/// Environment variables consulted by [`Config::apply_env`], most specific
/// first. The `NEXT_PUBLIC_*` names are accepted for compatibility with
/// existing `.env` files.
pub const ENV_CONTRACT_ADDRESS: &[&str] =
    &["FAUCET_TOKEN_ADDRESS", "NEXT_PUBLIC_FAUCET_TOKEN_ADDRESS"];
pub const ENV_RPC_URL: &[&str] = &["FAUCET_RPC_URL", "NEXT_PUBLIC_BASE_SEPOLIA_RPC"];
pub const ENV_CHAIN_ID: &[&str] = &["FAUCET_CHAIN_ID"];
pub const ENV_EXPLORER_URL: &[&str] = &["FAUCET_EXPLORER_URL"];
pub const ENV_SENDER: &[&str] = &["FAUCET_SENDER"];

/// `~/.config/token-tap/cli/config.yml`, if a home directory exists.
pub fn default_config_file() -> Option<String> {
    dirs_next::home_dir().and_then(|mut path| {
        path.extend([".config", "token-tap", "cli", "config.yml"]);
        path.to_str().map(str::to_string)
    })
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid {field} URL {value:?}: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid {field} amount {value:?}: {reason}")]
    InvalidAmount {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Unknown config key {0:?}")]
    UnknownKey(String),
}

/// The on-disk configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Config {
    /// Faucet token contract. Empty means "not configured".
    pub contract_address: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
    /// Account to claim from. Empty means the provider's first account.
    pub sender: String,
    pub rpc_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub post_claim_refresh_delay_secs: u64,
    /// Minimum native balance, in whole native units.
    pub min_gas_balance: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            sender: String::new(),
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            post_claim_refresh_delay_secs: DEFAULT_POST_CLAIM_REFRESH_DELAY_SECS,
            min_gas_balance: DEFAULT_MIN_GAS_BALANCE.to_string(),
        }
    }
}

impl Config {
    pub fn load(config_file: &str) -> Result<Self, ConfigError> {
        let file = File::open(config_file)?;
        let config = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// Loads `config_file`, falling back to defaults when it does not exist.
    pub fn load_or_default(config_file: &str) -> Result<Self, ConfigError> {
        match Self::load(config_file) {
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no config file at {config_file}, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, config_file: &str) -> Result<(), ConfigError> {
        let path = Path::new(config_file);
        if let Some(outdir) = path.parent() {
            create_dir_all(outdir)?;
        }
        let file = File::create(path)?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Empty values are ignored.
    pub fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };
        if let Some(contract_address) = first(ENV_CONTRACT_ADDRESS) {
            self.contract_address = contract_address;
        }
        if let Some(rpc_url) = first(ENV_RPC_URL) {
            self.rpc_url = rpc_url;
        }
        if let Some(chain_id) = first(ENV_CHAIN_ID) {
            match chain_id.parse() {
                Ok(chain_id) => self.chain_id = chain_id,
                Err(err) => warn!("ignoring {}={chain_id:?}: {err}", ENV_CHAIN_ID[0]),
            }
        }
        if let Some(explorer_url) = first(ENV_EXPLORER_URL) {
            self.explorer_url = explorer_url;
        }
        if let Some(sender) = first(ENV_SENDER) {
            self.sender = sender;
        }
    }

    /// Names accepted by [`Config::get_value`] and [`Config::set_value`].
    pub const KEYS: &'static [&'static str] = &[
        "contract_address",
        "rpc_url",
        "chain_id",
        "explorer_url",
        "sender",
        "rpc_timeout_secs",
        "refresh_interval_secs",
        "post_claim_refresh_delay_secs",
        "min_gas_balance",
    ];

    pub fn get_value(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "contract_address" => self.contract_address.clone(),
            "rpc_url" => self.rpc_url.clone(),
            "chain_id" => self.chain_id.to_string(),
            "explorer_url" => self.explorer_url.clone(),
            "sender" => self.sender.clone(),
            "rpc_timeout_secs" => self.rpc_timeout_secs.to_string(),
            "refresh_interval_secs" => self.refresh_interval_secs.to_string(),
            "post_claim_refresh_delay_secs" => self.post_claim_refresh_delay_secs.to_string(),
            "min_gas_balance" => self.min_gas_balance.clone(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Sets `key` and validates the result, leaving `self` untouched on
    /// error.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        let value = value.trim();
        let number = |field: &'static str| {
            value.parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                field,
                reason: err.to_string(),
            })
        };
        match key {
            "contract_address" => updated.contract_address = value.to_string(),
            "rpc_url" => updated.rpc_url = value.to_string(),
            "chain_id" => updated.chain_id = number("chain_id")?,
            "explorer_url" => updated.explorer_url = value.to_string(),
            "sender" => updated.sender = value.to_string(),
            "rpc_timeout_secs" => updated.rpc_timeout_secs = number("rpc_timeout_secs")?,
            "refresh_interval_secs" => {
                updated.refresh_interval_secs = number("refresh_interval_secs")?
            }
            "post_claim_refresh_delay_secs" => {
                updated.post_claim_refresh_delay_secs = number("post_claim_refresh_delay_secs")?
            }
            "min_gas_balance" => updated.min_gas_balance = value.to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        updated.resolve()?;
        *self = updated;
        Ok(())
    }

    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let contract_address = parse_optional_address("contract_address", &self.contract_address)?;
        if contract_address.is_none() {
            warn!("no faucet contract address configured");
        }
        let sender = parse_optional_address("sender", &self.sender)?;
        let rpc_url = parse_url("rpc_url", &self.rpc_url)?;
        parse_url("explorer_url", &self.explorer_url)?;

        let min_gas_balance = TokenAmount::parse(self.min_gas_balance.trim(), 18)
            .map_err(|err| ConfigError::InvalidAmount {
                field: "min_gas_balance",
                value: self.min_gas_balance.clone(),
                reason: err.to_string(),
            })?
            .raw;

        Ok(Settings {
            contract_address,
            rpc_url,
            chain_id: self.chain_id,
            explorer: Explorer::new(self.explorer_url.trim()),
            sender,
            rpc_timeout: positive_secs("rpc_timeout_secs", self.rpc_timeout_secs)?,
            refresh_interval: positive_secs("refresh_interval_secs", self.refresh_interval_secs)?,
            post_claim_refresh_delay: Duration::from_secs(self.post_claim_refresh_delay_secs),
            min_gas_balance,
        })
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `None` when no address is configured; chain reads then fail with
    /// `ContractNotConfigured` instead of aborting startup.
    pub contract_address: Option<Address>,
    pub rpc_url: Url,
    pub chain_id: u64,
    pub explorer: Explorer,
    pub sender: Option<Address>,
    pub rpc_timeout: Duration,
    pub refresh_interval: Duration,
    pub post_claim_refresh_delay: Duration,
    /// In wei.
    pub min_gas_balance: U256,
}

fn parse_optional_address(
    field: &'static str,
    value: &str,
) -> Result<Option<Address>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        })
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|err| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme {scheme:?}"),
        }),
    }
}

fn positive_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
