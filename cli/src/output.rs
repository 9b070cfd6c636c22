use {
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
    tap_chain::{Address, Explorer, FaucetParameters, TxHash, U256},
    tap_cli_config::Config,
    tap_faucet::{format_time_remaining, EligibilityState, EngineSnapshot},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Display,
    Json,
    JsonCompact,
}

impl OutputFormat {
    pub fn formatted_string<T>(&self, item: &T) -> Result<String, serde_json::Error>
    where
        T: Serialize + fmt::Display,
    {
        match self {
            Self::Display => Ok(item.to_string()),
            Self::Json => serde_json::to_string_pretty(item),
            Self::JsonCompact => serde_json::to_string(item),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "display" => Ok(Self::Display),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            other => Err(format!("unknown output format {other:?}")),
        }
    }
}

// ── Output Structs ──────────────────────────────────────────────────
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliFaucetInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub contract: String,
    pub claim_amount: String,
    pub cooldown_seconds: u64,
    pub max_supply: String,
    pub total_supply: String,
    pub remaining_supply: String,
    pub supply_progress_pct: f64,
    pub supply_exhausted: bool,
    pub paused: bool,
    pub contract_url: String,
}

impl CliFaucetInfo {
    pub fn new(parameters: &FaucetParameters, contract: Address, explorer: &Explorer) -> Self {
        Self {
            name: parameters.name.clone(),
            symbol: parameters.token_symbol.clone(),
            decimals: parameters.token_decimals,
            contract: contract.to_string(),
            claim_amount: parameters.claim_amount.to_decimal_string(),
            cooldown_seconds: parameters.cooldown_seconds,
            max_supply: parameters.max_supply.to_decimal_string(),
            total_supply: parameters.total_supply.to_decimal_string(),
            remaining_supply: parameters.remaining_supply().to_decimal_string(),
            supply_progress_pct: parameters.supply_progress_pct(),
            supply_exhausted: parameters.supply_exhausted(),
            paused: parameters.is_paused,
            contract_url: explorer.address_url(&contract),
        }
    }
}

impl fmt::Display for CliFaucetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.symbol)?;
        writeln!(f, "  Contract:         {}", self.contract)?;
        writeln!(f, "  Claim Amount:     {} {}", self.claim_amount, self.symbol)?;
        writeln!(
            f,
            "  Cooldown:         {}",
            format_time_remaining(self.cooldown_seconds)
        )?;
        writeln!(f, "  Total Supply:     {} {}", self.total_supply, self.symbol)?;
        writeln!(f, "  Max Supply:       {} {}", self.max_supply, self.symbol)?;
        writeln!(
            f,
            "  Remaining:        {} {} ({:.1}% minted)",
            self.remaining_supply, self.symbol, self.supply_progress_pct
        )?;
        writeln!(
            f,
            "  Status:           {}",
            if self.paused { "Paused" } else { "Active" }
        )?;
        if self.supply_exhausted {
            writeln!(f, "  Note:             maximum supply reached")?;
        }
        writeln!(f, "  Explorer:         {}", self.contract_url)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliClaimStatus {
    pub address: String,
    pub state: String,
    pub can_claim: bool,
    pub seconds_remaining: u64,
    pub time_remaining: String,
    pub cooldown_progress_pct: u8,
    pub last_claim_at: Option<u64>,
    pub next_claim_at: Option<u64>,
    pub token_balance: Option<String>,
    pub native_balance: Option<String>,
    pub has_minimum_gas: bool,
    pub error: Option<String>,
}

impl CliClaimStatus {
    pub fn new(address: Address, snapshot: &EngineSnapshot, min_gas_balance: U256) -> Self {
        let record = snapshot.claim_record;
        Self {
            address: address.to_string(),
            state: snapshot.state.to_string(),
            can_claim: snapshot.is_eligible_for(address),
            seconds_remaining: snapshot.seconds_remaining,
            time_remaining: format_time_remaining(snapshot.seconds_remaining),
            cooldown_progress_pct: snapshot.progress_pct(),
            last_claim_at: record.and_then(|record| record.last_claim_at),
            next_claim_at: record.and_then(|record| record.cooldown_ends_at),
            token_balance: snapshot.token_balance.as_ref().map(ToString::to_string),
            native_balance: snapshot.native_balance.map(|balance| balance.to_string()),
            has_minimum_gas: snapshot.has_minimum_gas(min_gas_balance),
            error: snapshot.last_error.as_ref().map(ToString::to_string),
        }
    }

    /// One-line rendering used by `watch`.
    pub fn summary_line(&self) -> String {
        let detail = match self.state.as_str() {
            "cooldown" => format!(
                "{} ({}%)",
                self.time_remaining, self.cooldown_progress_pct
            ),
            "eligible" => "ready to claim".to_string(),
            "unreachable" => self.error.clone().unwrap_or_default(),
            _ => String::new(),
        };
        format!("[{}] {}", self.state, detail).trim_end().to_string()
    }
}

impl fmt::Display for CliClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Claim Status for {}", self.address)?;
        writeln!(f, "  State:            {}", self.state)?;
        if self.state == EligibilityState::Cooldown.to_string() {
            writeln!(f, "  Next Claim In:    {}", self.time_remaining)?;
            writeln!(f, "  Progress:         {}%", self.cooldown_progress_pct)?;
        }
        if let Some(last_claim_at) = self.last_claim_at {
            writeln!(f, "  Last Claim:       {last_claim_at} (unix)")?;
        }
        if let Some(balance) = &self.token_balance {
            writeln!(f, "  Token Balance:    {balance}")?;
        }
        if let Some(balance) = &self.native_balance {
            writeln!(f, "  Gas Balance:      {balance}")?;
        }
        if !self.has_minimum_gas {
            writeln!(f, "  Warning:          low ETH balance, you may need more for gas fees")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "  Error:            {error}")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliBalance {
    pub address: String,
    pub token_balance: String,
    pub native_balance: String,
    pub has_minimum_gas: bool,
}

impl fmt::Display for CliBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Balances for {}", self.address)?;
        writeln!(f, "  Token:            {}", self.token_balance)?;
        writeln!(f, "  Gas:              {}", self.native_balance)?;
        if !self.has_minimum_gas {
            writeln!(f, "  Warning:          low ETH balance, you may need more for gas fees")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliClaimResult {
    pub address: String,
    pub tx_hash: String,
    pub tx_url: String,
    pub claimed: Option<String>,
    pub token_balance: Option<String>,
    pub next_claim_in: Option<String>,
}

impl CliClaimResult {
    pub fn new(
        address: Address,
        tx_hash: TxHash,
        explorer: &Explorer,
        snapshot: &EngineSnapshot,
    ) -> Self {
        let claimed = snapshot.parameters.as_ref().map(|parameters| {
            format!(
                "{} {}",
                parameters.claim_amount, parameters.token_symbol
            )
        });
        let next_claim_in = (snapshot.state == EligibilityState::Cooldown)
            .then(|| format_time_remaining(snapshot.seconds_remaining));
        Self {
            address: address.to_string(),
            tx_hash: tx_hash.to_string(),
            tx_url: explorer.tx_url(&tx_hash),
            claimed,
            token_balance: snapshot.token_balance.as_ref().map(ToString::to_string),
            next_claim_in,
        }
    }
}

impl fmt::Display for CliClaimResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.claimed {
            Some(claimed) => writeln!(f, "Claimed {claimed}")?,
            None => writeln!(f, "Claim confirmed")?,
        }
        writeln!(f, "  Transaction:      {}", self.tx_hash)?;
        writeln!(f, "  Explorer:         {}", self.tx_url)?;
        if let Some(balance) = &self.token_balance {
            writeln!(f, "  Token Balance:    {balance}")?;
        }
        if let Some(next_claim_in) = &self.next_claim_in {
            writeln!(f, "  Next Claim In:    {next_claim_in}")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct CliExplorerLink {
    pub url: String,
}

impl fmt::Display for CliExplorerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliConfigValues {
    pub config_file: Option<String>,
    #[serde(flatten)]
    pub config: Config,
}

impl fmt::Display for CliConfigValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unset = |value: &str| {
            if value.is_empty() {
                "(not set)".to_string()
            } else {
                value.to_string()
            }
        };
        if let Some(config_file) = &self.config_file {
            writeln!(f, "Config File:               {config_file}")?;
        }
        writeln!(f, "Contract Address:          {}", unset(&self.config.contract_address))?;
        writeln!(f, "RPC URL:                   {}", self.config.rpc_url)?;
        writeln!(f, "Chain ID:                  {}", self.config.chain_id)?;
        writeln!(f, "Explorer URL:              {}", self.config.explorer_url)?;
        writeln!(f, "Sender:                    {}", unset(&self.config.sender))?;
        writeln!(f, "RPC Timeout:               {}s", self.config.rpc_timeout_secs)?;
        writeln!(f, "Refresh Interval:          {}s", self.config.refresh_interval_secs)?;
        writeln!(
            f,
            "Post-claim Refresh Delay:  {}s",
            self.config.post_claim_refresh_delay_secs
        )?;
        writeln!(f, "Minimum Gas Balance:       {} ETH", self.config.min_gas_balance)?;
        Ok(())
    }
}
