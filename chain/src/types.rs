use {
    alloy_primitives::{
        utils::{format_units, parse_units, UnitsError},
        U256,
    },
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u8 = 18;

/// An on-chain integer amount together with the decimals it is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Amount in base units.
    pub raw: U256,
    /// Number of decimals separating base units from whole tokens.
    pub decimals: u8,
}

impl TokenAmount {
    pub const fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Parses a human-readable amount such as `"0.0001"`.
    pub fn parse(amount: &str, decimals: u8) -> Result<Self, UnitsError> {
        let raw = parse_units(amount, decimals)?.get_absolute();
        Ok(Self { raw, decimals })
    }

    /// Full-precision decimal rendering without trailing zeros.
    pub fn to_decimal_string(&self) -> String {
        match format_units(self.raw, self.decimals) {
            Ok(formatted) => trim_fraction(formatted),
            Err(_) => self.raw.to_string(),
        }
    }

    /// Lossy floating-point value, for percentages and display.
    pub fn to_f64(&self) -> f64 {
        self.to_decimal_string().parse().unwrap_or_default()
    }

    /// Rendering truncated to at most `places` fractional digits.
    pub fn display_rounded(&self, places: usize) -> String {
        let full = self.to_decimal_string();
        match full.split_once('.') {
            Some((whole, _)) if places == 0 => whole.to_string(),
            Some((whole, fraction)) => {
                let kept: String = fraction.chars().take(places).collect();
                trim_fraction(format!("{whole}.{kept}"))
            }
            None => full,
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

fn trim_fraction(formatted: String) -> String {
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Faucet-wide parameters, fetched wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetParameters {
    /// ERC-20 `name()`.
    pub name: String,
    /// ERC-20 `symbol()`.
    pub token_symbol: String,
    /// ERC-20 `decimals()`.
    pub token_decimals: u8,
    /// Tokens minted to the caller on every successful claim.
    pub claim_amount: TokenAmount,
    /// Minimum interval between two claims by the same address.
    pub cooldown_seconds: u64,
    /// Hard cap on the token's total supply.
    pub max_supply: TokenAmount,
    /// Tokens minted so far.
    pub total_supply: TokenAmount,
    /// Whether the owner has paused claiming.
    pub is_paused: bool,
}

impl FaucetParameters {
    /// Tokens that can still be minted before `max_supply` is reached.
    pub fn remaining_supply(&self) -> TokenAmount {
        TokenAmount::new(
            self.max_supply.raw.saturating_sub(self.total_supply.raw),
            self.token_decimals,
        )
    }

    /// Share of the maximum supply already minted, in percent.
    pub fn supply_progress_pct(&self) -> f64 {
        if self.max_supply.raw.is_zero() {
            return 0.0;
        }
        let pct = self.total_supply.to_f64() / self.max_supply.to_f64() * 100.0;
        pct.clamp(0.0, 100.0)
    }

    /// The next claim would push the supply over the cap.
    pub fn supply_exhausted(&self) -> bool {
        self.remaining_supply().raw < self.claim_amount.raw
    }
}

/// Per-address claim history as reported by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Unix timestamp of the last claim; `None` if the address never claimed.
    pub last_claim_at: Option<u64>,
    /// `last_claim_at + cooldown_seconds`.
    pub cooldown_ends_at: Option<u64>,
    /// The contract's own `canClaim(address)` answer. Eligibility is never
    /// derived locally from timestamps.
    pub can_claim_now: bool,
}

impl ClaimRecord {
    /// Builds a record from raw contract values. The contract reports a
    /// never-claimed address as `lastClaimTime == 0`.
    pub fn from_chain(last_claim_time: u64, cooldown_seconds: u64, can_claim_now: bool) -> Self {
        let last_claim_at = (last_claim_time > 0).then_some(last_claim_time);
        Self {
            last_claim_at,
            cooldown_ends_at: last_claim_at.map(|at| at.saturating_add(cooldown_seconds)),
            can_claim_now,
        }
    }

    /// Seconds until the cooldown ends according to the local clock.
    pub fn seconds_remaining(&self, now: u64) -> u64 {
        self.cooldown_ends_at
            .map(|ends_at| ends_at.saturating_sub(now))
            .unwrap_or(0)
    }
}

/// Faucet token balance of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub raw: U256,
    pub decimals: u8,
    pub symbol: String,
}

impl TokenBalance {
    pub fn amount(&self) -> TokenAmount {
        TokenAmount::new(self.raw, self.decimals)
    }
}

impl fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount().display_rounded(2), self.symbol)
    }
}

/// Native currency balance of an address, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeBalance {
    pub raw: U256,
}

impl NativeBalance {
    pub fn amount(&self) -> TokenAmount {
        TokenAmount::new(self.raw, NATIVE_DECIMALS)
    }
}

impl fmt::Display for NativeBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.amount().display_rounded(4))
    }
}
