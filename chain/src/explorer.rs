use {
    crate::provider::TxHash,
    alloy_primitives::Address,
    serde::{Deserialize, Serialize},
};

/// Default block explorer for Base Sepolia.
pub const DEFAULT_EXPLORER_URL: &str = "https://sepolia.basescan.org";

/// Derives block-explorer links. Pure string manipulation, no network access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explorer {
    base_url: String,
}

impl Explorer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tx_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/tx/{tx_hash}", self.base_url)
    }

    pub fn address_url(&self, address: &Address) -> String {
        format!("{}/address/{address}", self.base_url)
    }
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORER_URL)
    }
}
