//! ABI bindings for the faucet token contract.

use alloy_sol_types::{sol, SolError};

sol! {
    /// ERC-20 token with a rate-limited public `claim()`.
    interface IFaucetToken {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);

        function claimAmount() external view returns (uint256);
        function cooldownTime() external view returns (uint256);
        function maxSupply() external view returns (uint256);
        function paused() external view returns (bool);
        function lastClaimTime(address user) external view returns (uint256);
        function canClaim(address user) external view returns (bool);

        function claim() external;

        /// The caller claimed less than `cooldownTime` seconds ago.
        error CooldownActive();
        /// Minting `claimAmount` would exceed `maxSupply`.
        error MaxSupplyExceeded();
        /// OpenZeppelin 5 `Pausable` revert.
        error EnforcedPause();
    }
}

/// Name of the custom error whose selector prefixes `data`, if it is one of
/// the faucet's known errors.
pub fn custom_error_name(data: &[u8]) -> Option<&'static str> {
    let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
    [
        (IFaucetToken::CooldownActive::SELECTOR, IFaucetToken::CooldownActive::SIGNATURE),
        (IFaucetToken::MaxSupplyExceeded::SELECTOR, IFaucetToken::MaxSupplyExceeded::SIGNATURE),
        (IFaucetToken::EnforcedPause::SELECTOR, IFaucetToken::EnforcedPause::SIGNATURE),
    ]
    .into_iter()
    .find(|(known, _)| *known == selector)
    .map(|(_, signature)| signature.trim_end_matches("()"))
}

/// Human-readable revert reason carried in `data`.
///
/// Handles the faucet's custom errors as well as `Error(string)` and
/// `Panic(uint256)` payloads.
pub fn decode_revert_data(data: &[u8]) -> Option<String> {
    custom_error_name(data)
        .map(str::to_string)
        .or_else(|| alloy_sol_types::decode_revert_reason(data))
}
