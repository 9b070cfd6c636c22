use tap_chain::Address;

/// `"Ready to claim!"` for zero, otherwise `"1h 2m 3s"`, `"2m 3s"` or `"3s"`.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Ready to claim!".to_string();
    }
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// `0x1234...abcd`
pub fn truncate_address(address: &Address) -> String {
    let full = address.to_string();
    match (full.get(..6), full.get(full.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => full,
    }
}
