//! Utility functions for pinpoint-core.

use btleplug::platform::PeripheralId;

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they may be
/// MAC addresses or other formats. This function extracts the useful
/// identifier string.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create a stable identity string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Short suffix of an identity, used in placeholder display names.
pub fn short_id(identifier: &str) -> String {
    let compact: String = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let len = compact.len();
    compact[len.saturating_sub(4)..].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_strips_separators() {
        assert_eq!(short_id("AA:BB:CC:DD:EE:FF"), "EEFF");
        assert_eq!(short_id("ab12"), "AB12");
        assert_eq!(short_id("x"), "X");
        assert_eq!(short_id(""), "");
    }
}
