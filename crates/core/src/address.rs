//! Address helpers shared by every crate that keys state by address.

/// Canonical form used for every map key and list membership test.
///
/// Addresses are compared case-insensitively (EIP-55 checksums only differ
/// in case), so the canonical form is trimmed and lowercased.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Abbreviate an address for human-readable messages: `0x1234ab…cdef`.
pub fn short_address(address: &str) -> String {
    let address = address.trim();
    if address.len() <= 14 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}…{}", &address[..8], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(
            normalize_address("  0xAbCDEF0000000000000000000000000000000001 "),
            "0xabcdef0000000000000000000000000000000001"
        );
    }

    #[test]
    fn short_address_abbreviates_long_input() {
        assert_eq!(
            short_address("0x7a250d5630b4cf539739df2c5dacb4c659f2488d"),
            "0x7a250d…488d"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
    }
}
