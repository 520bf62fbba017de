//! Hex address parsing utilities.

use anyhow::Result;

/// Parse a hex address string (with or without a `0x` or `$` prefix).
pub fn parse_hex_address(s: &str) -> Result<u32> {
    let s = s
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('$');
    u32::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address_prefixes() {
        assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("$1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("1000").unwrap(), 0x1000);
    }

    #[test]
    fn test_parse_hex_address_invalid() {
        assert!(parse_hex_address("GHIJK").is_err());
        assert!(parse_hex_address("0xZZZ").is_err());
    }
}
