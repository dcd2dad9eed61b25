//! # Utility Functions
//!
//! Conversions between user-facing text and the opaque byte labels stored on
//! bets, plus small formatting helpers.

use crate::error::Result;

/// Parse a label argument: `0x`-prefixed hex is decoded, anything else is
/// taken as its UTF-8 bytes.
pub fn decode_label(input: &str) -> Result<Vec<u8>> {
    match input.strip_prefix("0x") {
        Some(hex) => Ok(hex::decode(hex)?),
        None => Ok(input.as_bytes().to_vec()),
    }
}

/// Render a label as text when it is printable UTF-8, otherwise as `0x` hex.
pub fn display_label(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.is_empty() && !text.chars().any(char::is_control) => {
            text.to_string()
        }
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

/// Format timestamp as human-readable string
pub fn format_timestamp(timestamp: i64) -> String {
    use chrono::DateTime;
    let dt = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_label() {
        assert_eq!(decode_label("CLE@PIT").unwrap(), b"CLE@PIT".to_vec());
        assert_eq!(decode_label("0x434c4540504954").unwrap(), b"CLE@PIT".to_vec());
        assert_eq!(decode_label("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_label("0xzz").is_err());
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label(b"PIT"), "PIT");
        assert_eq!(display_label(&[0xff, 0x00]), "0xff00");
        assert_eq!(display_label(b"a\nb"), "0x610a62");
        assert_eq!(display_label(b""), "0x");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1735689600), "2025-01-01 00:00:00 UTC");
    }
}
