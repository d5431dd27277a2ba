//! IPFS hash records and Solana sync records.

use crate::model::address::Address;
use serde::{Deserialize, Serialize};

/// Maximum accepted Solana sync payload, in bytes.
pub const MAX_SYNC_PAYLOAD_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpfsRecord {
    pub id: i64,
    pub user: Address,
    pub hash: String,
    pub stored_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaSync {
    pub id: i64,
    pub user: Address,
    /// Raw payload rendered as `0x` hex.
    pub data: String,
    pub synced_by: Address,
    pub synced_at: i64,
}

/// Renders bytes as `0x`-prefixed lowercase hex.
pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parses `0x`-prefixed (or bare) hex data.
pub fn parse_hex_data(value: &str) -> Option<Vec<u8>> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_hex_data, to_hex_data};

    #[test]
    fn hex_data_accepts_prefix_and_renders_lowercase() {
        assert_eq!(parse_hex_data("0x1234"), Some(vec![0x12, 0x34]));
        assert_eq!(parse_hex_data("ABCD"), Some(vec![0xab, 0xcd]));
        assert_eq!(parse_hex_data("0x123"), None);
        assert_eq!(to_hex_data(&[0x12, 0x34]), "0x1234");
    }
}
