//! NFT reward records.

use crate::model::address::Address;
use serde::{Deserialize, Serialize};

pub type TokenId = i64;

pub const NFT_NAME: &str = "GreenMintNFT";
pub const NFT_SYMBOL: &str = "GMNFT";
pub const MAX_TOKEN_URI_CHARS: usize = 512;

/// Minted reward token with achievement metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftToken {
    pub token_id: TokenId,
    pub owner: Address,
    /// URI as supplied at mint time; see [`resolve_token_uri`].
    pub token_uri: String,
    pub description: String,
    pub achievement_type: u32,
    pub approved: Option<Address>,
    pub minted_at: i64,
}

/// Resolves a stored token URI against the registry base URI.
///
/// Values that already carry a scheme (`ipfs://`, `https://`) are returned
/// unchanged; bare content hashes get the base URI prepended.
pub fn resolve_token_uri(base_uri: &str, token_uri: &str) -> String {
    if token_uri.contains("://") {
        token_uri.to_string()
    } else {
        format!("{base_uri}{token_uri}")
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_token_uri;

    const BASE: &str = "https://ipfs.io/ipfs/";

    #[test]
    fn bare_hash_gets_base_uri() {
        assert_eq!(
            resolve_token_uri(BASE, "QmNFTHash123"),
            "https://ipfs.io/ipfs/QmNFTHash123"
        );
    }

    #[test]
    fn full_uris_are_returned_unchanged() {
        assert_eq!(
            resolve_token_uri(BASE, "ipfs://QmNFTHash123"),
            "ipfs://QmNFTHash123"
        );
        assert_eq!(
            resolve_token_uri(BASE, "https://example.com/metadata/1"),
            "https://example.com/metadata/1"
        );
    }
}
