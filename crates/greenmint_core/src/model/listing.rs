//! Marketplace listing records.
//!
//! # Invariants
//! - A listing starts `Active` and closes at most once, as `Sold` or
//!   `Cancelled`.
//! - At most one active listing exists per NFT token.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::nft::TokenId;
use serde::{Deserialize, Serialize};

pub type ListingId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Sold,
    Cancelled,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "sold" => Some(Self::Sold),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Sold) | (Self::Active, Self::Cancelled)
        )
    }
}

/// What a listing sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingItem {
    /// An on-ledger NFT reward, settled in CCT.
    Nft { token_id: TokenId },
    /// An off-ledger item described by an IPFS document, settled by the backend.
    Item { ipfs_hash: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller: Address,
    pub item: ListingItem,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub price: Amount,
    pub status: ListingStatus,
    pub buyer: Option<Address>,
    pub listed_at: i64,
    pub closed_at: Option<i64>,
}

impl Listing {
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }

    pub fn token_id(&self) -> Option<TokenId> {
        match self.item {
            ListingItem::Nft { token_id } => Some(token_id),
            ListingItem::Item { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ListingStatus;

    #[test]
    fn closed_listings_never_reopen() {
        use ListingStatus::*;
        assert!(Active.can_transition_to(Sold));
        assert!(Active.can_transition_to(Cancelled));
        assert!(!Sold.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Sold));
    }
}
