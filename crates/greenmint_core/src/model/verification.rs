//! Verification queue records.
//!
//! # Invariants
//! - A verification starts `Pending` and is decided at most once.
//! - `verifier` is set exactly when the status leaves `Pending`.
//! - `rejection_reason` is set only for `Rejected`.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub type VerificationId = i64;

/// Maximum accepted IPFS hash length.
pub const MAX_IPFS_HASH_CHARS: usize = 128;
/// Maximum accepted rejection reason length.
pub const MAX_REASON_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Only `Pending` may move, and only to a decision.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }
}

/// Claimed environmental activity awaiting a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub id: VerificationId,
    pub user: Address,
    pub activity_id: u64,
    pub ipfs_hash: String,
    pub status: VerificationStatus,
    pub verifier: Option<Address>,
    pub rejection_reason: Option<String>,
    /// CCT minted to `user` on approval (zero for plain batch approvals).
    #[serde(with = "crate::model::amount::serde_amount")]
    pub reward: Amount,
    pub submitted_at: i64,
    pub decided_at: Option<i64>,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == VerificationStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::VerificationStatus;

    #[test]
    fn only_pending_can_be_decided() {
        use VerificationStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Pending));
    }
}
