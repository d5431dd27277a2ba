//! Environmental challenge records.
//!
//! # Invariants
//! - `end_at` is strictly after `start_at`.
//! - `participant_count` never exceeds `max_participants` unless the cap is 0
//!   (unlimited).
//! - Deactivation is one-way.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub type ChallengeId = i64;

pub const MAX_TITLE_CHARS: usize = 128;
pub const MAX_DESCRIPTION_CHARS: usize = 2048;

/// Input for creating a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    /// Optional off-ledger details document (e.g. `ipfs://...`).
    pub details_uri: String,
    /// CCT paid to each user who completes the challenge.
    #[serde(with = "crate::model::amount::serde_amount")]
    pub reward: Amount,
    pub duration_secs: i64,
    /// 0 means unlimited.
    pub max_participants: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub description: String,
    pub details_uri: String,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub reward: Amount,
    pub start_at: i64,
    pub end_at: i64,
    pub max_participants: u32,
    pub participant_count: u32,
    pub is_active: bool,
    pub created_by: Address,
}

impl Challenge {
    pub fn has_ended(&self, now: i64) -> bool {
        now >= self.end_at
    }

    pub fn is_full(&self) -> bool {
        self.max_participants != 0 && self.participant_count >= self.max_participants
    }
}

#[cfg(test)]
mod tests {
    use super::Challenge;
    use crate::model::address::Address;

    fn challenge(max_participants: u32, participant_count: u32) -> Challenge {
        Challenge {
            id: 1,
            title: "30-Day Plastic Free".to_string(),
            description: "Avoid single-use plastics".to_string(),
            details_uri: String::new(),
            reward: 0,
            start_at: 100,
            end_at: 200,
            max_participants,
            participant_count,
            is_active: true,
            created_by: Address::ZERO,
        }
    }

    #[test]
    fn zero_cap_is_unlimited() {
        assert!(!challenge(0, 10_000).is_full());
        assert!(challenge(2, 2).is_full());
        assert!(!challenge(2, 1).is_full());
    }

    #[test]
    fn ends_at_end_timestamp() {
        let value = challenge(0, 0);
        assert!(!value.has_ended(199));
        assert!(value.has_ended(200));
    }
}
