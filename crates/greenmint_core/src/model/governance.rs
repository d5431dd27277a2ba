//! Governance proposal records.
//!
//! Voting weight comes from NFT reward votes. Counting follows the
//! "bravo" support scheme with quorum counted on `for` votes only.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub type ProposalId = i64;

pub const COUNTING_MODE: &str = "support=bravo&quorum=for";
pub const MAX_PROPOSAL_DESCRIPTION_CHARS: usize = 4096;

/// Recorded, non-executed action attached to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub target: Address,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub value: Amount,
    /// Opaque call payload, hex encoded without `0x`.
    pub calldata: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Against,
    For,
    Abstain,
}

impl VoteType {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Against => 0,
            Self::For => 1,
            Self::Abstain => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Against),
            1 => Some(Self::For),
            2 => Some(Self::Abstain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Executed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub description: String,
    pub actions: Vec<ProposalAction>,
    pub vote_start: i64,
    pub vote_end: i64,
    /// `for` votes required, fixed when the proposal is created.
    pub quorum: u64,
    pub against_votes: u64,
    pub for_votes: u64,
    pub abstain_votes: u64,
    pub canceled: bool,
    pub executed: bool,
    pub created_at: i64,
}

impl Proposal {
    /// Derives the lifecycle state at `now`.
    pub fn state(&self, now: i64) -> ProposalState {
        if self.executed {
            return ProposalState::Executed;
        }
        if self.canceled {
            return ProposalState::Canceled;
        }
        if now < self.vote_end {
            return ProposalState::Active;
        }
        if self.for_votes >= self.quorum && self.for_votes > self.against_votes {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        }
    }
}

/// Quorum in votes for a supply and percentage, rounded up.
pub fn quorum_for_supply(total_votes: u64, quorum_percent: u8) -> u64 {
    (total_votes * u64::from(quorum_percent)).div_ceil(100)
}

#[cfg(test)]
mod tests {
    use super::{quorum_for_supply, Proposal, ProposalState};
    use crate::model::address::Address;

    fn proposal(for_votes: u64, against_votes: u64, quorum: u64) -> Proposal {
        Proposal {
            id: 1,
            proposer: Address::ZERO,
            description: "Test proposal".to_string(),
            actions: Vec::new(),
            vote_start: 0,
            vote_end: 100,
            quorum,
            against_votes,
            for_votes,
            abstain_votes: 0,
            canceled: false,
            executed: false,
            created_at: 0,
        }
    }

    #[test]
    fn active_until_vote_end() {
        assert_eq!(proposal(0, 0, 0).state(99), ProposalState::Active);
    }

    #[test]
    fn succeeds_only_with_quorum_and_majority() {
        assert_eq!(proposal(3, 1, 2).state(100), ProposalState::Succeeded);
        assert_eq!(proposal(1, 0, 2).state(100), ProposalState::Defeated);
        assert_eq!(proposal(2, 2, 1).state(100), ProposalState::Defeated);
    }

    #[test]
    fn terminal_flags_win() {
        let mut value = proposal(3, 0, 1);
        value.canceled = true;
        assert_eq!(value.state(0), ProposalState::Canceled);
        value.executed = true;
        assert_eq!(value.state(0), ProposalState::Executed);
    }

    #[test]
    fn quorum_rounds_up() {
        assert_eq!(quorum_for_supply(0, 4), 0);
        assert_eq!(quorum_for_supply(1, 4), 1);
        assert_eq!(quorum_for_supply(100, 4), 4);
        assert_eq!(quorum_for_supply(101, 4), 5);
    }
}
