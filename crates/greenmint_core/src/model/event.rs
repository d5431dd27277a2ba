//! Domain events appended to the ledger event log.
//!
//! # Invariants
//! - Every successful mutation appends at least one event in the same
//!   transaction as the state change.
//! - Event payloads are the serialized variant, tagged by `event`.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::challenge::ChallengeId;
use crate::model::governance::ProposalId;
use crate::model::listing::ListingId;
use crate::model::nft::TokenId;
use crate::model::oracle::{RequestId, RoundId};
use crate::model::registry::{RegistryKind, Role};
use crate::model::verification::VerificationId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum DomainEvent {
    RegistryDeployed {
        registry: RegistryKind,
        address: Address,
        deploy_seq: u64,
    },
    RoleGranted {
        registry: RegistryKind,
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        registry: RegistryKind,
        role: Role,
        account: Address,
        sender: Address,
    },
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        value: Amount,
    },
    ProfileCreated {
        user: Address,
    },
    ProfileUpdated {
        user: Address,
    },
    CarbonSavedAdded {
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        amount: Amount,
    },
    MarketplaceActivityUpdated {
        user: Address,
        sold: bool,
    },
    UserRegistered {
        user: Address,
    },
    UserOnboarded {
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        bonus: Amount,
    },
    VerificationSubmitted {
        id: VerificationId,
        user: Address,
        ipfs_hash: String,
    },
    VerificationApproved {
        id: VerificationId,
        verifier: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        reward: Amount,
    },
    VerificationRejected {
        id: VerificationId,
        verifier: Address,
        reason: String,
    },
    ActivityRecorded {
        id: i64,
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        carbon_saved: Amount,
        activity_type: String,
    },
    CarbonReductionTracked {
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        amount: Amount,
    },
    ScoreUpdated {
        board: i64,
        user: Address,
        score: u64,
    },
    ChallengeCreated {
        id: ChallengeId,
        #[serde(with = "crate::model::amount::serde_amount")]
        reward: Amount,
        end_at: i64,
    },
    ChallengeJoined {
        id: ChallengeId,
        user: Address,
    },
    ChallengeCompleted {
        id: ChallengeId,
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        reward: Amount,
    },
    ChallengeDeactivated {
        id: ChallengeId,
    },
    NftMinted {
        token_id: TokenId,
        owner: Address,
        achievement_type: u32,
    },
    NftApproval {
        token_id: TokenId,
        owner: Address,
        approved: Address,
    },
    NftTransfer {
        token_id: TokenId,
        from: Address,
        to: Address,
    },
    DelegateChanged {
        delegator: Address,
        from_delegate: Option<Address>,
        to_delegate: Address,
    },
    ListingCreated {
        id: ListingId,
        seller: Address,
        token_id: Option<TokenId>,
        #[serde(with = "crate::model::amount::serde_amount")]
        price: Amount,
    },
    ListingSold {
        id: ListingId,
        buyer: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        price: Amount,
    },
    ListingCancelled {
        id: ListingId,
    },
    NftDeposited {
        pool_id: i64,
        token_id: TokenId,
    },
    RewardDistributed {
        pool_id: i64,
        token_id: TokenId,
        user: Address,
    },
    ProposalCreated {
        id: ProposalId,
        proposer: Address,
        vote_end: i64,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: Address,
        support: u8,
        weight: u64,
    },
    ProposalCanceled {
        id: ProposalId,
    },
    ProposalExecuted {
        id: ProposalId,
        executor: Address,
    },
    PayeeAdded {
        account: Address,
        shares: u64,
    },
    PaymentReceived {
        id: i64,
        payer: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        amount: Amount,
    },
    PaymentReleased {
        account: Address,
        released_by: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        amount: Amount,
    },
    AnswerUpdated {
        round_id: RoundId,
        #[serde(with = "crate::model::amount::serde_amount")]
        answer: Amount,
    },
    CarbonDataRequested {
        request_id: RequestId,
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        fee: Amount,
    },
    CarbonDataFulfilled {
        request_id: RequestId,
        user: Address,
        #[serde(with = "crate::model::amount::serde_amount")]
        value: Amount,
    },
    HashStored {
        user: Address,
        hash: String,
    },
    DataSyncedToSolana {
        user: Address,
        data: String,
    },
}

impl DomainEvent {
    /// Stable event name, equal to the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegistryDeployed { .. } => "RegistryDeployed",
            Self::RoleGranted { .. } => "RoleGranted",
            Self::RoleRevoked { .. } => "RoleRevoked",
            Self::Transfer { .. } => "Transfer",
            Self::ProfileCreated { .. } => "ProfileCreated",
            Self::ProfileUpdated { .. } => "ProfileUpdated",
            Self::CarbonSavedAdded { .. } => "CarbonSavedAdded",
            Self::MarketplaceActivityUpdated { .. } => "MarketplaceActivityUpdated",
            Self::UserRegistered { .. } => "UserRegistered",
            Self::UserOnboarded { .. } => "UserOnboarded",
            Self::VerificationSubmitted { .. } => "VerificationSubmitted",
            Self::VerificationApproved { .. } => "VerificationApproved",
            Self::VerificationRejected { .. } => "VerificationRejected",
            Self::ActivityRecorded { .. } => "ActivityRecorded",
            Self::CarbonReductionTracked { .. } => "CarbonReductionTracked",
            Self::ScoreUpdated { .. } => "ScoreUpdated",
            Self::ChallengeCreated { .. } => "ChallengeCreated",
            Self::ChallengeJoined { .. } => "ChallengeJoined",
            Self::ChallengeCompleted { .. } => "ChallengeCompleted",
            Self::ChallengeDeactivated { .. } => "ChallengeDeactivated",
            Self::NftMinted { .. } => "NftMinted",
            Self::NftApproval { .. } => "NftApproval",
            Self::NftTransfer { .. } => "NftTransfer",
            Self::DelegateChanged { .. } => "DelegateChanged",
            Self::ListingCreated { .. } => "ListingCreated",
            Self::ListingSold { .. } => "ListingSold",
            Self::ListingCancelled { .. } => "ListingCancelled",
            Self::NftDeposited { .. } => "NftDeposited",
            Self::RewardDistributed { .. } => "RewardDistributed",
            Self::ProposalCreated { .. } => "ProposalCreated",
            Self::VoteCast { .. } => "VoteCast",
            Self::ProposalCanceled { .. } => "ProposalCanceled",
            Self::ProposalExecuted { .. } => "ProposalExecuted",
            Self::PayeeAdded { .. } => "PayeeAdded",
            Self::PaymentReceived { .. } => "PaymentReceived",
            Self::PaymentReleased { .. } => "PaymentReleased",
            Self::AnswerUpdated { .. } => "AnswerUpdated",
            Self::CarbonDataRequested { .. } => "CarbonDataRequested",
            Self::CarbonDataFulfilled { .. } => "CarbonDataFulfilled",
            Self::HashStored { .. } => "HashStored",
            Self::DataSyncedToSolana { .. } => "DataSyncedToSolana",
        }
    }

    /// Registry that emits the event.
    pub fn registry(&self) -> RegistryKind {
        match self {
            Self::RegistryDeployed { registry, .. }
            | Self::RoleGranted { registry, .. }
            | Self::RoleRevoked { registry, .. } => *registry,
            Self::Transfer { .. } => RegistryKind::CarbonCreditToken,
            Self::ProfileCreated { .. }
            | Self::ProfileUpdated { .. }
            | Self::CarbonSavedAdded { .. }
            | Self::MarketplaceActivityUpdated { .. } => RegistryKind::UserProfile,
            Self::UserRegistered { .. } | Self::UserOnboarded { .. } => {
                RegistryKind::UserOnboarding
            }
            Self::VerificationSubmitted { .. }
            | Self::VerificationApproved { .. }
            | Self::VerificationRejected { .. } => RegistryKind::Verification,
            Self::ActivityRecorded { .. } | Self::CarbonReductionTracked { .. } => {
                RegistryKind::CarbonTracking
            }
            Self::ScoreUpdated { .. } => RegistryKind::Leaderboard,
            Self::ChallengeCreated { .. }
            | Self::ChallengeJoined { .. }
            | Self::ChallengeCompleted { .. }
            | Self::ChallengeDeactivated { .. } => RegistryKind::ChallengeManagement,
            Self::NftMinted { .. }
            | Self::NftApproval { .. }
            | Self::NftTransfer { .. }
            | Self::DelegateChanged { .. } => RegistryKind::NftReward,
            Self::ListingCreated { .. }
            | Self::ListingSold { .. }
            | Self::ListingCancelled { .. } => RegistryKind::Marketplace,
            Self::NftDeposited { .. } | Self::RewardDistributed { .. } => RegistryKind::RewardPool,
            Self::ProposalCreated { .. }
            | Self::VoteCast { .. }
            | Self::ProposalCanceled { .. }
            | Self::ProposalExecuted { .. } => RegistryKind::Governance,
            Self::PayeeAdded { .. }
            | Self::PaymentReceived { .. }
            | Self::PaymentReleased { .. } => RegistryKind::Payment,
            Self::AnswerUpdated { .. }
            | Self::CarbonDataRequested { .. }
            | Self::CarbonDataFulfilled { .. } => RegistryKind::Oracle,
            Self::HashStored { .. } => RegistryKind::IpfsStorage,
            Self::DataSyncedToSolana { .. } => RegistryKind::SolanaAdapter,
        }
    }
}

/// Persisted event log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub seq: i64,
    pub uuid: Uuid,
    pub registry: RegistryKind,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: i64,
}

impl LedgerEvent {
    /// Decodes the payload back into a typed event.
    pub fn decode(&self) -> Result<DomainEvent, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::DomainEvent;
    use crate::model::address::Address;
    use crate::model::amount::tokens;
    use crate::model::registry::RegistryKind;

    #[test]
    fn payload_tag_matches_name_and_keeps_full_amounts() {
        let event = DomainEvent::Transfer {
            from: Address::ZERO,
            to: Address::from_bytes([1u8; 20]),
            value: tokens(60),
        };
        let payload = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(payload["event"], event.name());
        assert_eq!(payload["value"], "60000000000000000000");
        assert_eq!(event.registry(), RegistryKind::CarbonCreditToken);

        let decoded: DomainEvent = serde_json::from_value(payload).expect("event should decode");
        assert_eq!(decoded, event);
    }
}
