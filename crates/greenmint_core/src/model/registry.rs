//! Registry kinds, roles and deployment records.
//!
//! # Invariants
//! - Each `RegistryKind` is deployed at most once per ledger.
//! - Role ids are stable: `DEFAULT_ADMIN_ROLE` is all zeroes, every other
//!   role id is `sha256(ROLE_NAME)`.

use crate::model::address::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Every registry hosted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegistryKind {
    Oracle,
    IpfsStorage,
    CarbonCreditToken,
    UserProfile,
    UserOnboarding,
    NftReward,
    Verification,
    CarbonTracking,
    Leaderboard,
    RewardPool,
    ChallengeManagement,
    Marketplace,
    Governance,
    Payment,
    SolanaAdapter,
}

impl RegistryKind {
    /// Token every value-moving registry settles in. The ledger hosts no
    /// separate stablecoin; sales, payments and pools all use CCT.
    pub const SETTLEMENT_TOKEN: RegistryKind = RegistryKind::CarbonCreditToken;

    /// Deployment order. Every registry appears after its dependencies.
    pub const DEPLOY_ORDER: [RegistryKind; 15] = [
        Self::Oracle,
        Self::IpfsStorage,
        Self::CarbonCreditToken,
        Self::UserProfile,
        Self::UserOnboarding,
        Self::NftReward,
        Self::Verification,
        Self::CarbonTracking,
        Self::Leaderboard,
        Self::RewardPool,
        Self::ChallengeManagement,
        Self::Marketplace,
        Self::Governance,
        Self::Payment,
        Self::SolanaAdapter,
    ];

    /// Stable storage/API name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oracle => "OracleIntegration",
            Self::IpfsStorage => "IPFSStorage",
            Self::CarbonCreditToken => "CarbonCreditToken",
            Self::UserProfile => "UserProfile",
            Self::UserOnboarding => "UserOnboarding",
            Self::NftReward => "NFTReward",
            Self::Verification => "Verification",
            Self::CarbonTracking => "CarbonTracking",
            Self::Leaderboard => "Leaderboard",
            Self::RewardPool => "RewardPool",
            Self::ChallengeManagement => "ChallengeManagement",
            Self::Marketplace => "Marketplace",
            Self::Governance => "Governance",
            Self::Payment => "Payment",
            Self::SolanaAdapter => "SolanaAdapter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::DEPLOY_ORDER
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Registries whose addresses are wired into this one at deployment.
    pub fn dependencies(self) -> &'static [RegistryKind] {
        match self {
            Self::Oracle
            | Self::IpfsStorage
            | Self::CarbonCreditToken
            | Self::UserProfile
            | Self::NftReward
            | Self::SolanaAdapter => &[],
            Self::UserOnboarding => &[Self::CarbonCreditToken, Self::UserProfile],
            Self::Verification => &[Self::Oracle, Self::CarbonCreditToken],
            Self::CarbonTracking => &[Self::Oracle],
            Self::Leaderboard => &[Self::CarbonTracking],
            Self::RewardPool => &[Self::NftReward, Self::Leaderboard, Self::SETTLEMENT_TOKEN],
            Self::ChallengeManagement => &[Self::CarbonTracking, Self::CarbonCreditToken],
            Self::Marketplace => &[
                Self::Verification,
                Self::UserProfile,
                Self::RewardPool,
                Self::SETTLEMENT_TOKEN,
                Self::NftReward,
            ],
            Self::Governance => &[Self::NftReward],
            Self::Payment => &[Self::SETTLEMENT_TOKEN, Self::Oracle],
        }
    }

    /// Token registry this registry takes payment in; `None` when it moves
    /// no value between users.
    pub fn settlement_token(self) -> Option<RegistryKind> {
        match self {
            Self::Marketplace | Self::Payment | Self::RewardPool => Some(Self::SETTLEMENT_TOKEN),
            _ => None,
        }
    }
}

impl Display for RegistryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access-control roles granted per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    DefaultAdmin,
    Minter,
    Verifier,
    Administrator,
    Admin,
    Oracle,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Self::DefaultAdmin,
        Self::Minter,
        Self::Verifier,
        Self::Administrator,
        Self::Admin,
        Self::Oracle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DefaultAdmin => "DEFAULT_ADMIN_ROLE",
            Self::Minter => "MINTER_ROLE",
            Self::Verifier => "VERIFIER_ROLE",
            Self::Administrator => "ADMINISTRATOR_ROLE",
            Self::Admin => "ADMIN_ROLE",
            Self::Oracle => "ORACLE_ROLE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
    }

    /// 32-byte role id in `0x` hex form.
    pub fn id(self) -> String {
        match self {
            Self::DefaultAdmin => format!("0x{}", "00".repeat(32)),
            other => format!("0x{}", hex::encode(Sha256::digest(other.as_str().as_bytes()))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deployed registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub kind: RegistryKind,
    pub address: Address,
    /// Trusted operator account for backend-gated operations.
    pub backend: Address,
    /// Deployer; holds `DEFAULT_ADMIN_ROLE`.
    pub admin: Address,
    /// 1-based deployment sequence, also the address derivation nonce.
    pub deploy_seq: u64,
    pub dependencies: BTreeMap<RegistryKind, Address>,
    pub deployed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{RegistryKind, Role};

    #[test]
    fn deploy_order_respects_dependencies() {
        for (index, kind) in RegistryKind::DEPLOY_ORDER.iter().enumerate() {
            for dependency in kind.dependencies() {
                let position = RegistryKind::DEPLOY_ORDER
                    .iter()
                    .position(|candidate| candidate == dependency)
                    .expect("dependency must be deployable");
                assert!(position < index, "{kind} deployed before {dependency}");
            }
        }
    }

    #[test]
    fn value_moving_registries_depend_on_the_settlement_token() {
        for kind in RegistryKind::DEPLOY_ORDER {
            if let Some(token) = kind.settlement_token() {
                assert_eq!(token, RegistryKind::CarbonCreditToken);
                assert!(kind.dependencies().contains(&token), "{kind}");
            }
        }
        assert_eq!(RegistryKind::Governance.settlement_token(), None);
    }

    #[test]
    fn registry_names_roundtrip_case_insensitively() {
        assert_eq!(
            RegistryKind::parse("nftreward"),
            Some(RegistryKind::NftReward)
        );
        assert_eq!(RegistryKind::parse("unknown"), None);
    }

    #[test]
    fn default_admin_role_id_is_zero() {
        assert_eq!(Role::DefaultAdmin.id(), format!("0x{}", "0".repeat(64)));
        assert_ne!(Role::Minter.id(), Role::Verifier.id());
        assert_eq!(Role::Minter.id().len(), 66);
    }
}
