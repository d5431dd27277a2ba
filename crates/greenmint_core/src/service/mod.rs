//! Registry use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into registry-level operations.
//! - Run every guard before the first write of an operation.
//! - Keep FFI/CLI layers decoupled from storage details.
//!
//! # Invariants
//! - Each mutating operation runs in exactly one SQLite transaction; a
//!   failed guard or rule leaves neither rows nor events behind.
//! - Cross-registry effects (reward mints, sale settlement) share the
//!   caller's transaction through [`ledger::Ctx`].

use crate::config::ConfigError;
use crate::db::DbError;
use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::registry::{RegistryKind, Role};
use crate::model::ValidationError;
use crate::repo::RepoError;
use thiserror::Error;

pub mod access;
pub mod challenge_service;
pub mod deploy_service;
pub mod governance_service;
pub mod leaderboard_service;
pub mod ledger;
pub mod marketplace_service;
pub mod nft_service;
pub mod openapi;
pub mod oracle_service;
pub mod payment_service;
pub mod profile_service;
pub mod reward_pool_service;
pub mod storage_service;
pub mod token_service;
pub mod tracking_service;
pub mod verification_service;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Use-case failure surfaced to FFI/CLI callers.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Backend-gated call from another account.
    #[error("{0}")]
    Unauthorized(String),
    #[error("AccessControl: account {account} is missing role {}", role.id())]
    MissingRole { account: Address, role: Role },
    #[error("registry {0} is not deployed")]
    NotDeployed(RegistryKind),
    #[error("ledger is already deployed")]
    AlreadyDeployed,
    #[error("insufficient balance: {account} holds {available}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        needed: Amount,
    },
    /// One-way lifecycle transition attempted from a closed state.
    #[error("{0}")]
    InvalidState(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// Registry business rule violation.
    #[error("{0}")]
    Rule(String),
}

impl From<DbError> for LedgerError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn unauthorized(message: &str) -> Self {
        Self::Unauthorized(message.to_string())
    }

    pub(crate) fn rule(message: &str) -> Self {
        Self::Rule(message.to_string())
    }

    /// Stable machine-readable code used in log lines and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Repo(RepoError::NotFound { .. }) | Self::NotFound { .. } => "not_found",
            Self::Repo(RepoError::InvalidData(_)) => "invalid_data",
            Self::Repo(RepoError::Db(_)) => "db_error",
            Self::Config(_) => "config_error",
            Self::Validation(_) => "invalid_input",
            Self::Unauthorized(_) => "unauthorized",
            Self::MissingRole { .. } => "missing_role",
            Self::NotDeployed(_) => "not_deployed",
            Self::AlreadyDeployed => "already_deployed",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InvalidState(_) => "invalid_state",
            Self::Rule(_) => "rule_violation",
        }
    }

    /// Whether the failure is an authorization rejection.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::MissingRole { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::LedgerError;
    use crate::model::address::Address;
    use crate::model::registry::Role;

    #[test]
    fn missing_role_renders_access_control_message() {
        let account = Address::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8")
            .expect("address should parse");
        let err = LedgerError::MissingRole {
            account,
            role: Role::Administrator,
        };
        let message = err.to_string();
        assert!(message.starts_with(
            "AccessControl: account 0x70997970c51812dc3a010c7d01b50e0d17dc79c8 is missing role 0x"
        ));
        assert!(message.ends_with(&Role::Administrator.id()));
        assert_eq!(err.code(), "missing_role");
        assert!(err.is_access_denied());
    }

    #[test]
    fn backend_rejections_keep_registry_message() {
        let err = LedgerError::unauthorized("Only backend can submit");
        assert_eq!(err.to_string(), "Only backend can submit");
        assert_eq!(err.code(), "unauthorized");
    }
}
