//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define registry-oriented data access contracts.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Repositories never check roles; services guard before calling them.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Amounts are stored as decimal TEXT, addresses as lowercase hex TEXT.

use crate::db::DbError;
use crate::model::address::Address;
use crate::model::amount::{amount_from_db, Amount};
use rusqlite::Row;
use thiserror::Error;

pub mod activity_repo;
pub mod challenge_repo;
pub mod event_repo;
pub mod governance_repo;
pub mod leaderboard_repo;
pub mod listing_repo;
pub mod nft_repo;
pub mod oracle_repo;
pub mod payment_repo;
pub mod profile_repo;
pub mod registry_repo;
pub mod reward_pool_repo;
pub mod storage_repo;
pub mod token_repo;
pub mod verification_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every registry table set.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn amount_to_db(value: Amount) -> String {
    value.to_string()
}

pub(crate) fn address_to_db(value: &Address) -> String {
    value.to_string()
}

pub(crate) fn parse_address(text: &str, column: &str) -> RepoResult<Address> {
    Address::parse(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid address `{text}` in {column}")))
}

pub(crate) fn parse_amount(text: &str, column: &str) -> RepoResult<Amount> {
    amount_from_db(text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid amount `{text}` in {column}")))
}

pub(crate) fn row_address(row: &Row<'_>, column: &str) -> RepoResult<Address> {
    let text: String = row.get(column)?;
    parse_address(&text, column)
}

pub(crate) fn row_opt_address(row: &Row<'_>, column: &str) -> RepoResult<Option<Address>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => Ok(Some(parse_address(&text, column)?)),
        None => Ok(None),
    }
}

pub(crate) fn row_amount(row: &Row<'_>, column: &str) -> RepoResult<Amount> {
    let text: String = row.get(column)?;
    parse_amount(&text, column)
}

pub(crate) fn row_bool(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    int_to_bool(row.get::<_, i64>(column)?, column)
}

pub(crate) fn row_u64(row: &Row<'_>, column: &str) -> RepoResult<u64> {
    let value: i64 = row.get(column)?;
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative value `{value}` in {column}")))
}

/// Converts an unsigned counter to SQLite's signed INTEGER.
pub(crate) fn u64_to_db(value: u64, column: &str) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value `{value}` overflows {column}")))
}

#[cfg(test)]
mod tests {
    use super::{int_to_bool, parse_address, parse_amount, u64_to_db, RepoError};

    #[test]
    fn rejects_corrupt_columns() {
        assert!(matches!(
            int_to_bool(2, "t.flag"),
            Err(RepoError::InvalidData(_))
        ));
        assert!(matches!(
            parse_address("0x12", "t.owner"),
            Err(RepoError::InvalidData(_))
        ));
        assert!(matches!(
            parse_amount("-5", "t.amount"),
            Err(RepoError::InvalidData(_))
        ));
        assert!(u64_to_db(u64::MAX, "t.score").is_err());
    }
}
