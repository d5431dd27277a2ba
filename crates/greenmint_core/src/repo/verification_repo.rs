//! Verification queue persistence.
//!
//! # Invariants
//! - `decide_verification` only updates rows that are still `pending`.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::verification::{Verification, VerificationId, VerificationStatus};
use crate::repo::{
    address_to_db, amount_to_db, row_address, row_amount, row_opt_address, row_u64, u64_to_db,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const VERIFICATION_SELECT_SQL: &str = "SELECT
    id,
    user,
    activity_id,
    ipfs_hash,
    status,
    verifier,
    rejection_reason,
    reward,
    submitted_at,
    decided_at
FROM verifications";

/// Decision written onto a pending verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationDecision<'a> {
    pub status: VerificationStatus,
    pub verifier: Address,
    pub rejection_reason: Option<&'a str>,
    pub reward: Amount,
    pub decided_at: i64,
}

pub trait VerificationRepository {
    fn insert_verification(
        &self,
        user: &Address,
        activity_id: u64,
        ipfs_hash: &str,
        now: i64,
    ) -> RepoResult<VerificationId>;
    fn get_verification(&self, id: VerificationId) -> RepoResult<Option<Verification>>;
    /// Returns `false` when the row is missing or already decided.
    fn decide_verification(
        &self,
        id: VerificationId,
        decision: &VerificationDecision<'_>,
    ) -> RepoResult<bool>;
    fn verification_count(&self) -> RepoResult<u64>;
    fn user_verification_ids(&self, user: &Address) -> RepoResult<Vec<VerificationId>>;
    fn list_verifications(
        &self,
        status: Option<VerificationStatus>,
    ) -> RepoResult<Vec<Verification>>;
}

pub struct SqliteVerificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVerificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VerificationRepository for SqliteVerificationRepository<'_> {
    fn insert_verification(
        &self,
        user: &Address,
        activity_id: u64,
        ipfs_hash: &str,
        now: i64,
    ) -> RepoResult<VerificationId> {
        self.conn.execute(
            "INSERT INTO verifications (user, activity_id, ipfs_hash, status, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                address_to_db(user),
                u64_to_db(activity_id, "verifications.activity_id")?,
                ipfs_hash,
                VerificationStatus::Pending.as_str(),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_verification(&self, id: VerificationId) -> RepoResult<Option<Verification>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VERIFICATION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_verification_row(row)?)),
            None => Ok(None),
        }
    }

    fn decide_verification(
        &self,
        id: VerificationId,
        decision: &VerificationDecision<'_>,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE verifications
             SET
                status = ?1,
                verifier = ?2,
                rejection_reason = ?3,
                reward = ?4,
                decided_at = ?5
             WHERE id = ?6 AND status = 'pending';",
            params![
                decision.status.as_str(),
                address_to_db(&decision.verifier),
                decision.rejection_reason,
                amount_to_db(decision.reward),
                decision.decided_at,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn verification_count(&self) -> RepoResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM verifications;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn user_verification_ids(&self, user: &Address) -> RepoResult<Vec<VerificationId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM verifications WHERE user = ?1 ORDER BY id ASC;")?;
        let ids = stmt
            .query_map([address_to_db(user)], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn list_verifications(
        &self,
        status: Option<VerificationStatus>,
    ) -> RepoResult<Vec<Verification>> {
        let mut sql = format!("{VERIFICATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(status) = status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_verification_row(row)?);
        }
        Ok(records)
    }
}

fn parse_verification_row(row: &Row<'_>) -> RepoResult<Verification> {
    let status_text: String = row.get("status")?;
    let status = VerificationStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in verifications.status"
        ))
    })?;

    Ok(Verification {
        id: row.get("id")?,
        user: row_address(row, "user")?,
        activity_id: row_u64(row, "activity_id")?,
        ipfs_hash: row.get("ipfs_hash")?,
        status,
        verifier: row_opt_address(row, "verifier")?,
        rejection_reason: row.get("rejection_reason")?,
        reward: row_amount(row, "reward")?,
        submitted_at: row.get("submitted_at")?,
        decided_at: row.get("decided_at")?,
    })
}
