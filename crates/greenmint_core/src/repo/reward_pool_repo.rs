//! Reward pool custody records.

use crate::model::address::Address;
use crate::model::nft::TokenId;
use crate::repo::{address_to_db, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

pub trait RewardPoolRepository {
    /// Records custody of `token_id` in `pool_id`. Re-deposits reopen the row.
    fn deposit(&self, pool_id: i64, token_id: TokenId, by: &Address, now: i64) -> RepoResult<()>;
    /// Lowest undistributed token id in the pool.
    fn next_undistributed(&self, pool_id: i64) -> RepoResult<Option<TokenId>>;
    fn mark_distributed(
        &self,
        pool_id: i64,
        token_id: TokenId,
        user: &Address,
        now: i64,
    ) -> RepoResult<()>;
    /// Undistributed token ids, ascending.
    fn pool_tokens(&self, pool_id: i64) -> RepoResult<Vec<TokenId>>;
}

pub struct SqliteRewardPoolRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRewardPoolRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RewardPoolRepository for SqliteRewardPoolRepository<'_> {
    fn deposit(&self, pool_id: i64, token_id: TokenId, by: &Address, now: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO reward_pool_tokens (pool_id, token_id, deposited_by, deposited_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(pool_id, token_id) DO UPDATE SET
                deposited_by = excluded.deposited_by,
                deposited_at = excluded.deposited_at,
                distributed_to = NULL,
                distributed_at = NULL;",
            params![pool_id, token_id, address_to_db(by), now],
        )?;
        Ok(())
    }

    fn next_undistributed(&self, pool_id: i64) -> RepoResult<Option<TokenId>> {
        let token_id = self
            .conn
            .query_row(
                "SELECT MIN(token_id) FROM reward_pool_tokens
                 WHERE pool_id = ?1 AND distributed_to IS NULL;",
                [pool_id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        Ok(token_id.flatten())
    }

    fn mark_distributed(
        &self,
        pool_id: i64,
        token_id: TokenId,
        user: &Address,
        now: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE reward_pool_tokens SET distributed_to = ?1, distributed_at = ?2
             WHERE pool_id = ?3 AND token_id = ?4 AND distributed_to IS NULL;",
            params![address_to_db(user), now, pool_id, token_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(
                "pool token",
                format!("{pool_id}/{token_id}"),
            ));
        }
        Ok(())
    }

    fn pool_tokens(&self, pool_id: i64) -> RepoResult<Vec<TokenId>> {
        let mut stmt = self.conn.prepare(
            "SELECT token_id FROM reward_pool_tokens
             WHERE pool_id = ?1 AND distributed_to IS NULL
             ORDER BY token_id ASC;",
        )?;
        let ids = stmt
            .query_map([pool_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
