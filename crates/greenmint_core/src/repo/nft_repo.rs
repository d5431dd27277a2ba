//! NFT reward tokens and vote delegation.
//!
//! # Invariants
//! - Burned tokens stay in the table (ids are never reused) but are invisible
//!   to every read.
//! - Ownership changes always clear the single-token approval.

use crate::model::address::Address;
use crate::model::nft::{NftToken, TokenId};
use crate::repo::{
    address_to_db, parse_address, row_address, row_opt_address, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const TOKEN_SELECT_SQL: &str = "SELECT
    token_id,
    owner,
    token_uri,
    description,
    achievement_type,
    approved,
    minted_at
FROM nft_tokens";

pub trait NftRepository {
    fn insert_token(
        &self,
        owner: &Address,
        token_uri: &str,
        description: &str,
        achievement_type: u32,
        now: i64,
    ) -> RepoResult<TokenId>;
    fn get_token(&self, id: TokenId) -> RepoResult<Option<NftToken>>;
    fn set_owner(&self, id: TokenId, owner: &Address) -> RepoResult<()>;
    fn set_approval(&self, id: TokenId, approved: Option<&Address>) -> RepoResult<()>;
    fn mark_burned(&self, id: TokenId) -> RepoResult<()>;
    fn balance_of(&self, owner: &Address) -> RepoResult<u64>;
    fn tokens_of(&self, owner: &Address) -> RepoResult<Vec<TokenId>>;
    fn total_supply(&self) -> RepoResult<u64>;
    fn get_delegate(&self, account: &Address) -> RepoResult<Option<Address>>;
    fn set_delegate(&self, account: &Address, delegatee: &Address) -> RepoResult<()>;
    /// Live tokens whose owner delegates to `account`.
    fn votes_of(&self, account: &Address) -> RepoResult<u64>;
    /// Ids behind [`NftRepository::votes_of`], limited to tokens minted at or
    /// before `minted_until`.
    fn vote_tokens_of(&self, account: &Address, minted_until: i64) -> RepoResult<Vec<TokenId>>;
}

pub struct SqliteNftRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNftRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn count(&self, sql: &str, param: &str) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(sql, [param], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl NftRepository for SqliteNftRepository<'_> {
    fn insert_token(
        &self,
        owner: &Address,
        token_uri: &str,
        description: &str,
        achievement_type: u32,
        now: i64,
    ) -> RepoResult<TokenId> {
        self.conn.execute(
            "INSERT INTO nft_tokens (owner, token_uri, description, achievement_type, minted_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                address_to_db(owner),
                token_uri,
                description,
                i64::from(achievement_type),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_token(&self, id: TokenId) -> RepoResult<Option<NftToken>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOKEN_SELECT_SQL} WHERE token_id = ?1 AND burned = 0;"
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_token_row(row)?)),
            None => Ok(None),
        }
    }

    fn set_owner(&self, id: TokenId, owner: &Address) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE nft_tokens SET owner = ?1, approved = NULL
             WHERE token_id = ?2 AND burned = 0;",
            params![address_to_db(owner), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("nft", id));
        }
        Ok(())
    }

    fn set_approval(&self, id: TokenId, approved: Option<&Address>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE nft_tokens SET approved = ?1 WHERE token_id = ?2 AND burned = 0;",
            params![approved.map(address_to_db), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("nft", id));
        }
        Ok(())
    }

    fn mark_burned(&self, id: TokenId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE nft_tokens SET burned = 1, approved = NULL
             WHERE token_id = ?1 AND burned = 0;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("nft", id));
        }
        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> RepoResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM nft_tokens WHERE owner = ?1 AND burned = 0;",
            &address_to_db(owner),
        )
    }

    fn tokens_of(&self, owner: &Address) -> RepoResult<Vec<TokenId>> {
        let mut stmt = self.conn.prepare(
            "SELECT token_id FROM nft_tokens
             WHERE owner = ?1 AND burned = 0
             ORDER BY token_id ASC;",
        )?;
        let ids = stmt
            .query_map([address_to_db(owner)], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn total_supply(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nft_tokens WHERE burned = 0;",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn get_delegate(&self, account: &Address) -> RepoResult<Option<Address>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT delegatee FROM nft_delegates WHERE account = ?1;",
                [address_to_db(account)],
                |row| row.get(0),
            )
            .optional()?;
        text.map(|value| parse_address(&value, "nft_delegates.delegatee"))
            .transpose()
    }

    fn set_delegate(&self, account: &Address, delegatee: &Address) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO nft_delegates (account, delegatee) VALUES (?1, ?2)
             ON CONFLICT(account) DO UPDATE SET delegatee = excluded.delegatee;",
            params![address_to_db(account), address_to_db(delegatee)],
        )?;
        Ok(())
    }

    fn votes_of(&self, account: &Address) -> RepoResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM nft_tokens AS token
             JOIN nft_delegates AS delegation ON delegation.account = token.owner
             WHERE delegation.delegatee = ?1 AND token.burned = 0;",
            &address_to_db(account),
        )
    }

    fn vote_tokens_of(&self, account: &Address, minted_until: i64) -> RepoResult<Vec<TokenId>> {
        let mut stmt = self.conn.prepare(
            "SELECT token.token_id FROM nft_tokens AS token
             JOIN nft_delegates AS delegation ON delegation.account = token.owner
             WHERE delegation.delegatee = ?1
               AND token.burned = 0
               AND token.minted_at <= ?2
             ORDER BY token.token_id ASC;",
        )?;
        let ids = stmt
            .query_map(params![address_to_db(account), minted_until], |row| {
                row.get::<_, i64>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn parse_token_row(row: &Row<'_>) -> RepoResult<NftToken> {
    let achievement_type: i64 = row.get("achievement_type")?;
    Ok(NftToken {
        token_id: row.get("token_id")?,
        owner: row_address(row, "owner")?,
        token_uri: row.get("token_uri")?,
        description: row.get("description")?,
        achievement_type: u32::try_from(achievement_type).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid achievement_type `{achievement_type}` in nft_tokens"
            ))
        })?,
        approved: row_opt_address(row, "approved")?,
        minted_at: row.get("minted_at")?,
    })
}
