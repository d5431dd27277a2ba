//! IPFS hash registry and Solana sync log.

use crate::model::address::Address;
use crate::model::storage::{IpfsRecord, SolanaSync};
use crate::repo::{address_to_db, row_address, RepoResult};
use rusqlite::{params, Connection};

pub trait StorageRepository {
    fn insert_hash(&self, user: &Address, hash: &str, now: i64) -> RepoResult<i64>;
    fn user_hashes(&self, user: &Address) -> RepoResult<Vec<IpfsRecord>>;
    fn insert_sync(
        &self,
        user: &Address,
        data: &str,
        synced_by: &Address,
        now: i64,
    ) -> RepoResult<i64>;
    fn user_syncs(&self, user: &Address) -> RepoResult<Vec<SolanaSync>>;
}

pub struct SqliteStorageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStorageRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StorageRepository for SqliteStorageRepository<'_> {
    fn insert_hash(&self, user: &Address, hash: &str, now: i64) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO ipfs_hashes (user, hash, stored_at) VALUES (?1, ?2, ?3);",
            params![address_to_db(user), hash, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn user_hashes(&self, user: &Address) -> RepoResult<Vec<IpfsRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user, hash, stored_at FROM ipfs_hashes WHERE user = ?1 ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([address_to_db(user)])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(IpfsRecord {
                id: row.get("id")?,
                user: row_address(row, "user")?,
                hash: row.get("hash")?,
                stored_at: row.get("stored_at")?,
            });
        }
        Ok(records)
    }

    fn insert_sync(
        &self,
        user: &Address,
        data: &str,
        synced_by: &Address,
        now: i64,
    ) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO solana_syncs (user, payload, synced_by, synced_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![address_to_db(user), data, address_to_db(synced_by), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn user_syncs(&self, user: &Address) -> RepoResult<Vec<SolanaSync>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user, payload, synced_by, synced_at FROM solana_syncs
             WHERE user = ?1 ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([address_to_db(user)])?;
        let mut syncs = Vec::new();
        while let Some(row) = rows.next()? {
            syncs.push(SolanaSync {
                id: row.get("id")?,
                user: row_address(row, "user")?,
                data: row.get("payload")?,
                synced_by: row_address(row, "synced_by")?,
                synced_at: row.get("synced_at")?,
            });
        }
        Ok(syncs)
    }
}
