//! Ordered ledger schema steps.
//!
//! # Invariants
//! - Step `n` lives at index `n - 1`; versions are implied by position.
//! - All pending steps commit together with the final `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(name, sql)` pairs; the schema version after step `i` is `i + 1`.
const STEPS: [(&str, &str); 5] = [
    ("registries", include_str!("0001_registries.sql")),
    ("community", include_str!("0002_community.sql")),
    ("assets", include_str!("0003_assets.sql")),
    ("integrations", include_str!("0004_integrations.sql")),
    ("ballots_and_scores", include_str!("0005_ballots_and_scores.sql")),
];

/// Schema version this binary migrates to.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings `conn` up to [`latest_version`]; rejects newer databases.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending = &STEPS[from as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (name, sql) in pending {
        tx.execute_batch(sql)?;
        info!("event=db_migrate_step module=db status=ok name={name}");
    }
    tx.pragma_update(None, "user_version", latest)?;
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}
