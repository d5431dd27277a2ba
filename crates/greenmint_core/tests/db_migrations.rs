use greenmint_core::db::migrations::{self, latest_version};
use greenmint_core::db::{open_db, open_db_in_memory, DbError};
use greenmint_core::{tokens, Address, Ledger, LedgerConfig, LedgerError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "registries",
        "role_grants",
        "ledger_events",
        "token_balances",
        "verifications",
        "challenges",
        "nft_tokens",
        "marketplace_listings",
        "proposals",
        "proposal_vote_tokens",
        "leaderboard_scores",
        "payments",
        "oracle_rounds",
        "solana_syncs",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greenmint.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "registries");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn integer_scores_are_rewritten_as_padded_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v4.sqlite3");

    let conn = Connection::open(&path).unwrap();
    for sql in [
        include_str!("../src/db/migrations/0001_registries.sql"),
        include_str!("../src/db/migrations/0002_community.sql"),
        include_str!("../src/db/migrations/0003_assets.sql"),
        include_str!("../src/db/migrations/0004_integrations.sql"),
    ] {
        conn.execute_batch(sql).unwrap();
    }
    conn.execute_batch(
        "INSERT INTO leaderboard_scores (board, user, score, updated_at)
         VALUES (0, 'a', 160, 1), (0, 'b', 9, 1), (0, 'c', 160, 1);
         PRAGMA user_version = 4;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let mut stmt = conn
        .prepare("SELECT user, score FROM leaderboard_scores ORDER BY score DESC, rowid ASC;")
        .unwrap();
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("a".to_string(), "00000000000000000160".to_string()),
            ("c".to_string(), "00000000000000000160".to_string()),
            ("b".to_string(), "00000000000000000009".to_string()),
        ]
    );
}

#[test]
fn ledger_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig {
        db_path: dir.path().join("ledger.sqlite3"),
        ..LedgerConfig::default()
    };
    let user = Address::from_bytes([7u8; 20]);

    let ledger = Ledger::open(config.clone()).unwrap();
    ledger.registries().deploy().unwrap();
    ledger.profiles().onboard_user(&user).unwrap();
    drop(ledger);

    let reopened = Ledger::open(config).unwrap();
    assert!(reopened.registries().is_deployed().unwrap());
    assert_eq!(reopened.tokens().balance_of(&user).unwrap(), tokens(10));
    assert!(matches!(
        reopened.registries().deploy().unwrap_err(),
        LedgerError::AlreadyDeployed
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    migrations::schema_version(conn).unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
