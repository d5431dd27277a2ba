#![allow(dead_code)]

use greenmint_core::{open_db_in_memory, tokens, Address, FixedClock, Ledger, LedgerConfig};
use std::sync::Arc;

pub const START: i64 = 1_700_000_000;

/// Deterministic test account; `n` lands in the last byte.
pub fn account(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xA0;
    bytes[19] = n;
    Address::from_bytes(bytes)
}

pub fn ledger_with(config: LedgerConfig) -> (Ledger, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(START));
    let conn = open_db_in_memory().unwrap();
    let ledger = Ledger::with_connection(conn, config, Arc::clone(&clock));
    (ledger, clock)
}

/// In-memory ledger with every registry deployed under the default config.
pub fn deployed() -> (Ledger, Arc<FixedClock>) {
    let (ledger, clock) = ledger_with(LedgerConfig::default());
    ledger.registries().deploy().unwrap();
    (ledger, clock)
}

/// Submits and approves one verification paying `whole` CCT to `user`.
pub fn reward(ledger: &Ledger, user: &Address, whole: u64) -> i64 {
    let backend = ledger.backend();
    let id = ledger
        .verification()
        .submit_verification(&backend, user, 1, "QmProofOfActivity")
        .unwrap();
    ledger
        .verification()
        .verify_submission(&backend, id, tokens(whole))
        .unwrap();
    id
}
