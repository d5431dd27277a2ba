//! Core domain logic for GreenMint.
//! This crate is the single source of truth for business invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig, PayeeConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::address::Address;
pub use model::amount::{format_units, parse_units, tokens, Amount, TOKEN_DECIMALS};
pub use model::event::{DomainEvent, LedgerEvent};
pub use model::registry::{RegistryKind, RegistryRecord, Role};
pub use model::ValidationError;
pub use repo::event_repo::EventFilter;
pub use repo::{RepoError, RepoResult};
pub use service::ledger::Ledger;
pub use service::openapi::generate_openapi;
pub use service::{LedgerError, LedgerResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
