//! Ledger facade: one connection, one configuration, one clock.
//!
//! # Responsibility
//! - Own the SQLite connection every registry service works against.
//! - Scope each mutating operation to a single transaction.
//! - Log operation outcomes and appended events as metadata-only lines.
//!
//! # Invariants
//! - Events are appended inside the operation transaction; they are only
//!   logged after commit.
//! - Dropping an uncommitted transaction rolls it back.

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::db::{open_db, open_db_in_memory};
use crate::model::address::Address;
use crate::model::event::DomainEvent;
use crate::model::registry::{RegistryKind, RegistryRecord};
use crate::repo::activity_repo::SqliteActivityRepository;
use crate::repo::challenge_repo::SqliteChallengeRepository;
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::governance_repo::SqliteGovernanceRepository;
use crate::repo::leaderboard_repo::SqliteLeaderboardRepository;
use crate::repo::listing_repo::SqliteListingRepository;
use crate::repo::nft_repo::SqliteNftRepository;
use crate::repo::oracle_repo::SqliteOracleRepository;
use crate::repo::payment_repo::SqlitePaymentRepository;
use crate::repo::profile_repo::SqliteProfileRepository;
use crate::repo::registry_repo::{RegistryRepository, SqliteRegistryRepository};
use crate::repo::reward_pool_repo::SqliteRewardPoolRepository;
use crate::repo::storage_repo::SqliteStorageRepository;
use crate::repo::token_repo::SqliteTokenRepository;
use crate::repo::verification_repo::SqliteVerificationRepository;
use crate::service::challenge_service::ChallengeService;
use crate::service::deploy_service::DeployService;
use crate::service::governance_service::GovernanceService;
use crate::service::leaderboard_service::LeaderboardService;
use crate::service::marketplace_service::MarketplaceService;
use crate::service::nft_service::NftService;
use crate::service::oracle_service::OracleService;
use crate::service::payment_service::PaymentService;
use crate::service::profile_service::ProfileService;
use crate::service::reward_pool_service::RewardPoolService;
use crate::service::storage_service::StorageService;
use crate::service::token_service::TokenService;
use crate::service::tracking_service::TrackingService;
use crate::service::verification_service::VerificationService;
use crate::service::{LedgerError, LedgerResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::cell::RefCell;
use std::time::Instant;

/// Registry host backed by one SQLite connection.
pub struct Ledger {
    conn: Connection,
    config: LedgerConfig,
    clock: Box<dyn Clock + Send>,
}

impl Ledger {
    /// Opens (and migrates) the database at `config.db_path`.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let conn = open_db(&config.db_path)?;
        Ok(Self::with_connection(conn, config, SystemClock))
    }

    /// Opens an empty in-memory ledger; `config.db_path` is ignored.
    pub fn open_in_memory(config: LedgerConfig) -> LedgerResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self::with_connection(conn, config, SystemClock))
    }

    /// Wraps an already migrated connection with a custom clock.
    pub fn with_connection(
        conn: Connection,
        config: LedgerConfig,
        clock: impl Clock + Send + 'static,
    ) -> Self {
        Self {
            conn,
            config,
            clock: Box::new(clock),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current ledger time in unix seconds.
    pub fn now(&self) -> i64 {
        self.clock.now_secs()
    }

    pub fn deployer(&self) -> Address {
        self.config.deployer
    }

    pub fn backend(&self) -> Address {
        self.config.backend
    }

    pub fn registries(&self) -> DeployService<'_> {
        DeployService::new(self)
    }

    pub fn tokens(&self) -> TokenService<'_> {
        TokenService::new(self)
    }

    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self)
    }

    pub fn verification(&self) -> VerificationService<'_> {
        VerificationService::new(self)
    }

    pub fn tracking(&self) -> TrackingService<'_> {
        TrackingService::new(self)
    }

    pub fn leaderboard(&self) -> LeaderboardService<'_> {
        LeaderboardService::new(self)
    }

    pub fn challenges(&self) -> ChallengeService<'_> {
        ChallengeService::new(self)
    }

    pub fn nfts(&self) -> NftService<'_> {
        NftService::new(self)
    }

    pub fn marketplace(&self) -> MarketplaceService<'_> {
        MarketplaceService::new(self)
    }

    pub fn reward_pool(&self) -> RewardPoolService<'_> {
        RewardPoolService::new(self)
    }

    pub fn governance(&self) -> GovernanceService<'_> {
        GovernanceService::new(self)
    }

    pub fn payments(&self) -> PaymentService<'_> {
        PaymentService::new(self)
    }

    pub fn oracle(&self) -> OracleService<'_> {
        OracleService::new(self)
    }

    pub fn storage(&self) -> StorageService<'_> {
        StorageService::new(self)
    }

    /// Runs a read-only operation outside any transaction.
    pub(crate) fn read<T>(&self, body: impl FnOnce(&Ctx<'_>) -> LedgerResult<T>) -> LedgerResult<T> {
        let ctx = Ctx::new(&self.conn, &self.config, self.now());
        body(&ctx)
    }

    /// Runs a mutating operation in one transaction.
    ///
    /// # Side effects
    /// - Commits on `Ok`, rolls back on `Err`.
    /// - Emits `event=<op>` logs with duration and status, then one
    ///   `event=ledger_event` line per appended event.
    pub(crate) fn write<T>(
        &self,
        op: &'static str,
        body: impl FnOnce(&Ctx<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let started_at = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        let ctx = Ctx::new(&tx, &self.config, self.now());

        let value = match body(&ctx) {
            Ok(value) => value,
            Err(err) => {
                drop(ctx);
                drop(tx);
                log_failure(op, &err, started_at);
                return Err(err);
            }
        };

        let emitted = ctx.into_emitted();
        if let Err(err) = tx.commit() {
            let err = LedgerError::from(err);
            log_failure(op, &err, started_at);
            return Err(err);
        }

        for event in &emitted {
            info!(
                "event=ledger_event module={} status=ok name={} seq={}",
                event.registry.as_str(),
                event.name,
                event.seq
            );
        }
        info!(
            "event={} module=service status=ok duration_ms={} events={}",
            op,
            started_at.elapsed().as_millis(),
            emitted.len()
        );
        Ok(value)
    }
}

fn log_failure(op: &str, err: &LedgerError, started_at: Instant) {
    let duration_ms = started_at.elapsed().as_millis();
    match err {
        LedgerError::Repo(_) | LedgerError::Config(_) => error!(
            "event={} module=service status=error duration_ms={} error_code={} error={}",
            op,
            duration_ms,
            err.code(),
            err
        ),
        // Caller-facing rejections; messages may echo user input.
        _ => warn!(
            "event={} module=service status=error duration_ms={} error_code={}",
            op,
            duration_ms,
            err.code()
        ),
    }
}

#[derive(Debug, Clone, Copy)]
struct EmittedEvent {
    seq: i64,
    name: &'static str,
    registry: RegistryKind,
}

/// Operation scope handed to service bodies and cross-registry helpers.
pub(crate) struct Ctx<'a> {
    conn: &'a Connection,
    config: &'a LedgerConfig,
    now: i64,
    emitted: RefCell<Vec<EmittedEvent>>,
}

impl<'a> Ctx<'a> {
    fn new(conn: &'a Connection, config: &'a LedgerConfig, now: i64) -> Self {
        Self {
            conn,
            config,
            now,
            emitted: RefCell::new(Vec::new()),
        }
    }

    fn into_emitted(self) -> Vec<EmittedEvent> {
        self.emitted.into_inner()
    }

    pub(crate) fn config(&self) -> &'a LedgerConfig {
        self.config
    }

    pub(crate) fn now(&self) -> i64 {
        self.now
    }

    /// Deployment record of `kind`, or `NotDeployed`.
    pub(crate) fn registry(&self, kind: RegistryKind) -> LedgerResult<RegistryRecord> {
        self.registries()
            .get_registry(kind)?
            .ok_or(LedgerError::NotDeployed(kind))
    }

    pub(crate) fn registry_address(&self, kind: RegistryKind) -> LedgerResult<Address> {
        Ok(self.registry(kind)?.address)
    }

    /// Appends `event` to the log inside the current scope.
    pub(crate) fn emit(&self, event: DomainEvent) -> LedgerResult<()> {
        let seq = self.events().append_event(&event, self.now)?;
        self.emitted.borrow_mut().push(EmittedEvent {
            seq,
            name: event.name(),
            registry: event.registry(),
        });
        Ok(())
    }

    pub(crate) fn registries(&self) -> SqliteRegistryRepository<'a> {
        SqliteRegistryRepository::new(self.conn)
    }

    pub(crate) fn events(&self) -> SqliteEventRepository<'a> {
        SqliteEventRepository::new(self.conn)
    }

    pub(crate) fn balances(&self) -> SqliteTokenRepository<'a> {
        SqliteTokenRepository::new(self.conn)
    }

    pub(crate) fn profiles(&self) -> SqliteProfileRepository<'a> {
        SqliteProfileRepository::new(self.conn)
    }

    pub(crate) fn verifications(&self) -> SqliteVerificationRepository<'a> {
        SqliteVerificationRepository::new(self.conn)
    }

    pub(crate) fn activities(&self) -> SqliteActivityRepository<'a> {
        SqliteActivityRepository::new(self.conn)
    }

    pub(crate) fn scores(&self) -> SqliteLeaderboardRepository<'a> {
        SqliteLeaderboardRepository::new(self.conn)
    }

    pub(crate) fn challenges(&self) -> SqliteChallengeRepository<'a> {
        SqliteChallengeRepository::new(self.conn)
    }

    pub(crate) fn nfts(&self) -> SqliteNftRepository<'a> {
        SqliteNftRepository::new(self.conn)
    }

    pub(crate) fn listings(&self) -> SqliteListingRepository<'a> {
        SqliteListingRepository::new(self.conn)
    }

    pub(crate) fn pools(&self) -> SqliteRewardPoolRepository<'a> {
        SqliteRewardPoolRepository::new(self.conn)
    }

    pub(crate) fn proposals(&self) -> SqliteGovernanceRepository<'a> {
        SqliteGovernanceRepository::new(self.conn)
    }

    pub(crate) fn payments(&self) -> SqlitePaymentRepository<'a> {
        SqlitePaymentRepository::new(self.conn)
    }

    pub(crate) fn oracle(&self) -> SqliteOracleRepository<'a> {
        SqliteOracleRepository::new(self.conn)
    }

    pub(crate) fn storage(&self) -> SqliteStorageRepository<'a> {
        SqliteStorageRepository::new(self.conn)
    }
}
