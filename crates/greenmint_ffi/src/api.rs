//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose wallet, leaderboard and submission flows to Dart via FRB.
//! - Keep error semantics simple: envelopes carry `ok` + message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Token amounts cross the boundary as decimal strings (18 decimals).
//! - Writes are submitted as the configured backend identity.

use greenmint_core::config::DB_PATH_ENV;
use greenmint_core::model::verification::Verification;
use greenmint_core::{
    core_version as core_version_inner, format_units, init_logging as init_logging_inner,
    parse_units, ping as ping_inner, Address, Ledger, LedgerConfig, LedgerError, TOKEN_DECIMALS,
};
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};

const LEADERBOARD_DEFAULT_LIMIT: u32 = 10;
const LEADERBOARD_LIMIT_MAX: u32 = 50;
const MOBILE_DB_FILE_NAME: &str = "greenmint_mobile.sqlite3";
static MOBILE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static LEDGER: Mutex<Option<Ledger>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Verification row shown in the wallet screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletVerification {
    pub id: i64,
    pub activity_id: u64,
    pub ipfs_hash: String,
    /// `pending|approved|rejected`.
    pub status: String,
    /// Paid reward in whole-token decimal form; `"0"` until approved.
    pub reward: String,
}

/// Wallet snapshot for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletOverview {
    pub ok: bool,
    pub address: String,
    /// CCT balance in whole-token decimal form.
    pub carbon_credits: String,
    pub nft_ids: Vec<i64>,
    pub verifications: Vec<WalletVerification>,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

impl WalletOverview {
    fn failure(address: String, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            address,
            carbon_credits: "0".to_string(),
            nft_ids: Vec::new(),
            verifications: Vec::new(),
            message: message.into(),
        }
    }
}

/// Ranked leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    /// 1-based rank.
    pub rank: u32,
    pub address: String,
    /// Abbreviated form for list display.
    pub display_address: String,
    pub score: u64,
}

/// Leaderboard response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardResponse {
    pub rows: Vec<LeaderboardRow>,
    pub message: String,
    /// Effective applied limit.
    pub applied_limit: u32,
}

/// Generic action response envelope for write flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Optional created record ID.
    pub id: Option<i64>,
    /// Stable error code on failure (`unauthorized`, `invalid_input`, ...).
    pub error_code: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl LedgerActionResponse {
    fn success(message: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            ok: true,
            id,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(error_code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            error_code: error_code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Reads balance, NFTs and verifications for `address`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Invalid addresses return `ok=false` with empty collections.
#[flutter_rust_bridge::frb(sync)]
pub fn wallet_overview(address: String) -> WalletOverview {
    let account = match Address::parse(address.trim()) {
        Ok(account) => account,
        Err(err) => {
            return WalletOverview::failure(address, format!("wallet_overview failed: {err}"))
        }
    };

    let loaded = with_ledger(|ledger| {
        let balance = ledger.tokens().balance_of(&account)?;
        let nft_ids = ledger.nfts().get_user_nfts(&account)?;
        let verifications = ledger
            .verification()
            .get_user_verifications(&account)?
            .into_iter()
            .map(|id| ledger.verification().get_verification(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((balance, nft_ids, verifications))
    });

    match loaded {
        Ok((balance, nft_ids, verifications)) => WalletOverview {
            ok: true,
            address: account.to_string(),
            carbon_credits: format_units(balance, TOKEN_DECIMALS),
            message: format!(
                "{} NFT(s), {} verification(s).",
                nft_ids.len(),
                verifications.len()
            ),
            nft_ids,
            verifications: verifications.into_iter().map(to_wallet_verification).collect(),
        },
        Err(err) => WalletOverview::failure(
            address,
            format!("wallet_overview failed: {}", err.message),
        ),
    }
}

/// Returns the top users by score.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `limit=0` falls back to 10; values above 50 are capped.
/// - Never panics; failures yield empty rows with a message.
#[flutter_rust_bridge::frb(sync)]
pub fn leaderboard(limit: u32) -> LeaderboardResponse {
    let applied_limit = normalize_leaderboard_limit(limit);
    match with_ledger(|ledger| ledger.leaderboard().get_top_users(applied_limit)) {
        Ok(entries) => {
            let rows = entries
                .into_iter()
                .zip(1u32..)
                .map(|(entry, rank)| LeaderboardRow {
                    rank,
                    address: entry.user.to_string(),
                    display_address: entry.user.abbreviated(),
                    score: entry.score,
                })
                .collect::<Vec<_>>();
            let message = if rows.is_empty() {
                "No scores yet.".to_string()
            } else {
                format!("Found {} user(s).", rows.len())
            };
            LeaderboardResponse {
                rows,
                message,
                applied_limit,
            }
        }
        Err(err) => LeaderboardResponse {
            rows: Vec::new(),
            message: format!("leaderboard failed: {}", err.message),
            applied_limit,
        },
    }
}

/// Queues an activity proof for review on behalf of `user`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Submitted as the configured backend identity.
/// - Never panics; returns the verification ID on success.
#[flutter_rust_bridge::frb(sync)]
pub fn submit_verification(
    user: String,
    activity_id: u64,
    ipfs_hash: String,
) -> LedgerActionResponse {
    let user = match Address::parse(user.trim()) {
        Ok(user) => user,
        Err(err) => {
            return LedgerActionResponse::failure(
                Some("invalid_input"),
                format!("submit_verification failed: {err}"),
            )
        }
    };
    let submitted = with_ledger(|ledger| {
        ledger.verification().submit_verification(
            &ledger.backend(),
            &user,
            activity_id,
            ipfs_hash.trim(),
        )
    });
    match submitted {
        Ok(id) => LedgerActionResponse::success("Verification submitted.", Some(id)),
        Err(err) => action_failure("submit_verification", err),
    }
}

/// Adds a carbon reduction for `user`.
///
/// Input semantics:
/// - `amount`: whole-token decimal string, e.g. `"2.5"`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Submitted as the configured backend identity.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn track_carbon_reduction(user: String, amount: String) -> LedgerActionResponse {
    let parsed = Address::parse(user.trim())
        .and_then(|user| parse_units(&amount, TOKEN_DECIMALS).map(|amount| (user, amount)));
    let (user, amount) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => {
            return LedgerActionResponse::failure(
                Some("invalid_input"),
                format!("track_carbon_reduction failed: {err}"),
            )
        }
    };
    match with_ledger(|ledger| {
        ledger
            .tracking()
            .track_carbon_reduction(&ledger.backend(), &user, amount)
    }) {
        Ok(()) => LedgerActionResponse::success("Carbon reduction tracked.", None),
        Err(err) => action_failure("track_carbon_reduction", err),
    }
}

/// Abbreviates an address to `0x1234...abcd`.
///
/// # FFI contract
/// - Sync call, pure.
/// - Unparseable input is returned trimmed and unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn format_address(address: String) -> String {
    match Address::parse(address.trim()) {
        Ok(parsed) => parsed.abbreviated(),
        Err(_) => address.trim().to_string(),
    }
}

fn normalize_leaderboard_limit(limit: u32) -> u32 {
    match limit {
        0 => LEADERBOARD_DEFAULT_LIMIT,
        value if value > LEADERBOARD_LIMIT_MAX => LEADERBOARD_LIMIT_MAX,
        value => value,
    }
}

fn resolve_mobile_db_path() -> PathBuf {
    MOBILE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(MOBILE_DB_FILE_NAME)
        })
        .clone()
}

/// Failure raised inside the ledger call path, keeping the core error code.
struct CallError {
    code: &'static str,
    message: String,
}

impl CallError {
    fn unavailable(message: String) -> Self {
        Self {
            code: "ledger_unavailable",
            message,
        }
    }
}

impl From<LedgerError> for CallError {
    fn from(err: LedgerError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Runs `f` against the process-wide ledger, opening and deploying it on
/// first use.
fn with_ledger<T>(f: impl FnOnce(&Ledger) -> Result<T, LedgerError>) -> Result<T, CallError> {
    let mut guard = LEDGER.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        *guard = Some(open_mobile_ledger().map_err(CallError::unavailable)?);
    }
    match guard.as_ref() {
        Some(ledger) => f(ledger).map_err(CallError::from),
        None => Err(CallError::unavailable("ledger unavailable".to_string())),
    }
}

fn open_mobile_ledger() -> Result<Ledger, String> {
    let mut config =
        LedgerConfig::load(None).map_err(|err| format!("ledger config failed: {err}"))?;
    config.db_path = resolve_mobile_db_path();
    let ledger = Ledger::open(config).map_err(|err| format!("ledger DB open failed: {err}"))?;

    let deployed = ledger
        .registries()
        .is_deployed()
        .map_err(|err| err.to_string())?;
    if !deployed {
        match ledger.registries().deploy() {
            Ok(_) | Err(LedgerError::AlreadyDeployed) => {}
            Err(err) => return Err(format!("ledger deploy failed: {err}")),
        }
    }
    Ok(ledger)
}

fn action_failure(op: &str, err: CallError) -> LedgerActionResponse {
    warn!(
        "event=ffi_call module=ffi status=error op={} error_code={} error={}",
        op, err.code, err.message
    );
    LedgerActionResponse::failure(Some(err.code), format!("{op} failed: {}", err.message))
}

fn to_wallet_verification(verification: Verification) -> WalletVerification {
    WalletVerification {
        id: verification.id,
        activity_id: verification.activity_id,
        ipfs_hash: verification.ipfs_hash,
        status: verification.status.as_str().to_string(),
        reward: format_units(verification.reward, TOKEN_DECIMALS),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, format_address, init_logging, leaderboard, ping, submit_verification,
        track_carbon_reduction, wallet_overview,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn format_address_abbreviates_valid_input() {
        assert_eq!(
            format_address("0x1234567890abcdef1234567890abcdef1234abcd".to_string()),
            "0x1234...abcd"
        );
        assert_eq!(format_address(" not-an-address ".to_string()), "not-an-address");
    }

    #[test]
    fn leaderboard_normalizes_limit() {
        assert_eq!(leaderboard(0).applied_limit, 10);
        assert_eq!(leaderboard(500).applied_limit, 50);
        assert_eq!(leaderboard(25).applied_limit, 25);
    }

    #[test]
    fn submitted_verification_shows_in_wallet_as_pending() {
        let user = unique_address();
        let response = submit_verification(user.clone(), 7, "QmWalletProof".to_string());
        assert!(response.ok, "{}", response.message);
        let id = response.id.expect("submission should return an id");

        let wallet = wallet_overview(user);
        assert!(wallet.ok, "{}", wallet.message);
        assert_eq!(wallet.carbon_credits, "0");
        assert!(wallet.nft_ids.is_empty());
        assert_eq!(wallet.verifications.len(), 1);
        assert_eq!(wallet.verifications[0].id, id);
        assert_eq!(wallet.verifications[0].status, "pending");
        assert_eq!(wallet.verifications[0].ipfs_hash, "QmWalletProof");
    }

    #[test]
    fn track_carbon_reduction_accepts_decimal_amounts() {
        let response = track_carbon_reduction(unique_address(), "2.5".to_string());
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.id, None);
    }

    #[test]
    fn track_carbon_reduction_rejects_zero_and_garbage() {
        let zero = track_carbon_reduction(unique_address(), "0".to_string());
        assert!(!zero.ok);

        let garbage = track_carbon_reduction(unique_address(), "lots".to_string());
        assert!(!garbage.ok);
        assert_eq!(garbage.error_code.as_deref(), Some("invalid_input"));
    }

    #[test]
    fn invalid_address_is_reported_not_panicked() {
        let wallet = wallet_overview("0xnope".to_string());
        assert!(!wallet.ok);
        assert!(wallet.message.contains("wallet_overview failed"));

        let response = submit_verification("nope".to_string(), 1, "QmX".to_string());
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("invalid_input"));
    }

    fn unique_address() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("0x{nanos:040x}")
    }
}
