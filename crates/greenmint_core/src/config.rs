//! Ledger configuration.
//!
//! # Responsibility
//! - Load deployment and runtime settings from TOML.
//! - Apply environment overrides for paths and log level.
//!
//! # Invariants
//! - Resolution order: explicit path, then `GREENMINT_CONFIG`, then defaults.
//! - `GREENMINT_DB_PATH`, `GREENMINT_LOG_LEVEL` and `GREENMINT_LOG_DIR`
//!   override single fields after the file is read.
//! - A returned config has passed `validate()`.

use crate::logging::default_log_level;
use crate::model::address::Address;
use crate::model::amount::{tokens, Amount};
use crate::model::oracle::DEFAULT_FEED_DECIMALS;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "GREENMINT_CONFIG";
pub const DB_PATH_ENV: &str = "GREENMINT_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "GREENMINT_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "GREENMINT_LOG_DIR";

const DEFAULT_DB_FILE: &str = "greenmint.sqlite3";
const DEFAULT_NFT_BASE_URI: &str = "https://ipfs.io/ipfs/";
const DEFAULT_DEPLOYER: Address = Address::from_bytes([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);
const DEFAULT_BACKEND: Address = Address::from_bytes([
    0x90, 0xf7, 0x9b, 0xf6, 0xeb, 0x2c, 0x4f, 0x87, 0x03, 0x65, 0xe7, 0x85, 0x98, 0x2e, 0x1f, 0x10,
    0x1e, 0x93, 0xb9, 0x06,
]);
const DEFAULT_ORACLE_ANSWER: u64 = 200_000_000;
const DEFAULT_VOTING_PERIOD_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_QUORUM_PERCENT: u8 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Payee registered on the payment splitter at deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeConfig {
    pub account: Address,
    pub shares: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub deployer: Address,
    pub backend: Address,
    pub nft_base_uri: String,
    /// Whole-token decimal string in TOML, e.g. `"10"`.
    #[serde(with = "token_units")]
    pub welcome_bonus: Amount,
    pub oracle_decimals: u8,
    /// Raw feed answer scaled by `oracle_decimals`.
    pub oracle_initial_answer: u64,
    #[serde(with = "token_units")]
    pub oracle_fee: Amount,
    pub governance_voting_period_secs: i64,
    pub governance_quorum_percent: u8,
    pub payees: Vec<PayeeConfig>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
            deployer: DEFAULT_DEPLOYER,
            backend: DEFAULT_BACKEND,
            nft_base_uri: DEFAULT_NFT_BASE_URI.to_string(),
            welcome_bonus: tokens(10),
            oracle_decimals: DEFAULT_FEED_DECIMALS,
            oracle_initial_answer: DEFAULT_ORACLE_ANSWER,
            oracle_fee: tokens(1) / 10,
            governance_voting_period_secs: DEFAULT_VOTING_PERIOD_SECS,
            governance_quorum_percent: DEFAULT_QUORUM_PERCENT,
            payees: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Resolves, parses, overrides and validates the configuration.
    ///
    /// # Errors
    /// - `Io` when an explicitly named file cannot be read.
    /// - `Parse` / `Invalid` for malformed content.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let resolved = path.map(Path::to_path_buf).or(env_path);

        let mut config = match resolved.as_deref() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        info!(
            "event=config_load module=config status=ok source={} payees={}",
            if resolved.is_some() { "file" } else { "defaults" },
            config.payees.len()
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies single-field overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(DB_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            self.db_path = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup(LOG_LEVEL_ENV).filter(|value| !value.trim().is_empty()) {
            self.log_level = value.trim().to_string();
        }
        if let Some(value) = lookup(LOG_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.log_dir = Some(PathBuf::from(value.trim()));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deployer.is_zero() {
            return Err(invalid("deployer", "must not be the zero address"));
        }
        if self.backend.is_zero() {
            return Err(invalid("backend", "must not be the zero address"));
        }
        if self.governance_voting_period_secs <= 0 {
            return Err(invalid(
                "governance_voting_period_secs",
                "must be greater than zero",
            ));
        }
        if self.governance_quorum_percent > 100 {
            return Err(invalid("governance_quorum_percent", "must be at most 100"));
        }
        if self.oracle_decimals > 36 {
            return Err(invalid("oracle_decimals", "must be at most 36"));
        }
        for (index, payee) in self.payees.iter().enumerate() {
            if payee.shares == 0 {
                return Err(invalid("payees", format!("entry {index} has zero shares")));
            }
            if self.payees[..index]
                .iter()
                .any(|other| other.account == payee.account)
            {
                return Err(invalid(
                    "payees",
                    format!("entry {index} duplicates {}", payee.account),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// Token amounts written as decimal token strings (`"0.1"`), stored as base units.
mod token_units {
    use crate::model::amount::{format_units, parse_units, Amount, TOKEN_DECIMALS};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_units(*value, TOKEN_DECIMALS))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_units(&raw, TOKEN_DECIMALS).map_err(serde::de::Error::custom)
    }
}
