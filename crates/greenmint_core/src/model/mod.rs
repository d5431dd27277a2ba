//! Ledger domain model.
//!
//! # Responsibility
//! - Define the records held by every registry.
//! - Encode one-way lifecycle transitions as explicit enums.
//!
//! # Invariants
//! - Registry record ids are assigned monotonically by storage and never reused.
//! - A lifecycle enum only moves forward; see each `can_transition_to`.

use thiserror::Error;

pub mod activity;
pub mod address;
pub mod amount;
pub mod challenge;
pub mod event;
pub mod governance;
pub mod listing;
pub mod nft;
pub mod oracle;
pub mod payment;
pub mod profile;
pub mod registry;
pub mod storage;
pub mod verification;

/// Input validation failure raised before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("invalid amount `{0}`")]
    InvalidAmount(String),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid hex data `{0}`")]
    InvalidHexData(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Rejects blank text fields and enforces a length cap.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
