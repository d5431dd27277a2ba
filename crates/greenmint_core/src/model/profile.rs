//! User profile and onboarding records.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub const MAX_NAME_CHARS: usize = 128;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MAX_CAR_MODEL_CHARS: usize = 128;

/// Per-account profile. Backend-maintained counters and self-declared
/// identity share one row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub account: Address,
    /// `None` until the user creates the profile themselves.
    pub name: Option<String>,
    pub email: Option<String>,
    pub car_model: String,
    /// Fuel consumption in 18-decimal fixed point.
    #[serde(with = "crate::model::amount::serde_amount")]
    pub fuel_consumption: Amount,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub total_carbon_saved: Amount,
    pub marketplace_items_sold: u64,
    pub marketplace_items_bought: u64,
    pub updated_at: i64,
}

impl UserProfile {
    pub fn empty(account: Address) -> Self {
        Self {
            account,
            ..Self::default()
        }
    }

    /// Whether the owner has created the profile via self-service.
    pub fn is_created(&self) -> bool {
        self.name.is_some()
    }
}

/// Onboarding registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub account: Address,
    /// Set once the welcome bonus has been paid.
    pub onboarded: bool,
    pub registered_at: i64,
}
