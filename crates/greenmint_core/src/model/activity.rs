//! Carbon tracking and leaderboard records.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub type ActivityId = i64;

/// Board id of the global leaderboard; challenge boards use the challenge id.
pub const GLOBAL_BOARD: i64 = 0;

pub const MAX_ACTIVITY_TYPE_CHARS: usize = 64;

/// Input for recording one carbon-saving activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub user: Address,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub carbon_saved: Amount,
    /// Free-form label such as `walking` or `biking`.
    pub activity_type: String,
    pub verified: bool,
    pub ipfs_hash: String,
}

/// Persisted carbon-saving activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarbonActivity {
    pub id: ActivityId,
    pub user: Address,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub carbon_saved: Amount,
    pub activity_type: String,
    pub timestamp: i64,
    pub verified: bool,
    pub ipfs_hash: String,
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub user: Address,
    pub score: u64,
}
