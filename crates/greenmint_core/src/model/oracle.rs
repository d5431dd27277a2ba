//! Price feed rounds and carbon data requests.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub type RoundId = i64;
pub type RequestId = i64;

/// Price feed decimals used when none are configured.
pub const DEFAULT_FEED_DECIMALS: u8 = 8;

/// One price feed answer. Round ids increase by one per update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRound {
    pub round_id: RoundId,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub answer: Amount,
    pub decimals: u8,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarbonDataRequest {
    pub id: RequestId,
    pub user: Address,
    /// Oracle fee recorded at request time.
    #[serde(with = "crate::model::amount::serde_amount")]
    pub fee: Amount,
    pub requested_at: i64,
    #[serde(with = "optional_amount")]
    pub value: Option<Amount>,
    pub fulfilled_by: Option<Address>,
    pub fulfilled_at: Option<i64>,
}

impl CarbonDataRequest {
    pub fn is_fulfilled(&self) -> bool {
        self.value.is_some()
    }
}

mod optional_amount {
    use crate::model::amount::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Amount>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(amount) => serializer.collect_str(amount),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Amount>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| value.parse::<Amount>().map_err(serde::de::Error::custom))
            .transpose()
    }
}
