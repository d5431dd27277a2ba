//! Payment splitter records.

use crate::model::address::Address;
use crate::model::amount::Amount;
use serde::{Deserialize, Serialize};

pub const MAX_MEMO_CHARS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    pub account: Address,
    pub shares: u64,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub released: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub payer: Address,
    #[serde(with = "crate::model::amount::serde_amount")]
    pub amount: Amount,
    pub memo: String,
    pub paid_at: i64,
}

/// Amount owed to a payee under pro-rata release.
///
/// `floor(total_received * shares / total_shares) - already_released`,
/// floored at 0. The product is split over `total_received / total_shares`
/// and its remainder, so it fits `u128` whenever `shares <= total_shares`.
/// `None` when the entitlement itself does not fit.
pub fn pending_payment(
    total_received: Amount,
    shares: u64,
    total_shares: u64,
    already_released: Amount,
) -> Option<Amount> {
    if total_shares == 0 {
        return Some(0);
    }
    let shares = Amount::from(shares);
    let total_shares = Amount::from(total_shares);
    let whole = (total_received / total_shares).checked_mul(shares)?;
    let part = (total_received % total_shares).checked_mul(shares)? / total_shares;
    let entitled = whole.checked_add(part)?;
    Some(entitled.saturating_sub(already_released))
}

#[cfg(test)]
mod tests {
    use super::pending_payment;
    use crate::model::amount::{tokens, Amount};

    #[test]
    fn splits_by_shares() {
        assert_eq!(pending_payment(1_000, 50, 100, 0), Some(500));
        assert_eq!(pending_payment(1_000, 25, 125, 0), Some(200));
        assert_eq!(pending_payment(10, 1, 3, 0), Some(3));
    }

    #[test]
    fn subtracts_released_and_never_underflows() {
        assert_eq!(pending_payment(1_000, 50, 100, 400), Some(100));
        assert_eq!(pending_payment(1_000, 50, 100, 600), Some(0));
        assert_eq!(pending_payment(1_000, 50, 0, 0), Some(0));
    }

    #[test]
    fn large_share_counts_do_not_overflow() {
        let shares = 1_000_000_000_000_000_000;
        assert_eq!(
            pending_payment(tokens(1_000), shares, shares, 0),
            Some(tokens(1_000))
        );
        assert_eq!(
            pending_payment(Amount::MAX, u64::MAX - 1, u64::MAX, 0),
            Some(Amount::MAX - Amount::MAX / Amount::from(u64::MAX))
        );
        assert_eq!(pending_payment(Amount::MAX, 3, 4, 0), Some(Amount::MAX / 4 * 3 + 2));
    }

    #[test]
    fn entitlement_past_amount_range_is_rejected() {
        assert_eq!(pending_payment(Amount::MAX, 2, 1, 0), None);
    }
}
