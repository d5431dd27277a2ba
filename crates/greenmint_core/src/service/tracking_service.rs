//! Carbon activity tracking.

use crate::model::activity::{ActivityId, CarbonActivity, NewActivity, MAX_ACTIVITY_TYPE_CHARS};
use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::DomainEvent;
use crate::model::registry::RegistryKind;
use crate::model::verification::MAX_IPFS_HASH_CHARS;
use crate::model::{require_text, ValidationError};
use crate::repo::activity_repo::ActivityRepository;
use crate::service::access::require_backend;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::LedgerResult;

const ONLY_BACKEND_RECORD: &str = "Only backend can record";

pub struct TrackingService<'l> {
    ledger: &'l Ledger,
}

impl<'l> TrackingService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    pub fn record_activity(
        &self,
        caller: &Address,
        activity: &NewActivity,
    ) -> LedgerResult<ActivityId> {
        self.ledger.write("tracking_record", |ctx| {
            require_backend(ctx, RegistryKind::CarbonTracking, caller, ONLY_BACKEND_RECORD)?;
            record(ctx, activity)
        })
    }

    /// Records a batch atomically; ids are returned in input order.
    pub fn record_activities(
        &self,
        caller: &Address,
        activities: &[NewActivity],
    ) -> LedgerResult<Vec<ActivityId>> {
        self.ledger.write("tracking_record_batch", |ctx| {
            require_backend(ctx, RegistryKind::CarbonTracking, caller, ONLY_BACKEND_RECORD)?;
            if activities.is_empty() {
                return Err(ValidationError::EmptyField("activities").into());
            }
            activities
                .iter()
                .map(|activity| record(ctx, activity))
                .collect()
        })
    }

    /// Adds `amount` to the user's tracked carbon credits.
    pub fn track_carbon_reduction(
        &self,
        caller: &Address,
        user: &Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.ledger.write("tracking_reduction", |ctx| {
            require_backend(
                ctx,
                RegistryKind::CarbonTracking,
                caller,
                "Only backend can track",
            )?;
            if amount == 0 {
                return Err(ValidationError::ZeroValue("amount").into());
            }
            ctx.activities().insert_reduction(user, amount, ctx.now())?;
            ctx.emit(DomainEvent::CarbonReductionTracked {
                user: *user,
                amount,
            })
        })
    }

    pub fn get_user_activities(&self, user: &Address) -> LedgerResult<Vec<CarbonActivity>> {
        self.ledger
            .read(|ctx| Ok(ctx.activities().user_activities(user)?))
    }

    /// Verified activity carbon plus tracked reductions of `user`.
    pub fn get_user_carbon_credits(&self, user: &Address) -> LedgerResult<Amount> {
        self.ledger.read(|ctx| {
            let verified = ctx.activities().verified_carbon(user)?;
            let tracked = ctx.activities().tracked_reductions(user)?;
            Ok(verified.saturating_add(tracked))
        })
    }

    pub fn get_total_carbon_reduction(&self) -> LedgerResult<Amount> {
        self.ledger
            .read(|ctx| Ok(ctx.activities().total_carbon_reduction()?))
    }
}

fn record(ctx: &Ctx<'_>, activity: &NewActivity) -> LedgerResult<ActivityId> {
    if activity.carbon_saved == 0 {
        return Err(ValidationError::ZeroValue("carbon_saved").into());
    }
    require_text("activity_type", &activity.activity_type, MAX_ACTIVITY_TYPE_CHARS)?;
    if activity.ipfs_hash.chars().count() > MAX_IPFS_HASH_CHARS {
        return Err(ValidationError::TooLong {
            field: "ipfs_hash",
            max: MAX_IPFS_HASH_CHARS,
        }
        .into());
    }
    let id = ctx.activities().insert_activity(activity, ctx.now())?;
    ctx.emit(DomainEvent::ActivityRecorded {
        id,
        user: activity.user,
        carbon_saved: activity.carbon_saved,
        activity_type: activity.activity_type.clone(),
    })?;
    Ok(id)
}
