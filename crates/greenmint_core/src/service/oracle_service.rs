//! Price feed rounds and carbon data requests.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::DomainEvent;
use crate::model::oracle::{CarbonDataRequest, PriceRound, RequestId, RoundId};
use crate::model::registry::{RegistryKind, Role};
use crate::model::ValidationError;
use crate::repo::oracle_repo::OracleRepository;
use crate::service::access::{require_backend, require_role};
use crate::service::ledger::Ledger;
use crate::service::{LedgerError, LedgerResult};

pub struct OracleService<'l> {
    ledger: &'l Ledger,
}

impl<'l> OracleService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    pub fn decimals(&self) -> u8 {
        self.ledger.config().oracle_decimals
    }

    /// Publishes a new price round. `ORACLE_ROLE` only.
    pub fn update_answer(&self, caller: &Address, answer: Amount) -> LedgerResult<RoundId> {
        self.ledger.write("oracle_update_answer", |ctx| {
            require_role(ctx, RegistryKind::Oracle, Role::Oracle, caller)?;
            let round_id =
                ctx.oracle()
                    .insert_round(answer, ctx.config().oracle_decimals, ctx.now())?;
            ctx.emit(DomainEvent::AnswerUpdated { round_id, answer })?;
            Ok(round_id)
        })
    }

    pub fn get_latest_price(&self) -> LedgerResult<PriceRound> {
        self.ledger.read(|ctx| {
            ctx.registry(RegistryKind::Oracle)?;
            ctx.oracle()
                .latest_round()?
                .ok_or_else(|| LedgerError::not_found("price round", "latest"))
        })
    }

    /// Opens a carbon data request for `user`. Backend only.
    pub fn request_carbon_data(&self, caller: &Address, user: &Address) -> LedgerResult<RequestId> {
        self.ledger.write("oracle_request", |ctx| {
            require_backend(ctx, RegistryKind::Oracle, caller, "Only backend can request")?;
            let fee = ctx.config().oracle_fee;
            let request_id = ctx.oracle().insert_request(user, fee, ctx.now())?;
            ctx.emit(DomainEvent::CarbonDataRequested {
                request_id,
                user: *user,
                fee,
            })?;
            Ok(request_id)
        })
    }

    /// Answers a pending request. `ORACLE_ROLE` only.
    pub fn fulfill_carbon_data(
        &self,
        caller: &Address,
        request_id: RequestId,
        value: Amount,
    ) -> LedgerResult<()> {
        self.ledger.write("oracle_fulfill", |ctx| {
            require_role(ctx, RegistryKind::Oracle, Role::Oracle, caller)?;
            if value == 0 {
                return Err(ValidationError::ZeroValue("value").into());
            }
            let request = ctx
                .oracle()
                .get_request(request_id)?
                .ok_or_else(|| LedgerError::not_found("carbon data request", request_id))?;
            if request.is_fulfilled()
                || !ctx
                    .oracle()
                    .fulfill_request(request_id, value, caller, ctx.now())?
            {
                return Err(LedgerError::InvalidState(
                    "Request already fulfilled".to_string(),
                ));
            }
            ctx.emit(DomainEvent::CarbonDataFulfilled {
                request_id,
                user: request.user,
                value,
            })
        })
    }

    pub fn get_request(&self, request_id: RequestId) -> LedgerResult<CarbonDataRequest> {
        self.ledger.read(|ctx| {
            ctx.oracle()
                .get_request(request_id)?
                .ok_or_else(|| LedgerError::not_found("carbon data request", request_id))
        })
    }

    /// Latest fulfilled carbon value for `user`.
    pub fn carbon_data(&self, user: &Address) -> LedgerResult<Option<Amount>> {
        self.ledger.read(|ctx| Ok(ctx.oracle().latest_value(user)?))
    }
}
