//! CCT payment intake and pro-rata payee release.
//!
//! # Invariants
//! - The Payment registry address holds every received, unreleased CCT.
//! - `released` per payee only grows, and never exceeds its share of all
//!   CCT ever received.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::DomainEvent;
use crate::model::payment::{pending_payment, Payee, PaymentRecord, MAX_MEMO_CHARS};
use crate::model::registry::RegistryKind;
use crate::model::ValidationError;
use crate::repo::payment_repo::PaymentRepository;
use crate::repo::token_repo::TokenRepository;
use crate::service::access::require_backend_or_admin;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::token_service::move_tokens;
use crate::service::{LedgerError, LedgerResult};

pub struct PaymentService<'l> {
    ledger: &'l Ledger,
}

impl<'l> PaymentService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Registers a payee. Backend or deployer admin.
    pub fn add_payee(&self, caller: &Address, account: &Address, shares: u64) -> LedgerResult<()> {
        self.ledger.write("payment_add_payee", |ctx| {
            require_backend_or_admin(
                ctx,
                RegistryKind::Payment,
                caller,
                "Only backend can add payee",
            )?;
            if account.is_zero() {
                return Err(ValidationError::InvalidAddress(account.to_string()).into());
            }
            if shares == 0 {
                return Err(ValidationError::ZeroValue("shares").into());
            }
            if ctx.payments().get_payee(account)?.is_some() {
                return Err(LedgerError::rule("Account already has shares"));
            }
            ctx.payments().insert_payee(account, shares, ctx.now())?;
            ctx.emit(DomainEvent::PayeeAdded {
                account: *account,
                shares,
            })
        })
    }

    /// Pays `amount` CCT from the caller into the splitter.
    pub fn process_payment(
        &self,
        caller: &Address,
        amount: Amount,
        memo: &str,
    ) -> LedgerResult<i64> {
        self.ledger.write("payment_process", |ctx| {
            let payment = ctx.registry_address(RegistryKind::Payment)?;
            if memo.chars().count() > MAX_MEMO_CHARS {
                return Err(ValidationError::TooLong {
                    field: "memo",
                    max: MAX_MEMO_CHARS,
                }
                .into());
            }
            move_tokens(ctx, caller, &payment, amount)?;
            let id = ctx
                .payments()
                .insert_payment(caller, amount, memo.trim(), ctx.now())?;
            ctx.emit(DomainEvent::PaymentReceived {
                id,
                payer: *caller,
                amount,
            })?;
            Ok(id)
        })
    }

    /// Amount currently releasable to `account`; 0 for non-payees.
    pub fn pending(&self, account: &Address) -> LedgerResult<Amount> {
        self.ledger.read(|ctx| pending_for(ctx, account))
    }

    /// Transfers the pending amount to `account`.
    pub fn release(&self, caller: &Address, account: &Address) -> LedgerResult<Amount> {
        self.ledger.write("payment_release", |ctx| {
            let payment = ctx.registry_address(RegistryKind::Payment)?;
            let payee = ctx
                .payments()
                .get_payee(account)?
                .ok_or_else(|| LedgerError::rule("Account has no shares"))?;
            let due = pending_for(ctx, account)?;
            if due == 0 {
                return Err(LedgerError::rule("Account is not due payment"));
            }
            move_tokens(ctx, &payment, account, due)?;
            let released = payee
                .released
                .checked_add(due)
                .ok_or_else(|| LedgerError::rule("Released total overflow"))?;
            ctx.payments().set_released(account, released)?;
            ctx.emit(DomainEvent::PaymentReleased {
                account: *account,
                released_by: *caller,
                amount: due,
            })?;
            Ok(due)
        })
    }

    pub fn list_payees(&self) -> LedgerResult<Vec<Payee>> {
        self.ledger.read(|ctx| Ok(ctx.payments().list_payees()?))
    }

    pub fn list_payments(&self) -> LedgerResult<Vec<PaymentRecord>> {
        self.ledger.read(|ctx| Ok(ctx.payments().list_payments()?))
    }

    pub fn total_shares(&self) -> LedgerResult<u64> {
        self.ledger
            .read(|ctx| Ok(shares_and_released(ctx)?.0))
    }

    pub fn total_released(&self) -> LedgerResult<Amount> {
        self.ledger
            .read(|ctx| Ok(shares_and_released(ctx)?.1))
    }
}

fn shares_and_released(ctx: &Ctx<'_>) -> LedgerResult<(u64, Amount)> {
    let mut shares = 0u64;
    let mut released: Amount = 0;
    for payee in ctx.payments().list_payees()? {
        shares = shares
            .checked_add(payee.shares)
            .ok_or_else(|| LedgerError::rule("Share total overflow"))?;
        released = released
            .checked_add(payee.released)
            .ok_or_else(|| LedgerError::rule("Released total overflow"))?;
    }
    Ok((shares, released))
}

fn pending_for(ctx: &Ctx<'_>, account: &Address) -> LedgerResult<Amount> {
    let payment = ctx.registry_address(RegistryKind::Payment)?;
    let Some(payee) = ctx.payments().get_payee(account)? else {
        return Ok(0);
    };
    let (total_shares, total_released) = shares_and_released(ctx)?;
    let total_received = ctx
        .balances()
        .balance_of(&payment)?
        .checked_add(total_released)
        .ok_or_else(|| LedgerError::rule("Received total overflow"))?;
    pending_payment(total_received, payee.shares, total_shares, payee.released)
        .ok_or_else(|| LedgerError::rule("Payment total overflow"))
}
