//! CarbonCredit (CCT) fungible token.
//!
//! # Invariants
//! - Balances never go negative; supply equals the sum of balances.
//! - Mints are `Transfer` events from the zero address, burns are
//!   `Transfer` events to it.

use crate::model::address::Address;
use crate::model::amount::{Amount, TOKEN_DECIMALS};
use crate::model::event::DomainEvent;
use crate::model::registry::{RegistryKind, Role};
use crate::model::ValidationError;
use crate::repo::registry_repo::RegistryRepository;
use crate::repo::token_repo::TokenRepository;
use crate::service::access::require_backend_or_role;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::{LedgerError, LedgerResult};

pub const TOKEN_NAME: &str = "CarbonCredit";
pub const TOKEN_SYMBOL: &str = "CCT";

pub struct TokenService<'l> {
    ledger: &'l Ledger,
}

impl<'l> TokenService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    pub fn name(&self) -> &'static str {
        TOKEN_NAME
    }

    pub fn symbol(&self) -> &'static str {
        TOKEN_SYMBOL
    }

    pub fn decimals(&self) -> u32 {
        TOKEN_DECIMALS
    }

    /// Mints `amount` to `to`. Caller must be the backend or a minter.
    pub fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> LedgerResult<()> {
        self.ledger.write("token_mint", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::CarbonCreditToken,
                caller,
                Role::Minter,
                "Only backend can mint",
            )?;
            mint_to(ctx, to, amount)
        })
    }

    /// Burns `amount` from `from`. Caller must be the backend or a minter.
    pub fn burn(&self, caller: &Address, from: &Address, amount: Amount) -> LedgerResult<()> {
        self.ledger.write("token_burn", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::CarbonCreditToken,
                caller,
                Role::Minter,
                "Only backend can burn",
            )?;
            require_positive(amount)?;
            let available = ctx.balances().balance_of(from)?;
            let remaining = available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientBalance {
                    account: *from,
                    available,
                    needed: amount,
                })?;
            ctx.balances().set_balance(from, remaining)?;
            ctx.emit(DomainEvent::Transfer {
                from: *from,
                to: Address::ZERO,
                value: amount,
            })
        })
    }

    /// Moves `amount` from the caller to `to`.
    pub fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> LedgerResult<()> {
        self.ledger.write("token_transfer", |ctx| {
            ctx.registry(RegistryKind::CarbonCreditToken)?;
            move_tokens(ctx, caller, to, amount)
        })
    }

    pub fn balance_of(&self, account: &Address) -> LedgerResult<Amount> {
        self.ledger
            .read(|ctx| Ok(ctx.balances().balance_of(account)?))
    }

    pub fn total_supply(&self) -> LedgerResult<Amount> {
        self.ledger.read(|ctx| Ok(ctx.balances().total_supply()?))
    }

    /// Non-zero balances ordered by account.
    pub fn holders(&self) -> LedgerResult<Vec<(Address, Amount)>> {
        self.ledger.read(|ctx| Ok(ctx.balances().holders()?))
    }
}

fn require_positive(amount: Amount) -> LedgerResult<()> {
    if amount == 0 {
        return Err(ValidationError::ZeroValue("amount").into());
    }
    Ok(())
}

/// Mints inside the current scope. Callers run their own guard first.
pub(crate) fn mint_to(ctx: &Ctx<'_>, to: &Address, amount: Amount) -> LedgerResult<()> {
    require_positive(amount)?;
    if to.is_zero() {
        return Err(ValidationError::InvalidAddress(to.to_string()).into());
    }
    let overflow = || LedgerError::rule("Token supply overflow");
    ctx.balances()
        .total_supply()?
        .checked_add(amount)
        .ok_or_else(overflow)?;
    let next = ctx
        .balances()
        .balance_of(to)?
        .checked_add(amount)
        .ok_or_else(overflow)?;
    ctx.balances().set_balance(to, next)?;
    ctx.emit(DomainEvent::Transfer {
        from: Address::ZERO,
        to: *to,
        value: amount,
    })
}

/// Mints on behalf of another registry, which must hold `MINTER_ROLE`.
pub(crate) fn mint_as_registry(
    ctx: &Ctx<'_>,
    minter: RegistryKind,
    to: &Address,
    amount: Amount,
) -> LedgerResult<()> {
    ctx.registry(RegistryKind::CarbonCreditToken)?;
    let minter_address = ctx.registry_address(minter)?;
    if !ctx
        .registries()
        .has_role(RegistryKind::CarbonCreditToken, Role::Minter, &minter_address)?
    {
        return Err(LedgerError::MissingRole {
            account: minter_address,
            role: Role::Minter,
        });
    }
    mint_to(ctx, to, amount)
}

/// Moves tokens between accounts inside the current scope.
pub(crate) fn move_tokens(
    ctx: &Ctx<'_>,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> LedgerResult<()> {
    require_positive(amount)?;
    if to.is_zero() {
        return Err(ValidationError::InvalidAddress(to.to_string()).into());
    }
    let available = ctx.balances().balance_of(from)?;
    let remaining = available
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientBalance {
            account: *from,
            available,
            needed: amount,
        })?;
    if from != to {
        let credited = ctx
            .balances()
            .balance_of(to)?
            .checked_add(amount)
            .ok_or_else(|| LedgerError::rule("Token balance overflow"))?;
        ctx.balances().set_balance(from, remaining)?;
        ctx.balances().set_balance(to, credited)?;
    }
    ctx.emit(DomainEvent::Transfer {
        from: *from,
        to: *to,
        value: amount,
    })
}
