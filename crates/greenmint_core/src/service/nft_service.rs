//! NFT reward registry: minting, approvals, transfers and vote delegation.
//!
//! # Invariants
//! - Token ids start at 1 and are never reused, burned tokens included.
//! - Every transfer clears the single-token approval.
//! - The first token an account receives self-delegates its votes unless it
//!   already chose a delegate.

use crate::model::address::Address;
use crate::model::event::DomainEvent;
use crate::model::nft::{
    resolve_token_uri, NftToken, TokenId, MAX_TOKEN_URI_CHARS, NFT_NAME, NFT_SYMBOL,
};
use crate::model::registry::{RegistryKind, Role};
use crate::model::{require_text, ValidationError};
use crate::repo::nft_repo::NftRepository;
use crate::service::access::require_role;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::{LedgerError, LedgerResult};

/// Longest accepted achievement description.
pub const MAX_NFT_DESCRIPTION_CHARS: usize = 1024;

pub struct NftService<'l> {
    ledger: &'l Ledger,
}

impl<'l> NftService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    pub fn name(&self) -> &'static str {
        NFT_NAME
    }

    pub fn symbol(&self) -> &'static str {
        NFT_SYMBOL
    }

    /// Mints a plain reward NFT. `ADMINISTRATOR_ROLE` only.
    pub fn mint_nft(
        &self,
        caller: &Address,
        recipient: &Address,
        token_uri: &str,
    ) -> LedgerResult<TokenId> {
        self.ledger.write("nft_mint", |ctx| {
            require_role(ctx, RegistryKind::NftReward, Role::Administrator, caller)?;
            mint(ctx, recipient, token_uri, "", 0)
        })
    }

    /// Mints an NFT carrying achievement data. `ADMINISTRATOR_ROLE` only.
    pub fn mint_reward(
        &self,
        caller: &Address,
        recipient: &Address,
        token_uri: &str,
        description: &str,
        achievement_type: u32,
    ) -> LedgerResult<TokenId> {
        self.ledger.write("nft_mint_reward", |ctx| {
            require_role(ctx, RegistryKind::NftReward, Role::Administrator, caller)?;
            mint(ctx, recipient, token_uri, description, achievement_type)
        })
    }

    /// Stored URI resolved against the configured base URI.
    pub fn token_uri(&self, id: TokenId) -> LedgerResult<String> {
        self.ledger.read(|ctx| {
            let token = load(ctx, id)?;
            Ok(resolve_token_uri(&ctx.config().nft_base_uri, &token.token_uri))
        })
    }

    pub fn owner_of(&self, id: TokenId) -> LedgerResult<Address> {
        self.ledger.read(|ctx| Ok(load(ctx, id)?.owner))
    }

    pub fn get_nft_data(&self, id: TokenId) -> LedgerResult<NftToken> {
        self.ledger.read(|ctx| load(ctx, id))
    }

    pub fn balance_of(&self, owner: &Address) -> LedgerResult<u64> {
        self.ledger.read(|ctx| Ok(ctx.nfts().balance_of(owner)?))
    }

    /// Token ids held by `owner`, ascending.
    pub fn get_user_nfts(&self, owner: &Address) -> LedgerResult<Vec<TokenId>> {
        self.ledger.read(|ctx| Ok(ctx.nfts().tokens_of(owner)?))
    }

    pub fn total_supply(&self) -> LedgerResult<u64> {
        self.ledger.read(|ctx| Ok(ctx.nfts().total_supply()?))
    }

    pub fn get_approved(&self, id: TokenId) -> LedgerResult<Option<Address>> {
        self.ledger.read(|ctx| Ok(load(ctx, id)?.approved))
    }

    /// Approves `spender` for one token. Owner only.
    pub fn approve(&self, caller: &Address, spender: &Address, id: TokenId) -> LedgerResult<()> {
        self.ledger.write("nft_approve", |ctx| {
            let token = load(ctx, id)?;
            if token.owner != *caller {
                return Err(LedgerError::unauthorized(
                    "ERC721: approve caller is not token owner",
                ));
            }
            if *spender == token.owner {
                return Err(LedgerError::rule("ERC721: approval to current owner"));
            }
            ctx.nfts().set_approval(id, Some(spender))?;
            ctx.emit(DomainEvent::NftApproval {
                token_id: id,
                owner: token.owner,
                approved: *spender,
            })
        })
    }

    /// Transfers `id` from `from` to `to`. Owner or approved spender.
    pub fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        id: TokenId,
    ) -> LedgerResult<()> {
        self.ledger.write("nft_transfer", |ctx| {
            let token = load(ctx, id)?;
            require_owner_or_approved(&token, caller)?;
            if token.owner != *from {
                return Err(LedgerError::rule("ERC721: transfer from incorrect owner"));
            }
            transfer_token(ctx, id, from, to)
        })
    }

    /// Burns `id`. Owner or approved spender.
    pub fn burn(&self, caller: &Address, id: TokenId) -> LedgerResult<()> {
        self.ledger.write("nft_burn", |ctx| {
            let token = load(ctx, id)?;
            require_owner_or_approved(&token, caller)?;
            ctx.nfts().mark_burned(id)?;
            ctx.emit(DomainEvent::NftTransfer {
                token_id: id,
                from: token.owner,
                to: Address::ZERO,
            })
        })
    }

    /// Delegates the caller's votes to `delegatee`.
    pub fn delegate(&self, caller: &Address, delegatee: &Address) -> LedgerResult<()> {
        self.ledger.write("nft_delegate", |ctx| {
            ctx.registry(RegistryKind::NftReward)?;
            let previous = ctx.nfts().get_delegate(caller)?;
            ctx.nfts().set_delegate(caller, delegatee)?;
            ctx.emit(DomainEvent::DelegateChanged {
                delegator: *caller,
                from_delegate: previous,
                to_delegate: *delegatee,
            })
        })
    }

    pub fn delegates(&self, account: &Address) -> LedgerResult<Option<Address>> {
        self.ledger.read(|ctx| Ok(ctx.nfts().get_delegate(account)?))
    }

    /// Live tokens whose holders delegate to `account`.
    pub fn get_votes(&self, account: &Address) -> LedgerResult<u64> {
        self.ledger.read(|ctx| Ok(ctx.nfts().votes_of(account)?))
    }

    /// Every live token carries one vote.
    pub fn total_votes(&self) -> LedgerResult<u64> {
        self.total_supply()
    }
}

pub(crate) fn load(ctx: &Ctx<'_>, id: TokenId) -> LedgerResult<NftToken> {
    ctx.nfts()
        .get_token(id)?
        .ok_or_else(|| LedgerError::not_found("nft", id))
}

fn require_owner_or_approved(token: &NftToken, caller: &Address) -> LedgerResult<()> {
    if token.owner == *caller || token.approved == Some(*caller) {
        return Ok(());
    }
    Err(LedgerError::unauthorized(
        "ERC721: caller is not token owner or approved",
    ))
}

fn mint(
    ctx: &Ctx<'_>,
    recipient: &Address,
    token_uri: &str,
    description: &str,
    achievement_type: u32,
) -> LedgerResult<TokenId> {
    if recipient.is_zero() {
        return Err(ValidationError::InvalidAddress(recipient.to_string()).into());
    }
    require_text("token_uri", token_uri, MAX_TOKEN_URI_CHARS)?;
    if description.chars().count() > MAX_NFT_DESCRIPTION_CHARS {
        return Err(ValidationError::TooLong {
            field: "description",
            max: MAX_NFT_DESCRIPTION_CHARS,
        }
        .into());
    }
    let id = ctx.nfts().insert_token(
        recipient,
        token_uri.trim(),
        description,
        achievement_type,
        ctx.now(),
    )?;
    ctx.emit(DomainEvent::NftTransfer {
        token_id: id,
        from: Address::ZERO,
        to: *recipient,
    })?;
    ctx.emit(DomainEvent::NftMinted {
        token_id: id,
        owner: *recipient,
        achievement_type,
    })?;
    self_delegate_if_unset(ctx, recipient)?;
    Ok(id)
}

fn self_delegate_if_unset(ctx: &Ctx<'_>, account: &Address) -> LedgerResult<()> {
    if ctx.nfts().get_delegate(account)?.is_some() {
        return Ok(());
    }
    ctx.nfts().set_delegate(account, account)?;
    ctx.emit(DomainEvent::DelegateChanged {
        delegator: *account,
        from_delegate: None,
        to_delegate: *account,
    })
}

/// Moves a token inside the current scope. Callers check authorization.
pub(crate) fn transfer_token(
    ctx: &Ctx<'_>,
    id: TokenId,
    from: &Address,
    to: &Address,
) -> LedgerResult<()> {
    if to.is_zero() {
        return Err(ValidationError::InvalidAddress(to.to_string()).into());
    }
    ctx.nfts().set_owner(id, to)?;
    ctx.emit(DomainEvent::NftTransfer {
        token_id: id,
        from: *from,
        to: *to,
    })?;
    self_delegate_if_unset(ctx, to)
}
