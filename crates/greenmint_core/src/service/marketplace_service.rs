//! Marketplace: NFT listings settled in CCT, and backend-settled item
//! listings.
//!
//! # Invariants
//! - Active → Sold | Cancelled, once.
//! - An NFT sale moves CCT buyer → seller, the token seller → buyer, closes
//!   the listing and bumps both profile counters in one transaction.
//! - At most one active listing per token.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::DomainEvent;
use crate::model::listing::{Listing, ListingId, ListingItem, ListingStatus};
use crate::model::nft::TokenId;
use crate::model::registry::RegistryKind;
use crate::model::verification::MAX_IPFS_HASH_CHARS;
use crate::model::{require_text, ValidationError};
use crate::repo::listing_repo::ListingRepository;
use crate::repo::nft_repo::NftRepository;
use crate::repo::token_repo::TokenRepository;
use crate::service::access::require_backend;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::nft_service::{load as load_token, transfer_token};
use crate::service::profile_service::record_marketplace_activity;
use crate::service::token_service::move_tokens;
use crate::service::{LedgerError, LedgerResult};

const LENGTH_MISMATCH: &str = "Arrays length mismatch";

pub struct MarketplaceService<'l> {
    ledger: &'l Ledger,
}

impl<'l> MarketplaceService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Lists an owned NFT. The marketplace must be approved for the token.
    pub fn list_nft(
        &self,
        caller: &Address,
        token_id: TokenId,
        price: Amount,
    ) -> LedgerResult<ListingId> {
        self.ledger.write("marketplace_list_nft", |ctx| {
            let marketplace = ctx.registry_address(RegistryKind::Marketplace)?;
            require_price(price)?;
            let token = load_token(ctx, token_id)?;
            if token.owner != *caller {
                return Err(LedgerError::unauthorized("Not token owner"));
            }
            if token.approved != Some(marketplace) {
                return Err(LedgerError::rule("Marketplace not approved"));
            }
            if ctx.listings().active_listing_for_token(token_id)?.is_some() {
                return Err(LedgerError::rule("Token already listed"));
            }
            let id = ctx.listings().insert_listing(
                caller,
                &ListingItem::Nft { token_id },
                price,
                ctx.now(),
            )?;
            ctx.emit(DomainEvent::ListingCreated {
                id,
                seller: *caller,
                token_id: Some(token_id),
                price,
            })?;
            Ok(id)
        })
    }

    /// Buys an NFT listing with CCT.
    pub fn buy_nft(&self, caller: &Address, listing_id: ListingId) -> LedgerResult<Listing> {
        self.ledger.write("marketplace_buy_nft", |ctx| {
            let marketplace = ctx.registry_address(RegistryKind::Marketplace)?;
            let listing = load_active(ctx, listing_id)?;
            let ListingItem::Nft { token_id } = listing.item else {
                return Err(LedgerError::rule("Listing is settled by backend"));
            };
            if listing.seller == *caller {
                return Err(LedgerError::rule("Cannot buy own listing"));
            }
            let available = ctx.balances().balance_of(caller)?;
            if available < listing.price {
                return Err(LedgerError::InsufficientBalance {
                    account: *caller,
                    available,
                    needed: listing.price,
                });
            }
            // A burned token reads as missing and leaves the listing stale.
            let still_valid = ctx.nfts().get_token(token_id)?.is_some_and(|token| {
                token.owner == listing.seller && token.approved == Some(marketplace)
            });
            if !still_valid {
                return Err(LedgerError::rule("Listing is no longer valid"));
            }

            move_tokens(ctx, caller, &listing.seller, listing.price)?;
            transfer_token(ctx, token_id, &listing.seller, caller)?;
            settle(ctx, &listing, caller)
        })
    }

    /// Cancels an active listing. Seller only.
    pub fn cancel_listing(&self, caller: &Address, listing_id: ListingId) -> LedgerResult<()> {
        self.ledger.write("marketplace_cancel", |ctx| {
            ctx.registry(RegistryKind::Marketplace)?;
            let listing = load_active(ctx, listing_id)?;
            if listing.seller != *caller {
                return Err(LedgerError::unauthorized("Only seller can cancel"));
            }
            if !ctx.listings().close_listing(
                listing_id,
                ListingStatus::Cancelled,
                None,
                ctx.now(),
            )? {
                return Err(not_active());
            }
            ctx.emit(DomainEvent::ListingCancelled { id: listing_id })
        })
    }

    /// Lists off-ledger items on behalf of sellers. Backend only.
    pub fn list_items(
        &self,
        caller: &Address,
        sellers: &[Address],
        ipfs_hashes: &[String],
        prices: &[Amount],
    ) -> LedgerResult<Vec<ListingId>> {
        self.ledger.write("marketplace_list_items", |ctx| {
            require_backend(ctx, RegistryKind::Marketplace, caller, "Only backend can list")?;
            if sellers.len() != ipfs_hashes.len() || sellers.len() != prices.len() {
                return Err(LedgerError::rule(LENGTH_MISMATCH));
            }
            if sellers.is_empty() {
                return Err(ValidationError::EmptyField("sellers").into());
            }
            let mut ids = Vec::with_capacity(sellers.len());
            for ((seller, ipfs_hash), price) in sellers.iter().zip(ipfs_hashes).zip(prices) {
                require_text("ipfs_hash", ipfs_hash, MAX_IPFS_HASH_CHARS)?;
                require_price(*price)?;
                let item = ListingItem::Item {
                    ipfs_hash: ipfs_hash.trim().to_string(),
                };
                let id = ctx
                    .listings()
                    .insert_listing(seller, &item, *price, ctx.now())?;
                ctx.emit(DomainEvent::ListingCreated {
                    id,
                    seller: *seller,
                    token_id: None,
                    price: *price,
                })?;
                ids.push(id);
            }
            Ok(ids)
        })
    }

    /// Closes item listings as sold to `buyers`. Payment is settled
    /// off-ledger by the backend.
    pub fn buy_items(
        &self,
        caller: &Address,
        listing_ids: &[ListingId],
        buyers: &[Address],
    ) -> LedgerResult<()> {
        self.ledger.write("marketplace_buy_items", |ctx| {
            require_backend(ctx, RegistryKind::Marketplace, caller, "Only backend can buy")?;
            if listing_ids.len() != buyers.len() {
                return Err(LedgerError::rule(LENGTH_MISMATCH));
            }
            if listing_ids.is_empty() {
                return Err(ValidationError::EmptyField("listing_ids").into());
            }
            for (listing_id, buyer) in listing_ids.iter().zip(buyers) {
                let listing = load_active(ctx, *listing_id)?;
                if listing.token_id().is_some() {
                    return Err(LedgerError::rule("NFT listings are bought with buy_nft"));
                }
                if listing.seller == *buyer {
                    return Err(LedgerError::rule("Cannot buy own listing"));
                }
                settle(ctx, &listing, buyer)?;
            }
            Ok(())
        })
    }

    pub fn get_listing(&self, listing_id: ListingId) -> LedgerResult<Listing> {
        self.ledger.read(|ctx| load(ctx, listing_id))
    }

    pub fn list_active_listings(&self) -> LedgerResult<Vec<Listing>> {
        self.ledger.read(|ctx| Ok(ctx.listings().active_listings()?))
    }
}

fn require_price(price: Amount) -> Result<(), ValidationError> {
    if price == 0 {
        return Err(ValidationError::ZeroValue("price"));
    }
    Ok(())
}

fn not_active() -> LedgerError {
    LedgerError::InvalidState("Listing is not active".to_string())
}

fn load(ctx: &Ctx<'_>, listing_id: ListingId) -> LedgerResult<Listing> {
    ctx.listings()
        .get_listing(listing_id)?
        .ok_or_else(|| LedgerError::not_found("listing", listing_id))
}

fn load_active(ctx: &Ctx<'_>, listing_id: ListingId) -> LedgerResult<Listing> {
    let listing = load(ctx, listing_id)?;
    if !listing.is_active() {
        return Err(not_active());
    }
    Ok(listing)
}

fn settle(ctx: &Ctx<'_>, listing: &Listing, buyer: &Address) -> LedgerResult<Listing> {
    if !ctx
        .listings()
        .close_listing(listing.id, ListingStatus::Sold, Some(buyer), ctx.now())?
    {
        return Err(not_active());
    }
    record_marketplace_activity(ctx, &listing.seller, true)?;
    record_marketplace_activity(ctx, buyer, false)?;
    ctx.emit(DomainEvent::ListingSold {
        id: listing.id,
        buyer: *buyer,
        price: listing.price,
    })?;
    load(ctx, listing.id)
}
