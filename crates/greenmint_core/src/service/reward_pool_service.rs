//! Reward pools: NFT custody and distribution to users.

use crate::model::address::Address;
use crate::model::event::DomainEvent;
use crate::model::nft::TokenId;
use crate::model::registry::{RegistryKind, Role};
use crate::model::ValidationError;
use crate::repo::reward_pool_repo::RewardPoolRepository;
use crate::service::access::require_backend_or_role;
use crate::service::ledger::Ledger;
use crate::service::nft_service::{load as load_token, transfer_token};
use crate::service::{LedgerError, LedgerResult};

pub struct RewardPoolService<'l> {
    ledger: &'l Ledger,
}

impl<'l> RewardPoolService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Moves the caller's tokens into pool custody.
    ///
    /// Each token must be owned by the caller and approved to the pool.
    pub fn deposit_nfts(
        &self,
        caller: &Address,
        pool_id: i64,
        token_ids: &[TokenId],
    ) -> LedgerResult<()> {
        self.ledger.write("reward_pool_deposit", |ctx| {
            let pool = require_backend_or_role(
                ctx,
                RegistryKind::RewardPool,
                caller,
                Role::Admin,
                "Only backend can deposit",
            )?;
            if token_ids.is_empty() {
                return Err(ValidationError::EmptyField("token_ids").into());
            }
            for token_id in token_ids {
                let token = load_token(ctx, *token_id)?;
                if token.owner != *caller {
                    return Err(LedgerError::unauthorized("Not token owner"));
                }
                if token.approved != Some(pool.address) {
                    return Err(LedgerError::rule("Pool not approved"));
                }
                transfer_token(ctx, *token_id, caller, &pool.address)?;
                ctx.pools()
                    .deposit(pool_id, *token_id, caller, ctx.now())?;
                ctx.emit(DomainEvent::NftDeposited {
                    pool_id,
                    token_id: *token_id,
                })?;
            }
            Ok(())
        })
    }

    /// Sends the lowest-id pooled token to `user`.
    pub fn distribute_reward(
        &self,
        caller: &Address,
        pool_id: i64,
        user: &Address,
    ) -> LedgerResult<TokenId> {
        self.ledger.write("reward_pool_distribute", |ctx| {
            let pool = require_backend_or_role(
                ctx,
                RegistryKind::RewardPool,
                caller,
                Role::Admin,
                "Only backend can distribute",
            )?;
            let token_id = ctx
                .pools()
                .next_undistributed(pool_id)?
                .ok_or_else(|| LedgerError::rule("Pool is empty"))?;
            transfer_token(ctx, token_id, &pool.address, user)?;
            ctx.pools()
                .mark_distributed(pool_id, token_id, user, ctx.now())?;
            ctx.emit(DomainEvent::RewardDistributed {
                pool_id,
                token_id,
                user: *user,
            })?;
            Ok(token_id)
        })
    }

    /// Undistributed token ids in the pool, ascending.
    pub fn pool_tokens(&self, pool_id: i64) -> LedgerResult<Vec<TokenId>> {
        self.ledger.read(|ctx| Ok(ctx.pools().pool_tokens(pool_id)?))
    }
}
