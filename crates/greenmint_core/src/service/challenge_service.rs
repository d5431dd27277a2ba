//! Environmental challenges: creation, joining, completion rewards.
//!
//! # Invariants
//! - A user joins a challenge at most once and completes it at most once.
//! - Completion rewards are minted through the registry's own minter grant.
//! - Deactivation is one-way.

use crate::model::address::Address;
use crate::model::challenge::{
    Challenge, ChallengeId, NewChallenge, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS,
};
use crate::model::event::DomainEvent;
use crate::model::registry::{RegistryKind, Role};
use crate::model::{require_text, ValidationError};
use crate::repo::challenge_repo::ChallengeRepository;
use crate::service::access::{require_backend_or_role, require_role};
use crate::service::ledger::{Ctx, Ledger};
use crate::service::token_service::mint_as_registry;
use crate::service::{LedgerError, LedgerResult};

pub struct ChallengeService<'l> {
    ledger: &'l Ledger,
}

impl<'l> ChallengeService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Opens a challenge starting now. Backend or `ADMIN_ROLE`.
    pub fn create_challenge(
        &self,
        caller: &Address,
        challenge: &NewChallenge,
    ) -> LedgerResult<ChallengeId> {
        self.ledger.write("challenge_create", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::ChallengeManagement,
                caller,
                Role::Admin,
                "Only backend can create challenge",
            )?;
            require_text("title", &challenge.title, MAX_TITLE_CHARS)?;
            if challenge.description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(ValidationError::TooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_CHARS,
                }
                .into());
            }
            if challenge.duration_secs <= 0 {
                return Err(ValidationError::ZeroValue("duration").into());
            }
            let id = ctx
                .challenges()
                .insert_challenge(challenge, ctx.now(), caller)?;
            let created = load(ctx, id)?;
            ctx.emit(DomainEvent::ChallengeCreated {
                id,
                reward: created.reward,
                end_at: created.end_at,
            })?;
            Ok(id)
        })
    }

    pub fn join_challenge(&self, caller: &Address, id: ChallengeId) -> LedgerResult<()> {
        self.ledger.write("challenge_join", |ctx| {
            let challenge = load(ctx, id)?;
            if !challenge.is_active {
                return Err(LedgerError::rule("Challenge is not active"));
            }
            if challenge.has_ended(ctx.now()) {
                return Err(LedgerError::rule("Challenge has ended"));
            }
            if ctx.challenges().is_participant(id, caller)? {
                return Err(LedgerError::rule("Already joined"));
            }
            if challenge.is_full() {
                return Err(LedgerError::rule("Challenge is full"));
            }
            ctx.challenges().add_participant(id, caller, ctx.now())?;
            ctx.emit(DomainEvent::ChallengeJoined { id, user: *caller })
        })
    }

    /// Marks `user` as having completed `id` and pays the reward.
    pub fn complete_challenge(
        &self,
        caller: &Address,
        id: ChallengeId,
        user: &Address,
    ) -> LedgerResult<()> {
        self.ledger.write("challenge_complete", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::ChallengeManagement,
                caller,
                Role::Admin,
                "Only backend can complete challenge",
            )?;
            let challenge = load(ctx, id)?;
            if !ctx.challenges().is_participant(id, user)? {
                return Err(LedgerError::rule("User has not joined challenge"));
            }
            if !ctx.challenges().mark_completed(id, user, ctx.now())? {
                return Err(LedgerError::rule("Challenge already completed"));
            }
            if challenge.reward > 0 {
                mint_as_registry(ctx, RegistryKind::ChallengeManagement, user, challenge.reward)?;
            }
            ctx.emit(DomainEvent::ChallengeCompleted {
                id,
                user: *user,
                reward: challenge.reward,
            })
        })
    }

    /// Closes a challenge for new joins. `ADMIN_ROLE` only.
    pub fn deactivate_challenge(&self, caller: &Address, id: ChallengeId) -> LedgerResult<()> {
        self.ledger.write("challenge_deactivate", |ctx| {
            require_role(ctx, RegistryKind::ChallengeManagement, Role::Admin, caller)?;
            load(ctx, id)?;
            if !ctx.challenges().deactivate(id)? {
                return Err(LedgerError::InvalidState(
                    "Challenge is not active".to_string(),
                ));
            }
            ctx.emit(DomainEvent::ChallengeDeactivated { id })
        })
    }

    pub fn get_challenge(&self, id: ChallengeId) -> LedgerResult<Challenge> {
        self.ledger.read(|ctx| load(ctx, id))
    }

    pub fn is_participant(&self, id: ChallengeId, user: &Address) -> LedgerResult<bool> {
        self.ledger
            .read(|ctx| Ok(ctx.challenges().is_participant(id, user)?))
    }

    pub fn has_completed_challenge(&self, id: ChallengeId, user: &Address) -> LedgerResult<bool> {
        self.ledger
            .read(|ctx| Ok(ctx.challenges().has_completed(id, user)?))
    }

    pub fn list_challenges(&self, active_only: bool) -> LedgerResult<Vec<Challenge>> {
        self.ledger
            .read(|ctx| Ok(ctx.challenges().list_challenges(active_only)?))
    }
}

fn load(ctx: &Ctx<'_>, id: ChallengeId) -> LedgerResult<Challenge> {
    ctx.challenges()
        .get_challenge(id)?
        .ok_or_else(|| LedgerError::not_found("challenge", id))
}
