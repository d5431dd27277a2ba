//! NFT-weighted governance.
//!
//! Counting mode is `support=bravo&quorum=for`. Proposal actions are
//! recorded, never executed against registries.
//!
//! # Invariants
//! - A ballot weighs the live tokens delegated to the voter that were minted
//!   at or before the proposal's `vote_start`.
//! - Each token counts at most once per proposal, whoever holds it when a
//!   later ballot is cast.

use crate::model::address::Address;
use crate::model::event::DomainEvent;
use crate::model::governance::{
    quorum_for_supply, Proposal, ProposalAction, ProposalId, ProposalState, VoteType,
    COUNTING_MODE, MAX_PROPOSAL_DESCRIPTION_CHARS,
};
use crate::model::registry::RegistryKind;
use crate::model::require_text;
use crate::repo::governance_repo::{GovernanceRepository, NewProposal};
use crate::repo::nft_repo::NftRepository;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::{LedgerError, LedgerResult};

pub struct GovernanceService<'l> {
    ledger: &'l Ledger,
}

impl<'l> GovernanceService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    pub fn counting_mode(&self) -> &'static str {
        COUNTING_MODE
    }

    pub fn voting_period(&self) -> i64 {
        self.ledger.config().governance_voting_period_secs
    }

    /// Votes required for a proposal created now.
    pub fn quorum(&self) -> LedgerResult<u64> {
        self.ledger.read(current_quorum)
    }

    /// Opens a proposal; voting starts immediately.
    pub fn propose(
        &self,
        caller: &Address,
        actions: &[ProposalAction],
        description: &str,
    ) -> LedgerResult<ProposalId> {
        self.ledger.write("governance_propose", |ctx| {
            ctx.registry(RegistryKind::Governance)?;
            require_text("description", description, MAX_PROPOSAL_DESCRIPTION_CHARS)?;
            let vote_end = ctx
                .now()
                .checked_add(ctx.config().governance_voting_period_secs)
                .ok_or_else(|| LedgerError::rule("Voting period overflow"))?;
            let id = ctx.proposals().insert_proposal(
                &NewProposal {
                    proposer: *caller,
                    description,
                    actions,
                    vote_start: ctx.now(),
                    vote_end,
                    quorum: current_quorum(ctx)?,
                },
                ctx.now(),
            )?;
            ctx.emit(DomainEvent::ProposalCreated {
                id,
                proposer: *caller,
                vote_end,
            })?;
            Ok(id)
        })
    }

    /// Casts the caller's ballot: 0 = against, 1 = for, 2 = abstain.
    ///
    /// Returns the weight counted. Tokens another ballot already counted on
    /// this proposal add nothing.
    pub fn cast_vote(&self, caller: &Address, id: ProposalId, support: u8) -> LedgerResult<u64> {
        self.ledger.write("governance_vote", |ctx| {
            let support = VoteType::from_u8(support)
                .ok_or_else(|| LedgerError::rule("Invalid vote type"))?;
            let proposal = load(ctx, id)?;
            if proposal.state(ctx.now()) != ProposalState::Active {
                return Err(LedgerError::rule("Proposal is not active"));
            }
            if ctx.proposals().get_vote(id, caller)?.is_some() {
                return Err(LedgerError::rule("Already voted"));
            }
            let eligible = ctx.nfts().vote_tokens_of(caller, proposal.vote_start)?;
            let weight = ctx.proposals().claim_vote_tokens(id, caller, &eligible)?;
            ctx.proposals()
                .record_vote(id, caller, support, weight, ctx.now())?;
            ctx.emit(DomainEvent::VoteCast {
                proposal_id: id,
                voter: *caller,
                support: support.as_u8(),
                weight,
            })?;
            Ok(weight)
        })
    }

    /// `(against, for, abstain)` tallies.
    pub fn proposal_votes(&self, id: ProposalId) -> LedgerResult<(u64, u64, u64)> {
        self.ledger.read(|ctx| {
            let proposal = load(ctx, id)?;
            Ok((
                proposal.against_votes,
                proposal.for_votes,
                proposal.abstain_votes,
            ))
        })
    }

    pub fn has_voted(&self, id: ProposalId, voter: &Address) -> LedgerResult<bool> {
        self.ledger.read(|ctx| {
            load(ctx, id)?;
            Ok(ctx.proposals().get_vote(id, voter)?.is_some())
        })
    }

    pub fn state(&self, id: ProposalId) -> LedgerResult<ProposalState> {
        self.ledger.read(|ctx| Ok(load(ctx, id)?.state(ctx.now())))
    }

    pub fn get_proposal(&self, id: ProposalId) -> LedgerResult<Proposal> {
        self.ledger.read(|ctx| load(ctx, id))
    }

    pub fn list_proposals(&self) -> LedgerResult<Vec<Proposal>> {
        self.ledger.read(|ctx| Ok(ctx.proposals().list_proposals()?))
    }

    /// Records execution of a succeeded proposal.
    pub fn execute(&self, caller: &Address, id: ProposalId) -> LedgerResult<()> {
        self.ledger.write("governance_execute", |ctx| {
            let proposal = load(ctx, id)?;
            if proposal.state(ctx.now()) != ProposalState::Succeeded {
                return Err(LedgerError::rule("Proposal not successful"));
            }
            if !ctx.proposals().mark_executed(id)? {
                return Err(LedgerError::InvalidState(
                    "Proposal already closed".to_string(),
                ));
            }
            ctx.emit(DomainEvent::ProposalExecuted {
                id,
                executor: *caller,
            })
        })
    }

    /// Cancels an active proposal. Proposer only.
    pub fn cancel(&self, caller: &Address, id: ProposalId) -> LedgerResult<()> {
        self.ledger.write("governance_cancel", |ctx| {
            let proposal = load(ctx, id)?;
            if proposal.proposer != *caller {
                return Err(LedgerError::unauthorized("Only proposer can cancel"));
            }
            if proposal.state(ctx.now()) != ProposalState::Active {
                return Err(LedgerError::rule("Proposal is not active"));
            }
            if !ctx.proposals().mark_canceled(id)? {
                return Err(LedgerError::InvalidState(
                    "Proposal already closed".to_string(),
                ));
            }
            ctx.emit(DomainEvent::ProposalCanceled { id })
        })
    }
}

fn current_quorum(ctx: &Ctx<'_>) -> LedgerResult<u64> {
    let supply = ctx.nfts().total_supply()?;
    Ok(quorum_for_supply(
        supply,
        ctx.config().governance_quorum_percent,
    ))
}

fn load(ctx: &Ctx<'_>, id: ProposalId) -> LedgerResult<Proposal> {
    ctx.proposals()
        .get_proposal(id)?
        .ok_or_else(|| LedgerError::not_found("proposal", id))
}
