//! Verification queue: submission, batch decisions and rewarded approval.
//!
//! # Invariants
//! - Ids start at 1 and increase with every submission.
//! - Pending → Approved | Rejected, once. A batch containing an unknown or
//!   decided id changes nothing.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::DomainEvent;
use crate::model::registry::{RegistryKind, Role};
use crate::model::require_text;
use crate::model::verification::{
    Verification, VerificationId, VerificationStatus, MAX_IPFS_HASH_CHARS, MAX_REASON_CHARS,
};
use crate::model::ValidationError;
use crate::repo::verification_repo::{VerificationDecision, VerificationRepository};
use crate::service::access::{require_backend, require_backend_or_role};
use crate::service::ledger::{Ctx, Ledger};
use crate::service::token_service::mint_as_registry;
use crate::service::{LedgerError, LedgerResult};

const ONLY_BACKEND_APPROVE: &str = "Only backend can approve";
const ONLY_BACKEND_REJECT: &str = "Only backend can reject";

pub struct VerificationService<'l> {
    ledger: &'l Ledger,
}

impl<'l> VerificationService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Queues a verification for `user`. Backend only.
    pub fn submit_verification(
        &self,
        caller: &Address,
        user: &Address,
        activity_id: u64,
        ipfs_hash: &str,
    ) -> LedgerResult<VerificationId> {
        self.ledger.write("verification_submit", |ctx| {
            require_backend(
                ctx,
                RegistryKind::Verification,
                caller,
                "Only backend can submit",
            )?;
            submit(ctx, user, activity_id, ipfs_hash)
        })
    }

    /// Queues a verification for the caller.
    pub fn submit_own_verification(
        &self,
        caller: &Address,
        activity_id: u64,
        ipfs_hash: &str,
    ) -> LedgerResult<VerificationId> {
        self.ledger.write("verification_submit_own", |ctx| {
            ctx.registry(RegistryKind::Verification)?;
            submit(ctx, caller, activity_id, ipfs_hash)
        })
    }

    /// Approves every id in `ids`, all or nothing.
    pub fn approve_verifications(
        &self,
        caller: &Address,
        ids: &[VerificationId],
    ) -> LedgerResult<()> {
        self.ledger.write("verification_approve_batch", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::Verification,
                caller,
                Role::Verifier,
                ONLY_BACKEND_APPROVE,
            )?;
            require_batch(ids)?;
            for id in ids {
                approve(ctx, *id, caller, 0)?;
            }
            Ok(())
        })
    }

    /// Rejects every id in `ids` with the matching reason, all or nothing.
    pub fn reject_verifications(
        &self,
        caller: &Address,
        ids: &[VerificationId],
        reasons: &[String],
    ) -> LedgerResult<()> {
        self.ledger.write("verification_reject_batch", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::Verification,
                caller,
                Role::Verifier,
                ONLY_BACKEND_REJECT,
            )?;
            if ids.len() != reasons.len() {
                return Err(LedgerError::rule("Arrays length mismatch"));
            }
            require_batch(ids)?;
            for (id, reason) in ids.iter().zip(reasons) {
                reject(ctx, *id, caller, reason)?;
            }
            Ok(())
        })
    }

    /// Approves one verification and mints `reward` CCT to its user.
    pub fn verify_submission(
        &self,
        caller: &Address,
        id: VerificationId,
        reward: Amount,
    ) -> LedgerResult<Verification> {
        self.ledger.write("verification_verify", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::Verification,
                caller,
                Role::Verifier,
                ONLY_BACKEND_APPROVE,
            )?;
            let verification = approve(ctx, id, caller, reward)?;
            if reward > 0 {
                mint_as_registry(ctx, RegistryKind::Verification, &verification.user, reward)?;
            }
            Ok(verification)
        })
    }

    /// Rejects one verification.
    pub fn reject_submission(
        &self,
        caller: &Address,
        id: VerificationId,
        reason: &str,
    ) -> LedgerResult<Verification> {
        self.ledger.write("verification_reject", |ctx| {
            require_backend_or_role(
                ctx,
                RegistryKind::Verification,
                caller,
                Role::Verifier,
                ONLY_BACKEND_REJECT,
            )?;
            reject(ctx, id, caller, reason)
        })
    }

    pub fn get_verification(&self, id: VerificationId) -> LedgerResult<Verification> {
        self.ledger.read(|ctx| load(ctx, id))
    }

    pub fn verification_count(&self) -> LedgerResult<u64> {
        self.ledger
            .read(|ctx| Ok(ctx.verifications().verification_count()?))
    }

    /// Ids submitted for `user`, in submission order.
    pub fn get_user_verifications(&self, user: &Address) -> LedgerResult<Vec<VerificationId>> {
        self.ledger
            .read(|ctx| Ok(ctx.verifications().user_verification_ids(user)?))
    }

    pub fn list_verifications(
        &self,
        status: Option<VerificationStatus>,
    ) -> LedgerResult<Vec<Verification>> {
        self.ledger
            .read(|ctx| Ok(ctx.verifications().list_verifications(status)?))
    }
}

fn require_batch(ids: &[VerificationId]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::EmptyField("ids"));
    }
    Ok(())
}

fn submit(
    ctx: &Ctx<'_>,
    user: &Address,
    activity_id: u64,
    ipfs_hash: &str,
) -> LedgerResult<VerificationId> {
    require_text("ipfs_hash", ipfs_hash, MAX_IPFS_HASH_CHARS)?;
    let ipfs_hash = ipfs_hash.trim();
    let id = ctx
        .verifications()
        .insert_verification(user, activity_id, ipfs_hash, ctx.now())?;
    ctx.emit(DomainEvent::VerificationSubmitted {
        id,
        user: *user,
        ipfs_hash: ipfs_hash.to_string(),
    })?;
    Ok(id)
}

fn load(ctx: &Ctx<'_>, id: VerificationId) -> LedgerResult<Verification> {
    ctx.verifications()
        .get_verification(id)?
        .ok_or_else(|| LedgerError::not_found("verification", id))
}

fn decide(
    ctx: &Ctx<'_>,
    id: VerificationId,
    decision: &VerificationDecision<'_>,
) -> LedgerResult<Verification> {
    let current = load(ctx, id)?;
    if !current.status.can_transition_to(decision.status)
        || !ctx.verifications().decide_verification(id, decision)?
    {
        return Err(LedgerError::InvalidState(
            "Verification already processed".to_string(),
        ));
    }
    load(ctx, id)
}

fn approve(
    ctx: &Ctx<'_>,
    id: VerificationId,
    verifier: &Address,
    reward: Amount,
) -> LedgerResult<Verification> {
    let verification = decide(
        ctx,
        id,
        &VerificationDecision {
            status: VerificationStatus::Approved,
            verifier: *verifier,
            rejection_reason: None,
            reward,
            decided_at: ctx.now(),
        },
    )?;
    ctx.emit(DomainEvent::VerificationApproved {
        id,
        verifier: *verifier,
        reward,
    })?;
    Ok(verification)
}

fn reject(
    ctx: &Ctx<'_>,
    id: VerificationId,
    verifier: &Address,
    reason: &str,
) -> LedgerResult<Verification> {
    require_text("reason", reason, MAX_REASON_CHARS)?;
    let reason = reason.trim();
    let verification = decide(
        ctx,
        id,
        &VerificationDecision {
            status: VerificationStatus::Rejected,
            verifier: *verifier,
            rejection_reason: Some(reason),
            reward: 0,
            decided_at: ctx.now(),
        },
    )?;
    ctx.emit(DomainEvent::VerificationRejected {
        id,
        verifier: *verifier,
        reason: reason.to_string(),
    })?;
    Ok(verification)
}
