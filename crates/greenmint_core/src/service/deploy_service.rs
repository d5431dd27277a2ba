//! Registry deployment and role administration.
//!
//! # Invariants
//! - Deployment happens once per ledger, in `RegistryKind::DEPLOY_ORDER`.
//! - A registry's dependency addresses are resolved from registries that
//!   were deployed before it in the same run.
//! - Role administration requires `DEFAULT_ADMIN_ROLE` on the target
//!   registry.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::{DomainEvent, LedgerEvent};
use crate::model::registry::{RegistryKind, RegistryRecord, Role};
use crate::repo::event_repo::{EventFilter, EventRepository};
use crate::repo::oracle_repo::OracleRepository;
use crate::repo::payment_repo::PaymentRepository;
use crate::repo::registry_repo::RegistryRepository;
use crate::service::access::require_role;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::{LedgerError, LedgerResult};
use std::collections::BTreeMap;

/// Registries that receive CCT minting rights, next to the backend.
const MINTING_REGISTRIES: [RegistryKind; 4] = [
    RegistryKind::Verification,
    RegistryKind::ChallengeManagement,
    RegistryKind::RewardPool,
    RegistryKind::UserOnboarding,
];

/// Operational role per registry, held by backend and deployer.
const OPERATOR_ROLES: [(RegistryKind, Role); 5] = [
    (RegistryKind::Verification, Role::Verifier),
    (RegistryKind::NftReward, Role::Administrator),
    (RegistryKind::ChallengeManagement, Role::Admin),
    (RegistryKind::RewardPool, Role::Admin),
    (RegistryKind::Oracle, Role::Oracle),
];

pub struct DeployService<'l> {
    ledger: &'l Ledger,
}

impl<'l> DeployService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Deploys every registry and wires roles, payees and the first price
    /// round. Returns records in deployment order.
    pub fn deploy(&self) -> LedgerResult<Vec<RegistryRecord>> {
        self.ledger.write("registry_deploy", |ctx| {
            if ctx.registries().registry_count()? > 0 {
                return Err(LedgerError::AlreadyDeployed);
            }
            let config = ctx.config();
            let deployer = config.deployer;
            let mut records = Vec::with_capacity(RegistryKind::DEPLOY_ORDER.len());
            let mut addresses: BTreeMap<RegistryKind, Address> = BTreeMap::new();

            for (index, kind) in RegistryKind::DEPLOY_ORDER.into_iter().enumerate() {
                let deploy_seq = index as u64 + 1;
                let mut dependencies = BTreeMap::new();
                for dependency in kind.dependencies() {
                    let address = addresses
                        .get(dependency)
                        .copied()
                        .ok_or(LedgerError::NotDeployed(*dependency))?;
                    dependencies.insert(*dependency, address);
                }
                let record = RegistryRecord {
                    kind,
                    address: Address::derive_registry(&deployer, deploy_seq),
                    backend: config.backend,
                    admin: deployer,
                    deploy_seq,
                    dependencies,
                    deployed_at: ctx.now(),
                };
                ctx.registries().insert_registry(&record)?;
                ctx.emit(DomainEvent::RegistryDeployed {
                    registry: kind,
                    address: record.address,
                    deploy_seq,
                })?;
                grant(ctx, kind, Role::DefaultAdmin, &deployer, &deployer)?;
                addresses.insert(kind, record.address);
                records.push(record);
            }

            grant(
                ctx,
                RegistryKind::CarbonCreditToken,
                Role::Minter,
                &config.backend,
                &deployer,
            )?;
            for kind in MINTING_REGISTRIES {
                let minter = addresses
                    .get(&kind)
                    .copied()
                    .ok_or(LedgerError::NotDeployed(kind))?;
                grant(
                    ctx,
                    RegistryKind::CarbonCreditToken,
                    Role::Minter,
                    &minter,
                    &deployer,
                )?;
            }
            for (kind, role) in OPERATOR_ROLES {
                grant(ctx, kind, role, &config.backend, &deployer)?;
                grant(ctx, kind, role, &deployer, &deployer)?;
            }

            let answer = Amount::from(config.oracle_initial_answer);
            let round_id = ctx
                .oracle()
                .insert_round(answer, config.oracle_decimals, ctx.now())?;
            ctx.emit(DomainEvent::AnswerUpdated { round_id, answer })?;

            for payee in &config.payees {
                ctx.payments()
                    .insert_payee(&payee.account, payee.shares, ctx.now())?;
                ctx.emit(DomainEvent::PayeeAdded {
                    account: payee.account,
                    shares: payee.shares,
                })?;
            }
            Ok(records)
        })
    }

    /// Deployed registries in deployment order; empty before `deploy`.
    pub fn deployment(&self) -> LedgerResult<Vec<RegistryRecord>> {
        self.ledger
            .read(|ctx| Ok(ctx.registries().list_registries()?))
    }

    pub fn is_deployed(&self) -> LedgerResult<bool> {
        self.ledger
            .read(|ctx| Ok(ctx.registries().registry_count()? > 0))
    }

    pub fn get(&self, kind: RegistryKind) -> LedgerResult<RegistryRecord> {
        self.ledger.read(|ctx| ctx.registry(kind))
    }

    pub fn address_of(&self, kind: RegistryKind) -> LedgerResult<Address> {
        self.ledger.read(|ctx| ctx.registry_address(kind))
    }

    /// Resolves a registry by its deployed address.
    pub fn find_by_address(&self, address: &Address) -> LedgerResult<Option<RegistryRecord>> {
        self.ledger
            .read(|ctx| Ok(ctx.registries().find_by_address(address)?))
    }

    /// Grants `role` on `registry`. Re-granting is a no-op without an event.
    pub fn grant_role(
        &self,
        caller: &Address,
        registry: RegistryKind,
        role: Role,
        account: &Address,
    ) -> LedgerResult<bool> {
        self.ledger.write("role_grant", |ctx| {
            require_role(ctx, registry, Role::DefaultAdmin, caller)?;
            grant(ctx, registry, role, account, caller)
        })
    }

    /// Revokes `role` on `registry`. Revoking a missing grant is a no-op.
    pub fn revoke_role(
        &self,
        caller: &Address,
        registry: RegistryKind,
        role: Role,
        account: &Address,
    ) -> LedgerResult<bool> {
        self.ledger.write("role_revoke", |ctx| {
            require_role(ctx, registry, Role::DefaultAdmin, caller)?;
            let revoked = ctx.registries().revoke_role(registry, role, account)?;
            if revoked {
                ctx.emit(DomainEvent::RoleRevoked {
                    registry,
                    role,
                    account: *account,
                    sender: *caller,
                })?;
            }
            Ok(revoked)
        })
    }

    pub fn has_role(
        &self,
        registry: RegistryKind,
        role: Role,
        account: &Address,
    ) -> LedgerResult<bool> {
        self.ledger.read(|ctx| {
            ctx.registry(registry)?;
            Ok(ctx.registries().has_role(registry, role, account)?)
        })
    }

    pub fn role_members(&self, registry: RegistryKind, role: Role) -> LedgerResult<Vec<Address>> {
        self.ledger.read(|ctx| {
            ctx.registry(registry)?;
            Ok(ctx.registries().role_members(registry, role)?)
        })
    }

    /// Committed events in sequence order. The page size is clamped.
    pub fn list_events(&self, filter: &EventFilter) -> LedgerResult<Vec<LedgerEvent>> {
        self.ledger.read(|ctx| Ok(ctx.events().list_events(filter)?))
    }

    /// Highest committed event sequence; 0 on an empty log.
    pub fn latest_event_seq(&self) -> LedgerResult<i64> {
        self.ledger.read(|ctx| Ok(ctx.events().latest_seq()?))
    }
}

fn grant(
    ctx: &Ctx<'_>,
    registry: RegistryKind,
    role: Role,
    account: &Address,
    sender: &Address,
) -> LedgerResult<bool> {
    let granted = ctx
        .registries()
        .grant_role(registry, role, account, sender, ctx.now())?;
    if granted {
        ctx.emit(DomainEvent::RoleGranted {
            registry,
            role,
            account: *account,
            sender: *sender,
        })?;
    }
    Ok(granted)
}
