//! Authorization guards evaluated before any registry mutation.
//!
//! Two styles exist side by side:
//! - backend guards compare the caller with the registry's trusted backend
//!   and fail with the registry-specific `Unauthorized` message;
//! - role guards check `role_grants` and fail with `MissingRole`.

use crate::model::address::Address;
use crate::model::registry::{RegistryKind, RegistryRecord, Role};
use crate::repo::registry_repo::RegistryRepository;
use crate::service::ledger::Ctx;
use crate::service::{LedgerError, LedgerResult};

/// Caller must be the registry backend.
pub(crate) fn require_backend(
    ctx: &Ctx<'_>,
    kind: RegistryKind,
    caller: &Address,
    message: &str,
) -> LedgerResult<RegistryRecord> {
    let record = ctx.registry(kind)?;
    if record.backend != *caller {
        return Err(LedgerError::unauthorized(message));
    }
    Ok(record)
}

/// Caller must be the registry backend or hold `role` on it.
pub(crate) fn require_backend_or_role(
    ctx: &Ctx<'_>,
    kind: RegistryKind,
    caller: &Address,
    role: Role,
    message: &str,
) -> LedgerResult<RegistryRecord> {
    let record = ctx.registry(kind)?;
    if record.backend == *caller || ctx.registries().has_role(kind, role, caller)? {
        return Ok(record);
    }
    Err(LedgerError::unauthorized(message))
}

/// Caller must be the registry backend or its deploying admin.
pub(crate) fn require_backend_or_admin(
    ctx: &Ctx<'_>,
    kind: RegistryKind,
    caller: &Address,
    message: &str,
) -> LedgerResult<RegistryRecord> {
    let record = ctx.registry(kind)?;
    if record.backend == *caller || record.admin == *caller {
        return Ok(record);
    }
    Err(LedgerError::unauthorized(message))
}

/// Caller must hold `role` on the registry.
pub(crate) fn require_role(
    ctx: &Ctx<'_>,
    kind: RegistryKind,
    role: Role,
    caller: &Address,
) -> LedgerResult<RegistryRecord> {
    let record = ctx.registry(kind)?;
    if !ctx.registries().has_role(kind, role, caller)? {
        return Err(LedgerError::MissingRole {
            account: *caller,
            role,
        });
    }
    Ok(record)
}
