//! Registry deployment records and role grants.
//!
//! # Invariants
//! - One row per `RegistryKind`; addresses are unique.
//! - `(registry, role, account)` grants are unique; re-granting is a no-op.

use crate::model::address::Address;
use crate::model::registry::{RegistryKind, RegistryRecord, Role};
use crate::repo::{address_to_db, parse_address, row_address, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

const REGISTRY_SELECT_SQL: &str = "SELECT
    kind,
    address,
    backend,
    admin,
    deploy_seq,
    dependencies,
    deployed_at
FROM registries";

pub trait RegistryRepository {
    fn insert_registry(&self, record: &RegistryRecord) -> RepoResult<()>;
    fn get_registry(&self, kind: RegistryKind) -> RepoResult<Option<RegistryRecord>>;
    fn find_by_address(&self, address: &Address) -> RepoResult<Option<RegistryRecord>>;
    fn list_registries(&self) -> RepoResult<Vec<RegistryRecord>>;
    fn registry_count(&self) -> RepoResult<u64>;
    /// Returns `true` when a new grant row was written.
    fn grant_role(
        &self,
        registry: RegistryKind,
        role: Role,
        account: &Address,
        granted_by: &Address,
        now: i64,
    ) -> RepoResult<bool>;
    /// Returns `true` when an existing grant was removed.
    fn revoke_role(&self, registry: RegistryKind, role: Role, account: &Address)
        -> RepoResult<bool>;
    fn has_role(&self, registry: RegistryKind, role: Role, account: &Address) -> RepoResult<bool>;
    fn role_members(&self, registry: RegistryKind, role: Role) -> RepoResult<Vec<Address>>;
}

pub struct SqliteRegistryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RegistryRepository for SqliteRegistryRepository<'_> {
    fn insert_registry(&self, record: &RegistryRecord) -> RepoResult<()> {
        let dependencies = serde_json::to_string(&dependencies_to_db(&record.dependencies))
            .map_err(|err| RepoError::InvalidData(format!("dependencies encode failed: {err}")))?;
        let deploy_seq = i64::try_from(record.deploy_seq).map_err(|_| {
            RepoError::InvalidData(format!("deploy_seq `{}` overflows", record.deploy_seq))
        })?;
        self.conn.execute(
            "INSERT INTO registries (
                kind,
                address,
                backend,
                admin,
                deploy_seq,
                dependencies,
                deployed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                record.kind.as_str(),
                address_to_db(&record.address),
                address_to_db(&record.backend),
                address_to_db(&record.admin),
                deploy_seq,
                dependencies,
                record.deployed_at,
            ],
        )?;
        Ok(())
    }

    fn get_registry(&self, kind: RegistryKind) -> RepoResult<Option<RegistryRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REGISTRY_SELECT_SQL} WHERE kind = ?1;"))?;
        let mut rows = stmt.query([kind.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_registry_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_address(&self, address: &Address) -> RepoResult<Option<RegistryRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REGISTRY_SELECT_SQL} WHERE address = ?1;"))?;
        let mut rows = stmt.query([address_to_db(address)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_registry_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_registries(&self) -> RepoResult<Vec<RegistryRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REGISTRY_SELECT_SQL} ORDER BY deploy_seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_registry_row(row)?);
        }
        Ok(records)
    }

    fn registry_count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM registries;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn grant_role(
        &self,
        registry: RegistryKind,
        role: Role,
        account: &Address,
        granted_by: &Address,
        now: i64,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO role_grants (registry, role, account, granted_by, granted_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                registry.as_str(),
                role.as_str(),
                address_to_db(account),
                address_to_db(granted_by),
                now,
            ],
        )?;
        Ok(changed > 0)
    }

    fn revoke_role(
        &self,
        registry: RegistryKind,
        role: Role,
        account: &Address,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM role_grants WHERE registry = ?1 AND role = ?2 AND account = ?3;",
            params![registry.as_str(), role.as_str(), address_to_db(account)],
        )?;
        Ok(changed > 0)
    }

    fn has_role(&self, registry: RegistryKind, role: Role, account: &Address) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM role_grants WHERE registry = ?1 AND role = ?2 AND account = ?3;",
                params![registry.as_str(), role.as_str(), address_to_db(account)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn role_members(&self, registry: RegistryKind, role: Role) -> RepoResult<Vec<Address>> {
        let mut stmt = self.conn.prepare(
            "SELECT account FROM role_grants
             WHERE registry = ?1 AND role = ?2
             ORDER BY granted_at ASC, account ASC;",
        )?;
        let mut rows = stmt.query(params![registry.as_str(), role.as_str()])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(row_address(row, "role_grants.account")?);
        }
        Ok(members)
    }
}

fn parse_registry_row(row: &Row<'_>) -> RepoResult<RegistryRecord> {
    let kind_text: String = row.get("kind")?;
    let kind = RegistryKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid registry kind `{kind_text}` in registries.kind"))
    })?;

    let dependencies_text: String = row.get("dependencies")?;
    let raw: BTreeMap<String, String> = serde_json::from_str(&dependencies_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid registries.dependencies JSON: {err}"))
    })?;
    let mut dependencies = BTreeMap::new();
    for (name, address) in raw {
        let dependency = RegistryKind::parse(&name).ok_or_else(|| {
            RepoError::InvalidData(format!("unknown dependency `{name}` in registries.dependencies"))
        })?;
        dependencies.insert(
            dependency,
            parse_address(&address, "registries.dependencies")?,
        );
    }

    let deploy_seq: i64 = row.get("deploy_seq")?;
    Ok(RegistryRecord {
        kind,
        address: row_address(row, "address")?,
        backend: row_address(row, "backend")?,
        admin: row_address(row, "admin")?,
        deploy_seq: u64::try_from(deploy_seq).map_err(|_| {
            RepoError::InvalidData(format!("invalid deploy_seq `{deploy_seq}`"))
        })?,
        dependencies,
        deployed_at: row.get("deployed_at")?,
    })
}

fn dependencies_to_db(dependencies: &BTreeMap<RegistryKind, Address>) -> BTreeMap<&'static str, String> {
    dependencies
        .iter()
        .map(|(kind, address)| (kind.as_str(), address.to_string()))
        .collect()
}
