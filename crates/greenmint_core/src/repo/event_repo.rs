//! Append-only ledger event log.
//!
//! # Invariants
//! - `seq` is assigned by SQLite `AUTOINCREMENT` and never reused.
//! - Rows are never updated or deleted.

use crate::model::event::{DomainEvent, LedgerEvent};
use crate::model::registry::RegistryKind;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

/// Default page size for event listings.
pub const DEFAULT_EVENT_LIMIT: u32 = 100;
/// Hard cap for event listings.
pub const MAX_EVENT_LIMIT: u32 = 1_000;

/// Event listing filter. Every field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub registry: Option<RegistryKind>,
    pub name: Option<String>,
    /// Only events with `seq` strictly greater than this value.
    pub after_seq: Option<i64>,
    pub limit: Option<u32>,
}

pub trait EventRepository {
    /// Appends one event and returns its sequence number.
    fn append_event(&self, event: &DomainEvent, now: i64) -> RepoResult<i64>;
    fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<LedgerEvent>>;
    fn latest_seq(&self) -> RepoResult<i64>;
}

pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn append_event(&self, event: &DomainEvent, now: i64) -> RepoResult<i64> {
        let payload = serde_json::to_string(event)
            .map_err(|err| RepoError::InvalidData(format!("event encode failed: {err}")))?;
        self.conn.execute(
            "INSERT INTO ledger_events (event_uuid, registry, name, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                Uuid::new_v4().to_string(),
                event.registry().as_str(),
                event.name(),
                payload,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<LedgerEvent>> {
        let mut sql = String::from(
            "SELECT seq, event_uuid, registry, name, payload, created_at
             FROM ledger_events WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(registry) = filter.registry {
            sql.push_str(" AND registry = ?");
            bind_values.push(Value::Text(registry.as_str().to_string()));
        }
        if let Some(name) = filter.name.as_deref() {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.to_string()));
        }
        if let Some(after_seq) = filter.after_seq {
            sql.push_str(" AND seq > ?");
            bind_values.push(Value::Integer(after_seq));
        }

        sql.push_str(" ORDER BY seq ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_event_limit(
            filter.limit,
        ))));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn latest_seq(&self) -> RepoResult<i64> {
        let seq: Option<i64> =
            self.conn
                .query_row("SELECT MAX(seq) FROM ledger_events;", [], |row| row.get(0))?;
        Ok(seq.unwrap_or(0))
    }
}

/// Clamps a requested page size to `1..=MAX_EVENT_LIMIT`.
pub fn normalize_event_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_EVENT_LIMIT,
        Some(value) => value.min(MAX_EVENT_LIMIT),
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<LedgerEvent> {
    let uuid_text: String = row.get("event_uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid `{uuid_text}` in ledger_events.event_uuid"
        ))
    })?;
    let registry_text: String = row.get("registry")?;
    let registry = RegistryKind::parse(&registry_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid registry `{registry_text}` in ledger_events.registry"
        ))
    })?;
    let payload_text: String = row.get("payload")?;
    let payload = serde_json::from_str(&payload_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid ledger_events.payload JSON: {err}"))
    })?;

    Ok(LedgerEvent {
        seq: row.get("seq")?,
        uuid,
        registry,
        name: row.get("name")?,
        payload,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::normalize_event_limit;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(normalize_event_limit(None), 100);
        assert_eq!(normalize_event_limit(Some(0)), 100);
        assert_eq!(normalize_event_limit(Some(5)), 5);
        assert_eq!(normalize_event_limit(Some(50_000)), 1_000);
    }
}
