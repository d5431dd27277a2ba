//! Price feed rounds and carbon data requests.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::oracle::{CarbonDataRequest, PriceRound, RequestId, RoundId};
use crate::repo::{
    address_to_db, amount_to_db, parse_amount, row_address, row_amount, row_opt_address,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const REQUEST_SELECT_SQL: &str = "SELECT
    id,
    user,
    fee,
    requested_at,
    value,
    fulfilled_by,
    fulfilled_at
FROM carbon_data_requests";

pub trait OracleRepository {
    fn insert_round(&self, answer: Amount, decimals: u8, now: i64) -> RepoResult<RoundId>;
    fn latest_round(&self) -> RepoResult<Option<PriceRound>>;
    fn insert_request(&self, user: &Address, fee: Amount, now: i64) -> RepoResult<RequestId>;
    fn get_request(&self, id: RequestId) -> RepoResult<Option<CarbonDataRequest>>;
    /// Returns `false` when the request is missing or already fulfilled.
    fn fulfill_request(
        &self,
        id: RequestId,
        value: Amount,
        fulfilled_by: &Address,
        now: i64,
    ) -> RepoResult<bool>;
    /// Value of the most recently fulfilled request for `user`.
    fn latest_value(&self, user: &Address) -> RepoResult<Option<Amount>>;
}

pub struct SqliteOracleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOracleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl OracleRepository for SqliteOracleRepository<'_> {
    fn insert_round(&self, answer: Amount, decimals: u8, now: i64) -> RepoResult<RoundId> {
        self.conn.execute(
            "INSERT INTO oracle_rounds (answer, decimals, updated_at) VALUES (?1, ?2, ?3);",
            params![amount_to_db(answer), i64::from(decimals), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_round(&self) -> RepoResult<Option<PriceRound>> {
        let mut stmt = self.conn.prepare(
            "SELECT round_id, answer, decimals, updated_at FROM oracle_rounds
             ORDER BY round_id DESC LIMIT 1;",
        )?;
        let mut rows = stmt.query([])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let decimals: i64 = row.get("decimals")?;
        Ok(Some(PriceRound {
            round_id: row.get("round_id")?,
            answer: row_amount(row, "answer")?,
            decimals: u8::try_from(decimals).map_err(|_| {
                RepoError::InvalidData(format!("invalid decimals `{decimals}` in oracle_rounds"))
            })?,
            updated_at: row.get("updated_at")?,
        }))
    }

    fn insert_request(&self, user: &Address, fee: Amount, now: i64) -> RepoResult<RequestId> {
        self.conn.execute(
            "INSERT INTO carbon_data_requests (user, fee, requested_at) VALUES (?1, ?2, ?3);",
            params![address_to_db(user), amount_to_db(fee), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_request(&self, id: RequestId) -> RepoResult<Option<CarbonDataRequest>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REQUEST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_request_row(row)?)),
            None => Ok(None),
        }
    }

    fn fulfill_request(
        &self,
        id: RequestId,
        value: Amount,
        fulfilled_by: &Address,
        now: i64,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE carbon_data_requests
             SET value = ?1, fulfilled_by = ?2, fulfilled_at = ?3
             WHERE id = ?4 AND value IS NULL;",
            params![amount_to_db(value), address_to_db(fulfilled_by), now, id],
        )?;
        Ok(changed > 0)
    }

    fn latest_value(&self, user: &Address) -> RepoResult<Option<Amount>> {
        let mut stmt = self.conn.prepare(
            "SELECT value FROM carbon_data_requests
             WHERE user = ?1 AND value IS NOT NULL
             ORDER BY fulfilled_at DESC, id DESC
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([address_to_db(user)])?;
        match rows.next()? {
            Some(row) => {
                let text: String = row.get(0)?;
                Ok(Some(parse_amount(&text, "carbon_data_requests.value")?))
            }
            None => Ok(None),
        }
    }
}

fn parse_request_row(row: &Row<'_>) -> RepoResult<CarbonDataRequest> {
    let value = match row.get::<_, Option<String>>("value")? {
        Some(text) => Some(parse_amount(&text, "carbon_data_requests.value")?),
        None => None,
    };
    Ok(CarbonDataRequest {
        id: row.get("id")?,
        user: row_address(row, "user")?,
        fee: row_amount(row, "fee")?,
        requested_at: row.get("requested_at")?,
        value,
        fulfilled_by: row_opt_address(row, "fulfilled_by")?,
        fulfilled_at: row.get("fulfilled_at")?,
    })
}
