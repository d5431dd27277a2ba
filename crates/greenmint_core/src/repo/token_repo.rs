//! CarbonCredit token balances.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::repo::{address_to_db, amount_to_db, parse_amount, row_address, row_amount, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

pub trait TokenRepository {
    /// Balance of `account`; unknown accounts hold zero.
    fn balance_of(&self, account: &Address) -> RepoResult<Amount>;
    /// Writes an absolute balance. Zero balances remove the row.
    fn set_balance(&self, account: &Address, amount: Amount) -> RepoResult<()>;
    fn total_supply(&self) -> RepoResult<Amount>;
    fn holders(&self) -> RepoResult<Vec<(Address, Amount)>>;
}

pub struct SqliteTokenRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTokenRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TokenRepository for SqliteTokenRepository<'_> {
    fn balance_of(&self, account: &Address) -> RepoResult<Amount> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT amount FROM token_balances WHERE account = ?1;",
                [address_to_db(account)],
                |row| row.get(0),
            )
            .optional()?;
        match text {
            Some(text) => parse_amount(&text, "token_balances.amount"),
            None => Ok(0),
        }
    }

    fn set_balance(&self, account: &Address, amount: Amount) -> RepoResult<()> {
        if amount == 0 {
            self.conn.execute(
                "DELETE FROM token_balances WHERE account = ?1;",
                [address_to_db(account)],
            )?;
            return Ok(());
        }
        self.conn.execute(
            "INSERT INTO token_balances (account, amount) VALUES (?1, ?2)
             ON CONFLICT(account) DO UPDATE SET amount = excluded.amount;",
            params![address_to_db(account), amount_to_db(amount)],
        )?;
        Ok(())
    }

    fn total_supply(&self) -> RepoResult<Amount> {
        self.holders()?
            .into_iter()
            .try_fold(0 as Amount, |total, (_, amount)| total.checked_add(amount))
            .ok_or_else(|| RepoError::InvalidData("token supply overflows u128".to_string()))
    }

    fn holders(&self) -> RepoResult<Vec<(Address, Amount)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT account, amount FROM token_balances ORDER BY account ASC;")?;
        let mut rows = stmt.query([])?;
        let mut holders = Vec::new();
        while let Some(row) = rows.next()? {
            holders.push((
                row_address(row, "account")?,
                row_amount(row, "amount")?,
            ));
        }
        Ok(holders)
    }
}
