//! Payment splitter payees and received payments.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::payment::{Payee, PaymentRecord};
use crate::repo::{
    address_to_db, amount_to_db, row_address, row_amount, row_u64, u64_to_db, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};

pub trait PaymentRepository {
    fn insert_payee(&self, account: &Address, shares: u64, now: i64) -> RepoResult<()>;
    fn get_payee(&self, account: &Address) -> RepoResult<Option<Payee>>;
    fn list_payees(&self) -> RepoResult<Vec<Payee>>;
    fn set_released(&self, account: &Address, released: Amount) -> RepoResult<()>;
    fn insert_payment(
        &self,
        payer: &Address,
        amount: Amount,
        memo: &str,
        now: i64,
    ) -> RepoResult<i64>;
    fn list_payments(&self) -> RepoResult<Vec<PaymentRecord>>;
}

pub struct SqlitePaymentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePaymentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PaymentRepository for SqlitePaymentRepository<'_> {
    fn insert_payee(&self, account: &Address, shares: u64, now: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO payment_payees (account, shares, added_at) VALUES (?1, ?2, ?3);",
            params![
                address_to_db(account),
                u64_to_db(shares, "payment_payees.shares")?,
                now
            ],
        )?;
        Ok(())
    }

    fn get_payee(&self, account: &Address) -> RepoResult<Option<Payee>> {
        let mut stmt = self.conn.prepare(
            "SELECT account, shares, released FROM payment_payees WHERE account = ?1;",
        )?;
        let mut rows = stmt.query([address_to_db(account)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_payee_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_payees(&self) -> RepoResult<Vec<Payee>> {
        let mut stmt = self.conn.prepare(
            "SELECT account, shares, released FROM payment_payees
             ORDER BY added_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut payees = Vec::new();
        while let Some(row) = rows.next()? {
            payees.push(parse_payee_row(row)?);
        }
        Ok(payees)
    }

    fn set_released(&self, account: &Address, released: Amount) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE payment_payees SET released = ?1 WHERE account = ?2;",
            params![amount_to_db(released), address_to_db(account)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("payee", account));
        }
        Ok(())
    }

    fn insert_payment(
        &self,
        payer: &Address,
        amount: Amount,
        memo: &str,
        now: i64,
    ) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO payments (payer, amount, memo, paid_at) VALUES (?1, ?2, ?3, ?4);",
            params![address_to_db(payer), amount_to_db(amount), memo, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_payments(&self) -> RepoResult<Vec<PaymentRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, payer, amount, memo, paid_at FROM payments ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut payments = Vec::new();
        while let Some(row) = rows.next()? {
            payments.push(PaymentRecord {
                id: row.get("id")?,
                payer: row_address(row, "payer")?,
                amount: row_amount(row, "amount")?,
                memo: row.get("memo")?,
                paid_at: row.get("paid_at")?,
            });
        }
        Ok(payments)
    }
}

fn parse_payee_row(row: &Row<'_>) -> RepoResult<Payee> {
    Ok(Payee {
        account: row_address(row, "account")?,
        shares: row_u64(row, "shares")?,
        released: row_amount(row, "released")?,
    })
}
