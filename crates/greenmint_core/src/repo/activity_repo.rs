//! Carbon activities and tracked reductions.

use crate::model::activity::{ActivityId, CarbonActivity, NewActivity};
use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::repo::{
    address_to_db, amount_to_db, bool_to_int, parse_amount, row_address, row_amount, row_bool,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row, ToSql};

pub trait ActivityRepository {
    fn insert_activity(&self, activity: &NewActivity, now: i64) -> RepoResult<ActivityId>;
    fn user_activities(&self, user: &Address) -> RepoResult<Vec<CarbonActivity>>;
    fn insert_reduction(&self, user: &Address, amount: Amount, now: i64) -> RepoResult<i64>;
    /// Carbon from verified activities of `user`.
    fn verified_carbon(&self, user: &Address) -> RepoResult<Amount>;
    /// Sum of tracked reductions of `user`.
    fn tracked_reductions(&self, user: &Address) -> RepoResult<Amount>;
    /// Verified carbon plus tracked reductions across every user.
    fn total_carbon_reduction(&self) -> RepoResult<Amount>;
}

pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn sum_amounts(&self, sql: &str, params: &[&dyn ToSql], column: &str) -> RepoResult<Amount> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut total: Amount = 0;
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            total = total
                .checked_add(parse_amount(&text, column)?)
                .ok_or_else(|| RepoError::InvalidData(format!("{column} sum overflows u128")))?;
        }
        Ok(total)
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn insert_activity(&self, activity: &NewActivity, now: i64) -> RepoResult<ActivityId> {
        self.conn.execute(
            "INSERT INTO carbon_activities (
                user,
                carbon_saved,
                activity_type,
                recorded_at,
                verified,
                ipfs_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                address_to_db(&activity.user),
                amount_to_db(activity.carbon_saved),
                activity.activity_type.as_str(),
                now,
                bool_to_int(activity.verified),
                activity.ipfs_hash.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn user_activities(&self, user: &Address) -> RepoResult<Vec<CarbonActivity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user, carbon_saved, activity_type, recorded_at, verified, ipfs_hash
             FROM carbon_activities
             WHERE user = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([address_to_db(user)])?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn insert_reduction(&self, user: &Address, amount: Amount, now: i64) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO carbon_reductions (user, amount, tracked_at) VALUES (?1, ?2, ?3);",
            params![address_to_db(user), amount_to_db(amount), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn verified_carbon(&self, user: &Address) -> RepoResult<Amount> {
        let user = address_to_db(user);
        self.sum_amounts(
            "SELECT carbon_saved FROM carbon_activities WHERE user = ?1 AND verified = 1;",
            &[&user],
            "carbon_activities.carbon_saved",
        )
    }

    fn tracked_reductions(&self, user: &Address) -> RepoResult<Amount> {
        let user = address_to_db(user);
        self.sum_amounts(
            "SELECT amount FROM carbon_reductions WHERE user = ?1;",
            &[&user],
            "carbon_reductions.amount",
        )
    }

    fn total_carbon_reduction(&self) -> RepoResult<Amount> {
        let verified = self.sum_amounts(
            "SELECT carbon_saved FROM carbon_activities WHERE verified = 1;",
            &[],
            "carbon_activities.carbon_saved",
        )?;
        let tracked = self.sum_amounts(
            "SELECT amount FROM carbon_reductions;",
            &[],
            "carbon_reductions.amount",
        )?;
        verified
            .checked_add(tracked)
            .ok_or_else(|| RepoError::InvalidData("carbon total overflows u128".to_string()))
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<CarbonActivity> {
    Ok(CarbonActivity {
        id: row.get("id")?,
        user: row_address(row, "user")?,
        carbon_saved: row_amount(row, "carbon_saved")?,
        activity_type: row.get("activity_type")?,
        timestamp: row.get("recorded_at")?,
        verified: row_bool(row, "verified")?,
        ipfs_hash: row.get("ipfs_hash")?,
    })
}
