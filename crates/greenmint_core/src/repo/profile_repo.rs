//! User profiles and onboarding registrations.

use crate::model::address::Address;
use crate::model::profile::{Registration, UserProfile};
use crate::repo::{
    address_to_db, amount_to_db, bool_to_int, row_address, row_amount, row_bool, row_u64,
    u64_to_db, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const PROFILE_SELECT_SQL: &str = "SELECT
    account,
    name,
    email,
    car_model,
    fuel_consumption,
    total_carbon_saved,
    items_sold,
    items_bought,
    updated_at
FROM user_profiles";

pub trait ProfileRepository {
    fn get_profile(&self, account: &Address) -> RepoResult<Option<UserProfile>>;
    /// Inserts or fully replaces the profile row.
    fn save_profile(&self, profile: &UserProfile) -> RepoResult<()>;
    fn get_registration(&self, account: &Address) -> RepoResult<Option<Registration>>;
    fn insert_registration(&self, registration: &Registration) -> RepoResult<()>;
    fn mark_onboarded(&self, account: &Address) -> RepoResult<()>;
}

pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn get_profile(&self, account: &Address) -> RepoResult<Option<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE account = ?1;"))?;
        let mut rows = stmt.query([address_to_db(account)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_profile_row(row)?)),
            None => Ok(None),
        }
    }

    fn save_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO user_profiles (
                account,
                name,
                email,
                car_model,
                fuel_consumption,
                total_carbon_saved,
                items_sold,
                items_bought,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(account) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                car_model = excluded.car_model,
                fuel_consumption = excluded.fuel_consumption,
                total_carbon_saved = excluded.total_carbon_saved,
                items_sold = excluded.items_sold,
                items_bought = excluded.items_bought,
                updated_at = excluded.updated_at;",
            params![
                address_to_db(&profile.account),
                profile.name.as_deref(),
                profile.email.as_deref(),
                profile.car_model.as_str(),
                amount_to_db(profile.fuel_consumption),
                amount_to_db(profile.total_carbon_saved),
                u64_to_db(profile.marketplace_items_sold, "user_profiles.items_sold")?,
                u64_to_db(profile.marketplace_items_bought, "user_profiles.items_bought")?,
                profile.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_registration(&self, account: &Address) -> RepoResult<Option<Registration>> {
        let mut stmt = self.conn.prepare(
            "SELECT account, onboarded, registered_at FROM registered_users WHERE account = ?1;",
        )?;
        let mut rows = stmt.query([address_to_db(account)])?;
        match rows.next()? {
            Some(row) => Ok(Some(Registration {
                account: row_address(row, "account")?,
                onboarded: row_bool(row, "onboarded")?,
                registered_at: row.get("registered_at")?,
            })),
            None => Ok(None),
        }
    }

    fn insert_registration(&self, registration: &Registration) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO registered_users (account, onboarded, registered_at)
             VALUES (?1, ?2, ?3);",
            params![
                address_to_db(&registration.account),
                bool_to_int(registration.onboarded),
                registration.registered_at,
            ],
        )?;
        Ok(())
    }

    fn mark_onboarded(&self, account: &Address) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE registered_users SET onboarded = 1 WHERE account = ?1;",
            [address_to_db(account)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("registration", account));
        }
        Ok(())
    }
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<UserProfile> {
    Ok(UserProfile {
        account: row_address(row, "account")?,
        name: row.get("name")?,
        email: row.get("email")?,
        car_model: row.get("car_model")?,
        fuel_consumption: row_amount(row, "fuel_consumption")?,
        total_carbon_saved: row_amount(row, "total_carbon_saved")?,
        marketplace_items_sold: row_u64(row, "items_sold")?,
        marketplace_items_bought: row_u64(row, "items_bought")?,
        updated_at: row.get("updated_at")?,
    })
}
