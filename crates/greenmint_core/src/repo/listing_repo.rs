//! Marketplace listings.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::listing::{Listing, ListingId, ListingItem, ListingStatus};
use crate::model::nft::TokenId;
use crate::repo::{
    address_to_db, amount_to_db, row_address, row_amount, row_opt_address, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LISTING_SELECT_SQL: &str = "SELECT
    id,
    seller,
    token_id,
    item_hash,
    price,
    status,
    buyer,
    listed_at,
    closed_at
FROM marketplace_listings";

pub trait ListingRepository {
    fn insert_listing(
        &self,
        seller: &Address,
        item: &ListingItem,
        price: Amount,
        now: i64,
    ) -> RepoResult<ListingId>;
    fn get_listing(&self, id: ListingId) -> RepoResult<Option<Listing>>;
    /// Moves an active listing to `status`. Returns `false` if it was not active.
    fn close_listing(
        &self,
        id: ListingId,
        status: ListingStatus,
        buyer: Option<&Address>,
        now: i64,
    ) -> RepoResult<bool>;
    fn active_listings(&self) -> RepoResult<Vec<Listing>>;
    fn active_listing_for_token(&self, token_id: TokenId) -> RepoResult<Option<ListingId>>;
}

pub struct SqliteListingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ListingRepository for SqliteListingRepository<'_> {
    fn insert_listing(
        &self,
        seller: &Address,
        item: &ListingItem,
        price: Amount,
        now: i64,
    ) -> RepoResult<ListingId> {
        let (token_id, item_hash) = match item {
            ListingItem::Nft { token_id } => (Some(*token_id), None),
            ListingItem::Item { ipfs_hash } => (None, Some(ipfs_hash.as_str())),
        };
        self.conn.execute(
            "INSERT INTO marketplace_listings (seller, token_id, item_hash, price, status, listed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                address_to_db(seller),
                token_id,
                item_hash,
                amount_to_db(price),
                ListingStatus::Active.as_str(),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_listing(&self, id: ListingId) -> RepoResult<Option<Listing>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LISTING_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_listing_row(row)?)),
            None => Ok(None),
        }
    }

    fn close_listing(
        &self,
        id: ListingId,
        status: ListingStatus,
        buyer: Option<&Address>,
        now: i64,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE marketplace_listings
             SET status = ?1, buyer = ?2, closed_at = ?3
             WHERE id = ?4 AND status = 'active';",
            params![status.as_str(), buyer.map(address_to_db), now, id],
        )?;
        Ok(changed > 0)
    }

    fn active_listings(&self) -> RepoResult<Vec<Listing>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LISTING_SELECT_SQL} WHERE status = 'active' ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut listings = Vec::new();
        while let Some(row) = rows.next()? {
            listings.push(parse_listing_row(row)?);
        }
        Ok(listings)
    }

    fn active_listing_for_token(&self, token_id: TokenId) -> RepoResult<Option<ListingId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM marketplace_listings
                 WHERE token_id = ?1 AND status = 'active';",
                [token_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }
}

fn parse_listing_row(row: &Row<'_>) -> RepoResult<Listing> {
    let id: i64 = row.get("id")?;
    let token_id: Option<i64> = row.get("token_id")?;
    let item_hash: Option<String> = row.get("item_hash")?;
    let item = match (token_id, item_hash) {
        (Some(token_id), None) => ListingItem::Nft { token_id },
        (None, Some(ipfs_hash)) => ListingItem::Item { ipfs_hash },
        _ => {
            return Err(RepoError::InvalidData(format!(
                "listing {id} must reference exactly one of token_id/item_hash"
            )));
        }
    };
    let status_text: String = row.get("status")?;
    let status = ListingStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in marketplace_listings.status"
        ))
    })?;

    Ok(Listing {
        id,
        seller: row_address(row, "seller")?,
        item,
        price: row_amount(row, "price")?,
        status,
        buyer: row_opt_address(row, "buyer")?,
        listed_at: row.get("listed_at")?,
        closed_at: row.get("closed_at")?,
    })
}
