use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::models::{BidRow, NotificationRow, PropertyRow};
use crate::notifications::insert_notification;
use crate::{Database, StoreError, StoreResult, now_ts};

impl Database {
    /// Seed a property record. Property management lives elsewhere; this
    /// exists so the bid trigger has an owner and a floor bid to work
    /// against.
    pub fn create_property(
        &self,
        owner_id: Option<&str>,
        title: &str,
        floor_bid: i64,
    ) -> StoreResult<PropertyRow> {
        let id = Uuid::new_v4().to_string();
        let now = now_ts();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO properties (id, owner_id, title, floor_bid, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, owner_id, title, floor_bid, now],
            )?;
            Ok(PropertyRow {
                id: id.clone(),
                owner_id: owner_id.map(str::to_string),
                title: title.to_string(),
                floor_bid,
                created_at: now.clone(),
            })
        })
    }

    /// Link a user as an eligible bidder on a property. Bids from
    /// unlinked users are rejected.
    pub fn link_bidder(&self, property_id: &str, user_id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO property_bidders (property_id, user_id) VALUES (?1, ?2)",
                params![property_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Record a bid and fan out its notifications in one transaction:
    /// one to the bidder, one to the property owner when there is one.
    /// Validation happens before anything is written, so a rejected bid
    /// leaves zero rows behind.
    pub fn place_bid(
        &self,
        property_id: &str,
        bidder_id: &str,
        amount: i64,
    ) -> StoreResult<(BidRow, Vec<NotificationRow>)> {
        let id = Uuid::new_v4().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let property = tx
                .query_row(
                    "SELECT id, owner_id, title, floor_bid, created_at FROM properties WHERE id = ?1",
                    [property_id],
                    |row| {
                        Ok(PropertyRow {
                            id: row.get(0)?,
                            owner_id: row.get(1)?,
                            title: row.get(2)?,
                            floor_bid: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let linked: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM property_bidders WHERE property_id = ?1 AND user_id = ?2",
                    params![property_id, bidder_id],
                    |row| row.get(0),
                )
                .optional()?;
            if linked.is_none() {
                return Err(StoreError::BidderNotLinked);
            }

            // Current bid = highest recorded bid, or the floor when none
            // exist. Equal amounts are rejected either way: a bid must be
            // strictly greater than the current bid.
            let max_bid: Option<i64> = tx.query_row(
                "SELECT MAX(amount) FROM bids WHERE property_id = ?1",
                [property_id],
                |row| row.get(0),
            )?;
            let current = max_bid.unwrap_or(property.floor_bid);
            if amount <= current {
                return Err(StoreError::BidRejected(format!(
                    "bid must be greater than the current bid of {}",
                    format_amount(current)
                )));
            }

            let now = now_ts();
            tx.execute(
                "INSERT INTO bids (id, property_id, bidder_id, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, property_id, bidder_id, amount, now],
            )?;

            let pretty = format_amount(amount);
            let href = format!("/properties/{property_id}");
            let metadata = serde_json::json!({
                "property_id": property_id,
                "bid_id": id,
            });

            let mut notifications = vec![insert_notification(
                &tx,
                bidder_id,
                "bid",
                &format!("Bid placed: {pretty}"),
                &format!("Your bid on {} was recorded.", property.title),
                &href,
                &metadata,
            )?];

            if let Some(owner_id) = &property.owner_id {
                notifications.push(insert_notification(
                    &tx,
                    owner_id,
                    "bid",
                    &format!("New bid: {pretty}"),
                    &format!("{} received a new bid.", property.title),
                    &href,
                    &metadata,
                )?);
            }

            tx.commit()?;

            Ok((
                BidRow {
                    id: id.clone(),
                    property_id: property_id.to_string(),
                    bidder_id: bidder_id.to_string(),
                    amount,
                    created_at: now,
                },
                notifications,
            ))
        })
    }
}

/// Group digits in threes: 1500 -> "1,500".
pub fn format_amount(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
