pub mod auth;
pub mod bids;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// Stored ids are written by this service and should always parse; a
/// corrupt row is logged and surfaced with a nil id rather than failing
/// the whole listing.
pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(value: &str, what: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Early rows may carry SQLite's "YYYY-MM-DD HH:MM:SS" format
            // without a timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, value, e);
            DateTime::default()
        })
}
