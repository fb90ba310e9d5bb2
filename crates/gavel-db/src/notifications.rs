use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::models::NotificationRow;
use crate::{Database, StoreResult, now_ts};

/// Page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: i64 = 15;
/// Server-side ceiling, enforced regardless of the requested value.
pub const MAX_LIMIT: i64 = 50;

impl Database {
    /// Record a notification for a single recipient. `kind` is an open
    /// string tag so new event types need no schema change here.
    pub fn create_notification(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        body: &str,
        href: &str,
        metadata: &serde_json::Value,
    ) -> StoreResult<NotificationRow> {
        self.with_conn(|conn| {
            Ok(insert_notification(
                conn, user_id, kind, title, body, href, metadata,
            )?)
        })
    }

    /// Newest notifications first, capped at `MAX_LIMIT` no matter what
    /// the caller requested.
    pub fn list_notifications(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> StoreResult<Vec<NotificationRow>> {
        let effective = match limit {
            Some(n) if n > 0 => n.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, title, body, href, metadata, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![user_id, effective], map_notification)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: &str) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Mark the listed notifications read. Ids that do not belong to
    /// `user_id` are silently skipped rather than errored, so callers
    /// cannot probe for other users' notification ids.
    pub fn mark_notifications_read(&self, user_id: &str, ids: &[String]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..=ids.len() + 1).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "UPDATE notifications SET is_read = 1
                 WHERE user_id = ?1 AND is_read = 0 AND id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            for id in ids {
                params.push(id);
            }

            let changed = stmt.execute(params.as_slice())?;
            Ok(changed)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?;
            Ok(changed)
        })
    }
}

/// Connection-level insert shared with the bid trigger, which creates its
/// fanout notifications inside the same transaction as the bid itself.
pub(crate) fn insert_notification(
    conn: &Connection,
    user_id: &str,
    kind: &str,
    title: &str,
    body: &str,
    href: &str,
    metadata: &serde_json::Value,
) -> Result<NotificationRow, rusqlite::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_ts();
    let metadata = metadata.to_string();

    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, title, body, href, metadata, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        params![id, user_id, kind, title, body, href, metadata, now],
    )?;

    Ok(NotificationRow {
        id,
        user_id: user_id.to_string(),
        kind: kind.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        href: href.to_string(),
        metadata,
        is_read: false,
        created_at: now,
    })
}

fn map_notification(row: &Row<'_>) -> Result<NotificationRow, rusqlite::Error> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        href: row.get(5)?,
        metadata: row.get(6)?,
        is_read: row.get::<_, i64>(7)? != 0,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        for u in ["a", "b"] {
            db.create_user(u, &format!("user-{u}"), "hash", "member")
                .unwrap();
        }
        db
    }

    fn notify(db: &Database, user: &str, title: &str) -> NotificationRow {
        db.create_notification(
            user,
            "bid",
            title,
            "body",
            "/properties/p1",
            &serde_json::json!({"property_id": "p1"}),
        )
        .unwrap()
    }

    #[test]
    fn list_caps_at_max_limit() {
        let db = setup();
        for i in 0..60 {
            notify(&db, "a", &format!("n{i}"));
        }

        assert_eq!(db.list_notifications("a", Some(9999)).unwrap().len(), 50);
        assert_eq!(db.list_notifications("a", None).unwrap().len(), 15);
        assert_eq!(db.list_notifications("a", Some(5)).unwrap().len(), 5);
    }

    #[test]
    fn list_is_newest_first_and_per_user() {
        let db = setup();
        let first = notify(&db, "a", "first");
        let second = notify(&db, "a", "second");
        notify(&db, "b", "other user");

        let rows = db.list_notifications("a", Some(10)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, second.id);
        assert_eq!(rows[1].id, first.id);
    }

    #[test]
    fn mark_read_by_ids_ignores_foreign_ids() {
        let db = setup();
        let mine = notify(&db, "a", "mine");
        let theirs = notify(&db, "b", "theirs");

        let changed = db
            .mark_notifications_read("a", &[mine.id.clone(), theirs.id.clone()])
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(db.unread_notification_count("a").unwrap(), 0);
        // b's notification was not touched
        assert_eq!(db.unread_notification_count("b").unwrap(), 1);
    }

    #[test]
    fn mark_all_read_is_idempotent() {
        let db = setup();
        notify(&db, "a", "one");
        notify(&db, "a", "two");

        assert_eq!(db.mark_all_notifications_read("a").unwrap(), 2);
        assert_eq!(db.mark_all_notifications_read("a").unwrap(), 0);
        assert_eq!(db.unread_notification_count("a").unwrap(), 0);
    }

    #[test]
    fn metadata_roundtrips_as_json() {
        let db = setup();
        let meta = serde_json::json!({"property_id": "p9", "bid_id": "b3"});
        let row = db
            .create_notification("a", "bid", "t", "b", "/properties/p9", &meta)
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&row.metadata).unwrap();
        assert_eq!(parsed, meta);
    }
}
