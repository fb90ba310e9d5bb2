use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::models::MessageRow;
use crate::{Database, StoreError, StoreResult, now_ts};

impl Database {
    /// Append an opaque ciphertext message to a conversation. One
    /// transaction inserts the message and advances the conversation's
    /// `last_message_at`; a partially applied append is never observable.
    pub fn append_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &[u8],
    ) -> StoreResult<MessageRow> {
        if content.is_empty() {
            return Err(StoreError::EmptyContent);
        }

        let id = Uuid::new_v4().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let last_message_at = check_participant(&tx, conversation_id, sender_id)?;

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?1",
                [conversation_id],
                |row| row.get(0),
            )?;

            // Clamp to the conversation's high-water mark so created_at
            // never decreases even if the wall clock does; seq breaks ties.
            let mut created_at = now_ts();
            if created_at < last_message_at {
                created_at = last_message_at;
            }

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, seq, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![id, conversation_id, sender_id, content, seq, created_at],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
                params![created_at, conversation_id],
            )?;

            tx.commit()?;

            Ok(MessageRow {
                id: id.clone(),
                conversation_id: conversation_id.to_string(),
                sender_id: sender_id.to_string(),
                content: content.to_vec(),
                seq,
                is_read: false,
                created_at,
            })
        })
    }

    /// All messages of a conversation in insertion order, oldest first.
    pub fn list_messages(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> StoreResult<Vec<MessageRow>> {
        self.with_conn(|conn| {
            check_participant(conn, conversation_id, caller_id)?;

            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, content, seq, is_read, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, seq ASC",
            )?;

            let rows = stmt
                .query_map([conversation_id], map_message)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Mark everything the other participant sent as read. Idempotent:
    /// when nothing is unread this is a no-op success. Returns the number
    /// of messages transitioned.
    pub fn mark_messages_read(
        &self,
        conversation_id: &str,
        reader_id: &str,
    ) -> StoreResult<usize> {
        self.with_conn(|conn| {
            check_participant(conn, conversation_id, reader_id)?;

            let changed = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND sender_id <> ?2 AND is_read = 0",
                params![conversation_id, reader_id],
            )?;

            Ok(changed)
        })
    }
}

/// Verify the conversation exists and the user is one of its two
/// participants. Returns the conversation's `last_message_at` so the
/// append path gets it from the same lookup.
fn check_participant(
    conn: &Connection,
    conversation_id: &str,
    user_id: &str,
) -> StoreResult<String> {
    let row = conn
        .query_row(
            "SELECT participant_a, participant_b, last_message_at
             FROM conversations WHERE id = ?1",
            [conversation_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound)?;

    if row.0 != user_id && row.1 != user_id {
        return Err(StoreError::NotParticipant);
    }
    Ok(row.2)
}

fn map_message(row: &Row<'_>) -> Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        seq: row.get(4)?,
        is_read: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        for u in ["a", "b", "c"] {
            db.create_user(u, &format!("user-{u}"), "hash", "member")
                .unwrap();
        }
        let conv = db.get_or_create_conversation("a", "b", &[0u8; 32]).unwrap();
        (db, conv.id)
    }

    #[test]
    fn list_preserves_insertion_order() {
        let (db, conv) = setup();

        for i in 0..10u8 {
            let sender = if i % 2 == 0 { "a" } else { "b" };
            db.append_message(&conv, sender, &[i + 1]).unwrap();
        }

        let messages = db.list_messages(&conv, "a").unwrap();
        assert_eq!(messages.len(), 10);
        for (i, m) in messages.iter().enumerate() {
            assert_eq!(m.content, vec![i as u8 + 1]);
            assert_eq!(m.seq, i as i64 + 1);
        }
        // created_at is non-decreasing in insertion order
        for pair in messages.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn append_advances_last_message_at() {
        let (db, conv) = setup();
        let before = db.get_conversation_for(&conv, "a").unwrap();

        let msg = db.append_message(&conv, "a", b"x").unwrap();

        let after = db.get_conversation_for(&conv, "a").unwrap();
        assert_eq!(after.last_message_at, msg.created_at);
        assert!(after.last_message_at >= before.last_message_at);
    }

    #[test]
    fn empty_content_is_rejected() {
        let (db, conv) = setup();
        let err = db.append_message(&conv, "a", b"").unwrap_err();
        assert!(matches!(err, StoreError::EmptyContent));
        assert!(db.list_messages(&conv, "a").unwrap().is_empty());
    }

    #[test]
    fn content_is_stored_verbatim() {
        let (db, conv) = setup();
        // Arbitrary bytes incl. NUL and invalid UTF-8; the store must not care.
        let blob = vec![0u8, 159, 146, 150, 255, 0, 42];
        db.append_message(&conv, "b", &blob).unwrap();

        let messages = db.list_messages(&conv, "a").unwrap();
        assert_eq!(messages[0].content, blob);
    }

    #[test]
    fn mark_read_is_idempotent_and_scoped_to_other_sender() {
        let (db, conv) = setup();
        db.append_message(&conv, "a", b"from a 1").unwrap();
        db.append_message(&conv, "b", b"from b 1").unwrap();
        db.append_message(&conv, "b", b"from b 2").unwrap();

        // a reads: only b's two messages transition
        assert_eq!(db.mark_messages_read(&conv, "a").unwrap(), 2);
        // second call is a no-op success
        assert_eq!(db.mark_messages_read(&conv, "a").unwrap(), 0);

        // a's own message is still unread from b's perspective
        assert_eq!(db.mark_messages_read(&conv, "b").unwrap(), 1);
    }

    #[test]
    fn unread_count_reflects_mark_read() {
        let (db, conv) = setup();
        db.append_message(&conv, "b", b"one").unwrap();
        db.append_message(&conv, "b", b"two").unwrap();

        let unread = |user: &str| {
            db.list_conversations_for(user).unwrap()[0].unread_count
        };
        assert_eq!(unread("a"), 2);
        // own messages never count as unread for the sender
        assert_eq!(unread("b"), 0);

        db.mark_messages_read(&conv, "a").unwrap();
        assert_eq!(unread("a"), 0);

        // a message appended after the mark starts unread again
        db.append_message(&conv, "b", b"three").unwrap();
        assert_eq!(unread("a"), 1);
    }

    #[test]
    fn outsiders_are_rejected() {
        let (db, conv) = setup();
        db.append_message(&conv, "a", b"hello").unwrap();

        assert!(matches!(
            db.list_messages(&conv, "c").unwrap_err(),
            StoreError::NotParticipant
        ));
        assert!(matches!(
            db.append_message(&conv, "c", b"hi").unwrap_err(),
            StoreError::NotParticipant
        ));
        assert!(matches!(
            db.mark_messages_read(&conv, "c").unwrap_err(),
            StoreError::NotParticipant
        ));
        assert!(matches!(
            db.list_messages("missing", "a").unwrap_err(),
            StoreError::NotFound
        ));
    }
}
