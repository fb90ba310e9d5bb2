use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use crate::models::{ConversationListRow, ConversationRow};
use crate::{Database, StoreError, StoreResult, now_ts};

/// Canonical unordered pair key: both ids sorted lexicographically and
/// joined with ':'. `pair_key(u, v) == pair_key(v, u)`, so the UNIQUE
/// constraint on the column enforces at most one conversation per pair.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

impl Database {
    pub fn find_conversation_by_pair(
        &self,
        a: &str,
        b: &str,
    ) -> StoreResult<Option<ConversationRow>> {
        let key = pair_key(a, b);
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, participant_a, participant_b, shared_key, created_at, last_message_at
                     FROM conversations WHERE pair_key = ?1",
                    [&key],
                    map_conversation,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Insert a new conversation for the pair. Fails with `PairExists`
    /// when another writer got there first; callers resolve that by
    /// re-reading the pair.
    pub fn create_conversation(
        &self,
        a: &str,
        b: &str,
        shared_key: &[u8],
    ) -> StoreResult<ConversationRow> {
        if a == b {
            return Err(StoreError::SelfConversation);
        }

        let id = Uuid::new_v4().to_string();
        let key = pair_key(a, b);
        let now = now_ts();

        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO conversations
                     (id, participant_a, participant_b, pair_key, shared_key, created_at, last_message_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, a, b, key, shared_key, now],
            );
            match result {
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(StoreError::PairExists);
                }
                other => other?,
            };

            Ok(ConversationRow {
                id: id.clone(),
                participant_a: a.to_string(),
                participant_b: b.to_string(),
                shared_key: shared_key.to_vec(),
                created_at: now.clone(),
                last_message_at: now.clone(),
            })
        })
    }

    /// Find the conversation for the pair or create it with the supplied
    /// key. Idempotent and symmetric in the two ids; the key is only used
    /// when this call actually creates the record. A concurrent creation
    /// surfaces as `PairExists` and is resolved by re-reading.
    pub fn get_or_create_conversation(
        &self,
        user_id: &str,
        other_id: &str,
        shared_key: &[u8],
    ) -> StoreResult<ConversationRow> {
        if user_id == other_id {
            return Err(StoreError::SelfConversation);
        }

        if let Some(existing) = self.find_conversation_by_pair(user_id, other_id)? {
            return Ok(existing);
        }

        match self.create_conversation(user_id, other_id, shared_key) {
            Err(StoreError::PairExists) => self
                .find_conversation_by_pair(user_id, other_id)?
                .ok_or(StoreError::NotFound),
            other => other,
        }
    }

    /// Fetch a conversation on behalf of one of its participants.
    /// A caller who is not a participant gets `NotFound`, the same as a
    /// missing id, so existence is never leaked.
    pub fn get_conversation_for(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> StoreResult<ConversationRow> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, participant_a, participant_b, shared_key, created_at, last_message_at
                     FROM conversations WHERE id = ?1",
                    [conversation_id],
                    map_conversation,
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;

            if !row.has_participant(caller_id) {
                return Err(StoreError::NotFound);
            }
            Ok(row)
        })
    }

    /// All conversations the user participates in, most recently active
    /// first, each with the other participant's summary and the number of
    /// their messages the user has not read yet.
    pub fn list_conversations_for(&self, user_id: &str) -> StoreResult<Vec<ConversationListRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.participant_a, c.participant_b, c.shared_key,
                        c.created_at, c.last_message_at,
                        u.id, u.username,
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.conversation_id = c.id
                            AND m.sender_id = u.id
                            AND m.is_read = 0) AS unread_count
                 FROM conversations c
                 JOIN users u ON u.id = CASE
                     WHEN c.participant_a = ?1 THEN c.participant_b
                     ELSE c.participant_a
                 END
                 WHERE c.participant_a = ?1 OR c.participant_b = ?1
                 ORDER BY c.last_message_at DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationListRow {
                        conversation: map_conversation(row)?,
                        other_id: row.get(6)?,
                        other_username: row.get(7)?,
                        unread_count: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn map_conversation(row: &Row<'_>) -> Result<ConversationRow, rusqlite::Error> {
    Ok(ConversationRow {
        id: row.get(0)?,
        participant_a: row.get(1)?,
        participant_b: row.get(2)?,
        shared_key: row.get(3)?,
        created_at: row.get(4)?,
        last_message_at: row.get(5)?,
    })
}
