/// Database row types — these map directly to SQLite rows.
/// Distinct from the gavel-types API models to keep the DB layer
/// independent; timestamps stay as stored strings until the API layer
/// parses them.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ConversationRow {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub shared_key: Vec<u8>,
    pub created_at: String,
    pub last_message_at: String,
}

impl ConversationRow {
    /// The participant that is not `user_id`. Callers must have verified
    /// membership first.
    pub fn other_participant(&self, user_id: &str) -> &str {
        if self.participant_a == user_id {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }
}

/// A conversation enriched for the list view: the other participant's
/// summary and how many of their messages the caller has not read.
pub struct ConversationListRow {
    pub conversation: ConversationRow,
    pub other_id: String,
    pub other_username: String,
    pub unread_count: i64,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: Vec<u8>,
    pub seq: i64,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub href: String,
    pub metadata: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct PropertyRow {
    pub id: String,
    pub owner_id: Option<String>,
    pub title: String,
    pub floor_bid: i64,
    pub created_at: String,
}

#[derive(Debug)]
pub struct BidRow {
    pub id: String,
    pub property_id: String,
    pub bidder_id: String,
    pub amount: i64,
    pub created_at: String,
}
