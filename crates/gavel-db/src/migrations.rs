use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'member',
            created_at  TEXT NOT NULL
        );

        -- pair_key is the canonical unordered pair: both participant ids
        -- sorted lexicographically, joined with ':'. The UNIQUE constraint
        -- is what makes conversation pairing race-safe.
        CREATE TABLE IF NOT EXISTS conversations (
            id               TEXT PRIMARY KEY,
            participant_a    TEXT NOT NULL REFERENCES users(id),
            participant_b    TEXT NOT NULL REFERENCES users(id),
            pair_key         TEXT NOT NULL UNIQUE,
            shared_key       BLOB NOT NULL,
            created_at       TEXT NOT NULL,
            last_message_at  TEXT NOT NULL
        );

        -- seq is assigned per conversation inside the insert transaction;
        -- (created_at, seq) gives a total order even when timestamps tie.
        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id),
            sender_id        TEXT NOT NULL REFERENCES users(id),
            content          BLOB NOT NULL,
            seq              INTEGER NOT NULL,
            is_read          INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL,
            UNIQUE(conversation_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, seq);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            href        TEXT NOT NULL,
            metadata    TEXT NOT NULL DEFAULT '{}',
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);

        -- Properties and bids are collaborator records: no CRUD surface
        -- here, but the bid trigger needs the owner and the floor bid.
        CREATE TABLE IF NOT EXISTS properties (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT REFERENCES users(id),
            title       TEXT NOT NULL,
            floor_bid   INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS property_bidders (
            property_id  TEXT NOT NULL REFERENCES properties(id),
            user_id      TEXT NOT NULL REFERENCES users(id),
            UNIQUE(property_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS bids (
            id           TEXT PRIMARY KEY,
            property_id  TEXT NOT NULL REFERENCES properties(id),
            bidder_id    TEXT NOT NULL REFERENCES users(id),
            amount       INTEGER NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bids_property
            ON bids(property_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
