use rusqlite::{Connection, OptionalExtension};

use crate::models::UserRow;
use crate::{Database, StoreResult, now_ts};

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, password_hash, role, now_ts()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, username, password, role, created_at FROM users WHERE username = ?1", username)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, username, password, role, created_at FROM users WHERE id = ?1", id)
        })
    }
}

fn query_user(conn: &Connection, sql: &str, param: &str) -> StoreResult<Option<UserRow>> {
    let row = conn
        .query_row(sql, [param], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                role: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}
