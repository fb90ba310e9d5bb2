use gavel_db::Database;

/// Fresh in-memory database with the given users registered.
pub fn database_with_users(users: &[&str]) -> Database {
    let db = Database::open_in_memory().expect("open in-memory database");
    for user in users {
        db.create_user(user, &format!("user-{user}"), "password-hash", "member")
            .expect("create user");
    }
    db
}
