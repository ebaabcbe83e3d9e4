//! v002 -- Half-point ratings and profile fields.
//!
//! Legacy deployments sometimes added these columns by hand, so each
//! `ADD COLUMN` only runs when the column is still missing.

use rusqlite::Connection;

use crate::schema::column_exists;

const ADDED_COLUMNS: [(&str, &str, &str); 3] = [
    ("votes", "rating", "ALTER TABLE votes ADD COLUMN rating REAL"),
    ("users", "student_id", "ALTER TABLE users ADD COLUMN student_id TEXT"),
    ("users", "avatar", "ALTER TABLE users ADD COLUMN avatar TEXT"),
];

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    for (table, column, ddl) in ADDED_COLUMNS {
        if column_exists(conn, table, column) {
            tracing::debug!(table, column, "column already present, skipping");
            continue;
        }
        conn.execute_batch(ddl)?;
    }
    Ok(())
}
