//! Live-schema introspection.
//!
//! Answers "does this column exist right now?" against the open connection.
//! Any failure (unknown table, bad identifier, I/O) reads as "absent" so
//! callers degrade instead of erroring.

use rusqlite::{params, Connection, OptionalExtension};

/// Report whether `table.column` exists in the live schema.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let found = conn
        .query_row(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, column],
            |_| Ok(()),
        )
        .optional();

    match found {
        Ok(hit) => hit.is_some(),
        Err(e) => {
            tracing::debug!(table, column, error = %e, "column lookup failed, treating as absent");
            false
        }
    }
}
