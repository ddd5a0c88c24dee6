use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::discovery::db::{is_sql_name, DB_BUSY_TIMEOUT};

#[derive(Debug, Error)]
pub enum DbEditError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Refusing unsafe SQL name: {0}")]
    UnsafeName(String),
}

fn open(path: &Path) -> Result<Connection, DbEditError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(DB_BUSY_TIMEOUT)?;
    Ok(conn)
}

/// LIKE treats `%` and `_` as wildcards; discovered values (underscored
/// emails in particular) must match literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Delete rows whose column text contains the pattern, case-insensitively.
/// The pattern is matched literally, not as LIKE wildcards. Returns the
/// number of rows removed; zero is a legitimate outcome when a concurrent
/// writer got there first.
#[instrument(skip(pattern))]
pub fn delete_matching_rows(
    path: &Path,
    table: &str,
    column: &str,
    pattern: &str,
) -> Result<usize, DbEditError> {
    if !is_sql_name(table) {
        return Err(DbEditError::UnsafeName(table.to_string()));
    }
    if !is_sql_name(column) {
        return Err(DbEditError::UnsafeName(column.to_string()));
    }

    let conn = open(path)?;
    let sql = format!(
        "DELETE FROM \"{}\" WHERE \"{}\" LIKE ?1 ESCAPE '\\'",
        table, column
    );
    let deleted = conn.execute(&sql, [format!("%{}%", escape_like(pattern))])?;

    info!(
        path = %path.display(),
        table,
        column,
        deleted,
        "rows deleted"
    );
    Ok(deleted)
}

/// Delete rows whose column equals the value exactly. Used for account
/// usernames, where substring matching would over-delete.
#[instrument(skip(value))]
pub fn delete_exact_rows(
    path: &Path,
    table: &str,
    column: &str,
    value: &str,
) -> Result<usize, DbEditError> {
    if !is_sql_name(table) {
        return Err(DbEditError::UnsafeName(table.to_string()));
    }
    if !is_sql_name(column) {
        return Err(DbEditError::UnsafeName(column.to_string()));
    }

    let conn = open(path)?;
    let sql = format!("DELETE FROM \"{}\" WHERE \"{}\" = ?1", table, column);
    let deleted = conn.execute(&sql, [value])?;

    info!(
        path = %path.display(),
        table,
        column,
        deleted,
        "rows deleted"
    );
    Ok(deleted)
}

/// Reclaim space after deletions. Run once per database, after every delete
/// against it.
#[instrument]
pub fn vacuum(path: &Path) -> Result<(), DbEditError> {
    let conn = open(path)?;
    conn.execute_batch("VACUUM")?;
    debug!(path = %path.display(), "database vacuumed");
    Ok(())
}
