use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::core::identifiers::{account_key_matches, id_key_matches, is_uuid_like, EMAIL_RE};
use crate::core::{IdentifierHit, IdentifierKind, TableHit};

/// Upper bound on rows inspected per table so one oversized history table
/// cannot stall a whole scan.
const ROW_SCAN_LIMIT: usize = 5000;

pub const DB_BUSY_TIMEOUT: Duration = Duration::from_millis(2000);

lazy_static! {
    static ref SQL_NAME_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Table and column names are only ever interpolated into SQL after passing
/// this check; anything else is treated as hostile and ignored.
pub fn is_sql_name(name: &str) -> bool {
    SQL_NAME_RE.is_match(name)
}

#[derive(Debug, Default)]
pub struct DbInspection {
    pub identifiers: Vec<IdentifierHit>,
    pub keyword_hits: Vec<TableHit>,
}

/// Read-only pass over one SQLite file: enumerate tables, then scan text
/// columns for the plugin keyword and identifier values. Never mutates.
pub fn inspect_database(path: &Path, keyword: &str) -> Result<DbInspection, rusqlite::Error> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    conn.busy_timeout(DB_BUSY_TIMEOUT)?;

    let mut inspection = DbInspection::default();
    let keyword_lower = keyword.to_lowercase();

    for table in list_tables(&conn)? {
        for column in text_columns(&conn, &table)? {
            scan_column(
                &conn,
                &table,
                &column,
                &keyword_lower,
                &mut inspection,
            )?;
        }
    }

    debug!(
        path = %path.display(),
        identifiers = inspection.identifiers.len(),
        keyword_tables = inspection.keyword_hits.len(),
        "database inspected"
    );

    Ok(inspection)
}

pub fn list_tables(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(Result::ok)
        .filter(|name| SQL_NAME_RE.is_match(name))
        .collect();
    Ok(names)
}

pub fn text_columns(conn: &Connection, table: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let decl: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
            Ok((name, decl))
        })?
        .filter_map(Result::ok)
        .filter(|(name, decl)| {
            let decl = decl.to_uppercase();
            SQL_NAME_RE.is_match(name)
                && (decl.is_empty()
                    || decl.contains("TEXT")
                    || decl.contains("CHAR")
                    || decl.contains("CLOB"))
        })
        .map(|(name, _)| name)
        .collect();
    Ok(columns)
}

fn scan_column(
    conn: &Connection,
    table: &str,
    column: &str,
    keyword_lower: &str,
    inspection: &mut DbInspection,
) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT \"{}\" FROM \"{}\" LIMIT {}",
        column, table, ROW_SCAN_LIMIT
    ))?;

    let location = format!("{}.{}", table, column);
    let mut keyword_rows = 0usize;

    let values = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
    for value in values.flatten().flatten() {
        if !keyword_lower.is_empty() && value.to_lowercase().contains(keyword_lower) {
            keyword_rows += 1;
        }

        for m in EMAIL_RE.find_iter(&value) {
            push_hit(
                inspection,
                IdentifierKind::Email,
                m.as_str().to_string(),
                &location,
            );
        }

        if id_key_matches(column) && is_uuid_like(&value) {
            push_hit(
                inspection,
                IdentifierKind::Uuid,
                value.trim().to_string(),
                &location,
            );
        } else if account_key_matches(column)
            && value.len() > 2
            && !value.contains('@')
            && !value.chars().all(|c| c.is_ascii_digit())
        {
            push_hit(inspection, IdentifierKind::Username, value.clone(), &location);
        }
    }

    if keyword_rows > 0 {
        inspection.keyword_hits.push(TableHit {
            table: table.to_string(),
            column: column.to_string(),
            row_count: keyword_rows,
        });
    }

    Ok(())
}

fn push_hit(inspection: &mut DbInspection, kind: IdentifierKind, value: String, location: &str) {
    let hit = IdentifierHit {
        kind,
        value,
        location: location.to_string(),
    };
    if !inspection.identifiers.iter().any(|h| *h == hit) {
        inspection.identifiers.push(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_db(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("state.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE items (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE accounts (id INTEGER PRIMARY KEY, email TEXT, username TEXT);
             INSERT INTO items VALUES ('a', 'contains augment text');
             INSERT INTO items VALUES ('b', 'clean');
             INSERT INTO accounts (email, username) VALUES ('user@example.com', 'alice');",
        )
        .unwrap();
        path
    }

    #[test]
    fn keyword_rows_are_counted_per_table_column() {
        let dir = TempDir::new().unwrap();
        let path = fixture_db(&dir);

        let inspection = inspect_database(&path, "augment").unwrap();
        let hit = inspection
            .keyword_hits
            .iter()
            .find(|h| h.table == "items" && h.column == "value")
            .unwrap();
        assert_eq!(hit.row_count, 1);
    }

    #[test]
    fn emails_and_usernames_are_extracted_with_locations() {
        let dir = TempDir::new().unwrap();
        let path = fixture_db(&dir);

        let inspection = inspect_database(&path, "augment").unwrap();
        let email = inspection
            .identifiers
            .iter()
            .find(|h| h.kind == IdentifierKind::Email)
            .unwrap();
        assert_eq!(email.value, "user@example.com");
        assert_eq!(email.location, "accounts.email");

        assert!(inspection
            .identifiers
            .iter()
            .any(|h| h.kind == IdentifierKind::Username && h.value == "alice"));
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.db");
        std::fs::write(&path, b"not a sqlite file at all").unwrap();

        assert!(inspect_database(&path, "augment").is_err());
    }
}
