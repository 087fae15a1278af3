//! SQLite-backed store.
//!
//! Ancestor chains and descendant subtrees are resolved in a single recursive
//! query each.

use std::{
    collections::BTreeSet,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};

use super::{SearchQuery, Store, StoreError};
use crate::domain::{
    Entry, EntryId, HierarchyPath, Lineage, NewEntry, NewRegulation, Regulation, RegulationId,
    Tagged,
};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS regulations (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL UNIQUE,
        meta_data TEXT NOT NULL,
        full_text TEXT NOT NULL,
        checksum TEXT NOT NULL,
        imported_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        regulation_id TEXT NOT NULL REFERENCES regulations(id),
        parent_id TEXT REFERENCES entries(id),
        level INTEGER NOT NULL,
        unit_number TEXT,
        content TEXT NOT NULL,
        levels TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_parent ON entries(parent_id);
    CREATE INDEX IF NOT EXISTS idx_entries_regulation ON entries(regulation_id, seq);
";

const ENTRY_COLUMNS: &str =
    "e.id, e.regulation_id, e.parent_id, e.level, e.unit_number, e.content, e.levels";

const REGULATION_COLUMNS: &str = "id, title, meta_data, full_text, checksum, imported_at";

/// A [`Store`] persisted in a SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot
    /// be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Creates a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// An entry row as stored, before its text columns are decoded.
struct EntryRow {
    id: String,
    regulation_id: String,
    parent_id: Option<String>,
    level: u32,
    unit_number: Option<String>,
    content: String,
    levels: String,
}

impl EntryRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            regulation_id: row.get(1)?,
            parent_id: row.get(2)?,
            level: row.get(3)?,
            unit_number: row.get(4)?,
            content: row.get(5)?,
            levels: row.get(6)?,
        })
    }
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("invalid {what} '{value}'"))
}

impl TryFrom<EntryRow> for Entry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let id = row.id.parse().map_err(|_| corrupt("entry id", &row.id))?;
        let regulation_id = row
            .regulation_id
            .parse()
            .map_err(|_| corrupt("regulation id", &row.regulation_id))?;
        let parent_id = row
            .parent_id
            .map(|parent| parent.parse().map_err(|_| corrupt("parent id", &parent)))
            .transpose()?;
        let levels = serde_json::from_str(&row.levels)
            .map_err(|_| corrupt("hierarchy path", &row.levels))?;

        Ok(Self {
            id,
            regulation_id,
            parent_id,
            level: row.level,
            unit_number: row.unit_number,
            content: row.content,
            hierarchy_path: HierarchyPath { levels },
        })
    }
}

/// A regulation row as stored, before its text columns are decoded.
struct RegulationRow {
    id: String,
    title: String,
    meta_data: String,
    full_text: String,
    checksum: String,
    imported_at: String,
}

impl RegulationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            meta_data: row.get(2)?,
            full_text: row.get(3)?,
            checksum: row.get(4)?,
            imported_at: row.get(5)?,
        })
    }
}

impl TryFrom<RegulationRow> for Regulation {
    type Error = StoreError;

    fn try_from(row: RegulationRow) -> Result<Self, Self::Error> {
        let id = row.id.parse().map_err(|_| corrupt("regulation id", &row.id))?;
        let imported_at = DateTime::parse_from_rfc3339(&row.imported_at)
            .map_err(|_| corrupt("import time", &row.imported_at))?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            title: row.title,
            meta_data: row.meta_data,
            full_text: row.full_text,
            checksum: row.checksum,
            imported_at,
        })
    }
}

fn read_tagged(row: &Row<'_>) -> rusqlite::Result<(EntryRow, usize)> {
    let depth: i64 = row.get(7)?;
    let depth =
        usize::try_from(depth).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(7, depth))?;
    Ok((EntryRow::read(row)?, depth))
}

fn decode_tagged(rows: Vec<(EntryRow, usize)>) -> Result<Vec<Tagged>, StoreError> {
    rows.into_iter()
        .map(|(row, depth)| {
            Ok(Tagged {
                depth,
                entry: Entry::try_from(row)?,
            })
        })
        .collect()
}

fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool, StoreError> {
    Ok(conn.query_row(sql, params![id], |row| row.get(0))?)
}

impl Store for SqliteStore {
    fn insert_regulation(&self, regulation: NewRegulation) -> Result<RegulationId, StoreError> {
        let conn = self.conn()?;
        let id = RegulationId::new();
        let inserted = conn.execute(
            "INSERT INTO regulations (id, title, meta_data, full_text, checksum, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                &regulation.title,
                &regulation.meta_data,
                &regulation.full_text,
                &regulation.checksum,
                regulation
                    .imported_at
                    .to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        );

        match inserted {
            Ok(_) => Ok(id),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateTitle(regulation.title))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn insert_entry(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        let conn = self.conn()?;

        let regulation_id = entry.regulation_id.to_string();
        if !exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM regulations WHERE id = ?1)",
            &regulation_id,
        )? {
            return Err(StoreError::MissingRegulation(entry.regulation_id));
        }
        if let Some(parent) = entry.parent_id {
            if !exists(
                &conn,
                "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1)",
                &parent.to_string(),
            )? {
                return Err(StoreError::MissingParent(parent));
            }
        }

        let levels = serde_json::to_string(&entry.hierarchy_path.levels)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let id = EntryId::new();
        conn.execute(
            "INSERT INTO entries (id, regulation_id, parent_id, level, unit_number, content, levels)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                regulation_id,
                entry.parent_id.map(|parent| parent.to_string()),
                entry.level,
                &entry.unit_number,
                &entry.content,
                levels,
            ],
        )?;
        Ok(id)
    }

    fn find_regulation(&self, title: &str) -> Result<Option<Regulation>, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {REGULATION_COLUMNS} FROM regulations WHERE title = ?1"),
            params![title],
            RegulationRow::read,
        )
        .optional()?
        .map(Regulation::try_from)
        .transpose()
    }

    fn titles(&self) -> Result<BTreeSet<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT title FROM regulations")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<String>>>()?;
        Ok(titles)
    }

    fn entries(&self, regulation: RegulationId) -> Result<Vec<Entry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.regulation_id = ?1 ORDER BY e.seq"
        ))?;
        let rows = stmt
            .query_map(params![regulation.to_string()], EntryRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    fn lineage(&self, id: EntryId) -> Result<Lineage, StoreError> {
        let conn = self.conn()?;
        let key = id.to_string();

        let mut roots = conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.id = ?1"))?
            .query_map(params![key], EntryRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if roots.len() != 1 {
            return Err(StoreError::RootCount {
                id,
                found: roots.len(),
            });
        }
        let entry = Entry::try_from(roots.remove(0))?;

        let ancestors = conn
            .prepare(&format!(
                "WITH RECURSIVE ancestors(id, depth) AS (
                     SELECT parent_id, 0 FROM entries WHERE id = ?1 AND parent_id IS NOT NULL
                     UNION ALL
                     SELECT e.parent_id, a.depth + 1
                     FROM entries e JOIN ancestors a ON e.id = a.id
                     WHERE e.parent_id IS NOT NULL
                 )
                 SELECT {ENTRY_COLUMNS}, a.depth
                 FROM ancestors a JOIN entries e ON e.id = a.id
                 ORDER BY a.depth DESC"
            ))?
            .query_map(params![key], read_tagged)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let descendants = conn
            .prepare(&format!(
                "WITH RECURSIVE descendants(id, depth) AS (
                     SELECT id, 0 FROM entries WHERE parent_id = ?1
                     UNION ALL
                     SELECT e.id, d.depth + 1
                     FROM entries e JOIN descendants d ON e.parent_id = d.id
                 )
                 SELECT {ENTRY_COLUMNS}, d.depth
                 FROM descendants d JOIN entries e ON e.id = d.id
                 ORDER BY d.depth, e.seq"
            ))?
            .query_map(params![key], read_tagged)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Lineage {
            entry,
            ancestors: decode_tagged(ancestors)?,
            descendants: decode_tagged(descendants)?,
        })
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<Entry>, StoreError> {
        let conn = self.conn()?;
        let rows = match query.regulation() {
            Some(regulation) => conn
                .prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.regulation_id = ?1 ORDER BY e.seq"
                ))?
                .query_map(params![regulation.to_string()], EntryRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => conn
                .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries e ORDER BY e.seq"))?
                .query_map([], EntryRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        let mut found = Vec::new();
        for row in rows {
            let entry = Entry::try_from(row)?;
            if query.matches(&entry) {
                found.push(entry);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests as shared;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn rejects_duplicate_titles() {
        shared::rejects_duplicate_titles(&store());
    }

    #[test]
    fn finds_regulations_by_title() {
        shared::finds_regulations_by_title(&store());
    }

    #[test]
    fn lists_entries_in_document_order() {
        shared::lists_entries_in_document_order(&store());
    }

    #[test]
    fn rejects_unknown_parent() {
        shared::rejects_unknown_parent(&store());
    }

    #[test]
    fn rejects_unknown_regulation() {
        shared::rejects_unknown_regulation(&store());
    }

    #[test]
    fn builds_depth_tagged_lineage() {
        shared::builds_depth_tagged_lineage(&store());
    }

    #[test]
    fn unknown_lineage_root_is_an_error() {
        shared::unknown_lineage_root_is_an_error(&store());
    }

    #[test]
    fn searches_content() {
        shared::searches_content(&store());
    }

    #[test]
    fn search_is_case_insensitive_on_request() {
        shared::search_is_case_insensitive_on_request(&store());
    }

    #[test]
    fn survives_reopening() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("regulations.db");

        let (reg, ids) = shared::seed(&SqliteStore::open(&path).unwrap());

        let reopened = SqliteStore::open(&path).unwrap();
        let regulation = reopened.find_regulation("民法").unwrap().unwrap();
        assert_eq!(regulation.id, reg);
        let entries = reopened.entries(reg).unwrap();
        assert_eq!(entries.len(), ids.len());
        assert_eq!(
            entries[2].hierarchy_path.levels,
            vec!["第一章", "第一節", "第 1 條"]
        );
        assert_eq!(entries[2].parent_id, Some(ids[1]));
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let store = store();
        let (_, ids) = shared::seed(&store);
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE entries SET levels = 'not json' WHERE id = ?1",
                params![ids[0].to_string()],
            )
            .unwrap();

        assert!(matches!(
            store.lineage(ids[0]),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn keeps_the_exact_import_time() {
        let store = store();
        let new = NewRegulation::from_source("民法".to_string(), String::new(), "修正日期：");
        let imported_at = new.imported_at;
        store.insert_regulation(new).unwrap();

        let found = store.find_regulation("民法").unwrap().unwrap();
        assert_eq!(found.imported_at, imported_at);
    }

    #[test]
    fn unreadable_import_time_is_corrupt() {
        let store = store();
        shared::seed(&store);
        store
            .conn()
            .unwrap()
            .execute("UPDATE regulations SET imported_at = 'yesterday'", [])
            .unwrap();

        assert!(matches!(
            store.find_regulation("民法"),
            Err(StoreError::Corrupt(message)) if message.contains("yesterday")
        ));
    }

    #[test]
    fn other_constraint_failures_are_not_duplicates() {
        let store = store();
        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER read_only BEFORE INSERT ON regulations
                 BEGIN SELECT RAISE(ABORT, 'read only'); END;",
            )
            .unwrap();

        let new = NewRegulation::from_source("民法".to_string(), String::new(), "修正日期：");
        let error = store.insert_regulation(new).unwrap_err();
        assert!(matches!(error, StoreError::Database(_)), "{error:?}");
    }
}
