//! SQLite schema DDL, migrations, and the index field vocabulary.
//!
//! Every logical index (primary, reference, vernacular, identifier) is a
//! separate database file with the same document-store layout: a document
//! is a row in `documents`, and its field values are rows in `fields`.

use rusqlite::Connection;

use crate::errors::MatchResult;

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 2;

/// Base DDL applied by the v1 migration: 3 CREATE TABLE + 3 CREATE INDEX.
///
/// `documents.generation` is the commit that published the document;
/// readers only see documents up to the generation they were opened at.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS index_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS documents (
        doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
        generation INTEGER NOT NULL DEFAULT 0,
        added_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS fields (
        doc_id INTEGER NOT NULL REFERENCES documents(doc_id),
        field TEXT NOT NULL,
        value TEXT NOT NULL,
        norm TEXT NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS idx_fields_norm ON fields(field, norm);",
    "CREATE INDEX IF NOT EXISTS idx_fields_doc ON fields(doc_id, field);",
    "CREATE INDEX IF NOT EXISTS idx_documents_generation ON documents(generation);",
];

/// Index field names shared by the writer, the executor and the lookups.
pub mod field {
    pub const ID: &str = "id";
    pub const LSID: &str = "lsid";
    pub const ACCEPTED_LSID: &str = "acc_lsid";
    pub const IS_SYNONYM: &str = "is_synonym";
    /// Concepts added locally rather than by an authoritative checklist.
    pub const ALA: &str = "ala";
    pub const NAME: &str = "name";
    pub const AUTHOR: &str = "author";
    pub const RANK: &str = "rank";
    pub const RANK_ID: &str = "rank_id";

    pub const KINGDOM: &str = "kingdom";
    pub const PHYLUM: &str = "phylum";
    pub const CLASS: &str = "class";
    pub const ORDER: &str = "order";
    pub const FAMILY: &str = "family";
    pub const GENUS: &str = "genus";
    pub const SPECIES: &str = "species";
    pub const SPECIFIC: &str = "specific";
    pub const INFRA: &str = "infra";

    pub const PHRASE: &str = "phrase";
    pub const VOUCHER: &str = "voucher";

    pub const GENUS_EX: &str = "genus_ex";
    pub const SPECIES_EX: &str = "species_ex";
    pub const INFRA_EX: &str = "infra_ex";
    /// Stored in `infra_ex` for names without an infraspecific part.
    pub const NO_INFRA_SENTINEL: &str = "<null>";

    pub const KINGDOM_ID: &str = "kid";
    pub const PHYLUM_ID: &str = "pid";
    pub const CLASS_ID: &str = "cid";
    pub const ORDER_ID: &str = "oid";
    pub const FAMILY_ID: &str = "fid";
    pub const GENUS_ID: &str = "gid";
    pub const SPECIES_ID: &str = "sid";

    pub const COMMON_NAME: &str = "common";
    pub const REAL_LSID: &str = "reallsid";

    /// Value used by flag fields (`is_synonym`, `ala`).
    pub const TRUE: &str = "T";
}

/// Bring a new or existing index file up to [`SCHEMA_VERSION`].
pub fn init_schema(conn: &Connection) -> MatchResult<()> {
    migrate_schema(conn)
}

// ─── Migration framework ────────────────────────────────────────────────────

/// Run all pending migrations from the current stored version up to
/// [`SCHEMA_VERSION`].  Each step is wrapped in a SAVEPOINT so a failure
/// rolls back only that single step.
pub fn migrate_schema(conn: &Connection) -> MatchResult<()> {
    let mut current_version = get_schema_version(conn);

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT namematch_migrate_step;")?;

        let step_result = (|| -> MatchResult<()> {
            match next_version {
                1 => migrate_to_v1(conn)?,
                2 => migrate_to_v2(conn)?,
                _ => {}
            }
            set_meta(conn, "schema_version", &next_version.to_string())?;
            conn.execute_batch("RELEASE SAVEPOINT namematch_migrate_step;")?;
            Ok(())
        })();

        match step_result {
            Ok(()) => current_version = next_version,
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK TO SAVEPOINT namematch_migrate_step;");
                let _ = conn.execute_batch("RELEASE SAVEPOINT namematch_migrate_step;");
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Read the current schema version from `index_meta`.
/// Returns 0 when the key is absent or unparseable.
pub fn get_schema_version(conn: &Connection) -> i32 {
    get_meta(conn, "schema_version")
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Generation stamp written by every writer commit.  Missing means 0.
pub fn get_generation(conn: &Connection) -> i64 {
    get_meta(conn, "generation")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
}

pub(crate) fn get_meta(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT value FROM index_meta WHERE key = ?1;",
        rusqlite::params![key],
        |row| row.get(0),
    )
    .ok()
}

pub(crate) fn set_meta(conn: &Connection, key: &str, value: &str) -> MatchResult<()> {
    conn.execute(
        "INSERT INTO index_meta(key, value) VALUES(?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

// ─── Individual migration steps ─────────────────────────────────────────────

/// v0 -> v1: document store tables.
fn migrate_to_v1(conn: &Connection) -> MatchResult<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    Ok(())
}

/// v1 -> v2: numeric lookups on `rank_id` style fields.
fn migrate_to_v2(conn: &Connection) -> MatchResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_fields_field_value ON fields(field, value);",
    )?;
    Ok(())
}
