//! Minimal document writer for name index files.
//!
//! Building indices from source checklists happens elsewhere; this writer
//! only appends documents and publishes them as a new generation, which is
//! what fixtures, benchmarks and snapshot refresh need.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::debug;

use crate::errors::{MatchError, MatchResult};
use crate::store::index::Document;
use crate::store::schema;

pub struct IndexWriter {
    conn: Connection,
    path: PathBuf,
    in_transaction: bool,
    pending: usize,
    next_generation: i64,
}

impl IndexWriter {
    /// Create (or reuse) the index file at `path`, creating parent
    /// directories as needed.
    pub fn create(path: &Path) -> MatchResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            in_transaction: false,
            pending: 0,
            next_generation: 0,
        })
    }

    /// Open an existing index file for appending.
    pub fn open(path: &Path) -> MatchResult<Self> {
        if !path.exists() {
            return Err(MatchError::unavailable(
                &path.display().to_string(),
                "cannot append to a missing index",
            ));
        }
        Self::create(path)
    }

    fn begin(&mut self) -> MatchResult<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN IMMEDIATE;")?;
            self.in_transaction = true;
            self.next_generation = schema::get_generation(&self.conn) + 1;
        }
        Ok(())
    }

    /// Stage a document; it becomes visible to snapshots opened at or after
    /// the generation published by the next [`commit`](Self::commit).
    pub fn add_document(&mut self, doc: &Document) -> MatchResult<i64> {
        self.begin()?;
        self.conn.execute(
            "INSERT INTO documents(generation) VALUES (?1);",
            [self.next_generation],
        )?;
        let doc_id = self.conn.last_insert_rowid();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO fields(doc_id, field, value, norm) VALUES (?1, ?2, ?3, ?4);",
        )?;
        for (field, value) in doc.iter() {
            stmt.execute(rusqlite::params![
                doc_id,
                field,
                value,
                value.trim().to_lowercase()
            ])?;
        }
        self.pending += 1;
        Ok(doc_id)
    }

    /// Publish pending documents under a new generation number.
    pub fn commit(&mut self) -> MatchResult<i64> {
        self.begin()?;
        let generation = self.next_generation;
        schema::set_meta(&self.conn, "generation", &generation.to_string())?;
        self.conn.execute_batch("COMMIT;")?;
        self.in_transaction = false;
        debug!(
            path = %self.path.display(),
            documents = self.pending,
            generation,
            "committed index generation"
        );
        self.pending = 0;
        Ok(generation)
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        // Uncommitted documents are discarded.
        if self.in_transaction {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
    }
}
