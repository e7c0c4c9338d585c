//! Read side of the document store.
//!
//! An [`IndexSnapshot`] is an immutable view of one index file with a small
//! pool of read-only connections.  An [`IndexHandle`] owns the current
//! snapshot behind an `Arc` and can swap in a newer one on refresh; searches
//! that already cloned the old `Arc` finish against it undisturbed.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{MatchError, MatchResult};
use crate::query::builder::BooleanQuery;
use crate::store::compile::SqlCompiler;
use crate::store::schema;

// ---------------------------------------------------------------------------
// Index kinds
// ---------------------------------------------------------------------------

/// The four logical indices the engine reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Primary taxonomic index (checklist bank names).
    Primary,
    /// Secondary reference index used only for homonym arbitration.
    Reference,
    /// Common name to scientific name.
    Vernacular,
    /// Alternate identifier to canonical identifier.
    Identifier,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Primary,
        IndexKind::Reference,
        IndexKind::Vernacular,
        IndexKind::Identifier,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IndexKind::Primary => "cb",
            IndexKind::Reference => "irmng",
            IndexKind::Vernacular => "vernacular",
            IndexKind::Identifier => "id",
        }
    }

    /// File holding this index inside an index directory.
    pub fn path_in(self, index_dir: &Path) -> PathBuf {
        index_dir.join(format!("{}.sqlite", self.label()))
    }
}

// ---------------------------------------------------------------------------
// Documents and hits
// ---------------------------------------------------------------------------

/// A stored record: ordered field name to one or more values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    fields: IndexMap<String, Vec<String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Document::add`].
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.add(field, value);
        self
    }

    pub fn add(&mut self, field: &str, value: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// First value of `field`, trimmed, or `None` when absent or blank.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_owned(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }

    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreDoc {
    pub doc_id: i64,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopDocs {
    /// Every document matching the required clauses, not just those returned.
    pub total_hits: usize,
    pub score_docs: Vec<ScoreDoc>,
}

/// Query interface over one logical index.
pub trait SearchIndex: Send + Sync {
    fn label(&self) -> &str;

    fn search(&self, query: &BooleanQuery, max: usize) -> MatchResult<TopDocs>;

    fn fetch(&self, doc_id: i64) -> MatchResult<Document>;

    /// Search and fetch the returned documents in rank order.
    fn search_documents(&self, query: &BooleanQuery, max: usize) -> MatchResult<Vec<Document>> {
        let top = self.search(query, max)?;
        top.score_docs
            .iter()
            .map(|sd| self.fetch(sd.doc_id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Snapshot + connection pool
// ---------------------------------------------------------------------------

fn open_read_only(label: &str, path: &Path) -> MatchResult<Connection> {
    if !path.exists() {
        return Err(MatchError::unavailable(
            label,
            format!("index file {} does not exist", path.display()),
        ));
    }
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| MatchError::unavailable(label, e.to_string()))
}

pub struct IndexSnapshot {
    label: String,
    path: PathBuf,
    generation: i64,
    pool_size: usize,
    pool: Mutex<Vec<Connection>>,
}

impl IndexSnapshot {
    /// Open a snapshot of the index file at `path`.  The file must exist and
    /// carry the document-store schema.
    pub fn open(label: &str, path: &Path, pool_size: usize) -> MatchResult<Self> {
        let conn = open_read_only(label, path)?;
        Self::from_connection(label, path, conn, pool_size)
    }

    fn from_connection(
        label: &str,
        path: &Path,
        conn: Connection,
        pool_size: usize,
    ) -> MatchResult<Self> {
        if schema::get_schema_version(&conn) == 0 {
            return Err(MatchError::unavailable(
                label,
                format!("{} is not a name index", path.display()),
            ));
        }
        let generation = schema::get_generation(&conn);
        Ok(Self {
            label: label.to_string(),
            path: path.to_path_buf(),
            generation,
            pool_size: pool_size.max(1),
            pool: Mutex::new(vec![conn]),
        })
    }

    pub fn generation(&self) -> i64 {
        self.generation
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow a connection for the duration of one search.
    fn checkout(&self) -> MatchResult<PooledConnection<'_>> {
        let pooled = self.pool.lock().pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => open_read_only(&self.label, &self.path)?,
        };
        Ok(PooledConnection {
            conn: Some(conn),
            owner: self,
        })
    }
}

struct PooledConnection<'a> {
    conn: Option<Connection>,
    owner: &'a IndexSnapshot,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in Drop.
        self.conn.as_ref().expect("pooled connection already returned")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let mut pool = self.owner.pool.lock();
            if pool.len() < self.owner.pool_size {
                pool.push(conn);
            }
        }
    }
}

impl SearchIndex for IndexSnapshot {
    fn label(&self) -> &str {
        &self.label
    }

    fn search(&self, query: &BooleanQuery, max: usize) -> MatchResult<TopDocs> {
        let mut compiler = SqlCompiler::new();
        let count = compiler.compile_count(query, self.generation)?;
        let ranked = compiler.compile_search(query, self.generation, max)?;
        debug!(index = %self.label, query = %query, max, "index search");

        let conn = self.checkout()?;
        let total_hits: i64 = conn.query_row(
            &count.sql,
            rusqlite::params_from_iter(count.params.iter()),
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare_cached(&ranked.sql)?;
        let score_docs = stmt
            .query_map(rusqlite::params_from_iter(ranked.params.iter()), |row| {
                Ok(ScoreDoc {
                    doc_id: row.get(0)?,
                    score: row.get::<_, i64>(1)? as f64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TopDocs {
            total_hits: total_hits.max(0) as usize,
            score_docs,
        })
    }

    fn fetch(&self, doc_id: i64) -> MatchResult<Document> {
        let conn = self.checkout()?;
        let mut stmt = conn.prepare_cached(
            "SELECT field, value FROM fields WHERE doc_id = ?1 ORDER BY rowid;",
        )?;
        let mut doc = Document::new();
        let rows = stmt.query_map(rusqlite::params![doc_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (field, value) = row?;
            doc.add(&field, &value);
        }
        Ok(doc)
    }
}

// ---------------------------------------------------------------------------
// Handle with atomic snapshot swap
// ---------------------------------------------------------------------------

pub struct IndexHandle {
    kind: IndexKind,
    path: PathBuf,
    pool_size: usize,
    current: RwLock<Arc<IndexSnapshot>>,
}

impl IndexHandle {
    pub fn open(kind: IndexKind, index_dir: &Path, pool_size: usize) -> MatchResult<Self> {
        let path = kind.path_in(index_dir);
        let snapshot = IndexSnapshot::open(kind.label(), &path, pool_size)?;
        info!(
            index = kind.label(),
            path = %path.display(),
            generation = snapshot.generation(),
            "opened name index"
        );
        Ok(Self {
            kind,
            path,
            pool_size,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> i64 {
        self.current.read().generation()
    }

    /// Swap in a new snapshot if the file's generation moved on.  Returns
    /// whether a swap happened.
    pub fn refresh(&self) -> MatchResult<bool> {
        let probe = open_read_only(self.kind.label(), &self.path)?;
        let generation = schema::get_generation(&probe);
        if generation == self.generation() {
            return Ok(false);
        }
        let fresh = IndexSnapshot::from_connection(
            self.kind.label(),
            &self.path,
            probe,
            self.pool_size,
        )?;
        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, Arc::new(fresh))
        };
        info!(
            index = self.kind.label(),
            from = previous.generation(),
            to = generation,
            "refreshed index snapshot"
        );
        Ok(true)
    }
}
