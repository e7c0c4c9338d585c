//! SQLite-backed name indices: schema, query compilation, snapshots and writer.

pub mod compile;
pub mod index;
pub mod schema;
pub mod writer;

pub use index::{Document, IndexHandle, IndexKind, IndexSnapshot, ScoreDoc, SearchIndex, TopDocs};
pub use writer::IndexWriter;
