//! Taxon name resolution and homonym arbitration.
//!
//! Resolves free-text scientific names, partial classifications, record
//! identifiers and common names to taxon records held in a set of read-only
//! name indices.  Matching runs in stages (exact, canonical, phrase or
//! cultivar, sounds-like) and refuses to guess between homonyms unless the
//! supplied classification picks out a single concept in the reference index.
//! With the `python` feature the crate builds as the `_namematch_core`
//! extension module.

pub mod config;
pub mod errors;
pub mod models;
pub mod parser;
pub mod query;
pub mod searcher;
pub mod store;

#[cfg(feature = "python")]
mod python;
#[cfg(test)]
mod testing;

pub use config::SearcherConfig;
pub use errors::{MatchError, MatchResult};
pub use models::{Classification, MatchType, NameSearchResult, RankType};
pub use parser::{NameParser, ParsedName, ScientificNameParser};
pub use query::fallback::ClassificationSearch;
pub use searcher::{NameSearcher, ResolveRequest};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn _namematch_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyNameSearcher>()?;
    m.add("MAX_NAME_LENGTH", query::guards::MAX_NAME_LENGTH)?;
    m.add("MAX_SEARCH_LIMIT", query::guards::MAX_SEARCH_LIMIT)?;
    Ok(())
}
