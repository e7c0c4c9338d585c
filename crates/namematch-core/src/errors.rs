//! Error types for the name matching engine.

use crate::models::NameSearchResult;

/// Top-level error enum for name resolution.
///
/// Parser and index failures are usually absorbed by the match pipeline and
/// degrade to "no match"; homonym ambiguity is always surfaced.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Unable to perform search: {0}")]
    InvalidInput(String),

    #[error("Unable to match \"{0}\": spp. refers to a group of species, not a concept")]
    IndeterminateGroup(String),

    #[error("Unable to parse \"{name}\": {reason}")]
    Unparsable { name: String, reason: String },

    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    #[error("Index '{index}' unavailable: {message}")]
    IndexUnavailable { index: String, message: String },

    #[error("Homonym detected: {message}")]
    AmbiguousHomonym {
        message: String,
        candidates: Vec<NameSearchResult>,
    },

    #[error("Common name \"{0}\" maps to more than one scientific name")]
    AmbiguousCommonName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MatchError {
    pub(crate) fn homonym(message: impl Into<String>, candidates: Vec<NameSearchResult>) -> Self {
        MatchError::AmbiguousHomonym {
            message: message.into(),
            candidates,
        }
    }

    pub(crate) fn unavailable(index: &str, message: impl Into<String>) -> Self {
        MatchError::IndexUnavailable {
            index: index.to_string(),
            message: message.into(),
        }
    }

    /// True for failures reaching an index (I/O, SQLite, missing snapshot).
    pub fn is_index_failure(&self) -> bool {
        matches!(
            self,
            MatchError::IndexUnavailable { .. } | MatchError::Sqlite(_) | MatchError::Io(_)
        )
    }

    /// Stable identifier for counting failure reasons in batch runs.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "invalid_input",
            MatchError::IndeterminateGroup(_) => "indeterminate_group",
            MatchError::Unparsable { .. } => "unparsable",
            MatchError::QuerySyntax(_) => "query_syntax",
            MatchError::IndexUnavailable { .. } | MatchError::Sqlite(_) | MatchError::Io(_) => {
                "index_unavailable"
            }
            MatchError::AmbiguousHomonym { .. } => "ambiguous_homonym",
            MatchError::AmbiguousCommonName(_) => "ambiguous_common_name",
            MatchError::Json(_) => "serialization",
        }
    }

    /// Candidate records attached to a homonym failure.
    pub fn candidates(&self) -> &[NameSearchResult] {
        match self {
            MatchError::AmbiguousHomonym { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

#[cfg(feature = "python")]
impl From<MatchError> for pyo3::PyErr {
    fn from(err: MatchError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyLookupError, PyRuntimeError, PyValueError};
        match &err {
            MatchError::InvalidInput(_)
            | MatchError::IndeterminateGroup(_)
            | MatchError::Unparsable { .. }
            | MatchError::QuerySyntax(_) => PyValueError::new_err(err.to_string()),
            MatchError::AmbiguousHomonym { .. } | MatchError::AmbiguousCommonName(_) => {
                PyLookupError::new_err(err.to_string())
            }
            MatchError::Io(_) => PyIOError::new_err(err.to_string()),
            MatchError::IndexUnavailable { .. } | MatchError::Sqlite(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            MatchError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
