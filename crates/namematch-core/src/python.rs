//! PyO3 binding exposing [`crate::NameSearcher`] to Python.

use pyo3::prelude::*;
use serde::Serialize;

use crate::config::SearcherConfig;
use crate::errors::MatchError;
use crate::models::{Classification, RankType};
use crate::searcher;

fn parse_rank(rank: Option<&str>) -> PyResult<Option<RankType>> {
    rank.map(|r| r.parse::<RankType>())
        .transpose()
        .map_err(pyo3::exceptions::PyValueError::new_err)
}

fn parse_classification(json: Option<&str>) -> PyResult<Option<Classification>> {
    json.map(serde_json::from_str::<Classification>)
        .transpose()
        .map_err(|e| MatchError::from(e).into())
}

/// Serialize through `json.loads` so callers get plain dicts.
fn to_python<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let json_str = serde_json::to_string(value).map_err(MatchError::from)?;
    let json_module = py.import("json")?;
    json_module
        .call_method1("loads", (json_str,))
        .map(|o| o.into())
}

#[pyclass(name = "NameSearcher")]
pub struct PyNameSearcher {
    inner: searcher::NameSearcher,
}

#[pymethods]
impl PyNameSearcher {
    #[new]
    #[pyo3(signature = (index_dir, max_results=10))]
    fn new(index_dir: std::path::PathBuf, max_results: usize) -> PyResult<Self> {
        let config = SearcherConfig::new(index_dir).with_max_results(max_results);
        Ok(Self {
            inner: searcher::NameSearcher::open(config)?,
        })
    }

    /// `classification` is a JSON object keyed by rank name.
    #[pyo3(signature = (name, classification=None, rank=None, fuzzy=false))]
    fn search_for_lsid(
        &self,
        py: Python<'_>,
        name: &str,
        classification: Option<&str>,
        rank: Option<&str>,
        fuzzy: bool,
    ) -> PyResult<Option<String>> {
        let cl = parse_classification(classification)?;
        let rank = parse_rank(rank)?;
        py.allow_threads(|| self.inner.search_for_lsid(name, cl.as_ref(), rank, fuzzy))
            .map_err(Into::into)
    }

    #[pyo3(signature = (name, classification=None, rank=None, fuzzy=false))]
    fn search_for_record(
        &self,
        py: Python<'_>,
        name: &str,
        classification: Option<&str>,
        rank: Option<&str>,
        fuzzy: bool,
    ) -> PyResult<PyObject> {
        let cl = parse_classification(classification)?;
        let rank = parse_rank(rank)?;
        let found = py.allow_threads(|| self.inner.search_for_record(name, cl.as_ref(), rank, fuzzy))?;
        to_python(py, &found)
    }

    fn search_for_common_name(&self, py: Python<'_>, name: &str) -> PyResult<PyObject> {
        let found = py.allow_threads(|| self.inner.search_for_common_name(name))?;
        to_python(py, &found)
    }

    fn get_primary_lsid(&self, py: Python<'_>, lsid: &str) -> PyResult<String> {
        py.allow_threads(|| self.inner.get_primary_lsid(lsid))
            .map_err(Into::into)
    }

    fn refresh(&self) -> PyResult<bool> {
        self.inner.refresh().map_err(Into::into)
    }
}
