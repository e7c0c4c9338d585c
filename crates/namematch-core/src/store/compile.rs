//! Translation of [`BooleanQuery`] values into SQL over the document store.
//!
//! A [`SqlCompiler`] accumulates SQL text and bind parameters while it walks
//! a query, so one instance must never be shared between concurrent callers.
//! The snapshot builds a fresh compiler for every search.

use rusqlite::types::Value;

use crate::errors::MatchResult;
use crate::query::builder::{Analyzer, BooleanQuery, Clause};

#[derive(Debug)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
pub struct SqlCompiler {
    params: Vec<Value>,
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn predicate(&mut self, clause: &Clause) -> String {
        match clause {
            Clause::Term {
                field,
                value,
                analyzer,
            } => {
                let field_param = self.bind(Value::Text(field.clone()));
                let (column, bound) = match analyzer {
                    Analyzer::LowerCaseKeyword => ("norm", value.trim().to_lowercase()),
                    Analyzer::Keyword => ("value", value.clone()),
                };
                let value_param = self.bind(Value::Text(bound));
                format!(
                    "EXISTS (SELECT 1 FROM fields f WHERE f.doc_id = d.doc_id \
                     AND f.field = {field_param} AND f.{column} = {value_param})"
                )
            }
            Clause::Range { field, lower, upper } => {
                let field_param = self.bind(Value::Text(field.clone()));
                let lower_param = self.bind(Value::Integer(*lower));
                let upper_param = self.bind(Value::Integer(*upper));
                format!(
                    "EXISTS (SELECT 1 FROM fields f WHERE f.doc_id = d.doc_id \
                     AND f.field = {field_param} AND f.value <> '' \
                     AND CAST(f.value AS INTEGER) BETWEEN {lower_param} AND {upper_param})"
                )
            }
            Clause::Any(inner) => {
                let parts: Vec<String> = inner.iter().map(|c| self.predicate(c)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }

    fn where_clause(&mut self, query: &BooleanQuery) -> String {
        let parts: Vec<String> = query
            .must_clauses()
            .iter()
            .map(|c| self.predicate(c))
            .collect();
        parts.join(" AND ")
    }

    /// Required clauses plus the visibility bound: documents published after
    /// `generation` do not exist for this reader.
    fn visible_filter(&mut self, query: &BooleanQuery, generation: i64) -> String {
        let filter = self.where_clause(query);
        let generation_param = self.bind(Value::Integer(generation));
        format!("{filter} AND d.generation <= {generation_param}")
    }

    /// Ranked search: required clauses filter, optional clauses add one point
    /// each to the score.  Ties keep insertion order.
    pub fn compile_search(
        &mut self,
        query: &BooleanQuery,
        generation: i64,
        max: usize,
    ) -> MatchResult<CompiledQuery> {
        query.validate()?;
        self.params.clear();

        let filter = self.visible_filter(query, generation);
        let score = if query.should_clauses().is_empty() {
            "0".to_string()
        } else {
            let parts: Vec<String> = query
                .should_clauses()
                .iter()
                .map(|c| format!("({})", self.predicate(c)))
                .collect();
            parts.join(" + ")
        };
        let limit_param = self.bind(Value::Integer(max as i64));
        let sql = format!(
            "SELECT d.doc_id, {score} AS score FROM documents d WHERE {filter} \
             ORDER BY score DESC, d.doc_id ASC LIMIT {limit_param};"
        );
        Ok(CompiledQuery {
            sql,
            params: std::mem::take(&mut self.params),
        })
    }

    /// Number of documents satisfying the required clauses.
    pub fn compile_count(&mut self, query: &BooleanQuery, generation: i64) -> MatchResult<CompiledQuery> {
        query.validate()?;
        self.params.clear();

        let filter = self.visible_filter(query, generation);
        let sql = format!("SELECT COUNT(*) FROM documents d WHERE {filter};");
        Ok(CompiledQuery {
            sql,
            params: std::mem::take(&mut self.params),
        })
    }
}
