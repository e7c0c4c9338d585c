//! Boolean query construction for the name indices.
//!
//! A [`BooleanQuery`] is a conjunction of required clauses plus optional
//! clauses that only influence ordering.  Queries are plain values; turning
//! one into SQL is the job of the store's thread-confined compiler.

use std::fmt;

use crate::errors::{MatchError, MatchResult};

/// How a term value is compared with the stored field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Analyzer {
    /// Whole value, compared case-insensitively.  Used for names.
    LowerCaseKeyword,
    /// Whole value, compared exactly.  Used for identifiers.
    Keyword,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Term {
        field: String,
        value: String,
        analyzer: Analyzer,
    },
    /// Inclusive integer range.
    Range { field: String, lower: i64, upper: i64 },
    /// Satisfied when any of the inner clauses is.
    Any(Vec<Clause>),
}

impl Clause {
    pub fn term(field: &str, value: &str) -> Self {
        Clause::Term {
            field: field.to_string(),
            value: value.to_string(),
            analyzer: Analyzer::LowerCaseKeyword,
        }
    }

    pub fn keyword(field: &str, value: &str) -> Self {
        Clause::Term {
            field: field.to_string(),
            value: value.to_string(),
            analyzer: Analyzer::Keyword,
        }
    }

    pub fn range(field: &str, lower: i64, upper: i64) -> Self {
        Clause::Range {
            field: field.to_string(),
            lower,
            upper,
        }
    }

    pub fn any(clauses: Vec<Clause>) -> Self {
        Clause::Any(clauses)
    }

    fn validate(&self) -> MatchResult<()> {
        match self {
            Clause::Term { field, value, .. } => {
                check_field(field)?;
                if value.trim().is_empty() {
                    return Err(MatchError::QuerySyntax(format!(
                        "empty value for field '{field}'"
                    )));
                }
                if value.contains('"') {
                    return Err(MatchError::QuerySyntax(format!(
                        "unbalanced quote in {field}:{value}"
                    )));
                }
                Ok(())
            }
            Clause::Range { field, lower, upper } => {
                check_field(field)?;
                if lower > upper {
                    return Err(MatchError::QuerySyntax(format!(
                        "inverted range {field}:[{lower} TO {upper}]"
                    )));
                }
                Ok(())
            }
            Clause::Any(inner) => {
                if inner.is_empty() {
                    return Err(MatchError::QuerySyntax("empty disjunction".into()));
                }
                inner.iter().try_for_each(Clause::validate)
            }
        }
    }
}

fn check_field(field: &str) -> MatchResult<()> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MatchError::QuerySyntax(format!("invalid field name '{field}'")));
    }
    Ok(())
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Term { field, value, .. } => write!(f, "{field}:\"{value}\""),
            Clause::Range { field, lower, upper } => write!(f, "{field}:[{lower} TO {upper}]"),
            Clause::Any(inner) => {
                f.write_str("(")?;
                for (i, clause) in inner.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{clause}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BooleanQuery {
    must: Vec<Clause>,
    should: Vec<Clause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, clause: Clause) -> Self {
        self.must.push(clause);
        self
    }

    pub fn should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    pub fn push_must(&mut self, clause: Clause) {
        self.must.push(clause);
    }

    pub fn push_should(&mut self, clause: Clause) {
        self.should.push(clause);
    }

    pub fn must_clauses(&self) -> &[Clause] {
        &self.must
    }

    pub fn should_clauses(&self) -> &[Clause] {
        &self.should
    }

    /// Reject queries that would match everything or cannot be compiled.
    pub fn validate(&self) -> MatchResult<()> {
        if self.must.is_empty() {
            return Err(MatchError::QuerySyntax(format!(
                "query has no required clauses: {self}"
            )));
        }
        self.must.iter().try_for_each(Clause::validate)?;
        self.should.iter().try_for_each(Clause::validate)
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for clause in &self.must {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "+{clause}")?;
            first = false;
        }
        for clause in &self.should {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{clause}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_lucene_style() {
        let q = BooleanQuery::new()
            .must(Clause::term("name", "Macropus rufus"))
            .must(Clause::any(vec![
                Clause::range("rank_id", 7000, 9999),
                Clause::term("is_synonym", "T"),
            ]))
            .should(Clause::term("kingdom", "Animalia"));
        assert_eq!(
            q.to_string(),
            "+name:\"Macropus rufus\" +(rank_id:[7000 TO 9999] OR is_synonym:\"T\") kingdom:\"Animalia\""
        );
    }

    #[test]
    fn test_validate_requires_must_clause() {
        let q = BooleanQuery::new().should(Clause::term("kingdom", "Plantae"));
        assert!(matches!(q.validate(), Err(MatchError::QuerySyntax(_))));
    }

    #[test]
    fn test_validate_rejects_quotes_and_bad_ranges() {
        let quoted = BooleanQuery::new().must(Clause::term("name", "Acacia \"x"));
        assert!(matches!(quoted.validate(), Err(MatchError::QuerySyntax(_))));

        let inverted = BooleanQuery::new().must(Clause::range("rank_id", 10, 1));
        assert!(matches!(inverted.validate(), Err(MatchError::QuerySyntax(_))));

        let bad_field = BooleanQuery::new().must(Clause::term("na me", "x"));
        assert!(bad_field.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_query() {
        let q = BooleanQuery::new()
            .must(Clause::keyword("lsid", "urn:lsid:biodiversity.org.au:afd.taxon:1"));
        assert!(q.validate().is_ok());
    }
}
