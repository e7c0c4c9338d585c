//! Field search against one index, with rank and classification constraints
//! and optional homonym post-processing.

use std::sync::Arc;

use tracing::warn;

use crate::errors::MatchResult;
use crate::models::{Classification, MatchType, NameSearchResult, RankType};
use crate::parser::NameParser;
use crate::query::builder::{BooleanQuery, Clause};
use crate::query::homonym;
use crate::store::index::{IndexKind, SearchIndex};
use crate::store::schema::field;

/// Everything one resolution call reads from.  Built once per call so that
/// every search in the call sees the same primary snapshot.
#[derive(Clone)]
pub struct SearchContext<'a> {
    pub primary: Arc<dyn SearchIndex>,
    pub reference: Arc<dyn SearchIndex>,
    pub vernacular: Arc<dyn SearchIndex>,
    pub identifier: Arc<dyn SearchIndex>,
    pub parser: &'a dyn NameParser,
}

impl SearchContext<'_> {
    pub fn index(&self, kind: IndexKind) -> &dyn SearchIndex {
        match kind {
            IndexKind::Primary => self.primary.as_ref(),
            IndexKind::Reference => self.reference.as_ref(),
            IndexKind::Vernacular => self.vernacular.as_ref(),
            IndexKind::Identifier => self.identifier.as_ref(),
        }
    }
}

/// One executor call.
#[derive(Clone, Debug)]
pub struct FieldSearch<'q> {
    /// Required clauses; usually built with [`terms`].
    pub mandatory: Vec<Clause>,
    pub rank: Option<RankType>,
    /// Advisory: populated levels raise the score but never exclude.
    pub classification: Option<&'q Classification>,
    pub max: usize,
    pub match_type: MatchType,
    pub check_homonym: bool,
}

impl<'q> FieldSearch<'q> {
    pub fn new(mandatory: Vec<Clause>, match_type: MatchType) -> Self {
        Self {
            mandatory,
            rank: None,
            classification: None,
            max: 1,
            match_type,
            check_homonym: false,
        }
    }

    pub fn rank(mut self, rank: Option<RankType>) -> Self {
        self.rank = rank;
        self
    }

    pub fn classification(mut self, classification: Option<&'q Classification>) -> Self {
        self.classification = classification;
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    pub fn check_homonym(mut self, check: bool) -> Self {
        self.check_homonym = check;
        self
    }

    /// The scientific name searched for, when the query has one.
    fn scientific_name(&self) -> Option<&str> {
        self.mandatory.iter().find_map(|clause| match clause {
            Clause::Term { field: f, value, .. } if f == field::NAME => Some(value.as_str()),
            _ => None,
        })
    }
}

/// Case-insensitive term clauses for every pair with a value.
pub fn terms(pairs: &[(&str, Option<&str>)]) -> Vec<Clause> {
    pairs
        .iter()
        .filter_map(|(f, v)| v.map(|v| Clause::term(f, v)))
        .collect()
}

/// Rank filter that also admits lower ranks, synonyms and local additions,
/// whose stored rank may not match.
pub fn rank_clause(rank: RankType) -> Clause {
    let by_rank = if rank.is_at_or_below_species() {
        Clause::range(field::RANK_ID, RankType::Species.id(), 9999)
    } else {
        Clause::term(field::RANK, rank.as_str())
    };
    Clause::any(vec![
        by_rank,
        Clause::term(field::IS_SYNONYM, field::TRUE),
        Clause::term(field::ALA, field::TRUE),
    ])
}

pub fn build_query(request: &FieldSearch<'_>) -> BooleanQuery {
    let mut query = BooleanQuery::new();
    for clause in &request.mandatory {
        query.push_must(clause.clone());
    }
    if let Some(rank) = request.rank {
        query.push_must(rank_clause(rank));
    }
    if let Some(cl) = request.classification {
        for clause in cl.constraint_clauses() {
            query.push_should(clause);
        }
    }
    query
}

pub fn search(
    ctx: &SearchContext<'_>,
    kind: IndexKind,
    request: &FieldSearch<'_>,
) -> MatchResult<Vec<NameSearchResult>> {
    let query = build_query(request);
    let docs = ctx.index(kind).search_documents(&query, request.max)?;
    let results: Vec<NameSearchResult> = docs
        .iter()
        .map(|doc| NameSearchResult::from_document(doc, request.match_type))
        .collect();

    if request.check_homonym && !results.is_empty() {
        return homonym::check_results(
            ctx,
            results,
            request.scientific_name(),
            request.rank,
            request.classification,
        );
    }
    Ok(results)
}

/// Turn an index failure into an empty result, logging it.  Other errors
/// pass through.
pub fn absorb_index_failure<T: Default>(result: MatchResult<T>, what: &str) -> MatchResult<T> {
    match result {
        Err(err) if err.is_index_failure() => {
            warn!(error = %err, operation = what, "index failure treated as no match");
            Ok(T::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MatchError;
    use crate::testing::Fixture;

    #[test]
    fn test_rank_clause_for_species_uses_range() {
        let rendered = rank_clause(RankType::Subspecies).to_string();
        assert!(rendered.contains("rank_id:[7000 TO 9999]"));
        assert!(rendered.contains("is_synonym"));
        let rendered = rank_clause(RankType::Genus).to_string();
        assert!(rendered.contains("rank:\"genus\""));
    }

    #[test]
    fn test_classification_is_advisory() {
        let cl = Classification::new().with(RankType::Kingdom, "Plantae");
        let request = FieldSearch::new(terms(&[(field::NAME, Some("Agathis"))]), MatchType::Exact)
            .classification(Some(&cl));
        let query = build_query(&request);
        assert_eq!(query.must_clauses().len(), 1);
        assert_eq!(query.should_clauses().len(), 1);
    }

    #[test]
    fn test_terms_skip_missing_values() {
        let clauses = terms(&[("genus", Some("Acacia")), ("specific", None)]);
        assert_eq!(clauses.len(), 1);
    }

    #[test]
    fn test_synonym_matches_any_rank() {
        let fx = Fixture::standard();
        let ctx = fx.context();
        let request = FieldSearch::new(terms(&[(field::NAME, Some("Macropus rufa"))]), MatchType::Exact)
            .rank(Some(RankType::Genus))
            .max(5);
        let hits = search(&ctx, IndexKind::Primary, &request).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].is_synonym());
    }

    #[test]
    fn test_quote_in_value_is_query_syntax_error() {
        let fx = Fixture::standard();
        let ctx = fx.context();
        let request = FieldSearch::new(terms(&[(field::NAME, Some("Bad \"name"))]), MatchType::Exact);
        let err = search(&ctx, IndexKind::Primary, &request).unwrap_err();
        assert!(matches!(err, MatchError::QuerySyntax(_)));
        assert!(absorb_index_failure(Err::<Vec<u8>, _>(err), "test").is_err());
    }

    #[test]
    fn test_absorb_index_failure() {
        let absorbed: Vec<u8> =
            absorb_index_failure(Err(MatchError::unavailable("cb", "gone")), "test").unwrap();
        assert!(absorbed.is_empty());
    }
}
