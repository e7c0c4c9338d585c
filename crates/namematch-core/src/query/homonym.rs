//! Homonym detection and arbitration against the reference index.
//!
//! A genus or species name shared by unrelated taxa is only accepted when
//! the caller's classification narrows the reference index down to a single
//! concept; the first candidate agreeing with that classification wins.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::errors::{MatchError, MatchResult};
use crate::models::{Classification, NameSearchResult, RankType};
use crate::query::builder::{BooleanQuery, Clause};
use crate::query::executor::SearchContext;
use crate::store::schema::field;

static CROSS_RANK_HOMONYMS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    include_str!("../../resources/cross_rank_homonyms.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
});

/// Higher ranks added one at a time while narrowing a homonym.
const RESOLUTION_ORDER: [RankType; 5] = [
    RankType::Kingdom,
    RankType::Phylum,
    RankType::Class,
    RankType::Order,
    RankType::Family,
];

pub fn is_cross_rank_homonym(name: &str) -> bool {
    CROSS_RANK_HOMONYMS.contains(&name.trim().to_lowercase())
}

/// Post-process a ranked hit list.  Genus and species hits collapse to the
/// single record the classification selects.
pub(crate) fn check_results(
    ctx: &SearchContext<'_>,
    results: Vec<NameSearchResult>,
    name: Option<&str>,
    rank: Option<RankType>,
    classification: Option<&Classification>,
) -> MatchResult<Vec<NameSearchResult>> {
    if rank.is_none() {
        check_cross_rank(&results)?;
    }
    match results.first().and_then(NameSearchResult::rank) {
        Some(RankType::Genus | RankType::Species) => {
            let chosen = validate_homonyms(ctx, &results, name, classification)?;
            Ok(vec![chosen])
        }
        _ => Ok(results),
    }
}

fn check_cross_rank(results: &[NameSearchResult]) -> MatchResult<()> {
    let top = results.first().and_then(NameSearchResult::scientific_name);
    if top.is_some_and(is_cross_rank_homonym) {
        return Err(MatchError::homonym(
            "Cross rank homonym detected. Please repeat search with a rank specified.",
            results.to_vec(),
        ));
    }
    Ok(())
}

/// Pick the candidate matching `classification` at the level the reference
/// index needs, or fail with every candidate attached.
pub fn validate_homonyms(
    ctx: &SearchContext<'_>,
    results: &[NameSearchResult],
    name: Option<&str>,
    classification: Option<&Classification>,
) -> MatchResult<NameSearchResult> {
    let Some(top) = results.first() else {
        return Err(MatchError::InvalidInput("no candidates to validate".into()));
    };
    let rank = match top.rank() {
        Some(rank @ (RankType::Genus | RankType::Species)) => rank,
        _ => return Ok(top.clone()),
    };

    let mut working = classification.cloned().unwrap_or_default();
    if working.value_at(rank).is_none() {
        working.set_at(rank, name.map(str::to_string));
    }

    let level = match resolve_level(ctx, &working, rank) {
        Ok(Some(level)) => level,
        Ok(None) => return Ok(top.clone()),
        Err(MatchError::AmbiguousHomonym { message, .. }) => {
            return Err(MatchError::homonym(message, results.to_vec()));
        }
        Err(err) => return Err(err),
    };
    debug!(level = %level, classification = %working, "resolving homonym");

    // Synonyms carry no classification of their own, so they cannot be
    // compared here.
    results
        .iter()
        .filter(|result| !result.is_synonym())
        .find(|result| working.has_identical_classification(result.classification(), level))
        .cloned()
        .ok_or_else(|| {
            MatchError::homonym(
                format!(
                    "unresolved homonym for {} at {level}",
                    name.unwrap_or("<unnamed>")
                ),
                results.to_vec(),
            )
        })
}

/// Lowest-effort rank at which the reference index holds exactly one
/// concept for the classification's genus (and species).  `None` means the
/// name is not ambiguous in the reference data.
pub fn resolve_level(
    ctx: &SearchContext<'_>,
    classification: &Classification,
    rank: RankType,
) -> MatchResult<Option<RankType>> {
    let genus = classification.value_at(RankType::Genus);
    let species = classification.value_at(RankType::Species);
    if genus.is_none() && species.is_none() {
        return Err(unresolvable(classification));
    }

    let mut probe = Classification::new();
    probe.genus = genus.map(str::to_string);
    if rank == RankType::Species {
        probe.species = species.map(str::to_string);
    }

    match reference_hits(ctx, &probe, rank) {
        None => return Ok(None),
        Some(hits) if hits <= 1 => return Ok(None),
        Some(_) => {}
    }

    for level in RESOLUTION_ORDER {
        let Some(value) = classification.value_at(level) else {
            continue;
        };
        probe.set_at(level, Some(value.to_string()));
        match reference_hits(ctx, &probe, rank).unwrap_or(0) {
            1 => return Ok(Some(level)),
            0 => {
                debug!(level = %level, value, "supplied level matches nothing, ignoring it");
                probe.set_at(level, None);
            }
            _ => {}
        }
    }
    Err(unresolvable(classification))
}

fn unresolvable(classification: &Classification) -> MatchError {
    MatchError::homonym(
        format!("Problem resolving the classification: {classification}"),
        Vec::new(),
    )
}

/// Reference-index hit count for `probe` at `rank`; `None` when the
/// reference index cannot be searched.
fn reference_hits(ctx: &SearchContext<'_>, probe: &Classification, rank: RankType) -> Option<usize> {
    let mut query = BooleanQuery::new().must(Clause::term(field::RANK, rank.as_str()));
    for clause in probe.constraint_clauses() {
        query.push_must(clause);
    }
    match ctx.reference.search(&query, 10) {
        Ok(top) => {
            debug!(query = %query, hits = top.total_hits, "reference index probe");
            Some(top.total_hits)
        }
        Err(err) => {
            warn!(error = %err, "error searching the reference index");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchType;
    use crate::store::index::Document;
    use crate::testing::Fixture;

    #[test]
    fn test_cross_rank_set_is_case_insensitive() {
        assert!(is_cross_rank_homonym("Bacteria"));
        assert!(is_cross_rank_homonym(" CTENOPHORA "));
        assert!(!is_cross_rank_homonym("Macropus"));
    }

    #[test]
    fn test_unambiguous_genus_needs_no_resolution() {
        let fx = Fixture::standard();
        let cl = Classification::new().with(RankType::Genus, "Macropus");
        assert_eq!(resolve_level(&fx.context(), &cl, RankType::Genus).unwrap(), None);
    }

    #[test]
    fn test_kingdom_resolves_agathis() {
        let fx = Fixture::standard();
        let cl = Classification::new()
            .with(RankType::Kingdom, "Plantae")
            .with(RankType::Genus, "Agathis");
        assert_eq!(
            resolve_level(&fx.context(), &cl, RankType::Genus).unwrap(),
            Some(RankType::Kingdom)
        );
    }

    #[test]
    fn test_wrong_level_is_dropped_before_next() {
        let fx = Fixture::standard();
        let cl = Classification::new()
            .with(RankType::Kingdom, "Fungi")
            .with(RankType::Phylum, "Arthropoda")
            .with(RankType::Genus, "Agathis");
        assert_eq!(
            resolve_level(&fx.context(), &cl, RankType::Genus).unwrap(),
            Some(RankType::Phylum)
        );
    }

    #[test]
    fn test_no_higher_context_is_unresolvable() {
        let fx = Fixture::standard();
        let cl = Classification::new().with(RankType::Genus, "Agathis");
        let err = resolve_level(&fx.context(), &cl, RankType::Genus).unwrap_err();
        assert_eq!(err.kind(), "ambiguous_homonym");
        assert!(resolve_level(&fx.context(), &Classification::new(), RankType::Genus).is_err());
    }

    #[test]
    fn test_species_homonym_resolves_at_kingdom() {
        let fx = Fixture::standard();
        let cl = Classification::new()
            .with(RankType::Kingdom, "Plantae")
            .with(RankType::Species, "Agathis robusta");
        assert_eq!(
            resolve_level(&fx.context(), &cl, RankType::Species).unwrap(),
            Some(RankType::Kingdom)
        );

        let bare = Classification::new()
            .with(RankType::Genus, "Agathis")
            .with(RankType::Species, "Agathis robusta");
        let err = resolve_level(&fx.context(), &bare, RankType::Species).unwrap_err();
        assert_eq!(err.kind(), "ambiguous_homonym");
    }

    #[test]
    fn test_only_genus_and_species_tops_are_validated() {
        let fx = Fixture::standard();
        let family = |kingdom: &str| {
            NameSearchResult::from_document(
                &Document::new()
                    .with(field::NAME, "Agathis")
                    .with(field::RANK, "family")
                    .with(field::KINGDOM, kingdom),
                MatchType::Exact,
            )
        };
        let results = vec![family("Animalia"), family("Plantae")];
        let chosen = validate_homonyms(&fx.context(), &results, Some("Agathis"), None).unwrap();
        assert_eq!(chosen, results[0]);
    }
}
