//! Classification-driven search with recursive fallback to higher ranks.

use tracing::debug;

use crate::errors::{MatchError, MatchResult};
use crate::models::{Classification, MatchType, NameSearchResult, RankType};
use crate::query::executor::SearchContext;
use crate::query::guards::DEFAULT_SEARCH_LIMIT;
use crate::query::{lookup, pipeline};

/// Options for [`search_by_classification`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationSearch {
    /// Retry at higher ranks when the leaf name does not match.
    pub recursive: bool,
    /// Replace the level ids of the matched classification with LSIDs.
    pub add_guids: bool,
    pub fuzzy: bool,
}

const FALLBACK_RANKS: [RankType; 6] = [
    RankType::Genus,
    RankType::Family,
    RankType::Order,
    RankType::Class,
    RankType::Phylum,
    RankType::Kingdom,
];

/// First record for `name`, or `None`.
pub fn search_for_record(
    ctx: &SearchContext<'_>,
    name: Option<&str>,
    classification: Option<&Classification>,
    rank: Option<RankType>,
    fuzzy: bool,
) -> MatchResult<Option<NameSearchResult>> {
    let results = pipeline::resolve(ctx, name, rank, classification, DEFAULT_SEARCH_LIMIT, fuzzy)?;
    Ok(results.into_iter().next())
}

/// Derive the name and rank to search for from `classification` (or infer
/// the rank of its scientific name) and resolve it.
pub fn search_by_classification(
    ctx: &SearchContext<'_>,
    classification: &Classification,
    opts: ClassificationSearch,
) -> MatchResult<Option<NameSearchResult>> {
    let mut cl = classification.clone();
    let supplied = cl
        .scientific_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let (name, rank) = match supplied {
        Some(mut name) => {
            let rank = cl.infer_rank(&mut name, ctx.parser, opts.recursive);
            (Some(name), rank)
        }
        None => {
            let derived = cl.derive_name_and_rank();
            (derived.name, derived.rank)
        }
    };
    debug!(name = ?name, rank = ?rank, "classification search");

    let mut remembered = None;
    let mut found = match search_for_record(ctx, name.as_deref(), Some(&cl), rank, opts.fuzzy) {
        Ok(found) => found,
        Err(err @ MatchError::AmbiguousHomonym { .. }) => return Err(err),
        Err(err) => {
            debug!(error = %err, "leaf search failed");
            remembered = Some(err);
            None
        }
    };

    if found.is_none() && opts.recursive {
        found = recursive_fallback(ctx, &cl, rank, opts.fuzzy)?;
        if let Some(hit) = found.as_mut() {
            hit.set_match_type(MatchType::Recursive);
        }
    }

    if opts.add_guids {
        if let Some(hit) = found.as_mut() {
            lookup::update_classification_with_guid(ctx, hit.classification_mut())?;
        }
    }

    match (found, remembered) {
        (None, Some(err)) => Err(err),
        (found, _) => Ok(found),
    }
}

/// Retry at species (when the leaf was below it) and then at every higher
/// populated level, most specific first.
fn recursive_fallback(
    ctx: &SearchContext<'_>,
    cl: &Classification,
    rank: Option<RankType>,
    fuzzy: bool,
) -> MatchResult<Option<NameSearchResult>> {
    if rank != Some(RankType::Species) && cl.has_real_species() {
        if let Some(species) = cl.species_name() {
            debug!(name = %species, "falling back to species");
            let hit = search_for_record(ctx, Some(&species), Some(cl), Some(RankType::Species), fuzzy)?;
            if hit.is_some() {
                return Ok(hit);
            }
        }
    }
    for level in FALLBACK_RANKS {
        let Some(value) = cl.value_at(level) else {
            continue;
        };
        debug!(name = value, rank = %level, "falling back");
        let hit = search_for_record(ctx, Some(value), Some(cl), Some(level), fuzzy)?;
        if hit.is_some() {
            return Ok(hit);
        }
    }
    Ok(None)
}
