//! Identifier, LSID and vernacular lookups.

use tracing::{debug, warn};

use crate::errors::{MatchError, MatchResult};
use crate::models::{Classification, MatchType, NameSearchResult, RankType};
use crate::parser::normalize::vernacular_key;
use crate::parser::NameParser;
use crate::query::builder::{BooleanQuery, Clause};
use crate::query::executor::{self, absorb_index_failure, FieldSearch, SearchContext};
use crate::query::guards::DEFAULT_SEARCH_LIMIT;
use crate::store::index::{Document, IndexKind};
use crate::store::schema::field;

fn exact_lookup(
    ctx: &SearchContext<'_>,
    id_field: &str,
    value: &str,
) -> MatchResult<Option<NameSearchResult>> {
    let request = FieldSearch::new(vec![Clause::keyword(id_field, value)], MatchType::Direct);
    let results = absorb_index_failure(
        executor::search(ctx, IndexKind::Primary, &request),
        "exact lookup",
    )?;
    Ok(results.into_iter().next())
}

/// Record with the given primary-index record id.
pub fn search_for_record_by_id(ctx: &SearchContext<'_>, id: &str) -> MatchResult<Option<NameSearchResult>> {
    exact_lookup(ctx, field::ID, id)
}

pub fn search_for_record_by_lsid(
    ctx: &SearchContext<'_>,
    lsid: &str,
) -> MatchResult<Option<NameSearchResult>> {
    exact_lookup(ctx, field::LSID, lsid)
}

/// Accepted (or own) LSID of the record with the given record id.
pub fn search_for_lsid_by_id(ctx: &SearchContext<'_>, id: &str) -> MatchResult<Option<String>> {
    Ok(search_for_record_by_id(ctx, id)?
        .and_then(|r| r.accepted_or_primary_lsid().map(str::to_string)))
}

/// Canonical LSID for `lsid` from the identifier index; unknown LSIDs are
/// returned unchanged.
pub fn get_primary_lsid(ctx: &SearchContext<'_>, lsid: &str) -> MatchResult<String> {
    let query = BooleanQuery::new().must(Clause::keyword(field::LSID, lsid));
    let docs = absorb_index_failure(ctx.identifier.search_documents(&query, 1), "primary lsid")?;
    Ok(docs
        .first()
        .and_then(|doc| doc.get_owned(field::REAL_LSID))
        .unwrap_or_else(|| lsid.to_string()))
}

fn names_match(parser: &dyn NameParser, first: Option<&str>, other: Option<&str>) -> bool {
    match (first, other) {
        (Some(a), Some(b)) => match (parser.canonicalize(a), parser.canonicalize(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

/// LSID for a common name, provided every hit names the same taxon.
pub fn lsid_for_common_name(ctx: &SearchContext<'_>, name: &str) -> MatchResult<Option<String>> {
    let key = vernacular_key(name);
    if key.is_empty() {
        return Ok(None);
    }
    let query = BooleanQuery::new().must(Clause::keyword(field::COMMON_NAME, &key));
    let docs = absorb_index_failure(
        ctx.vernacular.search_documents(&query, DEFAULT_SEARCH_LIMIT),
        "common name",
    )?;
    debug!(name, hits = docs.len(), "common name lookup");

    match single_taxon_lsid(ctx.parser, name, &docs) {
        Err(MatchError::AmbiguousCommonName(name)) => {
            debug!(name = %name, "common name maps to several taxa, treated as no match");
            Ok(None)
        }
        other => other,
    }
}

/// LSID of the first vernacular hit, or `AmbiguousCommonName` when the hits
/// name different taxa.
fn single_taxon_lsid(
    parser: &dyn NameParser,
    name: &str,
    docs: &[Document],
) -> MatchResult<Option<String>> {
    let Some((first, rest)) = docs.split_first() else {
        return Ok(None);
    };
    let first_name = first.get(field::NAME);
    if rest
        .iter()
        .any(|doc| !names_match(parser, first_name, doc.get(field::NAME)))
    {
        return Err(MatchError::AmbiguousCommonName(name.to_string()));
    }
    Ok(first.get_owned(field::LSID))
}

/// Primary-index record for a common name, tagged VERNACULAR.
pub fn search_for_common_name(
    ctx: &SearchContext<'_>,
    name: &str,
) -> MatchResult<Option<NameSearchResult>> {
    let Some(lsid) = lsid_for_common_name(ctx, name)? else {
        return Ok(None);
    };
    let mut found = search_for_record_by_lsid(ctx, &lsid)?;
    if let Some(hit) = found.as_mut() {
        hit.set_match_type(MatchType::Vernacular);
    }
    Ok(found)
}

/// Replace every populated level id with the LSID of that record.  Ids with
/// no matching record keep their value.
pub fn update_classification_with_guid(
    ctx: &SearchContext<'_>,
    classification: &mut Classification,
) -> MatchResult<()> {
    for slot in classification.level_ids_mut() {
        let Some(id) = slot.clone() else {
            continue;
        };
        match search_for_lsid_by_id(ctx, &id)? {
            Some(lsid) => *slot = Some(lsid),
            None => debug!(id = %id, "no record for classification id"),
        }
    }
    Ok(())
}

/// LSIDs (or record ids where no LSID is stored) of every accepted
/// species-rank record.
pub fn species_identifiers(ctx: &SearchContext<'_>) -> MatchResult<Vec<String>> {
    let species = RankType::Species.id();
    let query = BooleanQuery::new().must(Clause::range(field::RANK_ID, species, species));
    let total = ctx.primary.search(&query, 0)?.total_hits;
    let docs = ctx.primary.search_documents(&query, total)?;
    let mut ids = Vec::with_capacity(docs.len());
    for doc in &docs {
        let result = NameSearchResult::from_document(doc, MatchType::Direct);
        if result.is_synonym() {
            continue;
        }
        match result.lsid() {
            Some(lsid) => ids.push(lsid.to_string()),
            None if !result.id().is_empty() => ids.push(result.id().to_string()),
            None => warn!("species record without lsid or id"),
        }
    }
    Ok(ids)
}
