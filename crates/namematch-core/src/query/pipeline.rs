//! Staged name matching: exact, canonical, phrase/cultivar, then fuzzy.
//!
//! Every stage runs through the executor and the first stage with hits wins.
//! Parser failures only skip the parse-driven stages; index failures end the
//! call with "no match".  Homonym ambiguity always reaches the caller.

use tracing::{debug, warn};

use crate::errors::{MatchError, MatchResult};
use crate::models::{Classification, MatchType, NameSearchResult, RankType};
use crate::parser::normalize::strip_stop_tokens;
use crate::parser::{treat_word, ParsedName, WordType};
use crate::query::builder::Clause;
use crate::query::executor::{self, absorb_index_failure, terms, FieldSearch, SearchContext};
use crate::query::guards::{clamp_limit, truncate_name};
use crate::store::index::IndexKind;
use crate::store::schema::field;

/// Resolve `name` to ranked candidate records.  An empty vector means no
/// stage matched.
pub fn resolve(
    ctx: &SearchContext<'_>,
    name: Option<&str>,
    rank: Option<RankType>,
    classification: Option<&Classification>,
    max: usize,
    fuzzy: bool,
) -> MatchResult<Vec<NameSearchResult>> {
    let Some(raw) = name.filter(|n| !n.trim().is_empty()) else {
        return Err(MatchError::InvalidInput(
            "Null value supplied for the name.".to_string(),
        ));
    };
    let supplied = truncate_name(raw);
    let name = strip_stop_tokens(&supplied);
    if name.contains("spp.") {
        return Err(MatchError::IndeterminateGroup(name));
    }

    let stages = Stages {
        ctx,
        rank,
        classification,
        max: clamp_limit(max),
    };
    let mut results = absorb_index_failure(stages.run(&name, fuzzy), "resolve")?;

    if name != supplied {
        for result in &mut results {
            if result.clean_name().is_none() {
                result.set_clean_name(Some(name.clone()));
            }
        }
    }
    Ok(results)
}

struct Stages<'c, 'a> {
    ctx: &'c SearchContext<'a>,
    rank: Option<RankType>,
    classification: Option<&'c Classification>,
    max: usize,
}

impl Stages<'_, '_> {
    fn request(&self, mandatory: Vec<Clause>, match_type: MatchType) -> FieldSearch<'_> {
        FieldSearch::new(mandatory, match_type)
            .rank(self.rank)
            .classification(self.classification)
            .max(self.max)
    }

    fn name_search(&self, name: &str, match_type: MatchType) -> MatchResult<Vec<NameSearchResult>> {
        let request = self
            .request(terms(&[(field::NAME, Some(name))]), match_type)
            .check_homonym(true);
        executor::search(self.ctx, IndexKind::Primary, &request)
    }

    fn phrase_search(
        &self,
        genus: &str,
        phrase: Option<&str>,
        voucher: Option<&str>,
        specific: Option<&str>,
    ) -> MatchResult<Vec<NameSearchResult>> {
        let mandatory = terms(&[
            (field::GENUS, Some(genus)),
            (field::PHRASE, phrase),
            (field::VOUCHER, voucher),
            (field::SPECIFIC, specific),
        ]);
        executor::search(
            self.ctx,
            IndexKind::Primary,
            &self.request(mandatory, MatchType::Phrase),
        )
    }

    fn run(&self, name: &str, fuzzy: bool) -> MatchResult<Vec<NameSearchResult>> {
        let hits = self.name_search(name, MatchType::Exact)?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        let parsed = match self.ctx.parser.parse(name) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(name, error = %err, "unable to parse name");
                return Ok(Vec::new());
            }
        };

        let hits = self.structural_stages(name, &parsed)?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        if fuzzy && parsed.is_binomial() && !parsed.is_informal_or_doubtful() {
            return self.sounds_like(&parsed);
        }
        debug!(name, "no stage matched");
        Ok(Vec::new())
    }

    fn structural_stages(&self, name: &str, parsed: &ParsedName) -> MatchResult<Vec<NameSearchResult>> {
        let specific = if parsed.marks_unspecified_species() {
            None
        } else {
            parsed.specific_epithet()
        };

        if let ParsedName::Phrase(phrase) = parsed {
            return self.phrase_search(
                parsed.genus_or_above(),
                Some(phrase.clean_phrase.as_str()).filter(|p| !p.is_empty()),
                phrase.clean_voucher.as_deref().filter(|v| !v.is_empty()),
                specific,
            );
        }

        if !parsed.is_parsable_type() || !parsed.authors_parsed() || parsed.is_informal_or_doubtful() {
            return Ok(Vec::new());
        }

        let canonical = parsed.canonical_name();
        if canonical != name {
            let mut hits = self.name_search(&canonical, MatchType::Canonical)?;
            if !hits.is_empty() {
                for hit in &mut hits {
                    hit.set_clean_name(Some(canonical.clone()));
                }
                return Ok(hits);
            }
        }

        if let Some(cultivar) = parsed.cultivar() {
            debug!(name, cultivar, "retrying cultivar as phrase name");
            return self.phrase_search(parsed.genus_or_above(), Some(cultivar), None, specific);
        }
        Ok(Vec::new())
    }

    fn sounds_like(&self, parsed: &ParsedName) -> MatchResult<Vec<NameSearchResult>> {
        let genus = treat_word(parsed.genus_or_above(), WordType::Genus);
        let specific = parsed
            .specific_epithet()
            .map(|s| treat_word(s, WordType::Species))
            .unwrap_or_default();
        if genus.is_empty() || specific.is_empty() {
            return Ok(Vec::new());
        }
        let infra = parsed
            .infraspecific_epithet()
            .map(|s| treat_word(s, WordType::Species))
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| field::NO_INFRA_SENTINEL.to_string());

        let mandatory = terms(&[
            (field::GENUS_EX, Some(genus.as_str())),
            (field::SPECIES_EX, Some(specific.as_str())),
            (field::INFRA_EX, Some(infra.as_str())),
        ]);
        executor::search(
            self.ctx,
            IndexKind::Primary,
            &self.request(mandatory, MatchType::Soundex),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn run(fx: &Fixture, name: &str, rank: Option<RankType>, fuzzy: bool) -> MatchResult<Vec<NameSearchResult>> {
        resolve(&fx.context(), Some(name), rank, None, 10, fuzzy)
    }

    #[test]
    fn test_exact_match() {
        let fx = Fixture::standard();
        let hits = run(&fx, "Macropus rufus", None, false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].match_type(), MatchType::Exact);
        assert_eq!(hits[0].lsid(), Some(Fixture::RUFUS));
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let fx = Fixture::standard();
        let err = resolve(&fx.context(), None, None, None, 10, false).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_spp_is_indeterminate() {
        let fx = Fixture::standard();
        for rank in [None, Some(RankType::Species), Some(RankType::Genus)] {
            for fuzzy in [true, false] {
                let err = run(&fx, "Macropus spp.", rank, fuzzy).unwrap_err();
                assert!(matches!(err, MatchError::IndeterminateGroup(_)));
            }
        }
    }

    #[test]
    fn test_canonical_match_strips_authorship() {
        let fx = Fixture::standard();
        let hits = run(&fx, "Macropus rufus (Desmarest, 1822)", None, false).unwrap();
        assert_eq!(hits[0].match_type(), MatchType::Canonical);
        assert_eq!(hits[0].clean_name(), Some("Macropus rufus"));
    }

    #[test]
    fn test_phrase_name_matches_cleaned_voucher() {
        let fx = Fixture::standard();
        let hits = run(&fx, "Astroloma sp. Cataby (EA Griffin 1022)", None, false).unwrap();
        assert_eq!(hits[0].match_type(), MatchType::Phrase);
        assert_eq!(hits[0].lsid(), Some(Fixture::ASTROLOMA));
    }

    #[test]
    fn test_cultivar_falls_back_to_phrase() {
        let fx = Fixture::standard();
        let hits = run(&fx, "Grevillea cv. Robyn Gordon", None, false).unwrap();
        assert_eq!(hits[0].match_type(), MatchType::Phrase);
        assert_eq!(hits[0].lsid(), Some(Fixture::GREVILLEA_CV));
    }

    #[test]
    fn test_fuzzy_only_when_requested() {
        let fx = Fixture::standard();
        assert!(run(&fx, "Makropus rufa", None, false).unwrap().is_empty());
        let hits = run(&fx, "Makropus rufa", None, true).unwrap();
        assert_eq!(hits[0].match_type(), MatchType::Soundex);
        assert_eq!(hits[0].lsid(), Some(Fixture::RUFUS));
    }

    #[test]
    fn test_virus_qualifier_is_stripped() {
        let fx = Fixture::standard();
        let hits = run(&fx, "Macropus rufus virus", None, false).unwrap();
        assert_eq!(hits[0].lsid(), Some(Fixture::RUFUS));
        assert_eq!(hits[0].clean_name(), Some("Macropus rufus"));
    }

    #[test]
    fn test_unparsable_name_is_no_match() {
        let fx = Fixture::standard();
        assert!(run(&fx, "12345 ###", None, true).unwrap().is_empty());
    }

    #[test]
    fn test_genus_homonym_needs_classification() {
        let fx = Fixture::standard();
        let err = run(&fx, "Agathis", None, false).unwrap_err();
        assert!(matches!(err, MatchError::AmbiguousHomonym { .. }));
        assert_eq!(err.candidates().len(), 2);

        let plants = Classification::new().with(RankType::Kingdom, "Plantae");
        let hits = resolve(&fx.context(), Some("Agathis"), None, Some(&plants), 10, false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lsid(), Some(Fixture::AGATHIS_PLANT));

        let wasps = Classification::new().with(RankType::Kingdom, "Animalia");
        let hits = resolve(&fx.context(), Some("Agathis"), None, Some(&wasps), 10, false).unwrap();
        assert_eq!(hits[0].lsid(), Some(Fixture::AGATHIS_WASP));
    }

    #[test]
    fn test_species_homonym_needs_classification() {
        let fx = Fixture::standard();
        let err = run(&fx, "Agathis robusta", None, false).unwrap_err();
        assert!(matches!(err, MatchError::AmbiguousHomonym { .. }));
        assert_eq!(err.candidates().len(), 2);

        let pines = Classification::new()
            .with(RankType::Kingdom, "Plantae")
            .with(RankType::Phylum, "Pinophyta");
        let hits = resolve(&fx.context(), Some("Agathis robusta"), None, Some(&pines), 10, false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lsid(), Some(Fixture::ROBUSTA_PLANT));

        let wasps = Classification::new().with(RankType::Kingdom, "Animalia");
        let hits = resolve(
            &fx.context(),
            Some("Agathis robusta"),
            Some(RankType::Species),
            Some(&wasps),
            10,
            false,
        )
        .unwrap();
        assert_eq!(hits[0].lsid(), Some(Fixture::ROBUSTA_WASP));
    }

    #[test]
    fn test_cross_rank_homonym_requires_rank() {
        let fx = Fixture::standard();
        let err = run(&fx, "Bacteria", None, false).unwrap_err();
        assert!(matches!(err, MatchError::AmbiguousHomonym { .. }));

        let hits = run(&fx, "Bacteria", Some(RankType::Kingdom), false).unwrap();
        assert_eq!(hits[0].rank(), Some(RankType::Kingdom));
        assert!(run(&fx, "Bacteria", Some(RankType::Order), false).unwrap().is_empty());
    }

    #[test]
    fn test_index_failure_degrades_to_no_match() {
        let fx = Fixture::standard();
        let ctx = fx.failing_context();
        assert!(resolve(&ctx, Some("Macropus rufus"), None, None, 10, true)
            .unwrap()
            .is_empty());
    }
}
