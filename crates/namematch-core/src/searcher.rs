//! Public facade over the four name indices.
//!
//! Every call builds a [`SearchContext`] holding the snapshots current at the
//! time of the call, so a concurrent [`NameSearcher::refresh`] never changes
//! the data a call in flight reads.

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SearcherConfig;
use crate::errors::MatchResult;
use crate::models::{Classification, NameSearchResult, RankType};
use crate::parser::{NameParser, ScientificNameParser};
use crate::query::executor::SearchContext;
use crate::query::fallback::{self, ClassificationSearch};
use crate::query::guards::check_batch_size;
use crate::query::{lookup, pipeline};
use crate::store::index::{IndexHandle, IndexKind};

pub struct NameSearcher {
    config: SearcherConfig,
    primary: IndexHandle,
    reference: IndexHandle,
    vernacular: IndexHandle,
    identifier: IndexHandle,
    parser: Box<dyn NameParser>,
}

/// One entry of a [`NameSearcher::resolve_batch`] call.  A request with a
/// name is resolved by name; otherwise its classification is used.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResolveRequest {
    pub name: Option<String>,
    pub rank: Option<RankType>,
    pub classification: Option<Classification>,
    pub fuzzy: bool,
    pub recursive: bool,
}

impl NameSearcher {
    /// Open every index under `config.index_dir`.  A missing or foreign index
    /// file fails construction.
    pub fn open(config: SearcherConfig) -> MatchResult<Self> {
        let dir = config.index_dir.as_path();
        let pool = config.pool_size;
        let searcher = Self {
            primary: IndexHandle::open(IndexKind::Primary, dir, pool)?,
            reference: IndexHandle::open(IndexKind::Reference, dir, pool)?,
            vernacular: IndexHandle::open(IndexKind::Vernacular, dir, pool)?,
            identifier: IndexHandle::open(IndexKind::Identifier, dir, pool)?,
            parser: Box::new(ScientificNameParser::new()),
            config,
        };
        info!(
            index_dir = %searcher.config.index_dir.display(),
            max_results = searcher.config.max_results,
            "name searcher ready"
        );
        Ok(searcher)
    }

    /// Replace the default grammar.
    pub fn with_parser(mut self, parser: Box<dyn NameParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    pub(crate) fn context(&self) -> SearchContext<'_> {
        SearchContext {
            primary: self.primary.snapshot(),
            reference: self.reference.snapshot(),
            vernacular: self.vernacular.snapshot(),
            identifier: self.identifier.snapshot(),
            parser: self.parser.as_ref(),
        }
    }

    /// Pick up a newer primary index generation.  The other indices are
    /// loaded once.
    pub fn refresh(&self) -> MatchResult<bool> {
        self.primary.refresh()
    }

    // -----------------------------------------------------------------------
    // Name lookups
    // -----------------------------------------------------------------------

    /// Every candidate the first successful stage produced, up to the
    /// configured maximum.
    pub fn search_for_records(
        &self,
        name: &str,
        rank: Option<RankType>,
        classification: Option<&Classification>,
        fuzzy: bool,
    ) -> MatchResult<Vec<NameSearchResult>> {
        pipeline::resolve(
            &self.context(),
            Some(name),
            rank,
            classification,
            self.config.max_results,
            fuzzy,
        )
    }

    pub fn search_for_record(
        &self,
        name: &str,
        classification: Option<&Classification>,
        rank: Option<RankType>,
        fuzzy: bool,
    ) -> MatchResult<Option<NameSearchResult>> {
        fallback::search_for_record(&self.context(), Some(name), classification, rank, fuzzy)
    }

    /// Accepted LSID for `name`: the accepted concept when the match is a
    /// synonym.
    pub fn search_for_lsid(
        &self,
        name: &str,
        classification: Option<&Classification>,
        rank: Option<RankType>,
        fuzzy: bool,
    ) -> MatchResult<Option<String>> {
        let Some(hit) = self.search_for_record(name, classification, rank, fuzzy)? else {
            return Ok(None);
        };
        let lsid = hit.accepted_or_primary_lsid().map(str::to_string);
        if lsid.is_none() {
            warn!(name, id = hit.id(), "matched record has no lsid");
        }
        Ok(lsid)
    }

    // -----------------------------------------------------------------------
    // Classification lookups
    // -----------------------------------------------------------------------

    pub fn search_for_record_by_classification(
        &self,
        classification: &Classification,
        opts: ClassificationSearch,
    ) -> MatchResult<Option<NameSearchResult>> {
        fallback::search_by_classification(&self.context(), classification, opts)
    }

    pub fn search_for_lsid_by_classification(
        &self,
        classification: &Classification,
        recursive: bool,
    ) -> MatchResult<Option<String>> {
        let opts = ClassificationSearch {
            recursive,
            ..ClassificationSearch::default()
        };
        Ok(self
            .search_for_record_by_classification(classification, opts)?
            .and_then(|hit| hit.lsid().map(str::to_string)))
    }

    // -----------------------------------------------------------------------
    // Identifier and vernacular lookups
    // -----------------------------------------------------------------------

    pub fn search_for_record_by_id(&self, id: &str) -> MatchResult<Option<NameSearchResult>> {
        lookup::search_for_record_by_id(&self.context(), id)
    }

    pub fn search_for_lsid_by_id(&self, id: &str) -> MatchResult<Option<String>> {
        lookup::search_for_lsid_by_id(&self.context(), id)
    }

    pub fn search_for_record_by_lsid(&self, lsid: &str) -> MatchResult<Option<NameSearchResult>> {
        lookup::search_for_record_by_lsid(&self.context(), lsid)
    }

    pub fn get_primary_lsid(&self, lsid: &str) -> MatchResult<String> {
        lookup::get_primary_lsid(&self.context(), lsid)
    }

    pub fn search_for_lsid_common_name(&self, name: &str) -> MatchResult<Option<String>> {
        lookup::lsid_for_common_name(&self.context(), name)
    }

    pub fn search_for_common_name(&self, name: &str) -> MatchResult<Option<NameSearchResult>> {
        lookup::search_for_common_name(&self.context(), name)
    }

    pub fn update_classification_with_guid(&self, classification: &mut Classification) -> MatchResult<()> {
        lookup::update_classification_with_guid(&self.context(), classification)
    }

    pub fn species_identifiers(&self) -> MatchResult<Vec<String>> {
        lookup::species_identifiers(&self.context())
    }

    // -----------------------------------------------------------------------
    // Batch
    // -----------------------------------------------------------------------

    /// Resolve independent requests in parallel.  Results keep request order;
    /// one failing request does not affect the others.
    pub fn resolve_batch(
        &self,
        requests: &[ResolveRequest],
    ) -> MatchResult<Vec<MatchResult<Option<NameSearchResult>>>> {
        check_batch_size(requests.len())?;
        Ok(requests
            .par_iter()
            .map(|request| self.resolve_one(request))
            .collect())
    }

    fn resolve_one(&self, request: &ResolveRequest) -> MatchResult<Option<NameSearchResult>> {
        let ctx = self.context();
        match (&request.name, &request.classification) {
            (Some(name), classification) => fallback::search_for_record(
                &ctx,
                Some(name.as_str()),
                classification.as_ref(),
                request.rank,
                request.fuzzy,
            ),
            (None, Some(classification)) => fallback::search_by_classification(
                &ctx,
                classification,
                ClassificationSearch {
                    recursive: request.recursive,
                    add_guids: false,
                    fuzzy: request.fuzzy,
                },
            ),
            (None, None) => fallback::search_for_record(&ctx, None, None, request.rank, request.fuzzy),
        }
    }

    /// Substitute level ids in every classification.  Stops at the first
    /// failure.  Ids with no matching record are left as they are.
    pub fn update_classifications_with_guid(&self, classifications: &mut [Classification]) -> MatchResult<()> {
        check_batch_size(classifications.len())?;
        classifications
            .par_iter_mut()
            .try_for_each(|cl| self.update_classification_with_guid(cl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchType;
    use crate::store::index::Document;
    use crate::store::schema::field;
    use crate::store::writer::IndexWriter;
    use crate::testing::Fixture;

    #[test]
    fn test_open_requires_every_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IndexWriter::create(&IndexKind::Primary.path_in(dir.path())).unwrap();
        writer.commit().unwrap();
        let err = NameSearcher::open(SearcherConfig::new(dir.path())).err().unwrap();
        assert_eq!(err.kind(), "index_unavailable");
    }

    #[test]
    fn test_lsid_of_synonym_is_accepted_concept() {
        let fx = Fixture::standard();
        let lsid = fx.searcher.search_for_lsid("Macropus rufa", None, None, false).unwrap();
        assert_eq!(lsid.as_deref(), Some(Fixture::RUFUS));
        assert!(fx
            .searcher
            .search_for_lsid("Nonexistus nullus", None, None, false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lsid_by_classification() {
        let fx = Fixture::standard();
        let cl = Classification::new()
            .with(RankType::Genus, "Macropus")
            .with(RankType::Species, "Macropus giganteus");
        let lsid = fx.searcher.search_for_lsid_by_classification(&cl, false).unwrap();
        assert_eq!(lsid.as_deref(), Some(Fixture::GIGANTEUS));
    }

    #[test]
    fn test_refresh_sees_new_generation() {
        let fx = Fixture::standard();
        assert!(!fx.searcher.refresh().unwrap());
        assert!(fx.searcher.search_for_record("Wallabia bicolor", None, None, false).unwrap().is_none());

        let mut writer = IndexWriter::open(&IndexKind::Primary.path_in(fx.dir.path())).unwrap();
        writer
            .add_document(
                &Document::new()
                    .with(field::ID, "50")
                    .with(field::LSID, "urn:lsid:example:wallabia-bicolor")
                    .with(field::NAME, "Wallabia bicolor")
                    .with(field::RANK, "species")
                    .with(field::RANK_ID, "7000"),
            )
            .unwrap();
        writer.commit().unwrap();

        assert!(fx.searcher.refresh().unwrap());
        let hit = fx
            .searcher
            .search_for_record("Wallabia bicolor", None, None, false)
            .unwrap()
            .unwrap();
        assert_eq!(hit.match_type(), MatchType::Exact);
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let fx = Fixture::standard();
        let requests: Vec<ResolveRequest> = serde_json::from_str(
            r#"[
                {"name": "Macropus rufus"},
                {"name": "Agathis"},
                {"classification": {"genus": "Macropus", "species": "Macropus unknownus"}, "recursive": true},
                {"name": "Makropus rufa", "fuzzy": true}
            ]"#,
        )
        .unwrap();
        let results = fx.searcher.resolve_batch(&requests).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().as_ref().unwrap().lsid(), Some(Fixture::RUFUS));
        assert_eq!(results[1].as_ref().unwrap_err().kind(), "ambiguous_homonym");
        let recursive = results[2].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(recursive.match_type(), MatchType::Recursive);
        assert_eq!(recursive.lsid(), Some(Fixture::MACROPUS));
        assert_eq!(
            results[3].as_ref().unwrap().as_ref().unwrap().match_type(),
            MatchType::Soundex
        );
    }

    #[test]
    fn test_batch_updates_classifications() {
        let fx = Fixture::standard();
        let mut batch = vec![
            Classification {
                kid: Some("10".into()),
                ..Classification::default()
            },
            Classification {
                gid: Some("3".into()),
                sid: Some("1".into()),
                ..Classification::default()
            },
        ];
        fx.searcher.update_classifications_with_guid(&mut batch).unwrap();
        assert_eq!(batch[0].kid.as_deref(), Some(Fixture::ANIMALIA));
        assert_eq!(batch[1].gid.as_deref(), Some(Fixture::MACROPUS));
        assert_eq!(batch[1].sid.as_deref(), Some(Fixture::RUFUS));
    }

    #[test]
    fn test_unknown_level_ids_survive_guid_update() {
        let fx = Fixture::standard();
        let mut cl = Classification {
            kid: Some("10".into()),
            oid: Some("no-such-order".into()),
            sid: Some("12345".into()),
            ..Classification::default()
        };
        fx.searcher.update_classification_with_guid(&mut cl).unwrap();
        assert_eq!(cl.kid.as_deref(), Some(Fixture::ANIMALIA));
        assert_eq!(cl.oid.as_deref(), Some("no-such-order"));
        assert_eq!(cl.sid.as_deref(), Some("12345"));

        let mut batch = vec![cl.clone(), Classification::default()];
        fx.searcher.update_classifications_with_guid(&mut batch).unwrap();
        assert_eq!(batch[0], cl);
        assert_eq!(batch[1], Classification::default());
    }

    #[test]
    fn test_red_kangaroo_through_facade() {
        let fx = Fixture::standard();
        assert_eq!(
            fx.searcher.search_for_lsid_common_name("Red Kangaroo").unwrap().as_deref(),
            Some(Fixture::GIGANTEUS)
        );
        let hit = fx.searcher.search_for_common_name("red kangaroo").unwrap().unwrap();
        assert_eq!(hit.match_type(), MatchType::Vernacular);
    }
}
