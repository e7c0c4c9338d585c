use serde::Serialize;

use crate::models::{Classification, MatchType, RankType};
use crate::store::index::Document;
use crate::store::schema::field;

/// One matched index record.  Built from a hit; only the match type and the
/// clean name are retagged afterwards by the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NameSearchResult {
    id: String,
    lsid: Option<String>,
    accepted_lsid: Option<String>,
    rank: Option<RankType>,
    classification: Classification,
    synonym: bool,
    match_type: MatchType,
    clean_name: Option<String>,
}

impl NameSearchResult {
    pub fn from_document(doc: &Document, match_type: MatchType) -> Self {
        let rank = doc
            .get(field::RANK)
            .and_then(|r| r.parse::<RankType>().ok())
            .or_else(|| {
                doc.get(field::RANK_ID)
                    .and_then(|id| id.parse::<i64>().ok())
                    .and_then(RankType::from_id)
            });
        let accepted_lsid = doc.get_owned(field::ACCEPTED_LSID);
        let synonym = accepted_lsid.is_some() || doc.get(field::IS_SYNONYM) == Some(field::TRUE);
        Self {
            id: doc.get_owned(field::ID).unwrap_or_default(),
            lsid: doc.get_owned(field::LSID),
            accepted_lsid,
            rank,
            classification: Classification::from_document(doc),
            synonym,
            match_type,
            clean_name: None,
        }
    }

    /// Record id in the primary index.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lsid(&self) -> Option<&str> {
        self.lsid.as_deref()
    }

    pub fn accepted_lsid(&self) -> Option<&str> {
        self.accepted_lsid.as_deref()
    }

    /// The accepted concept for synonyms, otherwise the record's own LSID.
    pub fn accepted_or_primary_lsid(&self) -> Option<&str> {
        self.accepted_lsid().or(self.lsid())
    }

    pub fn rank(&self) -> Option<RankType> {
        self.rank
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub(crate) fn classification_mut(&mut self) -> &mut Classification {
        &mut self.classification
    }

    pub fn scientific_name(&self) -> Option<&str> {
        self.classification.scientific_name.as_deref()
    }

    pub fn is_synonym(&self) -> bool {
        self.synonym
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn clean_name(&self) -> Option<&str> {
        self.clean_name.as_deref()
    }

    pub(crate) fn set_match_type(&mut self, match_type: MatchType) {
        self.match_type = match_type;
    }

    pub(crate) fn set_clean_name(&mut self, clean_name: Option<String>) {
        self.clean_name = clean_name;
    }
}
