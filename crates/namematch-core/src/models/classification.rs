//! Linnaean classification descriptor and the name/rank derivation rules
//! built on it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::RankType;
use crate::parser::{NameParser, ParsedName};
use crate::query::builder::Clause;
use crate::store::index::Document;
use crate::store::schema::field;

/// Ranks whose names are carried as query constraints, most general first.
const CONSTRAINT_RANKS: [RankType; 7] = RankType::MAJOR;

/// Hierarchy descriptor supplied by callers and returned inside results.
/// Every level is optional.  `*_id` values are opaque record identifiers
/// that [`crate::NameSearcher::update_classification_with_guid`] replaces
/// with LSIDs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    #[serde(rename = "class")]
    pub klass: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub specific_epithet: Option<String>,
    pub subspecies: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub scientific_name: Option<String>,
    pub authorship: Option<String>,
    pub kid: Option<String>,
    pub pid: Option<String>,
    pub cid: Option<String>,
    pub oid: Option<String>,
    pub fid: Option<String>,
    pub gid: Option<String>,
    pub sid: Option<String>,
}

/// Name and rank derived from a classification.  `name` is `None` when the
/// populated levels cannot be assembled into a searchable name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Derivation {
    pub name: Option<String>,
    pub rank: Option<RankType>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `sp`, `sp.`, `spp` and `spp.` stand for an unnamed taxon, not an epithet.
pub fn is_rank_marker(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim().to_lowercase();
        matches!(v.as_str(), "sp" | "sp." | "spp" | "spp.")
    })
}

impl Classification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Classification::set_at`].
    pub fn with(mut self, rank: RankType, value: &str) -> Self {
        self.set_at(rank, Some(value.to_string()));
        self
    }

    pub fn with_scientific_name(mut self, name: &str) -> Self {
        self.scientific_name = Some(name.to_string());
        self
    }

    fn slot(&self, rank: RankType) -> Option<&Option<String>> {
        match rank {
            RankType::Kingdom => Some(&self.kingdom),
            RankType::Phylum => Some(&self.phylum),
            RankType::Class => Some(&self.klass),
            RankType::Order => Some(&self.order),
            RankType::Family => Some(&self.family),
            RankType::Genus => Some(&self.genus),
            RankType::Species => Some(&self.species),
            RankType::Subspecies => Some(&self.subspecies),
            _ => None,
        }
    }

    fn slot_mut(&mut self, rank: RankType) -> Option<&mut Option<String>> {
        match rank {
            RankType::Kingdom => Some(&mut self.kingdom),
            RankType::Phylum => Some(&mut self.phylum),
            RankType::Class => Some(&mut self.klass),
            RankType::Order => Some(&mut self.order),
            RankType::Family => Some(&mut self.family),
            RankType::Genus => Some(&mut self.genus),
            RankType::Species => Some(&mut self.species),
            RankType::Subspecies => Some(&mut self.subspecies),
            _ => None,
        }
    }

    /// Populated, trimmed value at `rank`.  Only the principal ranks and
    /// subspecies have a slot.
    pub fn value_at(&self, rank: RankType) -> Option<&str> {
        self.slot(rank).and_then(non_blank)
    }

    pub fn set_at(&mut self, rank: RankType, value: Option<String>) {
        if let Some(slot) = self.slot_mut(rank) {
            *slot = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        CONSTRAINT_RANKS
            .iter()
            .chain([RankType::Subspecies].iter())
            .all(|r| self.value_at(*r).is_none())
            && non_blank(&self.specific_epithet).is_none()
            && non_blank(&self.infraspecific_epithet).is_none()
    }

    /// Level identifiers, most general first.
    pub(crate) fn level_ids_mut(&mut self) -> [&mut Option<String>; 7] {
        [
            &mut self.kid,
            &mut self.pid,
            &mut self.cid,
            &mut self.oid,
            &mut self.fid,
            &mut self.gid,
            &mut self.sid,
        ]
    }

    /// A species epithet (or species name) that is not just a marker.
    pub(crate) fn has_real_species(&self) -> bool {
        let marker = is_rank_marker(self.value_at(RankType::Species));
        !marker
            && (non_blank(&self.specific_epithet).is_some()
                || self.value_at(RankType::Species).is_some())
    }

    /// Species name, assembled from genus and epithet when needed.
    pub(crate) fn species_name(&self) -> Option<String> {
        if let Some(species) = self.value_at(RankType::Species) {
            return Some(species.to_string());
        }
        match (self.value_at(RankType::Genus), non_blank(&self.specific_epithet)) {
            (Some(genus), Some(epithet)) => Some(format!("{genus} {epithet}")),
            _ => None,
        }
    }

    /// Pick the most specific populated level as the name to search for.
    pub fn derive_name_and_rank(&self) -> Derivation {
        let genus = self.value_at(RankType::Genus);
        let specific = non_blank(&self.specific_epithet);
        let infra = non_blank(&self.infraspecific_epithet);
        let subspecies = self.value_at(RankType::Subspecies);
        let species = self.value_at(RankType::Species);

        // A marker in either infraspecific slot means no infraspecific name.
        if infra.is_some() && !is_rank_marker(infra) && !is_rank_marker(subspecies) {
            let name = match (genus, specific, infra) {
                (Some(g), Some(s), Some(i)) => Some(format!("{g} {s} {i}")),
                _ => None,
            };
            return Derivation {
                name,
                rank: Some(RankType::Subspecies),
            };
        }
        if subspecies.is_some() && !is_rank_marker(subspecies) {
            return Derivation {
                name: subspecies.map(str::to_string),
                rank: Some(RankType::Subspecies),
            };
        }
        if specific.is_some() && !is_rank_marker(specific) && !is_rank_marker(species) {
            return Derivation {
                name: genus.zip(specific).map(|(g, s)| format!("{g} {s}")),
                rank: Some(RankType::Species),
            };
        }
        if let Some(species) = species.filter(|s| !is_rank_marker(Some(s))) {
            let name = if species.contains(' ') {
                Some(species.to_string())
            } else {
                genus.map(|g| format!("{g} {species}"))
            };
            return Derivation {
                name,
                rank: Some(RankType::Species),
            };
        }
        for rank in [
            RankType::Genus,
            RankType::Family,
            RankType::Order,
            RankType::Class,
            RankType::Phylum,
            RankType::Kingdom,
        ] {
            if let Some(value) = self.value_at(rank) {
                return Derivation {
                    name: Some(value.to_string()),
                    rank: Some(rank),
                };
            }
        }
        Derivation::default()
    }

    /// Infer the rank of a caller-supplied `name` against this
    /// classification.  May rewrite `name` (trailing `sp.` or doubtful names
    /// under recursive matching) and fill in a missing genus or species.
    pub fn infer_rank(
        &mut self,
        name: &mut String,
        parser: &dyn NameParser,
        recursive: bool,
    ) -> Option<RankType> {
        for rank in [
            RankType::Subspecies,
            RankType::Species,
            RankType::Genus,
            RankType::Family,
            RankType::Order,
            RankType::Class,
            RankType::Phylum,
            RankType::Kingdom,
        ] {
            if self
                .value_at(rank)
                .is_some_and(|v| v.eq_ignore_ascii_case(name.trim()))
            {
                return Some(rank);
            }
        }

        if recursive && (name.ends_with(" sp") || name.ends_with(" sp.")) {
            if let Some(idx) = name.rfind(' ') {
                name.truncate(idx);
                self.genus = Some(name.clone());
            }
        }

        let parsed = match parser.parse(name) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(name = %name, error = %err, "rank inference skipped");
                return None;
            }
        };
        if recursive && matches!(parsed, ParsedName::Doubtful(_)) {
            *name = parsed.genus_or_above().to_string();
        }
        if !parsed.is_binomial() {
            return None;
        }
        if self.value_at(RankType::Genus).is_none() {
            self.genus = Some(parsed.genus_or_above().to_string());
        }
        if parsed.cultivar().is_some() {
            return Some(RankType::Cultivar);
        }
        if parsed.rank_marker().is_some() || !parsed.is_parsable_type() {
            return None;
        }
        if parsed.infraspecific_epithet().is_some() {
            if self.value_at(RankType::Species).is_none() {
                self.species = parsed
                    .specific_epithet()
                    .map(|sp| format!("{} {sp}", parsed.genus_or_above()));
            }
            return Some(RankType::Subspecies);
        }
        Some(RankType::Species)
    }

    /// One term clause per populated principal level.
    pub fn constraint_clauses(&self) -> Vec<Clause> {
        CONSTRAINT_RANKS
            .iter()
            .filter_map(|rank| {
                self.value_at(*rank)
                    .filter(|v| !v.contains('"'))
                    .map(|v| Clause::term(rank.as_str(), v))
            })
            .collect()
    }

    /// True when `other` agrees with every level of this classification
    /// from kingdom down to `level`.  Levels missing here are not compared.
    pub fn has_identical_classification(&self, other: &Classification, level: RankType) -> bool {
        CONSTRAINT_RANKS
            .iter()
            .take_while(|rank| **rank <= level)
            .all(|rank| match self.value_at(*rank) {
                None => true,
                Some(mine) => other
                    .value_at(*rank)
                    .is_some_and(|theirs| theirs.eq_ignore_ascii_case(mine)),
            })
    }

    /// Classification stored on an index record.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            kingdom: doc.get_owned(field::KINGDOM),
            phylum: doc.get_owned(field::PHYLUM),
            klass: doc.get_owned(field::CLASS),
            order: doc.get_owned(field::ORDER),
            family: doc.get_owned(field::FAMILY),
            genus: doc.get_owned(field::GENUS),
            species: doc.get_owned(field::SPECIES),
            specific_epithet: doc.get_owned(field::SPECIFIC),
            subspecies: None,
            infraspecific_epithet: doc.get_owned(field::INFRA),
            scientific_name: doc.get_owned(field::NAME),
            authorship: doc.get_owned(field::AUTHOR),
            kid: doc.get_owned(field::KINGDOM_ID),
            pid: doc.get_owned(field::PHYLUM_ID),
            cid: doc.get_owned(field::CLASS_ID),
            oid: doc.get_owned(field::ORDER_ID),
            fid: doc.get_owned(field::FAMILY_ID),
            gid: doc.get_owned(field::GENUS_ID),
            sid: doc.get_owned(field::SPECIES_ID),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for rank in CONSTRAINT_RANKS {
            if let Some(value) = self.value_at(rank) {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{rank}={value}")?;
                first = false;
            }
        }
        if first {
            f.write_str("<empty>")?;
        }
        Ok(())
    }
}
