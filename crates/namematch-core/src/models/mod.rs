//! Shared typed models used across the parser, store, and query layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod classification;
pub mod result;

pub use classification::{Classification, Derivation};
pub use result::NameSearchResult;

// ---------------------------------------------------------------------------
// RankType
// ---------------------------------------------------------------------------

/// Taxonomic ranks, declared from most general to most specific so that the
/// derived ordering agrees with [`RankType::id`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankType {
    Kingdom,
    Subkingdom,
    Phylum,
    Subphylum,
    Class,
    Subclass,
    Order,
    Suborder,
    Superfamily,
    Family,
    Subfamily,
    Tribe,
    Genus,
    Subgenus,
    Species,
    #[serde(rename = "infraspecificname")]
    InfraspecificName,
    Subspecies,
    Variety,
    Form,
    Cultivar,
}

impl RankType {
    pub const ALL: [RankType; 20] = [
        RankType::Kingdom,
        RankType::Subkingdom,
        RankType::Phylum,
        RankType::Subphylum,
        RankType::Class,
        RankType::Subclass,
        RankType::Order,
        RankType::Suborder,
        RankType::Superfamily,
        RankType::Family,
        RankType::Subfamily,
        RankType::Tribe,
        RankType::Genus,
        RankType::Subgenus,
        RankType::Species,
        RankType::InfraspecificName,
        RankType::Subspecies,
        RankType::Variety,
        RankType::Form,
        RankType::Cultivar,
    ];

    /// The seven principal ranks, most general first.
    pub const MAJOR: [RankType; 7] = [
        RankType::Kingdom,
        RankType::Phylum,
        RankType::Class,
        RankType::Order,
        RankType::Family,
        RankType::Genus,
        RankType::Species,
    ];

    /// Numeric rank id stored in the `rank_id` index field.
    pub fn id(self) -> i64 {
        match self {
            RankType::Kingdom => 1000,
            RankType::Subkingdom => 1200,
            RankType::Phylum => 2000,
            RankType::Subphylum => 2200,
            RankType::Class => 3000,
            RankType::Subclass => 3200,
            RankType::Order => 4000,
            RankType::Suborder => 4200,
            RankType::Superfamily => 4500,
            RankType::Family => 5000,
            RankType::Subfamily => 5500,
            RankType::Tribe => 5700,
            RankType::Genus => 6000,
            RankType::Subgenus => 6500,
            RankType::Species => 7000,
            RankType::InfraspecificName => 8000,
            RankType::Subspecies => 8010,
            RankType::Variety => 8020,
            RankType::Form => 8030,
            RankType::Cultivar => 8050,
        }
    }

    /// Lower-case rank name, also the index field that holds the taxon name
    /// at this rank for the principal ranks.
    pub fn as_str(self) -> &'static str {
        match self {
            RankType::Kingdom => "kingdom",
            RankType::Subkingdom => "subkingdom",
            RankType::Phylum => "phylum",
            RankType::Subphylum => "subphylum",
            RankType::Class => "class",
            RankType::Subclass => "subclass",
            RankType::Order => "order",
            RankType::Suborder => "suborder",
            RankType::Superfamily => "superfamily",
            RankType::Family => "family",
            RankType::Subfamily => "subfamily",
            RankType::Tribe => "tribe",
            RankType::Genus => "genus",
            RankType::Subgenus => "subgenus",
            RankType::Species => "species",
            RankType::InfraspecificName => "infraspecificname",
            RankType::Subspecies => "subspecies",
            RankType::Variety => "variety",
            RankType::Form => "form",
            RankType::Cultivar => "cultivar",
        }
    }

    pub fn from_id(id: i64) -> Option<RankType> {
        RankType::ALL.iter().copied().find(|r| r.id() == id)
    }

    /// Rank implied by a rank marker such as `var.` or `subsp.`.
    pub fn from_marker(marker: &str) -> Option<RankType> {
        let key = marker.trim().trim_end_matches('.').to_lowercase();
        match key.as_str() {
            "sp" | "spp" => Some(RankType::Species),
            "subsp" | "ssp" => Some(RankType::Subspecies),
            "var" | "nothovar" => Some(RankType::Variety),
            "f" | "fo" | "forma" => Some(RankType::Form),
            "cv" => Some(RankType::Cultivar),
            "subg" | "subgen" => Some(RankType::Subgenus),
            "infrasp" => Some(RankType::InfraspecificName),
            _ => None,
        }
    }

    pub fn is_at_or_below_species(self) -> bool {
        self.id() >= RankType::Species.id()
    }
}

impl fmt::Display for RankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        if let Some(rank) = RankType::ALL.iter().copied().find(|r| r.as_str() == key) {
            return Ok(rank);
        }
        RankType::from_marker(&key).ok_or_else(|| format!("unknown rank '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// MatchType
// ---------------------------------------------------------------------------

/// Which stage of matching produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Canonical,
    Phrase,
    Soundex,
    Direct,
    Alternate,
    Searchable,
    Recursive,
    Vernacular,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exactMatch",
            MatchType::Canonical => "canonicalMatch",
            MatchType::Phrase => "phraseMatch",
            MatchType::Soundex => "fuzzyMatch",
            MatchType::Direct => "directMatch",
            MatchType::Alternate => "alternateMatch",
            MatchType::Searchable => "searchableMatch",
            MatchType::Recursive => "higherMatch",
            MatchType::Vernacular => "vernacularMatch",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order_follows_ids() {
        for pair in RankType::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].id() < pair[1].id(), "{} vs {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rank_parse_names_and_markers() {
        assert_eq!("Genus".parse::<RankType>().unwrap(), RankType::Genus);
        assert_eq!("subsp.".parse::<RankType>().unwrap(), RankType::Subspecies);
        assert_eq!("var".parse::<RankType>().unwrap(), RankType::Variety);
        assert!("clade".parse::<RankType>().is_err());
    }

    #[test]
    fn test_species_boundary() {
        assert!(RankType::Species.is_at_or_below_species());
        assert!(RankType::Variety.is_at_or_below_species());
        assert!(!RankType::Genus.is_at_or_below_species());
        assert_eq!(RankType::from_id(6000), Some(RankType::Genus));
    }
}
