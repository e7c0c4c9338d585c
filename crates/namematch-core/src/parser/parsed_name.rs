//! Structured result of parsing a scientific name.

use serde::Serialize;

use crate::errors::MatchResult;

/// The structural pieces every parse outcome shares.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NameParts {
    pub genus_or_above: String,
    /// Subgenus written in parentheses after the genus.
    pub infrageneric: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    /// Marker such as `sp.`, `subsp.` or `var.`, always with a trailing dot.
    pub rank_marker: Option<String>,
    pub authorship: Option<String>,
    /// False when trailing text could not be read as an authorship.
    pub authors_parsed: bool,
}

impl NameParts {
    pub fn uninomial(genus: &str) -> Self {
        Self {
            genus_or_above: genus.to_string(),
            authors_parsed: true,
            ..Self::default()
        }
    }

    /// Genus, specific and infraspecific epithets without markers or authors.
    pub fn canonical_name(&self) -> String {
        let mut canonical = self.genus_or_above.clone();
        for part in [&self.specific_epithet, &self.infraspecific_epithet]
            .into_iter()
            .flatten()
        {
            canonical.push(' ');
            canonical.push_str(part);
        }
        canonical
    }

    pub fn is_binomial(&self) -> bool {
        !self.genus_or_above.is_empty() && self.specific_epithet.is_some()
    }
}

/// An informal name anchored to a voucher specimen, e.g.
/// `Astroloma sp. Cataby (E.A.Griffin 1022)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PhraseName {
    pub parts: NameParts,
    pub phrase: String,
    pub voucher: Option<String>,
    /// Phrase as stored in the index: no quotes, dots or repeated spaces.
    pub clean_phrase: String,
    /// Voucher as stored in the index: no spaces, commas, ampersands or dots.
    pub clean_voucher: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameType {
    WellFormed,
    Cultivar,
    Phrase,
    Informal,
    Doubtful,
    Hybrid,
}

/// Every successful parse outcome.  Ungrammatical input is reported as
/// [`crate::errors::MatchError::Unparsable`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParsedName {
    Scientific(NameParts),
    Cultivar { parts: NameParts, cultivar: String },
    Phrase(PhraseName),
    /// Carries a `cf.` or `aff.` qualifier.
    Informal(NameParts),
    /// Carries a `?` somewhere in the name.
    Doubtful(NameParts),
    /// A hybrid formula; parts describe the first parent.
    Hybrid(NameParts),
}

impl ParsedName {
    pub fn parts(&self) -> &NameParts {
        match self {
            ParsedName::Scientific(parts)
            | ParsedName::Informal(parts)
            | ParsedName::Doubtful(parts)
            | ParsedName::Hybrid(parts) => parts,
            ParsedName::Cultivar { parts, .. } => parts,
            ParsedName::Phrase(phrase) => &phrase.parts,
        }
    }

    pub fn into_parts(self) -> NameParts {
        match self {
            ParsedName::Scientific(parts)
            | ParsedName::Informal(parts)
            | ParsedName::Doubtful(parts)
            | ParsedName::Hybrid(parts) => parts,
            ParsedName::Cultivar { parts, .. } => parts,
            ParsedName::Phrase(phrase) => phrase.parts,
        }
    }

    pub fn name_type(&self) -> NameType {
        match self {
            ParsedName::Scientific(_) => NameType::WellFormed,
            ParsedName::Cultivar { .. } => NameType::Cultivar,
            ParsedName::Phrase(_) => NameType::Phrase,
            ParsedName::Informal(_) => NameType::Informal,
            ParsedName::Doubtful(_) => NameType::Doubtful,
            ParsedName::Hybrid(_) => NameType::Hybrid,
        }
    }

    pub fn canonical_name(&self) -> String {
        self.parts().canonical_name()
    }

    pub fn is_binomial(&self) -> bool {
        self.parts().is_binomial()
    }

    pub fn genus_or_above(&self) -> &str {
        &self.parts().genus_or_above
    }

    pub fn specific_epithet(&self) -> Option<&str> {
        self.parts().specific_epithet.as_deref()
    }

    pub fn infraspecific_epithet(&self) -> Option<&str> {
        self.parts().infraspecific_epithet.as_deref()
    }

    pub fn rank_marker(&self) -> Option<&str> {
        self.parts().rank_marker.as_deref()
    }

    pub fn cultivar(&self) -> Option<&str> {
        match self {
            ParsedName::Cultivar { cultivar, .. } => Some(cultivar),
            _ => None,
        }
    }

    pub fn authors_parsed(&self) -> bool {
        self.parts().authors_parsed
    }

    /// Hybrid formulae have no single canonical form.
    pub fn is_parsable_type(&self) -> bool {
        !matches!(self, ParsedName::Hybrid(_))
    }

    pub fn is_informal_or_doubtful(&self) -> bool {
        matches!(self, ParsedName::Informal(_) | ParsedName::Doubtful(_))
    }

    /// `sp.` stands in for an unnamed species, so there is no real epithet.
    pub fn marks_unspecified_species(&self) -> bool {
        self.rank_marker() == Some("sp.")
    }
}

/// The scientific-name grammar consumed by the engine.
pub trait NameParser: Send + Sync {
    fn parse(&self, raw: &str) -> MatchResult<ParsedName>;

    /// Canonical form of `raw`, or `None` when it cannot be parsed.
    fn canonicalize(&self, raw: &str) -> Option<String> {
        self.parse(raw).ok().map(|pn| pn.canonical_name())
    }
}
