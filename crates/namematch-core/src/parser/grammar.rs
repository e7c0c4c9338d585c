//! Regex-driven grammar for scientific names.
//!
//! Recognises, in order: doubtful names (`?`), phrase names anchored on a
//! voucher, hybrid formulae, cultivars, `cf.`/`aff.` qualified names and
//! plain scientific names with optional subgenus, rank markers and
//! authorship.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{MatchError, MatchResult};
use crate::parser::normalize::{clean_phrase, clean_voucher, normalize_whitespace};
use crate::parser::parsed_name::{NameParser, NameParts, ParsedName, PhraseName};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<genus>[A-Z][a-zëïöü\-]+)(?:\s+(?P<epithet>[a-zëïöü\-]+))?\s+(?P<marker>sp|subsp|ssp|var)\.?\s+(?P<phrase>[A-Z0-9'"‘].*?)\s*(?:\((?P<voucher>[^()]+)\))?$"#,
    )
    .unwrap()
});

static HYBRID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s[×xX]\s").unwrap());

static CULTIVAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<base>[A-Za-z×].*?)\s+(?:['‘"](?P<quoted>[^'’"]+)['’"]|cv\.?\s+(?P<cv>.+))$"#,
    )
    .unwrap()
});

static INFORMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(?:cf|aff)\.?(?:\s|$)").unwrap());

static GENUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÆŒæœ][A-Za-zäëïöüéæœ\-]+$").unwrap());

static EPITHET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zäëïöüéæœ][a-zäëïöüéæœ\-]+$").unwrap());

static SUBGENUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([A-Z][a-zëïöü]+\)$").unwrap());

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}[a-z]?$").unwrap());

/// Lower-case words that belong to authorships, never to epithets.
const AUTHOR_PARTICLES: &[&str] = &[
    "ex", "et", "in", "and", "&", "al", "al.", "de", "del", "der", "den", "van", "von", "du",
    "da", "la", "le", "f.", "fil.", "d'",
];

// ---------------------------------------------------------------------------
// Token helpers
// ---------------------------------------------------------------------------

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn species_marker(token: &str) -> Option<&'static str> {
    match token {
        "sp" | "sp." => Some("sp."),
        "spp" | "spp." => Some("spp."),
        _ => None,
    }
}

fn infra_marker(token: &str) -> Option<&'static str> {
    match token.trim_end_matches('.').to_lowercase().as_str() {
        "subsp" | "ssp" => Some("subsp."),
        "var" | "nothovar" => Some("var."),
        "f" | "fo" | "forma" => Some("f."),
        "subvar" => Some("subvar."),
        "infrasp" => Some("infrasp."),
        _ => None,
    }
}

fn epithet(token: &str) -> Option<String> {
    let word = token.trim_start_matches('×');
    if EPITHET_RE.is_match(word) && !AUTHOR_PARTICLES.contains(&word) {
        Some(word.to_string())
    } else {
        None
    }
}

fn is_author_token(token: &str) -> bool {
    let core = token.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | ',' | ';'));
    if core.is_empty() || AUTHOR_PARTICLES.contains(&core) || YEAR_RE.is_match(core) {
        return true;
    }
    core.chars().next().is_some_and(char::is_uppercase)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Default [`NameParser`] used by the engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScientificNameParser;

impl ScientificNameParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_structure(&self, name: &str) -> Result<ParsedName, String> {
        if let Some(caps) = PHRASE_RE.captures(name) {
            let marker = format!("{}.", &caps["marker"]).replace("ssp.", "subsp.");
            let mut parts = NameParts::uninomial(&caps["genus"]);
            parts.specific_epithet = caps.name("epithet").map(|m| m.as_str().to_string());
            parts.rank_marker = Some(marker);
            let phrase = caps["phrase"].trim().to_string();
            let voucher = caps.name("voucher").map(|m| m.as_str().trim().to_string());
            return Ok(ParsedName::Phrase(PhraseName {
                parts,
                clean_phrase: clean_phrase(&phrase),
                clean_voucher: voucher.as_deref().map(clean_voucher),
                phrase,
                voucher,
            }));
        }

        if let Some(m) = HYBRID_RE.find(name) {
            let parts = parse_parts(&name[..m.start()])?;
            return Ok(ParsedName::Hybrid(parts));
        }

        if let Some(caps) = CULTIVAR_RE.captures(name) {
            let cultivar = caps
                .name("quoted")
                .or_else(|| caps.name("cv"))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let parts = parse_parts(&caps["base"])?;
            return Ok(ParsedName::Cultivar { parts, cultivar });
        }

        if INFORMAL_RE.is_match(name) {
            let stripped = normalize_whitespace(&INFORMAL_RE.replace_all(name, " "));
            return Ok(ParsedName::Informal(parse_parts(&stripped)?));
        }

        parse_parts(name).map(ParsedName::Scientific)
    }
}

fn parse_parts(name: &str) -> Result<NameParts, String> {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return Err("no genus or higher taxon".to_string());
    };
    let genus = first.trim_start_matches('×');
    if !GENUS_RE.is_match(genus) {
        return Err(format!("'{first}' is not a genus or higher taxon"));
    }
    let mut parts = NameParts::uninomial(&capitalize(genus));
    let rest = &tokens[1..];
    let mut i = 0;

    if rest.first().is_some_and(|t| SUBGENUS_RE.is_match(t)) {
        parts.infrageneric = Some(rest[0].trim_matches(|c| c == '(' || c == ')').to_string());
        i += 1;
    }

    if let Some(token) = rest.get(i) {
        if let Some(marker) = species_marker(token) {
            parts.rank_marker = Some(marker.to_string());
            i += 1;
        } else if let Some(specific) = epithet(token) {
            parts.specific_epithet = Some(specific);
            i += 1;
            // A marked infraspecific epithet may follow the species authorship.
            if let Some(j) = (i..rest.len()).find(|&j| infra_marker(rest[j]).is_some()) {
                if let Some(infra) = rest.get(j + 1).and_then(|t| epithet(t)) {
                    parts.rank_marker = infra_marker(rest[j]).map(str::to_string);
                    parts.infraspecific_epithet = Some(infra);
                    i = j + 2;
                }
            }
            if parts.infraspecific_epithet.is_none() {
                if let Some(infra) = rest.get(i).and_then(|t| epithet(t)) {
                    parts.infraspecific_epithet = Some(infra);
                    i += 1;
                }
            }
        }
    }

    let authorship = rest[i..].join(" ");
    parts.authors_parsed = rest[i..].iter().all(|t| is_author_token(t));
    if !authorship.is_empty() {
        parts.authorship = Some(authorship);
    }
    Ok(parts)
}

impl NameParser for ScientificNameParser {
    fn parse(&self, raw: &str) -> MatchResult<ParsedName> {
        let unparsable = |reason: String| MatchError::Unparsable {
            name: raw.to_string(),
            reason,
        };
        let mut name = normalize_whitespace(raw);
        if name.is_empty() {
            return Err(unparsable("empty name".to_string()));
        }
        let doubtful = name.contains('?');
        if doubtful {
            name = normalize_whitespace(&name.replace('?', " "));
        }
        let parsed = self.parse_structure(&name).map_err(unparsable)?;
        Ok(if doubtful {
            ParsedName::Doubtful(parsed.into_parts())
        } else {
            parsed
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
