//! String normalisation shared by the parser, the pipeline and the lookups.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Qualifiers that never take part in matching (virus naming noise).
static STOP_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" virus| ictv| ICTV").unwrap());

/// Letters kept in a vernacular lookup key besides A-Z and 0-9.
const VERNACULAR_EXTRA: &str = "ÏËÖÜÄÉÈČÁÀÆŒ";

pub fn normalize_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

/// Replace stop tokens with a space and trim.
pub fn strip_stop_tokens(name: &str) -> String {
    STOP_TOKEN_RE.replace_all(name, " ").trim().to_string()
}

/// Key under which a common name is stored in the vernacular index.
pub fn vernacular_key(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || VERNACULAR_EXTRA.contains(*c))
        .collect()
}

pub fn clean_voucher(voucher: &str) -> String {
    voucher
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | '&' | '.'))
        .collect()
}

pub fn clean_phrase(phrase: &str) -> String {
    let stripped: String = phrase
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '.' | '‘' | '’'))
        .collect();
    normalize_whitespace(&stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_tokens_removed() {
        assert_eq!(strip_stop_tokens("Tomato spotted wilt virus"), "Tomato spotted wilt");
        assert_eq!(strip_stop_tokens("Banana bunchy top ICTV"), "Banana bunchy top");
        assert_eq!(strip_stop_tokens("  Macropus rufus "), "Macropus rufus");
    }

    #[test]
    fn test_vernacular_key() {
        assert_eq!(vernacular_key("Red Kangaroo"), "REDKANGAROO");
        assert_eq!(vernacular_key("Crêpe-myrtle (tree) 2"), "CRPEMYRTLETREE2");
        assert_eq!(vernacular_key("Émeu"), "ÉMEU");
    }

    #[test]
    fn test_voucher_and_phrase_cleaning() {
        assert_eq!(clean_voucher("E.A. Griffin 1022"), "EAGriffin1022");
        assert_eq!(clean_voucher("Smith & Jones, 12"), "SmithJones12");
        assert_eq!(clean_phrase("'Mt. Lesueur'"), "Mt Lesueur");
    }
}
