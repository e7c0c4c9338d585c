//! Phonetic normalisation of genus and epithet words for fuzzy matching.
//!
//! Equates letters that are commonly confused in taxon names (AE/OE/E/I/U/Y,
//! IA/A, K/C, Z/C, SC/S), drops H, collapses doubled letters, and for
//! epithets folds the common Latin endings onto `A`.  The leading letter is
//! kept apart from the substitutions.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordType {
    Genus,
    Species,
}

/// Leading digraphs rewritten before anything else.
const LEADING: &[(&str, &str)] = &[
    ("AE", "E"),
    ("CN", "N"),
    ("CT", "T"),
    ("CZ", "C"),
    ("DJ", "J"),
    ("EA", "E"),
    ("EU", "U"),
    ("GN", "N"),
    ("KN", "N"),
    ("MC", "MAC"),
    ("MN", "N"),
    ("OE", "E"),
    ("QU", "Q"),
    ("PS", "S"),
    ("PT", "T"),
    ("TS", "S"),
    ("WR", "R"),
    ("X", "Z"),
];

/// Applied in order to everything after the leading letter.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("AE", "I"),
    ("IA", "A"),
    ("OE", "I"),
    ("OI", "A"),
    ("SC", "S"),
    ("E", "I"),
    ("O", "A"),
    ("U", "I"),
    ("Y", "I"),
    ("K", "C"),
    ("Z", "C"),
    ("H", ""),
];

/// Upper-case, fold accents, keep only A-Z.
pub fn normalize(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for c in word.chars().flat_map(char::to_uppercase) {
        match c {
            'A'..='Z' => out.push(c),
            'Æ' => out.push_str("AE"),
            'Œ' => out.push_str("OE"),
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => out.push('A'),
            'Ç' | 'Č' => out.push('C'),
            'È' | 'É' | 'Ê' | 'Ë' => out.push('E'),
            'Ì' | 'Í' | 'Î' | 'Ï' => out.push('I'),
            'Ñ' => out.push('N'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => out.push('O'),
            'Ù' | 'Ú' | 'Û' | 'Ü' => out.push('U'),
            'Ý' => out.push('Y'),
            _ => {}
        }
    }
    out
}

fn collapse_repeats(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last = None;
    for c in value.chars() {
        if Some(c) != last {
            out.push(c);
        }
        last = Some(c);
    }
    out
}

/// Sounds-like code for one word of a name.  Empty when the word has no
/// Latin letters.
pub fn treat_word(word: &str, word_type: WordType) -> String {
    let mut temp = normalize(word);
    if temp.is_empty() {
        return temp;
    }

    if let Some((prefix, replacement)) = LEADING.iter().find(|(p, _)| temp.starts_with(p)) {
        temp = format!("{replacement}{}", &temp[prefix.len()..]);
    }

    // Letters are ASCII from here on, so byte slicing is safe.
    let (lead, rest) = temp.split_at(1);
    let mut rest = rest.to_string();
    for (from, to) in SUBSTITUTIONS {
        rest = rest.replace(from, to);
    }
    let mut code = collapse_repeats(&format!("{lead}{rest}"));

    if word_type == WordType::Species {
        for ending in ["IS", "IM", "AS"] {
            if code.len() > ending.len() && code.ends_with(ending) {
                code.truncate(code.len() - ending.len());
                code.push('A');
                break;
            }
        }
    }
    code
}
