//! Track-name folding for fuzzy lookup.
//!
//! Exact seed lookup is case-sensitive and never goes through here; these
//! keys are only used to rank "did you mean" suggestions.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Suffix cleanup patterns (applied in order).
pub static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Featured artists: "(feat. Artist)", "[ft. Someone]"
        Regex::new(r"(?i)\s*[\(\[](?:feat\.?|ft\.?|featuring|with)\s+[^)\]]+[\)\]]").unwrap(),
        // Feat without brackets: "Song feat. Artist"
        Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s+.+$").unwrap(),
        // Remaster variants: "- Remastered 2021", "(2011 Remaster)"
        Regex::new(r"(?i)\s*[-–—/]\s*(?:remaster(?:ed)?(?:\s+\d{4})?|(?:\d{4}\s+)?remaster(?:ed)?)").unwrap(),
        Regex::new(r"(?i)\s*[\(\[](?:remaster(?:ed)?(?:\s+\d{4})?|(?:\d{4}\s+)?remaster(?:ed)?)[\)\]]").unwrap(),
        // Version markers: "(Radio Edit)", "- Single Version", "(Mono)"
        Regex::new(r"(?i)\s*[\(\[](?:radio\s+edit|single\s+version|album\s+version|mono|stereo)[\)\]]").unwrap(),
        Regex::new(r#"(?i)\s*[-–—]\s*(?:single|lp|radio)\s+(?:version|edit)\s*$"#).unwrap(),
    ]
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// FOLDING
// ============================================================================

pub fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' |
             '\u{1DC0}'..='\u{1DFF}' | '\u{20D0}'..='\u{20FF}' |
             '\u{FE20}'..='\u{FE2F}')
}

/// Strip diacritics and transliterate to lowercase ASCII.
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Unify typographic quotes and the "&" / "and" spelling.
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}', '\u{00B4}', '\u{0060}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(" & ", " and ")
}

/// Build the folded search key for a track name.
pub fn search_key(name: &str) -> String {
    let mut s = normalize_punctuation(name);
    for pattern in NAME_PATTERNS.iter() {
        s = pattern.replace_all(&s, "").to_string();
    }
    let folded = fold_to_ascii(&s);
    WHITESPACE.replace_all(folded.trim(), " ").to_string()
}
