//! Query text sanitization
//!
//! Kiosk input is free text from an on-screen keyboard. Before it reaches the
//! full-text index, characters with meaning in the FTS5 query syntax are
//! replaced with spaces and bare boolean operators are dropped, so every
//! remaining word is matched literally as a prefix.

use regex::Regex;
use std::sync::OnceLock;

/// Characters with special meaning in FTS5 query syntax
static SPECIAL_CHARS: OnceLock<Option<Regex>> = OnceLock::new();

/// Operators FTS5 recognises when written in upper case
const BARE_OPERATORS: [&str; 4] = ["AND", "OR", "NOT", "NEAR"];

fn special_chars() -> Option<&'static Regex> {
    SPECIAL_CHARS
        .get_or_init(|| Regex::new(r#"["*()\[\]{}:^+~<>=|\\/;,\-]|\p{Cc}"#).ok())
        .as_ref()
}

/// Replace everything but word characters, apostrophes and whitespace
fn strip_special(raw: &str) -> String {
    match special_chars() {
        Some(pattern) => pattern.replace_all(raw, " ").into_owned(),
        None => raw
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '\'' || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect(),
    }
}

/// Query text reduced to literal search terms
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SanitizedText {
    /// Lowercased words, in input order
    pub terms: Vec<String>,
}

impl SanitizedText {
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_special(raw);
        let terms = cleaned
            .split_whitespace()
            .filter(|word| !BARE_OPERATORS.contains(word))
            .map(str::to_lowercase)
            .collect();
        Self { terms }
    }

    /// No terms left: the query matches every record honoring the filters
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms joined by single spaces; the substring the fallback scans for
    pub fn phrase(&self) -> String {
        self.terms.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_characters_become_separators() {
        let text = SanitizedText::parse("law*(review) \"castilla\":1990");
        assert_eq!(text.terms, vec!["law", "review", "castilla", "1990"]);
    }

    #[test]
    fn test_bare_operators_are_dropped_but_words_kept() {
        let text = SanitizedText::parse("law AND review NEAR and notes");
        assert_eq!(text.terms, vec!["law", "review", "and", "notes"]);
    }

    #[test]
    fn test_whitespace_is_collapsed_and_case_folded() {
        let text = SanitizedText::parse("  Maria\t  CASTILLA \n");
        assert_eq!(text.phrase(), "maria castilla");
    }

    #[test]
    fn test_apostrophes_survive() {
        let text = SanitizedText::parse("O'Brien");
        assert_eq!(text.terms, vec!["o'brien"]);
    }

    #[test]
    fn test_only_syntax_means_match_all() {
        assert!(SanitizedText::parse("\"*()\" - OR").is_empty());
        assert!(SanitizedText::parse("").is_empty());
    }
}
