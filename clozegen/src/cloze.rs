//! Helpers to turn sentences into cloze stems and back.

use lazy_static::lazy_static;
use onig::{Captures, Regex};
use unicode_segmentation::UnicodeSegmentation;

/// The blank inserted in place of the key.
pub const BLANK: &str = "____";

/// Replaces `word` in `sentence` with a blank.
pub fn cloze_sentence(sentence: &str, word: &str) -> String {
    sentence.replace(word, BLANK)
}

/// Fills the blank in a cloze stem with `word`.
pub fn fill_cloze(stem: &str, word: &str) -> String {
    stem.replace(BLANK, word)
}

/// Whether `word` is placed well for a cloze question: it occurs exactly once as a word of the
/// sentence and is neither the first nor the last word.
pub fn is_good_position(sentence: &str, word: &str) -> bool {
    let words: Vec<_> = sentence.unicode_words().collect();
    let positions: Vec<_> = words
        .iter()
        .enumerate()
        .filter(|(_, x)| x.eq_ignore_ascii_case(word))
        .map(|(i, _)| i)
        .collect();

    match positions.as_slice() {
        [i] => *i != 0 && *i != words.len() - 1,
        _ => false,
    }
}

// remove duplicate whitespaces
pub fn normalize_whitespace(string: &str) -> String {
    lazy_static! {
        static ref REGEX: Regex = Regex::new(r"(\s)\s+").unwrap();
    }

    REGEX.replace_all(string, |caps: &Captures| caps.at(1).unwrap_or(" ").to_string())
}

/// Removes dictionary markup like `{bc}` or `{sx|consider||}` from a sense definition.
pub fn strip_markup(text: &str) -> String {
    lazy_static! {
        static ref MARKUP: Regex = Regex::new(r"\{[^}]*\}").unwrap();
    }

    normalize_whitespace(&MARKUP.replace_all(text, "")).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloze_roundtrip() {
        let stem = cloze_sentence("I have an account with the bank.", "account");

        assert_eq!(stem, "I have an ____ with the bank.");
        assert_eq!(fill_cloze(&stem, "account"), "I have an account with the bank.");
    }

    #[test]
    fn position_checks() {
        assert!(is_good_position("I have an account with the bank.", "account"));
        assert!(!is_good_position("Account holders were notified.", "account"));
        assert!(!is_good_position("They closed the account", "account"));
        assert!(!is_good_position(
            "The account was merged into another account yesterday.",
            "account"
        ));
        assert!(!is_good_position("Nothing to see here.", "account"));
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(
            strip_markup("{bc}a record of debit {dx_def}see {dxt|debit:2||1a}{/dx_def} and  credit"),
            "a record of debit see and credit"
        );
    }
}
