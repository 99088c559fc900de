//! Dictionary lookups of attested parts of speech and senses.

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io::Read};

use crate::{cloze::strip_markup, tag::normalize_function_label, types::PosTag, Error};

/// A dictionary collaborator.
pub trait Dictionary {
    /// Tags attested for `headword`, in entry order. Empty if the headword is unknown.
    fn attested_pos_tags(&self, headword: &str) -> Vec<PosTag>;

    /// Sense definitions of `headword` grouped by tag.
    fn attested_senses(&self, headword: &str) -> IndexMap<PosTag, Vec<String>>;
}

impl<'a, T> Dictionary for &'a T
where
    T: Dictionary,
{
    fn attested_pos_tags(&self, headword: &str) -> Vec<PosTag> {
        (*self).attested_pos_tags(headword)
    }

    fn attested_senses(&self, headword: &str) -> IndexMap<PosTag, Vec<String>> {
        (*self).attested_senses(headword)
    }
}

/// One dictionary entry. The `id` has the form `headword` or `headword:n` for homographs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: String,
    #[serde(rename = "fl")]
    pub function_label: String,
    #[serde(default)]
    pub senses: Vec<String>,
    #[serde(rename = "cxs", default)]
    pub cross_refs: Vec<CrossReference>,
}

/// A cross-reference to another entry e. g. `colour` is the "British spelling of" `color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    #[serde(rename = "cxl")]
    pub label: String,
    #[serde(rename = "cxt")]
    pub target: String,
}

impl DictionaryEntry {
    pub fn headword(&self) -> &str {
        self.id.split(':').next().unwrap_or("")
    }

    /// The American spelling if this entry only redirects from a British spelling.
    pub fn american_spelling(&self) -> Option<&str> {
        self.cross_refs
            .iter()
            .find(|x| x.label.contains("British spelling of"))
            .map(|x| x.target.as_str())
    }

    pub fn tag(&self) -> PosTag {
        normalize_function_label(&self.function_label)
    }
}

/// A [Dictionary] over a set of in-memory entries, keyed by the word they were looked up for.
#[derive(Debug, Clone, Default)]
pub struct EntryDictionary {
    entries: HashMap<String, Vec<DictionaryEntry>>,
}

impl EntryDictionary {
    pub fn new(entries: HashMap<String, Vec<DictionaryEntry>>) -> Self {
        EntryDictionary { entries }
    }

    /// Reads a JSON object mapping each looked up word to its list of entries.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(EntryDictionary::new(serde_json::from_reader(reader)?))
    }

    pub fn insert(&mut self, word: &str, entries: Vec<DictionaryEntry>) {
        self.entries.insert(word.to_string(), entries);
    }

    /// Entries for `headword` itself. Lookups also return run-on entries of other words, these are skipped.
    /// British spellings are resolved to the entries of their American spelling.
    fn entries(&self, headword: &str) -> Vec<&DictionaryEntry> {
        let redirect = self
            .entries
            .get(headword)
            .and_then(|entries| entries.first())
            .and_then(DictionaryEntry::american_spelling);

        let headword = match redirect {
            Some(american) => {
                debug!("resolving British spelling <{}> to <{}>", headword, american);
                american
            }
            None => headword,
        };

        let entries = self
            .entries
            .get(headword)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.headword() == headword)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if entries.is_empty() {
            warn!("No valid dictionary data found for the keyword: {}", headword);
        }

        entries
    }
}

impl Dictionary for EntryDictionary {
    fn attested_pos_tags(&self, headword: &str) -> Vec<PosTag> {
        self.entries(headword)
            .into_iter()
            .map(DictionaryEntry::tag)
            .unique()
            .collect()
    }

    fn attested_senses(&self, headword: &str) -> IndexMap<PosTag, Vec<String>> {
        let mut senses: IndexMap<PosTag, Vec<String>> = IndexMap::new();

        for entry in self.entries(headword) {
            senses
                .entry(entry.tag())
                .or_insert_with(Vec::new)
                .extend(entry.senses.iter().map(|x| strip_markup(x)));
        }

        senses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, fl: &str, senses: &[&str]) -> DictionaryEntry {
        DictionaryEntry {
            id: id.to_string(),
            function_label: fl.to_string(),
            senses: senses.iter().map(|x| x.to_string()).collect(),
            cross_refs: Vec::new(),
        }
    }

    fn dictionary() -> EntryDictionary {
        let mut dictionary = EntryDictionary::default();
        dictionary.insert(
            "account",
            vec![
                entry("account:1", "noun", &["{bc}a record of debit and credit entries"]),
                entry("account:2", "verb", &["{bc}to think of as {sx|consider||}"]),
                entry("account:3", "Noun", &["{bc}a statement of facts"]),
                entry("accountable", "adjective", &["{bc}subject to giving an account"]),
            ],
        );
        dictionary
    }

    #[test]
    fn pos_tags_are_unique_and_ordered() {
        assert_eq!(
            dictionary().attested_pos_tags("account"),
            vec![PosTag::NN, PosTag::VB]
        );
    }

    #[test]
    fn unknown_headword_has_no_tags() {
        assert!(dictionary().attested_pos_tags("finance").is_empty());
    }

    #[test]
    fn senses_are_grouped_and_cleaned() {
        let senses = dictionary().attested_senses("account");

        assert_eq!(senses.len(), 2);
        assert_eq!(
            senses[&PosTag::NN],
            vec!["a record of debit and credit entries", "a statement of facts"]
        );
        assert_eq!(senses[&PosTag::VB], vec!["to think of as"]);
    }

    #[test]
    fn british_spellings_use_american_entries() {
        let mut dictionary = dictionary();
        let mut redirect = entry("analyse", "verb", &[]);
        redirect.cross_refs.push(CrossReference {
            label: "British spelling of".to_string(),
            target: "analyze".to_string(),
        });
        dictionary.insert("analyse", vec![redirect]);
        dictionary.insert(
            "analyze",
            vec![
                entry("analyze", "verb", &["{bc}to study or determine the nature of"]),
                entry("analyzer", "noun", &["{bc}one that analyzes"]),
            ],
        );

        assert_eq!(dictionary.attested_pos_tags("analyse"), vec![PosTag::VB]);
        assert_eq!(
            dictionary.attested_senses("analyse")[&PosTag::VB],
            vec!["to study or determine the nature of"]
        );
    }

    #[test]
    fn entries_load_from_json() -> Result<(), Error> {
        let json = r#"{
            "test": [{"id": "test:1", "fl": "noun", "senses": ["a means of trial"]}],
            "colour": [{"id": "colour", "fl": "noun", "cxs": [{"cxl": "chiefly British spelling of", "cxt": "color"}]}],
            "color": [{"id": "color:1", "fl": "noun"}, {"id": "color:2", "fl": "verb"}]
        }"#;
        let dictionary = EntryDictionary::from_json_reader(json.as_bytes())?;

        assert_eq!(dictionary.attested_pos_tags("test"), vec![PosTag::NN]);
        assert_eq!(
            dictionary.attested_pos_tags("colour"),
            vec![PosTag::NN, PosTag::VB]
        );

        Ok(())
    }
}
