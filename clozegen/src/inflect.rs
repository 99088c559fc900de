//! Inflection sources. Each source queries one morphological collaborator and returns a normalized [TagToForms].
//!
//! Two kinds of collaborators are supported:
//! - [PennInflector]s return a structured mapping from Penn tag to forms.
//! - [UnimorphInflector]s return newline-delimited `lemma\tform\tfeatures` records.
//!
//! Finding no inflections is a valid outcome: it is logged and results in an empty mapping.

use fs_err::File;
use indexmap::IndexMap;
use log::{debug, warn};
use std::{
    collections::HashMap,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{
    tag::{normalize_penn, normalize_unimorph},
    types::TagToForms,
    Error,
};

/// A source of inflections for a word.
pub trait MorphologySource {
    /// A short name used in logs.
    fn name(&self) -> &str;

    fn inflections(&self, word: &str) -> TagToForms;
}

impl<'a, T> MorphologySource for &'a T
where
    T: MorphologySource,
{
    fn name(&self) -> &str {
        (*self).name()
    }

    fn inflections(&self, word: &str) -> TagToForms {
        (*self).inflections(word)
    }
}

/// A morphological analyzer returning all inflections of a word keyed by Penn tag.
pub trait PennInflector {
    fn all_inflections(&self, word: &str) -> IndexMap<String, Vec<String>>;
}

/// A morphological analyzer returning UniMorph records, one `lemma\tform\tfeatures` record per line.
pub trait UnimorphInflector {
    fn inflect(&self, word: &str) -> String;
}

/// Adapts a [PennInflector] to a [MorphologySource].
pub struct PennSource<I> {
    inflector: I,
}

impl<I: PennInflector> PennSource<I> {
    pub fn new(inflector: I) -> Self {
        PennSource { inflector }
    }
}

impl<I: PennInflector> MorphologySource for PennSource<I> {
    fn name(&self) -> &str {
        "penn"
    }

    fn inflections(&self, word: &str) -> TagToForms {
        let raw = self.inflector.all_inflections(word);
        if raw.is_empty() {
            warn!("No inflections found for word: <{}> ({})", word, self.name());
        }

        raw.into_iter()
            .map(|(tag, forms)| {
                let normalized = normalize_penn(&tag);
                if normalized.is_unknown() {
                    debug!("unknown Penn tag {} for <{}>", tag, word);
                }
                (normalized, forms)
            })
            .collect()
    }
}

/// Adapts a [UnimorphInflector] to a [MorphologySource].
pub struct UnimorphSource<I> {
    inflector: I,
}

impl<I: UnimorphInflector> UnimorphSource<I> {
    pub fn new(inflector: I) -> Self {
        UnimorphSource { inflector }
    }
}

/// Parses UniMorph records into a normalized mapping.
/// Countability markers in place of a surface form are replaced by the lemma.
pub fn parse_unimorph_records(records: &str) -> TagToForms {
    let mut tag_to_forms = TagToForms::new();

    for line in records.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let parts: Vec<_> = line.split('\t').collect();
        if parts.len() != 3 {
            debug!("skipping malformed UniMorph record: {:?}", line);
            continue;
        }

        let (lemma, mut surface, features) = (parts[0], parts[1], parts[2]);
        if surface == "countable" || surface == "uncountable" {
            surface = lemma;
        }

        tag_to_forms.insert(normalize_unimorph(features), surface.to_string());
    }

    tag_to_forms
}

impl<I: UnimorphInflector> MorphologySource for UnimorphSource<I> {
    fn name(&self) -> &str {
        "unimorph"
    }

    fn inflections(&self, word: &str) -> TagToForms {
        let tag_to_forms = parse_unimorph_records(&self.inflector.inflect(word));
        if tag_to_forms.is_empty() {
            warn!("No inflections found for word: <{}> ({})", word, self.name());
        }

        tag_to_forms
    }
}

fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Error> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut lines = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }

        lines.push(line);
    }

    Ok(lines)
}

/// A [PennInflector] backed by word form dumps.
/// Each line of a dump contains the form, lemma and Penn tag, respectively, separated by tabs.
#[derive(Debug, Clone, Default)]
pub struct DumpInflector {
    inflections: HashMap<String, IndexMap<String, Vec<String>>>,
}

impl DumpInflector {
    pub fn from_dumps<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Error> {
        let mut inflector = DumpInflector::default();

        for path in paths {
            for line in read_lines(path)? {
                let parts: Vec<_> = line.split('\t').collect();
                if parts.len() < 3 {
                    continue;
                }

                inflector.add(parts[0], parts[1], parts[2]);
            }
        }

        Ok(inflector)
    }

    pub fn add(&mut self, form: &str, lemma: &str, tag: &str) {
        let forms = self
            .inflections
            .entry(lemma.to_string())
            .or_insert_with(IndexMap::new)
            .entry(tag.to_string())
            .or_insert_with(Vec::new);

        if !forms.iter().any(|x| x == form) {
            forms.push(form.to_string());
        }
    }
}

impl PennInflector for DumpInflector {
    fn all_inflections(&self, word: &str) -> IndexMap<String, Vec<String>> {
        self.inflections.get(word).cloned().unwrap_or_default()
    }
}

/// A [UnimorphInflector] backed by a UniMorph data file.
#[derive(Debug, Clone, Default)]
pub struct UnimorphDump {
    records: HashMap<String, Vec<String>>,
}

impl UnimorphDump {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut dump = UnimorphDump::default();

        for line in read_lines(path)? {
            dump.add(&line);
        }

        Ok(dump)
    }

    /// Adds one `lemma\tform\tfeatures` record.
    pub fn add(&mut self, record: &str) {
        if let Some(lemma) = record.split('\t').next().filter(|x| !x.is_empty()) {
            self.records
                .entry(lemma.to_string())
                .or_insert_with(Vec::new)
                .push(record.to_string());
        }
    }
}

impl UnimorphInflector for UnimorphDump {
    fn inflect(&self, word: &str) -> String {
        self.records
            .get(word)
            .map(|records| records.join("\n"))
            .unwrap_or_default()
    }
}
