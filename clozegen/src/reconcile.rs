//! Reconciliation of the inflection sources, dictionary tags and language model ranking into one mapping.
//!
//! The pipeline for a headword is a fallback chain, each step only runs if the previous result is empty:
//! 1. union of both inflection sources, restricted to the parts of speech ranked by the language model,
//! 2. the headword itself under every ranked tag,
//! 3. the strict intersection of both sources.
//!
//! The result is corrected for singular / plural noun ambiguity ([correct_inflections]) and optionally
//! pruned by n-gram frequency. Every tag / form seen at any stage is recorded in a [DiagnosticRecord].

use indexmap::IndexSet;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::{
    dictionary::Dictionary,
    frequency::{filter_by_inflection_frequency, filter_by_pos_frequency, FrequencySource},
    inflect::MorphologySource,
    llm::PosRanker,
    types::{PosTag, TagToForms},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Options to configure the reconciler.
pub struct ReconcilerOptions {
    /// Whether to prune rare parts of speech and noun inflections. Only has an effect if a
    /// [FrequencySource] is set.
    pub filter_by_frequency: bool,
    /// Parts of speech used less than this fraction of the most frequent one are dropped.
    pub pos_threshold: f64,
    /// Noun inflections used less than this fraction of the most frequent one are dropped.
    pub inflection_threshold: f64,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        ReconcilerOptions {
            filter_by_frequency: true,
            pos_threshold: 0.1,
            inflection_threshold: 0.1,
        }
    }
}

/// One audit row per (headword, form, tag) seen in any stage. Not used for decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub headword: String,
    pub word: String,
    pub tag: PosTag,
    /// Contributed by the first inflection source.
    pub source_a: bool,
    /// Contributed by the second inflection source.
    pub source_b: bool,
    /// The general tag is attested in the dictionary.
    pub dictionary: bool,
    /// The general tag was ranked by the language model.
    pub ranked: bool,
    /// Present after the fallback chain and count correction, before frequency filtering.
    pub reconciled: bool,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// Key-wise union of both sources.
pub fn union_sources(a: &TagToForms, b: &TagToForms) -> TagToForms {
    let mut union = a.clone();
    union.merge(b);
    union
}

/// Keeps the tags whose part of speech was ranked. A part of speech is only kept if the mapping contains its
/// general tag: plural-only or past-only analyses do not make up a part of speech on their own.
pub fn filter_by_top_pos(tag_to_forms: &TagToForms, top_pos: &[PosTag]) -> TagToForms {
    let mut filtered = tag_to_forms.clone();
    filtered.retain_tags(|tag| {
        top_pos.iter().any(|x| x.general() == tag.general())
            && tag_to_forms.contains_tag(tag.general())
    });
    filtered
}

/// The headword as placeholder form for every ranked tag.
pub fn seed_headword(headword: &str, top_pos: &[PosTag]) -> TagToForms {
    top_pos
        .iter()
        .map(|tag| (*tag, vec![headword.to_string()]))
        .collect()
}

/// Forms on which both sources agree.
pub fn intersect_sources(a: &TagToForms, b: &TagToForms) -> TagToForms {
    a.iter()
        .filter_map(|(tag, forms)| {
            b.get(tag).map(|other| {
                (
                    tag,
                    forms
                        .intersection(other)
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            })
        })
        .collect()
}

/// Corrects the noun inflections:
/// 1. `word` (NN), `words` (NNS): nothing to do.
/// 2. `finance` (NNS) -> `finance` (NN): a plural-only entry becomes the singular entry.
/// 3. `structure` (NN), `structure` (NNS) -> `structure` (NN): forms identical to the singular are removed from the plural.
/// 4. `method` (NN), `method` (NNS), `methods` (NNS) -> `method` (NN), `methods` (NNS).
pub fn correct_inflections(mut tag_to_forms: TagToForms) -> TagToForms {
    let has_nn = tag_to_forms.contains_tag(PosTag::NN);
    let has_nns = tag_to_forms.contains_tag(PosTag::NNS);

    if has_nns && !has_nn {
        tag_to_forms.rename(PosTag::NNS, PosTag::NN);
    } else if has_nns && has_nn {
        let singular = tag_to_forms
            .get(PosTag::NN)
            .cloned()
            .unwrap_or_default();
        tag_to_forms.retain_items(PosTag::NNS, |form| !singular.contains(form));
    }

    tag_to_forms
}

/// Runs the reconciliation pipeline against a fixed set of collaborators.
pub struct Reconciler<'a> {
    source_a: Box<dyn MorphologySource + 'a>,
    source_b: Box<dyn MorphologySource + 'a>,
    dictionary: Box<dyn Dictionary + 'a>,
    ranker: Box<dyn PosRanker + 'a>,
    frequency: Option<Box<dyn FrequencySource + 'a>>,
    options: ReconcilerOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new<A, B, D, R>(source_a: A, source_b: B, dictionary: D, ranker: R) -> Self
    where
        A: MorphologySource + 'a,
        B: MorphologySource + 'a,
        D: Dictionary + 'a,
        R: PosRanker + 'a,
    {
        Reconciler {
            source_a: Box::new(source_a),
            source_b: Box::new(source_b),
            dictionary: Box::new(dictionary),
            ranker: Box::new(ranker),
            frequency: None,
            options: ReconcilerOptions::default(),
        }
    }

    /// Sets the n-gram frequency collaborator used for pruning.
    pub fn with_frequency<F: FrequencySource + 'a>(mut self, frequency: F) -> Self {
        self.frequency = Some(Box::new(frequency));
        self
    }

    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Computes the final mapping from tag to forms of `headword` and the diagnostic log.
    /// Never fails: missing data from any collaborator only narrows the fallback chain.
    pub fn reconcile(&self, headword: &str) -> (TagToForms, Vec<DiagnosticRecord>) {
        let a = self.source_a.inflections(headword);
        let b = self.source_b.inflections(headword);

        let dict_pos = self.dictionary.attested_pos_tags(headword);
        if dict_pos.is_empty() {
            warn!("No dictionary POS tags found for <{}>", headword);
        }

        let top_pos = self.ranker.rank_pos(headword, &dict_pos);
        if top_pos.is_empty() {
            warn!("No ranked POS tags for <{}>", headword);
        }

        let union = union_sources(&a, &b);
        let mut reconciled = filter_by_top_pos(&union, &top_pos);

        if reconciled.is_empty() {
            debug!("no ranked inflections of <{}>, seeding the headword", headword);
            reconciled = seed_headword(headword, &top_pos);
        }

        if reconciled.is_empty() {
            debug!("falling back to the intersection of sources for <{}>", headword);
            reconciled = intersect_sources(&a, &b);
        }

        let reconciled = correct_inflections(reconciled);

        let result = match &self.frequency {
            Some(frequency) if self.options.filter_by_frequency => {
                self.filter_by_frequency(frequency.as_ref(), headword, &reconciled)
            }
            _ => reconciled.clone(),
        };

        if result.is_empty() {
            error!("No inflections retained for <{}>", headword);
        }

        let stages = Stages {
            a: &a,
            b: &b,
            dict_pos: &dict_pos,
            top_pos: &top_pos,
            union: &union,
            reconciled: &reconciled,
            result: &result,
        };
        let log = stages.diagnostic_log(headword);

        (result, log)
    }

    fn filter_by_frequency(
        &self,
        frequency: &dyn FrequencySource,
        headword: &str,
        reconciled: &TagToForms,
    ) -> TagToForms {
        let mut result = reconciled.clone();

        let general: Vec<PosTag> = result
            .tags()
            .map(|tag| tag.general())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        if general.len() > 1 {
            let kept =
                filter_by_pos_frequency(frequency, headword, &general, self.options.pos_threshold);
            result.retain_tags(|tag| kept.contains(&tag.general()));
        }

        let nouns: TagToForms = result
            .iter()
            .filter(|(tag, _)| tag.is_noun())
            .map(|(tag, forms)| (tag, forms.iter().cloned()))
            .collect();
        if nouns.len() > 1 {
            let kept = filter_by_inflection_frequency(
                frequency,
                &nouns,
                self.options.inflection_threshold,
            );
            for tag in nouns.tags() {
                result.retain_items(tag, |form| kept.contains(tag, form));
            }
        }

        result
    }
}

/// The intermediate results of one reconciliation.
struct Stages<'s> {
    a: &'s TagToForms,
    b: &'s TagToForms,
    dict_pos: &'s [PosTag],
    top_pos: &'s [PosTag],
    union: &'s TagToForms,
    reconciled: &'s TagToForms,
    result: &'s TagToForms,
}

impl<'s> Stages<'s> {
    fn diagnostic_log(&self, headword: &str) -> Vec<DiagnosticRecord> {
        // seeded forms may not be present in the sources
        let mut seen = self.union.clone();
        seen.merge(self.reconciled);

        let mut log = Vec::new();
        for (tag, forms) in seen.iter() {
            let dictionary = self.dict_pos.iter().any(|x| x.general() == tag.general());
            let ranked = self.top_pos.iter().any(|x| x.general() == tag.general());

            for form in forms {
                log.push(DiagnosticRecord {
                    headword: headword.to_string(),
                    word: form.clone(),
                    tag,
                    source_a: self.a.contains(tag, form),
                    source_b: self.b.contains(tag, form),
                    dictionary,
                    ranked,
                    reconciled: self.reconciled.contains(tag, form),
                    is_final: self.result.contains(tag, form),
                });
            }
        }

        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_only_becomes_singular() {
        let tag_to_forms = TagToForms::from_forms(&[(PosTag::NNS, &["finance"])]);

        assert_eq!(
            correct_inflections(tag_to_forms),
            TagToForms::from_forms(&[(PosTag::NN, &["finance"])])
        );
    }

    #[test]
    fn identical_plural_is_removed() {
        let tag_to_forms =
            TagToForms::from_forms(&[(PosTag::NN, &["structure"]), (PosTag::NNS, &["structure"])]);

        assert_eq!(
            correct_inflections(tag_to_forms),
            TagToForms::from_forms(&[(PosTag::NN, &["structure"])])
        );
    }

    #[test]
    fn overlap_is_subtracted_from_plural() {
        let tag_to_forms = TagToForms::from_forms(&[
            (PosTag::NN, &["method"]),
            (PosTag::NNS, &["method", "methods"]),
        ]);

        assert_eq!(
            correct_inflections(tag_to_forms),
            TagToForms::from_forms(&[(PosTag::NN, &["method"]), (PosTag::NNS, &["methods"])])
        );
    }

    #[test]
    fn distinct_forms_are_unchanged() {
        let tag_to_forms =
            TagToForms::from_forms(&[(PosTag::NN, &["method"]), (PosTag::NNS, &["methods"])]);

        assert_eq!(correct_inflections(tag_to_forms.clone()), tag_to_forms);
    }

    #[test]
    fn top_pos_filter_needs_general_tag() {
        let union = TagToForms::from_forms(&[
            (PosTag::NN, &["account"]),
            (PosTag::NNS, &["accounts"]),
            (PosTag::VBD, &["accounted"]),
            (PosTag::JJ, &["accountable"]),
        ]);

        let filtered = filter_by_top_pos(&union, &[PosTag::NN, PosTag::VB]);

        assert_eq!(
            filtered,
            TagToForms::from_forms(&[(PosTag::NN, &["account"]), (PosTag::NNS, &["accounts"])])
        );
    }

    #[test]
    fn intersection_drops_empty_tags() {
        let a = TagToForms::from_forms(&[(PosTag::NN, &["test"]), (PosTag::VB, &["test"])]);
        let b = TagToForms::from_forms(&[(PosTag::NN, &["test", "tests"]), (PosTag::VB, &["tested"])]);

        assert_eq!(
            intersect_sources(&a, &b),
            TagToForms::from_forms(&[(PosTag::NN, &["test"])])
        );
    }

    #[test]
    fn seeding_uses_every_ranked_tag() {
        assert_eq!(
            seed_headword("finance", &[PosTag::NN, PosTag::VB]),
            TagToForms::from_forms(&[(PosTag::NN, &["finance"]), (PosTag::VB, &["finance"])])
        );
    }
}
