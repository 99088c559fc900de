//! Pruning of rare parts of speech and inflections using n-gram frequencies.
//!
//! Queries have the form `{form}_{LABEL}` e. g. `account_NOUN`. Only the most recent frequency value of each
//! query is considered. Items are kept if their frequency is at least `threshold` times the highest frequency
//! among the queried items. Missing frequency data never empties the input: if the collaborator returns
//! nothing, the filters are a no-op.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use crate::{tag::ngram_label, types::PosTag, types::TagToForms};

/// The n-gram frequency collaborator.
pub trait FrequencySource {
    /// The most recent frequency value for each query. Empty if the service is unreachable.
    fn last_values(&self, queries: &[String]) -> IndexMap<String, f64>;
}

impl<'a, T> FrequencySource for &'a T
where
    T: FrequencySource,
{
    fn last_values(&self, queries: &[String]) -> IndexMap<String, f64> {
        (*self).last_values(queries)
    }
}

impl FrequencySource for IndexMap<String, f64> {
    fn last_values(&self, queries: &[String]) -> IndexMap<String, f64> {
        queries
            .iter()
            .filter_map(|query| self.get(query).map(|value| (query.clone(), *value)))
            .collect()
    }
}

pub fn query(form: &str, tag: PosTag) -> Option<String> {
    ngram_label(tag).map(|label| format!("{}_{}", form, label))
}

/// Queries the collaborator and computes the cutoff value.
/// Returns `None` if the filter must be a no-op.
fn cutoff<F: FrequencySource + ?Sized>(
    source: &F,
    queries: &[String],
    threshold: f64,
) -> Option<(IndexMap<String, f64>, f64)> {
    if queries.len() < 2 {
        return None;
    }

    let values = source.last_values(queries);
    if values.is_empty() {
        warn!("No frequency data for {:?}, skipping frequency filter.", queries);
        return None;
    }

    let top = values.values().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((values, top * threshold))
}

/// Keeps the general tags of `pos_list` with which `headword` is used frequently enough.
/// Tags without an n-gram label cannot be queried and are always kept.
pub fn filter_by_pos_frequency<F: FrequencySource + ?Sized>(
    source: &F,
    headword: &str,
    pos_list: &[PosTag],
    threshold: f64,
) -> Vec<PosTag> {
    let general: IndexSet<PosTag> = pos_list.iter().map(|tag| tag.general()).collect();
    let queries: Vec<String> = general
        .iter()
        .filter_map(|tag| query(headword, *tag))
        .collect();

    let (values, cutoff) = match cutoff(source, &queries, threshold) {
        Some(x) => x,
        None => return general.into_iter().collect(),
    };

    general
        .into_iter()
        .filter(|tag| match query(headword, *tag) {
            Some(query) => {
                let keep = values.get(&query).map_or(false, |value| *value >= cutoff);
                if !keep {
                    debug!("dropping rare POS {} of '{}'", tag, headword);
                }
                keep
            }
            None => true,
        })
        .collect()
}

/// Keeps the forms which are used frequently enough with their tag.
/// Tags without an n-gram label cannot be queried and are always kept.
pub fn filter_by_inflection_frequency<F: FrequencySource + ?Sized>(
    source: &F,
    tag_to_forms: &TagToForms,
    threshold: f64,
) -> TagToForms {
    let queries: Vec<String> = tag_to_forms
        .iter()
        .flat_map(|(tag, forms)| forms.iter().filter_map(move |form| query(form, tag)))
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();

    let (values, cutoff) = match cutoff(source, &queries, threshold) {
        Some(x) => x,
        None => return tag_to_forms.clone(),
    };

    let mut result = TagToForms::new();
    for (tag, forms) in tag_to_forms.iter() {
        let kept = forms.iter().filter(|form| match query(form, tag) {
            Some(query) => values.get(&query).map_or(false, |value| *value >= cutoff),
            None => true,
        });
        result.extend(tag, kept.cloned());
    }

    result
}
