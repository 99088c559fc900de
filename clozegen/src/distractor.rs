//! Selection of distractors for a cloze question.
//!
//! Candidates are sampled from a [WordCluster] in batches with the tag of the key, then judged.
//! Batches are drawn until enough good distractors are collected, the pool is exhausted, or
//! [DistractorOptions::max_trials] batches have been tried.

use log::{debug, error, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    family::WordCluster,
    llm::{run_task, LanguageModel, RateDistractors},
    types::Word,
    Error,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Options to configure distractor selection.
pub struct DistractorOptions {
    /// How many candidates are judged at once.
    pub candidates_per_trial: usize,
    /// The number of distractors to select.
    pub count: usize,
    pub max_trials: usize,
}

impl Default for DistractorOptions {
    fn default() -> Self {
        DistractorOptions {
            candidates_per_trial: 10,
            count: 3,
            max_trials: 5,
        }
    }
}

/// Decides which candidates are good distractors for a key in a cloze stem.
pub trait DistractorJudge {
    /// The good distractors among `candidates`, in candidate order.
    fn judge(&self, key: &Word, candidates: &[Word], stem: &str) -> Result<Vec<Word>, Error>;
}

impl<'a, T> DistractorJudge for &'a T
where
    T: DistractorJudge,
{
    fn judge(&self, key: &Word, candidates: &[Word], stem: &str) -> Result<Vec<Word>, Error> {
        (*self).judge(key, candidates, stem)
    }
}

/// Judges distractors by asking a [LanguageModel] to rate syntactic and semantic fit.
pub struct LlmJudge<M> {
    model: M,
}

impl<M: LanguageModel> LlmJudge<M> {
    pub fn new(model: M) -> Self {
        LlmJudge { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: LanguageModel> DistractorJudge for LlmJudge<M> {
    fn judge(&self, key: &Word, candidates: &[Word], stem: &str) -> Result<Vec<Word>, Error> {
        let surfaces: Vec<String> = candidates.iter().map(|x| x.surface().to_string()).collect();
        let task = RateDistractors {
            keyword: key.surface(),
            candidates: &surfaces,
            stem,
        };

        let ratings = run_task(&self.model, &task)?;

        Ok(candidates
            .iter()
            .filter(|word| {
                ratings
                    .good_candidates
                    .iter()
                    .any(|x| x == word.surface())
            })
            .cloned()
            .collect())
    }
}

/// Selects up to `options.count` distractors for `key` from `cluster`. Candidates are never the key and are
/// never drawn twice. Failed judgements are logged and the batch is skipped.
pub fn select_distractors<J, R>(
    cluster: &WordCluster,
    judge: &J,
    key: &Word,
    stem: &str,
    options: &DistractorOptions,
    rng: &mut R,
) -> Vec<Word>
where
    J: DistractorJudge + ?Sized,
    R: Rng + ?Sized,
{
    let mut excepts = vec![key.clone()];
    let mut distractors: Vec<Word> = Vec::new();

    for trial in 0..options.max_trials {
        let candidates = cluster.find_distractors(
            key.tag(),
            &excepts,
            Some(options.candidates_per_trial),
            rng,
        );
        excepts.extend(candidates.iter().cloned());

        if candidates.is_empty() {
            warn!("No more distractor candidates for '{:?}'", key);
            break;
        }

        match judge.judge(key, &candidates, stem) {
            Ok(good) => distractors.extend(good),
            Err(err) => {
                error!("Failed to decide proper distractors for {:?}: {}", key, err);
                continue;
            }
        }

        if distractors.len() >= options.count {
            distractors.truncate(options.count);
            break;
        }

        debug!("Trial {}: {} distractors collected in total.", trial, distractors.len());
    }

    distractors
}
