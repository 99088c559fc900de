//! Language model tasks: prompt composition and response parsing.
//!
//! The language model itself is an opaque [LanguageModel] collaborator which is expected to enforce its own
//! timeout and retry policy. A [Task] composes a prompt from its inputs and parses the raw response into a
//! typed result. Rankers built on top of tasks never fail: any error degrades to an empty ranking.

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, error};
use serde::Deserialize;
use std::str::FromStr;

use crate::{cloze::cloze_sentence, types::PosTag, Error};

/// The external language model.
pub trait LanguageModel {
    fn complete(&self, prompt: &str, temperature: f32) -> Result<String, Error>;
}

impl<'a, T> LanguageModel for &'a T
where
    T: LanguageModel,
{
    fn complete(&self, prompt: &str, temperature: f32) -> Result<String, Error> {
        (*self).complete(prompt, temperature)
    }
}

/// Markers of responses which are failures even though the call itself succeeded.
const FAILURE_MARKERS: &[&str] = &[
    "failed to read response",
    "against openai's content policy",
    "as an ai language model",
];

pub trait Task {
    type Output;

    fn name(&self) -> &'static str;

    fn temperature(&self) -> f32 {
        0.
    }

    fn prompt(&self) -> String;

    fn parse(&self, response: &str) -> Result<Self::Output, Error>;
}

/// Runs a task against a model: composes the prompt, rejects failure responses and parses the rest.
pub fn run_task<M, T>(model: &M, task: &T) -> Result<T::Output, Error>
where
    M: LanguageModel + ?Sized,
    T: Task,
{
    let prompt = task.prompt();
    debug!("PROMPT: {}", prompt);

    let response = model.complete(&prompt, task.temperature())?;
    debug!("RAW RESPONSE: {}", response);

    let lower = response.to_lowercase();
    if FAILURE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Err(Error::ResponseRejected {
            task: task.name(),
            response,
        });
    }

    task.parse(&response)
}

pub fn remove_surrounding_quotes(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

/// Strips a Markdown code fence (optionally with a language tag) around a response.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    match text.strip_prefix("```") {
        Some(inner) => {
            let inner = inner.strip_suffix("```").unwrap_or(inner);
            // drop the language tag e. g. "json"
            let body = match inner.find('\n') {
                Some(i) if !inner[..i].contains(|c: char| c == '[' || c == '{') => &inner[i + 1..],
                _ => inner,
            };
            body.trim()
        }
        None => text,
    }
}

fn parse_json<'de, T: Deserialize<'de>>(task: &'static str, response: &'de str) -> Result<T, Error> {
    serde_json::from_str(strip_code_fence(response)).map_err(|err| Error::MalformedResponse {
        task,
        reason: err.to_string(),
    })
}

/// Keeps the returned items which are candidates, in the returned order, without duplicates.
fn subset_in_order<T, F>(returned: Vec<String>, candidates: &[T], matches: F) -> Vec<T>
where
    T: Clone + PartialEq,
    F: Fn(&str, &T) -> bool,
{
    let mut result: Vec<T> = Vec::new();
    for item in returned {
        if let Some(candidate) = candidates.iter().find(|x| matches(item.trim(), x)) {
            if !result.contains(candidate) {
                result.push(candidate.clone());
            }
        }
    }
    result
}

/// Ranks candidate tags of a headword by how frequently the word is used with them.
pub struct RankPos<'a> {
    pub headword: &'a str,
    pub candidates: &'a [PosTag],
}

impl<'a> Task for RankPos<'a> {
    type Output = Vec<PosTag>;

    fn name(&self) -> &'static str {
        "POS Ranking"
    }

    fn prompt(&self) -> String {
        format!(
            "The word \"{word}\" can be used with the following Penn Treebank part-of-speech tags: {tags}.\n\
            Keep only the tags an English learner is likely to meet in class and order them from the most to the least \
            frequent usage. Reply with a JSON array of tags only, e.g. [\"{example}\"].",
            word = self.headword,
            tags = self.candidates.iter().join(", "),
            example = self.candidates.first().copied().unwrap_or(PosTag::NN),
        )
    }

    fn parse(&self, response: &str) -> Result<Self::Output, Error> {
        let returned: Vec<String> = parse_json(self.name(), response)?;
        Ok(subset_in_order(returned, self.candidates, |item, tag| {
            PosTag::from_str(&item.to_uppercase()).map_or(false, |x| x == *tag)
        }))
    }
}

/// Ranks the senses of a keyword with a given tag by relevance for learners.
pub struct RankSenses<'a> {
    pub keyword: &'a str,
    pub tag: PosTag,
    pub senses: &'a [String],
}

impl<'a> Task for RankSenses<'a> {
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "Sense Ranking"
    }

    fn prompt(&self) -> String {
        format!(
            "Below are the senses of the word \"{word}\" tagged as \"{tag}\", one per line.\n\
            Order them from the most to the least useful for an English learner. \
            Reply with a JSON array containing the senses verbatim.\n---\n{senses}",
            word = self.keyword,
            tag = self.tag,
            senses = self.senses.join("\n"),
        )
    }

    fn parse(&self, response: &str) -> Result<Self::Output, Error> {
        let returned: Vec<String> = parse_json(self.name(), response)?;
        Ok(subset_in_order(returned, self.senses, |item, sense| {
            item == sense.as_str()
        }))
    }
}

/// Generates a sentence containing a word with a given tag. The output is the cloze stem.
pub struct GenerateSentence<'a> {
    pub word: &'a str,
    pub tag: PosTag,
    pub sense: Option<&'a str>,
    pub domain: &'a str,
    pub level: &'a str,
}

impl<'a> Task for GenerateSentence<'a> {
    type Output = String;

    fn name(&self) -> &'static str {
        "Sentence Generation"
    }

    fn temperature(&self) -> f32 {
        0.9
    }

    fn prompt(&self) -> String {
        let sense = self
            .sense
            .map(|sense| format!("- \"{}\" should be used in the sense \"{}\".\n", self.word, sense))
            .unwrap_or_default();
        let adjective = if self.tag == PosTag::JJ {
            format!("- \"{}\" should be followed by a noun.\n", self.word)
        } else {
            String::new()
        };

        format!(
            "Write one sentence in the domain of {domain} for learners at level {level}:\n\
            - It contains the word \"{word}\" tagged as \"{tag}\".\n\
            {sense}\
            - It is between 20 and 30 words long.\n\
            - \"{word}\" is not the first word and appears only once.\n\
            {adjective}\
            For example, for \"account\" tagged as \"NN\" a good sentence is: I have an account with the bank.",
            domain = self.domain,
            level = self.level,
            word = self.word,
            tag = self.tag,
            sense = sense,
            adjective = adjective,
        )
    }

    fn parse(&self, response: &str) -> Result<Self::Output, Error> {
        let sentence = remove_surrounding_quotes(response);

        if !sentence.contains(self.word) {
            error!("Keyword '{}' not found in response: {}", self.word, sentence);
            return Err(Error::MalformedResponse {
                task: self.name(),
                reason: format!("keyword '{}' not found", self.word),
            });
        }

        if sentence.starts_with(self.word) {
            error!(
                "Keyword '{}' found at the beginning of the sentence: {}",
                self.word, sentence
            );
            return Err(Error::MalformedResponse {
                task: self.name(),
                reason: format!("keyword '{}' starts the sentence", self.word),
            });
        }

        Ok(cloze_sentence(sentence, self.word))
    }
}

/// Checks whether a word has the given tag in a sentence.
pub struct CheckPos<'a> {
    pub word: &'a str,
    pub tag: PosTag,
    pub sentence: &'a str,
}

impl<'a> Task for CheckPos<'a> {
    type Output = bool;

    fn name(&self) -> &'static str {
        "POS Check"
    }

    fn prompt(&self) -> String {
        format!(
            "What is the Penn Treebank POS tag of the word \"{}\" in the following sentence? \
            Reply with the POS tag only.\n---\n{}",
            self.word, self.sentence
        )
    }

    fn parse(&self, response: &str) -> Result<Self::Output, Error> {
        Ok(remove_surrounding_quotes(response).eq_ignore_ascii_case(self.tag.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Appropriateness {
    pub syntax: bool,
    pub semantics: bool,
}

impl Appropriateness {
    /// A good distractor fits the blank grammatically but makes no sense in context.
    pub fn is_good_distractor(&self) -> bool {
        self.syntax && !self.semantics
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ratings {
    pub ratings: IndexMap<String, Appropriateness>,
    /// Candidates which are syntactically valid but semantically wrong, in candidate order.
    pub good_candidates: Vec<String>,
    pub others: Vec<String>,
}

/// Rates distractor candidates for a cloze stem.
pub struct RateDistractors<'a> {
    pub keyword: &'a str,
    pub candidates: &'a [String],
    pub stem: &'a str,
}

impl<'a> Task for RateDistractors<'a> {
    type Output = Ratings;

    fn name(&self) -> &'static str {
        "Rationality Test"
    }

    fn prompt(&self) -> String {
        format!(
            "In the multiple choice cloze question stem \"{stem}\" the key is \"{key}\". \
            Possible distractors are \"{candidates}\". For each distractor, judge whether the completed sentence \
            is syntactically appropriate and whether it is contextually/semantically appropriate.\n\
            Reply with a JSON object only, e.g. for the stem \"Birds ____ in the sky.\" with key \"fly\" \
            and distractors \"swim, beat\":\n\
            {{\"swim\": {{\"syntax\": true, \"semantics\": false}}, \"beat\": {{\"syntax\": false, \"semantics\": false}}}}",
            stem = self.stem,
            key = self.keyword,
            candidates = self.candidates.iter().unique().join(", "),
        )
    }

    fn parse(&self, response: &str) -> Result<Self::Output, Error> {
        let ratings: IndexMap<String, Appropriateness> = parse_json(self.name(), response)?;

        let mut good_candidates = Vec::new();
        let mut others = Vec::new();
        let mut seen = IndexSet::new();

        for candidate in self.candidates {
            if !seen.insert(candidate.as_str()) {
                continue;
            }

            match ratings.get(candidate) {
                Some(rating) if rating.is_good_distractor() => good_candidates.push(candidate.clone()),
                _ => others.push(candidate.clone()),
            }
        }

        Ok(Ratings {
            ratings,
            good_candidates,
            others,
        })
    }
}

/// Ranks the candidate tags of a headword.
pub trait PosRanker {
    /// A subset of `candidates` ordered by usage frequency, descending. Empty on failure.
    fn rank_pos(&self, headword: &str, candidates: &[PosTag]) -> Vec<PosTag>;
}

/// Ranks the senses of a keyword.
pub trait SenseRanker {
    /// A subset of `senses` ordered by relevance, descending. Empty on failure.
    fn rank_senses(&self, keyword: &str, tag: PosTag, senses: &[String]) -> Vec<String>;
}

/// Rankers asking a [LanguageModel].
pub struct LlmRanker<M> {
    model: M,
}

impl<M: LanguageModel> LlmRanker<M> {
    pub fn new(model: M) -> Self {
        LlmRanker { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: LanguageModel> PosRanker for LlmRanker<M> {
    fn rank_pos(&self, headword: &str, candidates: &[PosTag]) -> Vec<PosTag> {
        let candidates: Vec<_> = candidates.iter().copied().unique().collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let task = RankPos {
            headword,
            candidates: &candidates,
        };

        run_task(&self.model, &task).unwrap_or_else(|err| {
            error!("Failed to rank POS tags of '{}': {}", headword, err);
            Vec::new()
        })
    }
}

impl<M: LanguageModel> SenseRanker for LlmRanker<M> {
    fn rank_senses(&self, keyword: &str, tag: PosTag, senses: &[String]) -> Vec<String> {
        if senses.is_empty() {
            return Vec::new();
        }

        let task = RankSenses {
            keyword,
            tag,
            senses,
        };

        run_task(&self.model, &task).unwrap_or_else(|err| {
            error!("Failed to rank senses of '{}<{}>': {}", keyword, tag, err);
            Vec::new()
        })
    }
}

/// Keeps the candidates in their given order. Used when no language model is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRanker;

impl PosRanker for PassthroughRanker {
    fn rank_pos(&self, _headword: &str, candidates: &[PosTag]) -> Vec<PosTag> {
        candidates.iter().copied().unique().collect()
    }
}

impl SenseRanker for PassthroughRanker {
    fn rank_senses(&self, _keyword: &str, _tag: PosTag, senses: &[String]) -> Vec<String> {
        senses.iter().cloned().unique().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replies with canned responses and records the prompts.
    struct Canned {
        response: Result<String, String>,
        prompts: RefCell<Vec<String>>,
    }

    impl Canned {
        fn ok(response: &str) -> Self {
            Canned {
                response: Ok(response.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Canned {
                response: Err("timeout".to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl LanguageModel for Canned {
        fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, Error> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.response.clone().map_err(Error::Model)
        }
    }

    #[test]
    fn pos_ranking_is_a_subset_of_candidates() {
        let ranker = LlmRanker::new(Canned::ok("```json\n[\"VB\", \"JJ\", \"nn\", \"VB\"]\n```"));

        assert_eq!(
            ranker.rank_pos("account", &[PosTag::NN, PosTag::VB]),
            vec![PosTag::VB, PosTag::NN]
        );
    }

    #[test]
    fn pos_ranking_degrades_to_empty() {
        let ranker = LlmRanker::new(Canned::ok("Sure! The tags are NN and VB."));
        assert!(ranker.rank_pos("account", &[PosTag::NN, PosTag::VB]).is_empty());

        let ranker = LlmRanker::new(Canned::failing());
        assert!(ranker.rank_pos("account", &[PosTag::NN]).is_empty());
    }

    #[test]
    fn empty_candidates_skip_the_model() {
        let ranker = LlmRanker::new(Canned::ok("[\"NN\"]"));

        assert!(ranker.rank_pos("account", &[]).is_empty());
        assert!(ranker.model().prompts.borrow().is_empty());
    }

    #[test]
    fn sense_ranking_keeps_verbatim_senses() {
        let senses = vec!["a record of debit".to_string(), "a statement of facts".to_string()];
        let ranker = LlmRanker::new(Canned::ok(
            "[\"a statement of facts\", \"an invented sense\", \"a record of debit\"]",
        ));

        assert_eq!(
            ranker.rank_senses("account", PosTag::NN, &senses),
            vec!["a statement of facts", "a record of debit"]
        );
    }

    #[test]
    fn rejected_responses_are_errors() {
        let model = Canned::ok("This request is against OpenAI's content policy.");
        let task = CheckPos {
            word: "account",
            tag: PosTag::NN,
            sentence: "I have an account with the bank.",
        };

        assert!(matches!(
            run_task(&model, &task),
            Err(Error::ResponseRejected { .. })
        ));
    }

    #[test]
    fn generated_sentences_are_validated() {
        let task = GenerateSentence {
            word: "account",
            tag: PosTag::NN,
            sense: Some("a record of debit"),
            domain: "General Academic",
            level: "B1",
        };

        assert_eq!(
            task.parse("\"I have an account with the bank.\"").unwrap(),
            "I have an ____ with the bank."
        );
        assert!(task.parse("account holders were notified.").is_err());
        assert!(task.parse("I have a deposit with the bank.").is_err());
        assert!(task.prompt().contains("a record of debit"));
    }

    #[test]
    fn pos_check_is_case_insensitive() {
        let task = CheckPos {
            word: "account",
            tag: PosTag::VBZ,
            sentence: "This accounts for the loss.",
        };

        assert!(task.parse("vbz").unwrap());
        assert!(!task.parse("NNS").unwrap());
    }

    #[test]
    fn distractor_ratings_select_good_candidates() {
        let candidates = vec!["swim".to_string(), "beat".to_string(), "soar".to_string()];
        let task = RateDistractors {
            keyword: "fly",
            candidates: &candidates,
            stem: "Birds ____ in the sky.",
        };

        let ratings = task
            .parse(
                r#"{"swim": {"syntax": true, "semantics": false},
                    "beat": {"syntax": false, "semantics": false},
                    "soar": {"syntax": true, "semantics": true}}"#,
            )
            .unwrap();

        assert_eq!(ratings.good_candidates, vec!["swim"]);
        assert_eq!(ratings.others, vec!["beat", "soar"]);
        assert!(task.parse("not json").is_err());
    }
}
