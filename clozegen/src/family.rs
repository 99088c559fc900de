//! Word families and clusters of word families.
//!
//! A [WordFamily] is a set of words related to a headword e. g. `analyse`, `analyser`, `analysis`,
//! extended with the reconciled inflections of each word. A [WordCluster] is a corpus of word families
//! with a merged mapping from tag to words, used to sample distractors.

use fs_err::File;
use indexmap::IndexSet;
use log::warn;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::{
    reconcile::{DiagnosticRecord, Reconciler},
    types::{PosTag, TagToWords, Word},
    Error,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordFamily {
    headword: Option<Word>,
    headword_surface: String,
    related_words: Vec<String>,
    tag_to_words: TagToWords,
    all_words: IndexSet<Word>,
    log: Vec<DiagnosticRecord>,
}

impl WordFamily {
    /// Reconciles the headword and each related word, in order, and unions the results.
    pub fn construct<S: AsRef<str>>(
        reconciler: &Reconciler,
        headword: &str,
        related_words: &[S],
    ) -> Self {
        let mut tag_to_words = TagToWords::new();
        let mut log = Vec::new();
        let mut canonical = None;

        let words = std::iter::once(headword).chain(related_words.iter().map(|x| x.as_ref()));
        for (i, surface) in words.enumerate() {
            let (tag_to_forms, word_log) = reconciler.reconcile(surface);
            tag_to_words.merge(&tag_to_forms.to_words());
            // records of related words belong to the family headword
            log.extend(word_log.into_iter().map(|mut record| {
                record.headword = headword.to_string();
                record
            }));

            if i == 0 {
                canonical = tag_to_words
                    .all()
                    .into_iter()
                    .find(|word| word.surface() == headword)
                    .cloned();

                if canonical.is_none() {
                    warn!(
                        "Reconciliation did not retain the headword <{}> itself.",
                        headword
                    );
                }
            }
        }

        let all_words = tag_to_words.all().into_iter().cloned().collect();

        WordFamily {
            headword: canonical,
            headword_surface: headword.to_string(),
            related_words: related_words.iter().map(|x| x.as_ref().to_string()).collect(),
            tag_to_words,
            all_words,
            log,
        }
    }

    /// The headword as it appears in the reconciled mapping. `None` if reconciliation dropped the dictionary form.
    pub fn headword(&self) -> Option<&Word> {
        self.headword.as_ref()
    }

    /// The headword as given on construction.
    pub fn headword_surface(&self) -> &str {
        &self.headword_surface
    }

    /// Whether `surface` is the headword, ignoring ASCII case.
    pub fn headword_matches(&self, surface: &str) -> bool {
        self.headword_surface.eq_ignore_ascii_case(surface.trim())
    }

    pub fn related_words(&self) -> &[String] {
        &self.related_words
    }

    pub fn tag_to_words(&self) -> &TagToWords {
        &self.tag_to_words
    }

    pub fn all_words(&self) -> &IndexSet<Word> {
        &self.all_words
    }

    pub fn tags(&self) -> impl Iterator<Item = PosTag> + '_ {
        self.tag_to_words.tags()
    }

    pub fn diagnostic_log(&self) -> &[DiagnosticRecord] {
        &self.log
    }

    /// A uniformly random word with the given tag, or from the whole family if `tag` is `None`.
    pub fn get_random_word<R: Rng + ?Sized>(&self, tag: Option<PosTag>, rng: &mut R) -> Option<&Word> {
        let candidates: Vec<&Word> = match tag {
            None => self.all_words.iter().collect(),
            Some(tag) => self
                .tag_to_words
                .get(tag)
                .map(|words| words.iter().collect())
                .unwrap_or_default(),
        };

        let word = candidates.choose(rng).copied();
        if word.is_none() {
            warn!(
                "No word found with tag <{}> in family <{}>",
                tag.map_or("*", |x| x.as_str()),
                self
            );
        }
        word
    }

    /// All words of the family in random order.
    pub fn get_shuffled_words<R: Rng + ?Sized>(&self, rng: &mut R) -> impl Iterator<Item = &Word> {
        let mut words: Vec<&Word> = self.all_words.iter().collect();
        words.shuffle(rng);
        words.into_iter()
    }
}

impl fmt::Display for WordFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.headword {
            Some(word) => write!(f, "WF: {:?}", word),
            None => write!(f, "WF: {}<?>", self.headword_surface),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordCluster {
    tag_to_words: TagToWords,
    families: Vec<WordFamily>,
    log: Vec<DiagnosticRecord>,
}

impl WordCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the word family of `headword` and adds it to the cluster.
    pub fn add_item<S: AsRef<str>>(
        &mut self,
        reconciler: &Reconciler,
        headword: &str,
        related_words: &[S],
    ) {
        self.add_family(WordFamily::construct(reconciler, headword, related_words));
    }

    pub fn add_family(&mut self, family: WordFamily) {
        self.tag_to_words.merge(family.tag_to_words());
        self.log.extend(family.diagnostic_log().iter().cloned());
        self.families.push(family);
    }

    /// Up to `n` words with `tag` which are not in `excepts`. If there are no more than `n` candidates
    /// (or `n` is `None`) all candidates are returned in order, otherwise a random sample without duplicates.
    pub fn find_distractors<R: Rng + ?Sized>(
        &self,
        tag: PosTag,
        excepts: &[Word],
        n: Option<usize>,
        rng: &mut R,
    ) -> Vec<Word> {
        let candidates: Vec<&Word> = self
            .tag_to_words
            .get(tag)
            .map(|words| words.iter().filter(|word| !excepts.contains(word)).collect())
            .unwrap_or_default();

        match n {
            Some(n) if n < candidates.len() => candidates
                .choose_multiple(rng, n)
                .map(|word| (*word).clone())
                .collect(),
            _ => candidates.into_iter().cloned().collect(),
        }
    }

    /// Families whose headword is in `selected` (all if `None`), skipping the first `skip` families
    /// and returning at most `max_count`.
    pub fn select_families<S: AsRef<str>>(
        &self,
        selected: Option<&[S]>,
        skip: usize,
        max_count: Option<usize>,
    ) -> Vec<&WordFamily> {
        self.families
            .iter()
            .skip(skip)
            .filter(|family| {
                selected.map_or(true, |selected| {
                    selected
                        .iter()
                        .any(|x| family.headword_matches(x.as_ref()))
                })
            })
            .take(max_count.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn tag_to_words(&self) -> &TagToWords {
        &self.tag_to_words
    }

    pub fn families(&self) -> &[WordFamily] {
        &self.families
    }

    pub fn diagnostic_log(&self) -> &[DiagnosticRecord] {
        &self.log
    }

    pub fn tag_size(&self) -> usize {
        self.tag_to_words.len()
    }

    pub fn family_size(&self) -> usize {
        self.families.len()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(bincode::deserialize_from(reader)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        Ok(bincode::serialize_into(writer, self)?)
    }

    /// Loads a cluster cached with [WordCluster::save].
    pub fn load<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(p.as_ref())?);
        Self::from_reader(reader)
    }

    pub fn save<P: AsRef<Path>>(&self, p: P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(p.as_ref())?);
        self.to_writer(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dictionary::{DictionaryEntry, EntryDictionary},
        inflect::{DumpInflector, PennSource, UnimorphDump, UnimorphSource},
        llm::PassthroughRanker,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn reconciler() -> Reconciler<'static> {
        let mut penn = DumpInflector::default();
        let mut unimorph = UnimorphDump::default();
        let mut dictionary = EntryDictionary::default();

        for (form, lemma, tag, features) in &[
            ("analyse", "analyse", "VB", "V;NFIN;IMP+SBJV"),
            ("analyses", "analyse", "VBZ", "V;PRS;3;SG"),
            ("analysed", "analyse", "VBD", "V;PST"),
            ("analysing", "analyse", "VBG", "V;V.PTCP;PRS"),
            ("analysis", "analysis", "NN", "N;SG"),
            ("analyses", "analysis", "NNS", "N;PL"),
            ("approach", "approach", "NN", "N;SG"),
            ("approaches", "approach", "NNS", "N;PL"),
            ("approach", "approach", "VB", "V;NFIN;IMP+SBJV"),
            ("approached", "approach", "VBD", "V;PST"),
        ] {
            penn.add(form, lemma, tag);
            unimorph.add(&format!("{}\t{}\t{}", lemma, form, features));
        }

        for (word, fls) in &[
            ("analyse", &["verb"][..]),
            ("analysis", &["noun"][..]),
            ("approach", &["verb", "noun"][..]),
        ] {
            let entries = fls
                .iter()
                .enumerate()
                .map(|(i, fl)| DictionaryEntry {
                    id: format!("{}:{}", word, i + 1),
                    function_label: fl.to_string(),
                    senses: Vec::new(),
                    cross_refs: Vec::new(),
                })
                .collect();
            dictionary.insert(word, entries);
        }

        Reconciler::new(
            PennSource::new(penn),
            UnimorphSource::new(unimorph),
            dictionary,
            PassthroughRanker,
        )
    }

    #[test]
    fn family_unions_related_words() {
        let family = WordFamily::construct(&reconciler(), "analyse", &["analysis"]);

        assert_eq!(family.headword(), Some(&Word::new("analyse", PosTag::VB)));
        assert!(family
            .all_words()
            .contains(&Word::new("analyses", PosTag::VBZ)));
        assert!(family
            .all_words()
            .contains(&Word::new("analyses", PosTag::NNS)));
        assert_eq!(family.all_words().len(), 6);
        assert_eq!(family.to_string(), "WF: analyse<VB>");

        let log = family.diagnostic_log();
        assert!(log.iter().any(|x| x.word == "analysis"));
        assert!(log.iter().all(|x| x.headword == "analyse"));
    }

    #[test]
    fn missing_headword_is_none() {
        let family = WordFamily::construct(&reconciler(), "zzz", &[] as &[&str]);

        assert!(family.headword().is_none());
        assert!(family.all_words().is_empty());

        let mut rng = StdRng::seed_from_u64(0);
        assert!(family.get_random_word(None, &mut rng).is_none());
    }

    #[test]
    fn random_words_respect_tag() {
        let family = WordFamily::construct(&reconciler(), "approach", &[] as &[&str]);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..10 {
            let word = family.get_random_word(Some(PosTag::VBD), &mut rng).unwrap();
            assert_eq!(word, &Word::new("approached", PosTag::VBD));
        }
        assert!(family.get_random_word(Some(PosTag::JJ), &mut rng).is_none());
    }

    #[test]
    fn shuffled_words_are_a_permutation() {
        let family = WordFamily::construct(&reconciler(), "approach", &[] as &[&str]);
        let mut rng = StdRng::seed_from_u64(7);

        let shuffled: IndexSet<&Word> = family.get_shuffled_words(&mut rng).collect();
        let all: IndexSet<&Word> = family.all_words().iter().collect();

        assert_eq!(shuffled.len(), all.len());
        assert!(shuffled.iter().all(|word| all.contains(word)));
    }

    #[test]
    fn cluster_merges_families() {
        let reconciler = reconciler();
        let mut cluster = WordCluster::new();
        cluster.add_item(&reconciler, "analyse", &["analysis"]);
        cluster.add_item(&reconciler, "approach", &[] as &[&str]);

        assert_eq!(cluster.family_size(), 2);
        assert_eq!(
            cluster.tag_to_words().get(PosTag::NN).map(|x| x.len()),
            Some(2)
        );
        assert_eq!(
            cluster.diagnostic_log().len(),
            cluster
                .families()
                .iter()
                .map(|x| x.diagnostic_log().len())
                .sum::<usize>()
        );

        let selected = cluster.select_families(Some(&["approach"][..]), 0, None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].headword_surface(), "approach");
        assert!(selected[0].headword_matches("Approach"));
        assert_eq!(cluster.select_families::<&str>(None, 1, Some(5)).len(), 1);
    }

    #[test]
    fn distractors_exclude_excepts() {
        let reconciler = reconciler();
        let mut cluster = WordCluster::new();
        cluster.add_item(&reconciler, "analyse", &["analysis"]);
        cluster.add_item(&reconciler, "approach", &[] as &[&str]);

        let mut rng = StdRng::seed_from_u64(1);
        let key = Word::new("analysed", PosTag::VBD);

        let all = cluster.find_distractors(PosTag::VBD, &[key.clone()], None, &mut rng);
        assert_eq!(all, vec![Word::new("approached", PosTag::VBD)]);

        let sample = cluster.find_distractors(PosTag::VB, &[], Some(1), &mut rng);
        assert_eq!(sample.len(), 1);
        assert_eq!(sample[0].tag(), PosTag::VB);
    }

    #[test]
    fn cluster_cache_roundtrip() -> Result<(), Error> {
        let mut cluster = WordCluster::new();
        cluster.add_item(&reconciler(), "approach", &[] as &[&str]);

        let mut buffer = Vec::new();
        cluster.to_writer(&mut buffer)?;
        let restored = WordCluster::from_reader(&buffer[..])?;

        assert_eq!(restored.tag_to_words(), cluster.tag_to_words());
        assert_eq!(restored.families()[0].headword(), cluster.families()[0].headword());

        Ok(())
    }
}
