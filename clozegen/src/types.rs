//! Fundamental types used by this crate.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::{fmt, hash::Hash, iter::FromIterator, str::FromStr};

use crate::Error;

/// A coarse part-of-speech tag. This is a closed set: tags from any source are normalized
/// into one of these variants at the boundary, unrecognized tags become [PosTag::UNK].
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PosTag {
    NN,
    NNS,
    VB,
    VBD,
    VBG,
    VBN,
    VBZ,
    JJ,
    JJR,
    JJS,
    RB,
    RBR,
    RBS,
    PRP,
    DT,
    IN,
    CC,
    UH,
    UNK,
}

impl PosTag {
    pub const ALL: [PosTag; 19] = [
        PosTag::NN,
        PosTag::NNS,
        PosTag::VB,
        PosTag::VBD,
        PosTag::VBG,
        PosTag::VBN,
        PosTag::VBZ,
        PosTag::JJ,
        PosTag::JJR,
        PosTag::JJS,
        PosTag::RB,
        PosTag::RBR,
        PosTag::RBS,
        PosTag::PRP,
        PosTag::DT,
        PosTag::IN,
        PosTag::CC,
        PosTag::UH,
        PosTag::UNK,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PosTag::NN => "NN",
            PosTag::NNS => "NNS",
            PosTag::VB => "VB",
            PosTag::VBD => "VBD",
            PosTag::VBG => "VBG",
            PosTag::VBN => "VBN",
            PosTag::VBZ => "VBZ",
            PosTag::JJ => "JJ",
            PosTag::JJR => "JJR",
            PosTag::JJS => "JJS",
            PosTag::RB => "RB",
            PosTag::RBR => "RBR",
            PosTag::RBS => "RBS",
            PosTag::PRP => "PRP",
            PosTag::DT => "DT",
            PosTag::IN => "IN",
            PosTag::CC => "CC",
            PosTag::UH => "UH",
            PosTag::UNK => "UNK",
        }
    }

    /// The general form of a tag i. e. the tag of the dictionary form of the same part of speech.
    /// `NNS` -> `NN`, `VBD` -> `VB`, `JJR` -> `JJ`, `RBS` -> `RB`. Other tags map to themselves.
    pub fn general(&self) -> PosTag {
        match self {
            PosTag::NN | PosTag::NNS => PosTag::NN,
            PosTag::VB | PosTag::VBD | PosTag::VBG | PosTag::VBN | PosTag::VBZ => PosTag::VB,
            PosTag::JJ | PosTag::JJR | PosTag::JJS => PosTag::JJ,
            PosTag::RB | PosTag::RBR | PosTag::RBS => PosTag::RB,
            other => *other,
        }
    }

    pub fn is_noun(&self) -> bool {
        self.general() == PosTag::NN
    }

    pub fn is_unknown(&self) -> bool {
        *self == PosTag::UNK
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosTag {
    type Err = Error;

    /// Strict parsing, only the exact tag names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PosTag::ALL
            .iter()
            .find(|tag| tag.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownTag(s.to_string()))
    }
}

/// A surface form together with its tag. Two words with the same spelling but different tags are distinct.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Word {
    surface: String,
    tag: PosTag,
}

impl Word {
    pub fn new<S: Into<String>>(surface: S, tag: PosTag) -> Self {
        Word {
            surface: surface.into(),
            tag,
        }
    }

    pub fn surface(&self) -> &str {
        self.surface.as_str()
    }

    pub fn tag(&self) -> PosTag {
        self.tag
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.surface)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.surface, self.tag)
    }
}

/// A mapping from tag to a set of items sharing that tag.
/// Keys are never mapped to an empty set: operations which would leave a key empty remove it instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap<T: Hash + Eq>(IndexMap<PosTag, IndexSet<T>>);

/// Tag to surface forms. The output of the inflection sources and the reconciler.
pub type TagToForms = TagMap<String>;
/// Tag to words. Used by word families and clusters.
pub type TagToWords = TagMap<Word>;

impl<T: Hash + Eq> Default for TagMap<T> {
    fn default() -> Self {
        TagMap(IndexMap::new())
    }
}

impl<T: Hash + Eq> TagMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions `items` into the set at `tag`. A key is only created if there is at least one item.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, tag: PosTag, items: I) {
        let mut items = items.into_iter().peekable();
        if items.peek().is_none() {
            return;
        }

        self.0.entry(tag).or_insert_with(IndexSet::new).extend(items);
    }

    /// Inserts a single item. Returns whether it was newly inserted.
    pub fn insert(&mut self, tag: PosTag, item: T) -> bool {
        self.0.entry(tag).or_insert_with(IndexSet::new).insert(item)
    }

    /// Key-wise union with another mapping.
    pub fn merge(&mut self, other: &TagMap<T>)
    where
        T: Clone,
    {
        for (tag, items) in other.iter() {
            self.extend(tag, items.iter().cloned());
        }
    }

    pub fn get(&self, tag: PosTag) -> Option<&IndexSet<T>> {
        self.0.get(&tag)
    }

    pub fn contains_tag(&self, tag: PosTag) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn contains(&self, tag: PosTag, item: &T) -> bool {
        self.0.get(&tag).map_or(false, |items| items.contains(item))
    }

    pub fn remove(&mut self, tag: PosTag) -> Option<IndexSet<T>> {
        self.0.shift_remove(&tag)
    }

    /// Moves all items at `from` to `to`, merging with any items already at `to`.
    pub fn rename(&mut self, from: PosTag, to: PosTag) {
        if let Some(items) = self.remove(from) {
            self.extend(to, items);
        }
    }

    /// Removes every item at `tag` for which `keep` returns false, dropping the key if it becomes empty.
    pub fn retain_items<F>(&mut self, tag: PosTag, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        if let Some(items) = self.0.get_mut(&tag) {
            items.retain(|item| keep(item));
            if items.is_empty() {
                self.0.shift_remove(&tag);
            }
        }
    }

    pub fn retain_tags<F>(&mut self, mut keep: F)
    where
        F: FnMut(PosTag) -> bool,
    {
        self.0.retain(|tag, _| keep(*tag));
    }

    pub fn tags(&self) -> impl Iterator<Item = PosTag> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PosTag, &IndexSet<T>)> {
        self.0.iter().map(|(tag, items)| (*tag, items))
    }

    /// All items across all tags, in order of first appearance.
    pub fn all(&self) -> IndexSet<&T> {
        self.0.values().flatten().collect()
    }

    /// The number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TagMap<String> {
    /// Convenience constructor, mostly useful for fixtures.
    pub fn from_forms(pairs: &[(PosTag, &[&str])]) -> Self {
        pairs
            .iter()
            .map(|(tag, forms)| (*tag, forms.iter().map(|x| x.to_string())))
            .collect()
    }

    /// Lifts every form into a [Word] carrying its tag.
    pub fn to_words(&self) -> TagToWords {
        self.iter()
            .map(|(tag, forms)| (tag, forms.iter().map(move |form| Word::new(form.as_str(), tag))))
            .collect()
    }
}

impl<T, I> FromIterator<(PosTag, I)> for TagMap<T>
where
    T: Hash + Eq,
    I: IntoIterator<Item = T>,
{
    fn from_iter<It: IntoIterator<Item = (PosTag, I)>>(iter: It) -> Self {
        let mut map = TagMap::new();
        for (tag, items) in iter {
            map.extend(tag, items);
        }
        map
    }
}
