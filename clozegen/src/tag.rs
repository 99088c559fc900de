//! Normalization of the tag vocabularies used by the collaborators into [PosTag]s.
//!
//! The morphological analyzers and the dictionary each use their own incompatible tag system.
//! Every function here is total: unrecognized tags map to [PosTag::UNK].

use bimap::BiHashMap;
use lazy_static::lazy_static;
use std::{collections::HashMap, str::FromStr};

use crate::types::PosTag;

lazy_static! {
    // see https://unimorph.github.io/doc/unimorph-schema.pdf
    static ref UNIMORPH_TO_POS: HashMap<&'static str, PosTag> = {
        let mut map = HashMap::new();
        map.insert("N;SG", PosTag::NN);
        map.insert("N;PL", PosTag::NNS);
        map.insert("V;NFIN;IMP+SBJV", PosTag::VB);
        map.insert("V;PST", PosTag::VBD);
        map.insert("V;V.PTCP;PRS", PosTag::VBG);
        map.insert("V;V.PTCP;PST", PosTag::VBN);
        map.insert("V;PRS;3;SG", PosTag::VBZ);
        map.insert("ADJ", PosTag::JJ);
        map.insert("ADJ;CMPR", PosTag::JJR);
        map.insert("ADJ;SPRL", PosTag::JJS);
        map.insert("ADV", PosTag::RB);
        map.insert("ADV;CMPR", PosTag::RBR);
        map.insert("ADV;SPRL", PosTag::RBS);
        map.insert("PRON", PosTag::PRP);
        map.insert("DET", PosTag::DT);
        map.insert("PREP", PosTag::IN);
        map
    };
    static ref FUNCTION_LABEL_TO_POS: HashMap<&'static str, PosTag> = {
        let mut map = HashMap::new();
        map.insert("noun", PosTag::NN);
        map.insert("verb", PosTag::VB);
        map.insert("adjective", PosTag::JJ);
        map.insert("adverb", PosTag::RB);
        map.insert("pronoun", PosTag::PRP);
        map.insert("determiner", PosTag::DT);
        map.insert("preposition", PosTag::IN);
        map.insert("conjunction", PosTag::CC);
        map.insert("interjection", PosTag::UH);
        map
    };
    static ref NGRAM_LABELS: BiHashMap<PosTag, String> = {
        let mut map = BiHashMap::new();
        map.insert(PosTag::NN, "NOUN".to_string());
        map.insert(PosTag::VB, "VERB".to_string());
        map.insert(PosTag::JJ, "ADJ".to_string());
        map.insert(PosTag::RB, "ADV".to_string());
        map
    };
}

/// Normalizes a Penn Treebank tag as used by the structured morphological analyzer.
pub fn normalize_penn(tag: &str) -> PosTag {
    PosTag::from_str(tag.trim()).unwrap_or(PosTag::UNK)
}

/// Normalizes a UniMorph feature bundle e. g. `V;V.PTCP;PST`.
pub fn normalize_unimorph(features: &str) -> PosTag {
    UNIMORPH_TO_POS
        .get(features.trim())
        .copied()
        .unwrap_or(PosTag::UNK)
}

/// Normalizes a dictionary function label e. g. `noun` or `Verb`. Case-insensitive.
pub fn normalize_function_label(label: &str) -> PosTag {
    FUNCTION_LABEL_TO_POS
        .get(label.trim().to_lowercase().as_str())
        .copied()
        .unwrap_or(PosTag::UNK)
}

/// The part-of-speech label used by the n-gram frequency service for the general form of `tag`, if any.
pub fn ngram_label(tag: PosTag) -> Option<&'static str> {
    NGRAM_LABELS
        .get_by_left(&tag.general())
        .map(|label| label.as_str())
}

/// Inverse of [ngram_label], returns the general tag.
pub fn from_ngram_label(label: &str) -> PosTag {
    NGRAM_LABELS
        .get_by_right(&label.to_string())
        .copied()
        .unwrap_or(PosTag::UNK)
}
