//! Inflection resolution and distractor sampling for vocabulary cloze questions.
//! # Overview
//!
//! clozegen has the following core abstractions:
//! - A [Reconciler][reconcile::Reconciler] merging two independent morphological sources, dictionary
//!   part-of-speech tags and a language model ranking into one authoritative mapping from tag to word forms.
//! - A [WordFamily][family::WordFamily] holding the reconciled forms of a headword and its relatives.
//! - A [WordCluster][family::WordCluster] aggregating many families, used to sample distractors by tag.
//!
//! Collaborators (morphological analyzers, the dictionary, the language model and the n-gram frequency service)
//! are consumed through small traits so they can be swapped for fixtures.
//!
//! # Examples
//!
//! Reconcile the inflections of a headword:
//!
//! ```no_run
//! use clozegen::{
//!     dictionary::EntryDictionary,
//!     inflect::{DumpInflector, PennSource, UnimorphDump, UnimorphSource},
//!     llm::PassthroughRanker,
//!     reconcile::Reconciler,
//! };
//!
//! let reconciler = Reconciler::new(
//!     PennSource::new(DumpInflector::from_dumps(&["data/forms.dump"])?),
//!     UnimorphSource::new(UnimorphDump::new("data/eng")?),
//!     EntryDictionary::default(),
//!     PassthroughRanker,
//! );
//!
//! let (tag_to_forms, log) = reconciler.reconcile("account");
//! println!("{:#?}", tag_to_forms);
//! # Ok::<(), clozegen::Error>(())
//! ```

use std::io;

use thiserror::Error;

pub mod cloze;
pub mod dictionary;
pub mod distractor;
pub mod family;
pub mod frequency;
pub mod inflect;
pub mod llm;
pub mod reconcile;
pub mod tag;
pub mod types;

pub use family::{WordCluster, WordFamily};
pub use reconcile::{Reconciler, ReconcilerOptions};
pub use types::{PosTag, TagMap, TagToForms, TagToWords, Word};

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// (De)serialization error of the binary cluster cache.
    #[error(transparent)]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unknown part-of-speech tag '{0}'")]
    UnknownTag(String),
    /// The language model collaborator failed to produce a response.
    #[error("language model error: {0}")]
    Model(String),
    /// The response of the language model contained a known failure or refusal message.
    #[error("response rejected by {task}: {response}")]
    ResponseRejected { task: &'static str, response: String },
    #[error("malformed response for {task}: {reason}")]
    MalformedResponse { task: &'static str, reason: String },
}
