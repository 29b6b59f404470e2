// Error types for the learner.
//
// Two kinds of failure run through a learner, and only one of them is an
// error. Derivation retries, surface mismatches in TEST and terminals with
// no matching Vocabulary Item are the learning signal: they come back inside
// outcome structs and move weights. Everything in this file stops the run:
//
// - `StructuralError`: a chain broke an invariant (bad word boundaries, two
//   Roots in one word, a word that cannot be aligned with its morphs). These
//   mean a bug in merge/spell-out or malformed data.
// - `InputError`: an observation line or root inventory that cannot be read.
// - `LearnerError`: the top-level error returned by the learner and binary.

use thiserror::Error;

/// A chain or alignment broke a structural invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("linear sequence is empty")]
    EmptyLinear,
    #[error("linear sequence starts or ends with a word boundary")]
    EdgeBoundary,
    #[error("two boundaries in a row at position {0}")]
    AdjacentBoundaries(usize),
    #[error("morpheme boundary at position {0} is not followed by a terminal")]
    DanglingBoundary(usize),
    #[error("word {word} contains {count} roots")]
    MultipleRoots { word: usize, count: usize },
    #[error("chain has {chain} words but the surface form has {surface}")]
    WordCountMismatch { chain: usize, surface: usize },
    #[error("word {word} cannot be aligned with its morphs: {reason}")]
    Alignment { word: usize, reason: String },
}

/// Malformed learner input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("line {line}: empty surface form")]
    EmptySurface { line: usize },
    #[error("line {line}: empty feature value in slot {slot}")]
    EmptyFeature { line: usize, slot: usize },
    #[error("line {line}: {count} roots in `{surface}` (expected 1 or 2)")]
    RootCount {
        line: usize,
        surface: String,
        count: usize,
    },
    #[error("line {line}: root `{root}` is not in the root inventory")]
    UnknownRoot { line: usize, root: String },
    #[error("line {line}: `{label}` is not an uppercase root label")]
    BadRootLabel { line: usize, label: String },
}

/// Top-level learner error.
#[derive(Error, Debug)]
pub enum LearnerError {
    #[error("structural invariant violated: {0}")]
    Structural(#[from] StructuralError),
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error("no derivation of `{surface}` matched its word count after {attempts} attempts")]
    Ungenerateable { surface: String, attempts: usize },
    #[error("no nominalizer with values {{{values}}}")]
    MissingNominalizer { values: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
