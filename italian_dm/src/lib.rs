// italian_dm: a Distributed-Morphology learner of Italian noun class and
// adjective agreement.
//
// The learner reads a stream of (surface form, feature bundles) observations
// and grows a weighted grammar from it: functional heads, Vocabulary Items
// and sprouting rules. After every observation it tries to re-derive the
// surface form and reinforces or penalizes what it used.
//
// Module overview (leaves first):
// - `features.rs`:     Feature strings, polarity, dimensions, conflicts.
// - `terminal.rs`:     The five head types as one tagged `Terminal` struct.
// - `chain.rs`:        `TerminalChain` and `merge`, the only chain builder.
// - `choice.rs`:       `Chooser` policy over the seeded PRNG or a fixed script.
// - `input.rs`:        Observation lines and the Root inventory.
// - `numeration.rs`:   Head inventories, numeration selection, derivation
//                      order and the generate-and-test retry loop.
// - `vocabulary.rs`:   Vocabulary Items, `create_vi`, `generalize_vi`.
// - `sprouting.rs`:    Sprouting rules and `sprout_nodes`.
// - `spellout.rs`:     `insert_vi`, triggers and super matches.
// - `segmentation.rs`: Morph alignment and VI hypotheses during PROCESS.
// - `learner.rs`:      `Learner`, `LearnerState`, the PROCESS/TEST/REINFORCE
//                      loop, the gender memo and held-out evaluation.
// - `report.rs`:       CSV reports and weight traces.
// - `config.rs`, `error.rs`: `LearnerConfig` (JSON) and the error enums.
//
// The `learn` binary (`main.rs`) is thin glue around `Learner`.
//
// Determinism constraint: all randomness comes from one
// `italian_dm_prng::LearnerRng` consumed in a fixed order, and every
// collection that is iterated is ordered (`Vec`, `BTreeSet`, `BTreeMap`).
// Same seed, same corpus, same grammar.

pub mod chain;
pub mod choice;
pub mod config;
pub mod error;
pub mod features;
pub mod input;
pub mod learner;
pub mod numeration;
pub mod report;
pub mod segmentation;
pub mod spellout;
pub mod sprouting;
pub mod terminal;
pub mod vocabulary;

pub use chain::{LinearItem, Node, TerminalChain, merge};
pub use choice::{Chooser, FixedChooser};
pub use config::{Affix, LearnerConfig, LearnerVariant};
pub use error::{InputError, LearnerError, StructuralError};
pub use input::{Observation, find_roots, parse_input, parse_observations, parse_roots};
pub use learner::{Learner, LearnerState, ObservationOutcome, TrialRecord};
pub use terminal::{Terminal, TerminalKind};
pub use vocabulary::{VocabularyInventory, VocabularyItem};

/// The bundled toy Root inventory.
pub fn sample_roots() -> &'static str {
    include_str!("../data/roots.txt")
}

/// The bundled toy corpus.
pub fn sample_corpus() -> &'static str {
    include_str!("../data/sample_input.txt")
}
