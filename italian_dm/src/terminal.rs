// Terminal nodes: the grammatical heads a derivation is built from.
//
// All five head types share one `Terminal` struct and are told apart by a
// `TerminalKind` tag. Behavioral differences live in the data (selectional
// set, selection strength, weight) and in the few places that match on the
// kind (merge step 1 for Roots, spell-out for Roots, sprouting for Agr):
//
// - `Root`: bound lexical morpheme, uppercase label, no values, no weight.
//   Pronounced by its label; never receives a Vocabulary Item.
// - `Semantic`: a fixed feature bundle from the input (e.g. `{+definite}`),
//   learned weight, strong (affixal) or weak (free word) selection.
// - `Nominalizer`: a noun-class hypothesis. Always strong; its selectional
//   set grows as Roots are successfully derived with it.
// - `Adjectivalizer`: one per run, near-infinite weight, accumulates the
//   adjective Roots it has combined with.
// - `Agr`: produced only by sprouting; carries a split-off feature bundle
//   and lives only inside one derivation.
//
// Terminals are plain values. A derivation works on clones of the inventory
// entries, so nothing a chain does can leak back into the learner's state;
// reinforcement goes through inventory indices instead (see `numeration.rs`).

use crate::features::{FeatureSet, join};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Label of every nominalizer.
pub const NOMINALIZER_LABEL: &str = "n";
/// Label of the adjectivalizer singleton.
pub const ADJECTIVALIZER_LABEL: &str = "a";
/// Label of sprouted agreement nodes and of the Vocabulary Items spelling them.
pub const AGR_LABEL: &str = "Agr";

/// Which head type a `Terminal` is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalKind {
    Root,
    Semantic,
    Nominalizer,
    Adjectivalizer,
    Agr,
}

/// A grammatical head.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub kind: TerminalKind,
    pub label: String,
    pub values: FeatureSet,
    /// Labels this head may take as its complement.
    pub selectional: BTreeSet<String>,
    /// Strong selection affixes (`-`); weak selection leaves a word boundary (`#`).
    pub selection_strength: bool,
    /// Learned weight. Zero for Roots and Agr nodes, which are never chosen.
    pub weight: f64,
}

impl Terminal {
    pub fn root(label: impl Into<String>) -> Self {
        Terminal {
            kind: TerminalKind::Root,
            label: label.into(),
            values: FeatureSet::new(),
            selectional: BTreeSet::new(),
            selection_strength: false,
            weight: 0.0,
        }
    }

    pub fn semantic(
        label: impl Into<String>,
        values: FeatureSet,
        selectional: BTreeSet<String>,
        selection_strength: bool,
        weight: f64,
    ) -> Self {
        Terminal {
            kind: TerminalKind::Semantic,
            label: label.into(),
            values,
            selectional,
            selection_strength,
            weight,
        }
    }

    pub fn nominalizer(values: FeatureSet, weight: f64) -> Self {
        Terminal {
            kind: TerminalKind::Nominalizer,
            label: NOMINALIZER_LABEL.to_string(),
            values,
            selectional: BTreeSet::new(),
            selection_strength: true,
            weight,
        }
    }

    pub fn adjectivalizer(weight: f64) -> Self {
        Terminal {
            kind: TerminalKind::Adjectivalizer,
            label: ADJECTIVALIZER_LABEL.to_string(),
            values: FeatureSet::new(),
            selectional: BTreeSet::new(),
            selection_strength: true,
            weight,
        }
    }

    pub fn agr(values: FeatureSet) -> Self {
        Terminal {
            kind: TerminalKind::Agr,
            label: AGR_LABEL.to_string(),
            values,
            selectional: BTreeSet::new(),
            selection_strength: true,
            weight: 0.0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind == TerminalKind::Root
    }

    /// Whether this head already takes `label` as a complement.
    pub fn selects(&self, label: &str) -> bool {
        self.selectional.contains(label)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{}[{}]", self.label, join(&self.values, ","))
        }
    }
}
