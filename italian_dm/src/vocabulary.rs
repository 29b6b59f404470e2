// Vocabulary Items and the inventory that learns them.
//
// A Vocabulary Item (VI) pairs an exponent with the terminal label and the
// feature subset it spells out. Items are never removed: the inventory is an
// append-only `Vec`, items are addressed by index (`VocabularyItemId`), and an
// item retires by having its weight decay to the floor.
//
// Two items are the same item when pronunciation, label, values and triggers
// match; diacritic and weight are bookkeeping. `create_vi` enforces this, so
// re-deriving a form reuses (and slightly rewards) what is already known.
//
// `generalize_vi` is the segmentation step. When a new item shares both
// feature values and a piece of pronunciation at the same edge with an
// existing item of the same label, the shared piece becomes an item for the
// shared values, and what is left on either side becomes an item for what
// is left of the values. Which of those pieces counts as an agreement (`Agr`)
// exponent depends on the word edge it sits at: in a suffixing grammar the
// outer (rightmost) piece is the agreement exponent. A `-` at the cut is
// dropped from both pieces; a cut with no `-` marks the pair as fused. The
// returned `SplitPair`s become sprouting rules.
//
// See also: `spellout.rs` (insertion), `sprouting.rs` (rules built from
// the pairs), `learner.rs` (VI generation and reinforcement).

use crate::config::{Affix, LearnerConfig};
use crate::features::{FeatureSet, join};
use crate::terminal::AGR_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Pronunciation of a silent exponent.
pub const NULL_EXPONENT: &str = "null";

pub type VocabularyItemId = usize;

/// Pins the exponent `target` (a diacritic) on the next terminal when
/// `precondition` holds in the current word.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Trigger {
    pub target: String,
    pub precondition: FeatureSet,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{{{}}}", self.target, join(&self.precondition, ","))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub pronunciation: String,
    pub label: String,
    pub values: FeatureSet,
    pub diacritic: String,
    pub triggers: BTreeSet<Trigger>,
    pub weight: f64,
}

impl PartialEq for VocabularyItem {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other) && self.triggers == other.triggers
    }
}

impl VocabularyItem {
    /// Equality including diacritic and weight.
    pub fn full_equality(&self, other: &Self) -> bool {
        self == other && self.diacritic == other.diacritic && self.weight == other.weight
    }

    /// Same pronunciation, label and values; triggers may differ.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.pronunciation == other.pronunciation
            && self.label == other.label
            && self.values == other.values
    }

    pub fn is_null(&self) -> bool {
        self.pronunciation == NULL_EXPONENT
    }

    /// Whether this item may spell out a terminal with `label` and `values`.
    pub fn matches(&self, label: &str, values: &FeatureSet) -> bool {
        self.label == label && self.values.is_subset(values)
    }
}

impl fmt::Display for VocabularyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} /{}/ <-> {}[{}]",
            self.diacritic,
            self.pronunciation,
            self.label,
            join(&self.values, ",")
        )?;
        if !self.triggers.is_empty() {
            let triggers: Vec<String> = self.triggers.iter().map(ToString::to_string).collect();
            write!(f, " triggers {}", triggers.join(" "))?;
        }
        Ok(())
    }
}

/// A sprouting-rule proposal from `generalize_vi`: `split_off` was cut out
/// of `source`. `fused` when the two exponents were written with no `-`
/// between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitPair {
    pub split_off: VocabularyItemId,
    pub source: VocabularyItemId,
    pub fused: bool,
}

/// All Vocabulary Items learned so far.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VocabularyInventory {
    items: Vec<VocabularyItem>,
}

impl VocabularyInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: VocabularyItemId) -> Option<&VocabularyItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: VocabularyItemId) -> Option<&mut VocabularyItem> {
        self.items.get_mut(id)
    }

    pub fn items(&self) -> &[VocabularyItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = (VocabularyItemId, &VocabularyItem)> {
        self.items.iter().enumerate()
    }

    pub fn find(&self, candidate: &VocabularyItem) -> Option<VocabularyItemId> {
        self.items.iter().position(|item| item == candidate)
    }

    /// Look up or create an item. Returns `(is_new, id)`.
    ///
    /// An existing match gets `redo_bonus` added to its weight. A new item
    /// starts at `initial_weight` with diacritic `{pronunciation}_{n}`, where
    /// `n` is one more than the number of items already sharing the
    /// pronunciation.
    pub fn create_vi(
        &mut self,
        pronunciation: &str,
        label: &str,
        values: FeatureSet,
        triggers: BTreeSet<Trigger>,
        config: &LearnerConfig,
    ) -> (bool, VocabularyItemId) {
        let candidate = VocabularyItem {
            pronunciation: pronunciation.to_string(),
            label: label.to_string(),
            values,
            diacritic: String::new(),
            triggers,
            weight: config.initial_weight,
        };
        if let Some(id) = self.find(&candidate) {
            self.items[id].weight += config.redo_bonus;
            return (false, id);
        }
        let n = 1 + self
            .items
            .iter()
            .filter(|item| item.pronunciation == pronunciation)
            .count();
        let item = VocabularyItem {
            diacritic: format!("{pronunciation}_{n}"),
            ..candidate
        };
        tracing::debug!(item = %item, "new vocabulary item");
        self.items.push(item);
        (true, self.items.len() - 1)
    }

    /// Compare item `new_id` against every other item of its label and
    /// create the intersective generalizations. Returns the split pairs for
    /// sprouting-rule proposals.
    pub fn generalize_vi(
        &mut self,
        new_id: VocabularyItemId,
        affix: Affix,
        config: &LearnerConfig,
    ) -> Vec<SplitPair> {
        let Some(new) = self.items.get(new_id).cloned() else {
            return Vec::new();
        };
        if new.is_null() {
            return Vec::new();
        }
        let others: Vec<VocabularyItem> = self
            .items
            .iter()
            .enumerate()
            .filter(|(id, item)| {
                *id != new_id
                    && item.label == new.label
                    && !item.is_null()
                    && item.values != new.values
                    && !item.values.is_disjoint(&new.values)
            })
            .map(|(_, item)| item.clone())
            .collect();

        let mut pairs = Vec::new();
        for other in others {
            let Some(other_id) = self.find(&other) else {
                continue;
            };
            let shared_values: FeatureSet =
                new.values.intersection(&other.values).cloned().collect();

            if new.pronunciation == other.pronunciation {
                self.create_vi(
                    &new.pronunciation,
                    &new.label,
                    shared_values,
                    BTreeSet::new(),
                    config,
                );
                continue;
            }

            let Some(split) = split_pronunciations(&new.pronunciation, &other.pronunciation)
            else {
                continue;
            };
            let shared_is_outer = match (split.edge, affix) {
                (Edge::Suffix, Affix::Suffixing) | (Edge::Prefix, Affix::Prefixing) => true,
                (Edge::Prefix, Affix::Suffixing) | (Edge::Suffix, Affix::Prefixing) => false,
            };
            let (shared_label, residue_label) = if shared_is_outer {
                (AGR_LABEL, new.label.as_str())
            } else {
                (new.label.as_str(), AGR_LABEL)
            };

            let (_, shared_id) = self.create_vi(
                &split.shared,
                shared_label,
                shared_values,
                BTreeSet::new(),
                config,
            );
            let large_values: FeatureSet =
                other.values.difference(&new.values).cloned().collect();
            let large_residue = (!large_values.is_empty()).then(|| {
                self.create_vi(
                    &split.other_residue,
                    residue_label,
                    large_values,
                    BTreeSet::new(),
                    config,
                )
                .1
            });
            let new_values: FeatureSet = new.values.difference(&other.values).cloned().collect();
            let new_residue = (!new_values.is_empty()).then(|| {
                self.create_vi(
                    &split.new_residue,
                    residue_label,
                    new_values,
                    BTreeSet::new(),
                    config,
                )
                .1
            });

            let pair = |split_off, source, fused| SplitPair {
                split_off,
                source,
                fused,
            };
            if shared_is_outer {
                if split.other_residue != NULL_EXPONENT {
                    pairs.push(pair(shared_id, other_id, split.other_fused));
                }
                if split.new_residue != NULL_EXPONENT {
                    pairs.push(pair(shared_id, new_id, split.new_fused));
                }
            } else {
                if let Some(residue) = large_residue {
                    pairs.push(pair(residue, other_id, split.other_fused));
                }
                if let Some(residue) = new_residue {
                    pairs.push(pair(residue, new_id, split.new_fused));
                }
            }
        }
        pairs
    }

    /// Unify each used `null` item that carries triggers with its
    /// same-shaped siblings into one item holding all their triggers.
    /// Returns the ids of the unified items.
    pub fn combine_triggered_nulls(
        &mut self,
        used: &[VocabularyItemId],
        config: &LearnerConfig,
    ) -> Vec<VocabularyItemId> {
        let mut combined = Vec::new();
        for &id in used {
            let Some(item) = self.items.get(id).cloned() else {
                continue;
            };
            if !item.is_null() || item.triggers.is_empty() {
                continue;
            }
            let group: Vec<&VocabularyItem> = self
                .items
                .iter()
                .filter(|other| other.same_shape(&item) && !other.triggers.is_empty())
                .collect();
            if group.len() < 2 {
                continue;
            }
            let triggers: BTreeSet<Trigger> = group
                .iter()
                .flat_map(|other| other.triggers.iter().cloned())
                .collect();
            let weight = group.iter().map(|other| other.weight).fold(0.0, f64::max);
            let (_, union_id) = self.create_vi(
                &item.pronunciation,
                &item.label,
                item.values.clone(),
                triggers,
                config,
            );
            let union = &mut self.items[union_id];
            union.weight = union.weight.max(weight);
            if !combined.contains(&union_id) {
                combined.push(union_id);
            }
        }
        combined
    }
}

/// Which edge of both pronunciations the shared piece sits at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Prefix,
    Suffix,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Split {
    shared: String,
    new_residue: String,
    other_residue: String,
    /// No `-` stood between the shared piece and the residue.
    new_fused: bool,
    other_fused: bool,
    edge: Edge,
}

/// Strip `-` from the side of `piece` that faces the cut. Returns the
/// trimmed piece and whether anything was stripped.
fn trim_cut(piece: &str, cut_at_end: bool) -> (&str, bool) {
    let trimmed = if cut_at_end {
        piece.trim_end_matches('-')
    } else {
        piece.trim_start_matches('-')
    };
    (trimmed, trimmed.len() != piece.len())
}

/// Cut two pronunciations at their longest common substring, provided it
/// sits at the same edge of both. A `-` at the cut belongs to neither
/// piece. Empty residues become `null`.
fn split_pronunciations(new: &str, other: &str) -> Option<Split> {
    let a: Vec<char> = new.chars().collect();
    let b: Vec<char> = other.chars().collect();
    let (start_a, start_b, len) = longest_common_substring(&a, &b)?;

    let edge = if start_a == 0 && start_b == 0 {
        Edge::Prefix
    } else if start_a + len == a.len() && start_b + len == b.len() {
        Edge::Suffix
    } else {
        return None;
    };
    // A prefix-edge shared piece is cut at its end, its residue at its start.
    let shared_cut_at_end = edge == Edge::Prefix;
    let shared_raw: String = a[start_a..start_a + len].iter().collect();
    let (shared, shared_dash) = trim_cut(&shared_raw, shared_cut_at_end);
    if shared.is_empty() {
        return None;
    }
    let residue = |chars: &[char], start: usize| -> (String, bool) {
        let rest: String = match edge {
            Edge::Prefix => chars[start + len..].iter().collect(),
            Edge::Suffix => chars[..start].iter().collect(),
        };
        let (rest, dash) = trim_cut(&rest, !shared_cut_at_end);
        let fused = !(dash || shared_dash);
        if rest.is_empty() {
            (NULL_EXPONENT.to_string(), fused)
        } else {
            (rest.to_string(), fused)
        }
    };
    let (new_residue, new_fused) = residue(&a, start_a);
    let (other_residue, other_fused) = residue(&b, start_b);
    Some(Split {
        shared: shared.to_string(),
        new_residue,
        other_residue,
        new_fused,
        other_fused,
        edge,
    })
}

/// `(start_in_a, start_in_b, len)` of the longest common substring, the
/// earliest in `a` on ties. `None` when nothing is shared.
fn longest_common_substring(a: &[char], b: &[char]) -> Option<(usize, usize, usize)> {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                row[j] = prev[j - 1] + 1;
                if row[j] > best.2 {
                    best = (i - row[j], j - row[j], row[j]);
                }
            }
        }
        prev = row;
    }
    (best.2 > 0).then_some(best)
}
