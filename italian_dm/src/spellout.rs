// Spell-out: choosing a Vocabulary Item for every terminal of a chain.
//
// The chain is walked left to right, one word slice at a time. Roots are
// pronounced by their label. Every other terminal competes its matching
// items (same label, values a subset of the terminal's, positive weight) in
// a weighted lottery; more specific items get `specificity_bonus` per value.
//
// Triggers pin exponents at a distance. An item with triggers, once
// inserted, pins the target diacritic of every trigger whose precondition
// holds in the current word; a silent item without triggers passes the pins
// it received straight on. Any other insertion clears them. If pinned items
// are among the next terminal's candidates ("super matches"), only they
// compete, with `diacritic_bonus` on top. Pins survive word boundaries, so
// a silent noun suffix can choose the adjective's agreement exponent.
//
// Exponents are joined with `-` unless every join crossed since the last
// overt exponent was a `+` (a fused sprout), in which case they are written
// together.

use crate::chain::{LinearItem, TerminalChain};
use crate::choice::Chooser;
use crate::config::LearnerConfig;
use crate::error::StructuralError;
use crate::features::FeatureSet;
use crate::terminal::Terminal;
use crate::vocabulary::{VocabularyInventory, VocabularyItemId};
use std::collections::BTreeSet;

/// Result of spelling out one chain.
#[derive(Clone, Debug, PartialEq)]
pub struct SpellOut {
    /// Words joined with `#`, exponents with `-` (nothing across a `+`),
    /// silent exponents dropped.
    pub pronunciation: String,
    /// Items inserted, in linear order.
    pub items_used: Vec<VocabularyItemId>,
    /// False when some terminal had no matching item.
    pub complete: bool,
}

pub fn insert_vi(
    chain: &TerminalChain,
    inventory: &VocabularyInventory,
    chooser: &mut impl Chooser,
    config: &LearnerConfig,
) -> Result<SpellOut, StructuralError> {
    chain.validate()?;

    let mut words = Vec::new();
    let mut items_used = Vec::new();
    let mut complete = true;
    let mut pinned: BTreeSet<String> = BTreeSet::new();

    for slice in chain.word_slices() {
        let word_values: FeatureSet = slice
            .iter()
            .filter_map(LinearItem::leaf)
            .flat_map(|t| t.values.iter().cloned())
            .collect();
        let mut word = String::new();
        // Every join since the last overt exponent was a `+`.
        let mut glued = true;

        for item in slice {
            let exponent = match item {
                LinearItem::MorphemeBoundary => {
                    glued = false;
                    continue;
                }
                LinearItem::FusionBoundary | LinearItem::WordBoundary => continue,
                LinearItem::Leaf(terminal) if terminal.is_root() => terminal.label.as_str(),
                LinearItem::Leaf(terminal) => {
                    let Some(id) = choose_item(terminal, inventory, &pinned, chooser, config)
                    else {
                        tracing::warn!(terminal = %terminal, "no vocabulary item matches");
                        complete = false;
                        pinned.clear();
                        continue;
                    };
                    items_used.push(id);
                    let Some(vi) = inventory.get(id) else {
                        continue;
                    };
                    if !vi.triggers.is_empty() {
                        pinned = vi
                            .triggers
                            .iter()
                            .filter(|t| t.precondition.is_subset(&word_values))
                            .map(|t| t.target.clone())
                            .collect();
                    } else if !vi.is_null() {
                        pinned.clear();
                    }
                    if vi.is_null() {
                        continue;
                    }
                    vi.pronunciation.as_str()
                }
            };
            if !word.is_empty() && !glued {
                word.push('-');
            }
            word.push_str(exponent);
            glued = true;
        }
        words.push(word);
    }

    Ok(SpellOut {
        pronunciation: words.join("#"),
        items_used,
        complete,
    })
}

fn choose_item(
    terminal: &Terminal,
    inventory: &VocabularyInventory,
    pinned: &BTreeSet<String>,
    chooser: &mut impl Chooser,
    config: &LearnerConfig,
) -> Option<VocabularyItemId> {
    let candidates: Vec<VocabularyItemId> = inventory
        .iter()
        .filter(|(_, item)| item.weight > 0.0 && item.matches(&terminal.label, &terminal.values))
        .map(|(id, _)| id)
        .collect();
    let super_matches: Vec<VocabularyItemId> = candidates
        .iter()
        .copied()
        .filter(|&id| {
            inventory.get(id).is_some_and(|item| {
                pinned.contains(&item.diacritic) || pinned.contains(&item.pronunciation)
            })
        })
        .collect();

    let (pool, bonus) = if super_matches.is_empty() {
        (candidates, 0.0)
    } else {
        (super_matches, config.diacritic_bonus)
    };
    let weights: Vec<f64> = pool
        .iter()
        .filter_map(|&id| inventory.get(id))
        .map(|item| item.weight + bonus + config.specificity_bonus * item.values.len() as f64)
        .collect();
    let pick = chooser.weighted_index(&weights)?;
    pool.get(pick).copied()
}
