// Hypothesizing Vocabulary Items from a derived chain and its surface form.
//
// Each surface word is cut into morphs on `-` and lined up with the word
// slice of the chain that hosts the same Root. Functional terminals before
// the Root take the morphs before it, terminals after the Root take the
// morphs after it; a word without a Root is lined up as a whole. When a side
// has more terminals than morphs, a random ordered subset of the terminals is
// overt and the rest are silent (`null`). When it has fewer, the outermost
// terminal takes the leftover morphs fused together with `-`.
//
// Items are created right to left across the whole form, so that a silent
// terminal can point at the overt exponent that follows it, in its own word
// or a later one: its item gets a trigger pinning that exponent's diacritic
// when the overt terminal's values, as far as the silent terminal's word
// carries them, hold. Every item that is genuinely new is generalized
// against the inventory, and each split it reports becomes a sprouting rule.

use crate::chain::{LinearItem, TerminalChain};
use crate::choice::Chooser;
use crate::config::LearnerConfig;
use crate::error::StructuralError;
use crate::features::FeatureSet;
use crate::input::{Observation, is_root_label};
use crate::sprouting::{SproutingRule, add_rule};
use crate::terminal::Terminal;
use crate::vocabulary::{NULL_EXPONENT, Trigger, VocabularyInventory, VocabularyItemId};
use std::collections::BTreeSet;

/// What one round of VI generation produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segmentation {
    /// Every item the chain was spelled with, new or re-found, in linear order.
    pub items: Vec<VocabularyItemId>,
    /// The subset of `items` that did not exist before.
    pub new_items: Vec<VocabularyItemId>,
    /// Sprouting rules added by generalization.
    pub new_rules: Vec<usize>,
}

/// Which end of a run of terminals is outermost in the word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outer {
    First,
    Last,
}

/// Assign a morph (or `null`) to every functional terminal of `chain`.
///
/// Returns, per word, the terminals in linear order paired with their
/// exponent. Roots are left out.
pub fn align<'a>(
    chain: &'a TerminalChain,
    observation: &Observation,
    chooser: &mut impl Chooser,
) -> Result<Vec<Vec<(&'a Terminal, String)>>, StructuralError> {
    let slices = chain.word_slices();
    let words = observation.words();
    if slices.len() != words.len() {
        return Err(StructuralError::WordCountMismatch {
            chain: slices.len(),
            surface: words.len(),
        });
    }

    let mut aligned = Vec::with_capacity(words.len());
    for (word, (slice, morphs)) in slices.into_iter().zip(words).enumerate() {
        let leaves: Vec<&Terminal> = slice.iter().filter_map(LinearItem::leaf).collect();
        let chain_root = leaves.iter().position(|t| t.is_root());
        let surface_root = morphs.iter().position(|m| is_root_label(m));

        let mut pairs = Vec::with_capacity(leaves.len());
        match (chain_root, surface_root) {
            (None, None) => {
                pairs.extend(align_side(word, &leaves, &morphs, Outer::Last, chooser)?);
            }
            (Some(c), Some(s)) if leaves[c].label == morphs[s] => {
                pairs.extend(align_side(word, &leaves[..c], &morphs[..s], Outer::First, chooser)?);
                pairs.extend(align_side(
                    word,
                    &leaves[c + 1..],
                    &morphs[s + 1..],
                    Outer::Last,
                    chooser,
                )?);
            }
            _ => {
                return Err(StructuralError::Alignment {
                    word,
                    reason: "root placement differs from the surface".to_string(),
                });
            }
        }
        aligned.push(pairs);
    }
    Ok(aligned)
}

fn align_side<'a>(
    word: usize,
    terminals: &[&'a Terminal],
    morphs: &[&str],
    outer: Outer,
    chooser: &mut impl Chooser,
) -> Result<Vec<(&'a Terminal, String)>, StructuralError> {
    let (n, m) = (terminals.len(), morphs.len());
    if n == 0 {
        if m == 0 {
            return Ok(Vec::new());
        }
        return Err(StructuralError::Alignment {
            word,
            reason: format!("{m} morphs but no terminal to spell them"),
        });
    }

    let exponents: Vec<String> = if n == m {
        morphs.iter().map(|m| m.to_string()).collect()
    } else if n > m {
        let overt = chooser.ordered_subset(n, m);
        let mut next_morph = morphs.iter();
        (0..n)
            .map(|i| {
                let morph = if overt.contains(&i) { next_morph.next() } else { None };
                morph.map_or_else(|| NULL_EXPONENT.to_string(), |m| m.to_string())
            })
            .collect()
    } else {
        let fused = m - n + 1;
        match outer {
            Outer::Last => {
                let mut out: Vec<String> = morphs[..n - 1].iter().map(|m| m.to_string()).collect();
                out.push(morphs[n - 1..].join("-"));
                out
            }
            Outer::First => {
                let mut out = vec![morphs[..fused].join("-")];
                out.extend(morphs[fused..].iter().map(|m| m.to_string()));
                out
            }
        }
    };
    Ok(terminals.iter().copied().zip(exponents).collect())
}

/// Create (or re-find) the items spelling out `chain` as `observation`,
/// generalize the new ones and record the sprouting rules they suggest.
pub fn generate_vis(
    chain: &TerminalChain,
    observation: &Observation,
    vocabulary: &mut VocabularyInventory,
    rules: &mut Vec<SproutingRule>,
    config: &LearnerConfig,
    chooser: &mut impl Chooser,
) -> Result<Segmentation, StructuralError> {
    let aligned = align(chain, observation, chooser)?;
    let mut result = Segmentation::default();
    let mut per_word = Vec::with_capacity(aligned.len());

    // Diacritic and values of the nearest overt exponent to the right.
    let mut next_overt: Option<(String, &Terminal)> = None;
    for word in aligned.iter().rev() {
        let mut word_items = Vec::with_capacity(word.len());
        let word_values: FeatureSet = word
            .iter()
            .flat_map(|(terminal, _)| terminal.values.iter().cloned())
            .collect();
        for (terminal, exponent) in word.iter().rev() {
            let is_null = exponent == NULL_EXPONENT;
            let triggers: BTreeSet<Trigger> = match (&next_overt, is_null) {
                (Some((diacritic, overt)), true) => BTreeSet::from([Trigger {
                    target: diacritic.clone(),
                    precondition: overt.values.intersection(&word_values).cloned().collect(),
                }]),
                _ => BTreeSet::new(),
            };
            let (is_new, id) = vocabulary.create_vi(
                exponent,
                &terminal.label,
                terminal.values.clone(),
                triggers,
                config,
            );
            next_overt = match vocabulary.get(id) {
                Some(item) if !is_null => Some((item.diacritic.clone(), *terminal)),
                _ => None,
            };
            if is_new {
                result.new_items.push(id);
            }
            word_items.push(id);
        }
        word_items.reverse();
        per_word.push(word_items);
    }
    per_word.reverse();
    result.items = per_word.into_iter().flatten().collect();

    for &id in &result.new_items {
        for pair in vocabulary.generalize_vi(id, config.affix, config) {
            let (Some(split_item), Some(source_item)) =
                (vocabulary.get(pair.split_off), vocabulary.get(pair.source))
            else {
                continue;
            };
            let Some(rule) = SproutingRule::from_pair(
                split_item,
                source_item,
                pair.fused,
                config.rule_initial_weight,
            ) else {
                continue;
            };
            let (is_new, rule_id) = add_rule(rules, rule);
            if is_new {
                result.new_rules.push(rule_id);
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::merge;
    use crate::choice::FixedChooser;
    use crate::config::Affix;
    use crate::features::feature_set;

    fn la_key_chain() -> TerminalChain {
        let n = Terminal::nominalizer(feature_set(["class_1"]), 1.0);
        let n_chain = merge(&n.into(), &Terminal::root("KEY").into(), Affix::Suffixing).unwrap();
        let num = Terminal::semantic(
            "atomic_minimal",
            feature_set(["+atomic", "+minimal"]),
            feature_set(["n"]),
            true,
            1.0,
        );
        let num_chain = merge(&num.into(), &n_chain.into(), Affix::Suffixing).unwrap();
        let def = Terminal::semantic(
            "definite",
            feature_set(["+definite"]),
            feature_set(["atomic_minimal"]),
            false,
            1.0,
        );
        merge(&def.into(), &num_chain.into(), Affix::Suffixing).unwrap()
    }

    fn obs(surface: &str) -> Observation {
        Observation::new(surface, vec![]).unwrap()
    }

    fn labels(aligned: &[Vec<(&Terminal, String)>]) -> Vec<Vec<(String, String)>> {
        aligned
            .iter()
            .map(|word| {
                word.iter()
                    .map(|(t, e)| (t.label.clone(), e.clone()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_align_more_terminals_than_morphs() {
        let chain = la_key_chain();
        let aligned = align(&chain, &obs("la#KEY-e"), &mut FixedChooser::new(1)).unwrap();
        assert_eq!(
            labels(&aligned),
            vec![
                vec![("definite".to_string(), "la".to_string())],
                vec![
                    ("n".to_string(), NULL_EXPONENT.to_string()),
                    ("atomic_minimal".to_string(), "e".to_string())
                ],
            ]
        );
    }

    #[test]
    fn test_align_fuses_leftover_morphs_outermost() {
        let chain = la_key_chain();
        let aligned = align(&chain, &obs("la#KEY-in-o-lo"), &mut FixedChooser::new(0)).unwrap();
        assert_eq!(aligned[1][0].1, "in");
        assert_eq!(aligned[1][1].1, "o-lo");
    }

    #[test]
    fn test_align_rejects_misplaced_root() {
        let chain = la_key_chain();
        assert!(matches!(
            align(&chain, &obs("KEY#la"), &mut FixedChooser::new(0)),
            Err(StructuralError::Alignment { word: 0, .. })
        ));
        assert!(matches!(
            align(&chain, &obs("KEY"), &mut FixedChooser::new(0)),
            Err(StructuralError::WordCountMismatch {
                chain: 2,
                surface: 1
            })
        ));
    }

    #[test]
    fn test_generate_vis_adds_trigger_on_null() {
        let chain = la_key_chain();
        let config = LearnerConfig::default();
        let mut vocabulary = VocabularyInventory::new();
        let mut rules = Vec::new();
        let result = generate_vis(
            &chain,
            &obs("la#KEY-e"),
            &mut vocabulary,
            &mut rules,
            &config,
            &mut FixedChooser::new(1),
        )
        .unwrap();
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.new_items.len(), 3);

        let la = vocabulary.get(result.items[0]).unwrap();
        assert_eq!(la.pronunciation, "la");
        assert_eq!(la.values, feature_set(["+atomic", "+definite", "+minimal"]));
        let null_n = vocabulary.get(result.items[1]).unwrap();
        assert!(null_n.is_null());
        let trigger = null_n.triggers.iter().next().unwrap();
        assert_eq!(trigger.target, "e_1");
        assert_eq!(trigger.precondition, feature_set(["+atomic", "+minimal"]));
        let e = vocabulary.get(result.items[2]).unwrap();
        assert_eq!(e.label, "atomic_minimal");

        // A second pass finds the same items.
        let again = generate_vis(
            &chain,
            &obs("la#KEY-e"),
            &mut vocabulary,
            &mut rules,
            &config,
            &mut FixedChooser::new(1),
        )
        .unwrap();
        assert!(again.new_items.is_empty());
        assert_eq!(again.items, result.items);
    }

    #[test]
    fn test_silent_noun_suffix_triggers_adjective_agreement() {
        let adjective = merge(
            &Terminal::adjectivalizer(999.0).into(),
            &Terminal::root("RED").into(),
            Affix::Suffixing,
        )
        .unwrap();
        let chain = merge(&la_key_chain().into(), &adjective.into(), Affix::Suffixing).unwrap();
        let config = LearnerConfig::default();
        let mut vocabulary = VocabularyInventory::new();
        let mut rules = Vec::new();
        // Chooser 0 makes `n` overt and leaves the number head silent.
        let result = generate_vis(
            &chain,
            &obs("la#KEY-e#RED-a"),
            &mut vocabulary,
            &mut rules,
            &config,
            &mut FixedChooser::new(0),
        )
        .unwrap();
        let spelled: Vec<&str> = result
            .items
            .iter()
            .map(|&id| vocabulary.get(id).unwrap().pronunciation.as_str())
            .collect();
        assert_eq!(spelled, vec!["la", "e", NULL_EXPONENT, "a"]);

        let silent = vocabulary.get(result.items[2]).unwrap();
        assert_eq!(silent.label, "atomic_minimal");
        let trigger = silent.triggers.iter().next().unwrap();
        assert_eq!(trigger.target, "a_1");
        // The adjective also carries +definite and class_1; only what the
        // noun word holds survives.
        assert_eq!(
            trigger.precondition,
            feature_set(["+atomic", "+minimal", "class_1"])
        );
        // The overt definite in the first word stays trigger-free.
        assert!(vocabulary.get(result.items[0]).unwrap().triggers.is_empty());
    }
}
