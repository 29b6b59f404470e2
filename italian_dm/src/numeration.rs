// The numeration and derivation driver.
//
// `TerminalInventory` holds every learned head the learner can select:
// nominalizer (noun-class) hypotheses, semantic-terminal hypotheses and the
// adjectivalizer singleton. A derivation attempt has two steps:
//
// 1. `select_numeration` makes one weighted choice per slot and records the
//    inventory indices it picked (`Numeration`). Selection is also where
//    hypotheses are born: a feature bundle seen for the first time gets a
//    strong and a weak semantic terminal, and in the semantic variant a Root
//    no nominalizer selects yet may coin a fresh noun class.
// 2. `derive_terminal_chain` merges clones of the picked terminals, building
//    n+Root first (and a+Root separately for an adjective), then repeatedly
//    merging whichever remaining head selects the current chain while
//    selecting the fewest of the other remaining heads.
//
// `derive_matching` wraps both in the generate-and-test loop: it retries
// until the chain lines up with the surface words, penalizing the semantic
// terminals of each failed attempt, and gives up after
// `max_derivation_attempts` with `LearnerError::Ungenerateable`.
//
// Reinforcement never touches chains; it goes back to the inventory through
// the indices in `Numeration`.

use crate::chain::{LinearItem, Node, TerminalChain, merge};
use crate::choice::Chooser;
use crate::config::{Affix, LearnerConfig, LearnerVariant};
use crate::error::LearnerError;
use crate::features::{FeatureSet, dimension_label, feature_set, join};
use crate::input::{Observation, is_root_label};
use crate::terminal::{NOMINALIZER_LABEL, Terminal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The learned heads available to a derivation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerminalInventory {
    pub nominalizers: Vec<Terminal>,
    pub semantic_terminals: Vec<Terminal>,
    pub adjectivalizer: Terminal,
    /// Id of the next coined noun class.
    pub next_class_id: usize,
}

/// The inventory indices picked for one derivation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Numeration {
    pub nominalizer: usize,
    /// One semantic terminal per input slot, outermost first.
    pub semantic: Vec<usize>,
    pub noun_root: String,
    pub adjective_root: Option<String>,
}

/// A numeration together with the chain it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivation {
    pub numeration: Numeration,
    pub chain: TerminalChain,
    /// Attempts spent, including the successful one.
    pub attempts: usize,
}

impl TerminalInventory {
    /// The starting inventory for `config.variant`.
    ///
    /// The semantic variant starts with a single value-less nominalizer; the
    /// syntactic variant with one nominalizer per gender value.
    pub fn new(config: &LearnerConfig) -> Self {
        let nominalizers = match config.variant {
            LearnerVariant::Semantic => {
                vec![Terminal::nominalizer(FeatureSet::new(), config.initial_weight)]
            }
            LearnerVariant::Syntactic => vec![
                Terminal::nominalizer(feature_set([config.positive_gender()]), config.initial_weight),
                Terminal::nominalizer(feature_set([config.negative_gender()]), config.initial_weight),
            ],
        };
        TerminalInventory {
            nominalizers,
            semantic_terminals: Vec::new(),
            adjectivalizer: Terminal::adjectivalizer(config.adjectivalizer_weight),
            next_class_id: 1,
        }
    }

    /// Make sure both a strong and a weak hypothesis exist for `values`,
    /// each selecting `inner_label`. Returns the indices of all terminals
    /// whose values are exactly `values`.
    pub fn ensure_semantic_terminals(
        &mut self,
        values: &FeatureSet,
        inner_label: &str,
        config: &LearnerConfig,
    ) -> Vec<usize> {
        let existing: Vec<usize> = self
            .semantic_terminals
            .iter()
            .enumerate()
            .filter(|(_, t)| t.values == *values)
            .map(|(i, _)| i)
            .collect();
        if !existing.is_empty() {
            for &i in &existing {
                self.semantic_terminals[i]
                    .selectional
                    .insert(inner_label.to_string());
            }
            return existing;
        }
        let label = dimension_label(values);
        let selectional = BTreeSet::from([inner_label.to_string()]);
        let start = self.semantic_terminals.len();
        for strong in [true, false] {
            self.semantic_terminals.push(Terminal::semantic(
                label.clone(),
                values.clone(),
                selectional.clone(),
                strong,
                config.initial_weight,
            ));
        }
        tracing::debug!(values = %join(values, ","), label = %label, "new semantic terminal hypotheses");
        vec![start, start + 1]
    }

    /// Push a nominalizer for a fresh noun class and return its index.
    pub fn coin_nominalizer(&mut self, config: &LearnerConfig) -> usize {
        let class = format!("class_{}", self.next_class_id);
        self.next_class_id += 1;
        tracing::debug!(class = %class, "coined noun class");
        self.nominalizers
            .push(Terminal::nominalizer(feature_set([class]), config.initial_weight));
        self.nominalizers.len() - 1
    }

    /// Pick a nominalizer for `root`.
    ///
    /// With `gender` set, only nominalizers whose values are exactly that
    /// gender compete. Otherwise every nominalizer competes and, while none
    /// selects `root`, coining a new class is one more option.
    pub fn select_nominalizer(
        &mut self,
        root: &str,
        gender: Option<&str>,
        config: &LearnerConfig,
        chooser: &mut impl Chooser,
    ) -> Result<usize, LearnerError> {
        let candidates: Vec<usize> = match gender {
            Some(g) => {
                let wanted = feature_set([g]);
                self.nominalizers
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.values == wanted)
                    .map(|(i, _)| i)
                    .collect()
            }
            None => (0..self.nominalizers.len()).collect(),
        };
        if candidates.is_empty() {
            return Err(LearnerError::MissingNominalizer {
                values: gender.unwrap_or_default().to_string(),
            });
        }
        let mut weights: Vec<f64> = candidates
            .iter()
            .map(|&i| {
                let n = &self.nominalizers[i];
                let bonus = if n.selects(root) {
                    config.already_selects_bonus * n.values.len().max(1) as f64
                } else {
                    0.0
                };
                n.weight + bonus
            })
            .collect();
        let may_coin = gender.is_none() && !candidates.iter().any(|&i| self.nominalizers[i].selects(root));
        if may_coin {
            weights.push(config.new_nominalizer_weight);
        }
        match chooser.weighted_index(&weights) {
            Some(pick) if pick < candidates.len() => Ok(candidates[pick]),
            Some(_) => Ok(self.coin_nominalizer(config)),
            // All weights zero.
            None => Ok(candidates[0]),
        }
    }

    /// Make one weighted choice per slot of `observation`.
    pub fn select_numeration(
        &mut self,
        observation: &Observation,
        gender: Option<&str>,
        config: &LearnerConfig,
        chooser: &mut impl Chooser,
    ) -> Result<Numeration, LearnerError> {
        let noun_root = observation.noun_root().to_string();
        let nominalizer = self.select_nominalizer(&noun_root, gender, config, chooser)?;

        let mut semantic = Vec::with_capacity(observation.values.len());
        for (slot, values) in observation.values.iter().enumerate() {
            let inner_label = observation
                .values
                .get(slot + 1)
                .map(dimension_label)
                .unwrap_or_else(|| NOMINALIZER_LABEL.to_string());
            let candidates = self.ensure_semantic_terminals(values, &inner_label, config);
            let weights: Vec<f64> = candidates
                .iter()
                .map(|&i| self.semantic_terminals[i].weight)
                .collect();
            let pick = chooser.weighted_index(&weights).unwrap_or(0);
            semantic.push(candidates[pick]);
        }

        let adjective_root = observation.adjective_root().map(str::to_string);
        if let Some(root) = &adjective_root {
            self.adjectivalizer.selectional.insert(root.clone());
        }
        Ok(Numeration {
            nominalizer,
            semantic,
            noun_root,
            adjective_root,
        })
    }

    /// Merge the terminals of `numeration` into one chain.
    pub fn derive_terminal_chain(
        &self,
        numeration: &Numeration,
        affix: Affix,
    ) -> Result<TerminalChain, LearnerError> {
        let nominalizer = self.nominalizers.get(numeration.nominalizer).cloned().ok_or_else(|| {
            LearnerError::Config(format!("no nominalizer at index {}", numeration.nominalizer))
        })?;
        let mut chain = merge(
            &nominalizer.into(),
            &Terminal::root(&numeration.noun_root).into(),
            affix,
        )?;
        let adjective = match &numeration.adjective_root {
            Some(root) => Some(merge(
                &self.adjectivalizer.clone().into(),
                &Terminal::root(root).into(),
                affix,
            )?),
            None => None,
        };

        let mut remaining: Vec<Terminal> = Vec::with_capacity(numeration.semantic.len());
        for &i in &numeration.semantic {
            let terminal = self.semantic_terminals.get(i).cloned().ok_or_else(|| {
                LearnerError::Config(format!("no semantic terminal at index {i}"))
            })?;
            remaining.push(terminal);
        }

        while !remaining.is_empty() {
            let next = next_to_merge(&remaining, &chain.label);
            let selector = remaining.remove(next);
            chain = merge(&selector.into(), &Node::Chain(chain), affix)?;
        }
        if let Some(adjective) = adjective {
            chain = merge(&Node::Chain(chain), &Node::Chain(adjective), affix)?;
        }
        Ok(chain)
    }

    /// Generate and test until a chain lines up with `observation`.
    ///
    /// With `penalize` set, the semantic terminals of every rejected attempt
    /// lose `retry_penalty` (down to the floor).
    pub fn derive_matching(
        &mut self,
        observation: &Observation,
        gender: Option<&str>,
        config: &LearnerConfig,
        chooser: &mut impl Chooser,
        penalize: bool,
    ) -> Result<Derivation, LearnerError> {
        for attempt in 1..=config.max_derivation_attempts {
            let numeration = self.select_numeration(observation, gender, config, chooser)?;
            let chain = self.derive_terminal_chain(&numeration, config.affix)?;
            if is_consistent(&chain, observation) {
                tracing::debug!(chain = %chain, attempt, "derivation matches surface");
                return Ok(Derivation {
                    numeration,
                    chain,
                    attempts: attempt,
                });
            }
            if penalize {
                for &i in &numeration.semantic {
                    let t = &mut self.semantic_terminals[i];
                    t.weight = config.floored(t.weight - config.retry_penalty);
                }
            }
        }
        Err(LearnerError::Ungenerateable {
            surface: observation.surface.clone(),
            attempts: config.max_derivation_attempts,
        })
    }
}

/// Index of the remaining head to merge next over a chain labelled
/// `chain_label`: among those selecting it, the one selecting the fewest
/// other remaining heads, innermost on ties. With no selector, the
/// innermost remaining head.
fn next_to_merge(remaining: &[Terminal], chain_label: &str) -> usize {
    let ambiguity = |i: usize| {
        remaining
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && remaining[i].selects(&other.label))
            .count()
    };
    (0..remaining.len())
        .rev()
        .filter(|&i| remaining[i].selects(chain_label))
        .min_by_key(|&i| ambiguity(i))
        .unwrap_or(remaining.len() - 1)
}

/// Whether `chain` lines up with the surface words of `observation`: same
/// number of words, each word hosting the same Root (or none), and a
/// functional terminal on every side of a Root that has morphs.
pub fn is_consistent(chain: &TerminalChain, observation: &Observation) -> bool {
    if chain.boundary_count() != observation.boundary_count() {
        return false;
    }
    chain
        .word_slices()
        .into_iter()
        .zip(observation.words())
        .all(|(slice, morphs)| slice_fits(slice, &morphs))
}

fn slice_fits(slice: &[LinearItem], morphs: &[&str]) -> bool {
    let leaves: Vec<&Terminal> = slice.iter().filter_map(LinearItem::leaf).collect();
    let chain_root = leaves.iter().position(|t| t.is_root());
    let surface_root = morphs.iter().position(|m| is_root_label(m));
    match (chain_root, surface_root) {
        (None, None) => !leaves.is_empty(),
        (Some(c), Some(s)) => {
            if leaves[c].label != morphs[s] {
                return false;
            }
            let before_ok = s == 0 || c > 0;
            let after_ok = s + 1 == morphs.len() || c + 1 < leaves.len();
            before_ok && after_ok
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::FixedChooser;
    use italian_dm_prng::LearnerRng;

    fn config() -> LearnerConfig {
        LearnerConfig::default()
    }

    fn la_key() -> Observation {
        Observation::new(
            "la#KEY-e",
            vec![feature_set(["+definite"]), feature_set(["+atomic", "+minimal"])],
        )
        .unwrap()
    }

    #[test]
    fn test_initial_nominalizers_per_variant() {
        let semantic = TerminalInventory::new(&config());
        assert_eq!(semantic.nominalizers.len(), 1);
        assert!(semantic.nominalizers[0].values.is_empty());

        let syntactic = TerminalInventory::new(&LearnerConfig {
            variant: LearnerVariant::Syntactic,
            ..config()
        });
        let values: Vec<String> = syntactic
            .nominalizers
            .iter()
            .map(|n| join(&n.values, ","))
            .collect();
        assert_eq!(values, vec!["+feminine", "-feminine"]);
    }

    #[test]
    fn test_ensure_semantic_terminals() {
        let mut inv = TerminalInventory::new(&config());
        let sg = feature_set(["+atomic", "+minimal"]);
        let ids = inv.ensure_semantic_terminals(&sg, "n", &config());
        assert_eq!(ids, vec![0, 1]);
        assert!(inv.semantic_terminals[0].selection_strength);
        assert!(!inv.semantic_terminals[1].selection_strength);
        assert_eq!(inv.semantic_terminals[0].label, "atomic_minimal");

        let again = inv.ensure_semantic_terminals(&sg, "diminutive", &config());
        assert_eq!(again, ids);
        assert_eq!(inv.semantic_terminals.len(), 2);
        assert!(inv.semantic_terminals[1].selects("diminutive"));
        assert!(inv.semantic_terminals[1].selects("n"));
    }

    #[test]
    fn test_select_numeration_records_slots() {
        let mut inv = TerminalInventory::new(&config());
        let obs = la_key();
        let numeration = inv
            .select_numeration(&obs, None, &config(), &mut FixedChooser::new(0))
            .unwrap();
        assert_eq!(numeration.nominalizer, 0);
        assert_eq!(numeration.semantic, vec![0, 2]);
        assert_eq!(numeration.noun_root, "KEY");
        // The definite heads select the number label, number selects n.
        assert!(inv.semantic_terminals[0].selects("atomic_minimal"));
        assert!(inv.semantic_terminals[2].selects("n"));
    }

    #[test]
    fn test_coining_only_while_root_is_unselected() {
        let mut inv = TerminalInventory::new(&config());
        // FixedChooser(1) takes the second positive option: the coin.
        let coined = inv
            .select_nominalizer("KEY", None, &config(), &mut FixedChooser::new(1))
            .unwrap();
        assert_eq!(coined, 1);
        assert_eq!(inv.nominalizers[1].values, feature_set(["class_1"]));
        assert_eq!(inv.next_class_id, 2);

        inv.nominalizers[0].selectional.insert("KEY".to_string());
        let picked = inv
            .select_nominalizer("KEY", None, &config(), &mut FixedChooser::new(5))
            .unwrap();
        assert_eq!(picked, 1);
        assert_eq!(inv.nominalizers.len(), 2);
    }

    #[test]
    fn test_gender_lookup() {
        let syntactic = LearnerConfig {
            variant: LearnerVariant::Syntactic,
            ..config()
        };
        let mut inv = TerminalInventory::new(&syntactic);
        let picked = inv
            .select_nominalizer("KEY", Some("-feminine"), &syntactic, &mut FixedChooser::new(0))
            .unwrap();
        assert_eq!(picked, 1);

        let mut semantic = TerminalInventory::new(&config());
        assert!(matches!(
            semantic.select_nominalizer("KEY", Some("+feminine"), &config(), &mut FixedChooser::new(0)),
            Err(LearnerError::MissingNominalizer { .. })
        ));
    }

    #[test]
    fn test_derive_chain_order() {
        let c = config();
        let mut inv = TerminalInventory::new(&c);
        let def = inv.ensure_semantic_terminals(&feature_set(["+definite"]), "atomic_minimal", &c);
        let num = inv.ensure_semantic_terminals(&feature_set(["+atomic", "+minimal"]), "n", &c);
        let numeration = Numeration {
            nominalizer: 0,
            // weak definite, strong number
            semantic: vec![def[1], num[0]],
            noun_root: "KEY".to_string(),
            adjective_root: None,
        };
        let chain = inv.derive_terminal_chain(&numeration, Affix::Suffixing).unwrap();
        assert_eq!(
            chain.to_string(),
            "definite[+atomic,+definite,+minimal]#KEY-n[]-atomic_minimal[+atomic,+minimal]"
        );
        assert!(is_consistent(&chain, &la_key()));

        let all_strong = Numeration {
            semantic: vec![def[0], num[0]],
            ..numeration
        };
        let chain = inv.derive_terminal_chain(&all_strong, Affix::Suffixing).unwrap();
        assert_eq!(chain.boundary_count(), 0);
        assert!(!is_consistent(&chain, &la_key()));
    }

    #[test]
    fn test_adjective_is_its_own_word() {
        let c = config();
        let mut inv = TerminalInventory::new(&c);
        let obs = Observation::new(
            "il#BOOK-o#BIG-e",
            vec![feature_set(["+definite"]), feature_set(["+atomic", "+minimal"])],
        )
        .unwrap();
        let derivation = inv
            .derive_matching(&obs, None, &c, &mut LearnerRng::new(9), true)
            .unwrap();
        assert_eq!(derivation.chain.boundary_count(), 2);
        assert!(inv.adjectivalizer.selects("BIG"));
        let a = derivation.chain.leaves().last().unwrap();
        assert_eq!(a.label, "a");
        assert!(a.values.contains("+definite"));
    }

    #[test]
    fn test_derive_matching_penalizes_rejected_attempts() {
        // Far enough above the floor that no penalty is clamped.
        let c = LearnerConfig {
            initial_weight: 10.0,
            ..config()
        };
        let mut inv = TerminalInventory::new(&c);
        let mut rng = LearnerRng::new(3);
        let derivation = inv.derive_matching(&la_key(), None, &c, &mut rng, true).unwrap();
        assert!(is_consistent(&derivation.chain, &la_key()));
        let total: f64 = inv.semantic_terminals.iter().map(|t| t.weight).sum();
        let expected_loss = (derivation.attempts - 1) as f64 * 2.0 * c.retry_penalty;
        assert!((4.0 * c.initial_weight - total - expected_loss).abs() < 1e-9);
    }

    #[test]
    fn test_ungenerateable_after_cap() {
        let c = LearnerConfig {
            max_derivation_attempts: 5,
            ..config()
        };
        let mut inv = TerminalInventory::new(&c);
        let obs = Observation::new("la#lo#KEY-e", vec![feature_set(["+definite"])]).unwrap();
        let err = inv
            .derive_matching(&obs, None, &c, &mut LearnerRng::new(1), false)
            .unwrap_err();
        assert!(matches!(err, LearnerError::Ungenerateable { attempts: 5, .. }));
        assert!(inv.semantic_terminals.iter().all(|t| t.weight == c.initial_weight));
    }

    #[test]
    fn test_slice_fits_requires_terminal_beside_root() {
        let root = LinearItem::Leaf(Terminal::root("KEY"));
        assert!(!slice_fits(std::slice::from_ref(&root), &["KEY", "e"]));
        assert!(slice_fits(std::slice::from_ref(&root), &["KEY"]));
        assert!(!slice_fits(
            std::slice::from_ref(&root),
            &["BOOK"]
        ));
    }
}
