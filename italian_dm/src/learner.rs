// The learning loop: PROCESS, TEST, REINFORCE.
//
// `Learner` owns the whole run: the config, the learned state and the one
// `Chooser` every stochastic decision draws from. Observations are folded in
// strictly one at a time through `observe()`:
//
//   PROCESS    derive a chain that lines up with the surface words (retrying
//              and penalizing semantic terminals on mismatch), then
//              hypothesize Vocabulary Items and sprouting rules from it.
//              Nothing sprouts here: items are learned from whole heads.
//   TEST       independently derive, sprout and spell out again, and compare
//              the result with the surface string.
//   REINFORCE  on a match, reward everything the TEST used, let the TEST
//              nominalizer select the Root and absorb compatible nominalizers
//              sharing a Root, and unify triggered silent items; on a
//              mismatch, push the items and rules the TEST used toward the
//              floor. Structural hypotheses are left alone on a mismatch.
//
// In the syntactic variant an observation normally carries no gender. The
// learner runs a full cycle guessing `+feminine` for the noun Root, falls
// back to `-feminine` if that TEST fails, and memoizes whichever guess
// succeeds. A gender value present in the input is used as given.
//
// `evaluate()` is the read-only counterpart used for held-out items: it
// derives on a scratch copy of the head inventory (the only part a
// derivation writes to) and spells out against the live vocabulary and
// rules, never touching weights.

use crate::choice::Chooser;
use crate::config::{LearnerConfig, LearnerVariant};
use crate::error::{InputError, LearnerError};
use crate::features::{FeatureSet, conflicts};
use crate::input::Observation;
use crate::numeration::{Derivation, Numeration, TerminalInventory};
use crate::segmentation::{Segmentation, generate_vis};
use crate::spellout::{SpellOut, insert_vi};
use crate::sprouting::{SproutingRule, sprout_nodes};
use crate::vocabulary::VocabularyInventory;
use italian_dm_prng::LearnerRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything a run learns. Serializable for checkpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerState {
    pub roots: BTreeSet<String>,
    pub terminals: TerminalInventory,
    pub vocabulary: VocabularyInventory,
    pub sprouting_rules: Vec<SproutingRule>,
    /// Gender committed per noun Root (syntactic variant).
    pub gender_memo: BTreeMap<String, String>,
    pub observations_seen: usize,
}

impl LearnerState {
    pub fn new(config: &LearnerConfig, roots: BTreeSet<String>) -> Self {
        LearnerState {
            roots,
            terminals: TerminalInventory::new(config),
            vocabulary: VocabularyInventory::new(),
            sprouting_rules: Vec::new(),
            gender_memo: BTreeMap::new(),
            observations_seen: 0,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One TEST derivation and its spell-out.
#[derive(Clone, Debug)]
struct TestAttempt {
    numeration: Numeration,
    spell_out: SpellOut,
    rules_used: Vec<usize>,
    success: bool,
}

/// What happened to one observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObservationOutcome {
    /// 1-based position in the stream of observations seen by this learner.
    pub index: usize,
    pub surface: String,
    /// The TEST spell-out.
    pub produced: String,
    pub success: bool,
    /// Gender guess the outcome was reached with (syntactic variant).
    pub gender: Option<String>,
    /// Derivation attempts spent in PROCESS.
    pub attempts: usize,
    /// Diacritics of the items inserted by the TEST.
    pub diacritics: Vec<String>,
    pub nominalizer_values: FeatureSet,
    /// Items and rules PROCESS added to the inventory.
    pub new_items: usize,
    pub new_rules: usize,
}

/// One held-out re-derivation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    pub success: bool,
    pub produced: String,
    pub diacritics: Vec<String>,
    pub nominalizer_values: FeatureSet,
    /// Success with a nominalizer that already selected the Root.
    pub contributed: bool,
}

pub struct Learner<C: Chooser = LearnerRng> {
    config: LearnerConfig,
    state: LearnerState,
    chooser: C,
}

impl Learner<LearnerRng> {
    /// A fresh learner seeded from `config.seed`.
    pub fn new(config: LearnerConfig, roots: BTreeSet<String>) -> Result<Self, LearnerError> {
        let rng = LearnerRng::new(config.seed);
        Self::with_chooser(config, roots, rng)
    }
}

impl<C: Chooser> Learner<C> {
    pub fn with_chooser(
        config: LearnerConfig,
        roots: BTreeSet<String>,
        chooser: C,
    ) -> Result<Self, LearnerError> {
        config.validate()?;
        let state = LearnerState::new(&config, roots);
        Ok(Learner {
            config,
            state,
            chooser,
        })
    }

    /// Resume from a saved state.
    pub fn from_state(
        config: LearnerConfig,
        state: LearnerState,
        chooser: C,
    ) -> Result<Self, LearnerError> {
        config.validate()?;
        Ok(Learner {
            config,
            state,
            chooser,
        })
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn state(&self) -> &LearnerState {
        &self.state
    }

    pub fn into_state(self) -> LearnerState {
        self.state
    }

    /// Learn from one observation.
    pub fn observe(&mut self, observation: &Observation) -> Result<ObservationOutcome, LearnerError> {
        self.check_roots(observation)?;
        self.state.observations_seen += 1;

        let outcome = match self.config.variant {
            LearnerVariant::Semantic => self.run_cycle(observation, None)?,
            LearnerVariant::Syntactic => self.observe_with_gender_guess(observation)?,
        };
        tracing::info!(
            index = outcome.index,
            surface = %outcome.surface,
            produced = %outcome.produced,
            success = outcome.success,
            "observation"
        );
        Ok(outcome)
    }

    fn observe_with_gender_guess(
        &mut self,
        observation: &Observation,
    ) -> Result<ObservationOutcome, LearnerError> {
        if let Some(given) = observation.gender() {
            return self.run_cycle(observation, Some(given));
        }
        let root = observation.noun_root().to_string();
        if let Some(gender) = self.state.gender_memo.get(&root).cloned() {
            return self.run_cycle(observation, Some(&gender));
        }
        let positive = self.config.positive_gender();
        let outcome = self.run_cycle(observation, Some(&positive))?;
        if outcome.success {
            self.commit_gender(root, positive);
            return Ok(outcome);
        }
        let negative = self.config.negative_gender();
        let outcome = self.run_cycle(observation, Some(&negative))?;
        if outcome.success {
            self.commit_gender(root, negative);
        }
        Ok(outcome)
    }

    fn commit_gender(&mut self, root: String, gender: String) {
        tracing::info!(root = %root, gender = %gender, "gender committed");
        self.state.gender_memo.insert(root, gender);
    }

    fn check_roots(&self, observation: &Observation) -> Result<(), InputError> {
        match observation.roots.iter().find(|r| !self.state.roots.contains(*r)) {
            Some(root) => Err(InputError::UnknownRoot {
                line: observation.line,
                root: root.clone(),
            }),
            None => Ok(()),
        }
    }

    /// One PROCESS, TEST, REINFORCE cycle.
    fn run_cycle(
        &mut self,
        observation: &Observation,
        gender: Option<&str>,
    ) -> Result<ObservationOutcome, LearnerError> {
        let (segmentation, attempts) = self.process(observation, gender)?;
        let attempt = self.test(observation, gender)?;
        if attempt.success {
            self.reinforce_success(observation, &attempt);
        } else {
            self.reinforce_failure(&attempt);
        }

        let nominalizer_values = self
            .state
            .terminals
            .nominalizers
            .get(attempt.numeration.nominalizer)
            .map(|n| n.values.clone())
            .unwrap_or_default();
        Ok(ObservationOutcome {
            index: self.state.observations_seen,
            surface: observation.surface.clone(),
            produced: attempt.spell_out.pronunciation.clone(),
            success: attempt.success,
            gender: gender.map(str::to_string),
            attempts,
            diacritics: self.diacritics(&attempt.spell_out),
            nominalizer_values,
            new_items: segmentation.new_items.len(),
            new_rules: segmentation.new_rules.len(),
        })
    }

    fn process(
        &mut self,
        observation: &Observation,
        gender: Option<&str>,
    ) -> Result<(Segmentation, usize), LearnerError> {
        let derivation = self.state.terminals.derive_matching(
            observation,
            gender,
            &self.config,
            &mut self.chooser,
            true,
        )?;
        let segmentation = generate_vis(
            &derivation.chain,
            observation,
            &mut self.state.vocabulary,
            &mut self.state.sprouting_rules,
            &self.config,
            &mut self.chooser,
        )?;
        Ok((segmentation, derivation.attempts))
    }

    fn test(
        &mut self,
        observation: &Observation,
        gender: Option<&str>,
    ) -> Result<TestAttempt, LearnerError> {
        let derivation = self.state.terminals.derive_matching(
            observation,
            gender,
            &self.config,
            &mut self.chooser,
            true,
        )?;
        spell_derivation(
            derivation,
            &self.state.vocabulary,
            &self.state.sprouting_rules,
            observation,
            &self.config,
            &mut self.chooser,
        )
    }

    fn reinforce_success(&mut self, observation: &Observation, attempt: &TestAttempt) {
        let reward = self.config.success_reward;
        let floor = self.config.weight_floor;
        let state = &mut self.state;
        let chosen = attempt.numeration.nominalizer;

        if let Some(n) = state.terminals.nominalizers.get_mut(chosen) {
            n.selectional.insert(observation.noun_root().to_string());
            n.weight += reward;
        }
        absorb_nominalizers(&mut state.terminals, chosen, floor);

        for &i in &attempt.numeration.semantic {
            if let Some(t) = state.terminals.semantic_terminals.get_mut(i) {
                t.weight += reward;
            }
        }
        for &i in &attempt.rules_used {
            if let Some(rule) = state.sprouting_rules.get_mut(i) {
                rule.weight += reward;
            }
        }
        for &id in &attempt.spell_out.items_used {
            if let Some(item) = state.vocabulary.get_mut(id) {
                item.weight += reward;
            }
        }
        state
            .vocabulary
            .combine_triggered_nulls(&attempt.spell_out.items_used, &self.config);
    }

    fn reinforce_failure(&mut self, attempt: &TestAttempt) {
        let config = &self.config;
        for &id in &attempt.spell_out.items_used {
            if let Some(item) = self.state.vocabulary.get_mut(id) {
                item.weight = config.floored(item.weight - config.failure_penalty);
            }
        }
        for &i in &attempt.rules_used {
            if let Some(rule) = self.state.sprouting_rules.get_mut(i) {
                rule.weight = config.floored(rule.weight - config.failure_penalty);
            }
        }
    }

    fn diacritics(&self, spell_out: &SpellOut) -> Vec<String> {
        spell_out
            .items_used
            .iter()
            .filter_map(|&id| self.state.vocabulary.get(id))
            .map(|item| item.diacritic.clone())
            .collect()
    }

    /// Re-derive `observation` `trials` times without learning anything.
    ///
    /// Each trial derives on a scratch copy of the head inventory, reset
    /// whenever a previous trial changed it, so the only thing an
    /// evaluation consumes is randomness.
    pub fn evaluate(
        &mut self,
        observation: &Observation,
        trials: usize,
    ) -> Result<Vec<TrialRecord>, LearnerError> {
        let root = observation.noun_root();
        let guesses: Vec<Option<String>> = match (self.config.variant, observation.gender()) {
            (LearnerVariant::Semantic, _) => vec![None],
            (LearnerVariant::Syntactic, Some(given)) => vec![Some(given.to_string())],
            (LearnerVariant::Syntactic, None) => match self.state.gender_memo.get(root) {
                Some(gender) => vec![Some(gender.clone())],
                None => vec![
                    Some(self.config.positive_gender()),
                    Some(self.config.negative_gender()),
                ],
            },
        };

        let mut scratch = self.state.terminals.clone();
        let mut records = Vec::with_capacity(trials);
        for _ in 0..trials {
            let mut record = None;
            for gender in &guesses {
                if scratch != self.state.terminals {
                    scratch.clone_from(&self.state.terminals);
                }
                let derivation = match scratch.derive_matching(
                    observation,
                    gender.as_deref(),
                    &self.config,
                    &mut self.chooser,
                    false,
                ) {
                    Ok(derivation) => derivation,
                    Err(LearnerError::Ungenerateable { .. }) => continue,
                    Err(e) => return Err(e),
                };
                let attempt = spell_derivation(
                    derivation,
                    &self.state.vocabulary,
                    &self.state.sprouting_rules,
                    observation,
                    &self.config,
                    &mut self.chooser,
                )?;
                let nominalizer = scratch.nominalizers.get(attempt.numeration.nominalizer);
                let contributed = attempt.success
                    && self
                        .state
                        .terminals
                        .nominalizers
                        .get(attempt.numeration.nominalizer)
                        .is_some_and(|n| n.selects(root));
                let success = attempt.success;
                record = Some(TrialRecord {
                    success,
                    produced: attempt.spell_out.pronunciation.clone(),
                    diacritics: self.diacritics(&attempt.spell_out),
                    nominalizer_values: nominalizer.map(|n| n.values.clone()).unwrap_or_default(),
                    contributed,
                });
                if success {
                    break;
                }
            }
            records.push(record.unwrap_or(TrialRecord {
                success: false,
                produced: String::new(),
                diacritics: Vec::new(),
                nominalizer_values: FeatureSet::new(),
                contributed: false,
            }));
        }
        Ok(records)
    }
}

/// Sprout and spell out a TEST derivation and compare it with the surface.
fn spell_derivation(
    derivation: Derivation,
    vocabulary: &VocabularyInventory,
    rules: &[SproutingRule],
    observation: &Observation,
    config: &LearnerConfig,
    chooser: &mut impl Chooser,
) -> Result<TestAttempt, LearnerError> {
    let (chain, rules_used) = sprout_nodes(
        &derivation.chain,
        rules,
        config.affix,
        chooser,
        config.no_sprout_weight,
    )?;
    let spell_out = insert_vi(&chain, vocabulary, chooser, config)?;
    let success = spell_out.complete && spell_out.pronunciation == observation.surface;
    tracing::debug!(
        chain = %chain,
        produced = %spell_out.pronunciation,
        success,
        "test derivation"
    );
    Ok(TestAttempt {
        numeration: derivation.numeration,
        spell_out,
        rules_used,
        success,
    })
}

/// Let nominalizer `chosen` absorb every other nominalizer that shares a
/// Root with it and has no conflicting value. The absorbed ones drop to
/// `floor`; ones already contained in `chosen` are left alone.
fn absorb_nominalizers(terminals: &mut TerminalInventory, chosen: usize, floor: f64) {
    let Some(target) = terminals.nominalizers.get(chosen).cloned() else {
        return;
    };
    let mut merged = target.clone();
    for (i, other) in terminals.nominalizers.iter_mut().enumerate() {
        if i == chosen
            || target.selectional.is_disjoint(&other.selectional)
            || conflicts(&target.values, &other.values)
        {
            continue;
        }
        if other.values.is_subset(&merged.values) && other.selectional.is_subset(&merged.selectional) {
            continue;
        }
        merged.values.extend(other.values.iter().cloned());
        merged.selectional.extend(other.selectional.iter().cloned());
        merged.weight = merged.weight.max(other.weight);
        other.weight = floor;
        tracing::debug!(absorbed = %other, into = %target, "nominalizers combined");
    }
    terminals.nominalizers[chosen] = merged;
}
