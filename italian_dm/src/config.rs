// Data-driven learner configuration.
//
// Every tunable constant of the learning loop lives in `LearnerConfig`,
// loaded from JSON. The learner never uses magic numbers: bonus formulas,
// reward and penalty sizes, the weight floor and the retry cap all come from
// here, so tuning runs need no recompilation. Missing fields fall back to
// `Default`, so a config file only has to name what it changes.
//
// Defaults: initial weight 1.0, reward and failure penalty 0.5 (one failure
// costs half a fresh object's weight), retry penalty 0.1, already-selects
// bonus 0.5, no redo bonus.
//
// See also: `learner.rs` which owns the config as part of `Learner`,
// `numeration.rs` (selection bonuses, retry cap), `spellout.rs` (specificity
// and diacritic bonuses), `sprouting.rs` (no-sprout weight).

use crate::error::LearnerError;
use crate::features::GENDER_DIMENSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the word functional exponents attach to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affix {
    #[default]
    Suffixing,
    Prefixing,
}

impl FromStr for Affix {
    type Err = LearnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "suffixing" => Ok(Affix::Suffixing),
            "prefixing" => Ok(Affix::Prefixing),
            other => Err(LearnerError::Config(format!("unknown affix direction `{other}`"))),
        }
    }
}

impl fmt::Display for Affix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affix::Suffixing => write!(f, "suffixing"),
            Affix::Prefixing => write!(f, "prefixing"),
        }
    }
}

/// Where grammatical gender comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnerVariant {
    /// Gender (if any) arrives in the input's feature bundles; noun classes
    /// are coined as nominalizer hypotheses.
    #[default]
    Semantic,
    /// Gender is uninterpretable: the learner guesses it per Root, trying
    /// `+` before `-`, and memoizes the winning guess.
    Syntactic,
}

impl FromStr for LearnerVariant {
    type Err = LearnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "semantic" => Ok(LearnerVariant::Semantic),
            "syntactic" => Ok(LearnerVariant::Syntactic),
            other => Err(LearnerError::Config(format!("unknown learner variant `{other}`"))),
        }
    }
}

/// All learner constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Weight of every newly created nominalizer, semantic terminal and VI.
    pub initial_weight: f64,
    /// Added to every object used in a successful TEST.
    pub success_reward: f64,
    /// Subtracted from the VIs and sprouting rules used in a failed TEST.
    pub failure_penalty: f64,
    /// Subtracted from semantic terminals whose numeration produced the
    /// wrong number of words.
    pub retry_penalty: f64,
    /// Decremented weights never drop below this.
    pub weight_floor: f64,
    /// Nominalizer bonus for already selecting the Root, multiplied by
    /// `max(1, |values|)`.
    pub already_selects_bonus: f64,
    /// Spell-out bonus per feature value a VI matches.
    pub specificity_bonus: f64,
    /// Extra spell-out weight of a VI pinned by an earlier trigger.
    pub diacritic_bonus: f64,
    /// Bump applied when `create_vi` finds an existing item.
    pub redo_bonus: f64,
    /// Weight of coining a fresh noun class while no nominalizer selects
    /// the Root (semantic variant only).
    pub new_nominalizer_weight: f64,
    /// Weight of a newly proposed sprouting rule.
    pub rule_initial_weight: f64,
    /// Weight of the "do not sprout" alternative.
    pub no_sprout_weight: f64,
    /// Fixed weight of the adjectivalizer singleton.
    pub adjectivalizer_weight: f64,
    /// Cap on the generate-and-test derivation loop.
    pub max_derivation_attempts: usize,
    pub affix: Affix,
    pub variant: LearnerVariant,
    pub seed: u64,
    /// Stochastic re-derivations per held-out item.
    pub test_trials: usize,
    /// Write reports every N observations; 0 writes only at the end.
    pub checkpoint_interval: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            initial_weight: 1.0,
            success_reward: 0.5,
            failure_penalty: 0.5,
            retry_penalty: 0.1,
            weight_floor: 0.01,
            already_selects_bonus: 0.5,
            specificity_bonus: 0.1,
            diacritic_bonus: 1.0,
            redo_bonus: 0.0,
            new_nominalizer_weight: 1.0,
            rule_initial_weight: 1.0,
            no_sprout_weight: 1.0,
            adjectivalizer_weight: 999.0,
            max_derivation_attempts: 1000,
            affix: Affix::Suffixing,
            variant: LearnerVariant::Semantic,
            seed: 0,
            test_trials: 10,
            checkpoint_interval: 0,
        }
    }
}

impl LearnerConfig {
    /// Parse a config from JSON. Absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the learning loop cannot run with.
    pub fn validate(&self) -> Result<(), LearnerError> {
        let weights = [
            ("initial_weight", self.initial_weight),
            ("success_reward", self.success_reward),
            ("failure_penalty", self.failure_penalty),
            ("retry_penalty", self.retry_penalty),
            ("already_selects_bonus", self.already_selects_bonus),
            ("specificity_bonus", self.specificity_bonus),
            ("diacritic_bonus", self.diacritic_bonus),
            ("redo_bonus", self.redo_bonus),
            ("new_nominalizer_weight", self.new_nominalizer_weight),
            ("rule_initial_weight", self.rule_initial_weight),
            ("no_sprout_weight", self.no_sprout_weight),
            ("adjectivalizer_weight", self.adjectivalizer_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(LearnerError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(self.weight_floor.is_finite() && self.weight_floor > 0.0) {
            return Err(LearnerError::Config(format!(
                "weight_floor must be positive, got {}",
                self.weight_floor
            )));
        }
        if self.initial_weight <= 0.0 {
            return Err(LearnerError::Config(
                "initial_weight must be positive".to_string(),
            ));
        }
        if self.max_derivation_attempts == 0 {
            return Err(LearnerError::Config(
                "max_derivation_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `+feminine`, the first guess of the syntactic variant.
    pub fn positive_gender(&self) -> String {
        format!("+{GENDER_DIMENSION}")
    }

    /// `-feminine`, the fallback guess of the syntactic variant.
    pub fn negative_gender(&self) -> String {
        format!("-{GENDER_DIMENSION}")
    }

    /// Clamp a decremented weight to the floor.
    pub fn floored(&self, weight: f64) -> f64 {
        weight.max(self.weight_floor)
    }
}
