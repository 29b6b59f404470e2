// End-to-end learning runs over small corpora.
//
// These drive the public API the way the `learn` binary does: parse a Root
// inventory and a corpus, feed every observation to a seeded `Learner` for a
// few epochs, then inspect the learned state and held-out evaluation. The
// learner is stochastic, so assertions are about structure and determinism
// rather than exact weights.

use italian_dm::report::{WeightTrace, write_reports};
use italian_dm::{
    InputError, Learner, LearnerConfig, LearnerError, LearnerVariant, Observation,
    ObservationOutcome, parse_observations, parse_roots,
};
use std::collections::BTreeSet;

const KEY_CORPUS: &str = "\
la#KEY-e\t+definite\t+atomic,+minimal
le#KEY-i\t+definite\t-atomic,-minimal

la#KEY-e\t+definite\t+atomic,+minimal
";

fn sample() -> (BTreeSet<String>, Vec<Observation>) {
    let roots = parse_roots(italian_dm::sample_roots()).unwrap();
    let corpus = parse_observations(italian_dm::sample_corpus(), Some(&roots)).unwrap();
    (roots, corpus)
}

/// Feed `corpus` to `learner` `epochs` times, skipping ungenerateable items.
fn train(
    learner: &mut Learner,
    corpus: &[Observation],
    epochs: usize,
) -> Vec<ObservationOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..epochs {
        for observation in corpus {
            match learner.observe(observation) {
                Ok(outcome) => outcomes.push(outcome),
                Err(LearnerError::Ungenerateable { .. }) => {}
                Err(e) => panic!("unexpected learner error: {e}"),
            }
        }
    }
    outcomes
}

fn config(seed: u64) -> LearnerConfig {
    LearnerConfig {
        seed,
        ..LearnerConfig::default()
    }
}

#[test]
fn test_bundled_data_parses() {
    let (roots, corpus) = sample();
    assert_eq!(roots.len(), 5);
    assert_eq!(corpus.len(), 12);
    assert_eq!(corpus[0].surface, "la#KEY-e");
    assert_eq!(corpus[0].line, 1);
    assert!(corpus.iter().all(|o| roots.contains(o.noun_root())));
    assert_eq!(corpus[6].adjective_root(), Some("BIG"));
}

#[test]
fn test_blank_lines_are_skipped_and_lines_kept() {
    let roots = parse_roots("KEY\n").unwrap();
    let corpus = parse_observations(KEY_CORPUS, Some(&roots)).unwrap();
    assert_eq!(corpus.len(), 3);
    assert_eq!(corpus[2].line, 4);
}

#[test]
fn test_single_root_corpus_learns_a_noun_class() {
    let roots = parse_roots("KEY\n").unwrap();
    let corpus = parse_observations(KEY_CORPUS, Some(&roots)).unwrap();
    let mut learner = Learner::new(config(7), roots).unwrap();
    let outcomes = train(&mut learner, &corpus, 50);

    let state = learner.state();
    assert_eq!(state.observations_seen, 150);
    assert!(!state.vocabulary.is_empty());
    assert!(outcomes.iter().any(|o| o.success));
    assert!(
        state
            .terminals
            .nominalizers
            .iter()
            .any(|n| n.selects("KEY"))
    );
    for outcome in outcomes.iter().filter(|o| o.success) {
        assert_eq!(outcome.produced, outcome.surface);
    }
    for item in state.vocabulary.items() {
        assert!(item.weight >= learner.config().weight_floor);
    }

    // The learned grammar reproduces the corpus more often than not.
    let trials = 100;
    let mut successes = 0;
    for observation in &corpus {
        let records = learner.evaluate(observation, trials).unwrap();
        for record in records.iter().filter(|r| r.success) {
            assert_eq!(record.produced, observation.surface);
            successes += 1;
        }
    }
    let rate = successes as f64 / (trials * corpus.len()) as f64;
    assert!(rate >= 0.5, "success rate {rate}");
}

#[test]
fn test_same_seed_same_grammar() {
    let (roots, corpus) = sample();
    let mut first = Learner::new(config(42), roots.clone()).unwrap();
    let mut second = Learner::new(config(42), roots).unwrap();
    let a = train(&mut first, &corpus, 3);
    let b = train(&mut second, &corpus, 3);
    assert_eq!(a, b);
    assert_eq!(
        first.state().to_json().unwrap(),
        second.state().to_json().unwrap()
    );
}

#[test]
fn test_syntactic_variant_guesses_gender_per_root() {
    let (roots, corpus) = sample();
    let config = LearnerConfig {
        variant: LearnerVariant::Syntactic,
        seed: 3,
        ..LearnerConfig::default()
    };
    let mut learner = Learner::new(config, roots).unwrap();
    let outcomes = train(&mut learner, &corpus, 4);

    let state = learner.state();
    // Syntactic runs start with one nominalizer per gender value.
    assert!(state.terminals.nominalizers.len() >= 2);
    for outcome in &outcomes {
        let gender = outcome.gender.as_deref().unwrap();
        assert!(gender == "+feminine" || gender == "-feminine");
    }
    for (root, gender) in &state.gender_memo {
        assert!(state.roots.contains(root));
        assert!(gender == "+feminine" || gender == "-feminine");
    }
}

#[test]
fn test_unknown_root_leaves_state_untouched() {
    let (roots, _) = sample();
    let mut learner = Learner::new(config(1), roots).unwrap();
    let stranger = Observation::new("la#DOOR-a", vec![]).unwrap();
    let before = learner.state().to_json().unwrap();
    let err = learner.observe(&stranger).unwrap_err();
    assert!(matches!(
        err,
        LearnerError::Input(InputError::UnknownRoot { .. })
    ));
    assert_eq!(learner.state().to_json().unwrap(), before);
}

#[test]
fn test_held_out_evaluation_is_read_only() {
    let (roots, corpus) = sample();
    let mut learner = Learner::new(config(11), roots).unwrap();
    train(&mut learner, &corpus, 3);

    let before = learner.state().to_json().unwrap();
    for observation in &corpus {
        let records = learner.evaluate(observation, 4).unwrap();
        assert_eq!(records.len(), 4);
        for record in records.iter().filter(|r| r.success) {
            assert_eq!(record.produced, observation.surface);
        }
        for record in records.iter().filter(|r| r.contributed) {
            assert!(record.success);
        }
    }
    assert_eq!(learner.state().to_json().unwrap(), before);
}

#[test]
fn test_reports_and_state_snapshot_are_written() {
    let (roots, corpus) = sample();
    let mut learner = Learner::new(config(5), roots).unwrap();
    let mut trace = WeightTrace::new();
    let mut outcomes = Vec::new();
    for observation in &corpus {
        if let Ok(outcome) = learner.observe(observation) {
            outcomes.push(outcome);
        }
        trace.record(learner.state().observations_seen, learner.state());
    }

    let dir = std::env::temp_dir().join(format!("italian_dm_reports_{}", std::process::id()));
    write_reports(&dir, learner.state(), &outcomes, &trace, None).unwrap();
    for name in [
        "nominalizers.csv",
        "vocabulary_items.csv",
        "sprouting_rules.csv",
        "semantic_terminals.csv",
        "observations.csv",
        "trace_nominalizers.csv",
        "trace_vocabulary_items.csv",
        "trace_sprouting_rules.csv",
        "trace_semantic_terminals.csv",
        "state.json",
    ] {
        assert!(dir.join(name).is_file(), "missing {name}");
    }
    assert!(!dir.join("test_results.csv").exists());

    let observations = std::fs::read_to_string(dir.join("observations.csv")).unwrap();
    assert_eq!(observations.lines().count(), outcomes.len() + 1);
    let json = std::fs::read_to_string(dir.join("state.json")).unwrap();
    let restored = italian_dm::LearnerState::from_json(&json).unwrap();
    assert_eq!(restored.observations_seen, 12);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_resumed_state_keeps_learning() {
    let (roots, corpus) = sample();
    let mut learner = Learner::new(config(9), roots).unwrap();
    train(&mut learner, &corpus, 1);
    let json = learner.state().to_json().unwrap();

    let state = italian_dm::LearnerState::from_json(&json).unwrap();
    let rng = italian_dm_prng::LearnerRng::new(9);
    let mut resumed = Learner::from_state(config(9), state, rng).unwrap();
    train(&mut resumed, &corpus, 1);
    assert_eq!(resumed.state().observations_seen, 24);
    assert!(resumed.state().vocabulary.len() >= learner.state().vocabulary.len());
}
