// Throughput of the PROCESS/TEST/REINFORCE loop over the bundled corpus.
//
// Run with `cargo bench -p italian_dm`. Each iteration starts from a fresh
// learner with a fixed seed, so every sample does the same work.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use italian_dm::{Learner, LearnerConfig, LearnerVariant, parse_observations, parse_roots};

fn run_corpus(variant: LearnerVariant, epochs: usize) -> usize {
    let roots = parse_roots(italian_dm::sample_roots()).expect("bundled roots parse");
    let corpus =
        parse_observations(italian_dm::sample_corpus(), Some(&roots)).expect("bundled corpus parses");
    let config = LearnerConfig {
        seed: 1,
        variant,
        ..LearnerConfig::default()
    };
    let mut learner = Learner::new(config, roots).expect("default config is valid");
    let mut successes = 0;
    for _ in 0..epochs {
        for observation in &corpus {
            if let Ok(outcome) = learner.observe(observation) {
                successes += usize::from(outcome.success);
            }
        }
    }
    successes
}

fn bench_learning_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("learning_loop");
    group.sample_size(20);
    group.bench_function("semantic_5_epochs", |b| {
        b.iter(|| run_corpus(black_box(LearnerVariant::Semantic), 5))
    });
    group.bench_function("syntactic_5_epochs", |b| {
        b.iter(|| run_corpus(black_box(LearnerVariant::Syntactic), 5))
    });
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let roots = parse_roots(italian_dm::sample_roots()).expect("bundled roots parse");
    let corpus =
        parse_observations(italian_dm::sample_corpus(), Some(&roots)).expect("bundled corpus parses");
    let config = LearnerConfig {
        seed: 1,
        ..LearnerConfig::default()
    };
    let mut learner = Learner::new(config, roots).expect("default config is valid");
    for _ in 0..5 {
        for observation in &corpus {
            let _ = learner.observe(observation);
        }
    }
    c.bench_function("evaluate_corpus_10_trials", |b| {
        b.iter(|| {
            for observation in &corpus {
                let _ = black_box(learner.evaluate(observation, 10));
            }
        })
    });
}

criterion_group!(benches, bench_learning_loop, bench_evaluate);
criterion_main!(benches);
