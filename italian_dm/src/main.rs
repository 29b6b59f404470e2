// CLI entry point for the learner.
//
// Trains a `Learner` on an observation file, evaluates it on held-out items
// and writes CSV reports plus a `state.json` snapshot. See `learner.rs` for
// the learning loop and `report.rs` for the report formats.
//
// Usage:
//   learn --roots <FILE> --input <FILE> [OPTIONS]
//     --test <FILE>         Held-out items (default: the training set)
//     --output <DIR>        Report directory (default: output)
//     --config <FILE>       LearnerConfig JSON (default: built-in defaults)
//     --seed <N>            PRNG seed (overrides the config)
//     --variant <V>         semantic | syntactic
//     --affix <A>           suffixing | prefixing
//     --epochs <N>          Passes over the training set (default: 1)
//     --trials <N>          Re-derivations per held-out item
//     --verbose             Debug-level logging

use std::path::{Path, PathBuf};

use italian_dm::report::{WeightTrace, write_reports};
use italian_dm::{Learner, LearnerConfig, LearnerError, parse_observations, parse_roots};
use tracing::Level;

struct Args {
    roots: PathBuf,
    input: PathBuf,
    test: Option<PathBuf>,
    output: PathBuf,
    config: Option<PathBuf>,
    seed: Option<u64>,
    variant: Option<String>,
    affix: Option<String>,
    epochs: usize,
    trials: Option<usize>,
    verbose: bool,
}

fn main() {
    let args = parse_args();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(&args) {
        eprintln!("learn: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), LearnerError> {
    let config = load_config(args)?;
    let roots = parse_roots(&std::fs::read_to_string(&args.roots)?)?;
    let training = parse_observations(&std::fs::read_to_string(&args.input)?, Some(&roots))?;
    let held_out = match &args.test {
        Some(path) => parse_observations(&std::fs::read_to_string(path)?, Some(&roots))?,
        None => training.clone(),
    };
    let trials = args.trials.unwrap_or(config.test_trials);
    let checkpoint_interval = config.checkpoint_interval;

    tracing::info!(
        roots = roots.len(),
        observations = training.len(),
        epochs = args.epochs,
        variant = ?config.variant,
        seed = config.seed,
        "starting run"
    );

    let mut learner = Learner::new(config, roots)?;
    let mut outcomes = Vec::new();
    let mut trace = WeightTrace::new();

    for epoch in 1..=args.epochs {
        let mut successes = 0;
        for observation in &training {
            match learner.observe(observation) {
                Ok(outcome) => {
                    successes += usize::from(outcome.success);
                    outcomes.push(outcome);
                }
                Err(LearnerError::Ungenerateable { surface, attempts }) => {
                    tracing::warn!(surface = %surface, attempts, "skipping ungenerateable observation");
                }
                Err(e) => return Err(e),
            }
            let seen = learner.state().observations_seen;
            trace.record(seen, learner.state());
            if checkpoint_interval > 0 && seen % checkpoint_interval == 0 {
                let dir = args.output.join(format!("checkpoint_{seen}"));
                write_reports(&dir, learner.state(), &outcomes, &trace, None)?;
            }
        }
        tracing::info!(epoch, successes, total = training.len(), "epoch finished");
    }

    let mut results = Vec::with_capacity(held_out.len());
    let mut passed = 0;
    let mut total = 0;
    for observation in &held_out {
        let records = learner.evaluate(observation, trials)?;
        passed += records.iter().filter(|r| r.success).count();
        total += records.len();
        results.push((observation.surface.clone(), records));
    }
    tracing::info!(passed, total, "held-out evaluation");

    write_reports(
        &args.output,
        learner.state(),
        &outcomes,
        &trace,
        Some(results.as_slice()),
    )?;
    Ok(())
}

fn load_config(args: &Args) -> Result<LearnerConfig, LearnerError> {
    let mut config = match &args.config {
        Some(path) => LearnerConfig::from_json(&read(path)?)?,
        None => LearnerConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(variant) = &args.variant {
        config.variant = variant.parse()?;
    }
    if let Some(affix) = &args.affix {
        config.affix = affix.parse()?;
    }
    config.validate()?;
    Ok(config)
}

fn read(path: &Path) -> Result<String, LearnerError> {
    Ok(std::fs::read_to_string(path)?)
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut roots = None;
    let mut input = None;
    let mut parsed = Args {
        roots: PathBuf::new(),
        input: PathBuf::new(),
        test: None,
        output: PathBuf::from("output"),
        config: None,
        seed: None,
        variant: None,
        affix: None,
        epochs: 1,
        trials: None,
        verbose: false,
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--roots" => {
                i += 1;
                roots = Some(path_arg(&args, i, "--roots"));
            }
            "--input" => {
                i += 1;
                input = Some(path_arg(&args, i, "--input"));
            }
            "--test" => {
                i += 1;
                parsed.test = Some(path_arg(&args, i, "--test"));
            }
            "--output" => {
                i += 1;
                parsed.output = path_arg(&args, i, "--output");
            }
            "--config" => {
                i += 1;
                parsed.config = Some(path_arg(&args, i, "--config"));
            }
            "--seed" => {
                i += 1;
                parsed.seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a valid number");
                    std::process::exit(1);
                }));
            }
            "--variant" => {
                i += 1;
                parsed.variant = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--variant requires semantic or syntactic");
                    std::process::exit(1);
                }));
            }
            "--affix" => {
                i += 1;
                parsed.affix = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--affix requires suffixing or prefixing");
                    std::process::exit(1);
                }));
            }
            "--epochs" => {
                i += 1;
                parsed.epochs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--epochs requires a valid number");
                    std::process::exit(1);
                });
            }
            "--trials" => {
                i += 1;
                parsed.trials = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--trials requires a valid number");
                    std::process::exit(1);
                }));
            }
            "--verbose" | "-v" => parsed.verbose = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    match (roots, input) {
        (Some(roots), Some(input)) => {
            parsed.roots = roots;
            parsed.input = input;
            parsed
        }
        _ => {
            eprintln!("--roots and --input are required");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn path_arg(args: &[String], i: usize, flag: &str) -> PathBuf {
    args.get(i).map(PathBuf::from).unwrap_or_else(|| {
        eprintln!("{flag} requires a path");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: learn --roots <FILE> --input <FILE> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --roots <FILE>      Root inventory, one uppercase label per line");
    println!("  --input <FILE>      Training observations (tab-separated)");
    println!("  --test <FILE>       Held-out items (default: the training set)");
    println!("  --output <DIR>      Report directory (default: output)");
    println!("  --config <FILE>     LearnerConfig JSON");
    println!("  --seed <N>          PRNG seed");
    println!("  --variant <V>       semantic | syntactic");
    println!("  --affix <A>         suffixing | prefixing");
    println!("  --epochs <N>        Passes over the training set (default: 1)");
    println!("  --trials <N>        Re-derivations per held-out item");
    println!("  --verbose, -v       Debug-level logging");
    println!("  --help, -h          Show this help");
}
