// Tabular reports of a learner run.
//
// Everything here renders CSV as plain strings: one row per learned object
// for the inventories, one row per observation for the outcome log, and
// long-format weight traces (`observation,object,weight`) recorded after
// every observation for plotting convergence. Feature lists inside a field
// are joined with `;`; fields are quoted when they contain a comma, a quote
// or a newline.
//
// `write_reports` writes the whole set, plus `state.json`, into one
// directory. It is called at checkpoints and at the end of a run.

use crate::features::{FeatureSet, join};
use crate::learner::{LearnerState, ObservationOutcome, TrialRecord};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(fields: &[String]) -> String {
    let mut line = fields
        .iter()
        .map(|f| field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn values(set: &FeatureSet) -> String {
    join(set, ";")
}

fn labels(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}

/// `values,weight,<one 0/1 column per known Root>`
pub fn nominalizers_csv(state: &LearnerState) -> String {
    let mut header = vec!["values".to_string(), "weight".to_string()];
    header.extend(state.roots.iter().cloned());
    let mut out = row(&header);
    for n in &state.terminals.nominalizers {
        let mut fields = vec![values(&n.values), n.weight.to_string()];
        fields.extend(
            state
                .roots
                .iter()
                .map(|root| u8::from(n.selects(root)).to_string()),
        );
        out.push_str(&row(&fields));
    }
    out
}

pub fn vocabulary_items_csv(state: &LearnerState) -> String {
    let mut out = row(&[
        "diacritic".into(),
        "pronunciation".into(),
        "label".into(),
        "values".into(),
        "triggers".into(),
        "weight".into(),
    ]);
    for (_, item) in state.vocabulary.iter() {
        let triggers = item
            .triggers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";");
        out.push_str(&row(&[
            item.diacritic.clone(),
            item.pronunciation.clone(),
            item.label.clone(),
            values(&item.values),
            triggers,
            item.weight.to_string(),
        ]));
    }
    out
}

pub fn sprouting_rules_csv(state: &LearnerState) -> String {
    let mut out = row(&[
        "trigger_label".into(),
        "trigger_values".into(),
        "trigger_diacritic".into(),
        "keep_values".into(),
        "fused".into(),
        "weight".into(),
    ]);
    for rule in &state.sprouting_rules {
        out.push_str(&row(&[
            rule.trigger_label.clone(),
            values(&rule.trigger_values),
            rule.trigger_diacritic.clone(),
            values(&rule.keep_values),
            rule.fused.to_string(),
            rule.weight.to_string(),
        ]));
    }
    out
}

pub fn semantic_terminals_csv(state: &LearnerState) -> String {
    let mut out = row(&[
        "label".into(),
        "values".into(),
        "selectional".into(),
        "strength".into(),
        "weight".into(),
    ]);
    for t in &state.terminals.semantic_terminals {
        let strength = if t.selection_strength { "strong" } else { "weak" };
        out.push_str(&row(&[
            t.label.clone(),
            values(&t.values),
            labels(&t.selectional),
            strength.to_string(),
            t.weight.to_string(),
        ]));
    }
    out
}

pub fn observations_csv(outcomes: &[ObservationOutcome]) -> String {
    let mut out = row(&[
        "index".into(),
        "surface".into(),
        "produced".into(),
        "success".into(),
        "gender".into(),
    ]);
    for o in outcomes {
        out.push_str(&row(&[
            o.index.to_string(),
            o.surface.clone(),
            o.produced.clone(),
            o.success.to_string(),
            o.gender.clone().unwrap_or_default(),
        ]));
    }
    out
}

/// Held-out results: one row per item and trial.
pub fn test_results_csv(results: &[(String, Vec<TrialRecord>)]) -> String {
    let mut out = row(&[
        "item".into(),
        "trial".into(),
        "success".into(),
        "produced".into(),
        "diacritics".into(),
        "nominalizer_values".into(),
        "nominalizer_contributed".into(),
    ]);
    for (item, trials) in results {
        for (trial, record) in trials.iter().enumerate() {
            out.push_str(&row(&[
                item.clone(),
                (trial + 1).to_string(),
                record.success.to_string(),
                record.produced.clone(),
                record.diacritics.join(";"),
                values(&record.nominalizer_values),
                record.contributed.to_string(),
            ]));
        }
    }
    out
}

/// The object classes traced over a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceClass {
    Nominalizers,
    VocabularyItems,
    SproutingRules,
    SemanticTerminals,
}

impl TraceClass {
    pub const ALL: [TraceClass; 4] = [
        TraceClass::Nominalizers,
        TraceClass::VocabularyItems,
        TraceClass::SproutingRules,
        TraceClass::SemanticTerminals,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            TraceClass::Nominalizers => "trace_nominalizers.csv",
            TraceClass::VocabularyItems => "trace_vocabulary_items.csv",
            TraceClass::SproutingRules => "trace_sprouting_rules.csv",
            TraceClass::SemanticTerminals => "trace_semantic_terminals.csv",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct TracePoint {
    observation: usize,
    object: String,
    weight: f64,
}

/// Per-observation weights of every learned object.
#[derive(Clone, Debug, Default)]
pub struct WeightTrace {
    nominalizers: Vec<TracePoint>,
    vocabulary_items: Vec<TracePoint>,
    sprouting_rules: Vec<TracePoint>,
    semantic_terminals: Vec<TracePoint>,
}

impl WeightTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every weight in `state` as of `observation`.
    pub fn record(&mut self, observation: usize, state: &LearnerState) {
        let point = |object: String, weight: f64| TracePoint {
            observation,
            object,
            weight,
        };
        for (i, n) in state.terminals.nominalizers.iter().enumerate() {
            self.nominalizers
                .push(point(format!("n{i}[{}]", values(&n.values)), n.weight));
        }
        for (_, item) in state.vocabulary.iter() {
            self.vocabulary_items
                .push(point(item.diacritic.clone(), item.weight));
        }
        for (i, rule) in state.sprouting_rules.iter().enumerate() {
            self.sprouting_rules.push(point(
                format!("rule{i}:{}>{}", rule.trigger_diacritic, values(&rule.keep_values)),
                rule.weight,
            ));
        }
        for t in &state.terminals.semantic_terminals {
            let strength = if t.selection_strength { "strong" } else { "weak" };
            self.semantic_terminals
                .push(point(format!("{}[{}]/{strength}", t.label, values(&t.values)), t.weight));
        }
    }

    fn points(&self, class: TraceClass) -> &[TracePoint] {
        match class {
            TraceClass::Nominalizers => &self.nominalizers,
            TraceClass::VocabularyItems => &self.vocabulary_items,
            TraceClass::SproutingRules => &self.sprouting_rules,
            TraceClass::SemanticTerminals => &self.semantic_terminals,
        }
    }

    pub fn to_csv(&self, class: TraceClass) -> String {
        let mut out = String::from("observation,object,weight\n");
        for p in self.points(class) {
            let _ = writeln!(out, "{},{},{}", p.observation, field(&p.object), p.weight);
        }
        out
    }
}

/// Write every report and `state.json` into `dir`, creating it if needed.
pub fn write_reports(
    dir: &Path,
    state: &LearnerState,
    outcomes: &[ObservationOutcome],
    trace: &WeightTrace,
    test_results: Option<&[(String, Vec<TrialRecord>)]>,
) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("nominalizers.csv"), nominalizers_csv(state))?;
    fs::write(dir.join("vocabulary_items.csv"), vocabulary_items_csv(state))?;
    fs::write(dir.join("sprouting_rules.csv"), sprouting_rules_csv(state))?;
    fs::write(dir.join("semantic_terminals.csv"), semantic_terminals_csv(state))?;
    fs::write(dir.join("observations.csv"), observations_csv(outcomes))?;
    for class in TraceClass::ALL {
        fs::write(dir.join(class.file_name()), trace.to_csv(class))?;
    }
    if let Some(results) = test_results {
        fs::write(dir.join("test_results.csv"), test_results_csv(results))?;
    }
    let json = state.to_json().map_err(io::Error::other)?;
    fs::write(dir.join("state.json"), json)?;
    tracing::info!(dir = %dir.display(), "reports written");
    Ok(())
}
