// Reading the learner's two inputs: the Root inventory and the observation
// stream.
//
// Observation lines are tab-separated:
//
//     la#KEY-e<TAB>+definite<TAB>+atomic,+minimal
//
// The first field is the surface form (`#` between words, `-` between
// morphs, uppercase tokens for Roots); each following field is one semantic
// slot, outermost first, as a comma-joined feature list. The Root inventory
// has one uppercase label per line. Blank lines are skipped in both.

use crate::error::InputError;
use crate::features::{FeatureSet, GENDER_DIMENSION, has_dimension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One training or held-out item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub surface: String,
    /// Semantic slots, outermost first.
    pub values: Vec<FeatureSet>,
    /// Root labels in surface order: the noun, then the adjective if any.
    pub roots: Vec<String>,
    /// 1-based source line, 0 when built in code.
    pub line: usize,
}

impl Observation {
    /// Build an observation from a surface form and its slots.
    pub fn new(surface: &str, values: Vec<FeatureSet>) -> Result<Self, InputError> {
        Self::with_line(0, surface.to_string(), values)
    }

    fn with_line(line: usize, surface: String, values: Vec<FeatureSet>) -> Result<Self, InputError> {
        if surface.is_empty() {
            return Err(InputError::EmptySurface { line });
        }
        let roots = find_roots(&surface);
        if roots.is_empty() || roots.len() > 2 {
            return Err(InputError::RootCount {
                line,
                count: roots.len(),
                surface,
            });
        }
        Ok(Observation {
            surface,
            values,
            roots,
            line,
        })
    }

    /// The noun Root.
    pub fn noun_root(&self) -> &str {
        &self.roots[0]
    }

    pub fn adjective_root(&self) -> Option<&str> {
        self.roots.get(1).map(String::as_str)
    }

    /// The first gender value (`+feminine`/`-feminine`) in any slot.
    pub fn gender(&self) -> Option<&str> {
        self.values
            .iter()
            .flatten()
            .find(|f| has_dimension(f, GENDER_DIMENSION))
            .map(String::as_str)
    }

    /// Number of `#` boundaries in the surface form.
    pub fn boundary_count(&self) -> usize {
        self.surface.matches('#').count()
    }

    /// Surface words, each split into morphs.
    pub fn words(&self) -> Vec<Vec<&str>> {
        self.surface
            .split('#')
            .map(|word| word.split('-').collect())
            .collect()
    }
}

/// Whether a token is a Root label: uppercase ASCII letters, digits after
/// the first letter, underscores.
pub fn is_root_label(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Root labels of a surface form, in order.
pub fn find_roots(surface: &str) -> Vec<String> {
    surface
        .split(['#', '-'])
        .filter(|token| is_root_label(token))
        .map(str::to_string)
        .collect()
}

/// Split an observation line into its surface form and semantic slots.
pub fn parse_input(line: &str) -> Result<(String, Vec<FeatureSet>), InputError> {
    parse_fields(1, line)
}

fn parse_fields(line_no: usize, line: &str) -> Result<(String, Vec<FeatureSet>), InputError> {
    let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
    let surface = fields.next().unwrap_or_default().trim().to_string();
    if surface.is_empty() {
        return Err(InputError::EmptySurface { line: line_no });
    }
    let mut slots = Vec::new();
    for (slot, field) in fields.enumerate() {
        let mut values = FeatureSet::new();
        for value in field.split(',') {
            let value = value.trim();
            if value.is_empty() {
                return Err(InputError::EmptyFeature {
                    line: line_no,
                    slot,
                });
            }
            values.insert(value.to_string());
        }
        slots.push(values);
    }
    Ok((surface, slots))
}

/// Parse a Root inventory: one uppercase label per line.
pub fn parse_roots(text: &str) -> Result<BTreeSet<String>, InputError> {
    let mut roots = BTreeSet::new();
    for (i, raw) in text.lines().enumerate() {
        let label = raw.trim();
        if label.is_empty() {
            continue;
        }
        if !is_root_label(label) {
            return Err(InputError::BadRootLabel {
                line: i + 1,
                label: label.to_string(),
            });
        }
        roots.insert(label.to_string());
    }
    Ok(roots)
}

/// Parse an observation file. When `known_roots` is given, every Root in
/// the surface forms must be listed in it.
pub fn parse_observations(
    text: &str,
    known_roots: Option<&BTreeSet<String>>,
) -> Result<Vec<Observation>, InputError> {
    let mut observations = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = i + 1;
        let (surface, values) = parse_fields(line, raw)?;
        let observation = Observation::with_line(line, surface, values)?;
        let unknown =
            known_roots.and_then(|known| observation.roots.iter().find(|r| !known.contains(*r)));
        if let Some(root) = unknown {
            return Err(InputError::UnknownRoot {
                line,
                root: root.clone(),
            });
        }
        observations.push(observation);
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::feature_set;

    #[test]
    fn test_parse_input() {
        assert_eq!(
            parse_input("la#KEY-e\t+definite\t+atomic,+minimal").unwrap(),
            (
                "la#KEY-e".to_string(),
                vec![
                    feature_set(["+definite"]),
                    feature_set(["+atomic", "+minimal"])
                ]
            )
        );
    }

    #[test]
    fn test_find_roots() {
        assert_eq!(find_roots("la#KEY-e"), vec!["KEY"]);
        assert_eq!(find_roots("le#KEY-i"), vec!["KEY"]);
        assert_eq!(find_roots("il#BOOK-o#BIG-e"), vec!["BOOK", "BIG"]);
        assert!(find_roots("la#casa").is_empty());
    }

    #[test]
    fn test_parse_input_rejects_empty_values() {
        assert_eq!(
            parse_input("la#KEY-e\t+definite,"),
            Err(InputError::EmptyFeature { line: 1, slot: 0 })
        );
        assert_eq!(
            parse_input("\t+definite"),
            Err(InputError::EmptySurface { line: 1 })
        );
    }

    #[test]
    fn test_observation_words_and_roots() {
        let obs = Observation::new("il#BOOK-o#BIG-e", vec![feature_set(["+definite"])]).unwrap();
        assert_eq!(obs.noun_root(), "BOOK");
        assert_eq!(obs.adjective_root(), Some("BIG"));
        assert_eq!(obs.boundary_count(), 2);
        assert_eq!(
            obs.words(),
            vec![vec!["il"], vec!["BOOK", "o"], vec!["BIG", "e"]]
        );
        assert!(matches!(
            Observation::new("la#casa", vec![]),
            Err(InputError::RootCount { count: 0, .. })
        ));
    }

    #[test]
    fn test_observation_gender() {
        let given = Observation::new(
            "la#KEY-e",
            vec![feature_set(["+definite"]), feature_set(["+atomic", "-feminine"])],
        )
        .unwrap();
        assert_eq!(given.gender(), Some("-feminine"));
        let bare = Observation::new("la#KEY-e", vec![feature_set(["+definite", "feminine"])]).unwrap();
        assert_eq!(bare.gender(), None);
    }

    #[test]
    fn test_parse_files() {
        let roots = parse_roots("KEY\n\nBOOK\nBIG\n").unwrap();
        assert_eq!(roots.len(), 3);
        assert!(matches!(
            parse_roots("KEY\nbook\n"),
            Err(InputError::BadRootLabel { line: 2, .. })
        ));

        let text = "la#KEY-e\t+definite\t+atomic,+minimal\n\nle#KEY-i\t+definite\t-atomic,-minimal\n";
        let observations = parse_observations(text, Some(&roots)).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].line, 3);

        assert_eq!(
            parse_observations("la#DOOR-a\t+definite\n", Some(&roots)),
            Err(InputError::UnknownRoot {
                line: 1,
                root: "DOOR".to_string()
            })
        );
    }
}
