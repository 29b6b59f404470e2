// Feature values and the small algebra the learner needs over them.
//
// A feature is a plain string such as `+definite`, `-minimal` or `class_3`.
// Features starting with `+` or `-` are *polar*; the rest of the string is
// the feature's *dimension*. Non-polar features (coined noun-class ids,
// pinned exponents) have no dimension of their own beyond the string itself.
//
// Feature sets are `BTreeSet<String>` throughout the crate so that iteration,
// equality and serialization are deterministic.

use std::collections::BTreeSet;

/// The grammatical-gender dimension. Strong selection never percolates it,
/// and the syntactic learner variant guesses it per Root.
pub const GENDER_DIMENSION: &str = "feminine";

/// A single feature value, e.g. `+atomic`.
pub type Feature = String;

/// An ordered set of feature values.
pub type FeatureSet = BTreeSet<Feature>;

/// Build a `FeatureSet` from string slices.
pub fn feature_set<I, S>(values: I) -> FeatureSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// `Some('+')`/`Some('-')` for polar features, `None` otherwise.
pub fn polarity(feature: &str) -> Option<char> {
    match feature.chars().next() {
        Some(c @ ('+' | '-')) if feature.len() > 1 => Some(c),
        _ => None,
    }
}

pub fn is_polar(feature: &str) -> bool {
    polarity(feature).is_some()
}

/// The feature with its polarity sign stripped (`+feminine` → `feminine`).
pub fn dimension(feature: &str) -> &str {
    if is_polar(feature) { &feature[1..] } else { feature }
}

/// True when the feature belongs to the given dimension, whatever its sign.
pub fn has_dimension(feature: &str, dim: &str) -> bool {
    is_polar(feature) && dimension(feature) == dim
}

/// Two sets conflict when some dimension appears with opposite polarity.
pub fn conflicts(a: &FeatureSet, b: &FeatureSet) -> bool {
    a.iter().filter(|f| is_polar(f)).any(|f| {
        let flipped = match polarity(f) {
            Some('+') => format!("-{}", dimension(f)),
            _ => format!("+{}", dimension(f)),
        };
        b.contains(&flipped)
    })
}

/// Label shared by every head spelling out the same dimensions.
///
/// `{+atomic, +minimal}` and `{-atomic, -minimal}` both map to
/// `atomic_minimal`, so number heads select and are selected uniformly.
pub fn dimension_label(values: &FeatureSet) -> String {
    let dims: BTreeSet<&str> = values.iter().map(|f| dimension(f)).collect();
    dims.into_iter().collect::<Vec<_>>().join("_")
}

/// Render a set for logs and reports, joined with `sep`.
pub fn join(values: &FeatureSet, sep: &str) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(sep)
}
