// Terminal chains and the merge operation that builds them.
//
// A `TerminalChain` is a linearized fragment of a derivation: an ordered
// sequence of terminals separated by `#` (word boundary) and `-` (morpheme
// boundary), plus the label, selectional set and selection strength of its
// head and the feature values accumulated so far.
//
// `merge(selector, complement, affix)` is the only way chains are built. It
// takes both inputs by reference and works on clones, so the caller's
// terminals and chains are never touched; whatever the merge teaches the
// selector (a newly selected Root) lives only in the returned chain.
//
// Merge has three branches:
//
//   1. Strong selection (affixation). The selector attaches to the
//      complement's head word with `-`: after it when suffixing (before the
//      first `#` if the complement already spans several words), in front of
//      it when prefixing. Polar values of the complement, minus gender,
//      percolate into the selector's head terminal.
//   2. Weak selection. `selector # complement`; the selector's head terminal
//      takes every value of the complement.
//   3. Failed selection (the complement's label is not selectable). Also
//      `selector # complement`, but values flow the other way: the
//      selector's values are written into the complement chain and into the
//      complement's head terminal, and the result keeps only the selector's
//      values. This is how a separate adjective word picks up the agreement
//      features of the noun phrase it attaches to.
//
// See also: `numeration.rs` which decides merge order, `spellout.rs` and
// `sprouting.rs` which walk the finished `linear` sequence.

use crate::config::Affix;
use crate::error::StructuralError;
use crate::features::{FeatureSet, GENDER_DIMENSION, has_dimension, is_polar};
use crate::terminal::Terminal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One position of a linearized chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LinearItem {
    Leaf(Terminal),
    /// `#`
    WordBoundary,
    /// `-`
    MorphemeBoundary,
    /// `+`: a sprouted Agr glued to its host with no audible break.
    FusionBoundary,
}

impl LinearItem {
    pub fn leaf(&self) -> Option<&Terminal> {
        match self {
            LinearItem::Leaf(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_boundary(&self) -> bool {
        !matches!(self, LinearItem::Leaf(_))
    }

    /// `-` or `+`: a boundary inside a word.
    pub fn is_morpheme_join(&self) -> bool {
        matches!(self, LinearItem::MorphemeBoundary | LinearItem::FusionBoundary)
    }
}

impl fmt::Display for LinearItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearItem::Leaf(t) => write!(f, "{t}"),
            LinearItem::WordBoundary => write!(f, "#"),
            LinearItem::MorphemeBoundary => write!(f, "-"),
            LinearItem::FusionBoundary => write!(f, "+"),
        }
    }
}

/// A composed, linearized derivation fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerminalChain {
    /// Label of the head; equals the selector's label after every merge.
    pub label: String,
    pub values: FeatureSet,
    pub selectional: BTreeSet<String>,
    pub selection_strength: bool,
    pub linear: Vec<LinearItem>,
    /// Index into `linear` of the head terminal.
    pub head: usize,
}

impl TerminalChain {
    /// A one-terminal chain. A Root's linearization is just itself.
    pub fn from_terminal(terminal: Terminal) -> Self {
        TerminalChain {
            label: terminal.label.clone(),
            values: terminal.values.clone(),
            selectional: terminal.selectional.clone(),
            selection_strength: terminal.selection_strength,
            linear: vec![LinearItem::Leaf(terminal)],
            head: 0,
        }
    }

    /// Number of `#` boundaries.
    pub fn boundary_count(&self) -> usize {
        self.linear
            .iter()
            .filter(|item| matches!(item, LinearItem::WordBoundary))
            .count()
    }

    /// The linear sequence cut at every `#`.
    pub fn word_slices(&self) -> Vec<&[LinearItem]> {
        self.linear
            .split(|item| matches!(item, LinearItem::WordBoundary))
            .collect()
    }

    /// All terminals in linear order.
    pub fn leaves(&self) -> impl Iterator<Item = &Terminal> {
        self.linear.iter().filter_map(LinearItem::leaf)
    }

    pub fn head_terminal(&self) -> Option<&Terminal> {
        self.linear.get(self.head).and_then(LinearItem::leaf)
    }

    fn head_terminal_mut(&mut self) -> Option<&mut Terminal> {
        match self.linear.get_mut(self.head) {
            Some(LinearItem::Leaf(t)) => Some(t),
            _ => None,
        }
    }

    /// Record that the head selects `label`, in the chain and on the head leaf.
    fn add_selection(&mut self, label: &str) {
        self.selectional.insert(label.to_string());
        if let Some(head) = self.head_terminal_mut() {
            head.selectional.insert(label.to_string());
        }
    }

    fn extend_head_values<'a>(&mut self, values: impl IntoIterator<Item = &'a String>) {
        if let Some(head) = self.head_terminal_mut() {
            head.values.extend(values.into_iter().cloned());
        }
    }

    /// Check the boundary and Root-count invariants.
    pub fn validate(&self) -> Result<(), StructuralError> {
        validate_linear(&self.linear)
    }
}

impl fmt::Display for TerminalChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.linear {
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Check a linear sequence: non-empty, no `#` at either edge, no two
/// boundaries in a row, every `-` or `+` followed by a terminal, at most one
/// Root per word.
pub fn validate_linear(linear: &[LinearItem]) -> Result<(), StructuralError> {
    let (Some(first), Some(last)) = (linear.first(), linear.last()) else {
        return Err(StructuralError::EmptyLinear);
    };
    if matches!(first, LinearItem::WordBoundary) || matches!(last, LinearItem::WordBoundary) {
        return Err(StructuralError::EdgeBoundary);
    }
    for (i, pair) in linear.windows(2).enumerate() {
        match pair {
            [join, next] if join.is_morpheme_join() && next.is_boundary() => {
                return Err(StructuralError::DanglingBoundary(i));
            }
            [a, b] if a.is_boundary() && b.is_boundary() => {
                return Err(StructuralError::AdjacentBoundaries(i));
            }
            _ => {}
        }
    }
    if last.is_morpheme_join() {
        return Err(StructuralError::DanglingBoundary(linear.len() - 1));
    }
    if first.is_morpheme_join() {
        return Err(StructuralError::DanglingBoundary(0));
    }
    for (word, slice) in linear
        .split(|item| matches!(item, LinearItem::WordBoundary))
        .enumerate()
    {
        let count = slice
            .iter()
            .filter_map(LinearItem::leaf)
            .filter(|t| t.is_root())
            .count();
        if count > 1 {
            return Err(StructuralError::MultipleRoots { word, count });
        }
    }
    Ok(())
}

/// Either side of a merge.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Terminal(Terminal),
    Chain(TerminalChain),
}

impl Node {
    pub fn label(&self) -> &str {
        match self {
            Node::Terminal(t) => &t.label,
            Node::Chain(c) => &c.label,
        }
    }

    pub fn values(&self) -> &FeatureSet {
        match self {
            Node::Terminal(t) => &t.values,
            Node::Chain(c) => &c.values,
        }
    }

    fn to_chain(&self) -> TerminalChain {
        match self {
            Node::Terminal(t) => TerminalChain::from_terminal(t.clone()),
            Node::Chain(c) => c.clone(),
        }
    }

    fn root_label(&self) -> Option<&str> {
        match self {
            Node::Terminal(t) if t.is_root() => Some(&t.label),
            _ => None,
        }
    }
}

impl From<Terminal> for Node {
    fn from(t: Terminal) -> Self {
        Node::Terminal(t)
    }
}

impl From<TerminalChain> for Node {
    fn from(c: TerminalChain) -> Self {
        Node::Chain(c)
    }
}

/// Merge `selector` with `complement` into a new chain.
///
/// Neither input is modified. The result is validated before it is
/// returned; a violation means the inputs were already malformed.
pub fn merge(
    selector: &Node,
    complement: &Node,
    affix: Affix,
) -> Result<TerminalChain, StructuralError> {
    let mut sel = selector.to_chain();
    let mut comp = complement.to_chain();

    if let Some(root) = complement.root_label() {
        sel.add_selection(root);
    }

    let merged = if sel.selectional.contains(&comp.label) {
        let values: FeatureSet = sel.values.union(&comp.values).cloned().collect();
        if sel.selection_strength {
            let percolated: Vec<&String> = comp
                .values
                .iter()
                .filter(|f| is_polar(f) && !has_dimension(f, GENDER_DIMENSION))
                .collect();
            sel.extend_head_values(percolated);
            let (linear, head) = affix_linear(sel.linear, sel.head, comp.linear, affix);
            TerminalChain {
                label: sel.label,
                values,
                selectional: sel.selectional,
                selection_strength: sel.selection_strength,
                linear,
                head,
            }
        } else {
            sel.extend_head_values(&comp.values);
            let head = sel.head;
            TerminalChain {
                label: sel.label,
                values,
                selectional: sel.selectional,
                selection_strength: sel.selection_strength,
                linear: word_linear(sel.linear, comp.linear),
                head,
            }
        }
    } else {
        comp.values.extend(sel.values.iter().cloned());
        comp.extend_head_values(&sel.values);
        let head = sel.head;
        TerminalChain {
            label: sel.label,
            values: sel.values,
            selectional: sel.selectional,
            selection_strength: sel.selection_strength,
            linear: word_linear(sel.linear, comp.linear),
            head,
        }
    };

    merged.validate()?;
    Ok(merged)
}

/// `selector # complement`.
fn word_linear(selector: Vec<LinearItem>, complement: Vec<LinearItem>) -> Vec<LinearItem> {
    let mut linear = selector;
    linear.push(LinearItem::WordBoundary);
    linear.extend(complement);
    linear
}

/// Attach the selector to the complement's head (first) word.
/// Returns the new sequence and the position of the selector's head in it.
fn affix_linear(
    selector: Vec<LinearItem>,
    selector_head: usize,
    complement: Vec<LinearItem>,
    affix: Affix,
) -> (Vec<LinearItem>, usize) {
    match affix {
        Affix::Suffixing => {
            let split = complement
                .iter()
                .position(|item| matches!(item, LinearItem::WordBoundary))
                .unwrap_or(complement.len());
            let mut linear = Vec::with_capacity(complement.len() + selector.len() + 1);
            let mut rest = complement;
            let tail = rest.split_off(split);
            linear.extend(rest);
            linear.push(LinearItem::MorphemeBoundary);
            let head = linear.len() + selector_head;
            linear.extend(selector);
            linear.extend(tail);
            (linear, head)
        }
        Affix::Prefixing => {
            let mut linear = selector;
            linear.push(LinearItem::MorphemeBoundary);
            linear.extend(complement);
            (linear, selector_head)
        }
    }
}
