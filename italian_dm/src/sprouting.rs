// Sprouting rules: splitting a fused terminal before spell-out.
//
// A rule says "a terminal labelled `trigger_label` carrying at least
// `trigger_values` may keep only `keep_values` and hand its full bundle to a
// new Agr terminal beside it". Rules come from the `(split_off, large)` pairs
// returned by `VocabularyInventory::generalize_vi`: the large item's bundle
// minus the split-off item's bundle is what stays behind. When the two
// exponents were written together with no `-` between them (`la` against
// `le` gives `l` + `a`), the rule is fused and the Agr is glued to its host
// with a `+` join that spell-out renders without a separator.
//
// At derivation time each eligible terminal runs one weighted lottery among
// its matching rules and a "no sprout" ticket, so a rule of weight `w` fires
// with probability `w / (w + no_sprout_weight)` when it is the only match.

use crate::chain::{LinearItem, TerminalChain};
use crate::choice::Chooser;
use crate::config::Affix;
use crate::error::StructuralError;
use crate::features::{FeatureSet, join};
use crate::terminal::{AGR_LABEL, Terminal, TerminalKind};
use crate::vocabulary::VocabularyItem;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SproutingRule {
    pub trigger_label: String,
    pub trigger_values: FeatureSet,
    /// Diacritic of the item the rule was learned from.
    pub trigger_diacritic: String,
    pub keep_values: FeatureSet,
    #[serde(default)]
    pub fused: bool,
    pub weight: f64,
}

impl PartialEq for SproutingRule {
    fn eq(&self, other: &Self) -> bool {
        self.trigger_label == other.trigger_label
            && self.trigger_values == other.trigger_values
            && self.trigger_diacritic == other.trigger_diacritic
            && self.keep_values == other.keep_values
            && self.fused == other.fused
    }
}

impl SproutingRule {
    /// The rule learned from splitting `split_off` out of `large`. `None`
    /// for agreement sources and for splits that would leave nothing behind.
    pub fn from_pair(
        split_off: &VocabularyItem,
        large: &VocabularyItem,
        fused: bool,
        weight: f64,
    ) -> Option<Self> {
        if large.label == AGR_LABEL {
            return None;
        }
        let keep_values: FeatureSet = large.values.difference(&split_off.values).cloned().collect();
        if keep_values.is_empty() {
            return None;
        }
        Some(SproutingRule {
            trigger_label: large.label.clone(),
            trigger_values: large.values.clone(),
            trigger_diacritic: large.diacritic.clone(),
            keep_values,
            fused,
            weight,
        })
    }

    pub fn matches(&self, terminal: &Terminal) -> bool {
        self.trigger_label == terminal.label && self.trigger_values.is_subset(&terminal.values)
    }
}

impl fmt::Display for SproutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] ({}) keeps [{}]",
            self.trigger_label,
            join(&self.trigger_values, ","),
            self.trigger_diacritic,
            join(&self.keep_values, ",")
        )?;
        if self.fused {
            write!(f, " fused")?;
        }
        Ok(())
    }
}

/// Add `rule` unless an equal one exists. Returns its index and whether it
/// was new.
pub fn add_rule(rules: &mut Vec<SproutingRule>, rule: SproutingRule) -> (bool, usize) {
    if let Some(existing) = rules.iter().position(|r| *r == rule) {
        return (false, existing);
    }
    tracing::debug!(rule = %rule, "new sprouting rule");
    rules.push(rule);
    (true, rules.len() - 1)
}

/// Run the sprouting lottery on every eligible terminal of `chain`.
///
/// Returns the rewritten chain and the indices of the rules that fired.
/// Roots and Agr terminals never sprout.
pub fn sprout_nodes(
    chain: &TerminalChain,
    rules: &[SproutingRule],
    affix: Affix,
    chooser: &mut impl Chooser,
    no_sprout_weight: f64,
) -> Result<(TerminalChain, Vec<usize>), StructuralError> {
    let mut linear = Vec::with_capacity(chain.linear.len());
    let mut head = chain.head;
    let mut used = Vec::new();

    for (pos, item) in chain.linear.iter().enumerate() {
        let is_head = pos == chain.head;
        let LinearItem::Leaf(terminal) = item else {
            linear.push(item.clone());
            continue;
        };
        let fired = if matches!(terminal.kind, TerminalKind::Root | TerminalKind::Agr) {
            None
        } else {
            pick_rule(terminal, rules, chooser, no_sprout_weight)
        };
        let Some(rule_id) = fired else {
            if is_head {
                head = linear.len();
            }
            linear.push(item.clone());
            continue;
        };

        let rule = &rules[rule_id];
        let mut kept = terminal.clone();
        kept.values = rule.keep_values.clone();
        let agr = LinearItem::Leaf(Terminal::agr(terminal.values.clone()));
        let join = if rule.fused {
            LinearItem::FusionBoundary
        } else {
            LinearItem::MorphemeBoundary
        };
        match affix {
            Affix::Suffixing => {
                if is_head {
                    head = linear.len();
                }
                linear.push(LinearItem::Leaf(kept));
                linear.push(join);
                linear.push(agr);
            }
            Affix::Prefixing => {
                linear.push(agr);
                linear.push(join);
                if is_head {
                    head = linear.len();
                }
                linear.push(LinearItem::Leaf(kept));
            }
        }
        tracing::debug!(rule = %rule, "sprouted Agr node");
        used.push(rule_id);
    }

    let sprouted = TerminalChain {
        linear,
        head,
        ..chain.clone()
    };
    sprouted.validate()?;
    Ok((sprouted, used))
}

fn pick_rule(
    terminal: &Terminal,
    rules: &[SproutingRule],
    chooser: &mut impl Chooser,
    no_sprout_weight: f64,
) -> Option<usize> {
    let matching: Vec<usize> = rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.matches(terminal))
        .map(|(id, _)| id)
        .collect();
    if !matching.iter().any(|&id| rules[id].weight > 0.0) {
        return None;
    }
    let mut weights: Vec<f64> = matching.iter().map(|&id| rules[id].weight).collect();
    weights.push(no_sprout_weight);
    let pick = chooser.weighted_index(&weights)?;
    matching.get(pick).copied()
}
