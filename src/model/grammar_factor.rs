use super::{Factor, FactorSplit, FactorTemplate, JumpPair};
use crate::grammar::{DerivationTree, NodeId, Symbol, TerminalKind};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

/// The grammar's own prior over a set of nodes: the log-probability of their
/// production choices plus the log-density of their terminal parameters.
pub struct GrammarFactor {
    structure: Arc<DerivationTree>,
    structural_log_prob: f64,
    terminals: Vec<(TerminalKind, Range<usize>)>,
}

impl GrammarFactor {
    pub fn over<I>(structure: &Arc<DerivationTree>, nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let offsets = structure.leaf_offsets().into_iter().collect::<HashMap<_, _>>();
        let mut structural_log_prob = 0.0;
        let mut terminals = vec![];
        for id in nodes {
            match structure.node(id).map(|n| n.symbol()) {
                Some(Symbol::Variable(v)) => structural_log_prob += v.log_prob(),
                Some(Symbol::Terminal(t)) => {
                    if let Some(&start) = offsets.get(&id) {
                        terminals.push((t.kind, start..start + t.num_params()));
                    }
                }
                None => (),
            }
        }
        GrammarFactor {
            structure: Arc::clone(structure),
            structural_log_prob,
            terminals,
        }
    }
    pub fn structural_log_prob(&self) -> f64 {
        self.structural_log_prob
    }
}

impl Factor for GrammarFactor {
    fn structure(&self) -> &Arc<DerivationTree> {
        &self.structure
    }
    fn log_prob(&self, params: &[f64]) -> f64 {
        let grammar = self.structure.grammar();
        self.structural_log_prob
            + self
                .terminals
                .iter()
                .map(|(kind, range)| {
                    grammar.terminal_log_density(*kind, params[range.clone()].iter().copied())
                })
                .sum::<f64>()
    }
}

/// Scores a structure under the grammar that derived it.
///
/// A jump only touches the replaced subtree: the rest of the old structure
/// is shared.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarFactorTemplate;

fn all_nodes(tree: &DerivationTree) -> Vec<NodeId> {
    tree.roots()
        .iter()
        .flat_map(|&r| tree.descendants(r))
        .collect()
}

impl FactorTemplate for GrammarFactorTemplate {
    fn unroll(&self, structure: &Arc<DerivationTree>) -> Vec<Box<dyn Factor>> {
        vec![Box::new(GrammarFactor::over(structure, all_nodes(structure)))]
    }
    fn unroll_jump(&self, pair: &JumpPair) -> FactorSplit {
        let replaced = pair.old.descendants(pair.old_root);
        let kept = {
            let replaced = replaced.iter().collect::<HashSet<_>>();
            all_nodes(pair.old)
                .into_iter()
                .filter(|id| !replaced.contains(id))
                .collect::<Vec<_>>()
        };
        FactorSplit {
            old: vec![Box::new(GrammarFactor::over(pair.old, replaced))],
            new: vec![Box::new(GrammarFactor::over(
                pair.new,
                pair.new.descendants(pair.new_root),
            ))],
            shared: vec![Box::new(GrammarFactor::over(pair.old, kept))],
        }
    }
}
