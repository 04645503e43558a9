//! Templates for externally supplied scores, such as the physical plausibility
//! of a structure.

use super::{Factor, FactorSplit, FactorTemplate, JumpPair};
use crate::grammar::{DerivationTree, NodeId, TerminalKind};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

type TerminalScore = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;
type StructureScore = Arc<dyn Fn(&DerivationTree, &[f64]) -> f64 + Send + Sync>;

struct TerminalFactor {
    structure: Arc<DerivationTree>,
    range: Range<usize>,
    score: TerminalScore,
}

impl Factor for TerminalFactor {
    fn structure(&self) -> &Arc<DerivationTree> {
        &self.structure
    }
    fn log_prob(&self, params: &[f64]) -> f64 {
        (self.score)(&params[self.range.clone()])
    }
}

/// Scores each terminal of one kind by its own parameters.
#[derive(Clone)]
pub struct TerminalConstraintTemplate {
    name: String,
    kind: TerminalKind,
    score: TerminalScore,
}

impl TerminalConstraintTemplate {
    pub fn new<F>(name: &str, kind: TerminalKind, score: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        TerminalConstraintTemplate {
            name: name.to_string(),
            kind,
            score: Arc::new(score),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    fn factors<I>(&self, tree: &Arc<DerivationTree>, leaves: I) -> Vec<Box<dyn Factor>>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let offsets = tree.leaf_offsets().into_iter().collect::<HashMap<_, _>>();
        leaves
            .into_iter()
            .filter_map(|id| {
                let t = tree.node(id)?.as_terminal()?;
                if t.kind != self.kind {
                    return None;
                }
                let start = *offsets.get(&id)?;
                Some(Box::new(TerminalFactor {
                    structure: Arc::clone(tree),
                    range: start..start + t.num_params(),
                    score: Arc::clone(&self.score),
                }) as Box<dyn Factor>)
            })
            .collect()
    }
}

impl FactorTemplate for TerminalConstraintTemplate {
    fn unroll(&self, structure: &Arc<DerivationTree>) -> Vec<Box<dyn Factor>> {
        self.factors(structure, structure.leaves().iter().copied())
    }
    fn unroll_jump(&self, pair: &JumpPair) -> FactorSplit {
        let replaced = pair.old.subtree_leaves(pair.old_root);
        let kept = {
            let replaced = replaced.iter().collect::<HashSet<_>>();
            pair.old
                .leaves()
                .iter()
                .filter(|id| !replaced.contains(id))
                .copied()
                .collect::<Vec<_>>()
        };
        FactorSplit {
            old: self.factors(pair.old, replaced),
            new: self.factors(pair.new, pair.new.subtree_leaves(pair.new_root)),
            shared: self.factors(pair.old, kept),
        }
    }
}

impl fmt::Debug for TerminalConstraintTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TerminalConstraintTemplate({}, {:?})", self.name, self.kind)
    }
}

struct StructureFactor {
    structure: Arc<DerivationTree>,
    score: StructureScore,
}

impl Factor for StructureFactor {
    fn structure(&self) -> &Arc<DerivationTree> {
        &self.structure
    }
    fn log_prob(&self, params: &[f64]) -> f64 {
        (self.score)(&self.structure, params)
    }
}

/// Scores a whole structure at once, given its parameters in flattened order.
///
/// Nothing is shared across a jump.
#[derive(Clone)]
pub struct StructureConstraintTemplate {
    name: String,
    score: StructureScore,
}

impl StructureConstraintTemplate {
    pub fn new<F>(name: &str, score: F) -> Self
    where
        F: Fn(&DerivationTree, &[f64]) -> f64 + Send + Sync + 'static,
    {
        StructureConstraintTemplate {
            name: name.to_string(),
            score: Arc::new(score),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FactorTemplate for StructureConstraintTemplate {
    fn unroll(&self, structure: &Arc<DerivationTree>) -> Vec<Box<dyn Factor>> {
        vec![Box::new(StructureFactor {
            structure: Arc::clone(structure),
            score: Arc::clone(&self.score),
        })]
    }
}

impl fmt::Debug for StructureConstraintTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StructureConstraintTemplate({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::mobile::{MobileGrammar, MobileParams};
    use crate::grammar::Provenance;
    use crate::model::{DimensionMatchMap, FactorTemplateModel, Model};
    use rand::{rngs::StdRng, SeedableRng};

    fn setup(seed: u64) -> (MobileGrammar, Arc<DerivationTree>, Arc<DerivationTree>, NodeId) {
        let mobile = MobileGrammar::new(&MobileParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let old = DerivationTree::derive(mobile.grammar(), &mobile.axiom(), &mut rng).unwrap();
        let old = Arc::new(old);
        let root = old.variables()[0];
        let mut new = old.deep_copy();
        new.reroll(root, &mut rng).unwrap();
        new.set_provenance(Provenance::new(&old, root, root));
        (mobile, old, Arc::new(new), root)
    }

    fn extended(
        old: &DerivationTree,
        new: &DerivationTree,
        root: NodeId,
    ) -> (DimensionMatchMap, Vec<f64>) {
        let (k, old_len) = old.param_span(root);
        let new_sub = new.subtree_params(root);
        let map = DimensionMatchMap::new(k, old_len, new_sub.len(), old.num_params() - k - old_len);
        let params = old.params();
        let mut x = params[..k + old_len].to_vec();
        x.extend_from_slice(&new_sub);
        x.extend_from_slice(&params[k + old_len..]);
        (map, x)
    }

    #[test]
    fn terminal_constraint_scores_each_terminal_test() {
        let (mobile, old, _, _) = setup(3);
        let template = TerminalConstraintTemplate::new("heavy", mobile.weight(), |p| -p[0]);
        let factors = template.unroll(&old);
        let weights = old
            .leaves()
            .iter()
            .filter(|&&id| old.node(id).unwrap().as_terminal().unwrap().kind == mobile.weight())
            .count();
        assert_eq!(weights, factors.len());

        let mut templates = FactorTemplateModel::new();
        templates.add_template(Arc::new(template));
        let model = templates.unroll(&old);
        let expected = old
            .leaves()
            .iter()
            .filter_map(|&id| old.node(id).unwrap().as_terminal())
            .filter(|t| t.kind == mobile.weight())
            .map(|t| -t.params()[0])
            .sum::<f64>();
        assert!((model.log_prob(&old.params()) - expected).abs() < 1e-12);
    }

    #[test]
    fn terminal_constraint_split_test() {
        let (mobile, old, new, root) = setup(8);
        let (map, x) = extended(&old, &new, root);
        let mut templates = FactorTemplateModel::new();
        templates.add_template(Arc::new(TerminalConstraintTemplate::new(
            "short",
            mobile.string(),
            |p| -p[0] * p[0],
        )));
        let whole_old = templates.unroll(&old).log_prob(&old.params());
        let whole_new = templates.unroll(&new).log_prob(&new.params());
        let split = templates.unroll_jump(&old, &new, &map).unwrap();
        assert!((split.old.log_prob(&x) + split.shared.log_prob(&x) - whole_old).abs() < 1e-9);
        assert!((split.new.log_prob(&x) + split.shared.log_prob(&x) - whole_new).abs() < 1e-9);
    }

    #[test]
    fn structure_constraint_shares_nothing_test() {
        let (_, old, new, root) = setup(21);
        let (map, x) = extended(&old, &new, root);
        let template: Arc<dyn FactorTemplate> =
            Arc::new(StructureConstraintTemplate::new("size", |tree, params| {
                assert_eq!(tree.num_params(), params.len());
                -(tree.leaves().len() as f64)
            }));
        let mut templates = FactorTemplateModel::new();
        templates.add_template(Arc::clone(&template));
        let split = templates.unroll_jump(&old, &new, &map).unwrap();
        assert_eq!(-(old.leaves().len() as f64), split.old.log_prob(&x));
        assert_eq!(-(new.leaves().len() as f64), split.new.log_prob(&x));
        assert_eq!(0.0, split.shared.log_prob(&x));

        assert!(templates.remove_template(&template));
        assert!(!templates.remove_template(&template));
        assert!(templates.is_empty());
    }

    #[test]
    fn unroll_jump_requires_provenance_test() {
        let (_, old, new, root) = setup(4);
        let (map, _) = extended(&old, &new, root);
        let mut templates = FactorTemplateModel::new();
        templates.add_template(Arc::new(crate::model::GrammarFactorTemplate));
        assert!(templates.unroll_jump(&old, &old, &map).is_err());
        assert!(templates.unroll_jump(&new, &new, &map).is_err());
    }
}
