use super::{Grammar, GrammarError, SymbolKind, TerminalKind, VariableKind, VariableState};
use crate::model::DimensionError;
use crate::InferenceError;
use generational_arena::{Arena, Index};
use itertools::Itertools;
use rand::Rng;
use std::fmt;
use std::sync::{Arc, Weak};

/// A handle to a node in the arena of one [`DerivationTree`].
///
/// Handles survive [`DerivationTree::deep_copy`]: the copy of a node has the
/// same handle in the copied tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Index);

/// A leaf carrying continuous parameters.
#[derive(Clone, Debug)]
pub struct Terminal {
    pub kind: TerminalKind,
    params: Vec<f64>,
}

impl Terminal {
    pub fn num_params(&self) -> usize {
        self.params.len()
    }
    pub fn params(&self) -> &[f64] {
        &self.params
    }
    pub fn set_params(&mut self, params: &[f64]) -> Result<(), DimensionError> {
        if params.len() != self.params.len() {
            return Err(DimensionError::Length {
                expected: self.params.len(),
                found: params.len(),
            });
        }
        self.params.copy_from_slice(params);
        Ok(())
    }
    pub fn log_density(&self, grammar: &Grammar) -> f64 {
        grammar.terminal_log_density(self.kind, self.params.iter().copied())
    }
}

#[derive(Clone, Debug)]
struct Expansion {
    production: usize,
    log_prob: f64,
    children: Vec<NodeId>,
}

/// A nonterminal and, once unrolled, the production it chose.
#[derive(Clone, Debug)]
pub struct Variable {
    pub kind: VariableKind,
    expansion: Option<Expansion>,
}

impl Variable {
    /// The index of the chosen production in the variable's production list.
    pub fn production(&self) -> Option<usize> {
        self.expansion.as_ref().map(|e| e.production)
    }
    /// Log of the normalized weight of the chosen production.
    pub fn log_prob(&self) -> f64 {
        self.expansion.as_ref().map(|e| e.log_prob).unwrap_or(0.0)
    }
    pub fn children(&self) -> &[NodeId] {
        self.expansion
            .as_ref()
            .map(|e| &e.children[..])
            .unwrap_or(&[])
    }
}

#[derive(Clone, Debug)]
pub enum Symbol {
    Terminal(Terminal),
    Variable(Variable),
}

#[derive(Clone, Debug)]
pub struct Node {
    depth: usize,
    parent: Option<NodeId>,
    symbol: Symbol,
}

impl Node {
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self.symbol {
            Symbol::Terminal(ref t) => Some(t),
            Symbol::Variable(_) => None,
        }
    }
    pub fn as_variable(&self) -> Option<&Variable> {
        match self.symbol {
            Symbol::Variable(ref v) => Some(v),
            Symbol::Terminal(_) => None,
        }
    }
    fn children(&self) -> &[NodeId] {
        match self.symbol {
            Symbol::Variable(ref v) => v.children(),
            Symbol::Terminal(_) => &[],
        }
    }
}

/// How a jump proposal was produced: `new_root` (in the proposal) is the
/// rerolled copy of `old_root` (in `source`).
#[derive(Clone, Debug)]
pub struct Provenance {
    source: Weak<DerivationTree>,
    old_root: NodeId,
    new_root: NodeId,
}

impl Provenance {
    pub fn new(source: &Arc<DerivationTree>, old_root: NodeId, new_root: NodeId) -> Self {
        Provenance {
            source: Arc::downgrade(source),
            old_root,
            new_root,
        }
    }
    /// Is `tree` the tree this proposal was produced from?
    pub fn is_source(&self, tree: &Arc<DerivationTree>) -> bool {
        self.source.as_ptr() == Arc::as_ptr(tree)
    }
    pub fn source(&self) -> Option<Arc<DerivationTree>> {
        self.source.upgrade()
    }
    pub fn old_root(&self) -> NodeId {
        self.old_root
    }
    pub fn new_root(&self) -> NodeId {
        self.new_root
    }
}

/// A derivation from a [`Grammar`]: an arena of nodes reachable from an
/// ordered list of roots.
///
/// The tree keeps its flattened leaves (every terminal, depth-first and left
/// to right) in sync with its shape; parameter vectors are read and written in
/// that order.
#[derive(Debug)]
pub struct DerivationTree {
    grammar: Arc<Grammar>,
    nodes: Arena<Node>,
    roots: Vec<NodeId>,
    leaves: Vec<NodeId>,
    num_params: usize,
    provenance: Option<Provenance>,
}

impl DerivationTree {
    /// Create a root for each symbol of `axiom` at depth 0 and unroll every
    /// variable among them.
    pub fn derive<R: Rng>(
        grammar: Arc<Grammar>,
        axiom: &[SymbolKind],
        rng: &mut R,
    ) -> Result<Self, InferenceError> {
        let mut tree = DerivationTree {
            grammar,
            nodes: Arena::new(),
            roots: vec![],
            leaves: vec![],
            num_params: 0,
            provenance: None,
        };
        for &kind in axiom {
            let root = tree.insert(kind, 0, None, rng);
            tree.roots.push(root);
        }
        for root in tree.roots.clone() {
            tree.unroll(root, rng)?;
        }
        tree.compute_leaves();
        Ok(tree)
    }
    /// An independent copy: same shape, same productions, same parameters,
    /// same node handles, but no provenance.
    pub fn deep_copy(&self) -> Self {
        DerivationTree {
            grammar: Arc::clone(&self.grammar),
            nodes: self.nodes.clone(),
            roots: self.roots.clone(),
            leaves: self.leaves.clone(),
            num_params: self.num_params,
            provenance: None,
        }
    }
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
    /// The flattened leaves.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }
    pub fn set_provenance(&mut self, provenance: Provenance) {
        self.provenance = Some(provenance);
    }
    pub fn num_params(&self) -> usize {
        self.num_params
    }
    /// Every parameter, in flattened order.
    pub fn params(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.num_params);
        for &leaf in &self.leaves {
            if let Some(t) = self.nodes[leaf.0].as_terminal() {
                params.extend_from_slice(t.params());
            }
        }
        params
    }
    pub fn set_params(&mut self, params: &[f64]) -> Result<(), DimensionError> {
        if params.len() != self.num_params {
            return Err(DimensionError::Length {
                expected: self.num_params,
                found: params.len(),
            });
        }
        let mut offset = 0;
        for &leaf in &self.leaves {
            if let Symbol::Terminal(ref mut t) = self.nodes[leaf.0].symbol {
                let n = t.num_params();
                t.set_params(&params[offset..offset + n])?;
                offset += n;
            }
        }
        Ok(())
    }
    /// Each flattened leaf with the offset of its first parameter.
    pub fn leaf_offsets(&self) -> Vec<(NodeId, usize)> {
        let mut offset = 0;
        self.leaves
            .iter()
            .map(|&leaf| {
                let here = offset;
                offset += self.nodes[leaf.0].as_terminal().map_or(0, Terminal::num_params);
                (leaf, here)
            })
            .collect()
    }
    /// `root` and everything below it, in depth-first discovery order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.preorder(&[root])
    }
    /// Every variable, in depth-first discovery order.
    pub fn variables(&self) -> Vec<NodeId> {
        self.preorder(&self.roots)
            .into_iter()
            .filter(|id| self.nodes[id.0].as_variable().is_some())
            .collect()
    }
    /// Every terminal under `root`, in flattened order.
    pub fn subtree_leaves(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.nodes[id.0].as_terminal().is_some())
            .collect()
    }
    pub fn subtree_params(&self, root: NodeId) -> Vec<f64> {
        self.subtree_leaves(root)
            .into_iter()
            .filter_map(|id| self.nodes[id.0].as_terminal())
            .flat_map(|t| t.params().iter().copied())
            .collect()
    }
    /// The flattened parameters of everything except the subtree at `skip`,
    /// along with the position at which the subtree would have appeared.
    pub fn params_skipping(&self, skip: NodeId) -> (Vec<f64>, usize) {
        let mut params = Vec::with_capacity(self.num_params);
        let mut skip_point = None;
        let mut stack = self.roots.iter().rev().copied().collect_vec();
        while let Some(id) = stack.pop() {
            if id == skip {
                skip_point = Some(params.len());
                continue;
            }
            let node = &self.nodes[id.0];
            if let Some(t) = node.as_terminal() {
                params.extend_from_slice(t.params());
            }
            stack.extend(node.children().iter().rev().copied());
        }
        let k = skip_point.unwrap_or_else(|| params.len());
        (params, k)
    }
    /// The offset of the first parameter under `root` in the flattened order,
    /// and how many parameters lie under it.
    pub fn param_span(&self, root: NodeId) -> (usize, usize) {
        let (rest, k) = self.params_skipping(root);
        (k, self.num_params - rest.len())
    }
    /// Discard the subtree below the variable `node` and unroll it afresh,
    /// sampling a new production and new parameters.
    ///
    /// If the new expansion fails, the tree is left exactly as it was.
    pub fn reroll<R: Rng>(&mut self, node: NodeId, rng: &mut R) -> Result<(), InferenceError> {
        let old = match self.nodes.get_mut(node.0) {
            Some(Node {
                symbol: Symbol::Variable(v),
                ..
            }) => v.expansion.take(),
            _ => return Err(GrammarError::UnknownNode.into()),
        };
        if let Err(e) = self.unroll(node, rng) {
            let partial = self.replace_expansion(node, old);
            self.remove_below(partial);
            return Err(e);
        }
        self.remove_below(old);
        self.compute_leaves();
        Ok(())
    }
    /// Log-probability of every production choice in the tree.
    pub fn structural_log_prob(&self) -> f64 {
        self.roots
            .iter()
            .map(|&r| self.recursive_structural_log_prob(r))
            .sum()
    }
    /// Log-density of every terminal parameter in the tree.
    pub fn parameter_log_prob(&self) -> f64 {
        self.roots
            .iter()
            .map(|&r| self.recursive_parameter_log_prob(r))
            .sum()
    }
    pub fn total_log_prob(&self) -> f64 {
        self.structural_log_prob() + self.parameter_log_prob()
    }
    pub fn recursive_structural_log_prob(&self, root: NodeId) -> f64 {
        self.descendants(root)
            .into_iter()
            .filter_map(|id| self.nodes[id.0].as_variable())
            .map(Variable::log_prob)
            .sum()
    }
    pub fn recursive_parameter_log_prob(&self, root: NodeId) -> f64 {
        self.descendants(root)
            .into_iter()
            .filter_map(|id| self.nodes[id.0].as_terminal())
            .map(|t| t.log_density(&self.grammar))
            .sum()
    }
    /// Do both trees make the same production choices in the same order?
    pub fn structurally_equivalent_to(&self, other: &DerivationTree) -> bool {
        let mine = self.variables();
        let theirs = other.variables();
        mine.len() == theirs.len()
            && mine.iter().zip(&theirs).all(|(a, b)| {
                match (self.nodes[a.0].as_variable(), other.nodes[b.0].as_variable()) {
                    (Some(x), Some(y)) => x.kind == y.kind && x.production() == y.production(),
                    _ => false,
                }
            })
    }
    /// The full tree, one node per line, indented by depth.
    pub fn pretty(&self) -> String {
        self.preorder(&self.roots)
            .into_iter()
            .map(|id| {
                let node = &self.nodes[id.0];
                format!("{}{}", "  ".repeat(node.depth), self.describe(node))
            })
            .join("\n")
    }

    fn describe(&self, node: &Node) -> String {
        match node.symbol {
            Symbol::Terminal(ref t) => format!(
                "{}({})",
                self.grammar.terminal(t.kind).name,
                t.params().iter().join(", ")
            ),
            Symbol::Variable(ref v) => {
                format!("{}[{}]", self.grammar.variable(v.kind).name, node.depth)
            }
        }
    }
    fn insert<R: Rng>(
        &mut self,
        kind: SymbolKind,
        depth: usize,
        parent: Option<NodeId>,
        rng: &mut R,
    ) -> NodeId {
        let symbol = match kind {
            SymbolKind::Terminal(kind) => Symbol::Terminal(Terminal {
                kind,
                params: self
                    .grammar
                    .terminal(kind)
                    .priors
                    .iter()
                    .map(|prior| prior.sample(rng))
                    .collect(),
            }),
            SymbolKind::Variable(kind) => Symbol::Variable(Variable {
                kind,
                expansion: None,
            }),
        };
        NodeId(self.nodes.insert(Node {
            depth,
            parent,
            symbol,
        }))
    }
    fn unroll<R: Rng>(&mut self, root: NodeId, rng: &mut R) -> Result<(), InferenceError> {
        let grammar = Arc::clone(&self.grammar);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            let state = match node.symbol {
                Symbol::Variable(ref v) => VariableState {
                    kind: v.kind,
                    depth: node.depth,
                },
                Symbol::Terminal(_) => continue,
            };
            if let Some(limit) = grammar.depth_limit() {
                if state.depth >= limit {
                    return Err(GrammarError::DepthLimitExceeded { limit }.into());
                }
            }
            let (production, log_prob) = grammar.choose_production(&state, rng)?;
            let children = grammar.variable(state.kind).productions[production]
                .expand(&state)
                .into_iter()
                .map(|kind| self.insert(kind, state.depth + 1, Some(id), rng))
                .collect_vec();
            stack.extend(children.iter().rev().copied());
            if let Symbol::Variable(ref mut v) = self.nodes[id.0].symbol {
                v.expansion = Some(Expansion {
                    production,
                    log_prob,
                    children,
                });
            }
        }
        Ok(())
    }
    fn replace_expansion(&mut self, node: NodeId, expansion: Option<Expansion>) -> Option<Expansion> {
        match self.nodes[node.0].symbol {
            Symbol::Variable(ref mut v) => std::mem::replace(&mut v.expansion, expansion),
            Symbol::Terminal(_) => None,
        }
    }
    fn remove_below(&mut self, expansion: Option<Expansion>) {
        if let Some(e) = expansion {
            for id in self.preorder(&e.children) {
                self.nodes.remove(id.0);
            }
        }
    }
    fn compute_leaves(&mut self) {
        let leaves = self
            .preorder(&self.roots)
            .into_iter()
            .filter(|id| self.nodes[id.0].as_terminal().is_some())
            .collect_vec();
        self.num_params = leaves
            .iter()
            .filter_map(|id| self.nodes[id.0].as_terminal())
            .map(Terminal::num_params)
            .sum();
        self.leaves = leaves;
    }
    fn preorder(&self, from: &[NodeId]) -> Vec<NodeId> {
        let mut order = vec![];
        let mut stack = from.iter().rev().copied().collect_vec();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children().iter().rev().copied());
        }
        order
    }
}

impl fmt::Display for DerivationTree {
    /// The flattened leaves.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let leaves = self
            .leaves
            .iter()
            .map(|id| self.describe(&self.nodes[id.0]))
            .join(" ");
        write!(f, "{}", leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::mobile::{MobileGrammar, MobileParams};
    use crate::grammar::priors::NormalPrior;
    use crate::grammar::Production;
    use rand::{rngs::StdRng, SeedableRng};

    /// One variable with two equally weighted productions: a single
    /// Normal(0, 1) terminal, or (at depth 0 only) two fresh variables.
    fn split_or_leaf() -> (Arc<Grammar>, VariableKind) {
        let mut g = Grammar::new();
        let leaf = g.add_terminal("Leaf", vec![Box::new(NormalPrior::new(0.0, 1.0).unwrap())]);
        let v = g.add_variable("V");
        g.add_production(v, Production::always("leaf", |_| 1.0, move |_| vec![leaf.into()]));
        g.add_production(
            v,
            Production::new("split", |s| s.depth == 0, |_| 1.0, move |_| vec![v.into(), v.into()]),
        );
        (Arc::new(g), v)
    }

    fn mobile_tree(seed: u64) -> DerivationTree {
        let mobile = MobileGrammar::new(&MobileParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        DerivationTree::derive(mobile.grammar(), &mobile.axiom(), &mut rng).unwrap()
    }

    fn fresh_leaves(tree: &DerivationTree) -> Vec<NodeId> {
        let mut leaves = vec![];
        let mut stack = tree.roots().iter().rev().copied().collect_vec();
        while let Some(id) = stack.pop() {
            match tree.node(id).unwrap().symbol() {
                Symbol::Terminal(_) => leaves.push(id),
                Symbol::Variable(v) => stack.extend(v.children().iter().rev().copied()),
            }
        }
        leaves
    }

    #[test]
    fn single_leaf_derivation_test() {
        let (g, v) = split_or_leaf();
        let tree = (0..)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                DerivationTree::derive(Arc::clone(&g), &[v.into()], &mut rng).unwrap()
            })
            .find(|t| t.leaves().len() == 1)
            .unwrap();

        assert_eq!(1, tree.num_params());
        assert_eq!(1, tree.variables().len());
        assert!((tree.structural_log_prob() - 0.5f64.ln()).abs() < 1e-12);
        let x = tree.params()[0];
        let expected = -0.5 * x * x - 0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((tree.parameter_log_prob() - expected).abs() < 1e-9);
    }

    #[test]
    fn flattening_matches_fresh_traversal_test() {
        for seed in 0..20 {
            let mut tree = mobile_tree(seed);
            assert_eq!(fresh_leaves(&tree), tree.leaves());
            let counted = tree
                .leaves()
                .iter()
                .map(|&id| tree.node(id).unwrap().as_terminal().unwrap().num_params())
                .sum::<usize>();
            assert_eq!(counted, tree.num_params());
            assert_eq!(counted, tree.params().len());

            let mut rng = StdRng::seed_from_u64(seed + 100);
            let vars = tree.variables();
            let target = vars[vars.len() / 2];
            tree.reroll(target, &mut rng).unwrap();
            assert_eq!(fresh_leaves(&tree), tree.leaves());
            assert_eq!(tree.params().len(), tree.num_params());
        }
    }

    #[test]
    fn set_params_round_trip_test() {
        let mut tree = mobile_tree(5);
        let params = tree.params();
        tree.set_params(&params).unwrap();
        let again = tree.params();
        assert_eq!(params.len(), again.len());
        assert!(params
            .iter()
            .zip(&again)
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn set_params_dimension_error_test() {
        let mut tree = mobile_tree(6);
        let n = tree.num_params();
        assert_eq!(
            Err(DimensionError::Length {
                expected: n,
                found: n + 1
            }),
            tree.set_params(&vec![0.5; n + 1])
        );
    }

    #[test]
    fn deep_copy_is_independent_test() {
        let tree = mobile_tree(9);
        let (slp, plp, params) = (
            tree.structural_log_prob(),
            tree.parameter_log_prob(),
            tree.params(),
        );

        let mut copy = tree.deep_copy();
        assert!(copy.structurally_equivalent_to(&tree));
        assert!(copy.provenance().is_none());
        copy.set_params(&vec![1.0; copy.num_params()]).unwrap();
        let mut rng = StdRng::seed_from_u64(10);
        copy.reroll(copy.variables()[0], &mut rng).unwrap();

        assert_eq!(slp, tree.structural_log_prob());
        assert_eq!(plp, tree.parameter_log_prob());
        assert_eq!(params, tree.params());
        assert_eq!(fresh_leaves(&tree), tree.leaves());
    }

    #[test]
    fn reroll_rejects_foreign_node_test() {
        let mut tree = mobile_tree(2);
        let leaf = tree.leaves()[0];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Err(InferenceError::Grammar(GrammarError::UnknownNode)),
            tree.reroll(leaf, &mut rng)
        );

        // A rerolled-away node no longer belongs to the tree.
        let root_var = tree.variables()[0];
        let doomed = tree.variables().into_iter().find(|&v| v != root_var);
        tree.reroll(root_var, &mut rng).unwrap();
        if let Some(doomed) = doomed {
            assert!(!tree.contains(doomed));
            assert!(tree.reroll(doomed, &mut rng).is_err());
        }
    }

    #[test]
    fn failed_reroll_leaves_tree_intact_test() {
        let mut g = Grammar::new();
        let leaf = g.add_terminal("Leaf", vec![Box::new(NormalPrior::new(0.0, 1.0).unwrap())]);
        let v = g.add_variable("V");
        let dead = g.add_variable("Dead");
        g.add_production(v, Production::always("leaf", |_| 1.0, move |_| vec![leaf.into()]));
        g.add_production(v, Production::always("dead", |_| 1.0, move |_| vec![dead.into()]));
        let g = Arc::new(g);

        let tree = (0..)
            .find_map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                DerivationTree::derive(Arc::clone(&g), &[v.into()], &mut rng).ok()
            })
            .unwrap();
        let root = tree.roots()[0];
        let params = tree.params();
        let shown = tree.to_string();
        let slp = tree.structural_log_prob();

        let mut failures = 0;
        for seed in 0..64 {
            let mut copy = tree.deep_copy();
            let mut rng = StdRng::seed_from_u64(seed);
            if copy.reroll(root, &mut rng).is_err() {
                failures += 1;
                assert_eq!(params, copy.params());
                assert_eq!(shown, copy.to_string());
                assert_eq!(slp, copy.structural_log_prob());
                assert_eq!(fresh_leaves(&copy), copy.leaves());
                assert_eq!(tree.nodes.len(), copy.nodes.len());
                assert!(copy.set_params(&params).is_ok());
            }
        }
        assert!(failures > 0);
    }

    #[test]
    fn params_skipping_test() {
        let tree = mobile_tree(4);
        let params = tree.params();
        for var in tree.variables() {
            let (rest, k) = tree.params_skipping(var);
            let sub = tree.subtree_params(var);
            let mut rebuilt = rest[..k].to_vec();
            rebuilt.extend_from_slice(&sub);
            rebuilt.extend_from_slice(&rest[k..]);
            assert_eq!(params, rebuilt);
        }
    }

    #[test]
    fn log_probs_decompose_test() {
        let tree = mobile_tree(12);
        let total = tree.total_log_prob();
        assert!(total.is_finite());
        assert!(
            (total - tree.structural_log_prob() - tree.parameter_log_prob()).abs() < 1e-12
        );
        let offsets = tree.leaf_offsets();
        assert_eq!(tree.leaves().len(), offsets.len());
        assert_eq!(Some(&(tree.leaves()[0], 0)), offsets.first());
    }

    #[test]
    fn depth_limit_test() {
        let mut g = Grammar::new().with_depth_limit(3);
        let v = g.add_variable("Forever");
        g.add_production(v, Production::always("again", |_| 1.0, move |_| vec![v.into()]));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            InferenceError::Grammar(GrammarError::DepthLimitExceeded { limit: 3 }),
            DerivationTree::derive(Arc::new(g), &[v.into()], &mut rng).unwrap_err()
        );
    }

    #[test]
    fn display_lists_leaves_test() {
        let tree = mobile_tree(1);
        let shown = tree.to_string();
        assert!(shown.starts_with("String("));
        assert_eq!(tree.leaves().len(), shown.split(") ").count());
        assert!(tree.pretty().lines().count() >= tree.leaves().len());
    }
}
