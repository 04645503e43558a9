//! (representation) Probabilistic grammars over parameterized terminals.
//!
//! A [`Grammar`] is a table of symbol kinds. Terminal kinds carry one [`Prior`]
//! per continuous parameter; variable kinds carry a list of [`Production`]s.
//! Kinds are registered up front and referred to by [`TerminalKind`] and
//! [`VariableKind`] handles, so productions can expand into any kind, including
//! the variable they belong to.
//!
//! # Example
//!
//! ```
//! # extern crate grammarinference;
//! # extern crate rand;
//! use grammarinference::grammar::{priors::NormalPrior, Grammar, Production, SymbolKind};
//! use grammarinference::DerivationTree;
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::sync::Arc;
//!
//! let mut grammar = Grammar::new();
//! let leaf = grammar.add_terminal("Leaf", vec![Box::new(NormalPrior::new(0.0, 1.0).unwrap())]);
//! let node = grammar.add_variable("Node");
//! grammar.add_production(node, Production::always("stop", |_| 2.0, move |_| vec![leaf.into()]));
//! grammar.add_production(
//!     node,
//!     Production::new(
//!         "branch",
//!         |v| v.depth < 3,
//!         |_| 1.0,
//!         move |_| vec![node.into(), node.into()],
//!     ),
//! );
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let tree = DerivationTree::derive(Arc::new(grammar), &[SymbolKind::from(node)], &mut rng)
//!     .expect("derivation");
//! assert_eq!(tree.num_params(), tree.leaves().len());
//! ```

pub mod mobile;
pub mod priors;
mod tree;

pub use self::priors::Prior;
pub use self::tree::{DerivationTree, Node, NodeId, Provenance, Symbol, Terminal, Variable};

use crate::utilities::weighted_choice;
use crate::InferenceError;
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
/// The error type for malformed grammars and misuse of derivation trees.
pub enum GrammarError {
    /// No production of the variable applies in its current state.
    NoApplicableProduction { variable: String, depth: usize },
    /// The node does not belong to the tree it was used with.
    UnknownNode,
    /// A jump was requested on a tree without any variables.
    NothingToReroll,
    /// Expansion went deeper than the grammar allows.
    DepthLimitExceeded { limit: usize },
    /// A prior was constructed with unusable parameters.
    InvalidPrior(String),
}
impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GrammarError::NoApplicableProduction {
                ref variable,
                depth,
            } => write!(
                f,
                "no production of {} applies at depth {}",
                variable, depth
            ),
            GrammarError::UnknownNode => write!(f, "node is not part of this tree"),
            GrammarError::NothingToReroll => write!(f, "tree has no variables to reroll"),
            GrammarError::DepthLimitExceeded { limit } => {
                write!(f, "expansion exceeded depth limit {}", limit)
            }
            GrammarError::InvalidPrior(ref msg) => write!(f, "invalid prior: {}", msg),
        }
    }
}
impl std::error::Error for GrammarError {}

/// Identifies a terminal kind registered in a [`Grammar`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalKind(pub(crate) usize);

/// Identifies a variable kind registered in a [`Grammar`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableKind(pub(crate) usize);

/// The kind of a symbol: what a production expands into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal(TerminalKind),
    Variable(VariableKind),
}

impl From<TerminalKind> for SymbolKind {
    fn from(k: TerminalKind) -> Self {
        SymbolKind::Terminal(k)
    }
}

impl From<VariableKind> for SymbolKind {
    fn from(k: VariableKind) -> Self {
        SymbolKind::Variable(k)
    }
}

/// The state of a variable that productions are allowed to inspect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariableState {
    pub kind: VariableKind,
    pub depth: usize,
}

type Applicability = Box<dyn Fn(&VariableState) -> bool + Send + Sync>;
type Weight = Box<dyn Fn(&VariableState) -> f64 + Send + Sync>;
type Expansion = Box<dyn Fn(&VariableState) -> Vec<SymbolKind> + Send + Sync>;

/// A rewrite rule for a variable.
///
/// `applicable` decides whether the rule may be used, `weight` gives its
/// unnormalized probability among the applicable rules, and `expand` lists the
/// kinds of the children it creates (at `depth + 1`).
pub struct Production {
    name: String,
    applicable: Applicability,
    weight: Weight,
    expand: Expansion,
}

impl Production {
    pub fn new<A, W, E>(name: &str, applicable: A, weight: W, expand: E) -> Self
    where
        A: Fn(&VariableState) -> bool + Send + Sync + 'static,
        W: Fn(&VariableState) -> f64 + Send + Sync + 'static,
        E: Fn(&VariableState) -> Vec<SymbolKind> + Send + Sync + 'static,
    {
        Production {
            name: name.to_string(),
            applicable: Box::new(applicable),
            weight: Box::new(weight),
            expand: Box::new(expand),
        }
    }
    /// A production which always applies.
    pub fn always<W, E>(name: &str, weight: W, expand: E) -> Self
    where
        W: Fn(&VariableState) -> f64 + Send + Sync + 'static,
        E: Fn(&VariableState) -> Vec<SymbolKind> + Send + Sync + 'static,
    {
        Production::new(name, |_| true, weight, expand)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_applicable(&self, state: &VariableState) -> bool {
        (self.applicable)(state)
    }
    pub fn weight(&self, state: &VariableState) -> f64 {
        (self.weight)(state)
    }
    pub fn expand(&self, state: &VariableState) -> Vec<SymbolKind> {
        (self.expand)(state)
    }
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Production({})", self.name)
    }
}

#[derive(Debug)]
pub struct TerminalSpec {
    pub name: String,
    pub priors: Vec<Box<dyn Prior>>,
}

#[derive(Debug)]
pub struct VariableSpec {
    pub name: String,
    pub productions: Vec<Production>,
}

/// A probabilistic grammar: the per-kind tables of priors and productions.
#[derive(Debug, Default)]
pub struct Grammar {
    terminals: Vec<TerminalSpec>,
    variables: Vec<VariableSpec>,
    depth_limit: Option<usize>,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }
    /// Refuse to expand variables at or beyond `limit`.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = Some(limit);
        self
    }
    pub fn depth_limit(&self) -> Option<usize> {
        self.depth_limit
    }
    /// Register a terminal kind whose `i`th parameter is drawn from `priors[i]`.
    pub fn add_terminal(&mut self, name: &str, priors: Vec<Box<dyn Prior>>) -> TerminalKind {
        self.terminals.push(TerminalSpec {
            name: name.to_string(),
            priors,
        });
        TerminalKind(self.terminals.len() - 1)
    }
    /// Register a variable kind without any productions.
    pub fn add_variable(&mut self, name: &str) -> VariableKind {
        self.variables.push(VariableSpec {
            name: name.to_string(),
            productions: vec![],
        });
        VariableKind(self.variables.len() - 1)
    }
    pub fn add_production(&mut self, kind: VariableKind, production: Production) {
        self.variables[kind.0].productions.push(production);
    }
    pub fn terminal(&self, kind: TerminalKind) -> &TerminalSpec {
        &self.terminals[kind.0]
    }
    pub fn variable(&self, kind: VariableKind) -> &VariableSpec {
        &self.variables[kind.0]
    }
    pub fn num_params(&self, kind: TerminalKind) -> usize {
        self.terminals[kind.0].priors.len()
    }
    /// Sum of each parameter's log-density under its prior.
    pub fn terminal_log_density<I>(&self, kind: TerminalKind, params: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        self.terminals[kind.0]
            .priors
            .iter()
            .zip(params)
            .map(|(prior, x)| prior.log_density(x))
            .sum()
    }
    /// Pick a production for a variable in `state`, returning its index in the
    /// variable's production list and the log of its normalized weight among
    /// the applicable productions.
    pub fn choose_production<R: Rng>(
        &self,
        state: &VariableState,
        rng: &mut R,
    ) -> Result<(usize, f64), InferenceError> {
        let spec = &self.variables[state.kind.0];
        let applicable = spec
            .productions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_applicable(state))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if applicable.is_empty() {
            return Err(GrammarError::NoApplicableProduction {
                variable: spec.name.clone(),
                depth: state.depth,
            }
            .into());
        }
        let weights = applicable
            .iter()
            .map(|&i| spec.productions[i].weight(state))
            .collect::<Vec<_>>();
        let (choice, lp) = weighted_choice(&weights, rng)?;
        Ok((applicable[choice], lp))
    }
}
