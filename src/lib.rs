//! Reversible-jump inference over the derivation trees of probabilistic grammars.
//!
//! A [`Grammar`] describes how variables expand into terminals (which carry
//! continuous parameters) and further variables. A [`DerivationTree`] is one
//! concrete expansion. [`FactorTemplate`]s turn a tree into a log-probability
//! [`Model`] of its parameters, and the [`JumpSampler`] explores both the shape of
//! the tree and its parameters: ordinary moves are delegated to a
//! fixed-dimension [`DiffusionSampler`], while structural moves reroll a subtree
//! and are accepted or rejected after an annealed bridge between the old and
//! new structures.
//!
//! # Example
//!
//! ```
//! # extern crate grammarinference;
//! # extern crate rand;
//! use grammarinference::grammar::mobile::{MobileGrammar, MobileParams};
//! use grammarinference::inference::{
//!     Control, DiffusionParams, JumpParams, JumpSampler, RandomWalkSampler,
//! };
//! use grammarinference::model::{FactorTemplateModel, GrammarFactorTemplate};
//! use grammarinference::DerivationTree;
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::sync::Arc;
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let mobile = MobileGrammar::new(&MobileParams::default()).expect("grammar");
//! let tree = DerivationTree::derive(mobile.grammar(), &mobile.axiom(), &mut rng).expect("tree");
//!
//! let mut templates = FactorTemplateModel::new();
//! templates.add_template(Arc::new(GrammarFactorTemplate));
//!
//! let diffusion = RandomWalkSampler::new(DiffusionParams::default());
//! let mut sampler =
//!     JumpSampler::new(templates, tree, diffusion, JumpParams::default()).expect("sampler");
//! let samples = sampler
//!     .run(Control::new(50, 10, 1, true), &mut rng)
//!     .expect("run");
//! assert!(!samples.is_empty());
//! ```

pub mod grammar;
pub mod inference;
pub mod model;
pub mod utilities;

pub use crate::grammar::{DerivationTree, Grammar, GrammarError, NodeId, Production, SymbolKind};
pub use crate::inference::{DiffusionSampler, JumpSampler, ProposalCacheError, Sample, SampleKind};
pub use crate::model::{DimensionError, Factor, FactorTemplate, Model};
pub use crate::utilities::NumericDegeneracyError;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
/// The error type for inference. Every variant aborts the current run.
pub enum InferenceError {
    Grammar(GrammarError),
    Dimension(DimensionError),
    ProposalCache(ProposalCacheError),
    NumericDegeneracy(NumericDegeneracyError),
}
impl From<GrammarError> for InferenceError {
    fn from(e: GrammarError) -> Self {
        InferenceError::Grammar(e)
    }
}
impl From<DimensionError> for InferenceError {
    fn from(e: DimensionError) -> Self {
        InferenceError::Dimension(e)
    }
}
impl From<ProposalCacheError> for InferenceError {
    fn from(e: ProposalCacheError) -> Self {
        InferenceError::ProposalCache(e)
    }
}
impl From<NumericDegeneracyError> for InferenceError {
    fn from(e: NumericDegeneracyError) -> Self {
        InferenceError::NumericDegeneracy(e)
    }
}
impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InferenceError::Grammar(ref e) => write!(f, "grammar error: {}", e),
            InferenceError::Dimension(ref e) => write!(f, "dimension error: {}", e),
            InferenceError::ProposalCache(ref e) => write!(f, "proposal cache error: {}", e),
            InferenceError::NumericDegeneracy(ref e) => write!(f, "numeric degeneracy: {}", e),
        }
    }
}
impl std::error::Error for InferenceError {}
