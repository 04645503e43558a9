//! (scoring) Log-probability functions of a structure's parameters.
//!
//! A [`Factor`] scores part of one [`DerivationTree`]. [`FactorModel`] sums the
//! factors of a single structure; [`DimensionMatchedFactorModel`] does the same
//! for parameters living in the extended space of a jump, and
//! [`MixtureModel`] blends models with mutable weights so a jump can anneal
//! from one structure to another.

mod constraint;
mod grammar_factor;
mod template;

pub use self::constraint::{StructureConstraintTemplate, TerminalConstraintTemplate};
pub use self::grammar_factor::{GrammarFactor, GrammarFactorTemplate};
pub use self::template::{FactorSplit, FactorTemplate, FactorTemplateModel, JumpPair, UnrolledJump};

use crate::grammar::DerivationTree;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
/// The error type for parameter vectors of the wrong size.
pub enum DimensionError {
    /// A parameter vector had `found` entries where `expected` were needed.
    Length { expected: usize, found: usize },
    /// A mixture was given a different number of weights than models.
    MixtureMismatch { models: usize, weights: usize },
}
impl fmt::Display for DimensionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DimensionError::Length { expected, found } => write!(
                f,
                "expected {} parameters but found {}",
                expected, found
            ),
            DimensionError::MixtureMismatch { models, weights } => write!(
                f,
                "mixture of {} models given {} weights",
                models, weights
            ),
        }
    }
}
impl std::error::Error for DimensionError {}

/// A log-probability function over a fixed number of parameters.
pub trait Model: Send + Sync {
    fn num_params(&self) -> usize;
    /// Score `params`, which must have exactly `num_params()` entries.
    ///
    /// # Panics
    ///
    /// Implementations may panic on a vector of the wrong length. Use
    /// [`Model::checked_log_prob`] when the length is not already known to fit.
    fn log_prob(&self, params: &[f64]) -> f64;
    fn checked_log_prob(&self, params: &[f64]) -> Result<f64, DimensionError> {
        if params.len() != self.num_params() {
            return Err(DimensionError::Length {
                expected: self.num_params(),
                found: params.len(),
            });
        }
        Ok(self.log_prob(params))
    }
}

/// A contribution to the log-probability of one structure.
///
/// `params` are always in the natural (flattened) order of `structure()`.
pub trait Factor: Send + Sync {
    fn structure(&self) -> &Arc<DerivationTree>;
    fn log_prob(&self, params: &[f64]) -> f64;
}

fn assert_bound(structure: &Arc<DerivationTree>, factors: &[Box<dyn Factor>]) {
    assert!(
        factors.iter().all(|f| Arc::ptr_eq(f.structure(), structure)),
        "factor unrolled from a different structure"
    );
}

/// The sum of a set of factors over one structure.
pub struct FactorModel {
    structure: Arc<DerivationTree>,
    num_params: usize,
    factors: Vec<Box<dyn Factor>>,
}

impl FactorModel {
    /// # Panics
    ///
    /// Panics if any factor was unrolled from a structure other than `structure`.
    pub fn new(
        structure: Arc<DerivationTree>,
        num_params: usize,
        factors: Vec<Box<dyn Factor>>,
    ) -> Self {
        assert_bound(&structure, &factors);
        FactorModel {
            structure,
            num_params,
            factors,
        }
    }
    pub fn structure(&self) -> &Arc<DerivationTree> {
        &self.structure
    }
    pub fn len(&self) -> usize {
        self.factors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl Model for FactorModel {
    fn num_params(&self) -> usize {
        self.num_params
    }
    fn log_prob(&self, params: &[f64]) -> f64 {
        self.factors.iter().map(|f| f.log_prob(params)).sum()
    }
}

impl fmt::Debug for FactorModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FactorModel")
            .field("num_params", &self.num_params)
            .field("factors", &self.factors.len())
            .finish()
    }
}

/// A set of factors over one structure, evaluated on the extended parameters
/// of a jump.
///
/// Extended parameters are projected through `index_map` into the natural
/// order of the structure before any factor sees them.
pub struct DimensionMatchedFactorModel {
    structure: Arc<DerivationTree>,
    index_map: Vec<usize>,
    extended_len: usize,
    factors: Vec<Box<dyn Factor>>,
}

impl DimensionMatchedFactorModel {
    /// # Panics
    ///
    /// Panics if any factor was unrolled from a structure other than
    /// `structure`, or if `index_map` does not cover `structure`'s parameters
    /// with indices below `extended_len`.
    pub fn new(
        structure: Arc<DerivationTree>,
        index_map: Vec<usize>,
        extended_len: usize,
        factors: Vec<Box<dyn Factor>>,
    ) -> Self {
        assert_bound(&structure, &factors);
        assert_eq!(structure.num_params(), index_map.len());
        assert!(index_map.iter().all(|&i| i < extended_len));
        DimensionMatchedFactorModel {
            structure,
            index_map,
            extended_len,
            factors,
        }
    }
    pub fn structure(&self) -> &Arc<DerivationTree> {
        &self.structure
    }
    pub fn index_map(&self) -> &[usize] {
        &self.index_map
    }
}

impl Model for DimensionMatchedFactorModel {
    fn num_params(&self) -> usize {
        self.extended_len
    }
    fn log_prob(&self, params: &[f64]) -> f64 {
        if self.factors.is_empty() {
            return 0.0;
        }
        let natural = project(params, &self.index_map);
        self.factors.iter().map(|f| f.log_prob(&natural)).sum()
    }
}

impl fmt::Debug for DimensionMatchedFactorModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DimensionMatchedFactorModel")
            .field("index_map", &self.index_map)
            .field("extended_len", &self.extended_len)
            .field("factors", &self.factors.len())
            .finish()
    }
}

/// A weighted sum of models sharing one parameter space.
pub struct MixtureModel {
    models: Vec<Box<dyn Model>>,
    weights: Vec<f64>,
    num_params: usize,
}

impl MixtureModel {
    pub fn new(models: Vec<Box<dyn Model>>, weights: Vec<f64>) -> Result<Self, DimensionError> {
        if models.len() != weights.len() {
            return Err(DimensionError::MixtureMismatch {
                models: models.len(),
                weights: weights.len(),
            });
        }
        let num_params = models.first().map_or(0, |m| m.num_params());
        if let Some(m) = models.iter().find(|m| m.num_params() != num_params) {
            return Err(DimensionError::Length {
                expected: num_params,
                found: m.num_params(),
            });
        }
        Ok(MixtureModel {
            models,
            weights,
            num_params,
        })
    }
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), DimensionError> {
        if weights.len() != self.weights.len() {
            return Err(DimensionError::MixtureMismatch {
                models: self.models.len(),
                weights: weights.len(),
            });
        }
        self.weights.copy_from_slice(weights);
        Ok(())
    }
}

impl Model for MixtureModel {
    fn num_params(&self) -> usize {
        self.num_params
    }
    fn log_prob(&self, params: &[f64]) -> f64 {
        // A zero weight silences its model entirely, even at -inf.
        self.models
            .iter()
            .zip(&self.weights)
            .filter(|&(_, &w)| w != 0.0)
            .map(|(m, &w)| w * m.log_prob(params))
            .sum()
    }
}

impl fmt::Debug for MixtureModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MixtureModel")
            .field("models", &self.models.len())
            .field("weights", &self.weights)
            .field("num_params", &self.num_params)
            .finish()
    }
}

/// How the natural parameters of the old and the new structure of a jump are
/// laid out in one extended vector.
///
/// The extended vector is the old structure's parameters up to the replaced
/// subtree, then the old subtree's parameters, then the new subtree's, then
/// the rest of the old structure's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMatchMap {
    pub old_indices: Vec<usize>,
    pub new_indices: Vec<usize>,
    pub extended_len: usize,
}

impl DimensionMatchMap {
    /// `prefix` parameters precede the replaced subtree, which had `old_len`
    /// parameters and now has `new_len`; `suffix` parameters follow it.
    pub fn new(prefix: usize, old_len: usize, new_len: usize, suffix: usize) -> Self {
        let old_start = prefix;
        let new_start = old_start + old_len;
        let suffix_start = new_start + new_len;
        let extended_len = suffix_start + suffix;
        let old_indices = (0..new_start).chain(suffix_start..extended_len).collect();
        let new_indices = (0..prefix).chain(new_start..extended_len).collect();
        DimensionMatchMap {
            old_indices,
            new_indices,
            extended_len,
        }
    }
    /// The old structure's natural parameters within `extended`.
    pub fn project_old(&self, extended: &[f64]) -> Vec<f64> {
        project(extended, &self.old_indices)
    }
    /// The new structure's natural parameters within `extended`.
    pub fn project_new(&self, extended: &[f64]) -> Vec<f64> {
        project(extended, &self.new_indices)
    }
}

fn project(params: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| params[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::priors::NormalPrior;
    use crate::grammar::Grammar;
    use rand::{rngs::StdRng, SeedableRng};

    struct Bound(Arc<DerivationTree>);
    impl Factor for Bound {
        fn structure(&self) -> &Arc<DerivationTree> {
            &self.0
        }
        fn log_prob(&self, params: &[f64]) -> f64 {
            params.iter().sum()
        }
    }

    fn leaf_tree(seed: u64) -> Arc<DerivationTree> {
        let mut g = Grammar::new();
        let leaf = g.add_terminal("Leaf", vec![Box::new(NormalPrior::new(0.0, 1.0).unwrap())]);
        let mut rng = StdRng::seed_from_u64(seed);
        Arc::new(DerivationTree::derive(Arc::new(g), &[leaf.into()], &mut rng).unwrap())
    }

    #[derive(Debug)]
    struct Quadratic {
        n: usize,
    }
    impl Model for Quadratic {
        fn num_params(&self) -> usize {
            self.n
        }
        fn log_prob(&self, params: &[f64]) -> f64 {
            -params.iter().map(|x| x * x).sum::<f64>()
        }
    }

    #[derive(Debug)]
    struct Impossible;
    impl Model for Impossible {
        fn num_params(&self) -> usize {
            2
        }
        fn log_prob(&self, _: &[f64]) -> f64 {
            std::f64::NEG_INFINITY
        }
    }

    #[test]
    fn dimension_match_map_layout_test() {
        let map = DimensionMatchMap::new(2, 3, 1, 2);
        assert_eq!(8, map.extended_len);
        assert_eq!(vec![0, 1, 2, 3, 4, 6, 7], map.old_indices);
        assert_eq!(vec![0, 1, 5, 6, 7], map.new_indices);

        let extended = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(vec![0.0, 1.0, 5.0, 6.0, 7.0], map.project_new(&extended));
        assert_eq!(7, map.project_old(&extended).len());
    }

    #[test]
    fn dimension_match_map_covers_extended_space_test() {
        for &(p, o, n, s) in &[(0, 0, 0, 0), (0, 2, 0, 3), (4, 0, 2, 0), (1, 1, 1, 1)] {
            let map = DimensionMatchMap::new(p, o, n, s);
            assert_eq!(p + o + s, map.old_indices.len());
            assert_eq!(p + n + s, map.new_indices.len());
            for i in 0..map.extended_len {
                assert!(map.old_indices.contains(&i) || map.new_indices.contains(&i));
            }
        }
    }

    #[test]
    fn mixture_model_test() {
        let mut mix = MixtureModel::new(
            vec![Box::new(Quadratic { n: 2 }), Box::new(Impossible)],
            vec![0.5, 0.0],
        )
        .unwrap();
        assert_eq!(-1.0, mix.log_prob(&[1.0, 1.0]));
        mix.set_weights(&[1.0, 1.0]).unwrap();
        assert_eq!(std::f64::NEG_INFINITY, mix.log_prob(&[1.0, 1.0]));
        assert_eq!(
            Err(DimensionError::MixtureMismatch {
                models: 2,
                weights: 3
            }),
            mix.set_weights(&[1.0, 1.0, 1.0])
        );
        assert_eq!(
            Err(DimensionError::Length {
                expected: 2,
                found: 3
            }),
            mix.checked_log_prob(&[1.0, 1.0, 1.0])
        );
    }

    #[test]
    fn mixture_model_rejects_mismatched_models_test() {
        let err = MixtureModel::new(
            vec![Box::new(Quadratic { n: 3 }), Box::new(Impossible)],
            vec![1.0, 1.0],
        )
        .unwrap_err();
        assert_eq!(
            DimensionError::Length {
                expected: 3,
                found: 2
            },
            err
        );
        assert!(MixtureModel::new(vec![Box::new(Impossible)], vec![]).is_err());
    }

    #[test]
    fn factor_model_sums_bound_factors_test() {
        let tree = leaf_tree(0);
        let model = FactorModel::new(
            Arc::clone(&tree),
            1,
            vec![Box::new(Bound(Arc::clone(&tree))), Box::new(Bound(Arc::clone(&tree)))],
        );
        assert_eq!(2, model.len());
        assert_eq!(3.0, model.log_prob(&[1.5]));
        assert_eq!(
            Err(DimensionError::Length {
                expected: 1,
                found: 2
            }),
            model.checked_log_prob(&[1.5, 1.5])
        );
    }

    #[test]
    #[should_panic(expected = "factor unrolled from a different structure")]
    fn factor_model_rejects_foreign_factor_test() {
        let tree = leaf_tree(0);
        let other = Arc::new(tree.deep_copy());
        let _ = FactorModel::new(tree, 1, vec![Box::new(Bound(other))]);
    }

    #[test]
    #[should_panic(expected = "factor unrolled from a different structure")]
    fn dimension_matched_model_rejects_foreign_factor_test() {
        let tree = leaf_tree(1);
        let other = leaf_tree(1);
        let _ = DimensionMatchedFactorModel::new(tree, vec![0], 1, vec![Box::new(Bound(other))]);
    }
}
