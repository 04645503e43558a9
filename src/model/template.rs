use super::{DimensionError, DimensionMatchMap, DimensionMatchedFactorModel, Factor, FactorModel, MixtureModel};
use crate::grammar::{DerivationTree, NodeId};
use crate::inference::ProposalCacheError;
use crate::InferenceError;
use std::fmt;
use std::sync::Arc;

/// The two structures of a jump and the roots of the subtree that changed.
#[derive(Debug, Clone, Copy)]
pub struct JumpPair<'a> {
    pub old: &'a Arc<DerivationTree>,
    pub old_root: NodeId,
    pub new: &'a Arc<DerivationTree>,
    pub new_root: NodeId,
}

/// Factors for a jump, split by what they depend on.
///
/// `old` factors are bound to the old structure and `new` factors to the new
/// one. `shared` factors score what both structures have in common and are
/// bound to the old structure.
#[derive(Default)]
pub struct FactorSplit {
    pub old: Vec<Box<dyn Factor>>,
    pub new: Vec<Box<dyn Factor>>,
    pub shared: Vec<Box<dyn Factor>>,
}

/// One scoring criterion, instantiated as factors for particular structures.
pub trait FactorTemplate: Send + Sync {
    fn unroll(&self, structure: &Arc<DerivationTree>) -> Vec<Box<dyn Factor>>;
    /// Split this template's factors for a jump.
    ///
    /// The default shares nothing: the old structure is scored entirely by
    /// `old` factors and the new one entirely by `new` factors.
    fn unroll_jump(&self, pair: &JumpPair) -> FactorSplit {
        FactorSplit {
            old: self.unroll(pair.old),
            new: self.unroll(pair.new),
            shared: vec![],
        }
    }
}

/// The three models of a jump, over the extended parameters.
#[derive(Debug)]
pub struct UnrolledJump {
    pub old: DimensionMatchedFactorModel,
    pub new: DimensionMatchedFactorModel,
    pub shared: DimensionMatchedFactorModel,
}

impl UnrolledJump {
    /// Mixture weights at the start of an annealed bridge: the old structure.
    pub const START_WEIGHTS: [f64; 3] = [1.0, 0.0, 1.0];
    /// Mixture weights at the end of an annealed bridge: the new structure.
    pub const END_WEIGHTS: [f64; 3] = [0.0, 1.0, 1.0];

    /// The bridge weights `alpha` of the way from the old structure to the new.
    pub fn weights_at(alpha: f64) -> [f64; 3] {
        [1.0 - alpha, alpha, 1.0]
    }
    /// Combine the models into a mixture (old, new, shared) weighted at the
    /// start of the bridge.
    pub fn into_bridge(self) -> Result<MixtureModel, DimensionError> {
        MixtureModel::new(
            vec![Box::new(self.old), Box::new(self.new), Box::new(self.shared)],
            UnrolledJump::START_WEIGHTS.to_vec(),
        )
    }
}

/// The registered scoring criteria of a problem.
#[derive(Clone, Default)]
pub struct FactorTemplateModel {
    templates: Vec<Arc<dyn FactorTemplate>>,
}

impl FactorTemplateModel {
    pub fn new() -> Self {
        FactorTemplateModel::default()
    }
    pub fn add_template(&mut self, template: Arc<dyn FactorTemplate>) {
        self.templates.push(template);
    }
    /// Remove a previously added template, returning whether it was present.
    pub fn remove_template(&mut self, template: &Arc<dyn FactorTemplate>) -> bool {
        let before = self.templates.len();
        self.templates.retain(|t| !Arc::ptr_eq(t, template));
        self.templates.len() != before
    }
    pub fn len(&self) -> usize {
        self.templates.len()
    }
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
    /// Every template's factors for `structure`, summed.
    pub fn unroll(&self, structure: &Arc<DerivationTree>) -> FactorModel {
        let factors = self
            .templates
            .iter()
            .flat_map(|t| t.unroll(structure))
            .collect();
        FactorModel::new(Arc::clone(structure), structure.num_params(), factors)
    }
    /// Every template's split factors for the jump from `old` to `new`, each
    /// set indexed into the extended parameters through `map`.
    ///
    /// `new` must be a proposal produced from `old`.
    pub fn unroll_jump(
        &self,
        old: &Arc<DerivationTree>,
        new: &Arc<DerivationTree>,
        map: &DimensionMatchMap,
    ) -> Result<UnrolledJump, InferenceError> {
        let provenance = new
            .provenance()
            .ok_or(ProposalCacheError::NotAProposal)?;
        if !provenance.is_source(old) {
            return Err(ProposalCacheError::UnknownPair.into());
        }
        let pair = JumpPair {
            old,
            old_root: provenance.old_root(),
            new,
            new_root: provenance.new_root(),
        };
        let mut split = FactorSplit::default();
        for template in &self.templates {
            let FactorSplit {
                old: o,
                new: n,
                shared: s,
            } = template.unroll_jump(&pair);
            split.old.extend(o);
            split.new.extend(n);
            split.shared.extend(s);
        }
        let matched = |tree: &Arc<DerivationTree>, indices: &[usize], factors: Vec<Box<dyn Factor>>| {
            DimensionMatchedFactorModel::new(
                Arc::clone(tree),
                indices.to_vec(),
                map.extended_len,
                factors,
            )
        };
        Ok(UnrolledJump {
            old: matched(old, &map.old_indices, split.old),
            new: matched(new, &map.new_indices, split.new),
            shared: matched(old, &map.old_indices, split.shared),
        })
    }
}

impl fmt::Debug for FactorTemplateModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FactorTemplateModel({} templates)", self.templates.len())
    }
}
