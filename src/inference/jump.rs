use super::{Control, DiffusionSampler, MoveStats, Sample, SampleKind};
use crate::grammar::{DerivationTree, GrammarError, NodeId, Provenance};
use crate::model::{DimensionMatchMap, FactorModel, FactorTemplateModel, Model, UnrolledJump};
use crate::utilities::{exp_normalize, sample_categorical, NumericDegeneracyError};
use crate::InferenceError;
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, PartialEq)]
/// The error type for proposal-probability lookups.
pub enum ProposalCacheError {
    /// The structure was not produced by a jump proposal.
    NotAProposal,
    /// The structures are not the pair of the most recent proposal.
    UnknownPair,
}
impl fmt::Display for ProposalCacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProposalCacheError::NotAProposal => write!(f, "structure is not a jump proposal"),
            ProposalCacheError::UnknownPair => {
                write!(f, "structures are not the most recent jump proposal")
            }
        }
    }
}
impl std::error::Error for ProposalCacheError {}

/// Parameters for a [`JumpSampler`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpParams {
    /// The probability that a step is a jump rather than a diffusion move.
    pub jump_frequency: f64,
    /// The number of diffusion steps on the bridge between structures.
    pub annealing_steps: usize,
    /// Variables are selected for rerolling with weight
    /// `branching_factor ^ (max depth - depth)`.
    pub branching_factor: f64,
}

impl Default for JumpParams {
    fn default() -> Self {
        JumpParams {
            jump_frequency: 0.1,
            annealing_steps: 50,
            branching_factor: 2.0,
        }
    }
}

/// Everything a jump move computed, for inspection and reporting.
#[derive(Debug, Clone)]
pub struct JumpOutcome {
    pub accepted: bool,
    /// Whether the accepted structure differs from the one it replaced.
    pub structurally_changed: bool,
    pub forward_lp: f64,
    pub reverse_lp: f64,
    pub annealing_log_ratio: f64,
    pub accept_lp: f64,
    /// Bridge weights (old, new, shared) right after the bridge was built.
    pub initial_weights: Vec<f64>,
    /// Bridge weights when the proposal was scored.
    pub final_weights: Vec<f64>,
    pub samples: Vec<Sample>,
}

struct CachedProposal {
    old: Weak<DerivationTree>,
    new: Weak<DerivationTree>,
    forward_lp: f64,
    reverse_lp: f64,
}

/// A reversible-jump sampler over the structures of a grammar and their
/// parameters.
///
/// Each step either takes one diffusion move on the current structure or
/// rerolls a subtree and anneals from the current structure to the proposal
/// before accepting or rejecting it.
pub struct JumpSampler<D> {
    templates: FactorTemplateModel,
    settings: JumpParams,
    diffusion: D,
    current: Arc<DerivationTree>,
    current_params: Vec<f64>,
    current_model: FactorModel,
    cache: Option<CachedProposal>,
    stats: MoveStats,
    jumps_enabled: bool,
}

impl<D: DiffusionSampler> JumpSampler<D> {
    /// Start from `tree` with its current parameters.
    pub fn new(
        templates: FactorTemplateModel,
        tree: DerivationTree,
        mut diffusion: D,
        settings: JumpParams,
    ) -> Result<Self, InferenceError> {
        if !(settings.branching_factor > 0.0 && settings.branching_factor.is_finite()) {
            return Err(NumericDegeneracyError::InvalidWeight {
                index: 0,
                weight: settings.branching_factor,
            }
            .into());
        }
        let current = Arc::new(tree);
        let current_params = current.params();
        let current_model = templates.unroll(&current);
        diffusion.reinitialize(current_params.clone(), false);
        Ok(JumpSampler {
            templates,
            settings,
            diffusion,
            current,
            current_params,
            current_model,
            cache: None,
            stats: MoveStats::default(),
            jumps_enabled: true,
        })
    }
    pub fn current(&self) -> &Arc<DerivationTree> {
        &self.current
    }
    pub fn current_params(&self) -> &[f64] {
        &self.current_params
    }
    pub fn current_log_prob(&self) -> Result<f64, InferenceError> {
        Ok(self.current_model.checked_log_prob(&self.current_params)?)
    }
    pub fn stats(&self) -> &MoveStats {
        &self.stats
    }
    pub fn settings(&self) -> &JumpParams {
        &self.settings
    }
    pub fn templates(&self) -> &FactorTemplateModel {
        &self.templates
    }
    pub fn diffusion(&self) -> &D {
        &self.diffusion
    }

    /// Take one step: a jump with probability `jump_frequency` (unless jumps
    /// are disabled for warm-up), otherwise a diffusion move.
    pub fn next_sample<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<Sample>, InferenceError> {
        if self.jumps_enabled && rng.gen::<f64>() < self.settings.jump_frequency {
            match self.execute_jump(rng) {
                Ok(outcome) => return Ok(outcome.samples),
                Err(InferenceError::Grammar(GrammarError::NothingToReroll)) => {
                    debug!("no variables to reroll; taking a diffusion move instead");
                }
                Err(e) => return Err(e),
            }
        }
        let step = self.diffusion.next_sample(&self.current_model, rng);
        self.stats.diffusion.record(step.accepted);
        self.current_params = step.params;
        Ok(vec![Sample {
            kind: SampleKind::Diffusion,
            structure: Arc::clone(&self.current),
            params: self.current_params.clone(),
            log_prob: step.log_prob,
        }])
    }

    /// The probability of selecting each variable of `tree` for a reroll.
    pub fn selection_distribution(
        &self,
        tree: &DerivationTree,
    ) -> Result<Vec<(NodeId, f64)>, InferenceError> {
        let variables = tree
            .variables()
            .into_iter()
            .filter_map(|id| tree.node(id).map(|n| (id, n.depth())))
            .collect_vec();
        let max_depth = match variables.iter().map(|&(_, d)| d).max() {
            Some(d) => d,
            None => return Err(GrammarError::NothingToReroll.into()),
        };
        let ln_b = self.settings.branching_factor.ln();
        let lps = variables
            .iter()
            .map(|&(_, d)| (max_depth - d) as f64 * ln_b)
            .collect_vec();
        let ps = exp_normalize(&lps)?;
        Ok(variables.into_iter().map(|(id, _)| id).zip(ps).collect())
    }

    /// Reroll a variable of a copy of the current structure and cache the
    /// forward and reverse proposal log-probabilities of the pair.
    pub fn propose<R: Rng>(&mut self, rng: &mut R) -> Result<Arc<DerivationTree>, InferenceError> {
        let selection = self.selection_distribution(&self.current)?;
        let ps = selection.iter().map(|&(_, p)| p).collect_vec();
        let (old_root, select_p) = selection[sample_categorical(&ps, rng)?];

        let mut proposal = self.current.deep_copy();
        proposal.set_params(&self.current_params)?;
        proposal.reroll(old_root, rng)?;
        let new_root = old_root;
        proposal.set_provenance(Provenance::new(&self.current, old_root, new_root));

        let reverse_p = self
            .selection_distribution(&proposal)?
            .into_iter()
            .find(|&(id, _)| id == new_root)
            .map(|(_, p)| p)
            .ok_or(GrammarError::UnknownNode)?;
        let forward_lp = select_p.ln() + proposal.recursive_structural_log_prob(new_root);
        let reverse_lp = reverse_p.ln() + self.current.recursive_structural_log_prob(old_root);
        debug!(
            forward_lp,
            reverse_lp,
            old_params = self.current.num_params(),
            new_params = proposal.num_params(),
            "proposed jump"
        );

        let proposal = Arc::new(proposal);
        self.cache = Some(CachedProposal {
            old: Arc::downgrade(&self.current),
            new: Arc::downgrade(&proposal),
            forward_lp,
            reverse_lp,
        });
        Ok(proposal)
    }

    /// The cached `(forward, reverse)` proposal log-probabilities of the jump
    /// from `old` to `new`.
    pub fn log_proposal_probability(
        &self,
        old: &Arc<DerivationTree>,
        new: &Arc<DerivationTree>,
    ) -> Result<(f64, f64), ProposalCacheError> {
        match self.cache {
            Some(ref c) if c.old.as_ptr() == Arc::as_ptr(old) && c.new.as_ptr() == Arc::as_ptr(new) => {
                Ok((c.forward_lp, c.reverse_lp))
            }
            _ => Err(ProposalCacheError::UnknownPair),
        }
    }

    /// Lay the current parameters and the proposal's new subtree out in one
    /// extended vector.
    pub fn dimension_match(
        &self,
        proposal: &Arc<DerivationTree>,
    ) -> Result<(DimensionMatchMap, Vec<f64>), InferenceError> {
        let provenance = proposal
            .provenance()
            .ok_or(ProposalCacheError::NotAProposal)?;
        if !provenance.is_source(&self.current) {
            return Err(ProposalCacheError::UnknownPair.into());
        }
        let (k, old_len) = self.current.param_span(provenance.old_root());
        let new_sub = proposal.subtree_params(provenance.new_root());
        let split = k + old_len;
        let map = DimensionMatchMap::new(
            k,
            old_len,
            new_sub.len(),
            self.current_params.len() - split,
        );
        let mut extended = Vec::with_capacity(map.extended_len);
        extended.extend_from_slice(&self.current_params[..split]);
        extended.extend_from_slice(&new_sub);
        extended.extend_from_slice(&self.current_params[split..]);
        Ok((map, extended))
    }

    /// Propose a jump, anneal from the current structure to the proposal, and
    /// accept or reject it.
    pub fn execute_jump<R: Rng>(&mut self, rng: &mut R) -> Result<JumpOutcome, InferenceError> {
        let proposal = self.propose(rng)?;
        let (forward_lp, reverse_lp) = self.log_proposal_probability(&self.current, &proposal)?;
        let (map, extended) = self.dimension_match(&proposal)?;
        let mut bridge = self
            .templates
            .unroll_jump(&self.current, &proposal, &map)?
            .into_bridge()?;
        let initial_weights = bridge.weights().to_vec();
        self.diffusion.reinitialize(extended.clone(), true);

        let n = self.settings.annealing_steps;
        let mut x = extended;
        let mut lp_prev = bridge.log_prob(&x);
        let mut annealing_log_ratio = 0.0;
        let mut bridge_samples = Vec::with_capacity(n);
        for i in 0..n {
            let alpha = i as f64 / n as f64;
            bridge.set_weights(&UnrolledJump::weights_at(alpha))?;
            let step = self.diffusion.next_sample(&bridge, rng);
            self.stats.annealing.record(step.accepted);
            annealing_log_ratio += lp_prev - step.log_prob;
            lp_prev = step.log_prob;
            trace!(step = i, alpha, log_prob = step.log_prob, "annealing");
            bridge_samples.push(Sample {
                kind: SampleKind::Annealing,
                structure: Arc::clone(&proposal),
                params: map.project_new(&step.params),
                log_prob: step.log_prob,
            });
            x = step.params;
        }

        bridge.set_weights(&UnrolledJump::END_WEIGHTS)?;
        let final_weights = bridge.weights().to_vec();
        let prop_lp = bridge.log_prob(&x);
        let curr_lp = self.current_log_prob()?;
        let accept_lp = (prop_lp + reverse_lp) - (curr_lp + forward_lp) + annealing_log_ratio;
        let accepted = if accept_lp.is_nan() {
            warn!(prop_lp, curr_lp, annealing_log_ratio, "NaN jump acceptance; rejecting");
            false
        } else {
            rng.gen::<f64>().ln() < accept_lp
        };
        self.stats.jump.record(accepted);

        let mut samples = vec![];
        let structurally_changed = accepted && !proposal.structurally_equivalent_to(&self.current);
        if accepted {
            samples.push(Sample {
                kind: SampleKind::JumpBegin,
                structure: Arc::clone(&self.current),
                params: self.current_params.clone(),
                log_prob: curr_lp,
            });
            samples.append(&mut bridge_samples);
            if structurally_changed {
                self.stats.jump_changed += 1;
            }
            self.current_params = map.project_new(&x);
            self.current = proposal;
            self.current_model = self.templates.unroll(&self.current);
        }
        self.diffusion.reinitialize(self.current_params.clone(), true);
        samples.push(Sample {
            kind: SampleKind::JumpEnd,
            structure: Arc::clone(&self.current),
            params: self.current_params.clone(),
            log_prob: self.current_log_prob()?,
        });
        debug!(
            accepted,
            structurally_changed, forward_lp, reverse_lp, annealing_log_ratio, accept_lp, "jump"
        );

        Ok(JumpOutcome {
            accepted,
            structurally_changed,
            forward_lp,
            reverse_lp,
            annealing_log_ratio,
            accept_lp,
            initial_weights,
            final_weights,
            samples,
        })
    }

    /// Run warm-up (no jumps, optional step-size adaptation) and then
    /// sampling, returning the kept samples in order.
    ///
    /// A jump in progress always runs its bridge to completion; the runtime
    /// budget is checked only between steps.
    pub fn run<R: Rng>(
        &mut self,
        mut control: Control,
        rng: &mut R,
    ) -> Result<Vec<Sample>, InferenceError> {
        info!(
            iterations = control.iterations,
            warmup = control.warmup,
            num_params = self.current.num_params(),
            "starting run"
        );
        control.start();
        let result = self.run_steps(&mut control, rng);
        self.diffusion.adapt_off();
        self.jumps_enabled = true;
        let samples = result?;
        info!(samples = samples.len(), "run finished");
        Ok(samples)
    }
    fn run_steps<R: Rng>(
        &mut self,
        control: &mut Control,
        rng: &mut R,
    ) -> Result<Vec<Sample>, InferenceError> {
        let mut samples = vec![];
        let mut warming = control.warmup > 0;
        self.jumps_enabled = !warming;
        if warming && control.adapt {
            self.diffusion.adapt_on();
        }
        while control.running() {
            if warming && !control.in_warmup() {
                warming = false;
                self.diffusion.adapt_off();
                self.jumps_enabled = true;
                info!(stats = %self.stats, "warm-up finished");
            }
            let batch = self.next_sample(rng)?;
            if control.keep() {
                samples.extend(batch);
            }
        }
        Ok(samples)
    }
}

impl<D> fmt::Debug for JumpSampler<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JumpSampler")
            .field("settings", &self.settings)
            .field("current", &self.current.to_string())
            .field("stats", &self.stats)
            .finish()
    }
}
