//! Fixed-dimension moves.

use crate::model::Model;
use crate::utilities::{FHBool, FiniteHistory};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::NEG_INFINITY;

/// The result of one fixed-dimension transition.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionStep {
    pub params: Vec<f64>,
    /// The log-probability of `params` under the model used for the step.
    pub log_prob: f64,
    pub accepted: bool,
}

/// An MCMC kernel that moves parameters within a space of fixed dimension.
///
/// The target is passed to every step, so a caller can change it between
/// steps (as an annealed bridge does) or swap it out entirely after
/// [`reinitialize`](DiffusionSampler::reinitialize).
pub trait DiffusionSampler {
    /// Restart from `params`, possibly in a space of a different dimension.
    /// With `carry_adaptation`, keep whatever the sampler has learned about
    /// step sizes.
    fn reinitialize(&mut self, params: Vec<f64>, carry_adaptation: bool);
    fn params(&self) -> &[f64];
    fn next_sample<M, R>(&mut self, model: &M, rng: &mut R) -> DiffusionStep
    where
        M: Model + ?Sized,
        R: Rng;
    fn adapt_on(&mut self);
    fn adapt_off(&mut self);
    fn is_adapting(&self) -> bool;
}

/// Parameters for a [`RandomWalkSampler`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffusionParams {
    /// The initial standard deviation of each coordinate's proposal.
    pub step_size: f64,
    /// The acceptance rate that adaptation steers toward.
    pub target_acceptance: f64,
    /// How far each adaptive update moves the log step size.
    pub adaptation_rate: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        DiffusionParams {
            step_size: 0.1,
            target_acceptance: 0.6,
            adaptation_rate: 0.05,
        }
    }
}

/// Gaussian random-walk Metropolis with Robbins-Monro step-size adaptation.
#[derive(Debug, Clone)]
pub struct RandomWalkSampler {
    settings: DiffusionParams,
    position: Vec<f64>,
    log_step: f64,
    adapting: bool,
    history: FiniteHistory<FHBool>,
}

impl RandomWalkSampler {
    pub fn new(settings: DiffusionParams) -> Self {
        RandomWalkSampler {
            settings,
            position: vec![],
            log_step: settings.step_size.ln(),
            adapting: false,
            history: FiniteHistory::new(100),
        }
    }
    pub fn step_size(&self) -> f64 {
        self.log_step.exp()
    }
    /// The acceptance rate over the last 100 steps.
    pub fn acceptance_ratio(&self) -> f64 {
        self.history.mean()
    }
}

impl DiffusionSampler for RandomWalkSampler {
    fn reinitialize(&mut self, params: Vec<f64>, carry_adaptation: bool) {
        self.position = params;
        if !carry_adaptation {
            self.log_step = self.settings.step_size.ln();
            self.history.clear();
        }
    }
    fn params(&self) -> &[f64] {
        &self.position
    }
    fn next_sample<M, R>(&mut self, model: &M, rng: &mut R) -> DiffusionStep
    where
        M: Model + ?Sized,
        R: Rng,
    {
        // The model may have changed since the last step.
        let current_lp = model.log_prob(&self.position);
        let step = self.log_step.exp();
        let proposal = self
            .position
            .iter()
            .map(|x| x + step * rng.sample::<f64, _>(StandardNormal))
            .collect::<Vec<_>>();
        let proposal_lp = model.log_prob(&proposal);

        let ratio = proposal_lp - current_lp;
        let accepted = !proposal_lp.is_nan()
            && (current_lp.is_nan()
                || current_lp == NEG_INFINITY
                || ratio >= 0.0
                || rng.gen::<f64>() < ratio.exp());
        let log_prob = if accepted {
            self.position = proposal;
            proposal_lp
        } else {
            current_lp
        };

        self.history.add(FHBool(accepted));
        if self.adapting {
            let hit = if accepted { 1.0 } else { 0.0 };
            self.log_step += self.settings.adaptation_rate * (hit - self.settings.target_acceptance);
        }
        DiffusionStep {
            params: self.position.clone(),
            log_prob,
            accepted,
        }
    }
    fn adapt_on(&mut self) {
        self.adapting = true;
    }
    fn adapt_off(&mut self) {
        self.adapting = false;
    }
    fn is_adapting(&self) -> bool {
        self.adapting
    }
}
