use super::{Control, DiffusionSampler, JumpParams, JumpSampler, MoveStats, Sample};
use crate::grammar::DerivationTree;
use crate::model::FactorTemplateModel;
use crate::InferenceError;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

/// A pool of independent `JumpSampler`s, run in parallel.
///
/// Every chain owns its own structure and its own seeded RNG, so a run is
/// reproducible regardless of scheduling.
pub struct ChainPool<D> {
    chains: Vec<(JumpSampler<D>, StdRng)>,
}

impl<D> ChainPool<D>
where
    D: DiffusionSampler + Send,
{
    /// Pool the given chains, seeding each from `rng`.
    pub fn new<R: Rng>(chains: Vec<JumpSampler<D>>, rng: &mut R) -> Self {
        let chains = chains
            .into_iter()
            .map(|chain| (chain, StdRng::seed_from_u64(rng.gen())))
            .collect();
        ChainPool { chains }
    }
    /// `size` chains, each starting from its own copy of `tree`.
    pub fn replicate<R: Rng>(
        templates: &FactorTemplateModel,
        tree: &DerivationTree,
        diffusion: &D,
        settings: JumpParams,
        size: usize,
        rng: &mut R,
    ) -> Result<Self, InferenceError>
    where
        D: Clone,
    {
        let chains = (0..size)
            .map(|_| {
                JumpSampler::new(
                    templates.clone(),
                    tree.deep_copy(),
                    diffusion.clone(),
                    settings,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChainPool::new(chains, rng))
    }
    pub fn len(&self) -> usize {
        self.chains.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
    pub fn chains(&self) -> impl Iterator<Item = &JumpSampler<D>> {
        self.chains.iter().map(|(chain, _)| chain)
    }
    /// The move statistics of every chain, summed.
    pub fn stats(&self) -> MoveStats {
        self.chains().fold(MoveStats::default(), |mut total, chain| {
            total.merge(chain.stats());
            total
        })
    }
    /// Run every chain under `control`, returning each chain's samples.
    pub fn run(&mut self, control: Control) -> Result<Vec<Vec<Sample>>, InferenceError> {
        assert!(!self.chains.is_empty(), "Cannot run an empty ChainPool.");
        self.chains
            .par_iter_mut()
            .map(|(chain, rng)| chain.run(control, rng))
            .collect()
    }
}
