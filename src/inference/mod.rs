//! Search and Inference Algorithms.

mod chain_pool;
mod control;
mod diffusion;
mod jump;
mod sample;

pub use self::chain_pool::ChainPool;
pub use self::control::Control;
pub use self::diffusion::{DiffusionParams, DiffusionSampler, DiffusionStep, RandomWalkSampler};
pub use self::jump::{JumpOutcome, JumpParams, JumpSampler, ProposalCacheError};
pub use self::sample::{MoveCounter, MoveStats, Sample, SampleKind};
