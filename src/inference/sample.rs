use crate::grammar::DerivationTree;
use crate::model::DimensionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where in the sampler a [`Sample`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    /// An ordinary fixed-dimension move.
    Diffusion,
    /// The state just before an accepted jump.
    JumpBegin,
    /// A point on the bridge of an accepted jump.
    Annealing,
    /// The state after a jump, whether or not it was accepted.
    JumpEnd,
}

impl SampleKind {
    /// Is this a draw from the target distribution, rather than a bridge
    /// point or the repeated pre-jump state?
    pub fn is_steady_state(self) -> bool {
        match self {
            SampleKind::Diffusion | SampleKind::JumpEnd => true,
            SampleKind::JumpBegin | SampleKind::Annealing => false,
        }
    }
}

/// A structure and a parameter vector for it.
#[derive(Debug, Clone)]
pub struct Sample {
    pub kind: SampleKind,
    pub structure: Arc<DerivationTree>,
    pub params: Vec<f64>,
    pub log_prob: f64,
}

impl Sample {
    /// A copy of the structure holding this sample's parameters.
    pub fn realize(&self) -> Result<DerivationTree, DimensionError> {
        let mut tree = self.structure.deep_copy();
        tree.set_params(&self.params)?;
        Ok(tree)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.realize() {
            Ok(tree) => write!(f, "{:?}\t{}\t{}", self.kind, self.log_prob, tree),
            Err(_) => write!(f, "{:?}\t{}\t{}", self.kind, self.log_prob, self.structure),
        }
    }
}

/// Attempts and acceptances of one kind of move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCounter {
    pub attempted: usize,
    pub accepted: usize,
}

impl MoveCounter {
    pub fn record(&mut self, accepted: bool) {
        self.attempted += 1;
        if accepted {
            self.accepted += 1;
        }
    }
    pub fn merge(&mut self, other: &MoveCounter) {
        self.attempted += other.attempted;
        self.accepted += other.accepted;
    }
    /// The fraction of attempts accepted, or `NaN` before any attempt.
    pub fn ratio(&self) -> f64 {
        self.accepted as f64 / self.attempted as f64
    }
}

impl fmt::Display for MoveCounter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{} ({:.3})", self.accepted, self.attempted, self.ratio())
    }
}

/// Move statistics of a jump sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStats {
    pub diffusion: MoveCounter,
    pub annealing: MoveCounter,
    pub jump: MoveCounter,
    /// Accepted jumps whose structure differs from the one they left.
    pub jump_changed: usize,
}

impl MoveStats {
    /// Add another sampler's counts to these.
    pub fn merge(&mut self, other: &MoveStats) {
        self.diffusion.merge(&other.diffusion);
        self.annealing.merge(&other.annealing);
        self.jump.merge(&other.jump);
        self.jump_changed += other.jump_changed;
    }
}

impl fmt::Display for MoveStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "diffusion: {}", self.diffusion)?;
        writeln!(f, "annealing: {}", self.annealing)?;
        writeln!(f, "jump:      {}", self.jump)?;
        write!(f, "changed:   {}", self.jump_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_stats_test() {
        let mut stats = MoveStats::default();
        assert!(stats.jump.ratio().is_nan());
        stats.jump.record(true);
        stats.jump.record(false);
        stats.diffusion.record(true);
        assert_eq!(0.5, stats.jump.ratio());
        assert!(stats.to_string().contains("jump:      1/2 (0.500)"));

        let json = serde_json::to_string(&stats).unwrap();
        let back: MoveStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, back);
    }

    #[test]
    fn steady_state_kinds_test() {
        assert!(SampleKind::Diffusion.is_steady_state());
        assert!(SampleKind::JumpEnd.is_steady_state());
        assert!(!SampleKind::Annealing.is_steady_state());
        assert!(!SampleKind::JumpBegin.is_steady_state());
    }
}
