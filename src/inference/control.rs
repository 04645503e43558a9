use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How long to run a sampler and which samples to keep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// The number of steps to take after warm-up.
    pub iterations: usize,
    /// The number of warm-up steps, during which jumps are disabled.
    pub warmup: usize,
    /// Keep every `thin`th step (`0` and `1` keep everything).
    pub thin: usize,
    /// Adapt the diffusion step size during warm-up.
    pub adapt: bool,
    /// Keep the samples taken during warm-up.
    pub save_warmup: bool,
    /// Wall-clock budget in milliseconds (`0` for none), checked between steps.
    pub runtime: usize,
    #[serde(skip)]
    start: Option<Instant>,
    #[serde(skip)]
    done_steps: usize,
}

impl Control {
    pub fn new(iterations: usize, warmup: usize, thin: usize, adapt: bool) -> Self {
        Control {
            iterations,
            warmup,
            thin,
            adapt,
            save_warmup: false,
            runtime: 0,
            start: None,
            done_steps: 0,
        }
    }
    pub fn with_runtime(mut self, runtime: usize) -> Self {
        self.runtime = runtime;
        self
    }
    pub fn with_save_warmup(mut self, save_warmup: bool) -> Self {
        self.save_warmup = save_warmup;
        self
    }
    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.done_steps = 0;
    }
    /// Admit another step, if the step count and the runtime allow it.
    pub fn running(&mut self) -> bool {
        let timed_out = match self.start {
            Some(start) if self.runtime > 0 => {
                start.elapsed().as_millis() as usize >= self.runtime
            }
            _ => false,
        };
        if timed_out || self.done_steps >= self.warmup + self.iterations {
            false
        } else {
            self.done_steps += 1;
            true
        }
    }
    pub fn done_steps(&self) -> usize {
        self.done_steps
    }
    /// Is the most recently admitted step part of warm-up?
    pub fn in_warmup(&self) -> bool {
        self.done_steps <= self.warmup
    }
    /// Should the samples of the most recently admitted step be kept?
    pub fn keep(&self) -> bool {
        let thin = self.thin.max(1);
        let step = self.done_steps.saturating_sub(1);
        if self.in_warmup() {
            self.save_warmup && step % thin == 0
        } else {
            (step - self.warmup) % thin == 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_counts_steps_test() {
        let mut ctl = Control::new(6, 2, 3, false).with_save_warmup(true);
        ctl.start();
        let mut warm = vec![];
        let mut kept = vec![];
        while ctl.running() {
            warm.push(ctl.in_warmup());
            kept.push(ctl.keep());
        }
        assert_eq!(8, ctl.done_steps());
        assert_eq!(
            vec![true, true, false, false, false, false, false, false],
            warm
        );
        assert_eq!(
            vec![true, false, true, false, false, true, false, false],
            kept
        );
    }

    #[test]
    fn control_serde_skips_clock_test() {
        let ctl = Control::new(10, 5, 1, true).with_runtime(250);
        let json = serde_json::to_string(&ctl).unwrap();
        assert!(!json.contains("start"));
        let back: Control = serde_json::from_str(&json).unwrap();
        assert_eq!(ctl, back);
    }
}
