use rand::Rng as _;
use std::time::Duration;

use crate::thresholds::ThresholdSpec;

/// One window of the load ramp: linearly approach `target` concurrent
/// workers over `duration`, starting from the previous stage's target.
#[derive(Debug, Clone)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

/// Randomized pacing delay between a worker's iterations.
#[derive(Debug, Clone, Copy)]
pub struct ThinkTime {
    pub min: Duration,
    pub max: Duration,
}

impl ThinkTime {
    pub fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    pub(crate) fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self::from_millis(1_000, 2_000)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker count the first stage ramps from.
    pub start_workers: u64,
    pub stages: Vec<Stage>,
    pub thresholds: Vec<ThresholdSpec>,
    pub think_time: ThinkTime,
    /// Number of overlapping target calls a batch helper issues.
    pub batch_size: usize,
    pub target_base_url: String,
}

impl RunOptions {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            start_workers: 0,
            stages,
            thresholds: Vec::new(),
            think_time: ThinkTime::default(),
            batch_size: 1,
            target_base_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_time_sample_stays_in_range() {
        let think = ThinkTime::from_millis(5, 20);
        for _ in 0..200 {
            let d = think.sample();
            assert!(d >= think.min);
            assert!(d <= think.max);
        }
    }

    #[test]
    fn think_time_degenerate_range_is_constant() {
        let think = ThinkTime::from_millis(7, 7);
        assert_eq!(think.sample(), Duration::from_millis(7));
    }
}
