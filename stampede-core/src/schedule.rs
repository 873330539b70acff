use std::time::Duration;

use crate::config::Stage;

#[derive(Debug, Clone)]
struct Segment {
    starts_at: Duration,
    ends_at: Duration,
    start_target: u64,
    end_target: u64,
}

impl Segment {
    fn duration(&self) -> Duration {
        self.ends_at.saturating_sub(self.starts_at)
    }

    /// Linear interpolation between the segment endpoints. Integer math in
    /// nanoseconds; monotonic within the segment by construction.
    fn target_at(&self, elapsed: Duration) -> u64 {
        let dur = self.duration();
        if dur.is_zero() {
            return self.end_target;
        }

        let into = elapsed.saturating_sub(self.starts_at).min(dur);
        let delta = self.end_target as i128 - self.start_target as i128;
        let num = into.as_nanos() as i128;
        let den = (dur.as_nanos() as i128).max(1);

        let cur = self.start_target as i128 + delta.saturating_mul(num) / den;
        cur.clamp(0, u64::MAX as i128) as u64
    }
}

/// Maps elapsed wall-clock time to a target worker count across the
/// configured stages. Each stage ramps from the previous stage's target
/// (or `start` for the first) to its own target over its duration.
#[derive(Debug, Clone)]
pub struct RampingSchedule {
    start: u64,
    segments: Vec<Segment>,
}

impl RampingSchedule {
    pub fn new(start: u64, stages: &[Stage]) -> Self {
        let mut segments = Vec::with_capacity(stages.len());
        let mut clock = Duration::ZERO;
        let mut from = start;
        for stage in stages {
            let ends_at = clock.saturating_add(stage.duration);
            segments.push(Segment {
                starts_at: clock,
                ends_at,
                start_target: from,
                end_target: stage.target,
            });
            clock = ends_at;
            from = stage.target;
        }

        Self { start, segments }
    }

    pub fn total_duration(&self) -> Duration {
        self.segments
            .last()
            .map(|s| s.ends_at)
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Largest worker count the schedule ever asks for.
    pub fn max_target(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.start_target.max(s.end_target))
            .max()
            .unwrap_or(self.start)
    }

    pub fn target_at(&self, elapsed: Duration) -> u64 {
        if self.segments.is_empty() || elapsed.is_zero() {
            return self.start;
        }

        if elapsed >= self.total_duration() {
            return self.segments.last().map(|s| s.end_target).unwrap_or(0);
        }

        let idx = self.segment_index(elapsed);
        self.segments[idx].target_at(elapsed)
    }

    fn segment_index(&self, elapsed: Duration) -> usize {
        match self
            .segments
            .binary_search_by(|s| s.ends_at.cmp(&elapsed))
        {
            Ok(i) => i,
            Err(i) => i.min(self.segments.len() - 1),
        }
    }

    /// How long an idle worker slot should sleep before re-checking whether
    /// the ramp has reached its index. Active slots re-check quickly so a
    /// ramp-down is picked up promptly.
    pub fn next_recheck_in(&self, elapsed: Duration, worker_index: u64) -> Duration {
        let default_sleep = Duration::from_millis(50);

        if self.segments.is_empty() || elapsed >= self.total_duration() {
            return Duration::ZERO;
        }

        if worker_index <= self.target_at(elapsed) {
            return Duration::from_millis(1);
        }

        let seg = &self.segments[self.segment_index(elapsed)];
        let remaining = seg.ends_at.saturating_sub(elapsed);

        // A flat or descending segment cannot activate this slot.
        if seg.end_target <= seg.start_target {
            return remaining.min(default_sleep);
        }

        if worker_index > seg.end_target {
            return remaining.min(default_sleep);
        }

        // Ascending: solve for the time the ramp reaches this index.
        let want = worker_index as i128 - seg.start_target as i128;
        let delta = (seg.end_target - seg.start_target) as i128;
        let seg_ns = seg.duration().as_nanos() as i128;
        let into_ns = elapsed.saturating_sub(seg.starts_at).as_nanos() as i128;

        let needed_ns = (want.saturating_mul(seg_ns) / delta.max(1)).max(0);
        let wait_ns = needed_ns.saturating_sub(into_ns).max(0);
        let wait = Duration::from_nanos(wait_ns.min(u64::MAX as i128) as u64);

        wait.min(default_sleep)
    }
}
