use std::time::Duration;

pub(crate) const PERF_WINDOW_LEN: usize = 120;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingMsStats {
    pub last_ms: f32,
    pub avg_ms: f32,
    pub max_ms: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerfStatsSnapshot {
    pub sync: RollingMsStats,
    pub pick: RollingMsStats,
    pub render: RollingMsStats,
}

/// Rolling timings for the three per-frame costs of the surface: instance
/// sync, pointer resolution and software rendering.
#[derive(Debug, Default)]
pub(crate) struct PerfStats {
    sync: RollingWindowMs,
    pick: RollingWindowMs,
    render: RollingWindowMs,
}

impl PerfStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sync(&mut self, duration: Duration) {
        self.sync.push_ms(duration_to_ms(duration));
    }

    pub(crate) fn record_pick(&mut self, duration: Duration) {
        self.pick.push_ms(duration_to_ms(duration));
    }

    pub(crate) fn record_render(&mut self, duration: Duration) {
        self.render.push_ms(duration_to_ms(duration));
    }

    pub(crate) fn snapshot(&self) -> PerfStatsSnapshot {
        PerfStatsSnapshot {
            sync: self.sync.snapshot(),
            pick: self.pick.snapshot(),
            render: self.render.snapshot(),
        }
    }
}

#[derive(Debug)]
struct RollingWindowMs {
    samples_ms: [f32; PERF_WINDOW_LEN],
    head: usize,
    count: usize,
    sum_ms: f32,
    last_ms: f32,
}

impl Default for RollingWindowMs {
    fn default() -> Self {
        Self {
            samples_ms: [0.0; PERF_WINDOW_LEN],
            head: 0,
            count: 0,
            sum_ms: 0.0,
            last_ms: 0.0,
        }
    }
}

impl RollingWindowMs {
    fn push_ms(&mut self, value_ms: f32) {
        self.last_ms = value_ms;

        let evicted = if self.count < PERF_WINDOW_LEN {
            self.count += 1;
            0.0
        } else {
            self.samples_ms[self.head]
        };
        self.samples_ms[self.head] = value_ms;
        self.head = (self.head + 1) % PERF_WINDOW_LEN;
        self.sum_ms += value_ms - evicted;
    }

    fn snapshot(&self) -> RollingMsStats {
        if self.count == 0 {
            return RollingMsStats::default();
        }

        let max_ms = self.samples_ms[..self.count]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max);

        RollingMsStats {
            last_ms: self.last_ms,
            avg_ms: self.sum_ms / self.count as f32,
            max_ms,
        }
    }
}

fn duration_to_ms(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_snapshot_is_zeroed() {
        let snapshot = PerfStats::new().snapshot();
        assert_eq!(snapshot, PerfStatsSnapshot::default());
    }

    #[test]
    fn streams_are_recorded_independently() {
        let mut stats = PerfStats::new();
        stats.record_sync(Duration::from_millis(2));
        stats.record_pick(Duration::from_micros(500));

        let snapshot = stats.snapshot();
        assert!((snapshot.sync.last_ms - 2.0).abs() < 1e-4);
        assert!((snapshot.pick.last_ms - 0.5).abs() < 1e-4);
        assert_eq!(snapshot.render, RollingMsStats::default());
    }

    #[test]
    fn partial_window_average_uses_current_sample_count() {
        let mut window = RollingWindowMs::default();
        window.push_ms(1.0);
        window.push_ms(2.0);
        window.push_ms(3.0);
        let snapshot = window.snapshot();

        assert_eq!(snapshot.last_ms, 3.0);
        assert!((snapshot.avg_ms - 2.0).abs() < 0.0001);
        assert_eq!(snapshot.max_ms, 3.0);
    }

    #[test]
    fn max_recomputes_when_prior_max_is_evicted() {
        let mut window = RollingWindowMs::default();
        window.push_ms(100.0);
        for _ in 1..PERF_WINDOW_LEN {
            window.push_ms(10.0);
        }
        window.push_ms(20.0);
        let snapshot = window.snapshot();

        let expected_avg = ((PERF_WINDOW_LEN as f32 - 2.0) * 10.0 + 20.0 + 10.0)
            / PERF_WINDOW_LEN as f32;
        assert_eq!(snapshot.last_ms, 20.0);
        assert_eq!(snapshot.max_ms, 20.0);
        assert!((snapshot.avg_ms - expected_avg).abs() < 0.001);
    }
}
