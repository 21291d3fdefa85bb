//! Record sink keeping only tallies.

use optbench_core::{Firing, Observation, RecordSink, RunKey};
use serde::{Deserialize, Serialize};

/// Counts recorded evaluations per trigger policy.
///
/// A record fired by several policies counts once in `records` and once for
/// each policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountingSink {
    /// Runs started
    pub runs: usize,
    /// Records received
    pub records: usize,
    /// Records fired by `always`
    pub always: usize,
    /// Records fired by `interval`
    pub interval: usize,
    /// Records fired by `improvement`
    pub improvement: usize,
    /// Records fired by `time_points`
    pub time_points: usize,
    /// Records fired by `time_range`
    pub time_range: usize,
    /// Records fired by `at`
    #[serde(default)]
    pub at: usize,
    /// Records fired by `during`
    #[serde(default)]
    pub during: usize,
    /// Records fired by `delta_improvement`
    #[serde(default)]
    pub delta_improvement: usize,
    /// Records fired by the custom policy
    #[serde(default)]
    pub custom: usize,
}

impl CountingSink {
    /// Empty tallies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the tallies of `other`, typically another worker's sink.
    pub fn merge(&mut self, other: &CountingSink) {
        self.runs += other.runs;
        self.records += other.records;
        self.always += other.always;
        self.interval += other.interval;
        self.improvement += other.improvement;
        self.time_points += other.time_points;
        self.time_range += other.time_range;
        self.at += other.at;
        self.during += other.during;
        self.delta_improvement += other.delta_improvement;
        self.custom += other.custom;
    }
}

impl RecordSink for CountingSink {
    fn start_run(&mut self, _key: RunKey) {
        self.runs += 1;
    }

    fn record(&mut self, _key: RunKey, _observation: &Observation, firing: &Firing) {
        self.records += 1;
        self.always += usize::from(firing.always);
        self.interval += usize::from(firing.interval);
        self.improvement += usize::from(firing.improvement);
        self.time_points += usize::from(firing.time_points);
        self.time_range += usize::from(firing.time_range);
        self.at += usize::from(firing.at);
        self.during += usize::from(firing.during);
        self.delta_improvement += usize::from(firing.delta_improvement);
        self.custom += usize::from(firing.custom);
    }
}

impl<'a> std::iter::Sum<&'a CountingSink> for CountingSink {
    fn sum<I: Iterator<Item = &'a CountingSink>>(iter: I) -> Self {
        iter.fold(CountingSink::new(), |mut total, sink| {
            total.merge(sink);
            total
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optbench_core::{OptimizationType, Triggers};

    #[test]
    fn test_counts_per_policy() {
        let triggers = Triggers::builder()
            .interval(10)
            .improvement(true)
            .build()
            .unwrap();
        let mut state = triggers.state(OptimizationType::Minimization);
        let mut sink = CountingSink::new();
        let key = RunKey::new(1, 2, 1, 1);
        sink.start_run(key);

        // strictly decreasing values: every evaluation improves
        for e in 1..=30u64 {
            let value = 100.0 - e as f64;
            let obs = Observation::new(e, value, value, OptimizationType::Minimization);
            let firing = triggers.evaluate(&mut state, &obs).unwrap();
            if firing.any() {
                sink.record(key, &obs, &firing);
            }
        }

        assert_eq!(sink.runs, 1);
        assert_eq!(sink.records, 30);
        assert_eq!(sink.improvement, 30);
        // 1, 10, 20, 30
        assert_eq!(sink.interval, 4);
        assert_eq!(sink.always, 0);
    }

    #[test]
    fn test_counts_explicit_and_windowed_policies() {
        let triggers = Triggers::builder()
            .at(vec![3, 7])
            .during(vec![(5, 7)])
            .build()
            .unwrap();
        let mut state = triggers.state(OptimizationType::Minimization);
        let mut sink = CountingSink::new();
        let key = RunKey::new(1, 2, 1, 1);
        for e in 1..=10u64 {
            let obs = Observation::new(e, 1.0, 1.0, OptimizationType::Minimization);
            let firing = triggers.evaluate(&mut state, &obs).unwrap();
            if firing.any() {
                sink.record(key, &obs, &firing);
            }
        }
        // at: 3, 7; during: 5..=7
        assert_eq!(sink.at, 2);
        assert_eq!(sink.during, 3);
        assert_eq!(sink.records, 4);
    }

    #[test]
    fn test_sum_of_workers() {
        let a = CountingSink {
            runs: 2,
            records: 5,
            improvement: 5,
            ..CountingSink::default()
        };
        let b = CountingSink {
            runs: 1,
            records: 3,
            interval: 3,
            ..CountingSink::default()
        };
        let total: CountingSink = [a, b].iter().sum();
        assert_eq!(total.runs, 3);
        assert_eq!(total.records, 8);
        assert_eq!(total.improvement, 5);
        assert_eq!(total.interval, 3);
    }
}
