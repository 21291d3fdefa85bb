//! Serializable outcome of an experiment.

use optbench_core::{EcdfEngine, Range};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExperimentError, Result};
use crate::experiment::{Experiment, ExperimentSummary};
use crate::sink::CountingSink;

/// Lower and upper bound of every bucket of an axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisReport {
    /// Bucket scale
    pub scale: String,
    /// `(lower, upper)` per bucket
    pub buckets: Vec<(f64, f64)>,
}

impl AxisReport {
    fn from_range<T: Copy + PartialOrd + ToPrimitive>(range: &Range<T>) -> Result<Self> {
        let buckets = (0..range.size())
            .map(|b| range.bounds(b))
            .collect::<optbench_core::Result<Vec<_>>>()?;
        Ok(Self {
            scale: format!("{:?}", range.scale()).to_lowercase(),
            buckets,
        })
    }
}

/// Experiment report, written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Suite name
    pub suite: String,
    /// Solver under test
    pub solver: String,
    /// Totals
    pub summary: ExperimentSummary,
    /// Records per trigger policy
    pub records: CountingSink,
    /// Observations outside the attainment ranges
    pub discarded: usize,
    /// Error axis, rows of the matrices
    pub error_axis: AxisReport,
    /// Evaluation axis, columns of the matrices
    pub evaluation_axis: AxisReport,
    /// Runs that attained each cell
    pub histogram: Vec<Vec<u64>>,
    /// Fraction of runs that attained each cell
    pub distribution: Vec<Vec<f64>>,
    /// Weighted area under the distribution
    pub volume_under_curve: f64,
}

impl Report {
    /// Collect the report of a finished experiment.
    pub fn new(
        experiment: &Experiment,
        summary: ExperimentSummary,
        records: CountingSink,
    ) -> Result<Self> {
        let engine: &EcdfEngine = experiment.engine();
        let histogram = engine.histogram()?;
        let distribution = engine.distribution()?;
        Ok(Self {
            suite: experiment.suite().name().to_string(),
            solver: experiment.solver_kind().to_string(),
            summary,
            records,
            discarded: engine.discarded(),
            error_axis: AxisReport::from_range(&engine.ranges().error)?,
            evaluation_axis: AxisReport::from_range(&engine.ranges().evaluations)?,
            histogram: histogram.outer_iter().map(|row| row.to_vec()).collect(),
            distribution: distribution.outer_iter().map(|row| row.to_vec()).collect(),
            volume_under_curve: engine.volume_under_curve()?,
        })
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ExperimentError::Serialize(e.to_string()))
    }

    /// Save to JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| ExperimentError::Parse(e.to_string()))
    }

    /// Print summary to stdout
    pub fn print_summary(&self) {
        println!("suite:        {}", self.suite);
        println!("solver:       {}", self.solver);
        println!(
            "problems:     {} ({} runs, {} evaluations)",
            self.summary.problems, self.summary.runs, self.summary.evaluations
        );
        println!(
            "records:      {} (improvement {}, interval {}, time points {}, time range {}, always {})",
            self.records.records,
            self.records.improvement,
            self.records.interval,
            self.records.time_points,
            self.records.time_range,
            self.records.always
        );
        println!(
            "              (at {}, during {}, delta improvement {}, custom {})",
            self.records.at,
            self.records.during,
            self.records.delta_improvement,
            self.records.custom
        );
        println!("discarded:    {}", self.discarded);
        println!("volume:       {:.4}", self.volume_under_curve);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use optbench_core::{AttainmentRanges, Suite, TriggerConfig};

    fn finished() -> Report {
        let suite = Suite::build("report", ["sphere"], vec![2], vec![1, 2], &[1]).unwrap();
        let ranges = AttainmentRanges::new(
            Range::log10(0.0, 1e4, 8).unwrap(),
            Range::linear(1, 50, 5).unwrap(),
        );
        let triggers = TriggerConfig::default().build().unwrap();
        let mut experiment = Experiment::new(suite, triggers, ranges).runs(3).budget(50);
        let mut counts = CountingSink::new();
        let summary = experiment.run(&mut counts).unwrap();
        Report::new(&experiment, summary, counts).unwrap()
    }

    #[test]
    fn test_report_shape() {
        let report = finished();
        assert_eq!(report.suite, "report");
        assert_eq!(report.solver, "one-plus-one");
        assert_eq!(report.summary.runs, 6);
        assert_eq!(report.records.runs, 6);
        assert_eq!(report.error_axis.scale, "log10");
        assert_eq!(report.error_axis.buckets.len(), 8);
        assert_eq!(report.evaluation_axis.buckets.len(), 5);
        assert_eq!(report.histogram.len(), 8);
        assert!(report.histogram.iter().all(|row| row.len() == 5));
        assert!(report.histogram.iter().flatten().all(|&count| count <= 6));
        assert!(report.volume_under_curve > 0.0 && report.volume_under_curve <= 1.0);
        let (lower, upper) = report.evaluation_axis.buckets[4];
        assert!(lower < upper);
        assert_relative_eq!(upper, 50.0);
    }

    #[test]
    fn test_json_file_round_trip() {
        let report = finished();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save_json(&path).unwrap();
        let loaded = Report::load_json(&path).unwrap();
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.histogram, report.histogram);
        assert_relative_eq!(loaded.volume_under_curve, report.volume_under_curve);
    }
}
