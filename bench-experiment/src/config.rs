//! Experiment configuration, loaded from TOML or JSON files.
//!
//! ```toml
//! [suite]
//! name = "smoke"
//! functions = ["sphere", "rastrigin"]
//! dimensions = [2, 5]
//! instances = [1, 2, 3]
//!
//! [triggers]
//! interval = 100
//! improvement = true
//!
//! [ecdf.error]
//! min = 0.0
//! max = 1e8
//! buckets = 40
//! scale = "log10"
//!
//! [ecdf.evaluations]
//! min = 1
//! max = 1000
//! buckets = 30
//! scale = "log10"
//!
//! [experiment]
//! runs = 5
//! budget = 1000
//! solver = "one-plus-one"
//! ```

use log::warn;
use optbench_core::{
    AttainmentRanges, AxisKind, ExhaustionPolicy, RangeConfig, Scale, Suite, TriggerConfig,
};
use optbench_problems::ProblemKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ExperimentError, Result};
use crate::solver::SolverKind;

/// Suite axes and filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteSection {
    /// Suite name
    pub name: String,
    /// Function names, numbered from 1 in this order
    pub functions: Vec<String>,
    /// Search-space dimensions
    pub dimensions: Vec<usize>,
    /// Instance ids (empty uses `default_instances`)
    pub instances: Vec<usize>,
    /// Instances used when `instances` is empty
    pub default_instances: Vec<usize>,
    /// 1-based function positions to keep (empty keeps all)
    pub function_filter: Vec<usize>,
    /// Dimension values to keep (empty keeps all)
    pub dimension_filter: Vec<usize>,
    /// 1-based instance positions to keep (empty keeps all)
    pub instance_filter: Vec<usize>,
    /// Behaviour after the last problem
    pub exhaustion: ExhaustionPolicy,
}

impl Default for SuiteSection {
    fn default() -> Self {
        Self {
            name: "optbench".to_string(),
            functions: ProblemKind::ALL
                .iter()
                .map(|kind| kind.name().to_string())
                .collect(),
            dimensions: vec![2, 5, 10],
            instances: Vec::new(),
            default_instances: (1..=5).collect(),
            function_filter: Vec::new(),
            dimension_filter: Vec::new(),
            instance_filter: Vec::new(),
            exhaustion: ExhaustionPolicy::default(),
        }
    }
}

impl SuiteSection {
    /// Build the filtered suite. Every function name must be a known problem.
    pub fn build(&self) -> Result<Suite> {
        for name in &self.functions {
            name.parse::<ProblemKind>()?;
        }
        let mut suite = Suite::build(
            self.name.clone(),
            self.functions.iter().cloned(),
            self.dimensions.clone(),
            self.instances.clone(),
            &self.default_instances,
        )?
        .with_exhaustion_policy(self.exhaustion);
        if !self.function_filter.is_empty() {
            suite.filter(AxisKind::Function, &self.function_filter)?;
        }
        if !self.dimension_filter.is_empty() {
            suite.filter_dimensions(&self.dimension_filter)?;
        }
        if !self.instance_filter.is_empty() {
            suite.filter(AxisKind::Instance, &self.instance_filter)?;
        }
        Ok(suite)
    }
}

/// Error and evaluation axes of the attainment matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcdfSection {
    /// Error axis
    pub error: RangeConfig<f64>,
    /// Evaluation axis
    pub evaluations: RangeConfig<u64>,
}

impl Default for EcdfSection {
    fn default() -> Self {
        Self {
            error: RangeConfig {
                min: 0.0,
                max: 1e8,
                buckets: 40,
                scale: Scale::Log10,
            },
            evaluations: RangeConfig {
                min: 1,
                max: 1000,
                buckets: 30,
                scale: Scale::Log10,
            },
        }
    }
}

impl EcdfSection {
    /// Validate both ranges.
    pub fn build(&self) -> Result<AttainmentRanges> {
        Ok(AttainmentRanges::new(
            self.error.build()?,
            self.evaluations.build()?,
        ))
    }
}

/// Run count, budget and solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// Independent runs per problem
    pub runs: usize,
    /// Evaluations per run
    pub budget: u64,
    /// Base seed of the solvers
    pub seed: u64,
    /// Solver under test
    pub solver: SolverKind,
    /// Spread problems over worker threads
    pub parallel: bool,
    /// Worker threads (unset uses rayon's default)
    pub threads: Option<usize>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            runs: 5,
            budget: 1000,
            seed: 42,
            solver: SolverKind::default(),
            parallel: true,
            threads: None,
        }
    }
}

/// Complete experiment configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Problems to run
    pub suite: SuiteSection,
    /// Recording policies
    pub triggers: TriggerConfig,
    /// Attainment axes
    pub ecdf: EcdfSection,
    /// Run settings
    pub experiment: RunSection,
}

impl ExperimentConfig {
    /// Check settings that no builder validates.
    pub fn validate(&self) -> Result<()> {
        if self.experiment.runs == 0 {
            return Err(ExperimentError::InvalidSetting {
                name: "runs",
                reason: "must be positive".to_string(),
            });
        }
        if self.experiment.budget == 0 {
            return Err(ExperimentError::InvalidSetting {
                name: "budget",
                reason: "must be positive".to_string(),
            });
        }
        if self.experiment.threads == Some(0) {
            return Err(ExperimentError::InvalidSetting {
                name: "threads",
                reason: "must be positive when set".to_string(),
            });
        }
        if let Some(message) = self.budget_warning() {
            warn!("{message}");
        }
        Ok(())
    }

    fn budget_warning(&self) -> Option<String> {
        let (axis_end, budget) = (self.ecdf.evaluations.max, self.experiment.budget);
        (axis_end < budget).then(|| {
            format!(
                "evaluation axis ends at {axis_end} but the budget is {budget}: \
                 observations past {axis_end} evaluations are discarded as out of range"
            )
        })
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }
}

/// Load and validate a configuration file.
///
/// Format is auto-detected from file extension (.json or .toml)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| ExperimentError::UnsupportedFormat(path.display().to_string()))?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

/// Parse and validate a configuration string.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ExperimentConfig> {
    let config: ExperimentConfig = match format {
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ExperimentError::Parse(e.to_string()))?
        }
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ExperimentError::Parse(e.to_string()))?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Serialize a configuration.
pub fn serialize_config(config: &ExperimentConfig, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| ExperimentError::Serialize(e.to_string())),
        ConfigFormat::Toml => {
            toml::to_string_pretty(config).map_err(|e| ExperimentError::Serialize(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMOKE: &str = r#"
[suite]
name = "smoke"
functions = ["sphere", "rastrigin", "ackley"]
dimensions = [2, 5]
instances = [1, 2, 3]
function_filter = [1, 3]

[triggers]
interval = 100
time_points = []

[ecdf.error]
min = 0.0
max = 1e6
buckets = 20
scale = "log10"

[experiment]
runs = 3
budget = 200
solver = "random-search"
parallel = false
"#;

    #[test]
    fn test_parse_toml() {
        let config = parse_config(SMOKE, ConfigFormat::Toml).unwrap();
        assert_eq!(config.suite.name, "smoke");
        assert_eq!(config.triggers.interval, 100);
        assert!(config.triggers.improvement);
        assert!(config.triggers.time_points.is_empty());
        assert_eq!(config.ecdf.error.buckets, 20);
        // untouched sections keep their defaults
        assert_eq!(config.ecdf.evaluations, EcdfSection::default().evaluations);
        assert_eq!(config.experiment.solver, SolverKind::RandomSearch);
        assert_eq!(config.experiment.seed, 42);

        let suite = config.suite.build().unwrap();
        assert_eq!(suite.problem_count(), 18);
        assert_eq!(suite.included_count(), 12);
        assert_eq!(suite.function_name(1), None);
    }

    #[test]
    fn test_defaults_build() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        let suite = config.suite.build().unwrap();
        assert_eq!(suite.axis_len(AxisKind::Function), ProblemKind::ALL.len());
        assert_eq!(suite.axis_len(AxisKind::Instance), 5);
        assert_eq!(config.ecdf.build().unwrap().shape(), (40, 30));
        config.triggers.build().unwrap();
    }

    #[test]
    fn test_unknown_function_is_rejected() {
        let section = SuiteSection {
            functions: vec!["sphere".into(), "schwefel".into()],
            ..SuiteSection::default()
        };
        let err = section.build().unwrap_err();
        assert!(matches!(err, ExperimentError::Problem(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = ExperimentConfig::default();
        config.experiment.runs = 0;
        assert!(matches!(
            config.validate(),
            Err(ExperimentError::InvalidSetting { name: "runs", .. })
        ));

        let broken = "[ecdf.error]\nmin = 5.0\nmax = 1.0\nbuckets = 4\n";
        let config = parse_config(broken, ConfigFormat::Toml).unwrap();
        assert!(config.ecdf.build().unwrap_err().is_config_error());

        assert!(matches!(
            parse_config("[experiment]\nruns = \"many\"\n", ConfigFormat::Toml),
            Err(ExperimentError::Parse(_))
        ));
    }

    #[test]
    fn test_budget_past_evaluation_axis_is_discarded() {
        let mut config = parse_config(SMOKE, ConfigFormat::Toml).unwrap();
        config.ecdf.evaluations.max = 10;
        config.ecdf.evaluations.buckets = 5;
        config.experiment.budget = 30;
        config.experiment.runs = 1;
        config.suite.functions = vec!["sphere".into()];
        config.suite.dimensions = vec![2];
        config.suite.instances = vec![1];
        config.suite.function_filter = Vec::new();

        // still a valid configuration, only flagged
        config.validate().unwrap();
        let message = config.budget_warning().unwrap();
        assert!(message.contains("discarded"), "{message}");

        let mut experiment = crate::experiment::Experiment::from_config(&config).unwrap();
        let summary = experiment
            .run(&mut crate::sink::CountingSink::new())
            .unwrap();
        assert_eq!(summary.evaluations, 30);
        // evaluations 11..=30 fall past the axis
        assert_eq!(experiment.engine().discarded(), 20);

        config.experiment.budget = 10;
        assert_eq!(config.budget_warning(), None);
    }

    #[test]
    fn test_json_round_trip() {
        let config = parse_config(SMOKE, ConfigFormat::Toml).unwrap();
        let json = serialize_config(&config, ConfigFormat::Json).unwrap();
        assert_eq!(parse_config(&json, ConfigFormat::Json).unwrap(), config);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path("a/b.TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path("run.json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path("run.yaml"), None);
        assert!(matches!(
            load_config("run.yaml"),
            Err(ExperimentError::UnsupportedFormat(_))
        ));
    }
}
