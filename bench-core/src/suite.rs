//! Deterministic enumeration of (function, dimension, instance) problems.
//!
//! A [`Suite`] is the Cartesian product of three axes. Functions are numbered
//! `1..=count` in registration order, dimensions and instances keep the values
//! given by the caller. Each axis carries an inclusion mask set by filters
//! before iteration starts.
//!
//! Every coordinate of the product has a linear index
//! `instance + function * |instances| + dimension * |instances| * |functions|`
//! that ignores filtering, so workers can split `[0, problem_count())` into
//! disjoint sub-ranges and [`decode`](Suite::decode) their share.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BenchError, Result};

/// One of the three suite axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    /// Benchmark functions
    Function,
    /// Search-space dimensions
    Dimension,
    /// Problem instances
    Instance,
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Function => write!(f, "function"),
            AxisKind::Dimension => write!(f, "dimension"),
            AxisKind::Instance => write!(f, "instance"),
        }
    }
}

/// What the enumerator does once every coordinate has been produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Report exhaustion once, then start a new pass on the next call.
    #[default]
    Restart,
    /// Stay exhausted until [`Suite::restart`] is called.
    Halt,
}

/// 0-based position of a problem on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProblemCoordinate {
    /// Index on the function axis
    pub function: usize,
    /// Index on the dimension axis
    pub dimension: usize,
    /// Index on the instance axis
    pub instance: usize,
}

impl ProblemCoordinate {
    /// Coordinate from its three axis indices.
    pub fn new(function: usize, dimension: usize, instance: usize) -> Self {
        Self {
            function,
            dimension,
            instance,
        }
    }
}

/// A resolved coordinate: the values a problem factory needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSpec {
    /// Linear problem index
    pub index: usize,
    /// Axis indices
    pub coordinate: ProblemCoordinate,
    /// Function number, starting at 1
    pub function: usize,
    /// Function name
    pub name: String,
    /// Search-space dimension
    pub dimension: usize,
    /// Instance id
    pub instance: usize,
}

#[derive(Debug, Clone)]
struct Axis {
    kind: AxisKind,
    values: Vec<usize>,
    included: Vec<bool>,
}

impl Axis {
    fn new(kind: AxisKind, values: Vec<usize>) -> Result<Self> {
        if values.is_empty() {
            return Err(BenchError::EmptyAxis { axis: kind });
        }
        let included = vec![true; values.len()];
        Ok(Self {
            kind,
            values,
            included,
        })
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn is_included(&self, index: usize) -> bool {
        self.included.get(index).copied().unwrap_or(false)
    }

    /// First included index at or after `start`.
    fn next_included(&self, start: usize) -> Option<usize> {
        (start..self.len()).find(|&i| self.included[i])
    }

    fn position_of(&self, value: usize) -> Option<usize> {
        self.values.iter().position(|&v| v == value)
    }

    /// Keep only the 1-based `positions` among the currently included entries.
    fn restrict(&mut self, positions: &[usize]) -> Result<()> {
        let len = self.len();
        if let Some(&position) = positions.iter().find(|&&p| p == 0 || p > len) {
            return Err(BenchError::FilterPositionOutOfRange {
                axis: self.kind,
                position,
                len,
            });
        }
        let mask: Vec<bool> = (0..len)
            .map(|i| self.included[i] && positions.contains(&(i + 1)))
            .collect();
        if !mask.contains(&true) {
            return Err(BenchError::FilteredOutAxis { axis: self.kind });
        }
        self.included = mask;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    function: usize,
    dimension: usize,
    // None until the first coordinate is produced
    instance: Option<usize>,
}

/// Enumerator over the problems of a benchmark suite.
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    function_names: Vec<String>,
    functions: Axis,
    dimensions: Axis,
    instances: Axis,
    cursor: Cursor,
    policy: ExhaustionPolicy,
    started: bool,
    exhausted: bool,
}

impl Suite {
    /// Build a suite over `functions` (numbered `1..=functions.len()`),
    /// `dimensions` and `instances`.
    ///
    /// An empty `instances` list falls back to `default_instances`.
    pub fn build<S: Into<String>>(
        name: impl Into<String>,
        functions: impl IntoIterator<Item = S>,
        dimensions: Vec<usize>,
        instances: Vec<usize>,
        default_instances: &[usize],
    ) -> Result<Self> {
        let function_names: Vec<String> = functions.into_iter().map(Into::into).collect();
        let numbers = (1..=function_names.len()).collect();
        let instances = if instances.is_empty() {
            default_instances.to_vec()
        } else {
            instances
        };
        let mut suite = Self {
            name: name.into(),
            function_names,
            functions: Axis::new(AxisKind::Function, numbers)?,
            dimensions: Axis::new(AxisKind::Dimension, dimensions)?,
            instances: Axis::new(AxisKind::Instance, instances)?,
            cursor: Cursor {
                function: 0,
                dimension: 0,
                instance: None,
            },
            policy: ExhaustionPolicy::default(),
            started: false,
            exhausted: false,
        };
        suite.rewind();
        Ok(suite)
    }

    /// Set what happens once every coordinate has been produced.
    pub fn with_exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Suite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries on an axis, ignoring filters.
    pub fn axis_len(&self, axis: AxisKind) -> usize {
        self.axis(axis).len()
    }

    /// Number of coordinates in the unfiltered product.
    pub fn problem_count(&self) -> usize {
        self.functions.len() * self.dimensions.len() * self.instances.len()
    }

    /// Number of coordinates that survive filtering.
    pub fn included_count(&self) -> usize {
        let count = |axis: &Axis| axis.included.iter().filter(|&&b| b).count();
        count(&self.functions) * count(&self.dimensions) * count(&self.instances)
    }

    /// Keep only the entries at the 1-based `positions` of `axis`.
    ///
    /// Filters compose: an entry excluded earlier stays excluded.
    pub fn filter(&mut self, axis: AxisKind, positions: &[usize]) -> Result<()> {
        if self.started {
            return Err(BenchError::SuiteAlreadyStarted);
        }
        self.axis_mut(axis).restrict(positions)?;
        self.rewind();
        Ok(())
    }

    /// Keep only the given dimension values.
    pub fn filter_dimensions(&mut self, values: &[usize]) -> Result<()> {
        let positions = values
            .iter()
            .map(|&value| {
                self.dimensions
                    .position_of(value)
                    .map(|i| i + 1)
                    .ok_or(BenchError::UnknownDimension { value })
            })
            .collect::<Result<Vec<_>>>()?;
        self.filter(AxisKind::Dimension, &positions)
    }

    /// Linear index of a coordinate, ignoring filters.
    pub fn linear_index(&self, coordinate: ProblemCoordinate) -> Result<usize> {
        let checks = [
            (coordinate.function, self.functions.len()),
            (coordinate.dimension, self.dimensions.len()),
            (coordinate.instance, self.instances.len()),
        ];
        if let Some(&(index, count)) = checks.iter().find(|(index, count)| index >= count) {
            return Err(BenchError::IndexOutOfBounds { index, count });
        }
        let (n_inst, n_func) = (self.instances.len(), self.functions.len());
        Ok(coordinate.instance
            + coordinate.function * n_inst
            + coordinate.dimension * n_inst * n_func)
    }

    /// Inverse of [`linear_index`](Self::linear_index).
    pub fn decode(&self, index: usize) -> Result<ProblemCoordinate> {
        let count = self.problem_count();
        if index >= count {
            return Err(BenchError::IndexOutOfBounds { index, count });
        }
        let (n_inst, n_func) = (self.instances.len(), self.functions.len());
        Ok(ProblemCoordinate {
            instance: index % n_inst,
            function: (index / n_inst) % n_func,
            dimension: index / (n_inst * n_func),
        })
    }

    /// Whether all three components of `coordinate` are included.
    pub fn is_included(&self, coordinate: ProblemCoordinate) -> bool {
        self.functions.is_included(coordinate.function)
            && self.dimensions.is_included(coordinate.dimension)
            && self.instances.is_included(coordinate.instance)
    }

    /// Function number at `index`, `None` if excluded or out of range.
    pub fn function_number(&self, index: usize) -> Option<usize> {
        self.value(AxisKind::Function, index)
    }

    /// Function name at `index`, `None` if excluded or out of range.
    pub fn function_name(&self, index: usize) -> Option<&str> {
        self.functions
            .is_included(index)
            .then(|| self.function_names[index].as_str())
    }

    /// Dimension at `index`, `None` if excluded or out of range.
    pub fn dimension(&self, index: usize) -> Option<usize> {
        self.value(AxisKind::Dimension, index)
    }

    /// Instance id at `index`, `None` if excluded or out of range.
    pub fn instance(&self, index: usize) -> Option<usize> {
        self.value(AxisKind::Instance, index)
    }

    /// Resolve a coordinate, `None` if any component is excluded.
    pub fn resolve(&self, coordinate: ProblemCoordinate) -> Option<ProblemSpec> {
        if !self.is_included(coordinate) {
            return None;
        }
        let index = self.linear_index(coordinate).ok()?;
        Some(ProblemSpec {
            index,
            coordinate,
            function: self.functions.values[coordinate.function],
            name: self.function_names[coordinate.function].clone(),
            dimension: self.dimensions.values[coordinate.dimension],
            instance: self.instances.values[coordinate.instance],
        })
    }

    /// Resolve by function number, dimension value and instance id.
    pub fn find(&self, function: usize, dimension: usize, instance: usize) -> Option<ProblemSpec> {
        let coordinate = ProblemCoordinate {
            function: self.functions.position_of(function)?,
            dimension: self.dimensions.position_of(dimension)?,
            instance: self.instances.position_of(instance)?,
        };
        self.resolve(coordinate)
    }

    /// Next included coordinate, or `None` once the suite is exhausted.
    ///
    /// Instances advance fastest, then functions, then dimensions. What
    /// follows exhaustion depends on the [`ExhaustionPolicy`].
    pub fn advance(&mut self) -> Option<ProblemCoordinate> {
        if self.exhausted {
            match self.policy {
                ExhaustionPolicy::Halt => return None,
                ExhaustionPolicy::Restart => self.rewind(),
            }
        }
        self.started = true;
        let previous = self.cursor;
        match self.step() {
            Some(coordinate) => {
                self.log_progress(previous, coordinate);
                Some(coordinate)
            }
            None => {
                self.exhausted = true;
                info!("suite {}: all problems enumerated", self.name);
                None
            }
        }
    }

    /// Start a new pass from the first included coordinate.
    ///
    /// Filters stay frozen if iteration had already started.
    pub fn restart(&mut self) {
        self.rewind();
    }

    /// Whether the last [`advance`](Self::advance) reported exhaustion.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether [`advance`](Self::advance) has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Current coordinate, `None` before the first advance or once exhausted.
    pub fn current(&self) -> Option<ProblemCoordinate> {
        if self.exhausted {
            return None;
        }
        self.cursor.instance.map(|instance| ProblemCoordinate {
            function: self.cursor.function,
            dimension: self.cursor.dimension,
            instance,
        })
    }

    /// Included coordinates in enumeration order. Leaves the cursor untouched.
    pub fn coordinates(&self) -> impl Iterator<Item = ProblemCoordinate> + '_ {
        (0..self.problem_count())
            .filter_map(|index| self.decode(index).ok())
            .filter(|&coordinate| self.is_included(coordinate))
    }

    /// Split `[0, problem_count())` into at most `workers` contiguous,
    /// disjoint, non-empty linear-index ranges.
    pub fn partition(&self, workers: usize) -> Vec<std::ops::Range<usize>> {
        let count = self.problem_count();
        let workers = workers.clamp(1, count);
        let (chunk, remainder) = (count / workers, count % workers);
        let mut start = 0;
        (0..workers)
            .map(|w| {
                let end = start + chunk + usize::from(w < remainder);
                let range = start..end;
                start = end;
                range
            })
            .collect()
    }

    fn axis(&self, axis: AxisKind) -> &Axis {
        match axis {
            AxisKind::Function => &self.functions,
            AxisKind::Dimension => &self.dimensions,
            AxisKind::Instance => &self.instances,
        }
    }

    fn axis_mut(&mut self, axis: AxisKind) -> &mut Axis {
        match axis {
            AxisKind::Function => &mut self.functions,
            AxisKind::Dimension => &mut self.dimensions,
            AxisKind::Instance => &mut self.instances,
        }
    }

    fn value(&self, axis: AxisKind, index: usize) -> Option<usize> {
        let axis = self.axis(axis);
        axis.is_included(index).then(|| axis.values[index])
    }

    fn rewind(&mut self) {
        // filters guarantee at least one included entry per axis
        self.cursor = Cursor {
            function: self.functions.next_included(0).unwrap_or(0),
            dimension: self.dimensions.next_included(0).unwrap_or(0),
            instance: None,
        };
        self.exhausted = false;
    }

    fn step(&mut self) -> Option<ProblemCoordinate> {
        let start = self.cursor.instance.map_or(0, |i| i + 1);
        if let Some(instance) = self.instances.next_included(start) {
            self.cursor.instance = Some(instance);
            return self.current();
        }
        let first_instance = self.instances.next_included(0)?;
        if let Some(function) = self.functions.next_included(self.cursor.function + 1) {
            self.cursor.function = function;
            self.cursor.instance = Some(first_instance);
            return self.current();
        }
        let first_function = self.functions.next_included(0)?;
        let dimension = self.dimensions.next_included(self.cursor.dimension + 1)?;
        self.cursor = Cursor {
            function: first_function,
            dimension,
            instance: Some(first_instance),
        };
        self.current()
    }

    fn log_progress(&self, previous: Cursor, coordinate: ProblemCoordinate) {
        let fresh = previous.instance.is_none();
        if fresh || previous.dimension != coordinate.dimension {
            info!(
                "suite {}: dimension {}",
                self.name, self.dimensions.values[coordinate.dimension]
            );
        }
        if fresh
            || previous.function != coordinate.function
            || previous.dimension != coordinate.dimension
        {
            info!(
                "suite {}: function {} ({})",
                self.name,
                self.functions.values[coordinate.function],
                self.function_names[coordinate.function]
            );
        }
    }
}
