//! Empirical cumulative distribution of (evaluations, error) attainments.
//!
//! Every tracked run owns an attainment matrix of shape
//! `(error buckets, evaluation buckets)`. Observing `(evaluations, error)`
//! marks the cell `(error bucket, evaluation bucket)` and every cell that the
//! observation dominates: all larger errors reached with at least as many
//! evaluations. Matrices therefore stay monotone and each cell is written at
//! most once, which keeps the fill amortized linear in the number of buckets
//! over a whole run.
//!
//! Runs are keyed by [`RunKey`] and stored per function in separately locked
//! shards, so producers working on different functions never contend.

use log::{debug, info, warn};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::{BenchError, Result};
use crate::observation::{Observation, OptimizationType};
use crate::range::Range;

/// Identifies one run of one problem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    /// Function number
    pub function: usize,
    /// Search-space dimension
    pub dimension: usize,
    /// Instance id
    pub instance: usize,
    /// Run number, starting at 1
    pub run: usize,
}

impl RunKey {
    /// Key from its four components.
    pub fn new(function: usize, dimension: usize, instance: usize, run: usize) -> Self {
        Self {
            function,
            dimension,
            instance,
            run,
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "f{}-d{}-i{}-r{}",
            self.function, self.dimension, self.instance, self.run
        )
    }
}

/// The two axes of every attainment matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct AttainmentRanges {
    /// Error axis (matrix rows)
    pub error: Range<f64>,
    /// Evaluation axis (matrix columns)
    pub evaluations: Range<u64>,
}

impl AttainmentRanges {
    /// Pair an error range with an evaluation range.
    pub fn new(error: Range<f64>, evaluations: Range<u64>) -> Self {
        Self { error, evaluations }
    }

    /// `(rows, columns)` of the attainment matrices.
    pub fn shape(&self) -> (usize, usize) {
        (self.error.size(), self.evaluations.size())
    }

    fn contains(&self, evaluations: u64, error: f64) -> bool {
        self.evaluations.contains(evaluations) && self.error.contains(error)
    }
}

/// How errors are derived and which way the quadrant fill goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    /// Optimization direction of the tracked problem
    pub direction: OptimizationType,
    /// Optimal transformed value, when known
    pub optimum: Option<f64>,
}

impl Objective {
    /// Minimization without a known optimum.
    pub fn minimize() -> Self {
        Self {
            direction: OptimizationType::Minimization,
            optimum: None,
        }
    }

    /// Maximization without a known optimum.
    pub fn maximize() -> Self {
        Self {
            direction: OptimizationType::Maximization,
            optimum: None,
        }
    }

    /// Set the known optimal value.
    pub fn with_optimum(mut self, optimum: f64) -> Self {
        self.optimum = Some(optimum);
        self
    }

    /// Error of the best-so-far value of `observation`.
    ///
    /// Distance to the optimum when known, the best transformed value itself
    /// otherwise.
    pub fn error(&self, observation: &Observation) -> f64 {
        match self.optimum {
            Some(optimum) => (optimum - observation.best_transformed).abs(),
            None => observation.best_transformed,
        }
    }

    /// Without an optimum, maximization attains every target below its value.
    fn mirrored(&self) -> bool {
        self.direction == OptimizationType::Maximization && self.optimum.is_none()
    }
}

/// Outcome of an observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observed {
    /// The observation was folded into the run's matrix.
    Filled {
        /// Row of the marked cell
        error_bucket: usize,
        /// Column of the marked cell
        evaluation_bucket: usize,
    },
    /// The observation fell outside the ranges and was dropped.
    Discarded {
        /// Evaluation count of the dropped observation
        evaluations: u64,
        /// Error of the dropped observation
        error: f64,
    },
}

impl Observed {
    /// Whether the observation reached the matrix.
    pub fn is_filled(&self) -> bool {
        matches!(self, Observed::Filled { .. })
    }

    /// Turn a discarded observation into [`BenchError::OutOfDomain`].
    pub fn into_result(self) -> Result<(usize, usize)> {
        match self {
            Observed::Filled {
                error_bucket,
                evaluation_bucket,
            } => Ok((error_bucket, evaluation_bucket)),
            Observed::Discarded { evaluations, error } => {
                Err(BenchError::OutOfDomain { evaluations, error })
            }
        }
    }
}

#[derive(Debug)]
struct RunSlot {
    objective: Objective,
    matrix: Option<Array2<bool>>,
    discarded: usize,
}

// dimension -> instance -> run
type Shard = BTreeMap<usize, BTreeMap<usize, BTreeMap<usize, RunSlot>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // every critical section leaves matrices monotone, poisoned data is usable
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mark `(row, col)` and every cell it dominates.
///
/// Rows grow from `row` towards larger errors, or towards smaller values when
/// `mirrored`. A row stops at its first already-marked cell and the next row
/// never goes past that column, since monotonicity guarantees the rest is set.
// Both directions include the attained row itself.
fn fill_quadrant(matrix: &mut Array2<bool>, row: usize, col: usize, mirrored: bool) {
    let (rows, cols) = matrix.dim();
    let span = if mirrored { row + 1 } else { rows - row };
    let mut col_end = cols;
    for k in 0..span {
        let r = if mirrored { row - k } else { row + k };
        if matrix[[r, col]] {
            break;
        }
        for c in col..col_end {
            if matrix[[r, c]] {
                col_end = c;
                break;
            }
            matrix[[r, c]] = true;
        }
    }
}

/// Attainment matrices of every tracked run.
#[derive(Debug)]
pub struct EcdfEngine {
    ranges: AttainmentRanges,
    shards: RwLock<BTreeMap<usize, Arc<Mutex<Shard>>>>,
    discarded: AtomicUsize,
}

impl EcdfEngine {
    /// Engine whose matrices all use `ranges`.
    pub fn new(ranges: AttainmentRanges) -> Self {
        Self {
            ranges,
            shards: RwLock::new(BTreeMap::new()),
            discarded: AtomicUsize::new(0),
        }
    }

    /// Axes shared by every matrix.
    pub fn ranges(&self) -> &AttainmentRanges {
        &self.ranges
    }

    /// Start tracking `key`. Tracking an already tracked key keeps its data.
    ///
    /// The matrix itself is allocated by the first in-domain observation.
    pub fn track(&self, key: RunKey, objective: Objective) {
        if objective.mirrored() {
            info!("run {key}: no known optimum for maximization, tracking raw best values");
        }
        let shard = self.shard_or_insert(key.function);
        let mut shard = lock(&shard);
        let runs = shard
            .entry(key.dimension)
            .or_default()
            .entry(key.instance)
            .or_default();
        if runs.contains_key(&key.run) {
            debug!("run {key}: already tracked");
            return;
        }
        runs.insert(
            key.run,
            RunSlot {
                objective,
                matrix: None,
                discarded: 0,
            },
        );
        debug!("run {key}: tracking ({})", objective.direction);
    }

    /// Whether `key` is tracked.
    pub fn is_tracked(&self, key: RunKey) -> bool {
        self.with_slot(key, |_| Ok(())).is_ok()
    }

    /// Run number for the next run of a (function, dimension, instance)
    /// triple: one more than the number of runs tracked so far.
    pub fn next_run(&self, function: usize, dimension: usize, instance: usize) -> usize {
        let Some(shard) = self.shard(function) else {
            return 1;
        };
        let shard = lock(&shard);
        let tracked = shard
            .get(&dimension)
            .and_then(|instances| instances.get(&instance))
            .map_or(0, BTreeMap::len);
        tracked + 1
    }

    /// Fold `(evaluations, error)` into the matrix of `key`.
    ///
    /// Observations outside the ranges are dropped, counted and reported as
    /// [`Observed::Discarded`]; the run keeps going.
    pub fn observe(&self, key: RunKey, evaluations: u64, error: f64) -> Result<Observed> {
        self.with_slot(key, |slot| Ok(self.fill(key, slot, evaluations, error)))
    }

    /// Fold an [`Observation`], deriving its error from the tracked objective.
    pub fn observe_observation(&self, key: RunKey, observation: &Observation) -> Result<Observed> {
        self.with_slot(key, |slot| {
            let error = slot.objective.error(observation);
            Ok(self.fill(key, slot, observation.evaluations, error))
        })
    }

    /// Copy of the attainment matrix of `key`, if allocated.
    pub fn attainment(&self, key: RunKey) -> Option<Array2<bool>> {
        self.with_slot(key, |slot| Ok(slot.matrix.clone())).ok().flatten()
    }

    /// Tracked run keys in ascending order.
    pub fn tracked_runs(&self) -> Vec<RunKey> {
        let mut keys = Vec::new();
        for (function, shard) in self.snapshot() {
            let shard = lock(&shard);
            for (&dimension, instances) in shard.iter() {
                for (&instance, runs) in instances {
                    keys.extend(
                        runs.keys()
                            .map(|&run| RunKey::new(function, dimension, instance, run)),
                    );
                }
            }
        }
        keys
    }

    /// Number of allocated matrices.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.for_each_matrix(|_| count += 1);
        count
    }

    /// Whether no run has an allocated matrix yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of observations dropped for falling outside the ranges.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Number of runs that attained each cell.
    pub fn histogram(&self) -> Result<Array2<u64>> {
        self.aggregate().map(|(histogram, _)| histogram)
    }

    /// Fraction of runs that attained each cell, in `[0, 1]`.
    pub fn distribution(&self) -> Result<Array2<f64>> {
        let (histogram, runs) = self.aggregate()?;
        let runs = runs as f64;
        Ok(histogram.mapv(|count| count as f64 / runs))
    }

    /// Area under the distribution, each cell weighted by the relative widths
    /// of its buckets. In `[0, 1]`.
    pub fn volume_under_curve(&self) -> Result<f64> {
        let distribution = self.distribution()?;
        let error_widths = (0..self.ranges.error.size())
            .map(|b| self.ranges.error.relative_width(b))
            .collect::<Result<Vec<f64>>>()?;
        let evaluation_widths = (0..self.ranges.evaluations.size())
            .map(|b| self.ranges.evaluations.relative_width(b))
            .collect::<Result<Vec<f64>>>()?;
        let volume = distribution
            .indexed_iter()
            .map(|((i, j), &p)| p * error_widths[i] * evaluation_widths[j])
            .sum();
        Ok(volume)
    }

    /// Total number of attained cells over all runs.
    pub fn sum(&self) -> Result<u64> {
        self.histogram().map(|histogram| histogram.sum())
    }

    /// Drop every tracked run and reset the discard counter.
    pub fn clear(&self) {
        self.shards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.discarded.store(0, Ordering::Relaxed);
    }

    fn fill(&self, key: RunKey, slot: &mut RunSlot, evaluations: u64, error: f64) -> Observed {
        if !self.ranges.contains(evaluations, error) {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            slot.discarded += 1;
            // warn once per run, the rest would flood the log
            if slot.discarded == 1 {
                warn!(
                    "run {key}: discarding observation (evaluations = {evaluations}, error = {error}) \
                     outside evaluations [{}, {}] x error [{}, {}]",
                    self.ranges.evaluations.min(),
                    self.ranges.evaluations.max(),
                    self.ranges.error.min(),
                    self.ranges.error.max(),
                );
            } else {
                debug!(
                    "run {key}: discarding observation (evaluations = {evaluations}, error = {error})"
                );
            }
            return Observed::Discarded { evaluations, error };
        }
        let row = self.ranges.error.index(error);
        let col = self.ranges.evaluations.index(evaluations);
        let shape = self.ranges.shape();
        let matrix = slot
            .matrix
            .get_or_insert_with(|| Array2::from_elem(shape, false));
        fill_quadrant(matrix, row, col, slot.objective.mirrored());
        Observed::Filled {
            error_bucket: row,
            evaluation_bucket: col,
        }
    }

    fn shard(&self, function: usize) -> Option<Arc<Mutex<Shard>>> {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&function)
            .map(Arc::clone)
    }

    fn shard_or_insert(&self, function: usize) -> Arc<Mutex<Shard>> {
        if let Some(shard) = self.shard(function) {
            return shard;
        }
        let mut shards = self.shards.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(shards.entry(function).or_default())
    }

    fn snapshot(&self) -> Vec<(usize, Arc<Mutex<Shard>>)> {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(&function, shard)| (function, Arc::clone(shard)))
            .collect()
    }

    fn with_slot<R>(&self, key: RunKey, f: impl FnOnce(&mut RunSlot) -> Result<R>) -> Result<R> {
        let shard = self.shard(key.function).ok_or(BenchError::UntrackedRun { key })?;
        let mut shard = lock(&shard);
        let slot = shard
            .get_mut(&key.dimension)
            .and_then(|instances| instances.get_mut(&key.instance))
            .and_then(|runs| runs.get_mut(&key.run))
            .ok_or(BenchError::UntrackedRun { key })?;
        f(slot)
    }

    fn for_each_matrix(&self, mut f: impl FnMut(&Array2<bool>)) {
        for (_, shard) in self.snapshot() {
            let shard = lock(&shard);
            shard
                .values()
                .flat_map(BTreeMap::values)
                .flat_map(BTreeMap::values)
                .filter_map(|slot| slot.matrix.as_ref())
                .for_each(&mut f);
        }
    }

    fn aggregate(&self) -> Result<(Array2<u64>, usize)> {
        let mut histogram: Option<Array2<u64>> = None;
        let mut runs = 0;
        self.for_each_matrix(|matrix| {
            let histogram = histogram.get_or_insert_with(|| Array2::zeros(matrix.dim()));
            Zip::from(histogram)
                .and(matrix)
                .for_each(|count, &attained| *count += u64::from(attained));
            runs += 1;
        });
        histogram
            .map(|histogram| (histogram, runs))
            .ok_or(BenchError::NoAttainmentData)
    }
}
