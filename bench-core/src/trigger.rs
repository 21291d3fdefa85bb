//! Sampling policies deciding which evaluations are worth recording.
//!
//! Policies are immutable once built; everything that changes while a problem
//! is being evaluated lives in a [`TriggerState`] owned by whoever tracks that
//! problem. [`Triggers`] combines the enabled policies and returns one
//! [`Firing`] decision per evaluation.
//!
//! # Example
//!
//! ```rust
//! use optbench_core::{Observation, OptimizationType, Triggers};
//!
//! let triggers = Triggers::builder().interval(2).build().unwrap();
//! let mut state = triggers.state(OptimizationType::Minimization);
//!
//! let fired: Vec<u64> = (1..=6)
//!     .filter(|&e| {
//!         let obs = Observation::new(e, 1.0, 1.0, OptimizationType::Minimization);
//!         triggers.evaluate(&mut state, &obs).unwrap().interval
//!     })
//!     .collect();
//! assert_eq!(fired, vec![1, 2, 4, 6]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{BenchError, Result};
use crate::observation::{Observation, OptimizationType};

/// A predicate over the evaluation stream of one problem.
pub trait Trigger: fmt::Debug {
    /// Short policy name.
    fn name(&self) -> &'static str;

    /// Whether `observation` should be recorded. May update `state`.
    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool>;
}

/// A policy shared between tracked problems and combinators.
pub type SharedTrigger = Arc<dyn Trigger + Send + Sync>;

impl<T: Trigger + ?Sized> Trigger for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        (**self).should_fire(state, observation)
    }
}

fn ensure_started(observation: &Observation) -> Result<()> {
    if observation.evaluations == 0 {
        return Err(BenchError::ZeroEvaluations);
    }
    Ok(())
}

/// Fires on every evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Trigger for Always {
    fn name(&self) -> &'static str {
        "always"
    }

    fn should_fire(&self, _state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        Ok(true)
    }
}

/// Fires on the first evaluation and on every multiple of `every`.
///
/// `every == 0` never fires.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    every: u64,
}

impl Interval {
    /// Interval policy firing every `every` evaluations.
    pub fn new(every: u64) -> Self {
        Self { every }
    }
}

impl Trigger for Interval {
    fn name(&self) -> &'static str {
        "interval"
    }

    fn should_fire(&self, _state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        let e = observation.evaluations;
        Ok(self.every != 0 && (e == 1 || e % self.every == 0))
    }
}

/// Fires when the transformed value strictly improves on the best seen so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct Improvement;

impl Trigger for Improvement {
    fn name(&self) -> &'static str {
        "improvement"
    }

    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        if state.direction.is_better(observation.transformed, state.best_fitness) {
            state.best_fitness = observation.transformed;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Fires on the schedule `point * base^k` for every seed point and `k >= 0`.
///
/// Only an evaluation equal to the next scheduled value fires. Scheduled
/// values the stream jumps over are passed without firing.
#[derive(Debug, Clone)]
pub struct TimePoints {
    points: Vec<u64>,
    base: u64,
}

impl TimePoints {
    /// Schedule over ascending positive seed points.
    pub fn new(points: Vec<u64>, base: u64) -> Result<Self> {
        if points.is_empty() {
            return Err(BenchError::InvalidTriggerParameter {
                name: "time_points",
                reason: "at least one seed point is required".to_string(),
            });
        }
        if points[0] == 0 || points.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BenchError::InvalidTriggerParameter {
                name: "time_points",
                reason: format!(
                    "seed points must be positive and strictly ascending, got {points:?}"
                ),
            });
        }
        if base < 2 {
            return Err(BenchError::InvalidTriggerParameter {
                name: "time_points_base",
                reason: format!("base must be at least 2, got {base}"),
            });
        }
        Ok(Self { points, base })
    }

    /// One point per power of `base`: 1, base, base^2, ...
    pub fn powers_of(base: u64) -> Result<Self> {
        Self::new(vec![1], base)
    }

    fn scheduled(&self, index: usize, exponent: u32) -> u64 {
        self.base
            .checked_pow(exponent)
            .and_then(|power| self.points[index].checked_mul(power))
            .unwrap_or(u64::MAX)
    }

    fn start(&self) -> PointsCursor {
        PointsCursor {
            index: 0,
            exponent: 0,
            next: self.points[0],
        }
    }

    fn advance_past(&self, cursor: &mut PointsCursor, evaluations: u64) {
        while cursor.next <= evaluations && cursor.next != u64::MAX {
            cursor.index += 1;
            if cursor.index == self.points.len() {
                cursor.index = 0;
                cursor.exponent += 1;
            }
            cursor.next = self.scheduled(cursor.index, cursor.exponent);
        }
    }
}

impl Trigger for TimePoints {
    fn name(&self) -> &'static str {
        "time_points"
    }

    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        let evaluations = observation.evaluations;
        let cursor = state.points.get_or_insert_with(|| self.start());
        let hit = evaluations == cursor.next;
        if evaluations >= cursor.next {
            self.advance_past(cursor, evaluations);
        }
        Ok(hit)
    }
}

/// Fires `per_decade` times, evenly spaced, inside every power-of-`base` decade.
///
/// With `m` the largest exponent such that `base^m <= e`, an evaluation `e`
/// fires when `(e - base^m)` is a multiple of `base^(m+1) / per_decade`
/// (at least 1).
#[derive(Debug, Clone, Copy)]
pub struct TimeRange {
    per_decade: u64,
    base: u64,
}

impl TimeRange {
    /// Policy firing `per_decade` times per decade of `base`.
    pub fn new(per_decade: u64, base: u64) -> Result<Self> {
        if per_decade == 0 {
            return Err(BenchError::InvalidTriggerParameter {
                name: "per_decade",
                reason: "must be positive".to_string(),
            });
        }
        if base < 2 {
            return Err(BenchError::InvalidTriggerParameter {
                name: "time_range_base",
                reason: format!("base must be at least 2, got {base}"),
            });
        }
        Ok(Self { per_decade, base })
    }
}

impl Trigger for TimeRange {
    fn name(&self) -> &'static str {
        "time_range"
    }

    fn should_fire(&self, _state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        // u128 keeps power * base exact for any u64 evaluation count
        let evaluations = u128::from(observation.evaluations);
        let base = u128::from(self.base);
        let mut power: u128 = 1;
        while power * base <= evaluations {
            power *= base;
        }
        let interval = (power * base / u128::from(self.per_decade)).max(1);
        Ok((evaluations - power) % interval == 0)
    }
}

/// Fires at an explicit set of evaluation counts.
#[derive(Debug, Clone, Default)]
pub struct At {
    points: BTreeSet<u64>,
}

impl At {
    /// Policy firing exactly at `points`. Duplicates collapse.
    pub fn new(points: impl IntoIterator<Item = u64>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Evaluation counts that fire.
    pub fn points(&self) -> &BTreeSet<u64> {
        &self.points
    }
}

impl Trigger for At {
    fn name(&self) -> &'static str {
        "at"
    }

    fn should_fire(&self, _state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        Ok(self.points.contains(&observation.evaluations))
    }
}

/// Fires inside closed `[start, end]` windows of evaluation counts.
#[derive(Debug, Clone)]
pub struct During {
    ranges: Vec<(u64, u64)>,
}

impl During {
    /// Policy over one or more windows; each needs `start <= end`.
    pub fn new(mut ranges: Vec<(u64, u64)>) -> Result<Self> {
        if ranges.is_empty() {
            return Err(BenchError::InvalidTriggerParameter {
                name: "during",
                reason: "at least one window is required".to_string(),
            });
        }
        if let Some((start, end)) = ranges.iter().find(|(start, end)| start > end) {
            return Err(BenchError::InvalidTriggerParameter {
                name: "during",
                reason: format!("window start {start} is past its end {end}"),
            });
        }
        ranges.sort_unstable();
        Ok(Self { ranges })
    }

    /// Windows sorted by start.
    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.ranges
    }
}

impl Trigger for During {
    fn name(&self) -> &'static str {
        "during"
    }

    fn should_fire(&self, _state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        let e = observation.evaluations;
        Ok(self.ranges.iter().any(|&(start, end)| start <= e && e <= end))
    }
}

/// Fires on the first evaluation, then whenever the transformed value improves
/// on the last recorded one by more than `delta`.
///
/// Improvements within `delta` neither fire nor move the reference value.
#[derive(Debug, Clone, Copy)]
pub struct DeltaImprovement {
    delta: f64,
}

impl DeltaImprovement {
    /// Policy ignoring improvements of at most `delta`.
    pub fn new(delta: f64) -> Result<Self> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(BenchError::InvalidTriggerParameter {
                name: "delta_improvement",
                reason: format!("delta must be finite and non-negative, got {delta}"),
            });
        }
        Ok(Self { delta })
    }

    /// Smallest gain that is ignored.
    pub fn delta(&self) -> f64 {
        self.delta
    }
}

impl Default for DeltaImprovement {
    fn default() -> Self {
        Self { delta: 1e-10 }
    }
}

impl Trigger for DeltaImprovement {
    fn name(&self) -> &'static str {
        "delta_improvement"
    }

    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        let value = observation.transformed;
        let fire = match state.delta_best {
            None => true,
            Some(best) => {
                state.direction.is_better(value, best) && (best - value).abs() > self.delta
            }
        };
        if fire {
            state.delta_best = Some(value);
        }
        Ok(fire)
    }
}

fn combined(name: &'static str, triggers: Vec<SharedTrigger>) -> Result<Vec<SharedTrigger>> {
    if triggers.is_empty() {
        return Err(BenchError::InvalidTriggerParameter {
            name,
            reason: "at least one policy is required".to_string(),
        });
    }
    Ok(triggers)
}

/// Fires when at least one member policy fires.
///
/// Every member sees every evaluation, each with its own nested state, so
/// stateful members stay in step whatever the others decide.
#[derive(Debug, Clone)]
pub struct Any {
    triggers: Vec<SharedTrigger>,
}

impl Any {
    /// Disjunction of `triggers`.
    pub fn new(triggers: Vec<SharedTrigger>) -> Result<Self> {
        Ok(Self {
            triggers: combined("any", triggers)?,
        })
    }
}

impl Trigger for Any {
    fn name(&self) -> &'static str {
        "any"
    }

    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        let mut fired = false;
        for (index, trigger) in self.triggers.iter().enumerate() {
            fired |= trigger.should_fire(state.member(index), observation)?;
        }
        Ok(fired)
    }
}

/// Fires when every member policy fires.
///
/// Members are evaluated like in [`Any`], without short-circuiting.
#[derive(Debug, Clone)]
pub struct All {
    triggers: Vec<SharedTrigger>,
}

impl All {
    /// Conjunction of `triggers`.
    pub fn new(triggers: Vec<SharedTrigger>) -> Result<Self> {
        Ok(Self {
            triggers: combined("all", triggers)?,
        })
    }
}

impl Trigger for All {
    fn name(&self) -> &'static str {
        "all"
    }

    fn should_fire(&self, state: &mut TriggerState, observation: &Observation) -> Result<bool> {
        ensure_started(observation)?;
        let mut fired = true;
        for (index, trigger) in self.triggers.iter().enumerate() {
            fired &= trigger.should_fire(state.member(index), observation)?;
        }
        Ok(fired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PointsCursor {
    index: usize,
    exponent: u32,
    next: u64,
}

/// Mutable trigger state of one tracked problem.
#[derive(Debug, Clone)]
pub struct TriggerState {
    direction: OptimizationType,
    best_fitness: f64,
    points: Option<PointsCursor>,
    delta_best: Option<f64>,
    members: Vec<TriggerState>,
    last: Option<(u64, Firing)>,
}

impl TriggerState {
    /// Fresh state for a problem optimized in `direction`.
    pub fn new(direction: OptimizationType) -> Self {
        Self {
            direction,
            best_fitness: direction.worst(),
            points: None,
            delta_best: None,
            members: Vec::new(),
            last: None,
        }
    }

    /// Re-seed for a newly tracked problem.
    pub fn reset(&mut self, direction: OptimizationType) {
        *self = Self::new(direction);
    }

    /// Direction the state was seeded for.
    pub fn direction(&self) -> OptimizationType {
        self.direction
    }

    /// Best transformed value accepted by the improvement policy.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Next evaluation count scheduled by the time-points policy, if started.
    pub fn next_time_point(&self) -> Option<u64> {
        self.points.map(|cursor| cursor.next)
    }

    /// Reference value of the delta-improvement policy, once it has fired.
    pub fn delta_best(&self) -> Option<f64> {
        self.delta_best
    }

    fn member(&mut self, index: usize) -> &mut TriggerState {
        if self.members.len() <= index {
            let direction = self.direction;
            self.members.resize_with(index + 1, || TriggerState::new(direction));
        }
        &mut self.members[index]
    }
}

/// Per-policy decision for one evaluation. Disabled policies report `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Firing {
    /// Decision of [`Always`]
    pub always: bool,
    /// Decision of [`Interval`]
    pub interval: bool,
    /// Decision of [`Improvement`]
    pub improvement: bool,
    /// Decision of [`TimePoints`]
    pub time_points: bool,
    /// Decision of [`TimeRange`]
    pub time_range: bool,
    /// Decision of [`At`]
    #[serde(default)]
    pub at: bool,
    /// Decision of [`During`]
    #[serde(default)]
    pub during: bool,
    /// Decision of [`DeltaImprovement`]
    #[serde(default)]
    pub delta_improvement: bool,
    /// Decision of the custom policy set with [`TriggersBuilder::custom`]
    #[serde(default)]
    pub custom: bool,
}

impl Firing {
    /// Whether at least one policy fired.
    pub fn any(&self) -> bool {
        self.always
            || self.interval
            || self.improvement
            || self.time_points
            || self.time_range
            || self.at
            || self.during
            || self.delta_improvement
            || self.custom
    }

    /// Names of the policies that fired.
    pub fn fired(&self) -> Vec<&'static str> {
        [
            (self.always, "always"),
            (self.interval, "interval"),
            (self.improvement, "improvement"),
            (self.time_points, "time_points"),
            (self.time_range, "time_range"),
            (self.at, "at"),
            (self.during, "during"),
            (self.delta_improvement, "delta_improvement"),
            (self.custom, "custom"),
        ]
        .into_iter()
        .filter_map(|(fired, name)| fired.then_some(name))
        .collect()
    }
}

/// The set of enabled policies.
#[derive(Debug, Clone, Default)]
pub struct Triggers {
    always: Option<Always>,
    interval: Option<Interval>,
    improvement: Option<Improvement>,
    time_points: Option<TimePoints>,
    time_range: Option<TimeRange>,
    at: Option<At>,
    during: Option<During>,
    delta_improvement: Option<DeltaImprovement>,
    custom: Option<SharedTrigger>,
}

fn decide<T: Trigger>(
    policy: &Option<T>,
    state: &mut TriggerState,
    observation: &Observation,
) -> Result<bool> {
    match policy {
        Some(policy) => policy.should_fire(state, observation),
        None => Ok(false),
    }
}

impl Triggers {
    /// Start configuring a trigger set with every policy disabled.
    pub fn builder() -> TriggersBuilder {
        TriggersBuilder::default()
    }

    /// Whether no policy is enabled.
    pub fn is_empty(&self) -> bool {
        self.always.is_none()
            && self.interval.is_none()
            && self.improvement.is_none()
            && self.time_points.is_none()
            && self.time_range.is_none()
            && self.at.is_none()
            && self.during.is_none()
            && self.delta_improvement.is_none()
            && self.custom.is_none()
    }

    /// Fresh state for a problem optimized in `direction`.
    pub fn state(&self, direction: OptimizationType) -> TriggerState {
        TriggerState::new(direction)
    }

    /// Decide whether `observation` is recorded.
    ///
    /// Asking again for the evaluation count that was just decided returns
    /// the same decision without advancing any policy.
    pub fn evaluate(&self, state: &mut TriggerState, observation: &Observation) -> Result<Firing> {
        ensure_started(observation)?;
        if let Some((evaluations, firing)) = state.last
            && evaluations == observation.evaluations
        {
            return Ok(firing);
        }
        let firing = Firing {
            always: decide(&self.always, state, observation)?,
            interval: decide(&self.interval, state, observation)?,
            improvement: decide(&self.improvement, state, observation)?,
            time_points: decide(&self.time_points, state, observation)?,
            time_range: decide(&self.time_range, state, observation)?,
            at: decide(&self.at, state, observation)?,
            during: decide(&self.during, state, observation)?,
            delta_improvement: decide(&self.delta_improvement, state, observation)?,
            custom: decide(&self.custom, state, observation)?,
        };
        state.last = Some((observation.evaluations, firing));
        Ok(firing)
    }
}

/// Builder for [`Triggers`].
#[derive(Debug, Clone, Default)]
pub struct TriggersBuilder {
    always: bool,
    interval: u64,
    improvement: bool,
    time_points: Option<(Vec<u64>, u64)>,
    time_range: Option<(u64, u64)>,
    at: Vec<u64>,
    during: Vec<(u64, u64)>,
    delta_improvement: Option<f64>,
    custom: Option<SharedTrigger>,
}

impl TriggersBuilder {
    /// Record every evaluation.
    pub fn always(mut self, enabled: bool) -> Self {
        self.always = enabled;
        self
    }

    /// Record every `every` evaluations (0 disables).
    pub fn interval(mut self, every: u64) -> Self {
        self.interval = every;
        self
    }

    /// Record strict improvements.
    pub fn improvement(mut self, enabled: bool) -> Self {
        self.improvement = enabled;
        self
    }

    /// Record on the `point * base^k` schedule. An empty point list disables.
    pub fn time_points(mut self, points: Vec<u64>, base: u64) -> Self {
        self.time_points = (!points.is_empty()).then_some((points, base));
        self
    }

    /// Record `per_decade` evaluations per decade of `base` (0 disables).
    pub fn time_range(mut self, per_decade: u64, base: u64) -> Self {
        self.time_range = (per_decade > 0).then_some((per_decade, base));
        self
    }

    /// Record at explicit evaluation counts. An empty list disables.
    pub fn at(mut self, points: Vec<u64>) -> Self {
        self.at = points;
        self
    }

    /// Record inside closed evaluation windows. An empty list disables.
    pub fn during(mut self, ranges: Vec<(u64, u64)>) -> Self {
        self.during = ranges;
        self
    }

    /// Record improvements larger than `delta` (`None` disables).
    pub fn delta_improvement(mut self, delta: Option<f64>) -> Self {
        self.delta_improvement = delta;
        self
    }

    /// Record whenever `trigger` fires, typically an [`Any`] or [`All`].
    pub fn custom(mut self, trigger: impl Trigger + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(trigger));
        self
    }

    /// Validate parameters.
    pub fn build(self) -> Result<Triggers> {
        let time_points = match self.time_points {
            Some((points, base)) => Some(TimePoints::new(points, base)?),
            None => None,
        };
        let time_range = match self.time_range {
            Some((per_decade, base)) => Some(TimeRange::new(per_decade, base)?),
            None => None,
        };
        let during = if self.during.is_empty() {
            None
        } else {
            Some(During::new(self.during)?)
        };
        Ok(Triggers {
            always: self.always.then_some(Always),
            interval: (self.interval > 0).then(|| Interval::new(self.interval)),
            improvement: self.improvement.then_some(Improvement),
            time_points,
            time_range,
            at: (!self.at.is_empty()).then(|| At::new(self.at)),
            during,
            delta_improvement: self.delta_improvement.map(DeltaImprovement::new).transpose()?,
            custom: self.custom,
        })
    }
}

/// Serializable trigger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Record every evaluation
    pub always: bool,
    /// Record every `interval` evaluations (0 disables)
    pub interval: u64,
    /// Record strict improvements
    pub improvement: bool,
    /// Seed points of the exponential schedule (empty disables)
    pub time_points: Vec<u64>,
    /// Base of the exponential schedule
    pub time_points_base: u64,
    /// Evaluations recorded per decade (0 disables)
    pub per_decade: u64,
    /// Base of the per-decade schedule
    pub time_range_base: u64,
    /// Explicit evaluation counts to record (empty disables)
    pub at: Vec<u64>,
    /// Closed `[start, end]` evaluation windows to record (empty disables)
    pub during: Vec<(u64, u64)>,
    /// Record improvements larger than this gain (absent disables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_improvement: Option<f64>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            always: false,
            interval: 0,
            improvement: true,
            time_points: vec![1],
            time_points_base: 10,
            per_decade: 0,
            time_range_base: 10,
            at: Vec::new(),
            during: Vec::new(),
            delta_improvement: None,
        }
    }
}

impl TriggerConfig {
    /// Validate into a [`Triggers`] set.
    pub fn build(&self) -> Result<Triggers> {
        Triggers::builder()
            .always(self.always)
            .interval(self.interval)
            .improvement(self.improvement)
            .time_points(self.time_points.clone(), self.time_points_base)
            .time_range(self.per_decade, self.time_range_base)
            .at(self.at.clone())
            .during(self.during.clone())
            .delta_improvement(self.delta_improvement)
            .build()
    }
}
