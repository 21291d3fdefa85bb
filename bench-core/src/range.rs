//! Discretization of an interval into a finite number of buckets.
//!
//! A [`Range`] maps values of `[min, max]` to bucket indices in `[0, size)`
//! and back to bucket bounds. Three scales are available: linear, base-10
//! logarithmic and base-2 logarithmic. Logarithmic scales are anchored at
//! `min` (they work on `1 + value - min`) so that ranges starting at zero are
//! valid.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BenchError, Result};

/// Bucket spacing of a [`Range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Equal-width buckets.
    #[default]
    Linear,
    /// Buckets of equal width in `log10(1 + value - min)`.
    Log10,
    /// Buckets of equal width in `log2(1 + value - min)`.
    Log2,
}

impl Scale {
    fn log(self, x: f64) -> f64 {
        match self {
            Scale::Linear => x,
            Scale::Log10 => x.log10(),
            Scale::Log2 => x.log2(),
        }
    }

    fn exp(self, x: f64) -> f64 {
        match self {
            Scale::Linear => x,
            Scale::Log10 => 10f64.powf(x),
            Scale::Log2 => x.exp2(),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Linear => write!(f, "linear"),
            Scale::Log10 => write!(f, "log10"),
            Scale::Log2 => write!(f, "log2"),
        }
    }
}

/// Immutable mapping between `[min, max]` and `size` buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<T> {
    min: T,
    max: T,
    size: usize,
    scale: Scale,
}

fn to_f64<T: ToPrimitive>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl<T> Range<T>
where
    T: Copy + PartialOrd + ToPrimitive,
{
    /// Create a range, rejecting non-finite bounds, `min >= max` and zero buckets.
    pub fn new(min: T, max: T, size: usize, scale: Scale) -> Result<Self> {
        let (lo, hi) = (to_f64(min), to_f64(max));
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(BenchError::InvalidRange { min: lo, max: hi });
        }
        if size == 0 {
            return Err(BenchError::ZeroBuckets);
        }
        Ok(Self {
            min,
            max,
            size,
            scale,
        })
    }

    /// Linearly spaced buckets.
    pub fn linear(min: T, max: T, size: usize) -> Result<Self> {
        Self::new(min, max, size, Scale::Linear)
    }

    /// Base-10 logarithmically spaced buckets.
    pub fn log10(min: T, max: T, size: usize) -> Result<Self> {
        Self::new(min, max, size, Scale::Log10)
    }

    /// Base-2 logarithmically spaced buckets.
    pub fn log2(min: T, max: T, size: usize) -> Result<Self> {
        Self::new(min, max, size, Scale::Log2)
    }

    /// Lower bound.
    pub fn min(&self) -> T {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> T {
        self.max
    }

    /// Number of buckets.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bucket spacing.
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// `max - min`.
    pub fn length(&self) -> f64 {
        to_f64(self.max) - to_f64(self.min)
    }

    /// Whether `value` lies in the closed interval `[min, max]`.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// Bucket holding `value`.
    ///
    /// Values below `min` (and NaN) clamp to bucket 0, values at or above
    /// `max` clamp to the last bucket.
    pub fn index(&self, value: T) -> usize {
        let x = to_f64(value);
        let min = to_f64(self.min);
        if x.is_nan() || x <= min {
            return 0;
        }
        if x >= to_f64(self.max) {
            return self.size - 1;
        }
        let fraction = match self.scale {
            Scale::Linear => (x - min) / self.length(),
            scale => scale.log(1.0 + x - min) / scale.log(1.0 + self.length()),
        };
        let bucket = (fraction * self.size as f64).floor();
        (bucket as usize).min(self.size - 1)
    }

    /// `(low, high)` bounds of a bucket.
    pub fn bounds(&self, bucket: usize) -> Result<(f64, f64)> {
        if bucket >= self.size {
            return Err(BenchError::IndexOutOfBounds {
                index: bucket,
                count: self.size,
            });
        }
        let min = to_f64(self.min);
        let size = self.size as f64;
        let (i, next) = (bucket as f64, (bucket + 1) as f64);
        let bounds = match self.scale {
            Scale::Linear => {
                let step = self.length() / size;
                (min + i * step, min + next * step)
            }
            scale => {
                let span = scale.log(1.0 + self.length());
                (
                    scale.exp(i * span / size) - 1.0 + min,
                    scale.exp(next * span / size) - 1.0 + min,
                )
            }
        };
        Ok(bounds)
    }

    /// Width of a bucket relative to the whole range, in `(0, 1]`.
    pub fn relative_width(&self, bucket: usize) -> Result<f64> {
        let (low, high) = self.bounds(bucket)?;
        Ok((high - low) / self.length())
    }
}

/// Serializable description of a [`Range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig<T> {
    /// Lower bound
    pub min: T,
    /// Upper bound
    pub max: T,
    /// Number of buckets
    pub buckets: usize,
    /// Bucket spacing
    #[serde(default)]
    pub scale: Scale,
}

impl<T> RangeConfig<T>
where
    T: Copy + PartialOrd + ToPrimitive,
{
    /// Validate into a [`Range`].
    pub fn build(&self) -> Result<Range<T>> {
        Range::new(self.min, self.max, self.buckets, self.scale)
    }
}
