//! Percentile breakpoints using linear interpolation between ranked
//! observations (the common "linear" method: position q·(n−1)).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Monetary];

    /// Smaller recency is better, so its buckets score in reverse.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Recency                    => Direction::Reversed,
            Self::Frequency | Self::Monetary => Direction::Normal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Recency   => "recency",
            Self::Frequency => "frequency",
            Self::Monetary  => "monetary",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Normal,
    Reversed,
}

/// Percentile `q` (0..=1) of already-sorted `sorted`. `None` when empty.
pub fn linear_percentile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Ascending breakpoints of one metric over one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints {
    values: Vec<f64>,
    /// Smallest and largest observed value; `None` for an empty population.
    range:  Option<(f64, f64)>,
}

impl Breakpoints {
    /// Breakpoints of `values` at each quantile in `cuts`.
    /// An empty population yields no breakpoints.
    pub fn compute(values: &[f64], cuts: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let values = cuts
            .iter()
            .filter_map(|q| linear_percentile(&sorted, *q))
            .collect();
        let range = sorted.first().zip(sorted.last()).map(|(lo, hi)| (*lo, *hi));
        Self { values, range }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 1-based bucket: the first breakpoint `value` does not exceed,
    /// or one past the last breakpoint.
    pub fn bucket(&self, value: f64) -> usize {
        self.values
            .iter()
            .position(|bp| value <= *bp)
            .unwrap_or(self.values.len())
            + 1
    }

    /// Smallest and largest observed value.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// Every value in the population is identical. Coinciding breakpoints
    /// alone are not enough: heavy ties can collapse them while a few
    /// customers still sit above the last one.
    pub fn is_degenerate(&self) -> bool {
        matches!(self.range, Some((lo, hi)) if lo == hi)
    }

    pub fn bucket_count(&self) -> usize {
        self.values.len() + 1
    }
}
