//! Quartile thresholds and RFV letter grading
//!
//! This module computes per-metric quartile thresholds from the customer
//! population and maps metric values to letter grades A-D. Recency grades
//! ascending-bad (recent buyers score A); frequency and value grade
//! ascending-good (heavy buyers score A).

use serde::Serialize;

use super::error::{RfvError, RfvResult};

/// Quantile probabilities that define the grade boundaries
const QUARTILE_PROBS: [f64; 3] = [0.25, 0.50, 0.75];

/// Letter grade for a single RFV metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    /// Numeric rank of the grade (A = 1 .. D = 4)
    pub fn rank(&self) -> u8 {
        match self {
            Grade::A => 1,
            Grade::B => 2,
            Grade::C => 3,
            Grade::D => 4,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Quartile thresholds for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    /// 25th percentile
    pub q1: f64,
    /// 50th percentile (median)
    pub q2: f64,
    /// 75th percentile
    pub q3: f64,
}

impl Quartiles {
    /// Compute quartiles from a metric's values using linear interpolation
    /// between order statistics (position = (n - 1) * p)
    ///
    /// # Arguments
    /// * `values` - One value per customer; order does not matter
    ///
    /// # Returns
    /// The three thresholds, or `EmptyDataset` if no values were given
    pub fn compute(values: &[f64]) -> RfvResult<Self> {
        if values.is_empty() {
            return Err(RfvError::EmptyDataset);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Ok(Self {
            q1: interpolated_quantile(&sorted, QUARTILE_PROBS[0]),
            q2: interpolated_quantile(&sorted, QUARTILE_PROBS[1]),
            q3: interpolated_quantile(&sorted, QUARTILE_PROBS[2]),
        })
    }
}

/// Quartile thresholds for all three metrics of one run
#[derive(Debug, Clone, Serialize)]
pub struct MetricThresholds {
    pub recency: Quartiles,
    pub frequency: Quartiles,
    pub value: Quartiles,
}

impl MetricThresholds {
    /// Compute thresholds for the current population
    ///
    /// Thresholds are recomputed from scratch every run; a customer's grade
    /// is always relative to the population they were scored with.
    pub fn from_metrics(
        recency: &[f64],
        frequency: &[f64],
        value: &[f64],
    ) -> RfvResult<Self> {
        Ok(Self {
            recency: Quartiles::compute(recency)?,
            frequency: Quartiles::compute(frequency)?,
            value: Quartiles::compute(value)?,
        })
    }
}

/// Linear interpolation quantile over a pre-sorted slice
fn interpolated_quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let pos = (n - 1) as f64 * p;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * frac
    }
}

/// Grade a recency value: smaller is better (bought recently)
///
/// Boundaries are inclusive on the lower side, so a value exactly on a
/// threshold takes the better grade.
pub fn grade_recency(value: f64, q: &Quartiles) -> Grade {
    if value <= q.q1 {
        Grade::A
    } else if value <= q.q2 {
        Grade::B
    } else if value <= q.q3 {
        Grade::C
    } else {
        Grade::D
    }
}

/// Grade a frequency or monetary value: larger is better
///
/// The same inclusive boundaries as [`grade_recency`], mirrored: a value at
/// or below the 25th percentile grades D, above the 75th grades A.
pub fn grade_frequency_value(value: f64, q: &Quartiles) -> Grade {
    if value <= q.q1 {
        Grade::D
    } else if value <= q.q2 {
        Grade::C
    } else if value <= q.q3 {
        Grade::B
    } else {
        Grade::A
    }
}
