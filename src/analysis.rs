use std::fmt;

use serde::Serialize;

use crate::error::AnalysisError;
use crate::types::{MitigationPolicy, PortfolioSummary, TransferResult};

/// Sum gross, transferred and retained loss over a set of transfer results.
/// An empty slice gives all-zero totals.
pub fn aggregate(events: &[TransferResult]) -> PortfolioSummary {
    events.iter().fold(PortfolioSummary::default(), |mut acc, t| {
        acc.total_gross += t.gross_loss;
        acc.total_transferred += t.payout;
        acc.total_retained += t.retained_loss;
        acc
    })
}

/// Aggregate risk from parallel gross and transferred columns.
///
/// Returns `(s_gross, s_net, total_transferred)` with
/// `s_net = s_gross - total_transferred`. Empty input gives `(0, 0, 0)`.
pub fn aggregate_risks(gross: &[f64], transferred: &[f64]) -> (f64, f64, f64) {
    let s_gross: f64 = gross.iter().sum();
    let total_transferred: f64 = transferred.iter().sum();
    (s_gross, s_gross - total_transferred, total_transferred)
}

/// The `p`-th percentile (`p` in [0, 100]) with linear interpolation between
/// order statistics at rank `p/100 * (n-1)`.
pub fn percentile(values: &[f64], p: f64) -> Result<f64, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput { context: "percentile" });
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(AnalysisError::PercentileOutOfRange(p));
    }
    Ok(interpolate(&sorted(values), p / 100.0))
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Linear interpolation at quantile `q` in [0, 1] of an ascending, non-empty slice.
fn interpolate(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    let h = q * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    (mean, variance.sqrt())
}

/// Summary table for a loss column: count, moments and quartiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1); zero for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Result<Describe, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput { context: "describe" });
    }
    let s = sorted(values);
    let (mean, std_dev) = mean_and_std(&s);
    Ok(Describe {
        count: s.len(),
        mean,
        std_dev,
        min: s[0],
        p25: interpolate(&s, 0.25),
        p50: interpolate(&s, 0.50),
        p75: interpolate(&s, 0.75),
        max: s[s.len() - 1],
    })
}

/// High quantiles of a loss column used for tail and capital figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TailRisk {
    pub mean: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
}

impl TailRisk {
    /// Unexpected loss at 99.9 %: quantile in excess of the mean.
    pub fn unexpected_loss(&self) -> f64 {
        self.p999 - self.mean
    }
}

pub fn tail_risk(values: &[f64]) -> Result<TailRisk, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput { context: "tail risk" });
    }
    let s = sorted(values);
    let (mean, _) = mean_and_std(&s);
    Ok(TailRisk {
        mean,
        p95: interpolate(&s, 0.95),
        p99: interpolate(&s, 0.99),
        p999: interpolate(&s, 0.999),
    })
}

/// Running sum of `values`.
pub fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// Cumulative gross and retained loss by event number.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CumulativeTrend {
    pub gross: Vec<f64>,
    pub retained: Vec<f64>,
}

impl CumulativeTrend {
    pub fn from_transfers(events: &[TransferResult]) -> Self {
        let gross: Vec<f64> = events.iter().map(|t| t.gross_loss).collect();
        let retained: Vec<f64> = events.iter().map(|t| t.retained_loss).collect();
        CumulativeTrend { gross: cumulative(&gross), retained: cumulative(&retained) }
    }

    /// Mitigation benefit after the last event; zero when there are no events.
    pub fn final_gap(&self) -> f64 {
        match (self.gross.last(), self.retained.last()) {
            (Some(g), Some(r)) => g - r,
            _ => 0.0,
        }
    }
}

// ── Cross-run distributions ──────────────────────────────────────────────────

/// Distribution statistics for a continuous metric across N scenario runs.
#[derive(Debug, Clone, Serialize)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

pub fn dist_stats(values: &mut [f64]) -> Option<DistStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let (mean, std_dev) = mean_and_std(values);

    Some(DistStats {
        n,
        min: values[0],
        p5: interpolate(values, 0.05),
        p25: interpolate(values, 0.25),
        p50: interpolate(values, 0.50),
        p75: interpolate(values, 0.75),
        p95: interpolate(values, 0.95),
        max: values[n - 1],
        mean,
        std_dev,
    })
}

// ── Transfer invariants ──────────────────────────────────────────────────────

/// A per-event record that breaks the deductible/cover split.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferViolation {
    /// payout + retained differs from gross by more than the tolerance.
    SplitMismatch { index: usize, gross: f64, payout: f64, retained: f64 },
    /// payout outside [0, cover].
    PayoutOutOfBounds { index: usize, payout: f64, cover: f64 },
    /// payout differs from the clamp recomputed under the policy.
    PayoutMismatch { index: usize, expected: f64, actual: f64 },
}

impl fmt::Display for TransferViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SplitMismatch { index, gross, payout, retained } => {
                write!(f, "SplitMismatch event={index}: payout {payout} + retained {retained} != gross {gross}")
            }
            Self::PayoutOutOfBounds { index, payout, cover } => {
                write!(f, "PayoutOutOfBounds event={index}: payout {payout} outside [0, {cover}]")
            }
            Self::PayoutMismatch { index, expected, actual } => {
                write!(f, "PayoutMismatch event={index}: expected {expected}, got {actual}")
            }
        }
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Check every record against the split identity, the cover bound and the
/// payout the policy would produce. Returns one item per violation.
pub fn verify_transfers(
    events: &[TransferResult],
    policy: &MitigationPolicy,
) -> Vec<TransferViolation> {
    let mut violations = Vec::new();
    for (index, t) in events.iter().enumerate() {
        if !close(t.payout + t.retained_loss, t.gross_loss) {
            violations.push(TransferViolation::SplitMismatch {
                index,
                gross: t.gross_loss,
                payout: t.payout,
                retained: t.retained_loss,
            });
        }
        if t.payout < 0.0 || t.payout > policy.cover {
            violations.push(TransferViolation::PayoutOutOfBounds {
                index,
                payout: t.payout,
                cover: policy.cover,
            });
        }
        let expected = policy.apply(t.gross_loss).payout;
        if !close(expected, t.payout) {
            violations.push(TransferViolation::PayoutMismatch { index, expected, actual: t.payout });
        }
    }
    violations
}
