use serde::Serialize;

use crate::types::{LossSample, MitigationPolicy, TransferResult};

/// Headroom added past `deductible + cover` when charting the payout function.
pub const PAYOUT_CURVE_MARGIN: f64 = 2_000_000.0;

/// Grid resolution of the payout-function chart.
pub const DEFAULT_CURVE_POINTS: usize = 500;

/// Split one gross loss into `(payout, retained)`.
///
/// `payout = min(max(gross - deductible, 0), cover)` and
/// `retained = gross - payout`. Zero cover, zero deductible and a deductible
/// at or above the loss are ordinary cases, not errors. Negative policy values
/// are not rejected here.
pub fn transfer(gross_loss: f64, deductible: f64, cover: f64) -> (f64, f64) {
    let payout = (gross_loss - deductible).max(0.0).min(cover);
    (payout, gross_loss - payout)
}

impl MitigationPolicy {
    pub fn apply(&self, gross_loss: f64) -> TransferResult {
        let (payout, retained_loss) = transfer(gross_loss, self.deductible, self.cover);
        TransferResult { gross_loss, payout, retained_loss }
    }
}

/// Apply `policy` to every event of `sample`, preserving event order.
pub fn apply_policy(sample: &LossSample, policy: &MitigationPolicy) -> Vec<TransferResult> {
    sample.iter().map(|e| policy.apply(e.gross_loss)).collect()
}

/// Apply `policy` to a bare column of gross losses.
pub fn apply_to_losses(gross_losses: &[f64], policy: &MitigationPolicy) -> Vec<TransferResult> {
    gross_losses.iter().map(|&g| policy.apply(g)).collect()
}

/// Payout and retained loss traced over a grid of gross losses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutCurve {
    pub gross: Vec<f64>,
    pub payout: Vec<f64>,
    pub retained: Vec<f64>,
}

/// Evaluate the transfer function on `points` evenly spaced gross losses over
/// `[0, deductible + cover + PAYOUT_CURVE_MARGIN]`, endpoints included.
pub fn payout_curve(policy: &MitigationPolicy, points: usize) -> PayoutCurve {
    let upper = policy.deductible + policy.cover + PAYOUT_CURVE_MARGIN;
    let gross = linspace(0.0, upper, points);
    let (payout, retained) =
        apply_to_losses(&gross, policy).into_iter().map(|t| (t.payout, t.retained_loss)).unzip();
    PayoutCurve { gross, payout, retained }
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
