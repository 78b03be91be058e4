use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Position of an event within the sample that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventIndex(pub u64);

/// One simulated operational loss. `timestamp` is for display only; the risk
/// arithmetic reads `gross_loss` alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossEvent {
    pub timestamp: NaiveDate,
    pub gross_loss: f64,
}

/// The ordered output of one sampling call. Length is fixed at creation and
/// the events cannot be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LossSample {
    events: Vec<LossEvent>,
}

impl LossSample {
    pub fn from_events(events: Vec<LossEvent>) -> Self {
        LossSample { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LossEvent> {
        self.events.iter()
    }

    /// Gross loss column in event order.
    pub fn gross_losses(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.gross_loss).collect()
    }
}

/// Deductible/cover pair applied uniformly to every event of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MitigationPolicy {
    /// Loss borne entirely by the insured before the policy pays anything.
    pub deductible: f64,
    /// Maximum the policy pays for a single event.
    pub cover: f64,
}

impl MitigationPolicy {
    pub fn new(deductible: f64, cover: f64) -> Self {
        MitigationPolicy { deductible, cover }
    }
}

/// Per-event split of a gross loss under a policy.
/// `payout + retained_loss == gross_loss`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub gross_loss: f64,
    pub payout: f64,
    pub retained_loss: f64,
}

/// Portfolio-level sums over a sample.
/// `total_gross == total_transferred + total_retained` up to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_gross: f64,
    pub total_transferred: f64,
    pub total_retained: f64,
}

impl PortfolioSummary {
    /// Share of gross loss moved to the policy. Zero if there is no gross loss.
    pub fn transfer_ratio(&self) -> f64 {
        if self.total_gross == 0.0 {
            0.0
        } else {
            self.total_transferred / self.total_gross
        }
    }

    /// Labelled totals in display order, for the aggregated comparison chart.
    pub fn as_comparison(&self) -> [(&'static str, f64); 3] {
        [
            ("Gross", self.total_gross),
            ("Transferred", self.total_transferred),
            ("Retained", self.total_retained),
        ]
    }
}
