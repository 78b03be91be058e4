use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::analysis::{self, CumulativeTrend, Describe, DistStats, TailRisk};
use crate::capital::{CapitalAssumptions, CapitalInputs, CapitalRelief};
use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::events::{self, Record};
use crate::severity::{self, DistributionSpec};
use crate::transfer::{self, PayoutCurve};
use crate::types::{LossSample, MitigationPolicy, PortfolioSummary, TransferResult};

/// Everything one scenario run produces, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub seed: u64,
    pub distribution: DistributionSpec,
    pub policy: MitigationPolicy,
    pub sample: LossSample,
    pub transfers: Vec<TransferResult>,
    pub summary: PortfolioSummary,
    /// `None` for an empty sample.
    pub gross_stats: Option<Describe>,
    pub gross_tail: Option<TailRisk>,
    pub retained_tail: Option<TailRisk>,
    /// `None` when unexpected-loss figures were neither supplied nor derivable.
    pub capital_inputs: Option<CapitalInputs>,
    pub capital: Option<CapitalRelief>,
}

impl ScenarioReport {
    /// Output stream: start marker, one loss per event, end marker.
    pub fn records(&self) -> Vec<Record> {
        let mut out = Vec::with_capacity(self.transfers.len() + 2);
        out.push(Record::ScenarioStart {
            seed: self.seed,
            num_events: self.sample.len(),
            distribution: self.distribution.to_string(),
            policy: self.policy,
        });
        out.extend(
            events::loss_records(&self.sample, &self.transfers).into_iter().map(Record::Loss),
        );
        out.push(Record::ScenarioEnd { summary: self.summary });
        out
    }

    pub fn cumulative_trend(&self) -> CumulativeTrend {
        CumulativeTrend::from_transfers(&self.transfers)
    }

    pub fn payout_curve(&self, points: usize) -> PayoutCurve {
        transfer::payout_curve(&self.policy, points)
    }

    /// `(gross, transferred)` pairs for the gross-vs-payout scatter.
    pub fn gross_vs_transferred(&self) -> Vec<(f64, f64)> {
        self.transfers.iter().map(|t| (t.gross_loss, t.payout)).collect()
    }

    pub fn retained_losses(&self) -> Vec<f64> {
        self.transfers.iter().map(|t| t.retained_loss).collect()
    }
}

/// Run one scenario with a generator seeded from `config.seed`.
pub fn run(config: &ScenarioConfig) -> Result<ScenarioReport> {
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    run_with_rng(config, &mut rng)
}

/// Sample → transfer → aggregate → capital relief, in one pass.
pub fn run_with_rng(config: &ScenarioConfig, rng: &mut impl Rng) -> Result<ScenarioReport> {
    let sample = severity::sample(config.num_events, &config.distribution, rng)?;
    debug!(seed = config.seed, events = sample.len(), distribution = %config.distribution, "sampled losses");

    let transfers = transfer::apply_policy(&sample, &config.policy);
    let summary = analysis::aggregate(&transfers);
    debug!(
        total_gross = summary.total_gross,
        total_transferred = summary.total_transferred,
        total_retained = summary.total_retained,
        "aggregated portfolio"
    );

    let (gross_stats, gross_tail, retained_tail) = if sample.is_empty() {
        (None, None, None)
    } else {
        let gross = sample.gross_losses();
        let retained: Vec<f64> = transfers.iter().map(|t| t.retained_loss).collect();
        (
            Some(analysis::describe(&gross)?),
            Some(analysis::tail_risk(&gross)?),
            Some(analysis::tail_risk(&retained)?),
        )
    };

    let capital_inputs = resolve_capital(
        &config.capital,
        &config.policy,
        gross_tail.as_ref(),
        retained_tail.as_ref(),
    );
    let capital = capital_inputs.map(|c| c.estimate());
    if let Some(c) = &capital {
        debug!(nominal = c.nominal_relief, final_relief = c.final_relief, "estimated capital relief");
    }

    Ok(ScenarioReport {
        seed: config.seed,
        distribution: config.distribution,
        policy: config.policy,
        sample,
        transfers,
        summary,
        gross_stats,
        gross_tail,
        retained_tail,
        capital_inputs,
        capital,
    })
}

/// Fill unset capital inputs: UL from the 99.9 % tail in excess of the mean,
/// insured limit from the policy cover.
fn resolve_capital(
    assumptions: &CapitalAssumptions,
    policy: &MitigationPolicy,
    gross_tail: Option<&TailRisk>,
    retained_tail: Option<&TailRisk>,
) -> Option<CapitalInputs> {
    let ul_gross = assumptions.ul_gross.or_else(|| gross_tail.map(TailRisk::unexpected_loss))?;
    let ul_net = assumptions.ul_net.or_else(|| retained_tail.map(TailRisk::unexpected_loss))?;
    Some(CapitalInputs {
        ul_gross,
        ul_net,
        pd_a: assumptions.pd_a,
        l_insured: assumptions.l_insured.unwrap_or(policy.cover),
    })
}

/// Run `runs` copies of `config` with seeds `seed, seed + 1, ...` in parallel.
/// Each run owns its generator, so results do not depend on scheduling.
pub fn run_many(config: &ScenarioConfig, runs: u64) -> Result<Vec<ScenarioReport>> {
    (0..runs)
        .into_par_iter()
        .map(|i| run(&config.with_seed(config.seed.wrapping_add(i))))
        .collect()
}

/// Per-metric distributions over a batch of independently seeded runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunDistributions {
    pub runs: usize,
    pub total_gross: DistStats,
    pub total_transferred: DistStats,
    pub total_retained: DistStats,
    pub transfer_ratio: DistStats,
    /// Only runs that produced a capital figure contribute.
    pub final_relief: Option<DistStats>,
}

/// Cross-run distributions. Needs at least two runs.
pub fn analyse_runs(reports: &[ScenarioReport]) -> Option<RunDistributions> {
    if reports.len() < 2 {
        return None;
    }
    let column = |f: fn(&ScenarioReport) -> f64| -> Vec<f64> { reports.iter().map(f).collect() };

    let mut gross = column(|r| r.summary.total_gross);
    let mut transferred = column(|r| r.summary.total_transferred);
    let mut retained = column(|r| r.summary.total_retained);
    let mut ratio = column(|r| r.summary.transfer_ratio());
    let mut relief: Vec<f64> =
        reports.iter().filter_map(|r| r.capital.map(|c| c.final_relief)).collect();

    Some(RunDistributions {
        runs: reports.len(),
        total_gross: analysis::dist_stats(&mut gross)?,
        total_transferred: analysis::dist_stats(&mut transferred)?,
        total_retained: analysis::dist_stats(&mut retained)?,
        transfer_ratio: analysis::dist_stats(&mut ratio)?,
        final_relief: analysis::dist_stats(&mut relief),
    })
}
