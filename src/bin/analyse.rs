//! Re-reads a `lossmit` event stream and checks it.
//!
//! Reads `losses.ndjson` (or the given path) using the same `Record` type the
//! simulator writes, then prints:
//!   Tier 1  — transfer invariants (PASS/FAIL per kind), summary reconciliation
//!             and loss count against the header
//!   Tier 2  — recomputed portfolio totals and loss percentiles

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lossmit::analysis::{self, TransferViolation};
use lossmit::events::{self, Record};
use lossmit::types::{MitigationPolicy, PortfolioSummary, TransferResult};

#[derive(Parser)]
#[command(name = "analyse", version, about = "Verify and summarise a lossmit event stream")]
struct Cli {
    /// Event stream written by `lossmit`
    #[arg(default_value = "losses.ndjson")]
    events: PathBuf,

    /// Percentiles to report for gross and retained losses
    #[arg(short, long, value_delimiter = ',', default_values_t = [50.0, 90.0, 99.0, 99.9])]
    percentiles: Vec<f64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ── Load events ──────────────────────────────────────────────────────────
    let file = match File::open(&cli.events) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: cannot open {} — {e}", cli.events.display());
            eprintln!("Run `cargo run --release` first to generate the event stream.");
            return ExitCode::FAILURE;
        }
    };
    let records = match events::read_ndjson(BufReader::new(file)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut policy: Option<MitigationPolicy> = None;
    let mut declared: Option<PortfolioSummary> = None;
    let mut transfers: Vec<TransferResult> = Vec::new();
    for r in &records {
        match r {
            Record::ScenarioStart { seed, num_events, distribution, policy: p } => {
                tracing::info!(seed, num_events, %distribution, "scenario header");
                policy = Some(*p);
            }
            Record::Loss(l) => transfers.push(l.transfer()),
            Record::ScenarioEnd { summary } => declared = Some(*summary),
        }
    }

    let Some(policy) = policy else {
        eprintln!("error: stream has no ScenarioStart record");
        return ExitCode::FAILURE;
    };

    // ── Tier 1: invariants ───────────────────────────────────────────────────
    let violations = analysis::verify_transfers(&transfers, &policy);
    let pass = |ok: bool| if ok { "PASS" } else { "FAIL" };
    let split_ok = !violations.iter().any(|v| matches!(v, TransferViolation::SplitMismatch { .. }));
    let bounds_ok = !violations.iter().any(|v| matches!(v, TransferViolation::PayoutOutOfBounds { .. }));
    let clamp_ok = !violations.iter().any(|v| matches!(v, TransferViolation::PayoutMismatch { .. }));

    println!("=== Tier 1 — Transfer invariants ({} events) ===", transfers.len());
    println!("  [1] payout + retained = gross:     {}", pass(split_ok));
    println!("  [2] 0 ≤ payout ≤ cover:            {}", pass(bounds_ok));
    println!("  [3] payout matches policy clamp:   {}", pass(clamp_ok));

    if !violations.is_empty() {
        println!("\n  {} violation(s):", violations.len());
        for v in violations.iter().take(20) {
            println!("    {v}");
        }
    }

    let recomputed = analysis::aggregate(&transfers);
    let reconciled = match declared {
        Some(d) => {
            let tol = 1e-9 * d.total_gross.abs().max(1.0);
            (d.total_gross - recomputed.total_gross).abs() <= tol
                && (d.total_transferred - recomputed.total_transferred).abs() <= tol
                && (d.total_retained - recomputed.total_retained).abs() <= tol
        }
        None => false,
    };
    println!("  [4] ScenarioEnd summary reconciles: {}", pass(reconciled));

    let counts_match = match events::loss_count(&records) {
        (Some(header), found) if header == found => true,
        (header, found) => {
            tracing::warn!(?header, found, "loss record count differs from ScenarioStart");
            false
        }
    };
    println!("  [5] Loss count matches header:      {}", pass(counts_match));

    // ── Tier 2: totals and percentiles ───────────────────────────────────────
    println!("\n=== Tier 2 — Portfolio totals ===");
    for (label, amount) in recomputed.as_comparison() {
        println!("  {label:<12} {amount:>18.2}");
    }

    let gross: Vec<f64> = transfers.iter().map(|t| t.gross_loss).collect();
    let retained: Vec<f64> = transfers.iter().map(|t| t.retained_loss).collect();
    if !gross.is_empty() {
        println!("\n{:>8} | {:>16} | {:>16}", "Pct", "Gross", "Retained");
        for &p in &cli.percentiles {
            match (analysis::percentile(&gross, p), analysis::percentile(&retained, p)) {
                (Ok(g), Ok(r)) => println!("{p:>8} | {g:>16.2} | {r:>16.2}"),
                (Err(e), _) | (_, Err(e)) => eprintln!("  skipping {p}: {e}"),
            }
        }
    }

    if violations.is_empty() && reconciled && counts_match { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
