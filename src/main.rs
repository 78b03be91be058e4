use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lossmit::analysis::{self, DistStats, TailRisk};
use lossmit::config::{ScenarioConfig, default_distribution};
use lossmit::error::{AnalysisError, Error, SamplingError};
use lossmit::events;
use lossmit::severity::{DistributionKind, DistributionSpec};
use lossmit::simulation::{self, RunDistributions, ScenarioReport};
use lossmit::transfer;

#[derive(Parser)]
#[command(name = "lossmit", version)]
#[command(about = "Simulate operational losses and the effect of a deductible/cover policy")]
struct Cli {
    /// Scenario JSON file; the flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of loss events to sample
    #[arg(short = 'n', long)]
    events: Option<usize>,

    /// Severity distribution: Lognormal, Pareto or Exponential
    #[arg(short, long)]
    distribution: Option<String>,

    /// Lognormal mean of log
    #[arg(long)]
    mu: Option<f64>,
    /// Lognormal std-dev of log
    #[arg(long)]
    sigma: Option<f64>,
    /// Pareto minimum value
    #[arg(long)]
    xm: Option<f64>,
    /// Pareto shape
    #[arg(long)]
    alpha: Option<f64>,
    /// Exponential rate
    #[arg(long)]
    lambda: Option<f64>,

    #[arg(long)]
    deductible: Option<f64>,
    #[arg(long)]
    cover: Option<f64>,

    /// Unexpected loss of the gross portfolio (derived from the sample if unset)
    #[arg(long)]
    ul_gross: Option<f64>,
    /// Unexpected loss of the net portfolio (derived from the sample if unset)
    #[arg(long)]
    ul_net: Option<f64>,
    /// Insurer probability of default
    #[arg(long)]
    pd: Option<f64>,
    /// Insured limit exposed to insurer default (defaults to the cover)
    #[arg(long)]
    insured_limit: Option<f64>,

    /// NDJSON output path for the single-run event stream
    #[arg(short, long, default_value = "losses.ndjson")]
    output: PathBuf,

    /// Run N seeds in parallel and report cross-run distributions
    #[arg(long)]
    runs: Option<u64>,

    #[arg(short, long)]
    quiet: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn report_error(e: &Error) {
    match e {
        Error::Sampling(SamplingError::Configuration(_)) => eprintln!("Configuration Error: {e}"),
        Error::Sampling(SamplingError::Type { .. }) => {
            eprintln!("Type Error: {e}. Please check parameter inputs.")
        }
        Error::Analysis(AnalysisError::EmptyInput { .. }) => eprintln!("Empty Input: {e}"),
        Error::Io { .. } => eprintln!("I/O Error: {e}"),
        other => eprintln!("error: {other}"),
    }
}

fn execute(cli: &Cli) -> lossmit::Result<()> {
    let config = build_config(cli)?;
    info!(
        seed = config.seed,
        events = config.num_events,
        distribution = %config.distribution,
        deductible = config.policy.deductible,
        cover = config.policy.cover,
        "scenario configured"
    );

    if let Some(n) = cli.runs {
        let reports = simulation::run_many(&config, n)?;
        info!(runs = reports.len(), "runs complete");
        if !cli.quiet {
            print_all_runs(&reports);
            match simulation::analyse_runs(&reports) {
                Some(d) => print_distributions(&d),
                None => warn!("distribution requires >= 2 runs"),
            }
        }
        return Ok(());
    }

    let report = simulation::run(&config)?;

    let file = File::create(&cli.output)
        .map_err(|e| Error::io(format!("creating {}", cli.output.display()), e))?;
    let mut writer = BufWriter::new(file);
    events::write_ndjson(&mut writer, &report.records())?;
    writer.flush().map_err(|e| Error::io(format!("flushing {}", cli.output.display()), e))?;
    info!(path = %cli.output.display(), events = report.sample.len(), "wrote event stream");

    if !cli.quiet {
        print_report(&report);
    }
    Ok(())
}

fn build_config(cli: &Cli) -> lossmit::Result<ScenarioConfig> {
    let mut config = match &cli.config {
        Some(path) => ScenarioConfig::from_path(path)?,
        None => ScenarioConfig::canonical(),
    };

    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(n) = cli.events {
        config.num_events = n;
    }
    config.distribution = override_distribution(cli, config.distribution)?;
    if let Some(d) = cli.deductible {
        config.policy.deductible = d;
    }
    if let Some(c) = cli.cover {
        config.policy.cover = c;
    }

    let capital = &mut config.capital;
    capital.ul_gross = cli.ul_gross.or(capital.ul_gross);
    capital.ul_net = cli.ul_net.or(capital.ul_net);
    capital.l_insured = cli.insured_limit.or(capital.l_insured);
    if let Some(pd) = cli.pd {
        capital.pd_a = pd;
    }
    Ok(config)
}

/// Switch family if `--distribution` names a different one, then apply any
/// per-parameter flags that belong to the resulting family.
fn override_distribution(
    cli: &Cli,
    base: DistributionSpec,
) -> Result<DistributionSpec, SamplingError> {
    let spec = match &cli.distribution {
        Some(name) => {
            let kind: DistributionKind = name.parse()?;
            if kind == base.kind() { base } else { default_distribution(kind) }
        }
        None => base,
    };

    let ignored = |flags: &[(&str, Option<f64>)]| {
        for (name, value) in flags {
            if value.is_some() {
                warn!(flag = *name, distribution = %spec.kind(), "parameter ignored");
            }
        }
    };

    match spec {
        DistributionSpec::Lognormal { mu, sigma } => {
            ignored(&[("xm", cli.xm), ("alpha", cli.alpha), ("lambda", cli.lambda)]);
            DistributionSpec::lognormal(cli.mu.unwrap_or(mu), cli.sigma.unwrap_or(sigma))
        }
        DistributionSpec::Pareto { xm, alpha } => {
            ignored(&[("mu", cli.mu), ("sigma", cli.sigma), ("lambda", cli.lambda)]);
            DistributionSpec::pareto(cli.xm.unwrap_or(xm), cli.alpha.unwrap_or(alpha))
        }
        DistributionSpec::Exponential { lambda } => {
            ignored(&[("mu", cli.mu), ("sigma", cli.sigma), ("xm", cli.xm), ("alpha", cli.alpha)]);
            DistributionSpec::exponential(cli.lambda.unwrap_or(lambda))
        }
    }
}

fn print_report(report: &ScenarioReport) {
    let policy = report.policy;
    println!("\n=== Scenario ===");
    println!("  Seed:          {}", report.seed);
    println!("  Events:        {}", report.sample.len());
    println!("  Distribution:  {}", report.distribution);
    println!("  Model mean:    {:.2}", report.distribution.mean());
    println!("  Deductible:    {:.2}", policy.deductible);
    println!("  Cover:         {:.2}", policy.cover);

    // ── Sample preview ────────────────────────────────────────────────────────
    println!("\n=== Simulated loss data (first 5) ===");
    println!("{:>5} | {:>10} | {:>16} | {:>16} | {:>16}", "Event", "Date", "Gross", "Transferred", "Retained");
    for (i, (e, t)) in report.sample.iter().zip(&report.transfers).take(5).enumerate() {
        println!(
            "{:>5} | {:>10} | {:>16.2} | {:>16.2} | {:>16.2}",
            i, e.timestamp, t.gross_loss, t.payout, t.retained_loss
        );
    }

    if let Some(d) = &report.gross_stats {
        println!("\n=== Descriptive statistics of gross losses ===");
        println!("  count  {:>16}", d.count);
        println!("  mean   {:>16.2}", d.mean);
        println!("  std    {:>16.2}", d.std_dev);
        println!("  min    {:>16.2}", d.min);
        println!("  25%    {:>16.2}", d.p25);
        println!("  50%    {:>16.2}", d.p50);
        println!("  75%    {:>16.2}", d.p75);
        println!("  max    {:>16.2}", d.max);
    }

    // ── Aggregated financial summary ─────────────────────────────────────────
    let s = report.summary;
    println!("\n=== Aggregated financial summary ===");
    for (label, amount) in s.as_comparison() {
        println!("  {label:<12} {amount:>18.2}");
    }
    println!("  Transfer ratio: {:.1}%", s.transfer_ratio() * 100.0);

    let gross = report.sample.gross_losses();
    let transferred: Vec<f64> = report.transfers.iter().map(|t| t.payout).collect();
    let (_, s_net, _) = analysis::aggregate_risks(&gross, &transferred);
    println!("  S_net = S_gross − ΣL(d,c): {s_net:.2}");

    if let (Some(g), Some(r)) = (&report.gross_tail, &report.retained_tail) {
        println!("\n=== Tail risk ===");
        println!("{:>9} | {:>16} | {:>16} | {:>16} | {:>16}", "", "Mean", "P95", "P99", "P99.9");
        print_tail("Gross", g);
        print_tail("Retained", r);
    }

    if let (Some(inputs), Some(c)) = (&report.capital_inputs, &report.capital) {
        println!("\n=== Capital relief ===");
        println!("  UL gross:        {:>16.2}", inputs.ul_gross);
        println!("  UL net:          {:>16.2}", inputs.ul_net);
        println!("  PD (insurer):    {:>16.4}", inputs.pd_a);
        println!("  Insured limit:   {:>16.2}", inputs.l_insured);
        println!("  EL default:      {:>16.2}", c.el_default);
        println!("  UL default:      {:>16.2}", c.ul_default);
        println!("  Nominal relief:  {:>16.2}", c.nominal_relief);
        println!("  Final relief:    {:>16.2}", c.final_relief);
    }

    // ── Cumulative trend: ten checkpoints ────────────────────────────────────
    let trend = report.cumulative_trend();
    if !trend.gross.is_empty() {
        println!("\n=== Cumulative losses ===");
        println!("{:>6} | {:>18} | {:>18}", "Event", "Cum. gross", "Cum. retained");
        let step = (trend.gross.len() / 10).max(1);
        for i in (step - 1..trend.gross.len()).step_by(step) {
            println!("{:>6} | {:>18.2} | {:>18.2}", i + 1, trend.gross[i], trend.retained[i]);
        }
        println!("  Cumulative amount transferred: {:.2}", trend.final_gap());
    }

    let curve = report.payout_curve(transfer::DEFAULT_CURVE_POINTS);
    println!("\n=== Payout function ===");
    println!("{:>16} | {:>16} | {:>16}", "Gross", "Payout", "Retained");
    let step = (curve.gross.len() / 8).max(1);
    for i in (0..curve.gross.len()).step_by(step) {
        println!("{:>16.2} | {:>16.2} | {:>16.2}", curve.gross[i], curve.payout[i], curve.retained[i]);
    }
}

fn print_tail(label: &str, t: &TailRisk) {
    println!("{:>9} | {:>16.2} | {:>16.2} | {:>16.2} | {:>16.2}", label, t.mean, t.p95, t.p99, t.p999);
}

fn print_all_runs(reports: &[ScenarioReport]) {
    println!("\n=== Per-run totals ===");
    println!(
        "{:>6} | {:>18} | {:>18} | {:>18} | {:>7} | {:>16}",
        "Seed", "Gross", "Transferred", "Retained", "Xfer%", "Final relief"
    );
    println!("{}", "-".repeat(6 + 3 + 18 + 3 + 18 + 3 + 18 + 3 + 7 + 3 + 16));
    for r in reports {
        let s = r.summary;
        let relief = r
            .capital
            .map(|c| format!("{:>16.2}", c.final_relief))
            .unwrap_or_else(|| format!("{:>16}", "-"));
        println!(
            "{:>6} | {:>18.2} | {:>18.2} | {:>18.2} | {:>6.1}% | {}",
            r.seed,
            s.total_gross,
            s.total_transferred,
            s.total_retained,
            s.transfer_ratio() * 100.0,
            relief,
        );
    }
}

fn print_distributions(d: &RunDistributions) {
    println!("\n=== Cross-run distributions ({} runs) ===", d.runs);
    println!(
        "{:<16} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14}",
        "Metric", "P5", "P25", "P50", "P75", "P95", "Mean"
    );
    print_dist("Total gross", &d.total_gross);
    print_dist("Transferred", &d.total_transferred);
    print_dist("Retained", &d.total_retained);
    print_dist("Transfer ratio", &d.transfer_ratio);
    if let Some(relief) = &d.final_relief {
        print_dist("Final relief", relief);
    }
}

fn print_dist(label: &str, s: &DistStats) {
    println!(
        "{:<16} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2}",
        label, s.p5, s.p25, s.p50, s.p75, s.p95, s.mean
    );
}
