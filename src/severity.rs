use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal, Pareto};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SamplingError;
use crate::types::{LossEvent, LossSample};

/// First calendar day timestamps are drawn from.
pub const SAMPLE_WINDOW_START: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(d) => d,
    None => panic!("invalid sample window start"),
};

/// Last calendar day (inclusive) timestamps are drawn from.
pub const SAMPLE_WINDOW_END: NaiveDate = match NaiveDate::from_ymd_opt(2023, 12, 31) {
    Some(d) => d,
    None => panic!("invalid sample window end"),
};

/// Distribution family as selected by name from untyped input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DistributionKind {
    Lognormal,
    Pareto,
    Exponential,
}

impl DistributionKind {
    pub const ALL: [DistributionKind; 3] =
        [DistributionKind::Lognormal, DistributionKind::Pareto, DistributionKind::Exponential];
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistributionKind::Lognormal => "Lognormal",
            DistributionKind::Pareto => "Pareto",
            DistributionKind::Exponential => "Exponential",
        };
        f.write_str(name)
    }
}

impl FromStr for DistributionKind {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistributionKind::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                SamplingError::configuration(format!(
                    "unknown distribution '{s}' (expected Lognormal, Pareto or Exponential)"
                ))
            })
    }
}

/// Loss severity law with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DistributionSpec {
    /// Log-normal; ln-space location `mu`, scale `sigma > 0`.
    /// E[X] = exp(mu + sigma²/2).
    Lognormal { mu: f64, sigma: f64 },
    /// Pareto with minimum `xm > 0` and tail index `alpha > 0`; support [xm, ∞).
    /// E[X] = xm * alpha / (alpha − 1)  (finite only for alpha > 1).
    Pareto { xm: f64, alpha: f64 },
    /// Exponential with rate `lambda > 0`; E[X] = 1/lambda.
    Exponential { lambda: f64 },
}

impl DistributionSpec {
    pub fn lognormal(mu: f64, sigma: f64) -> Result<Self, SamplingError> {
        let spec = DistributionSpec::Lognormal { mu, sigma };
        spec.validate()?;
        Ok(spec)
    }

    pub fn pareto(xm: f64, alpha: f64) -> Result<Self, SamplingError> {
        let spec = DistributionSpec::Pareto { xm, alpha };
        spec.validate()?;
        Ok(spec)
    }

    pub fn exponential(lambda: f64) -> Result<Self, SamplingError> {
        let spec = DistributionSpec::Exponential { lambda };
        spec.validate()?;
        Ok(spec)
    }

    /// Build a spec from a distribution name and an untyped parameter map.
    ///
    /// A missing key is a configuration error; a key holding anything other
    /// than a JSON number is a type error. Exponential also accepts `lambda_`.
    pub fn from_params(kind: &str, params: &Map<String, Value>) -> Result<Self, SamplingError> {
        let kind: DistributionKind = kind.parse()?;
        match kind {
            DistributionKind::Lognormal => Self::lognormal(
                number_param(params, kind, &["mu"])?,
                number_param(params, kind, &["sigma"])?,
            ),
            DistributionKind::Pareto => Self::pareto(
                number_param(params, kind, &["xm"])?,
                number_param(params, kind, &["alpha"])?,
            ),
            DistributionKind::Exponential => {
                Self::exponential(number_param(params, kind, &["lambda", "lambda_"])?)
            }
        }
    }

    pub fn kind(&self) -> DistributionKind {
        match self {
            DistributionSpec::Lognormal { .. } => DistributionKind::Lognormal,
            DistributionSpec::Pareto { .. } => DistributionKind::Pareto,
            DistributionSpec::Exponential { .. } => DistributionKind::Exponential,
        }
    }

    /// Check every parameter is finite and inside the family's domain.
    pub fn validate(&self) -> Result<(), SamplingError> {
        let kind = self.kind();
        match *self {
            DistributionSpec::Lognormal { mu, sigma } => {
                require_finite(kind, "mu", mu)?;
                require_positive(kind, "sigma", sigma)
            }
            DistributionSpec::Pareto { xm, alpha } => {
                require_positive(kind, "xm", xm)?;
                require_positive(kind, "alpha", alpha)
            }
            DistributionSpec::Exponential { lambda } => require_positive(kind, "lambda", lambda),
        }
    }

    /// Theoretical mean; infinite for Pareto with alpha <= 1.
    pub fn mean(&self) -> f64 {
        match *self {
            DistributionSpec::Lognormal { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
            DistributionSpec::Pareto { xm, alpha } => {
                if alpha > 1.0 {
                    xm * alpha / (alpha - 1.0)
                } else {
                    f64::INFINITY
                }
            }
            DistributionSpec::Exponential { lambda } => 1.0 / lambda,
        }
    }

    /// Draw `n` independent severities.
    pub fn draw(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<f64>, SamplingError> {
        self.validate()?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let kind = self.kind();
        let out = match *self {
            DistributionSpec::Lognormal { mu, sigma } => {
                let dist = LogNormal::new(mu, sigma).map_err(|e| invalid(kind, e))?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
            DistributionSpec::Pareto { xm, alpha } => {
                // Pareto(1, alpha) is the standard (Lomax) variate shifted by one.
                let dist = Pareto::new(1.0, alpha).map_err(|e| invalid(kind, e))?;
                (0..n).map(|_| dist.sample(rng) * xm).collect()
            }
            DistributionSpec::Exponential { lambda } => {
                let dist = Exp::new(lambda).map_err(|e| invalid(kind, e))?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
        };
        Ok(out)
    }
}

impl fmt::Display for DistributionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionSpec::Lognormal { mu, sigma } => write!(f, "Lognormal(mu={mu}, sigma={sigma})"),
            DistributionSpec::Pareto { xm, alpha } => write!(f, "Pareto(xm={xm}, alpha={alpha})"),
            DistributionSpec::Exponential { lambda } => write!(f, "Exponential(lambda={lambda})"),
        }
    }
}

/// Draw `n` loss events from `spec`.
///
/// Severities are drawn before timestamps, so for a given generator state the
/// gross losses are the same whether or not dates are attached.
pub fn sample(
    n: usize,
    spec: &DistributionSpec,
    rng: &mut impl Rng,
) -> Result<LossSample, SamplingError> {
    let severities = spec.draw(n, rng)?;
    let dates = sample_timestamps(n, rng);
    let events = severities
        .into_iter()
        .zip(dates)
        .map(|(gross_loss, timestamp)| LossEvent { timestamp, gross_loss })
        .collect();
    Ok(LossSample::from_events(events))
}

/// [`sample`] using the calling thread's generator. Not reproducible.
pub fn sample_default(n: usize, spec: &DistributionSpec) -> Result<LossSample, SamplingError> {
    sample(n, spec, &mut rand::rng())
}

/// Uniform calendar dates over [`SAMPLE_WINDOW_START`, `SAMPLE_WINDOW_END`].
pub fn sample_timestamps(n: usize, rng: &mut impl Rng) -> Vec<NaiveDate> {
    let span = (SAMPLE_WINDOW_END - SAMPLE_WINDOW_START).num_days() as u64;
    (0..n)
        .map(|_| SAMPLE_WINDOW_START + Days::new(rng.random_range(0..=span)))
        .collect()
}

fn number_param(
    params: &Map<String, Value>,
    kind: DistributionKind,
    keys: &[&str],
) -> Result<f64, SamplingError> {
    let (key, value) = keys
        .iter()
        .find_map(|k| params.get(*k).map(|v| (*k, v)))
        .ok_or_else(|| {
            SamplingError::configuration(format!("missing parameter '{}' for {kind}", keys[0]))
        })?;
    value.as_f64().ok_or_else(|| SamplingError::Type {
        parameter: key.to_string(),
        expected: "a number",
        found: json_kind(value),
    })
}

fn json_kind(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

fn require_finite(kind: DistributionKind, name: &str, value: f64) -> Result<(), SamplingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SamplingError::configuration(format!("{kind} {name} must be finite, got {value}")))
    }
}

fn require_positive(kind: DistributionKind, name: &str, value: f64) -> Result<(), SamplingError> {
    require_finite(kind, name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(SamplingError::configuration(format!("{kind} {name} must be > 0, got {value}")))
    }
}

fn invalid(kind: DistributionKind, err: impl fmt::Display) -> SamplingError {
    SamplingError::configuration(format!("invalid {kind} parameters: {err}"))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    use super::*;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn params(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn all_specs() -> Vec<DistributionSpec> {
        vec![
            DistributionSpec::lognormal(0.0, 1.0).unwrap(),
            DistributionSpec::pareto(10_000.0, 2.0).unwrap(),
            DistributionSpec::exponential(0.0001).unwrap(),
        ]
    }

    #[test]
    fn zero_events_is_empty_for_every_distribution() {
        let mut rng = rng();
        for spec in all_specs() {
            let s = sample(0, &spec, &mut rng).unwrap();
            assert!(s.is_empty(), "{spec} produced {} events", s.len());
        }
    }

    #[test]
    fn lognormal_hundred_events_strictly_positive() {
        let spec = DistributionSpec::lognormal(0.0, 1.0).unwrap();
        let s = sample(100, &spec, &mut rng()).unwrap();
        assert_eq!(s.len(), 100);
        assert!(s.iter().all(|e| e.gross_loss > 0.0));
    }

    #[test]
    fn lognormal_zero_sigma_is_configuration_error() {
        let err = DistributionSpec::lognormal(0.0, 0.0).unwrap_err();
        assert!(matches!(err, SamplingError::Configuration(_)), "{err:?}");

        // A variant built directly still fails at sampling time.
        let raw = DistributionSpec::Lognormal { mu: 0.0, sigma: 0.0 };
        let err = sample(100, &raw, &mut rng()).unwrap_err();
        assert!(matches!(err, SamplingError::Configuration(_)), "{err:?}");
    }

    #[test]
    fn non_positive_parameters_rejected() {
        assert!(DistributionSpec::pareto(0.0, 2.0).is_err());
        assert!(DistributionSpec::pareto(100.0, -1.0).is_err());
        assert!(DistributionSpec::exponential(0.0).is_err());
        assert!(DistributionSpec::lognormal(f64::NAN, 1.0).is_err());
        assert!(DistributionSpec::lognormal(0.0, f64::INFINITY).is_err());
    }

    /// Lognormal(mu=8, sigma=1): E[X] = exp(8.5) ≈ 4915.
    /// 10k samples must land within ±20 % of that.
    #[test]
    fn lognormal_mean_in_expected_range() {
        let spec = DistributionSpec::lognormal(8.0, 1.0).unwrap();
        let n = 10_000;
        let draws = spec.draw(n, &mut rng()).unwrap();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let expected = spec.mean();
        assert!(
            mean >= expected * 0.80 && mean <= expected * 1.20,
            "Lognormal mean {mean:.0} outside ±20% of {expected:.0}"
        );
    }

    #[test]
    fn pareto_support_starts_at_xm() {
        let spec = DistributionSpec::pareto(10_000.0, 2.0).unwrap();
        let draws = spec.draw(5_000, &mut rng()).unwrap();
        assert!(draws.iter().all(|&x| x >= 10_000.0));
    }

    #[test]
    fn exponential_mean_is_inverse_rate() {
        let spec = DistributionSpec::exponential(0.001).unwrap();
        let n = 20_000;
        let draws = spec.draw(n, &mut rng()).unwrap();
        let mean = draws.iter().sum::<f64>() / n as f64;
        assert!(draws.iter().all(|&x| x >= 0.0));
        assert!((mean - 1_000.0).abs() < 50.0, "mean {mean:.1} not near 1000");
    }

    /// Pareto with alpha=1.5 has a heavier right tail than a Lognormal with
    /// roughly the same median. Compare 99th percentiles from 10k samples each.
    #[test]
    fn pareto_tail_heavier_than_lognormal() {
        let pareto = DistributionSpec::pareto(100_000.0, 1.5).unwrap();
        let lognorm = DistributionSpec::lognormal((150_000_f64).ln(), 0.5).unwrap();
        let mut rng = rng();
        let n = 10_000usize;

        let mut p = pareto.draw(n, &mut rng).unwrap();
        let mut l = lognorm.draw(n, &mut rng).unwrap();
        p.sort_by(|a, b| a.total_cmp(b));
        l.sort_by(|a, b| a.total_cmp(b));

        let p99_pareto = p[n * 99 / 100];
        let p99_lognorm = l[n * 99 / 100];
        assert!(
            p99_pareto > p99_lognorm,
            "Pareto 99th pct {p99_pareto:.0} should exceed Lognormal 99th pct {p99_lognorm:.0}"
        );
    }

    #[test]
    fn same_seed_reproduces_sample() {
        let spec = DistributionSpec::pareto(10_000.0, 2.0).unwrap();
        let a = sample(250, &spec, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let b = sample(250, &spec, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn timestamps_do_not_shift_severities() {
        let spec = DistributionSpec::lognormal(8.0, 1.0).unwrap();
        let with_dates = sample(50, &spec, &mut rng()).unwrap();
        let bare = spec.draw(50, &mut rng()).unwrap();
        assert_eq!(with_dates.gross_losses(), bare);
    }

    #[test]
    fn thread_generator_sample_is_valid() {
        let spec = DistributionSpec::exponential(0.001).unwrap();
        let s = sample_default(100, &spec).unwrap();
        assert_eq!(s.len(), 100);
        assert!(s.iter().all(|e| e.gross_loss >= 0.0));
        assert!(sample_default(1, &DistributionSpec::Exponential { lambda: -1.0 }).is_err());
    }

    #[test]
    fn timestamps_within_window() {
        let dates = sample_timestamps(2_000, &mut rng());
        assert!(dates.iter().all(|d| *d >= SAMPLE_WINDOW_START && *d <= SAMPLE_WINDOW_END));
        // 2000 uniform draws over 365 days should hit both halves of the year.
        let mid = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        assert!(dates.iter().any(|d| *d < mid));
        assert!(dates.iter().any(|d| *d >= mid));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("lognormal".parse::<DistributionKind>().unwrap(), DistributionKind::Lognormal);
        assert_eq!(" Pareto ".parse::<DistributionKind>().unwrap(), DistributionKind::Pareto);
        assert!(matches!(
            "Gamma".parse::<DistributionKind>(),
            Err(SamplingError::Configuration(_))
        ));
    }

    #[test]
    fn from_params_builds_each_family() {
        let ln = DistributionSpec::from_params("Lognormal", &params(json!({"mu": 8.0, "sigma": 1.0})));
        assert_eq!(ln.unwrap(), DistributionSpec::Lognormal { mu: 8.0, sigma: 1.0 });

        let pa = DistributionSpec::from_params("Pareto", &params(json!({"xm": 100, "alpha": 2})));
        assert_eq!(pa.unwrap(), DistributionSpec::Pareto { xm: 100.0, alpha: 2.0 });

        let ex = DistributionSpec::from_params("Exponential", &params(json!({"lambda_": 0.5})));
        assert_eq!(ex.unwrap(), DistributionSpec::Exponential { lambda: 0.5 });
    }

    #[test]
    fn from_params_missing_key_is_configuration_error() {
        let err = DistributionSpec::from_params("Lognormal", &params(json!({"mu": 0.0}))).unwrap_err();
        match err {
            SamplingError::Configuration(msg) => assert!(msg.contains("sigma"), "{msg}"),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn from_params_non_numeric_is_type_error() {
        let err =
            DistributionSpec::from_params("Pareto", &params(json!({"xm": "abc", "alpha": 2.0})))
                .unwrap_err();
        match err {
            SamplingError::Type { parameter, found, .. } => {
                assert_eq!(parameter, "xm");
                assert!(found.contains("abc"));
            }
            other => panic!("expected Type, got {other:?}"),
        }
    }

    #[test]
    fn from_params_unknown_kind_is_configuration_error() {
        let err = DistributionSpec::from_params("Weibull", &Map::new()).unwrap_err();
        assert!(matches!(err, SamplingError::Configuration(_)));
    }

    #[test]
    fn pareto_mean_infinite_for_light_alpha() {
        assert!(DistributionSpec::pareto(1.0, 1.0).unwrap().mean().is_infinite());
        assert!((DistributionSpec::pareto(1.0, 2.0).unwrap().mean() - 2.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn sample_has_n_non_negative_values(
            n in 0usize..300,
            seed in any::<u64>(),
            which in 0usize..3,
        ) {
            let spec = all_specs()[which];
            let s = sample(n, &spec, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap();
            prop_assert_eq!(s.len(), n);
            prop_assert!(s.iter().all(|e| e.gross_loss >= 0.0 && e.gross_loss.is_finite()));
        }
    }
}
