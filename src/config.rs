use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::capital::CapitalAssumptions;
use crate::error::{Error, SamplingError};
use crate::severity::{DistributionKind, DistributionSpec};
use crate::types::MitigationPolicy;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_NUM_EVENTS: usize = 1_000;
pub const DEFAULT_DEDUCTIBLE: f64 = 1_000_000.0;
pub const DEFAULT_COVER: f64 = 5_000_000.0;

/// Fully validated inputs for one scenario run.
///
/// Range limits on user input (event count, parameter sliders) belong to the
/// caller; this type only guarantees the distribution is well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub num_events: usize,
    pub distribution: DistributionSpec,
    pub policy: MitigationPolicy,
    pub capital: CapitalAssumptions,
}

impl ScenarioConfig {
    pub fn canonical() -> Self {
        ScenarioConfig {
            seed: DEFAULT_SEED,
            num_events: DEFAULT_NUM_EVENTS,
            distribution: default_distribution(DistributionKind::Lognormal),
            policy: MitigationPolicy::new(DEFAULT_DEDUCTIBLE, DEFAULT_COVER),
            capital: CapitalAssumptions::default(),
        }
    }

    /// Validate an untyped scenario, e.g. one posted by a UI form.
    pub fn from_raw(raw: RawScenario) -> Result<Self, SamplingError> {
        let distribution =
            DistributionSpec::from_params(&raw.distribution_type, &raw.distribution_params)?;
        Ok(ScenarioConfig {
            seed: raw.seed,
            num_events: raw.num_events,
            distribution,
            policy: MitigationPolicy::new(raw.deductible, raw.cover),
            capital: raw.capital,
        })
    }

    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        let raw: RawScenario = serde_json::from_str(s)?;
        Ok(Self::from_raw(raw)?)
    }

    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        Self::from_json_str(&text)
    }

    /// Same scenario with a different seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        ScenarioConfig { seed, ..self.clone() }
    }
}

/// Scenario as received from outside the process: the distribution is a name
/// plus a free-form parameter map.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScenario {
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub num_events: usize,
    pub distribution_type: String,
    #[serde(default)]
    pub distribution_params: Map<String, Value>,
    pub deductible: f64,
    pub cover: f64,
    #[serde(default)]
    pub capital: CapitalAssumptions,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Starting parameters for each family.
pub fn default_distribution(kind: DistributionKind) -> DistributionSpec {
    match kind {
        // mu=8, sigma=1 → median ≈ 2_981, mean ≈ 4_915
        DistributionKind::Lognormal => DistributionSpec::Lognormal { mu: 8.0, sigma: 1.0 },
        DistributionKind::Pareto => DistributionSpec::Pareto { xm: 10_000.0, alpha: 2.0 },
        // mean 10_000
        DistributionKind::Exponential => DistributionSpec::Exponential { lambda: 0.0001 },
    }
}
