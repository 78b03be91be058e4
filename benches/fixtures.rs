use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use lossmit::capital::CapitalAssumptions;
use lossmit::config::ScenarioConfig;
use lossmit::severity::{self, DistributionSpec};
use lossmit::types::{LossSample, MitigationPolicy};

pub struct Scenario {
    pub num_events: usize,
    pub deductible: f64,
    pub cover: f64,
}

pub const SMALL: Scenario = Scenario { num_events: 100, deductible: 1_000_000.0, cover: 5_000_000.0 };

pub const MEDIUM: Scenario = Scenario { num_events: 1_000, deductible: 1_000_000.0, cover: 5_000_000.0 };

pub const LARGE: Scenario = Scenario { num_events: 5_000, deductible: 1_000_000.0, cover: 5_000_000.0 };

/// Heavy-tailed severities so a good share of events reach the policy layer.
pub fn pareto() -> DistributionSpec {
    DistributionSpec::Pareto { xm: 200_000.0, alpha: 1.5 }
}

pub fn policy(scenario: &Scenario) -> MitigationPolicy {
    MitigationPolicy::new(scenario.deductible, scenario.cover)
}

pub fn presampled(n: usize, seed: u64) -> LossSample {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    severity::sample(n, &pareto(), &mut rng).expect("valid fixture distribution")
}

pub fn build_config(scenario: &Scenario, seed: u64) -> ScenarioConfig {
    ScenarioConfig {
        seed,
        num_events: scenario.num_events,
        distribution: pareto(),
        policy: policy(scenario),
        capital: CapitalAssumptions::default(),
    }
}
