//! Capital relief from mitigation, net of the risk that the insurer defaults.
//!
//! Relief is the drop in unexpected loss from gross to net. Capital must still
//! be held against the insurer failing to pay, so the expected and unexpected
//! loss from insurer default are deducted from the nominal figure.

use serde::{Deserialize, Serialize};

/// Fixed conservatism multiplier on the binomial variance term of the
/// insurer-default unexpected loss.
pub const UL_DEFAULT_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapitalRelief {
    /// Expected loss from insurer default: `pd_a * l_insured`.
    pub el_default: f64,
    /// Unexpected loss from insurer default:
    /// `UL_DEFAULT_MULTIPLIER * pd_a * (1 - pd_a) * l_insured`.
    pub ul_default: f64,
    /// `ul_gross - ul_net`.
    pub nominal_relief: f64,
    /// `nominal_relief - (el_default + ul_default)`.
    pub final_relief: f64,
}

/// Risk-adjusted capital relief.
///
/// `pd_a` is the insurer's probability of default and `l_insured` the insured
/// limit exposed to that default. Values of `pd_a` outside [0, 1] are not
/// rejected; the arithmetic is applied as given.
pub fn estimate_relief(ul_gross: f64, ul_net: f64, pd_a: f64, l_insured: f64) -> CapitalRelief {
    let el_default = pd_a * l_insured;
    let ul_default = UL_DEFAULT_MULTIPLIER * pd_a * (1.0 - pd_a) * l_insured;
    let nominal_relief = ul_gross - ul_net;
    CapitalRelief {
        el_default,
        ul_default,
        nominal_relief,
        final_relief: nominal_relief - (el_default + ul_default),
    }
}

/// The four inputs of [`estimate_relief`], as carried by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalInputs {
    pub ul_gross: f64,
    pub ul_net: f64,
    pub pd_a: f64,
    pub l_insured: f64,
}

impl CapitalInputs {
    pub fn estimate(&self) -> CapitalRelief {
        estimate_relief(self.ul_gross, self.ul_net, self.pd_a, self.l_insured)
    }
}

/// Capital assumptions for a scenario. Unexpected-loss figures left unset
/// are derived from the sample; an unset insured limit defaults to the
/// policy cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalAssumptions {
    #[serde(default)]
    pub ul_gross: Option<f64>,
    #[serde(default)]
    pub ul_net: Option<f64>,
    #[serde(default = "default_pd_a")]
    pub pd_a: f64,
    #[serde(default)]
    pub l_insured: Option<f64>,
}

/// Insurer default probability used when none is supplied (1 %).
pub const DEFAULT_PD_A: f64 = 0.01;

fn default_pd_a() -> f64 {
    DEFAULT_PD_A
}

impl Default for CapitalAssumptions {
    fn default() -> Self {
        CapitalAssumptions { ul_gross: None, ul_net: None, pd_a: DEFAULT_PD_A, l_insured: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, what: &str) {
        assert!((actual - expected).abs() < 1e-9, "{what}: {actual} != {expected}");
    }

    #[test]
    fn relief_known_values() {
        let r = estimate_relief(100.0, 50.0, 0.01, 1000.0);
        assert_close(r.el_default, 10.0, "el_default");
        assert_close(r.ul_default, 29.7, "ul_default");
        assert_close(r.nominal_relief, 50.0, "nominal_relief");
        assert_close(r.final_relief, 10.3, "final_relief");
    }

    #[test]
    fn riskless_insurer_keeps_full_relief() {
        let r = estimate_relief(500.0, 200.0, 0.0, 1_000_000.0);
        assert_eq!(r.el_default, 0.0);
        assert_eq!(r.ul_default, 0.0);
        assert_eq!(r.final_relief, 300.0);
    }

    #[test]
    fn certain_default_has_no_variance_term() {
        let r = estimate_relief(500.0, 200.0, 1.0, 100.0);
        assert_close(r.el_default, 100.0, "el_default");
        assert_close(r.ul_default, 0.0, "ul_default");
        assert_close(r.final_relief, 200.0, "final_relief");
    }

    #[test]
    fn relief_can_turn_negative() {
        let r = estimate_relief(60.0, 50.0, 0.05, 1_000.0);
        assert!(r.final_relief < 0.0, "default cost exceeds nominal relief: {r:?}");
    }

    #[test]
    fn out_of_domain_pd_is_computed_not_rejected() {
        let r = estimate_relief(100.0, 50.0, 1.5, 100.0);
        assert_close(r.el_default, 150.0, "el_default");
        assert_close(r.ul_default, 3.0 * 1.5 * -0.5 * 100.0, "ul_default");
    }

    #[test]
    fn inputs_delegate_to_estimate() {
        let inputs = CapitalInputs { ul_gross: 100.0, ul_net: 50.0, pd_a: 0.01, l_insured: 1000.0 };
        assert_eq!(inputs.estimate(), estimate_relief(100.0, 50.0, 0.01, 1000.0));
    }

    #[test]
    fn assumptions_fill_defaults_from_json() {
        let a: CapitalAssumptions = serde_json::from_str(r#"{"ul_gross": 10.0}"#).unwrap();
        assert_eq!(a.ul_gross, Some(10.0));
        assert_eq!(a.ul_net, None);
        assert_eq!(a.pd_a, DEFAULT_PD_A);
        assert_eq!(a.l_insured, None);
    }
}
