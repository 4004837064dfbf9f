//! tr_core — Core domain types for the tax-reform transition simulator.
//!
//! This crate is **I/O-free**. It defines the stable types and helpers used
//! across the workspace (`tr_io`, `tr_chart`, `tr_pipeline`, `tr_report`,
//! `tr_cli`):
//!
//! - `Scenario`: the closed set of growth trajectories
//! - Numeric guards: `safe_div` / `coerce`, the only fallbacks any
//!   computation may use
//! - `SimulationRequest` and its component records, with domain bounds
//! - Calendar constants for the 2029-2032 phase-in and the 2033 final year
//!
//! Serialization derives are gated behind the `serde` feature.

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain parsing.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidScenario,
        InvalidMode,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidScenario => write!(f, "invalid scenario name"),
                CoreError::InvalidMode => write!(f, "invalid calculation mode"),
            }
        }
    }
}

pub mod calendar {
    //! Fixed years of the reform timetable.

    /// Phase-in years the engine reports transition rows for, in order.
    pub const TRANSITION_YEARS: [i32; 4] = [2029, 2030, 2031, 2032];

    /// The year the new taxes fully replace the old ones. `meta.final_year`
    /// always carries this constant, independent of the request's base year.
    pub const FINAL_YEAR: i32 = 2033;
}

pub mod scenario {
    //! The three growth trajectories, as a closed enum.
    //!
    //! Per-scenario computations match on `Scenario`, so a missing arm is a
    //! compile error rather than a silently absent summary.

    use crate::errors::CoreError;
    use core::fmt;
    use core::str::FromStr;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
    pub enum Scenario {
        Optimistic,
        Conservative,
        Pessimistic,
    }

    impl Scenario {
        /// All scenarios in reporting order.
        pub const ALL: [Scenario; 3] = [
            Scenario::Optimistic,
            Scenario::Conservative,
            Scenario::Pessimistic,
        ];

        /// Wire token, exactly as the engine spells its keys.
        pub fn as_str(self) -> &'static str {
            match self {
                Scenario::Optimistic => "optimistic",
                Scenario::Conservative => "conservative",
                Scenario::Pessimistic => "pessimistic",
            }
        }

        /// Human-facing label for tables and chart legends.
        pub fn label(self) -> &'static str {
            match self {
                Scenario::Optimistic => "Optimistic",
                Scenario::Conservative => "Conservative",
                Scenario::Pessimistic => "Pessimistic",
            }
        }
    }

    impl fmt::Display for Scenario {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for Scenario {
        type Err = CoreError;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "optimistic" => Ok(Scenario::Optimistic),
                "conservative" => Ok(Scenario::Conservative),
                "pessimistic" => Ok(Scenario::Pessimistic),
                _ => Err(CoreError::InvalidScenario),
            }
        }
    }
}

pub mod numeric {
    //! The two numeric fallbacks every computation routes through. No other
    //! ad-hoc zero checks are permitted in the workspace.

    /// Guarded division. Divides only when `den > 0` and the quotient is
    /// finite; returns `0.0` otherwise. Never yields NaN or an infinity.
    #[inline]
    pub fn safe_div(num: f64, den: f64) -> f64 {
        if den > 0.0 {
            let q = num / den;
            if q.is_finite() {
                q
            } else {
                0.0
            }
        } else {
            0.0
        }
    }

    /// Collapse NaN and infinities to `0.0`. The parse-boundary twin of this
    /// rule (missing or non-numeric JSON → `0.0`) lives in `tr_io`'s lenient
    /// deserializers; this is the in-process half.
    #[inline]
    pub fn coerce(v: f64) -> f64 {
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }
}

pub mod request {
    //! The simulation request and its component records.
    //!
    //! Domain bounds live here as constants; the admission pass in
    //! `tr_pipeline::validate` reports violations without mutating the
    //! request. An absent `policy` stays absent; the engine owns its
    //! defaults, this crate never injects one.

    use crate::errors::CoreError;
    use crate::scenario::Scenario;
    use core::fmt;
    use core::str::FromStr;
    use std::collections::BTreeMap;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    /// Growth rates outside this closed interval fail admission.
    pub const GROWTH_RATE_MIN: f64 = -1.0;
    pub const GROWTH_RATE_MAX: f64 = 5.0;

    /// Annual revenue split; the sum is the effective-rate denominator.
    #[derive(Clone, Copy, Debug, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Revenue {
        pub goods_annual: f64,
        pub services_annual: f64,
    }

    impl Revenue {
        pub fn annual_total(&self) -> f64 {
            self.goods_annual + self.services_annual
        }
    }

    /// Prior-year taxes actually paid, per tax head.
    #[derive(Clone, Copy, Debug, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct LastYearTaxes {
        pub icms: f64,
        pub iss: f64,
        pub pis_cofins: f64,
    }

    impl LastYearTaxes {
        /// The baseline total all projected deltas are measured against.
        pub fn total(&self) -> f64 {
            self.icms + self.iss + self.pis_cofins
        }
    }

    /// Per-scenario annual growth assumptions.
    #[derive(Clone, Copy, Debug, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct GrowthRates {
        pub optimistic: f64,
        pub conservative: f64,
        pub pessimistic: f64,
    }

    impl GrowthRates {
        pub fn get(&self, scenario: Scenario) -> f64 {
            match scenario {
                Scenario::Optimistic => self.optimistic,
                Scenario::Conservative => self.conservative,
                Scenario::Pessimistic => self.pessimistic,
            }
        }
    }

    /// Phase-in policy forwarded verbatim to the engine. Year keys are the
    /// engine's string form ("2029".."2032").
    #[derive(Clone, Debug, Default, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct Policy {
        pub transition_years: Vec<i32>,
        pub icms_iss_reduction: BTreeMap<String, f64>,
        pub ibs_increase: BTreeMap<String, f64>,
    }

    /// Optional 2033 rate overrides for the engine's rate-based mode.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "serde", serde(default))]
    pub struct RatesOverride {
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        pub ibs_rate: Option<f64>,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        pub cbs_rate: Option<f64>,
    }

    /// Engine computation mode. `Neutral` is the documented default.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
    pub enum CalculationMode {
        #[default]
        Neutral,
        RateBased,
    }

    impl CalculationMode {
        pub fn as_str(self) -> &'static str {
            match self {
                CalculationMode::Neutral => "neutral",
                CalculationMode::RateBased => "rate_based",
            }
        }
    }

    impl fmt::Display for CalculationMode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for CalculationMode {
        type Err = CoreError;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "neutral" => Ok(CalculationMode::Neutral),
                "rate_based" => Ok(CalculationMode::RateBased),
                _ => Err(CoreError::InvalidMode),
            }
        }
    }

    /// One complete simulation request. Immutable once built; constructed
    /// once per run.
    #[derive(Clone, Debug, PartialEq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct SimulationRequest {
        pub base_year: i32,
        pub revenue: Revenue,
        pub last_year_taxes_paid: LastYearTaxes,
        pub growth_rates: GrowthRates,
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        pub policy: Option<Policy>,
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        pub calculation_mode: Option<CalculationMode>,
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        pub rates_override: Option<RatesOverride>,
    }

    impl SimulationRequest {
        /// Mode with the documented default applied.
        pub fn mode(&self) -> CalculationMode {
            self.calculation_mode.unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::numeric::{coerce, safe_div};
    use super::request::{CalculationMode, GrowthRates, LastYearTaxes, Revenue};
    use super::scenario::Scenario;

    #[test]
    fn safe_div_guards_zero_and_negative_denominators() {
        assert_eq!(safe_div(20.0, 0.0), 0.0);
        assert_eq!(safe_div(20.0, -5.0), 0.0);
        assert_eq!(safe_div(20.0, 120.0), 20.0 / 120.0);
    }

    #[test]
    fn safe_div_never_yields_non_finite() {
        assert_eq!(safe_div(1.0, f64::NAN), 0.0);
        assert_eq!(safe_div(f64::NAN, 1.0), 0.0);
        assert_eq!(safe_div(f64::INFINITY, 2.0), 0.0);
        // Overflowing quotient is caught by the finiteness check.
        assert_eq!(safe_div(f64::MAX, f64::MIN_POSITIVE), 0.0);
        assert_eq!(safe_div(0.0, 0.0), 0.0);
    }

    #[test]
    fn coerce_collapses_non_finite() {
        assert_eq!(coerce(f64::NAN), 0.0);
        assert_eq!(coerce(f64::INFINITY), 0.0);
        assert_eq!(coerce(f64::NEG_INFINITY), 0.0);
        assert_eq!(coerce(12.5), 12.5);
        assert_eq!(coerce(-3.0), -3.0);
    }

    #[test]
    fn scenario_wire_tokens_round_trip() {
        for s in Scenario::ALL {
            assert_eq!(s.as_str().parse::<Scenario>().unwrap(), s);
        }
        assert!("OPTIMISTIC".parse::<Scenario>().is_err());
        assert!("".parse::<Scenario>().is_err());
    }

    #[test]
    fn growth_rates_lookup_matches_fields() {
        let g = GrowthRates { optimistic: 0.1, conservative: 0.05, pessimistic: 0.0 };
        assert_eq!(g.get(Scenario::Optimistic), 0.1);
        assert_eq!(g.get(Scenario::Conservative), 0.05);
        assert_eq!(g.get(Scenario::Pessimistic), 0.0);
    }

    #[test]
    fn totals_sum_component_fields() {
        let t = LastYearTaxes { icms: 70.0, iss: 30.0, pis_cofins: 20.0 };
        assert_eq!(t.total(), 120.0);
        let r = Revenue { goods_annual: 600.0, services_annual: 400.0 };
        assert_eq!(r.annual_total(), 1000.0);
    }

    #[test]
    fn calculation_mode_defaults_to_neutral() {
        assert_eq!(CalculationMode::default().as_str(), "neutral");
        assert_eq!("rate_based".parse::<CalculationMode>().unwrap(), CalculationMode::RateBased);
        assert!("RATE_BASED".parse::<CalculationMode>().is_err());
    }
}
