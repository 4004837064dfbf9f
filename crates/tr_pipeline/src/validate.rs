//! Structural and semantic validation before any computation.
//!
//! The request is admitted or rejected here; the engine result is only
//! inspected for warnings, since enrichment degrades malformed engine data
//! to zeros instead of failing. Validation never mutates its inputs.
//!
//! Issue ordering is deterministic (severity, then code, then location,
//! then message) so repeated runs print byte-identical reports.

use tr_core::calendar::TRANSITION_YEARS;
use tr_core::request::{
    Policy, SimulationRequest, GROWTH_RATE_MAX, GROWTH_RATE_MIN,
};
use tr_core::scenario::Scenario;
use tr_io::loader::{EngineResult, ScenarioSet};

/// Issue severity. Only `Error` blocks a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred (kept small and deterministic).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRef {
    Root,
    Field(&'static str),
    Scenario(Scenario),
    PolicyYear(i32),
}

impl core::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FieldRef::Root => f.write_str("request"),
            FieldRef::Field(name) => f.write_str(name),
            FieldRef::Scenario(s) => write!(f, "growth_rates.{}", s.as_str()),
            FieldRef::PolicyYear(y) => write!(f, "policy[{y}]"),
        }
    }
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub where_: FieldRef,
}

/// Deterministic report: pass = (no Error); issue ordering is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn error_count(&self) -> u32 {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count() as u32
    }

    pub fn warning_count(&self) -> u32 {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count() as u32
    }
}

/// Validate the request and inspect the engine result, as one report.
pub fn validate_run(request: &SimulationRequest, engine: &EngineResult) -> ValidationReport {
    let mut issues = check_request(request);
    issues.extend(check_engine_result(engine));
    finish(issues)
}

/// Request-only admission (used by `--validate-only` style callers too).
pub fn validate_request(request: &SimulationRequest) -> ValidationReport {
    finish(check_request(request))
}

fn finish(mut issues: Vec<ValidationIssue>) -> ValidationReport {
    sort_issues_stably(&mut issues);
    ValidationReport {
        pass: !issues.iter().any(|i| i.severity == Severity::Error),
        issues,
    }
}

/* ---------------- request checks ---------------- */

fn check_request(request: &SimulationRequest) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if request.base_year <= 0 {
        issues.push(error(
            "Request.BaseYearNotPositive",
            format!("base_year must be positive, got {}", request.base_year),
            FieldRef::Field("base_year"),
        ));
    }

    check_amount(&mut issues, "Revenue", "revenue.goods_annual", request.revenue.goods_annual);
    check_amount(
        &mut issues,
        "Revenue",
        "revenue.services_annual",
        request.revenue.services_annual,
    );

    let taxes = &request.last_year_taxes_paid;
    check_amount(&mut issues, "Taxes", "last_year_taxes_paid.icms", taxes.icms);
    check_amount(&mut issues, "Taxes", "last_year_taxes_paid.iss", taxes.iss);
    check_amount(
        &mut issues,
        "Taxes",
        "last_year_taxes_paid.pis_cofins",
        taxes.pis_cofins,
    );

    for scenario in Scenario::ALL {
        let rate = request.growth_rates.get(scenario);
        if !rate.is_finite() {
            issues.push(error(
                "Growth.NonFinite",
                format!("{} growth rate is not a finite number", scenario.as_str()),
                FieldRef::Scenario(scenario),
            ));
        } else if !(GROWTH_RATE_MIN..=GROWTH_RATE_MAX).contains(&rate) {
            issues.push(error(
                "Growth.OutOfRange",
                format!(
                    "{} growth rate {} outside [{}, {}]",
                    scenario.as_str(),
                    rate,
                    GROWTH_RATE_MIN,
                    GROWTH_RATE_MAX
                ),
                FieldRef::Scenario(scenario),
            ));
        }
    }

    match &request.policy {
        Some(policy) => issues.extend(check_policy(policy)),
        None => issues.push(warning(
            "Policy.Absent",
            "no phase-in policy supplied; the engine's defaults apply".to_string(),
            FieldRef::Root,
        )),
    }

    if let Some(rates) = &request.rates_override {
        check_rate(&mut issues, "rates_override.ibs_rate", rates.ibs_rate);
        check_rate(&mut issues, "rates_override.cbs_rate", rates.cbs_rate);
    }

    issues
}

fn check_amount(
    issues: &mut Vec<ValidationIssue>,
    family: &'static str,
    field: &'static str,
    value: f64,
) {
    if !value.is_finite() {
        issues.push(error(
            match family {
                "Revenue" => "Revenue.NonFinite",
                _ => "Taxes.NonFinite",
            },
            format!("{field} is not a finite number"),
            FieldRef::Field(field),
        ));
    } else if value < 0.0 {
        issues.push(error(
            match family {
                "Revenue" => "Revenue.Negative",
                _ => "Taxes.Negative",
            },
            format!("{field} must be non-negative, got {value}"),
            FieldRef::Field(field),
        ));
    }
}

fn check_rate(issues: &mut Vec<ValidationIssue>, field: &'static str, rate: Option<f64>) {
    if let Some(r) = rate {
        if !r.is_finite() || r < 0.0 {
            issues.push(error(
                "RatesOverride.Invalid",
                format!("{field} must be a non-negative number, got {r}"),
                FieldRef::Field(field),
            ));
        }
    }
}

/// Policy shape: the transition window is fixed, and both share maps must
/// cover every year of it with a fraction in [0, 1].
fn check_policy(policy: &Policy) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if policy.transition_years != TRANSITION_YEARS {
        issues.push(error(
            "Policy.TransitionYears",
            format!(
                "transition_years must be {:?}, got {:?}",
                TRANSITION_YEARS, policy.transition_years
            ),
            FieldRef::Field("policy.transition_years"),
        ));
    }

    for (map_name, map) in [
        ("icms_iss_reduction", &policy.icms_iss_reduction),
        ("ibs_increase", &policy.ibs_increase),
    ] {
        for year in TRANSITION_YEARS {
            match map.get(&year.to_string()) {
                None => issues.push(error(
                    "Policy.MissingShare",
                    format!("{map_name} has no entry for {year}"),
                    FieldRef::PolicyYear(year),
                )),
                Some(share) if !share.is_finite() || !(0.0..=1.0).contains(share) => {
                    issues.push(error(
                        "Policy.ShareOutOfRange",
                        format!("{map_name}[{year}] = {share} outside [0, 1]"),
                        FieldRef::PolicyYear(year),
                    ));
                }
                Some(_) => {}
            }
        }
        for key in map.keys() {
            let known = key
                .parse::<i32>()
                .map(|y| TRANSITION_YEARS.contains(&y))
                .unwrap_or(false);
            if !known {
                issues.push(warning(
                    "Policy.UnknownYear",
                    format!("{map_name} key {key:?} is outside the transition window"),
                    FieldRef::Field("policy"),
                ));
            }
        }
    }

    issues
}

/* ---------------- engine result inspection (warnings only) ---------------- */

fn check_engine_result(engine: &EngineResult) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if engine.projection_2033 == ScenarioSet::default() {
        issues.push(warning(
            "Engine.ProjectionMissing",
            "projection_2033 is absent or empty; all scenario summaries will be zero".to_string(),
            FieldRef::Field("projection_2033"),
        ));
    }

    if engine.transition_2029_2032.is_empty() {
        issues.push(warning(
            "Engine.TransitionEmpty",
            "no transition rows reported".to_string(),
            FieldRef::Field("transition_2029_2032"),
        ));
    } else {
        let years: Vec<i32> = engine.transition_2029_2032.iter().map(|r| r.year).collect();
        if years != TRANSITION_YEARS {
            issues.push(warning(
                "Engine.TransitionYears",
                format!("transition rows cover {years:?}, expected {TRANSITION_YEARS:?}"),
                FieldRef::Field("transition_2029_2032"),
            ));
        }
    }

    let labels = engine.series.labels.len();
    if labels > 0 {
        for scenario in Scenario::ALL {
            let n = engine.series.totals.get(scenario).len();
            if n != 0 && n != labels {
                issues.push(warning(
                    "Engine.SeriesRagged",
                    format!(
                        "series.totals.{} has {n} points for {labels} labels",
                        scenario.as_str()
                    ),
                    FieldRef::Field("series.totals"),
                ));
            }
        }
    }

    issues
}

/* ---------------- utilities ---------------- */

fn error(code: &'static str, message: String, where_: FieldRef) -> ValidationIssue {
    ValidationIssue {
        severity: Severity::Error,
        code,
        message,
        where_,
    }
}

fn warning(code: &'static str, message: String, where_: FieldRef) -> ValidationIssue {
    ValidationIssue {
        severity: Severity::Warning,
        code,
        message,
        where_,
    }
}

fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    use core::cmp::Ordering;
    issues.sort_by(|a, b| match a.severity.cmp(&b.severity) {
        Ordering::Equal => match a.code.cmp(b.code) {
            Ordering::Equal => match cmp_where(&a.where_, &b.where_) {
                Ordering::Equal => a.message.cmp(&b.message),
                o => o,
            },
            o => o,
        },
        o => o,
    });
}

fn cmp_where(a: &FieldRef, b: &FieldRef) -> core::cmp::Ordering {
    use core::cmp::Ordering::*;
    use FieldRef::*;
    match (a, b) {
        (Root, Root) => Equal,
        (Root, _) => Less,
        (_, Root) => Greater,
        (Field(fa), Field(fb)) => fa.cmp(fb),
        (Field(_), _) => Less,
        (_, Field(_)) => Greater,
        (Scenario(sa), Scenario(sb)) => sa.cmp(sb),
        (Scenario(_), _) => Less,
        (_, Scenario(_)) => Greater,
        (PolicyYear(ya), PolicyYear(yb)) => ya.cmp(yb),
    }
}
