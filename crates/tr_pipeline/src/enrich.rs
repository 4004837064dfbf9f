//! Projection enrichment.
//!
//! Wraps the engine's raw result in the response envelope the report layer
//! consumes: per-scenario comparison summaries, a `meta` block, and a
//! `baseline` block. Pure computation over already-loaded data; this module
//! never fails. Malformed engine data arrives here already degraded to zeros
//! by the lenient loader, and every division routes through `safe_div`, so
//! the output is total and finite.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tr_core::calendar::FINAL_YEAR;
use tr_core::numeric::{coerce, safe_div};
use tr_core::request::{LastYearTaxes, SimulationRequest};
use tr_core::scenario::Scenario;
use tr_io::loader::{EngineResult, ScenarioProjection, SeriesBlock, YearRow};

/// Comparison metrics for one scenario, derived once from the engine's
/// final-year projection and the request baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub total_2033: f64,
    pub delta_vs_last_year: f64,
    pub delta_pct_vs_last_year: f64,
    pub effective_rate_2033: f64,
    pub ibs_2033: f64,
    pub cbs_2033: f64,
}

/// Derive the summary for one scenario. Zero denominators and non-finite
/// engine values yield zeros, never NaN.
pub fn summarize(
    projection: &ScenarioProjection,
    last_year_total: f64,
    annual_revenue_total: f64,
) -> ScenarioSummary {
    let total_2033 = coerce(projection.total_tax);
    let delta_vs_last_year = total_2033 - last_year_total;
    ScenarioSummary {
        total_2033,
        delta_vs_last_year,
        delta_pct_vs_last_year: safe_div(delta_vs_last_year, last_year_total) * 100.0,
        effective_rate_2033: safe_div(total_2033, annual_revenue_total) * 100.0,
        ibs_2033: coerce(projection.ibs),
        cbs_2033: coerce(projection.cbs),
    }
}

/// One scenario's projection with its summary attached. The projection's
/// original fields stay at this level on the wire (`summary` is the only
/// added key).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedScenario {
    #[serde(flatten)]
    pub projection: ScenarioProjection,
    pub summary: ScenarioSummary,
}

/// All three scenarios, enriched. Always three, even when the engine
/// omitted one (an omitted scenario carries the all-zero projection).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedScenarioSet {
    pub optimistic: EnrichedScenario,
    pub conservative: EnrichedScenario,
    pub pessimistic: EnrichedScenario,
}

impl EnrichedScenarioSet {
    pub fn get(&self, scenario: Scenario) -> &EnrichedScenario {
        match scenario {
            Scenario::Optimistic => &self.optimistic,
            Scenario::Conservative => &self.conservative,
            Scenario::Pessimistic => &self.pessimistic,
        }
    }
}

/// Run framing: which years the document covers and which mode produced it.
/// `final_year` is always the literal 2033, independent of the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaBlock {
    pub base_year: i32,
    pub transition_years: Vec<i32>,
    pub final_year: i32,
    pub calculation_mode: String,
}

/// Prior-year reference figures every delta is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineBlock {
    pub last_year_total: f64,
    pub last_year_taxes_paid: LastYearTaxes,
    pub revenue_annual_total: f64,
}

/// The engine result wrapped in the response envelope. Sole input to the
/// report layer; unknown engine keys ride along in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub assumptions: Value,
    pub projection_2033: EnrichedScenarioSet,
    pub transition_2029_2032: Vec<YearRow>,
    pub series: SeriesBlock,
    pub meta: MetaBlock,
    pub baseline: BaselineBlock,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Build the enriched document. Consumes the engine result (its blocks move
/// into the envelope unchanged); the request is only read.
pub fn enrich(request: &SimulationRequest, engine: EngineResult) -> EnrichedResult {
    let last_year_total = request.last_year_taxes_paid.total();
    let revenue_annual_total = request.revenue.annual_total();

    // Row years are captured before the rows move into the envelope.
    let transition_years: Vec<i32> = engine.transition_2029_2032.iter().map(|r| r.year).collect();

    let summarized = |projection: &ScenarioProjection| EnrichedScenario {
        projection: projection.clone(),
        summary: summarize(projection, last_year_total, revenue_annual_total),
    };

    EnrichedResult {
        assumptions: engine.assumptions,
        projection_2033: EnrichedScenarioSet {
            optimistic: summarized(&engine.projection_2033.optimistic),
            conservative: summarized(&engine.projection_2033.conservative),
            pessimistic: summarized(&engine.projection_2033.pessimistic),
        },
        transition_2029_2032: engine.transition_2029_2032,
        series: engine.series,
        meta: MetaBlock {
            base_year: request.base_year,
            transition_years,
            final_year: FINAL_YEAR,
            calculation_mode: request.mode().as_str().to_string(),
        },
        baseline: BaselineBlock {
            last_year_total,
            last_year_taxes_paid: request.last_year_taxes_paid,
            revenue_annual_total,
        },
        extra: engine.extra,
    }
}
