// crates/tr_report/src/lib.rs
#![forbid(unsafe_code)]

//! tr_report — fixed-order report model and renderers over an enriched run.
//!
//! [`build_model`] maps a typed [`EnrichedResult`] into the five report
//! sections without touching I/O. `render_json` and `render_html` turn the
//! model into artifact text; every number they show is either carried
//! verbatim in the model or produced by the formatting helpers here, so the
//! two outputs cannot disagree on a figure.

pub mod svg;

#[cfg(feature = "render_html")]
pub mod render_html;
#[cfg(feature = "render_json")]
pub mod render_json;

#[cfg(feature = "render_html")]
pub use render_html::render_html;
#[cfg(feature = "render_json")]
pub use render_json::render_json;

use serde::{Deserialize, Serialize};
use tr_core::numeric::coerce;
use tr_core::scenario::Scenario;
use tr_io::loader::{SeriesBlock, YearRow};
use tr_pipeline::{EnrichedResult, EnrichedScenarioSet};

/// Cover title shared by every render of this tool.
pub const REPORT_TITLE: &str = "Tax Reform Simulation";

/// Rendering failure. The payload names the step that failed.
#[derive(Debug)]
pub enum ReportError {
    Template(&'static str),
    Serialize(&'static str),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Template(step) => write!(f, "template: {step}"),
            ReportError::Serialize(step) => write!(f, "serialize: {step}"),
        }
    }
}

impl std::error::Error for ReportError {}

/// Report header: run identity at a glance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionCover {
    pub title: String,
    pub base_year: i32,
    pub calculation_mode: String,
    pub final_year: i32,
}

/// Pre-reform figures every projection is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionBaseline {
    pub icms: f64,
    pub iss: f64,
    pub pis_cofins: f64,
    pub last_year_total: f64,
    pub revenue_annual_total: f64,
}

/// One row of the 2033 scenario table. Percent columns are pre-formatted;
/// monetary columns stay numeric so each renderer applies its own grouping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub scenario: String,
    pub total_2033: f64,
    pub delta_vs_last_year: f64,
    pub delta_pct_1dp: String,
    pub effective_rate_1dp: String,
    pub ibs_2033: f64,
    pub cbs_2033: f64,
}

/// One transition-window row, tax heads in presentation order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub year: i32,
    pub icms: f64,
    pub iss: f64,
    pub pis_cofins: f64,
    pub ibs: f64,
    pub cbs: f64,
    pub total_tax: f64,
}

/// One chart line, points paired `(label, value)` at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<(String, f64)>,
}

/// Totals-over-time chart data. Absent at the model level when the engine
/// sent no drawable series; renderers show the empty state instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TotalsChart {
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// One bar of the final-year composition chart. Values are clamped to zero
/// from below; the bar layout requires non-negative heights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub label: String,
    pub value: f64,
}

/// Chart data for the last section. SVG markup is produced at render time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionCharts {
    pub totals: Option<TotalsChart>,
    pub breakdown: Vec<ChartBar>,
}

/// The whole report, sections in presentation order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportModel {
    pub cover: SectionCover,
    pub baseline: SectionBaseline,
    pub scenarios: Vec<ScenarioRow>,
    pub transition: Vec<TransitionRow>,
    pub charts: SectionCharts,
}

/// Assemble the full model from an enriched run. Pure mapping: the same
/// input always yields the same model.
pub fn build_model(enriched: &EnrichedResult) -> ReportModel {
    ReportModel {
        cover: map_cover(enriched),
        baseline: map_baseline(enriched),
        scenarios: map_scenarios(&enriched.projection_2033),
        transition: map_transition(&enriched.transition_2029_2032),
        charts: SectionCharts {
            totals: map_totals(&enriched.series),
            breakdown: map_breakdown(enriched),
        },
    }
}

fn map_cover(enriched: &EnrichedResult) -> SectionCover {
    SectionCover {
        title: REPORT_TITLE.to_string(),
        base_year: enriched.meta.base_year,
        calculation_mode: enriched.meta.calculation_mode.clone(),
        final_year: enriched.meta.final_year,
    }
}

fn map_baseline(enriched: &EnrichedResult) -> SectionBaseline {
    let taxes = enriched.baseline.last_year_taxes_paid;
    SectionBaseline {
        icms: taxes.icms,
        iss: taxes.iss,
        pis_cofins: taxes.pis_cofins,
        last_year_total: enriched.baseline.last_year_total,
        revenue_annual_total: enriched.baseline.revenue_annual_total,
    }
}

fn map_scenarios(set: &EnrichedScenarioSet) -> Vec<ScenarioRow> {
    Scenario::ALL
        .iter()
        .map(|&scenario| {
            let summary = set.get(scenario).summary;
            ScenarioRow {
                scenario: scenario.label().to_string(),
                total_2033: summary.total_2033,
                delta_vs_last_year: summary.delta_vs_last_year,
                delta_pct_1dp: pct_1dp(summary.delta_pct_vs_last_year),
                effective_rate_1dp: pct_1dp(summary.effective_rate_2033),
                ibs_2033: summary.ibs_2033,
                cbs_2033: summary.cbs_2033,
            }
        })
        .collect()
}

fn map_transition(rows: &[YearRow]) -> Vec<TransitionRow> {
    rows.iter()
        .map(|r| TransitionRow {
            year: r.year,
            icms: r.icms,
            iss: r.iss,
            pis_cofins: r.pis_cofins,
            ibs: r.ibs,
            cbs: r.cbs,
            total_tax: r.total_tax,
        })
        .collect()
}

/// One line per scenario that actually has values; an all-empty series
/// block collapses to `None` rather than an empty chart frame.
fn map_totals(series: &SeriesBlock) -> Option<TotalsChart> {
    if series.labels.is_empty() {
        return None;
    }
    let mut lines = Vec::with_capacity(Scenario::ALL.len());
    for scenario in Scenario::ALL {
        let values = series.totals.get(scenario);
        if values.is_empty() {
            continue;
        }
        lines.push(ChartSeries {
            name: scenario.label().to_string(),
            color: scenario_color(scenario).to_string(),
            points: series.labels.iter().cloned().zip(values.iter().copied()).collect(),
        });
    }
    if lines.is_empty() {
        None
    } else {
        Some(TotalsChart { labels: series.labels.clone(), series: lines })
    }
}

/// Bar order of the composition chart.
const BREAKDOWN_ORDER: [&str; 4] = ["IBS", "CBS", "ICMS", "ISS"];

/// Final-year composition: the last column of the breakdown series when the
/// engine sent one, otherwise the conservative 2033 projection.
fn map_breakdown(enriched: &EnrichedResult) -> Vec<ChartBar> {
    let b = &enriched.series.breakdown;
    let last = |v: &Vec<f64>| v.last().copied();
    let values = match (last(&b.ibs), last(&b.cbs), last(&b.icms), last(&b.iss)) {
        (Some(ibs), Some(cbs), Some(icms), Some(iss)) => [ibs, cbs, icms, iss],
        _ => {
            let p = &enriched.projection_2033.conservative.projection;
            [p.ibs, p.cbs, p.icms, p.iss]
        }
    };
    BREAKDOWN_ORDER
        .iter()
        .zip(values)
        .map(|(label, value)| ChartBar {
            label: (*label).to_string(),
            value: coerce(value).max(0.0),
        })
        .collect()
}

/// Legend and stroke color per scenario, stable across renders.
pub fn scenario_color(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Optimistic => "#16a34a",
        Scenario::Conservative => "#2563eb",
        Scenario::Pessimistic => "#dc2626",
    }
}

/// Format an already-scaled percentage with one decimal place, half-up
/// (ties round toward positive infinity). Non-finite input collapses to
/// zero first.
pub fn pct_1dp(v: f64) -> String {
    let v = coerce(v);
    let scaled = (v * 10.0 + 0.5).floor() / 10.0;
    format!("{scaled:.1}%")
}

/// Round to whole units and group digits with a narrow no-break space
/// (U+202F), so wide amounts cannot wrap inside a table cell.
pub fn fmt_money(v: f64) -> String {
    let v = coerce(v).round();
    let neg = v < 0.0;
    let mut x = v.abs() as u128;
    if x == 0 {
        return "0".to_string();
    }
    // 39 digits of u128 plus 12 three-byte separators.
    let mut buf = [0u8; 80];
    let mut i = buf.len();
    let mut digits = 0usize;
    while x > 0 {
        if digits > 0 && digits % 3 == 0 {
            i -= 3; // U+202F is 0xE2 0x80 0xAF in UTF-8
            buf[i..i + 3].copy_from_slice(&[0xE2, 0x80, 0xAF]);
        }
        i -= 1;
        buf[i] = b'0' + (x % 10) as u8;
        x /= 10;
        digits += 1;
    }
    let grouped =
        String::from_utf8(buf[i..].to_vec()).expect("grouped digits are valid UTF-8");
    if neg {
        format!("-{grouped}")
    } else {
        grouped
    }
}
