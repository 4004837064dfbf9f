// crates/tr_report/src/render_html.rs

//! Self-contained HTML rendering via minijinja.
//!
//! One embedded template, no external assets: charts are inlined as SVG
//! built by [`crate::svg`], monetary cells go through the `money` filter,
//! and everything else relies on the template's HTML auto-escaping (the
//! template name ends in `.html`, which switches it on).

use minijinja::{context, Environment};

use crate::svg;
use crate::{fmt_money, ReportError, ReportModel};

const TOTALS_TITLE: &str = "Projected totals by scenario";
const BREAKDOWN_TITLE: &str = "2033 tax composition";

static TEMPLATE: &str = r#"<!doctype html>
<html lang="en"><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{ cover.title }}</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; color: #111827; }
  h1 { font-size: 1.4rem; }
  h2 { font-size: 1.1rem; margin-top: 2rem; }
  table { border-collapse: collapse; width: 100%; }
  th, td { border: 1px solid #d1d5db; padding: 0.4rem 0.6rem; text-align: right; }
  th:first-child, td:first-child { text-align: left; }
  .muted { color: #6b7280; }
  figure { margin: 1rem 0; }
</style>
</head><body>
<h1>{{ cover.title }}</h1>
<p class="muted">Base year {{ cover.base_year }} &middot; mode {{ cover.calculation_mode }} &middot; final year {{ cover.final_year }}</p>

<h2>Baseline</h2>
<table>
  <tr><th>ICMS</th><th>ISS</th><th>PIS/COFINS</th><th>Total</th><th>Annual revenue</th></tr>
  <tr><td>{{ baseline.icms|money }}</td><td>{{ baseline.iss|money }}</td><td>{{ baseline.pis_cofins|money }}</td><td>{{ baseline.last_year_total|money }}</td><td>{{ baseline.revenue_annual_total|money }}</td></tr>
</table>

<h2>Scenarios ({{ cover.final_year }})</h2>
<table>
  <tr><th>Scenario</th><th>Total</th><th>Delta</th><th>Delta %</th><th>Effective rate</th><th>IBS</th><th>CBS</th></tr>
  {% for row in scenarios %}
  <tr><td>{{ row.scenario }}</td><td>{{ row.total_2033|money }}</td><td>{{ row.delta_vs_last_year|money }}</td><td>{{ row.delta_pct_1dp }}</td><td>{{ row.effective_rate_1dp }}</td><td>{{ row.ibs_2033|money }}</td><td>{{ row.cbs_2033|money }}</td></tr>
  {% endfor %}
</table>

<h2>Transition window</h2>
{% if transition %}
<table>
  <tr><th>Year</th><th>ICMS</th><th>ISS</th><th>PIS/COFINS</th><th>IBS</th><th>CBS</th><th>Total</th></tr>
  {% for row in transition %}
  <tr><td>{{ row.year }}</td><td>{{ row.icms|money }}</td><td>{{ row.iss|money }}</td><td>{{ row.pis_cofins|money }}</td><td>{{ row.ibs|money }}</td><td>{{ row.cbs|money }}</td><td>{{ row.total_tax|money }}</td></tr>
  {% endfor %}
</table>
{% else %}
<p class="muted">No transition rows.</p>
{% endif %}

<h2>Charts</h2>
<figure>{{ totals_svg|safe }}</figure>
<figure>{{ breakdown_svg|safe }}</figure>
</body></html>
"#;

pub fn render_html(model: &ReportModel) -> Result<String, ReportError> {
    let totals_svg = match &model.charts.totals {
        Some(chart) => svg::line_chart(TOTALS_TITLE, chart),
        None => svg::no_data(TOTALS_TITLE),
    };
    let breakdown_svg = svg::bar_chart(BREAKDOWN_TITLE, &model.charts.breakdown);

    let mut env = Environment::new();
    env.add_filter("money", fmt_money);
    env.add_template("report.html", TEMPLATE)
        .map_err(|_| ReportError::Template("add_template"))?;
    let tmpl = env
        .get_template("report.html")
        .map_err(|_| ReportError::Template("get_template"))?;
    tmpl.render(context! {
        cover => &model.cover,
        baseline => &model.baseline,
        scenarios => &model.scenarios,
        transition => &model.transition,
        totals_svg => totals_svg,
        breakdown_svg => breakdown_svg,
    })
    .map_err(|_| ReportError::Template("render"))
}
