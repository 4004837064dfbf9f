// crates/tr_report/src/svg.rs

//! Inline SVG materialization over `tr_chart` geometry.
//!
//! The coordinate work (scales, point placement, bar layout) stays in
//! `tr_chart`; this module only turns geometry into markup. Both charts
//! share one fixed viewBox, all text content passes through [`esc`], and
//! coordinates are written with one decimal so identical geometry always
//! produces identical bytes.

use tr_chart::{build_path, layout_bars, place_points, BarDatum, LineSeries, PathCommand, Scale};

use crate::{fmt_money, ChartBar, TotalsChart};

/// Canvas size shared by both charts.
pub const WIDTH: f64 = 640.0;
pub const HEIGHT: f64 = 300.0;

// Plot margins: room for y tick labels on the left, category labels below.
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;

const PLOT_WIDTH: f64 = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const PLOT_HEIGHT: f64 = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

const BAR_GUTTER: f64 = 24.0;
const BAR_COLORS: [&str; 4] = ["#2563eb", "#0ea5e9", "#f59e0b", "#ef4444"];

/// Escape text for SVG (and HTML) element and attribute content.
pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn open_svg(title: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}" role="img" aria-label="{}">"#,
        esc(title)
    )
}

fn title_text(title: &str) -> String {
    format!(
        r##"<text x="12" y="22" font-size="14" font-weight="600" fill="#111827">{}</text>"##,
        esc(title)
    )
}

fn baseline_axis() -> String {
    format!(
        r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#9ca3af" stroke-width="1"/>"##,
        MARGIN_LEFT,
        MARGIN_TOP + PLOT_HEIGHT,
        MARGIN_LEFT + PLOT_WIDTH,
        MARGIN_TOP + PLOT_HEIGHT
    )
}

/// Placeholder frame used when a chart has nothing to draw.
pub fn no_data(title: &str) -> String {
    let mut out = open_svg(title);
    out.push_str(&title_text(title));
    out.push_str(&format!(
        r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13" fill="#6b7280">no data</text>"##,
        WIDTH / 2.0,
        HEIGHT / 2.0
    ));
    out.push_str("</svg>");
    out
}

/// Render the totals line chart. Falls back to [`no_data`] when no series
/// carries a single point.
pub fn line_chart(title: &str, chart: &TotalsChart) -> String {
    let series: Vec<LineSeries> = chart
        .series
        .iter()
        .map(|s| LineSeries {
            name: s.name.clone(),
            color: s.color.clone(),
            points: s.points.clone(),
        })
        .collect();
    let values: Vec<f64> = series.iter().flat_map(|s| s.values()).collect();
    if values.is_empty() {
        return no_data(title);
    }
    // The y domain is anchored at zero.
    let y = match Scale::fit(values.iter().copied().chain([0.0]), PLOT_HEIGHT, 0.0) {
        Some(scale) => scale,
        None => return no_data(title),
    };

    let mut out = open_svg(title);
    out.push_str(&title_text(title));

    for tick in y.ticks(5) {
        let ty = MARGIN_TOP + tick.offset;
        out.push_str(&format!(
            r##"<line x1="{:.1}" y1="{ty:.1}" x2="{:.1}" y2="{ty:.1}" stroke="#e5e7eb" stroke-width="1"/>"##,
            MARGIN_LEFT,
            MARGIN_LEFT + PLOT_WIDTH
        ));
        out.push_str(&format!(
            r##"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11" fill="#6b7280">{}</text>"##,
            MARGIN_LEFT - 8.0,
            ty + 4.0,
            fmt_money(tick.value)
        ));
    }
    out.push_str(&baseline_axis());

    let n = chart.labels.len();
    for (i, label) in chart.labels.iter().enumerate() {
        out.push_str(&format!(
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="#374151">{}</text>"##,
            MARGIN_LEFT + label_x(i, n),
            MARGIN_TOP + PLOT_HEIGHT + 18.0,
            esc(label)
        ));
    }

    for s in &series {
        let vals: Vec<f64> = s.values().collect();
        let pts = place_points(&vals, n, PLOT_WIDTH, &y);
        let mut d = String::new();
        for cmd in build_path(&pts) {
            let p = cmd.point();
            let op = match cmd {
                PathCommand::Move(_) => 'M',
                PathCommand::Line(_) => 'L',
            };
            d.push_str(&format!("{op}{:.1},{:.1} ", MARGIN_LEFT + p.x, MARGIN_TOP + p.y));
        }
        out.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            d.trim_end(),
            esc(&s.color)
        ));
    }

    let count = series.len();
    for (i, s) in series.iter().enumerate() {
        let lx = WIDTH - MARGIN_RIGHT - 120.0 * (count - i) as f64;
        out.push_str(&format!(
            r#"<rect x="{lx:.1}" y="15" width="10" height="10" fill="{}"/>"#,
            esc(&s.color)
        ));
        out.push_str(&format!(
            r##"<text x="{:.1}" y="24" font-size="11" fill="#374151">{}</text>"##,
            lx + 14.0,
            esc(&s.name)
        ));
    }

    out.push_str("</svg>");
    out
}

/// X offset of label `i`, mirroring the spacing rule of `place_points`.
fn label_x(i: usize, n: usize) -> f64 {
    if n <= 1 {
        return PLOT_WIDTH / 2.0;
    }
    let step = PLOT_WIDTH / (n - 1) as f64;
    step * i as f64
}

/// Render the final-year composition bar chart. Bar values must already be
/// non-negative; the model clamps them when it builds [`ChartBar`]s.
pub fn bar_chart(title: &str, bars: &[ChartBar]) -> String {
    if bars.is_empty() {
        return no_data(title);
    }
    let data: Vec<BarDatum> = bars
        .iter()
        .map(|b| BarDatum { label: b.label.clone(), value: b.value })
        .collect();
    let rects = layout_bars(&data, PLOT_WIDTH, PLOT_HEIGHT, BAR_GUTTER);

    let mut out = open_svg(title);
    out.push_str(&title_text(title));
    out.push_str(&baseline_axis());

    for (i, r) in rects.iter().enumerate() {
        let x = MARGIN_LEFT + r.x;
        let top = MARGIN_TOP + r.y;
        out.push_str(&format!(
            r#"<rect x="{x:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            r.width,
            r.height,
            BAR_COLORS[i % BAR_COLORS.len()]
        ));
        out.push_str(&format!(
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="#374151">{}</text>"##,
            x + r.width / 2.0,
            top - 6.0,
            fmt_money(r.value)
        ));
        out.push_str(&format!(
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="#374151">{}</text>"##,
            x + r.width / 2.0,
            MARGIN_TOP + PLOT_HEIGHT + 18.0,
            esc(&r.label)
        ));
    }

    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn line_chart_draws_one_path_per_series() {
        let chart = fixtures::model().charts.totals.unwrap();
        let svg = line_chart("Projected totals", &chart);
        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path ").count(), 3);
        for color in ["#16a34a", "#2563eb", "#dc2626"] {
            assert!(svg.contains(color), "missing stroke {color}");
        }
        // Last x label and the top y tick.
        assert!(svg.contains(">2033<"));
        assert!(svg.contains("260\u{202f}000"));
    }

    #[test]
    fn empty_series_render_the_placeholder() {
        let chart = TotalsChart { labels: vec!["2029".to_string()], series: Vec::new() };
        assert!(line_chart("Projected totals", &chart).contains("no data"));
        assert!(no_data("Projected totals").contains("no data"));
    }

    #[test]
    fn bar_chart_keeps_order_and_zero_heights() {
        let bars = vec![
            ChartBar { label: "IBS".to_string(), value: 200_000.0 },
            ChartBar { label: "CBS".to_string(), value: 60_000.0 },
            ChartBar { label: "ICMS".to_string(), value: 0.0 },
            ChartBar { label: "ISS".to_string(), value: 0.0 },
        ];
        let svg = bar_chart("2033 composition", &bars);
        assert_eq!(svg.matches("<rect ").count(), 4);
        assert!(svg.contains(r#"height="0.0""#));
        assert!(svg.contains(r#"height="220.0""#));
        let ibs = svg.find(">IBS<").unwrap();
        let iss = svg.find(">ISS<").unwrap();
        assert!(ibs < iss);
    }

    #[test]
    fn empty_bars_render_the_placeholder() {
        assert!(bar_chart("2033 composition", &[]).contains("no data"));
    }

    #[test]
    fn text_content_is_escaped() {
        let bars = vec![ChartBar { label: "A<B&C".to_string(), value: 1.0 }];
        let svg = bar_chart("t", &bars);
        assert!(svg.contains("A&lt;B&amp;C"));
        assert!(!svg.contains(">A<B"));
        assert_eq!(esc("<&>\"'"), "&lt;&amp;&gt;&quot;&#x27;");
    }

    #[test]
    fn rendering_is_deterministic() {
        let chart = fixtures::model().charts.totals.unwrap();
        assert_eq!(line_chart("t", &chart), line_chart("t", &chart));
        let bars = fixtures::model().charts.breakdown;
        assert_eq!(bar_chart("t", &bars), bar_chart("t", &bars));
    }
}
