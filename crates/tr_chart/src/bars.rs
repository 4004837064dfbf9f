// crates/tr_chart/src/bars.rs
//
// Bar layout for a small fixed category set. Bars grow upward from the
// baseline; the value→height scaling floors its denominator at 1 so an
// all-zero row stays drawable instead of dividing by zero.

use tr_core::numeric::coerce;

/// One category to lay out. Values are non-negative monetary totals; a
/// negative value is a caller contract breach (clamp upstream), not data
/// this layout absorbs.
#[derive(Clone, Debug, PartialEq)]
pub struct BarDatum {
    pub label: String,
    pub value: f64,
}

/// Drawable rectangle for one bar, plus the figures a renderer labels it
/// with.
#[derive(Clone, Debug, PartialEq)]
pub struct BarRect {
    pub label: String,
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Lay out bars across `chart_width` with `gutter` pixels of spacing per
/// slot. Heights scale against `max(1, max value)`; `y` measures from the
/// chart top, so `y = chart_height - height` leaves bars standing on the
/// baseline. Empty input yields an empty layout.
pub fn layout_bars(data: &[BarDatum], chart_width: f64, chart_height: f64, gutter: f64) -> Vec<BarRect> {
    if data.is_empty() {
        return Vec::new();
    }
    let max = data.iter().map(|d| coerce(d.value)).fold(1.0_f64, f64::max);
    let slot = chart_width / data.len() as f64;
    let bar_width = (slot - gutter).max(0.0);
    data.iter()
        .enumerate()
        .map(|(i, d)| {
            let value = coerce(d.value);
            debug_assert!(value >= 0.0, "bar values are non-negative by contract");
            let height = value / max * chart_height;
            BarRect {
                label: d.label.clone(),
                value,
                x: slot * i as f64 + gutter / 2.0,
                y: chart_height - height,
                width: bar_width,
                height,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bars(values: &[f64]) -> Vec<BarDatum> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| BarDatum { label: format!("b{i}"), value: v })
            .collect()
    }

    #[test]
    fn all_zero_values_yield_zero_height_bars() {
        let out = layout_bars(&bars(&[0.0, 0.0, 0.0]), 420.0, 240.0, 8.0);
        assert_eq!(out.len(), 3);
        for b in &out {
            assert_eq!(b.height, 0.0);
            assert_eq!(b.y, 240.0);
        }
    }

    #[test]
    fn heights_scale_against_the_tallest_bar() {
        let out = layout_bars(&bars(&[50.0, 100.0, 25.0]), 400.0, 200.0, 0.0);
        assert_eq!(out[0].height, 100.0);
        assert_eq!(out[1].height, 200.0);
        assert_eq!(out[2].height, 50.0);
        assert_eq!(out[1].y, 0.0);
        assert_eq!(out[2].y, 150.0);
    }

    #[test]
    fn values_below_one_still_use_the_unit_floor() {
        // max(1, 0.4) keeps tiny inputs from filling the whole chart.
        let out = layout_bars(&bars(&[0.4]), 100.0, 200.0, 0.0);
        assert_eq!(out[0].height, 80.0);
    }

    #[test]
    fn slots_share_the_width_and_keep_the_gutter() {
        let out = layout_bars(&bars(&[1.0, 2.0, 3.0, 4.0]), 400.0, 200.0, 10.0);
        for b in &out {
            assert_eq!(b.width, 90.0);
        }
        assert_eq!(out[0].x, 5.0);
        assert_eq!(out[1].x, 105.0);
        assert_eq!(out[3].x, 305.0);
    }

    #[test]
    fn empty_input_yields_an_empty_layout() {
        assert!(layout_bars(&[], 400.0, 200.0, 8.0).is_empty());
    }

    #[test]
    fn non_finite_values_collapse_to_zero_height() {
        let out = layout_bars(&bars(&[f64::NAN, 10.0]), 200.0, 100.0, 0.0);
        assert_eq!(out[0].height, 0.0);
        assert_eq!(out[1].height, 100.0);
    }

    proptest! {
        #[test]
        fn heights_stay_within_the_chart(
            values in proptest::collection::vec(0.0_f64..1.0e12, 1..12),
            gutter in 0.0_f64..20.0,
        ) {
            let out = layout_bars(&bars(&values), 420.0, 240.0, gutter);
            for b in &out {
                prop_assert!(b.height >= 0.0);
                prop_assert!(b.height <= 240.0 + 1e-9);
                prop_assert!(b.y >= -1e-9);
                prop_assert!(b.width >= 0.0);
            }
        }
    }
}
