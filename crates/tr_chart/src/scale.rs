// crates/tr_chart/src/scale.rs
//
// Linear domain→range mapping with the two documented degenerate branches:
// an empty value set yields no scale at all, and a zero-width domain
// substitutes a span of 1 so every value maps to one shared coordinate.

use tr_core::numeric::coerce;

/// Linear map from a value domain onto a pixel range.
///
/// Invariant: `domain_max >= domain_min` (construction through [`Scale::fit`]
/// guarantees it). `range_start > range_end` is legal and inverts the axis;
/// callers do exactly that for y-down pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub domain_min: f64,
    pub domain_max: f64,
    pub range_start: f64,
    pub range_end: f64,
}

/// One axis tick: a domain value and its mapped coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub offset: f64,
}

impl Scale {
    /// Fit a scale over every value of every series sharing one axis.
    ///
    /// Returns `None` when there are no values at all; callers must render
    /// an explicit empty state instead of a chart, never a zero-size scale.
    /// Non-finite values are collapsed to zero before the min/max scan.
    pub fn fit<I>(values: I, range_start: f64, range_end: f64) -> Option<Scale>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;
        for v in values {
            let v = coerce(v);
            seen = true;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if !seen {
            return None;
        }
        Some(Scale { domain_min: min, domain_max: max, range_start, range_end })
    }

    /// Domain width with the degenerate floor applied.
    #[inline]
    fn span(&self) -> f64 {
        let s = self.domain_max - self.domain_min;
        if s == 0.0 {
            1.0
        } else {
            s
        }
    }

    /// Map a value into the range. With a flat domain, every value lands on
    /// `range_start`; the span floor keeps the division defined.
    #[inline]
    pub fn position(&self, v: f64) -> f64 {
        self.range_start + (self.range_end - self.range_start) * (coerce(v) - self.domain_min) / self.span()
    }

    /// Evenly spaced ticks across the domain, endpoints included when
    /// `count >= 2`. A degenerate domain repeats its single value.
    pub fn ticks(&self, count: usize) -> Vec<Tick> {
        if count == 0 {
            return Vec::new();
        }
        if count == 1 {
            return vec![Tick { value: self.domain_min, offset: self.position(self.domain_min) }];
        }
        let step = (self.domain_max - self.domain_min) / (count - 1) as f64;
        (0..count)
            .map(|i| {
                let value = self.domain_min + step * i as f64;
                Tick { value, offset: self.position(value) }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fit_spans_min_and_max_over_all_series() {
        let a = [120.0, 95.0, 260.0];
        let b = [40.0, 310.0];
        let s = Scale::fit(a.iter().chain(b.iter()).copied(), 0.0, 100.0).unwrap();
        assert_eq!(s.domain_min, 40.0);
        assert_eq!(s.domain_max, 310.0);
    }

    #[test]
    fn fit_of_nothing_is_the_no_data_branch() {
        assert_eq!(Scale::fit(std::iter::empty(), 0.0, 100.0), None);
    }

    #[test]
    fn position_maps_endpoints_onto_range_ends() {
        let s = Scale::fit([10.0, 30.0].into_iter(), 0.0, 200.0).unwrap();
        assert_eq!(s.position(10.0), 0.0);
        assert_eq!(s.position(30.0), 200.0);
        assert_eq!(s.position(20.0), 100.0);
    }

    #[test]
    fn inverted_range_flips_the_axis() {
        // y-down pixel space: larger values sit closer to the top (smaller y).
        let s = Scale::fit([0.0, 100.0].into_iter(), 240.0, 0.0).unwrap();
        assert_eq!(s.position(0.0), 240.0);
        assert_eq!(s.position(100.0), 0.0);
    }

    #[test]
    fn flat_domain_maps_everything_to_one_coordinate() {
        let s = Scale::fit([0.0, 0.0, 0.0].into_iter(), 0.0, 240.0).unwrap();
        let p = s.position(0.0);
        assert!(p.is_finite());
        for v in [0.0, 0.0, 0.0] {
            assert_eq!(s.position(v), p);
        }
    }

    #[test]
    fn non_finite_values_are_collapsed_before_the_scan() {
        let s = Scale::fit([f64::NAN, 5.0].into_iter(), 0.0, 100.0).unwrap();
        assert_eq!(s.domain_min, 0.0);
        assert_eq!(s.domain_max, 5.0);
        assert!(s.position(f64::NAN).is_finite());
    }

    #[test]
    fn ticks_include_both_endpoints() {
        let s = Scale::fit([0.0, 100.0].into_iter(), 240.0, 0.0).unwrap();
        let t = s.ticks(5);
        assert_eq!(t.len(), 5);
        assert_eq!(t[0].value, 0.0);
        assert_eq!(t[4].value, 100.0);
        assert_eq!(t[0].offset, 240.0);
        assert_eq!(t[4].offset, 0.0);
        assert_eq!(t[2].value, 50.0);
    }

    #[test]
    fn ticks_on_a_flat_domain_repeat_the_value() {
        let s = Scale::fit([7.0, 7.0].into_iter(), 0.0, 100.0).unwrap();
        let t = s.ticks(3);
        assert!(t.iter().all(|tick| tick.value == 7.0));
        assert!(t.iter().all(|tick| tick.offset == t[0].offset));
        assert!(s.ticks(0).is_empty());
    }

    proptest! {
        #[test]
        fn position_of_domain_values_stays_inside_the_range(
            values in proptest::collection::vec(-1.0e12_f64..1.0e12, 1..64),
            flip in any::<bool>(),
        ) {
            let (r0, r1) = if flip { (240.0, 0.0) } else { (0.0, 240.0) };
            let s = Scale::fit(values.iter().copied(), r0, r1).unwrap();
            let lo = r0.min(r1);
            let hi = r0.max(r1);
            for &v in &values {
                let p = s.position(v);
                prop_assert!(p.is_finite());
                prop_assert!(p >= lo - 1e-9 && p <= hi + 1e-9);
            }
        }

        #[test]
        fn position_is_deterministic(values in proptest::collection::vec(-1.0e9_f64..1.0e9, 1..16)) {
            let a = Scale::fit(values.iter().copied(), 0.0, 640.0).unwrap();
            let b = Scale::fit(values.iter().copied(), 0.0, 640.0).unwrap();
            prop_assert_eq!(a, b);
            for &v in &values {
                prop_assert_eq!(a.position(v), b.position(v));
            }
        }
    }
}
