// crates/tr_chart/src/lib.rs
#![forbid(unsafe_code)]

//! Chart coordinate engine: pure geometry, no I/O, no randomness.
//!
//! Turns already-enriched numeric series into renderer-agnostic drawing
//! geometry. The three modules mirror the three stages of a render pass:
//! scaling (value → coordinate), line paths, and bar layout. Any vector
//! renderer (SVG, canvas) can materialize the outputs without further math.
//!
//! Every function here is total over finite and non-finite input alike:
//! empty data takes an explicit empty branch, flat data takes the span-floor
//! branch, and non-finite values collapse to zero before any arithmetic.

pub mod bars;
pub mod path;
pub mod scale;

pub use bars::{layout_bars, BarDatum, BarRect};
pub use path::{build_path, place_points, PathCommand, PathPoint};
pub use scale::{Scale, Tick};

/// One named line on a chart. Points are `(label, value)` pairs; pairing at
/// construction removes the classic off-by-one between a label axis and a
/// separately-indexed value array.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<(String, f64)>,
}

impl LineSeries {
    /// Build a series by zipping values onto the shared label axis. The zip
    /// truncates to the shorter side, so a short or long value array can
    /// never draw past its labels.
    pub fn paired(name: impl Into<String>, color: impl Into<String>, labels: &[String], values: &[f64]) -> LineSeries {
        LineSeries {
            name: name.into(),
            color: color.into(),
            points: labels.iter().cloned().zip(values.iter().copied()).collect(),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::LineSeries;

    #[test]
    fn paired_truncates_to_the_shorter_side() {
        let labels: Vec<String> = ["2029", "2030", "2031"].iter().map(|s| s.to_string()).collect();
        let s = LineSeries::paired("totals", "#2563eb", &labels, &[1.0, 2.0]);
        assert_eq!(s.len(), 2);
        let s = LineSeries::paired("totals", "#2563eb", &labels, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.points[2], ("2031".to_string(), 3.0));
    }
}
