// crates/tr_chart/src/path.rs
//
// Polyline geometry for one series: evenly spaced x positions across the
// label axis, y through the caller's scale, and a move/line traversal a
// renderer can materialize directly.

use crate::scale::Scale;

/// One marker on a line chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

/// Renderer-agnostic path step. The first point of a series is a `Move`,
/// every later point a `Line`; emitting them in order draws the polyline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    Move(PathPoint),
    Line(PathPoint),
}

impl PathCommand {
    pub fn point(&self) -> PathPoint {
        match *self {
            PathCommand::Move(p) | PathCommand::Line(p) => p,
        }
    }
}

/// Place one point per value. `n` is the label-axis length: points sit at
/// `index * (chart_width / (n - 1))` when `n > 1`; a single label centers
/// its one point instead of pinning it to the left edge.
pub fn place_points(values: &[f64], n: usize, chart_width: f64, y_scale: &Scale) -> Vec<PathPoint> {
    if n <= 1 {
        return values
            .iter()
            .map(|&v| PathPoint { x: chart_width / 2.0, y: y_scale.position(v) })
            .collect();
    }
    let step = chart_width / (n - 1) as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| PathPoint { x: step * i as f64, y: y_scale.position(v) })
        .collect()
}

/// Traverse points as path commands: first `Move`, then `Line`s. The same
/// points always produce the same command sequence.
pub fn build_path(points: &[PathPoint]) -> Vec<PathCommand> {
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| if i == 0 { PathCommand::Move(p) } else { PathCommand::Line(p) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn y_down(values: &[f64]) -> Scale {
        Scale::fit(values.iter().copied(), 240.0, 0.0).unwrap()
    }

    #[test]
    fn points_are_evenly_spaced_across_the_width() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let s = y_down(&values);
        let pts = place_points(&values, values.len(), 600.0, &s);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0].x, 0.0);
        assert_eq!(pts[1].x, 150.0);
        assert_eq!(pts[4].x, 600.0);
    }

    #[test]
    fn single_label_centers_its_point() {
        let values = [42.0];
        let s = y_down(&values);
        let pts = place_points(&values, 1, 600.0, &s);
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].x, 300.0);
    }

    #[test]
    fn first_command_moves_and_the_rest_draw_lines() {
        let values = [1.0, 2.0, 3.0];
        let s = y_down(&values);
        let pts = place_points(&values, 3, 600.0, &s);
        let cmds = build_path(&pts);
        assert!(matches!(cmds[0], PathCommand::Move(_)));
        assert!(cmds[1..].iter().all(|c| matches!(c, PathCommand::Line(_))));
        assert_eq!(cmds[0].point(), pts[0]);
        assert_eq!(cmds[2].point(), pts[2]);
    }

    #[test]
    fn empty_values_build_an_empty_path() {
        let s = Scale::fit([0.0, 1.0].into_iter(), 240.0, 0.0).unwrap();
        assert!(place_points(&[], 4, 600.0, &s).is_empty());
        assert!(build_path(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn path_building_is_idempotent(
            values in proptest::collection::vec(-1.0e9_f64..1.0e9, 1..32),
            width in 1.0_f64..2000.0,
        ) {
            let s = y_down(&values);
            let a = build_path(&place_points(&values, values.len(), width, &s));
            let b = build_path(&place_points(&values, values.len(), width, &s));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn x_positions_are_monotonic_and_bounded(
            values in proptest::collection::vec(-1.0e9_f64..1.0e9, 2..32),
            width in 1.0_f64..2000.0,
        ) {
            let s = y_down(&values);
            let pts = place_points(&values, values.len(), width, &s);
            prop_assert_eq!(pts[0].x, 0.0);
            prop_assert!((pts[pts.len() - 1].x - width).abs() < 1e-6);
            for w in pts.windows(2) {
                prop_assert!(w[0].x < w[1].x);
            }
        }
    }
}
