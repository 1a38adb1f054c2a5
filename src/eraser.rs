//! Manual grid line editing.

use kurbo::Point;

use crate::foundation::core::Axis;
use crate::grid::{Grid, GridLine};

/// The line nearest to a pointer position; computed fresh per action, never
/// persisted.
#[derive(Clone, Copy, Debug)]
struct EraserTarget {
    axis: Axis,
    index: usize,
    distance: f64,
}

/// Apply one eraser action at `point`.
///
/// Every line whose asserted span contains the point's cross-axis coordinate
/// and whose distance along its own axis is below `threshold` is eligible;
/// the closest one across both axes is affected. With `whole_line` the line
/// is removed outright; otherwise only the lattice segment between the two
/// perpendicular crossings bracketing the point is erased, leaving the
/// remainders in place.
///
/// Returns `None` when no line qualifies, so callers can tell a real edit
/// (push to history) from a miss.
pub fn erase(grid: &Grid, point: Point, whole_line: bool, threshold: f64) -> Option<Grid> {
    let target = nearest_line(grid, point, threshold)?;
    let mut out = grid.clone();

    match (target.axis, whole_line) {
        (Axis::Y, true) => {
            out.horizontal.remove(target.index);
        }
        (Axis::X, true) => {
            out.vertical.remove(target.index);
        }
        (Axis::Y, false) => erase_segment(&mut out.horizontal, &out.vertical, target.index, point.x),
        (Axis::X, false) => erase_segment(&mut out.vertical, &out.horizontal, target.index, point.y),
    }
    Some(out)
}

fn nearest_line(grid: &Grid, point: Point, threshold: f64) -> Option<EraserTarget> {
    let mut best: Option<EraserTarget> = None;
    let mut consider = |axis, index, distance| {
        if distance < threshold && best.is_none_or(|b| distance < b.distance) {
            best = Some(EraserTarget {
                axis,
                index,
                distance,
            });
        }
    };

    for (i, line) in grid.horizontal.iter().enumerate() {
        if line.covers(point.x) {
            consider(Axis::Y, i, (point.y - line.pos).abs());
        }
    }
    for (i, line) in grid.vertical.iter().enumerate() {
        if line.covers(point.y) {
            consider(Axis::X, i, (point.x - line.pos).abs());
        }
    }
    best
}

/// Remove the lattice unit of `lines[index]` bracketing `cursor`, where the
/// brackets are the perpendicular crossings covering the line's position.
/// A line with no crossings loses its whole span.
fn erase_segment(lines: &mut Vec<GridLine>, crossings: &[GridLine], index: usize, cursor: f64) {
    let line = lines.remove(index);

    let mut cuts: Vec<f64> = crossings
        .iter()
        .filter(|c| c.covers(line.pos))
        .map(|c| c.pos)
        .collect();
    cuts.sort_by(f64::total_cmp);

    let left = cuts
        .iter()
        .rev()
        .find(|&&p| p <= cursor)
        .copied()
        .unwrap_or(line.start);
    let right = cuts
        .iter()
        .find(|&&p| p > cursor)
        .copied()
        .unwrap_or(line.end);

    // Re-insert at the original index so the axis stays ordered by pos.
    let mut at = index;
    if left > line.start + 1.0 {
        lines.insert(at, GridLine { end: left, ..line });
        at += 1;
    }
    if right < line.end - 1.0 {
        lines.insert(
            at,
            GridLine {
                start: right,
                ..line
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Horizontal line at y=50 over x 0..150, crossed by verticals at
    /// x=50 and x=100.
    fn crossed_grid() -> Grid {
        Grid {
            horizontal: vec![GridLine::full_span(50.0, 1.0, 150.0)],
            vertical: vec![
                GridLine::full_span(50.0, 1.0, 100.0),
                GridLine::full_span(100.0, 1.0, 100.0),
            ],
        }
    }

    #[test]
    fn segment_erase_removes_only_the_bracketed_unit() {
        let grid = crossed_grid();
        let out = erase(&grid, Point::new(75.0, 50.0), false, 5.0).unwrap();

        assert_eq!(out.horizontal.len(), 2);
        assert_eq!(
            (out.horizontal[0].start, out.horizontal[0].end),
            (0.0, 50.0)
        );
        assert_eq!(
            (out.horizontal[1].start, out.horizontal[1].end),
            (100.0, 150.0)
        );
        assert_eq!(out.vertical, grid.vertical);
    }

    #[test]
    fn segment_erase_at_edge_leaves_one_remainder() {
        let grid = crossed_grid();
        let out = erase(&grid, Point::new(25.0, 50.0), false, 5.0).unwrap();

        assert_eq!(out.horizontal.len(), 1);
        assert_eq!(
            (out.horizontal[0].start, out.horizontal[0].end),
            (50.0, 150.0)
        );
    }

    #[test]
    fn segment_erase_without_crossings_drops_whole_line() {
        let grid = Grid {
            horizontal: vec![GridLine::full_span(50.0, 1.0, 150.0)],
            vertical: vec![],
        };
        let out = erase(&grid, Point::new(75.0, 50.0), false, 5.0).unwrap();
        assert!(out.horizontal.is_empty());
    }

    #[test]
    fn whole_line_mode_removes_the_line() {
        let grid = crossed_grid();
        let out = erase(&grid, Point::new(75.0, 51.0), true, 5.0).unwrap();
        assert!(out.horizontal.is_empty());
        assert_eq!(out.vertical.len(), 2);
    }

    #[test]
    fn miss_returns_none_and_leaves_grid_untouched() {
        let grid = crossed_grid();
        let copy = grid.clone();
        assert!(erase(&grid, Point::new(75.0, 70.0), false, 5.0).is_none());
        assert_eq!(grid, copy);
    }

    #[test]
    fn nearest_line_wins_across_axes() {
        // Point near the crossing of the horizontal (y=50) and the vertical
        // (x=50); the vertical is closer.
        let grid = crossed_grid();
        let out = erase(&grid, Point::new(51.0, 47.0), true, 10.0).unwrap();
        assert_eq!(out.vertical.len(), 1);
        assert_eq!(out.horizontal.len(), 1);
        assert_eq!(out.vertical[0].pos, 100.0);
    }

    #[test]
    fn span_must_cover_the_cross_coordinate() {
        // Line only spans x 0..60; a point at x=120 cannot touch it.
        let grid = Grid {
            horizontal: vec![GridLine {
                pos: 50.0,
                thickness: 1.0,
                start: 0.0,
                end: 60.0,
            }],
            vertical: vec![],
        };
        assert!(erase(&grid, Point::new(120.0, 50.0), true, 5.0).is_none());
    }
}
