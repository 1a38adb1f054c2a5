//! Resolving the grid into actual (possibly merged) cells.
//!
//! All line positions on both axes partition the canvas into an atomic
//! lattice of rectangular blocks. Adjacent blocks merge into one cell
//! wherever no line asserts a wall on their shared edge; the bounding box of
//! each merged component is the resolved cell. A table cell spanning two
//! nominal grid rows because its separating line was erased resolves to one
//! tall rectangle.

use kurbo::Rect;

use crate::foundation::core::overlap_len;
use crate::grid::{Grid, GridLine};

/// A line asserts a wall when its position sits this close to the shared
/// boundary coordinate.
const WALL_POS_TOL: f64 = 2.0;
/// ...and its span overlaps the shared edge by more than this.
const WALL_OVERLAP_MIN: f64 = 1.0;
/// Axis positions closer than this collapse into one lattice boundary.
const AXIS_DEDUP_GAP: f64 = 1.0;

/// Resolve the actual cell rectangles of `grid` over a `width` x `height`
/// canvas. No ordering of the returned cells is guaranteed.
pub fn resolve_cells(grid: &Grid, width: f64, height: f64) -> Vec<Rect> {
    let xs = axis_positions(&grid.vertical, width);
    let ys = axis_positions(&grid.horizontal, height);
    let cols = xs.len().saturating_sub(1);
    let rows = ys.len().saturating_sub(1);
    if cols == 0 || rows == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; rows * cols];
    let mut stack = Vec::new();
    let mut cells = Vec::new();

    for seed in 0..rows * cols {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        stack.push(seed);
        let mut bbox: Option<Rect> = None;

        while let Some(idx) = stack.pop() {
            let r = idx / cols;
            let c = idx % cols;
            let block = Rect::new(xs[c], ys[r], xs[c + 1], ys[r + 1]);
            bbox = Some(match bbox {
                Some(b) => b.union(block),
                None => block,
            });

            let mut visit = |neighbor: usize, blocked: bool, visited: &mut Vec<bool>| {
                if !blocked && !visited[neighbor] {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            };
            if c + 1 < cols {
                let wall = has_wall(&grid.vertical, xs[c + 1], ys[r], ys[r + 1]);
                visit(idx + 1, wall, &mut visited);
            }
            if c > 0 {
                let wall = has_wall(&grid.vertical, xs[c], ys[r], ys[r + 1]);
                visit(idx - 1, wall, &mut visited);
            }
            if r + 1 < rows {
                let wall = has_wall(&grid.horizontal, ys[r + 1], xs[c], xs[c + 1]);
                visit(idx + cols, wall, &mut visited);
            }
            if r > 0 {
                let wall = has_wall(&grid.horizontal, ys[r], xs[c], xs[c + 1]);
                visit(idx - cols, wall, &mut visited);
            }
        }

        if let Some(b) = bbox {
            cells.push(b);
        }
    }
    cells
}

/// Sorted union of the axis line positions and the canvas bounds, collapsed
/// to at least [`AXIS_DEDUP_GAP`] apart.
fn axis_positions(lines: &[GridLine], extent: f64) -> Vec<f64> {
    let mut pos: Vec<f64> = lines.iter().map(|l| l.pos).collect();
    pos.push(0.0);
    pos.push(extent);
    pos.sort_by(f64::total_cmp);

    let mut out: Vec<f64> = Vec::with_capacity(pos.len());
    for p in pos {
        match out.last() {
            Some(&last) if p - last <= AXIS_DEDUP_GAP => {}
            _ => out.push(p),
        }
    }
    out
}

fn has_wall(lines: &[GridLine], boundary: f64, edge_start: f64, edge_end: f64) -> bool {
    lines.iter().any(|l| {
        (l.pos - boundary).abs() <= WALL_POS_TOL
            && overlap_len(l.start, l.end, edge_start, edge_end) > WALL_OVERLAP_MIN
    })
}
