//! Content-aware removal planning along one axis.
//!
//! Planning runs independently per strip (a perpendicular sub-range bounded
//! by the grid lines crossing it). Every requested removal pixel is either a
//! gap (outside all cells, cut outright) or quota charged to the cell it
//! falls in. Quota is satisfied by cutting the cell's largest safe
//! whitespace runs first; whatever cannot be cut safely becomes squish debt,
//! resolved by uniformly scaling the cell's kept pixels down. The total
//! pixels removed from an axis therefore always equals the requested amount,
//! while cells untouched by a selection are never squished.

use std::ops::Range;

use kurbo::Rect;

use crate::buffer::PixelBuffer;
use crate::foundation::core::{Axis, overlap_len};

/// Blocks with average adjacent-pair channel delta below this are safe to
/// cut through.
const SAFE_ENERGY: f64 = 5.0;
/// Energy blocks span this many pixels along the removal axis.
const ENERGY_BLOCK: u32 = 2;
/// Cross-axis sampling stride for energy scoring.
const ENERGY_STRIDE: u32 = 2;
/// A cell belongs to a strip when their cross-axis overlap exceeds this.
const STRIP_OVERLAP_MIN: f64 = 1.0;

/// One keep instruction along the removal axis: copy `src_len` pixels from
/// `src_start`, drawn at `dest_len` (equal when kept verbatim, smaller when
/// squished). Cut spans are simply absent from the plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawOp {
    pub src_start: u32,
    pub src_len: u32,
    pub dest_len: f64,
}

/// A resolved cell clipped to the current strip.
#[derive(Clone, Copy, Debug)]
struct StripCell {
    axis_start: u32,
    /// Exclusive.
    axis_end: u32,
    cross_start: f64,
    cross_end: f64,
    /// Removal pixels charged to this cell.
    quota: u32,
    /// Quota that could not be satisfied by safe cuts.
    debt: u32,
    /// Non-cut pixels remaining in the cell.
    kept: u32,
}

/// Plan the keep/cut/squish operations for one strip of the image.
///
/// `remove` must be sorted, disjoint integer pixel ranges along `axis`
/// (the compositor's merged selection ranges); `strip` bounds the strip on
/// the perpendicular axis; `cells` are the resolved cells of the whole
/// canvas, in the same coordinate space as `buffer`.
///
/// Without `smart`, the ranges are inverted into identity keep operations, a
/// pure physical cut.
pub fn plan(
    axis: Axis,
    axis_len: u32,
    remove: &[Range<u32>],
    cells: &[Rect],
    strip: (f64, f64),
    smart: bool,
    buffer: &PixelBuffer,
) -> Vec<DrawOp> {
    debug_assert!(
        remove.windows(2).all(|w| w[0].end <= w[1].start),
        "removal ranges must be sorted and disjoint"
    );

    if !smart {
        return keep_ops(axis_len, remove);
    }

    let mut strip_cells = clip_cells(axis, axis_len, cells, strip);

    // Partition removal pixels into gap cuts and per-cell quota.
    let mut cut = vec![false; axis_len as usize];
    let mut gap_px = 0u32;
    for range in remove {
        for p in range.start.min(axis_len)..range.end.min(axis_len) {
            match strip_cells
                .iter_mut()
                .find(|c| c.axis_start <= p && p < c.axis_end)
            {
                Some(cell) => cell.quota += 1,
                None => {
                    cut[p as usize] = true;
                    gap_px += 1;
                }
            }
        }
    }

    for cell in &mut strip_cells {
        if cell.quota > 0 {
            consume_quota(axis, buffer, cell, &mut cut);
        }
        cell.kept = (cell.axis_start..cell.axis_end)
            .filter(|&p| !cut[p as usize])
            .count() as u32;
    }
    let debt: u32 = strip_cells.iter().map(|c| c.debt).sum();
    tracing::debug!(?strip, gap_px, debt, "strip planned");

    emit_ops(axis_len, &cut, &strip_cells)
}

/// Invert removal ranges into identity keep operations.
fn keep_ops(axis_len: u32, remove: &[Range<u32>]) -> Vec<DrawOp> {
    let mut ops = Vec::new();
    let mut cursor = 0u32;
    for range in remove {
        let start = range.start.min(axis_len);
        if start > cursor {
            ops.push(DrawOp {
                src_start: cursor,
                src_len: start - cursor,
                dest_len: f64::from(start - cursor),
            });
        }
        cursor = cursor.max(range.end.min(axis_len));
    }
    if cursor < axis_len {
        ops.push(DrawOp {
            src_start: cursor,
            src_len: axis_len - cursor,
            dest_len: f64::from(axis_len - cursor),
        });
    }
    ops
}

fn clip_cells(axis: Axis, axis_len: u32, cells: &[Rect], strip: (f64, f64)) -> Vec<StripCell> {
    cells
        .iter()
        .filter_map(|cell| {
            let (a0, a1, c0, c1) = match axis {
                Axis::Y => (cell.y0, cell.y1, cell.x0, cell.x1),
                Axis::X => (cell.x0, cell.x1, cell.y0, cell.y1),
            };
            if overlap_len(c0, c1, strip.0, strip.1) <= STRIP_OVERLAP_MIN {
                return None;
            }
            let axis_start = (a0.round().max(0.0) as u32).min(axis_len);
            let axis_end = (a1.round().max(0.0) as u32).min(axis_len);
            if axis_end <= axis_start {
                return None;
            }
            Some(StripCell {
                axis_start,
                axis_end,
                cross_start: c0.max(strip.0),
                cross_end: c1.min(strip.1),
                quota: 0,
                debt: 0,
                kept: 0,
            })
        })
        .collect()
}

/// Cut the cell's largest safe runs first until its quota is satisfied;
/// whatever remains becomes squish debt.
fn consume_quota(axis: Axis, buffer: &PixelBuffer, cell: &mut StripCell, cut: &mut [bool]) {
    let safe = safe_mask(axis, buffer, cell);

    let mut runs: Vec<Range<u32>> = Vec::new();
    let mut run_start = None;
    for (i, &s) in safe.iter().enumerate() {
        match (s, run_start) {
            (true, None) => run_start = Some(i as u32),
            (false, Some(start)) => {
                runs.push(cell.axis_start + start..cell.axis_start + i as u32);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push(cell.axis_start + start..cell.axis_end);
    }
    runs.sort_by_key(|r| std::cmp::Reverse(r.end - r.start));

    let mut need = cell.quota;
    for run in runs {
        if need == 0 {
            break;
        }
        let len = run.end - run.start;
        let take = len.min(need);
        // Center the cut so whitespace survives on both sides.
        let off = (len - take) / 2;
        for p in run.start + off..run.start + off + take {
            cut[p as usize] = true;
        }
        need -= take;
    }
    cell.debt = need;
}

/// Per-pixel safety of the cell's axis extent: a pixel is safe when its
/// 2px energy block scores below [`SAFE_ENERGY`].
fn safe_mask(axis: Axis, buffer: &PixelBuffer, cell: &StripCell) -> Vec<bool> {
    let len = (cell.axis_end - cell.axis_start) as usize;
    let mut safe = vec![false; len];
    let mut a = cell.axis_start;
    while a < cell.axis_end {
        if block_energy(axis, buffer, a, cell) < SAFE_ENERGY {
            let end = (a + ENERGY_BLOCK).min(cell.axis_end);
            for p in a..end {
                safe[(p - cell.axis_start) as usize] = true;
            }
        }
        a += ENERGY_BLOCK;
    }
    safe
}

/// Average |dR|+|dG|+|dB| over stride-sampled adjacent-pixel pairs of the
/// block starting at `a`, restricted to the strip's cross-axis intersection
/// with the cell.
fn block_energy(axis: Axis, buffer: &PixelBuffer, a: u32, cell: &StripCell) -> f64 {
    let mut b = (a + 1).min(cell.axis_end.saturating_sub(1));
    if b == a && a > cell.axis_start {
        b = a - 1;
    }

    let cross_extent = match axis {
        Axis::Y => buffer.width(),
        Axis::X => buffer.height(),
    };
    let c0 = cell.cross_start.floor().max(0.0) as u32;
    let c1 = (cell.cross_end.ceil().max(0.0) as u32).min(cross_extent);

    let mut sum = 0u64;
    let mut pairs = 0u64;
    let mut c = c0;
    while c < c1 {
        let (p, q) = match axis {
            Axis::Y => (buffer.pixel(c, a), buffer.pixel(c, b)),
            Axis::X => (buffer.pixel(a, c), buffer.pixel(b, c)),
        };
        sum += u64::from((i32::from(p[0]) - i32::from(q[0])).unsigned_abs())
            + u64::from((i32::from(p[1]) - i32::from(q[1])).unsigned_abs())
            + u64::from((i32::from(p[2]) - i32::from(q[2])).unsigned_abs());
        pairs += 1;
        c += ENERGY_STRIDE;
    }
    if pairs == 0 {
        return 0.0;
    }
    sum as f64 / pairs as f64
}

/// Scan the full axis range and turn consecutive non-cut runs into
/// operations, splitting wherever a run crosses a cell boundary so scale
/// factors never bleed across cells.
fn emit_ops(axis_len: u32, cut: &[bool], strip_cells: &[StripCell]) -> Vec<DrawOp> {
    let mut ops = Vec::new();
    let mut p = 0u32;
    while p < axis_len {
        if cut[p as usize] {
            p += 1;
            continue;
        }
        let owner = strip_cells
            .iter()
            .position(|c| c.axis_start <= p && p < c.axis_end);
        let boundary = match owner {
            Some(i) => strip_cells[i].axis_end,
            None => strip_cells
                .iter()
                .map(|c| c.axis_start)
                .filter(|&s| s > p)
                .min()
                .unwrap_or(axis_len),
        };

        let start = p;
        while p < boundary && !cut[p as usize] {
            p += 1;
        }
        let len = p - start;

        let scale = match owner {
            Some(i) => {
                let cell = &strip_cells[i];
                if cell.debt == 0 || cell.kept == 0 {
                    1.0
                } else {
                    (f64::from(cell.kept) - f64::from(cell.debt)).max(0.0) / f64::from(cell.kept)
                }
            }
            None => 1.0,
        };
        ops.push(DrawOp {
            src_start: start,
            src_len: len,
            dest_len: f64::from(len) * scale,
        });
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> PixelBuffer {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width * height {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    /// Alternating 1px black/white columns.
    fn column_stripes(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..height {
            for x in 0..width {
                let v = if x % 2 == 0 { 0u8 } else { 255u8 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    fn total_src(ops: &[DrawOp]) -> u32 {
        ops.iter().map(|op| op.src_len).sum()
    }

    fn total_dest(ops: &[DrawOp]) -> f64 {
        ops.iter().map(|op| op.dest_len).sum()
    }

    #[test]
    fn non_smart_inverts_ranges() {
        let buf = solid(10, 100, [255, 255, 255]);
        let ops = plan(Axis::Y, 100, &[20..30, 50..60], &[], (0.0, 10.0), false, &buf);
        assert_eq!(
            ops,
            vec![
                DrawOp {
                    src_start: 0,
                    src_len: 20,
                    dest_len: 20.0
                },
                DrawOp {
                    src_start: 30,
                    src_len: 20,
                    dest_len: 20.0
                },
                DrawOp {
                    src_start: 60,
                    src_len: 40,
                    dest_len: 40.0
                },
            ]
        );
    }

    #[test]
    fn uniform_cell_satisfies_quota_with_cuts_only() {
        let buf = solid(40, 100, [255, 255, 255]);
        let cells = vec![Rect::new(0.0, 0.0, 40.0, 100.0)];
        let ops = plan(Axis::Y, 100, &[30..50], &cells, (0.0, 40.0), true, &buf);

        assert_eq!(total_src(&ops), 80);
        assert!(ops.iter().all(|op| op.dest_len == f64::from(op.src_len)));
        assert_eq!(total_dest(&ops), 80.0);
    }

    #[test]
    fn unsafe_cell_accrues_debt_and_squishes() {
        // Column stripes have huge horizontal gradients, so removing
        // columns finds no safe cut anywhere in the cell.
        let buf = column_stripes(100, 20);
        let cells = vec![Rect::new(0.0, 0.0, 100.0, 20.0)];
        let ops = plan(Axis::X, 100, &[40..60], &cells, (0.0, 20.0), true, &buf);

        // Nothing was physically cut; the whole axis is kept and squished.
        assert_eq!(total_src(&ops), 100);
        assert!((total_dest(&ops) - 80.0).abs() < 1e-9);
        assert!(ops.iter().all(|op| op.dest_len < f64::from(op.src_len)));
    }

    #[test]
    fn gap_pixels_outside_cells_are_cut_directly() {
        let buf = solid(40, 100, [255, 255, 255]);
        // Single cell over the top half only; the removal range spans the
        // boundary at y=50.
        let cells = vec![Rect::new(0.0, 0.0, 40.0, 50.0)];
        let ops = plan(Axis::Y, 100, &[40..70], &cells, (0.0, 40.0), true, &buf);

        assert_eq!(total_src(&ops), 70);
        // No squish anywhere: the cell is blank, the rest was gap-cut.
        assert!((total_dest(&ops) - 70.0).abs() < 1e-9);
        // Ops never straddle the cell boundary at 50.
        assert!(
            ops.iter()
                .all(|op| op.src_start + op.src_len <= 50 || op.src_start >= 50)
        );
    }

    #[test]
    fn cells_outside_the_strip_take_no_quota() {
        let buf = column_stripes(100, 40);
        // The striped cell lives in y 20..40, below this strip; its quota
        // would have become debt, but here the removal is pure gap.
        let cells = vec![Rect::new(0.0, 20.0, 100.0, 40.0)];
        let ops = plan(Axis::X, 100, &[10..20], &cells, (0.0, 20.0), true, &buf);

        assert_eq!(total_src(&ops), 90);
        assert!((total_dest(&ops) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn safe_runs_prefer_largest_first() {
        // Rows 10..14 alternate black/white per row, so their blocks score
        // far above the safety cutoff. That splits the whitespace into a
        // 10-row run and an 86-row run; a 20px quota fits entirely in the
        // large run, centered at rows 47..67, so rows 0..14 are all kept.
        let mut data = Vec::new();
        for y in 0..100u32 {
            let v = if (10..14).contains(&y) && y % 2 == 0 {
                0u8
            } else {
                255u8
            };
            for _ in 0..40u32 {
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let buf = PixelBuffer::from_raw(40, 100, data).unwrap();
        let cells = vec![Rect::new(0.0, 0.0, 40.0, 100.0)];
        let ops = plan(Axis::Y, 100, &[20..40], &cells, (0.0, 40.0), true, &buf);

        assert_eq!(total_src(&ops), 80);
        assert_eq!(
            ops.first(),
            Some(&DrawOp {
                src_start: 0,
                src_len: 47,
                dest_len: 47.0
            })
        );
    }
}
