//! Two-pass fold compositing and grid remapping.
//!
//! Rows are folded out first, through an intermediate raster, then columns
//! are folded out of that intermediate with every cell and strip boundary
//! remapped through the first pass's shift. Grid lines that sat strictly
//! inside a removed range cease to exist; every other line passes through
//! the cumulative-shift maps, so the output grid lands in the output
//! coordinate space and repeated folds compose.

use std::ops::Range;

use kurbo::Rect;

use crate::buffer::PixelBuffer;
use crate::foundation::core::Axis;
use crate::foundation::error::GridfoldResult;
use crate::grid::{Grid, GridLine};
use crate::lattice::resolve_cells;
use crate::seam::{DrawOp, plan};

/// Selection ranges merge across gaps up to this long.
const RANGE_MERGE_GAP: f64 = 1.0;

/// Which axis ranges the selections remove.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropMode {
    /// Remove the row ranges the selections cover (fold vertically).
    Horizontal,
    /// Remove the column ranges the selections cover (fold horizontally).
    Vertical,
    /// Both of the above.
    Both,
}

/// Result of a fold: the new raster and the grid remapped into its
/// coordinate space.
#[derive(Clone, Debug)]
pub struct CropOutput {
    pub buffer: PixelBuffer,
    pub grid: Grid,
}

/// Fold the selected regions out of `buffer`.
///
/// Selections may carry negative extents (raw drags); they are normalized
/// and merged here. Final dimensions are always `max(1, extent - removed)`
/// per axis, independent of how much removal was satisfied by physical cut
/// versus squish.
#[tracing::instrument(skip(buffer, selections, grid))]
pub fn crop(
    buffer: &PixelBuffer,
    selections: &[Rect],
    grid: &Grid,
    mode: CropMode,
    smart: bool,
) -> GridfoldResult<CropOutput> {
    let width = buffer.width();
    let height = buffer.height();

    let y_ranges = if matches!(mode, CropMode::Horizontal | CropMode::Both) {
        merged_ranges(selections, Axis::Y, height)
    } else {
        Vec::new()
    };
    let x_ranges = if matches!(mode, CropMode::Vertical | CropMode::Both) {
        merged_ranges(selections, Axis::X, width)
    } else {
        Vec::new()
    };

    let removed_y: u32 = y_ranges.iter().map(|r| r.end - r.start).sum();
    let removed_x: u32 = x_ranges.iter().map(|r| r.end - r.start).sum();
    let final_h = height.saturating_sub(removed_y).max(1);
    let final_w = width.saturating_sub(removed_x).max(1);

    let cells = resolve_cells(grid, f64::from(width), f64::from(height));

    // Pass 1: fold rows out, planned per vertical strip.
    let mid = if y_ranges.is_empty() {
        buffer.clone()
    } else {
        let strips = if smart {
            strip_spans(grid.vertical.iter().map(|l| l.pos).collect(), width)
        } else {
            vec![0..width]
        };
        let mut dest = vec![0u8; width as usize * final_h as usize * 4];
        for strip in &strips {
            let ops = plan(
                Axis::Y,
                height,
                &y_ranges,
                &cells,
                (f64::from(strip.start), f64::from(strip.end)),
                smart,
                buffer,
            );
            draw_rows(buffer, &mut dest, final_h, strip.clone(), &ops);
        }
        PixelBuffer::from_raw(width, final_h, dest)?
    };

    // Pass 2: fold columns out of the intermediate; cells and strip bounds
    // are carried through the pass-1 shift first.
    let out = if x_ranges.is_empty() {
        mid
    } else {
        let cells = cells
            .iter()
            .map(|c| {
                Rect::new(
                    c.x0,
                    map_coord(&y_ranges, c.y0),
                    c.x1,
                    map_coord(&y_ranges, c.y1),
                )
            })
            .collect::<Vec<_>>();
        let strips = if smart {
            let positions = grid
                .horizontal
                .iter()
                .filter(|l| !dropped(&y_ranges, l.pos))
                .map(|l| map_coord(&y_ranges, l.pos))
                .collect();
            strip_spans(positions, mid.height())
        } else {
            vec![0..mid.height()]
        };
        let mut dest = vec![0u8; final_w as usize * mid.height() as usize * 4];
        for strip in &strips {
            let ops = plan(
                Axis::X,
                width,
                &x_ranges,
                &cells,
                (f64::from(strip.start), f64::from(strip.end)),
                smart,
                &mid,
            );
            draw_cols(&mid, &mut dest, final_w, strip.clone(), &ops);
        }
        PixelBuffer::from_raw(final_w, mid.height(), dest)?
    };

    let grid = remap_grid(grid, &x_ranges, &y_ranges);
    tracing::debug!(
        width = out.width(),
        height = out.height(),
        removed_x,
        removed_y,
        "fold complete"
    );
    Ok(CropOutput { buffer: out, grid })
}

/// Normalize the selections, project them onto `axis`, union them across
/// gaps of at most [`RANGE_MERGE_GAP`], and round to integer pixel ranges.
/// Rounding after the merge keeps quota accounting and the final-dimension
/// arithmetic in exact agreement.
fn merged_ranges(selections: &[Rect], axis: Axis, extent: u32) -> Vec<Range<u32>> {
    let mut spans: Vec<(f64, f64)> = selections
        .iter()
        .filter_map(|sel| {
            let r = sel.abs();
            let (a, b) = match axis {
                Axis::X => (r.x0, r.x1),
                Axis::Y => (r.y0, r.y1),
            };
            let a = a.max(0.0);
            let b = b.min(f64::from(extent));
            (b > a).then_some((a, b))
        })
        .collect();
    spans.sort_by(|p, q| p.0.total_cmp(&q.0));

    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (a, b) in spans {
        match merged.last_mut() {
            Some(last) if a - last.1 <= RANGE_MERGE_GAP => last.1 = last.1.max(b),
            _ => merged.push((a, b)),
        }
    }

    merged
        .into_iter()
        .filter_map(|(a, b)| {
            let start = a.round().max(0.0) as u32;
            let end = (b.round().max(0.0) as u32).min(extent);
            (end > start).then_some(start..end)
        })
        .collect()
}

/// Cumulative shift of `coord` past the removed ranges below it.
fn map_coord(ranges: &[Range<u32>], coord: f64) -> f64 {
    let mut shift = 0.0;
    for r in ranges {
        let (s, e) = (f64::from(r.start), f64::from(r.end));
        shift += (coord.min(e) - s).clamp(0.0, e - s);
    }
    coord - shift
}

/// Whether `pos` fell strictly inside a removed range and ceases to exist.
fn dropped(ranges: &[Range<u32>], pos: f64) -> bool {
    ranges
        .iter()
        .any(|r| f64::from(r.start) < pos && pos < f64::from(r.end))
}

fn remap_grid(grid: &Grid, x_ranges: &[Range<u32>], y_ranges: &[Range<u32>]) -> Grid {
    let remap_axis = |lines: &[GridLine], pos_ranges: &[Range<u32>], span_ranges: &[Range<u32>]| {
        lines
            .iter()
            .filter(|l| !dropped(pos_ranges, l.pos))
            .filter_map(|l| {
                let start = map_coord(span_ranges, l.start);
                let end = map_coord(span_ranges, l.end);
                (start < end).then_some(GridLine {
                    pos: map_coord(pos_ranges, l.pos),
                    thickness: l.thickness,
                    start,
                    end,
                })
            })
            .collect()
    };
    Grid {
        horizontal: remap_axis(&grid.horizontal, y_ranges, x_ranges),
        vertical: remap_axis(&grid.vertical, x_ranges, y_ranges),
    }
}

/// Partition `0..extent` at the given interior positions, rounded to whole
/// pixels.
fn strip_spans(positions: Vec<f64>, extent: u32) -> Vec<Range<u32>> {
    let mut bounds: Vec<u32> = positions
        .into_iter()
        .filter(|&p| p > 0.0 && p < f64::from(extent))
        .map(|p| p.round() as u32)
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut spans = Vec::new();
    let mut prev = 0u32;
    for b in bounds {
        if b > prev {
            spans.push(prev..b);
            prev = b;
        }
    }
    if prev < extent {
        spans.push(prev..extent);
    }
    spans
}

/// Execute a row plan for one vertical strip, drawing into a raster of the
/// same width as `src` and `dest_h` rows. Squished operations sample the
/// nearest source row.
fn draw_rows(src: &PixelBuffer, dest: &mut [u8], dest_h: u32, strip: Range<u32>, ops: &[DrawOp]) {
    let width = src.width() as usize;
    let x0 = strip.start.min(src.width()) as usize;
    let x1 = strip.end.min(src.width()) as usize;
    if x1 <= x0 {
        return;
    }
    let src_data = src.data();

    let mut offset = 0.0f64;
    for op in ops {
        let d0 = (offset.round().max(0.0) as u32).min(dest_h);
        let d1 = ((offset + op.dest_len).round().max(0.0) as u32).min(dest_h);
        offset += op.dest_len;
        if d1 <= d0 || op.src_len == 0 {
            continue;
        }
        let rows = d1 - d0;
        for i in 0..rows {
            let sy = if rows == op.src_len {
                op.src_start + i
            } else {
                let t = (f64::from(i) + 0.5) / f64::from(rows);
                let rel = (t * f64::from(op.src_len)).floor().max(0.0) as u32;
                op.src_start + rel.min(op.src_len - 1)
            };
            let so = (sy as usize * width + x0) * 4;
            let to = ((d0 + i) as usize * width + x0) * 4;
            dest[to..to + (x1 - x0) * 4].copy_from_slice(&src_data[so..so + (x1 - x0) * 4]);
        }
    }
}

/// Column mirror of [`draw_rows`]: draws into a `dest_w`-wide raster of the
/// same height as `src`.
fn draw_cols(src: &PixelBuffer, dest: &mut [u8], dest_w: u32, strip: Range<u32>, ops: &[DrawOp]) {
    let src_w = src.width() as usize;
    let y0 = strip.start.min(src.height());
    let y1 = strip.end.min(src.height());
    if y1 <= y0 {
        return;
    }
    let src_data = src.data();

    let mut offset = 0.0f64;
    for op in ops {
        let d0 = (offset.round().max(0.0) as u32).min(dest_w);
        let d1 = ((offset + op.dest_len).round().max(0.0) as u32).min(dest_w);
        offset += op.dest_len;
        if d1 <= d0 || op.src_len == 0 {
            continue;
        }
        let cols = d1 - d0;
        for i in 0..cols {
            let sx = if cols == op.src_len {
                op.src_start + i
            } else {
                let t = (f64::from(i) + 0.5) / f64::from(cols);
                let rel = (t * f64::from(op.src_len)).floor().max(0.0) as u32;
                op.src_start + rel.min(op.src_len - 1)
            };
            for y in y0..y1 {
                let so = (y as usize * src_w + sx as usize) * 4;
                let d = (y as usize * dest_w as usize + (d0 + i) as usize) * 4;
                dest[d..d + 4].copy_from_slice(&src_data[so..so + 4]);
            }
        }
    }
}
