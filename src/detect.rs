//! Table line detection over raw pixels.
//!
//! Every interior scan line is searched for contrast runs; runs long enough
//! to be line evidence are clustered by position, then each cluster is
//! projected to a full-span grid line. A detected segment is treated as
//! evidence for an infinite cutting plane across the whole image, not just
//! the locally observed span.

use crate::buffer::PixelBuffer;
use crate::grid::{Grid, GridLine};

/// Luminance-sum difference against a cross-axis neighbor that makes a pixel
/// an edge pixel.
const EDGE_DELTA: i32 = 40;
/// Segments whose positions differ by at most this many pixels collapse into
/// one line candidate.
const CLUSTER_POS_GAP: f64 = 3.0;
/// Sub-segments of one candidate merge across gaps up to this long.
const SUBSEG_MERGE_GAP: f64 = 4.0;
/// A border line is synthesized unless a detected line sits this close to
/// the image edge.
const BORDER_SNAP: f64 = 5.0;

/// Contiguous run of edge pixels along one scan line. Never leaves this
/// module.
#[derive(Clone, Copy, Debug)]
struct Segment {
    pos: u32,
    start: u32,
    /// Exclusive.
    end: u32,
}

/// Full-span projection of one segment cluster, position rounded to the
/// cluster mean.
#[derive(Clone, Debug)]
struct LineCandidate {
    pos: f64,
    thickness: f64,
    spans: Vec<(f64, f64)>,
}

fn min_segment_len(width: u32, height: u32) -> f64 {
    (0.01 * f64::from(width.min(height))).max(16.0)
}

/// Detect the table's line grid.
///
/// An image with no qualifying contrast runs yields a grid containing only
/// the four border lines (a single full-image cell); that is a valid result,
/// not an error.
#[tracing::instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn detect(buffer: &PixelBuffer) -> Grid {
    let (w, h) = (buffer.width(), buffer.height());
    let min_len = min_segment_len(w, h);

    let row_segments = scan_rows(buffer, min_len);
    let col_segments = scan_cols(buffer, min_len);
    tracing::debug!(
        rows = row_segments.len(),
        cols = col_segments.len(),
        "edge segments"
    );

    let horizontal = project(cluster(row_segments), f64::from(w), f64::from(h));
    let vertical = project(cluster(col_segments), f64::from(h), f64::from(w));
    tracing::debug!(
        horizontal = horizontal.len(),
        vertical = vertical.len(),
        "grid lines"
    );

    Grid {
        horizontal,
        vertical,
    }
}

/// Horizontal segments: a pixel is an edge when its luminance differs enough
/// from the row above or below.
fn scan_rows(buffer: &PixelBuffer, min_len: f64) -> Vec<Segment> {
    let (w, h) = (buffer.width(), buffer.height());
    let mut segments = Vec::new();
    if h < 3 {
        return segments;
    }
    for y in 1..h - 1 {
        let mut run_start = None;
        for x in 0..w {
            let lum = i32::from(buffer.lum(x, y));
            let above = i32::from(buffer.lum(x, y - 1));
            let below = i32::from(buffer.lum(x, y + 1));
            let edge = (lum - above).abs() > EDGE_DELTA || (lum - below).abs() > EDGE_DELTA;
            match (edge, run_start) {
                (true, None) => run_start = Some(x),
                (false, Some(start)) => {
                    push_run(&mut segments, y, start, x, min_len);
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            push_run(&mut segments, y, start, w, min_len);
        }
    }
    segments
}

/// Vertical segments: mirror of [`scan_rows`] using left/right neighbors.
fn scan_cols(buffer: &PixelBuffer, min_len: f64) -> Vec<Segment> {
    let (w, h) = (buffer.width(), buffer.height());
    let mut segments = Vec::new();
    if w < 3 {
        return segments;
    }
    for x in 1..w - 1 {
        let mut run_start = None;
        for y in 0..h {
            let lum = i32::from(buffer.lum(x, y));
            let left = i32::from(buffer.lum(x - 1, y));
            let right = i32::from(buffer.lum(x + 1, y));
            let edge = (lum - left).abs() > EDGE_DELTA || (lum - right).abs() > EDGE_DELTA;
            match (edge, run_start) {
                (true, None) => run_start = Some(y),
                (false, Some(start)) => {
                    push_run(&mut segments, x, start, y, min_len);
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            push_run(&mut segments, x, start, h, min_len);
        }
    }
    segments
}

fn push_run(segments: &mut Vec<Segment>, pos: u32, start: u32, end: u32, min_len: f64) {
    if f64::from(end - start) > min_len {
        segments.push(Segment { pos, start, end });
    }
}

/// Group segments whose positions chain within [`CLUSTER_POS_GAP`], assign
/// each group its rounded mean position, and merge each group's sub-segments
/// across gaps of at most [`SUBSEG_MERGE_GAP`]. Robust to anti-aliasing and
/// near-parallel stray edges.
fn cluster(mut segments: Vec<Segment>) -> Vec<LineCandidate> {
    segments.sort_by_key(|s| (s.pos, s.start));

    let mut out = Vec::new();
    let mut group: Vec<Segment> = Vec::new();
    for segment in segments {
        let split = group
            .last()
            .is_some_and(|last| f64::from(segment.pos) - f64::from(last.pos) > CLUSTER_POS_GAP);
        if split {
            out.push(finish_group(&group));
            group.clear();
        }
        group.push(segment);
    }
    if !group.is_empty() {
        out.push(finish_group(&group));
    }
    out
}

fn finish_group(group: &[Segment]) -> LineCandidate {
    let mut sum = 0.0;
    let mut min_pos = u32::MAX;
    let mut max_pos = 0u32;
    for segment in group {
        sum += f64::from(segment.pos);
        min_pos = min_pos.min(segment.pos);
        max_pos = max_pos.max(segment.pos);
    }
    let pos = (sum / group.len() as f64).round();

    let mut spans: Vec<(f64, f64)> = group
        .iter()
        .map(|s| (f64::from(s.start), f64::from(s.end)))
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start - last.1 <= SUBSEG_MERGE_GAP => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    LineCandidate {
        pos,
        thickness: f64::from(max_pos - min_pos + 1),
        spans: merged,
    }
}

/// Emit one full-span line per candidate and synthesize thickness-0 border
/// lines at 0 and `border_extent` when nothing was detected near the edge.
fn project(candidates: Vec<LineCandidate>, span_extent: f64, border_extent: f64) -> Vec<GridLine> {
    let evidence: f64 = candidates
        .iter()
        .flat_map(|c| c.spans.iter())
        .map(|(start, end)| end - start)
        .sum();
    tracing::debug!(candidates = candidates.len(), evidence, "projecting lines");

    let mut lines: Vec<GridLine> = candidates
        .into_iter()
        .map(|c| GridLine::full_span(c.pos, c.thickness, span_extent))
        .collect();

    if !lines.iter().any(|l| l.pos.abs() <= BORDER_SNAP) {
        lines.push(GridLine::full_span(0.0, 0.0, span_extent));
    }
    if !lines.iter().any(|l| (l.pos - border_extent).abs() <= BORDER_SNAP) {
        lines.push(GridLine::full_span(border_extent, 0.0, span_extent));
    }

    lines.sort_by(|a, b| a.pos.total_cmp(&b.pos));
    lines
}
