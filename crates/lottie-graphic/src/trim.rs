//! Arc-length trimming of a path to a `[start, end]` fraction range.

use crate::draw::{number, DrawContext};
use crate::element::AttrMap;
use crate::path::{build_path, PathView, Segment};

/// Fractions of the total path length to keep, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

impl TrimRange {
    pub fn new(start: f64, end: f64) -> Self {
        let (start, end) = (start.clamp(0.0, 1.0), end.clamp(0.0, 1.0));
        if start <= end {
            TrimRange { start, end }
        } else {
            TrimRange {
                start: end,
                end: start,
            }
        }
    }

    /// `trimStart`/`trimEnd` of a path element, if either is present.
    pub fn from_shape(shape: &AttrMap) -> Option<Self> {
        let start = number(shape, "trimStart");
        let end = number(shape, "trimEnd");
        if start.is_none() && end.is_none() {
            return None;
        }
        Some(TrimRange::new(start.unwrap_or(0.0), end.unwrap_or(1.0)))
    }

    pub fn is_identity(&self) -> bool {
        self.start <= 0.0 && self.end >= 1.0
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Draws only the `range` portion of `view`. The full range draws the
/// untrimmed path, an empty range draws nothing. Trimmed output is never
/// closed.
pub fn trim_path(
    view: &PathView<'_>,
    range: TrimRange,
    epsilon: f64,
    ctx: &mut dyn DrawContext,
) {
    if range.is_identity() {
        build_path(view, epsilon, ctx);
        return;
    }
    if range.is_empty() {
        return;
    }

    let segments: Vec<(Segment, f64)> = view
        .segments(epsilon)
        .map(|segment| (segment, segment.length()))
        .collect();
    let total: f64 = segments.iter().map(|(_, length)| length).sum();
    if total <= 0.0 {
        return;
    }

    let from = range.start * total;
    let to = range.end * total;
    let mut offset = 0.0;
    let mut started = false;

    for (segment, length) in &segments {
        let seg_start = offset;
        let seg_end = offset + length;
        offset = seg_end;

        if seg_end <= from {
            continue;
        }
        if seg_start >= to {
            break;
        }

        let t0 = ((from - seg_start) / length).max(0.0);
        let t1 = ((to - seg_start) / length).min(1.0);
        let piece = if t0 <= 0.0 && t1 >= 1.0 {
            *segment
        } else {
            segment.between(t0, t1)
        };

        if !started {
            let p = piece.start();
            ctx.move_to(p.x, p.y);
            started = true;
        }
        piece.emit(ctx);
    }
}
