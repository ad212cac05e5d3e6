//! Path geometry: vertex/tangent arrays to draw commands.

use crate::draw::DrawContext;
use crate::element::{AttrMap, AttrValue};
use kurbo::{CubicBez, Line, ParamCurve, Point};
use lottie_data::model::{BezierPath, Vec2};

/// Handles closer than this to their vertex count as absent.
pub const DEFAULT_EPSILON: f64 = 1e-8;

const ARC_SAMPLES: usize = 10;

/// Borrowed vertex/tangent arrays. Tangents are absolute control points.
#[derive(Debug, Clone, Copy)]
pub struct PathView<'a> {
    pub vertices: &'a [Vec2],
    pub in_tangents: &'a [Vec2],
    pub out_tangents: &'a [Vec2],
    pub closed: bool,
}

impl<'a> PathView<'a> {
    /// Reads `v`, `in`, `out` and `close` from a path element's shape
    /// parameters. Without `v` there is nothing to draw.
    pub fn from_shape(shape: &'a AttrMap) -> Option<Self> {
        let points = |key: &str| shape.get(key).and_then(AttrValue::as_points);
        Some(PathView {
            vertices: points("v")?,
            in_tangents: points("in").unwrap_or_default(),
            out_tangents: points("out").unwrap_or_default(),
            closed: shape
                .get("close")
                .and_then(AttrValue::as_bool)
                .unwrap_or(false),
        })
    }

    pub fn from_bezier(path: &'a BezierPath) -> Self {
        PathView {
            vertices: &path.v,
            in_tangents: &path.i,
            out_tangents: &path.o,
            closed: path.c,
        }
    }

    pub fn segment_count(&self) -> usize {
        match self.vertices.len() {
            0 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }

    /// Segments in drawing order; a closed path ends with the segment back
    /// to the first vertex.
    pub fn segments(self, epsilon: f64) -> impl Iterator<Item = Segment> + 'a {
        let n = self.vertices.len();
        (0..self.segment_count()).map(move |k| {
            let from = self.vertices[k];
            let to = self.vertices[(k + 1) % n];
            let out = self.out_tangents.get(k).copied().unwrap_or(from);
            let inc = self.in_tangents.get((k + 1) % n).copied().unwrap_or(to);

            if near(out, from, epsilon) && near(inc, to, epsilon) {
                Segment::Line(Line::new(point(from), point(to)))
            } else {
                Segment::Cubic(CubicBez::new(point(from), point(out), point(inc), point(to)))
            }
        })
    }
}

fn near(a: Vec2, b: Vec2, epsilon: f64) -> bool {
    (a[0] - b[0]).abs() < epsilon && (a[1] - b[1]).abs() < epsilon
}

fn point(p: Vec2) -> Point {
    Point::new(p[0], p[1])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Line),
    Cubic(CubicBez),
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line(l) => l.p0,
            Segment::Cubic(c) => c.p0,
        }
    }

    /// Euclidean length for lines, a fixed ten-step polyline for cubics.
    pub fn length(&self) -> f64 {
        match self {
            Segment::Line(l) => l.p0.distance(l.p1),
            Segment::Cubic(c) => {
                let mut length = 0.0;
                let mut prev = c.p0;
                for step in 1..=ARC_SAMPLES {
                    let next = c.eval(step as f64 / ARC_SAMPLES as f64);
                    length += prev.distance(next);
                    prev = next;
                }
                length
            }
        }
    }

    /// The part between parameters `t0 <= t1`.
    pub fn between(&self, t0: f64, t1: f64) -> Segment {
        match self {
            Segment::Line(l) => {
                Segment::Line(Line::new(l.p0.lerp(l.p1, t0), l.p0.lerp(l.p1, t1)))
            }
            Segment::Cubic(c) => {
                let tail = if t0 > 0.0 { split(c, t0).1 } else { *c };
                if t1 >= 1.0 {
                    return Segment::Cubic(tail);
                }
                // `t1` re-expressed on the tail.
                let local = if t0 < 1.0 { (t1 - t0) / (1.0 - t0) } else { 0.0 };
                Segment::Cubic(split(&tail, local).0)
            }
        }
    }

    pub(crate) fn emit(&self, ctx: &mut dyn DrawContext) {
        match self {
            Segment::Line(l) => ctx.line_to(l.p1.x, l.p1.y),
            Segment::Cubic(c) => {
                ctx.bezier_curve_to(c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y)
            }
        }
    }
}

/// De Casteljau split of `c` at `t`.
fn split(c: &CubicBez, t: f64) -> (CubicBez, CubicBez) {
    let p01 = c.p0.lerp(c.p1, t);
    let p12 = c.p1.lerp(c.p2, t);
    let p23 = c.p2.lerp(c.p3, t);
    let p012 = p01.lerp(p12, t);
    let p123 = p12.lerp(p23, t);
    let mid = p012.lerp(p123, t);
    (
        CubicBez::new(c.p0, p01, p012, mid),
        CubicBez::new(mid, p123, p23, c.p3),
    )
}

/// Draws the whole path: a straight line where both handles sit on their
/// vertices, a cubic otherwise. A straight closing segment is left to
/// `close_path`.
pub fn build_path(view: &PathView<'_>, epsilon: f64, ctx: &mut dyn DrawContext) {
    let Some(first) = view.vertices.first() else {
        return;
    };
    ctx.move_to(first[0], first[1]);

    let count = view.segment_count();
    for (k, segment) in view.segments(epsilon).enumerate() {
        let closing = view.closed && k + 1 == count;
        if closing && matches!(segment, Segment::Line(_)) {
            continue;
        }
        segment.emit(ctx);
    }
    if view.closed {
        ctx.close_path();
    }
}
