//! `lottie-shape-path` drawing with trimming and repeated copies.

use crate::draw::{number, DrawContext};
use crate::element::AttrMap;
use crate::path::{build_path, PathView, DEFAULT_EPSILON};
use crate::trim::{trim_path, TrimRange};
use glam::{DMat3, DVec2};
use lottie_data::model::Vec2;

/// Repeat parameters of a path element. Copy `i` is offset by `offset * i`,
/// rotated by `rotation * i` and scaled by `scale^i` around `anchor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repeat {
    /// Total number of drawn copies, the untransformed base included.
    pub copies: usize,
    pub offset: DVec2,
    /// Radians, clockwise in y-down space.
    pub rotation: f64,
    pub scale: DVec2,
    pub anchor: DVec2,
}

impl Repeat {
    pub fn from_shape(shape: &AttrMap) -> Option<Self> {
        let count = number(shape, "repeatCount")?;
        let pair = |x: &str, y: &str, default: f64| {
            DVec2::new(
                number(shape, x).unwrap_or(default),
                number(shape, y).unwrap_or(default),
            )
        };
        Some(Repeat {
            copies: count.round().max(0.0) as usize,
            offset: pair("repeatX", "repeatY", 0.0),
            rotation: number(shape, "repeatRotation").unwrap_or(0.0),
            scale: pair("repeatScaleX", "repeatScaleY", 1.0),
            anchor: pair("repeatAnchorX", "repeatAnchorY", 0.0),
        })
    }

    pub fn matrix(&self, index: usize) -> DMat3 {
        let i = index as f64;
        let scale = DVec2::new(
            self.scale.x.powi(index as i32),
            self.scale.y.powi(index as i32),
        );
        DMat3::from_translation(self.offset * i)
            * DMat3::from_translation(self.anchor)
            * DMat3::from_angle(self.rotation * i)
            * DMat3::from_scale(scale)
            * DMat3::from_translation(-self.anchor)
    }
}

/// Draws path elements. Transformed copies are written into scratch
/// buffers owned by the drawer and reused between copies and calls.
#[derive(Debug, Clone)]
pub struct PathDrawer {
    epsilon: f64,
    vertices: Vec<Vec2>,
    in_tangents: Vec<Vec2>,
    out_tangents: Vec<Vec2>,
}

impl Default for PathDrawer {
    fn default() -> Self {
        PathDrawer::new(DEFAULT_EPSILON)
    }
}

impl PathDrawer {
    pub fn new(epsilon: f64) -> Self {
        PathDrawer {
            epsilon,
            vertices: Vec::new(),
            in_tangents: Vec::new(),
            out_tangents: Vec::new(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Draws the path described by `shape` (`v`, `in`, `out`, `close`, plus
    /// optional trim and repeat parameters).
    pub fn draw(&mut self, shape: &AttrMap, ctx: &mut dyn DrawContext) {
        let Some(base) = PathView::from_shape(shape) else {
            return;
        };
        let trim = TrimRange::from_shape(shape);
        draw_view(&base, trim, self.epsilon, ctx);

        let Some(repeat) = Repeat::from_shape(shape) else {
            return;
        };
        for index in 1..repeat.copies {
            let m = repeat.matrix(index);
            transform_into(&mut self.vertices, base.vertices, &m);
            transform_into(&mut self.in_tangents, base.in_tangents, &m);
            transform_into(&mut self.out_tangents, base.out_tangents, &m);

            let copy = PathView {
                vertices: &self.vertices,
                in_tangents: &self.in_tangents,
                out_tangents: &self.out_tangents,
                closed: base.closed,
            };
            draw_view(&copy, trim, self.epsilon, ctx);
        }
    }
}

fn draw_view(
    view: &PathView<'_>,
    trim: Option<TrimRange>,
    epsilon: f64,
    ctx: &mut dyn DrawContext,
) {
    match trim {
        Some(range) => trim_path(view, range, epsilon, ctx),
        None => build_path(view, epsilon, ctx),
    }
}

fn transform_into(buffer: &mut Vec<Vec2>, source: &[Vec2], m: &DMat3) {
    buffer.clear();
    buffer.extend(source.iter().map(|p| {
        let q = m.transform_point2(DVec2::new(p[0], p[1]));
        [q.x, q.y]
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawCommand;
    use crate::element::AttrValue;

    fn segment_shape(extra: &[(&str, f64)]) -> AttrMap {
        let points = vec![[0.0, 0.0], [10.0, 0.0]];
        let mut shape = AttrMap::new();
        shape.insert("v".into(), AttrValue::Points(points.clone()));
        shape.insert("in".into(), AttrValue::Points(points.clone()));
        shape.insert("out".into(), AttrValue::Points(points));
        shape.insert("close".into(), AttrValue::Bool(false));
        for (k, v) in extra {
            shape.insert((*k).into(), AttrValue::Number(*v));
        }
        shape
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_plain_path_draws_once() {
        let mut out: Vec<DrawCommand> = Vec::new();
        PathDrawer::default().draw(&segment_shape(&[]), &mut out);
        assert_eq!(
            out,
            vec![DrawCommand::MoveTo(0.0, 0.0), DrawCommand::LineTo(10.0, 0.0)]
        );
    }

    #[test]
    fn test_copies_accumulate_offset() {
        let mut out: Vec<DrawCommand> = Vec::new();
        let shape = segment_shape(&[("repeatCount", 3.0), ("repeatY", 5.0)]);
        PathDrawer::default().draw(&shape, &mut out);

        let starts: Vec<(f64, f64)> = out
            .iter()
            .filter_map(|c| match c {
                DrawCommand::MoveTo(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![(0.0, 0.0), (0.0, 5.0), (0.0, 10.0)]);
    }

    #[test]
    fn test_copies_rotate_and_scale_about_anchor() {
        let mut out: Vec<DrawCommand> = Vec::new();
        let shape = segment_shape(&[
            ("repeatCount", 2.0),
            ("repeatRotation", std::f64::consts::FRAC_PI_2),
            ("repeatScaleX", 2.0),
            ("repeatScaleY", 2.0),
        ]);
        PathDrawer::default().draw(&shape, &mut out);

        assert_eq!(out.len(), 4);
        let DrawCommand::LineTo(x, y) = out[3] else {
            panic!("expected line_to, got {:?}", out[3]);
        };
        // (10, 0) scaled by 2 then turned a quarter.
        assert!(approx(x, 0.0));
        assert!(approx(y, 20.0));
    }

    #[test]
    fn test_repeat_matrix_identity_for_base() {
        let shape = segment_shape(&[("repeatCount", 4.0), ("repeatX", 3.0)]);
        let repeat = Repeat::from_shape(&shape).unwrap();
        assert_eq!(repeat.copies, 4);
        let p = repeat.matrix(0).transform_point2(DVec2::new(1.0, 2.0));
        assert!(approx(p.x, 1.0) && approx(p.y, 2.0));
        let p = repeat.matrix(2).transform_point2(DVec2::new(1.0, 2.0));
        assert!(approx(p.x, 7.0) && approx(p.y, 2.0));
    }
}
