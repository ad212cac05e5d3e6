//! Drawing capability handed to the shape draw routines, plus the routine
//! registry keyed by element type tag.

use crate::element::{AttrMap, AttrValue, ElementKind};
use crate::repeater::PathDrawer;
use kurbo::{Arc, BezPath, PathEl, Point, Vec2};

/// Path-building primitives of a 2D drawing context.
pub trait DrawContext {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64);
    /// Circular arc around `(cx, cy)`, angles in radians.
    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, anticlockwise: bool);
    fn close_path(&mut self);
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
}

/// A recorded drawing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    BezierCurveTo(f64, f64, f64, f64, f64, f64),
    Arc {
        cx: f64,
        cy: f64,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    },
    ClosePath,
    Rect(f64, f64, f64, f64),
}

impl DrawContext for Vec<DrawCommand> {
    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::LineTo(x, y));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.push(DrawCommand::BezierCurveTo(cp1x, cp1y, cp2x, cp2y, x, y));
    }

    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        self.push(DrawCommand::Arc {
            cx,
            cy,
            radius,
            start,
            end,
            anticlockwise,
        });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::Rect(x, y, width, height));
    }
}

const ARC_TOLERANCE: f64 = 0.1;

fn has_current_point(path: &BezPath) -> bool {
    !matches!(path.elements().last(), None | Some(PathEl::ClosePath))
}

impl DrawContext for BezPath {
    fn move_to(&mut self, x: f64, y: f64) {
        BezPath::move_to(self, (x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        BezPath::line_to(self, (x, y));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.curve_to((cp1x, cp1y), (cp2x, cp2y), (x, y));
    }

    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        let full = std::f64::consts::TAU;
        let mut sweep = end - start;
        if anticlockwise {
            if sweep > 0.0 {
                sweep = (sweep % full) - full;
            }
        } else if sweep < 0.0 {
            sweep = (sweep % full) + full;
        }
        let sweep = sweep.clamp(-full, full);

        let center = Point::new(cx, cy);
        let begin = center + Vec2::from_angle(start) * radius;
        if has_current_point(self) {
            BezPath::line_to(self, begin);
        } else {
            BezPath::move_to(self, begin);
        }
        let arc = Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle: start,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        for el in arc.append_iter(ARC_TOLERANCE) {
            self.push(el);
        }
    }

    fn close_path(&mut self) {
        BezPath::close_path(self);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        BezPath::move_to(self, (x, y));
        BezPath::line_to(self, (x + width, y));
        BezPath::line_to(self, (x + width, y + height));
        BezPath::line_to(self, (x, y + height));
        BezPath::close_path(self);
    }
}

/// Signature shared by the draw routines: merged `shape` parameters of an
/// element and the context to draw into.
pub type DrawRoutine = fn(&AttrMap, &mut dyn DrawContext);

/// Looks up the routine registered for an element type tag.
///
/// The path routine uses the default straight-segment tolerance. Callers
/// compiling with a custom `path_epsilon` draw paths through
/// `CompileOptions::path_drawer` instead.
pub fn draw_routine(tag: &str) -> Option<DrawRoutine> {
    match tag {
        t if t == ElementKind::Path.tag() => Some(draw_path),
        t if t == ElementKind::Ellipse.tag() => Some(draw_ellipse),
        t if t == ElementKind::Rect.tag() => Some(draw_rect),
        _ => None,
    }
}

pub(crate) fn number(shape: &AttrMap, key: &str) -> Option<f64> {
    shape.get(key).and_then(AttrValue::as_f64)
}

// Always `DEFAULT_EPSILON`.
fn draw_path(shape: &AttrMap, ctx: &mut dyn DrawContext) {
    PathDrawer::default().draw(shape, ctx);
}

// Cubic approximation constant for a quarter ellipse.
const KAPPA: f64 = 0.5522848;

/// Ellipse centered at `(cx, cy)` with radii `rx`/`ry`. Circles go through
/// `arc`, everything else through four cubic quadrants.
fn draw_ellipse(shape: &AttrMap, ctx: &mut dyn DrawContext) {
    let cx = number(shape, "cx").unwrap_or(0.0);
    let cy = number(shape, "cy").unwrap_or(0.0);
    let rx = number(shape, "rx").unwrap_or(0.0);
    let ry = number(shape, "ry").unwrap_or(0.0);

    if rx == ry {
        ctx.arc(cx, cy, rx, 0.0, std::f64::consts::TAU, false);
        ctx.close_path();
        return;
    }

    let ox = rx * KAPPA;
    let oy = ry * KAPPA;
    ctx.move_to(cx - rx, cy);
    ctx.bezier_curve_to(cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry);
    ctx.bezier_curve_to(cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy);
    ctx.bezier_curve_to(cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry);
    ctx.bezier_curve_to(cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy);
    ctx.close_path();
}

/// Rectangle centered at `(cx, cy)`; `r` rounds the corners, clamped to
/// half the shorter side.
fn draw_rect(shape: &AttrMap, ctx: &mut dyn DrawContext) {
    let cx = number(shape, "cx").unwrap_or(0.0);
    let cy = number(shape, "cy").unwrap_or(0.0);
    let width = number(shape, "width").unwrap_or(0.0);
    let height = number(shape, "height").unwrap_or(0.0);
    let r = number(shape, "r")
        .unwrap_or(0.0)
        .clamp(0.0, width.min(height) / 2.0);

    let (x, y) = (cx - width / 2.0, cy - height / 2.0);
    if r <= 0.0 {
        ctx.rect(x, y, width, height);
        return;
    }

    let k = r * (1.0 - KAPPA);
    let (right, bottom) = (x + width, y + height);
    ctx.move_to(x + r, y);
    ctx.line_to(right - r, y);
    ctx.bezier_curve_to(right - k, y, right, y + k, right, y + r);
    ctx.line_to(right, bottom - r);
    ctx.bezier_curve_to(right, bottom - k, right - k, bottom, right - r, bottom);
    ctx.line_to(x + r, bottom);
    ctx.bezier_curve_to(x + k, bottom, x, bottom - k, x, bottom - r);
    ctx.line_to(x, y + r);
    ctx.bezier_curve_to(x, y + k, x + k, y, x + r, y);
    ctx.close_path();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(entries: &[(&str, f64)]) -> AttrMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), AttrValue::Number(*v)))
            .collect()
    }

    #[test]
    fn test_registry_covers_shape_tags() {
        assert!(draw_routine("lottie-shape-path").is_some());
        assert!(draw_routine("lottie-shape-ellipse").is_some());
        assert!(draw_routine("lottie-shape-rect").is_some());
        assert!(draw_routine("group").is_none());
    }

    #[test]
    fn test_path_routine_uses_default_tolerance() {
        let mut path = AttrMap::new();
        path.insert("v".into(), AttrValue::Points(vec![[0.0, 0.0], [10.0, 0.0]]));
        path.insert("in".into(), AttrValue::Points(vec![[0.0, 0.0], [10.0, 0.0]]));
        path.insert("out".into(), AttrValue::Points(vec![[1e-5, 0.0], [10.0, 0.0]]));
        path.insert("close".into(), AttrValue::Bool(false));

        let mut registry: Vec<DrawCommand> = Vec::new();
        draw_routine("lottie-shape-path").unwrap()(&path, &mut registry);
        assert!(matches!(registry[1], DrawCommand::BezierCurveTo(..)));

        let options = crate::options::CompileOptions {
            path_epsilon: 1e-3,
            ..Default::default()
        };
        let mut configured: Vec<DrawCommand> = Vec::new();
        options.path_drawer().draw(&path, &mut configured);
        assert_eq!(configured[1], DrawCommand::LineTo(10.0, 0.0));
    }

    #[test]
    fn test_circle_uses_arc() {
        let mut out: Vec<DrawCommand> = Vec::new();
        let routine = draw_routine("lottie-shape-ellipse").unwrap();
        routine(&shape(&[("cx", 50.0), ("cy", 50.0), ("rx", 10.0), ("ry", 10.0)]), &mut out);

        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], DrawCommand::Arc { radius, .. } if radius == 10.0));
        assert_eq!(out[1], DrawCommand::ClosePath);
    }

    #[test]
    fn test_ellipse_uses_four_quadrants() {
        let mut out: Vec<DrawCommand> = Vec::new();
        draw_ellipse(&shape(&[("rx", 20.0), ("ry", 10.0)]), &mut out);

        assert_eq!(out[0], DrawCommand::MoveTo(-20.0, 0.0));
        let curves = out
            .iter()
            .filter(|c| matches!(c, DrawCommand::BezierCurveTo(..)))
            .count();
        assert_eq!(curves, 4);
        assert_eq!(out.last(), Some(&DrawCommand::ClosePath));
    }

    #[test]
    fn test_rect_is_centered() {
        let mut out: Vec<DrawCommand> = Vec::new();
        draw_rect(
            &shape(&[("cx", 10.0), ("cy", 10.0), ("width", 20.0), ("height", 10.0)]),
            &mut out,
        );
        assert_eq!(out, vec![DrawCommand::Rect(0.0, 5.0, 20.0, 10.0)]);
    }

    #[test]
    fn test_bezpath_context_builds_kurbo_path() {
        let mut path = BezPath::new();
        draw_rect(
            &shape(&[("width", 10.0), ("height", 10.0), ("r", 2.0)]),
            &mut path,
        );
        let bbox = kurbo::Shape::bounding_box(&path);
        assert!((bbox.width() - 10.0).abs() < 1e-9);
        assert!((bbox.height() - 10.0).abs() < 1e-9);

        let mut circle = BezPath::new();
        DrawContext::arc(&mut circle, 0.0, 0.0, 5.0, 0.0, std::f64::consts::TAU, false);
        let bbox = kurbo::Shape::bounding_box(&circle);
        assert!((bbox.width() - 10.0).abs() < 0.25);
    }
}
