use crate::element::Element;
use crate::timeline::TimeContext;
use crate::value::resolve_property;
use lottie_data::model::{PositionProperty, Transform};

pub(crate) fn percent_to_ratio(v: f64) -> f64 {
    v / 100.0
}

// Lottie rotates clockwise in degrees; the element model takes
// counter-clockwise radians.
pub(crate) fn degrees_to_rotation(v: f64) -> f64 {
    -v.to_radians()
}

/// Writes position, scale, rotation and anchor of `transform` onto
/// `element`. The anchor lands in `anchorX`/`anchorY`, which only the pivot
/// rewriter reads.
pub fn apply_transform(transform: &Transform, element: &mut Element, clock: &TimeContext) {
    match &transform.p {
        PositionProperty::Unified(p) => {
            resolve_property(p, "", &["x", "y"], None, element, clock);
        }
        PositionProperty::Split { x, y, .. } => {
            resolve_property(x, "", &["x"], None, element, clock);
            resolve_property(y, "", &["y"], None, element, clock);
        }
    }
    resolve_property(
        &transform.s,
        "",
        &["scaleX", "scaleY"],
        Some(percent_to_ratio),
        element,
        clock,
    );
    resolve_property(
        &transform.rz,
        "",
        &["rotation"],
        Some(degrees_to_rotation),
        element,
        clock,
    );
    resolve_property(&transform.a, "", &["anchorX", "anchorY"], None, element, clock);
}
