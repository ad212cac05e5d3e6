//! Resolves animatable properties into static attributes or timelines.

use crate::element::{merge_patch, patch, target_mut, Element};
use crate::timeline::{build_timeline, TimeContext, Timeline};
use lottie_data::model::{Property, Value, Vector};

/// Numeric conversion applied to every resolved value (percent → ratio,
/// degrees → radians, ...).
pub type Convert = fn(f64) -> f64;

/// Per-axis access to a property value.
pub trait Axes {
    fn axis(&self, index: usize) -> Option<f64>;
}

impl Axes for f64 {
    // A scalar feeds every axis.
    fn axis(&self, _index: usize) -> Option<f64> {
        Some(*self)
    }
}

impl Axes for Vec<f64> {
    fn axis(&self, index: usize) -> Option<f64> {
        self.get(index).copied()
    }
}

/// Writes `prop` into `element` under `target` (empty string: the attribute
/// root), one output name per axis.
///
/// Static values become attributes. Keyframed values become one timeline
/// per axis, and the first keyframe also seeds the static attribute so the
/// element starts out in its initial state. Absent or malformed properties
/// leave the element untouched.
pub fn resolve_property<T: Axes>(
    prop: &Property<T>,
    target: &str,
    names: &[&str],
    convert: Option<Convert>,
    element: &mut Element,
    clock: &TimeContext,
) {
    let apply = |v: f64| convert.map_or(v, |f| f(v));

    match &prop.k {
        Value::Default => {}
        Value::Static(value) => {
            let attrs = target_mut(&mut element.attrs, target);
            for (index, name) in names.iter().enumerate() {
                if let Some(v) = value.axis(index) {
                    attrs.insert((*name).to_owned(), apply(v).into());
                }
            }
        }
        Value::Animated(keyframes) => {
            for (index, name) in names.iter().enumerate() {
                let timeline = build_timeline(keyframes, index, clock, |value: &T| {
                    value.axis(index).map(|v| patch(target, name, apply(v)))
                });
                if let Some(timeline) = timeline {
                    push_timeline(element, timeline);
                }
            }
        }
    }
}

/// Writes a color property as `rgba(...)` under `target.name`. Keyframed
/// colors produce a single timeline eased by the first axis's handles.
pub fn resolve_color(
    prop: &Property<Vector>,
    target: &str,
    name: &str,
    element: &mut Element,
    clock: &TimeContext,
) {
    match &prop.k {
        Value::Default => {}
        Value::Static(color) => {
            if let Some(color) = color_string(color) {
                target_mut(&mut element.attrs, target).insert(name.to_owned(), color.into());
            }
        }
        Value::Animated(keyframes) => {
            let timeline = build_timeline(keyframes, 0, clock, |color: &Vector| {
                color_string(color).map(|c| patch(target, name, c))
            });
            if let Some(timeline) = timeline {
                push_timeline(element, timeline);
            }
        }
    }
}

/// `rgba(r,g,b,a)` from 0-1 channels; alpha defaults to 1.
pub fn color_string(color: &[f64]) -> Option<String> {
    let channel = |i: usize| color.get(i).map(|c| (c * 255.0).round());
    let (r, g, b) = (channel(0)?, channel(1)?, channel(2)?);
    let a = color.get(3).copied().unwrap_or(1.0);
    Some(format!("rgba({r},{g},{b},{a})"))
}

/// Appends `timeline`, seeding the static attributes with its first patch.
pub(crate) fn push_timeline(element: &mut Element, timeline: Timeline) {
    if let Some(first) = timeline.first_patch() {
        merge_patch(&mut element.attrs, first);
    }
    element.timelines.push(timeline);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AttrValue, ElementKind};
    use serde_json::json;

    fn clock() -> TimeContext {
        TimeContext::new(30.0, 30.0)
    }

    fn prop<T: serde::de::DeserializeOwned + Default>(value: serde_json::Value) -> Property<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_static_vector_maps_axes() {
        let mut el = Element::shape(ElementKind::Rect);
        let size: Property<Vector> = prop(json!({ "k": [40, 20] }));
        resolve_property(&size, "shape", &["width", "height"], None, &mut el, &clock());

        assert_eq!(el.nested("shape", "width"), Some(&AttrValue::Number(40.0)));
        assert_eq!(el.nested("shape", "height"), Some(&AttrValue::Number(20.0)));
        assert!(el.timelines.is_empty());
    }

    #[test]
    fn test_static_scalar_feeds_every_axis_with_conversion() {
        let mut el = Element::group();
        let scale: Property<f64> = prop(json!({ "k": 50 }));
        resolve_property(
            &scale,
            "",
            &["scaleX", "scaleY"],
            Some(|v| v / 100.0),
            &mut el,
            &clock(),
        );
        assert_eq!(el.number("scaleX"), Some(0.5));
        assert_eq!(el.number("scaleY"), Some(0.5));
    }

    #[test]
    fn test_animated_vector_yields_timeline_per_axis() {
        let mut el = Element::group();
        let position: Property<Vector> = prop(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [0, 10] },
                { "t": 30, "s": [100, 20] }
            ]
        }));
        resolve_property(&position, "", &["x", "y"], None, &mut el, &clock());

        assert_eq!(el.timelines.len(), 2);
        assert!(el.timelines[0].touches("x"));
        assert!(el.timelines[1].touches("y"));
        assert_eq!(el.number("x"), Some(0.0));
        assert_eq!(el.number("y"), Some(10.0));
    }

    #[test]
    fn test_absent_property_is_ignored() {
        let mut el = Element::group();
        let absent: Property<Vector> = Property::default();
        resolve_property(&absent, "", &["x", "y"], None, &mut el, &clock());
        resolve_color(&absent, "style", "fill", &mut el, &clock());
        assert!(el.attrs.is_empty());
        assert!(el.timelines.is_empty());
    }

    #[test]
    fn test_color_strings() {
        assert_eq!(
            color_string(&[1.0, 0.0, 0.2, 1.0]).as_deref(),
            Some("rgba(255,0,51,1)")
        );
        assert_eq!(color_string(&[0.5, 0.5, 0.5]).as_deref(), Some("rgba(128,128,128,1)"));
        assert_eq!(color_string(&[1.0]), None);
    }

    #[test]
    fn test_animated_color_is_one_timeline() {
        let mut el = Element::shape(ElementKind::Path);
        let color: Property<Vector> = prop(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [1, 0, 0, 1] },
                { "t": 30, "s": [0, 0, 1, 1] }
            ]
        }));
        resolve_color(&color, "style", "fill", &mut el, &clock());

        assert_eq!(el.timelines.len(), 1);
        let last = &el.timelines[0].keyframes[1].patch;
        assert_eq!(
            last["style"].as_map().unwrap()["fill"].as_str(),
            Some("rgba(0,0,255,1)")
        );
        assert_eq!(
            el.nested("style", "fill").and_then(AttrValue::as_str),
            Some("rgba(255,0,0,1)")
        );
    }
}
