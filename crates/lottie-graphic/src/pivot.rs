use crate::element::{AttrValue, Element};

const ANCHOR_KEYS: [&str; 2] = ["anchorX", "anchorY"];
const WRAPPER_KEYS: [&str; 5] = ["x", "y", "scaleX", "scaleY", "rotation"];

/// Rewrites an anchor point into a group pair, since elements scale and
/// rotate around their own origin.
///
/// The returned wrapper carries position, scale and rotation (static and
/// animated); `element` moves inside it, offset by the negated anchor.
/// Elements without an anchor come back unchanged apart from losing the
/// internal anchor attributes.
pub fn rewrite_pivot(mut element: Element) -> Element {
    let anchor_x = take_number(&mut element, ANCHOR_KEYS[0]);
    let anchor_y = take_number(&mut element, ANCHOR_KEYS[1]);
    let anchor_animated = element
        .timelines
        .iter()
        .any(|t| ANCHOR_KEYS.iter().any(|key| t.touches(key)));

    if !anchor_animated && anchor_x == 0.0 && anchor_y == 0.0 {
        return element;
    }

    let mut wrapper = Element::group();
    wrapper.name = element.name.take();
    for key in WRAPPER_KEYS {
        if let Some(value) = element.attrs.remove(key) {
            wrapper.attrs.insert(key.to_owned(), value);
        }
    }

    let (outer, inner): (Vec<_>, Vec<_>) = std::mem::take(&mut element.timelines)
        .into_iter()
        .partition(|t| WRAPPER_KEYS.iter().any(|key| t.touches(key)));
    wrapper.timelines = outer;
    element.timelines = inner;
    for timeline in &mut element.timelines {
        timeline.retarget("anchorX", "x", |v| -v);
        timeline.retarget("anchorY", "y", |v| -v);
    }

    element.attrs.insert("x".to_owned(), (-anchor_x).into());
    element.attrs.insert("y".to_owned(), (-anchor_y).into());

    wrapper.push_child(element);
    wrapper
}

fn take_number(element: &mut Element, key: &str) -> f64 {
    element
        .attrs
        .remove(key)
        .as_ref()
        .and_then(AttrValue::as_f64)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::timeline::TimeContext;
    use crate::transform::apply_transform;
    use lottie_data::model::Transform;
    use serde_json::json;

    fn transformed(kind: ElementKind, ks: serde_json::Value) -> Element {
        let ks: Transform = serde_json::from_value(ks).unwrap();
        let mut el = Element::shape(kind).with_name(Some("Box"));
        apply_transform(&ks, &mut el, &TimeContext::new(30.0, 30.0));
        el
    }

    #[test]
    fn test_static_anchor_becomes_group_pair() {
        let el = transformed(
            ElementKind::Rect,
            json!({ "a": { "k": [10, 10] }, "p": { "k": [50, 50] }, "r": { "k": 45 } }),
        );
        let wrapper = rewrite_pivot(el);

        assert_eq!(wrapper.kind, ElementKind::Group);
        assert_eq!(wrapper.name.as_deref(), Some("Box"));
        assert_eq!(wrapper.number("x"), Some(50.0));
        assert_eq!(wrapper.number("y"), Some(50.0));
        assert!(wrapper.attr("rotation").is_some());

        let [inner] = wrapper.children() else {
            panic!("expected one child");
        };
        assert_eq!(inner.kind, ElementKind::Rect);
        assert_eq!(inner.number("x"), Some(-10.0));
        assert_eq!(inner.number("y"), Some(-10.0));
        assert!(inner.attr("rotation").is_none());
        assert!(inner.attr("anchorX").is_none());
    }

    #[test]
    fn test_zero_anchor_is_left_alone() {
        let el = transformed(
            ElementKind::Ellipse,
            json!({ "a": { "k": [0, 0] }, "p": { "k": [5, 6] } }),
        );
        let out = rewrite_pivot(el);
        assert_eq!(out.kind, ElementKind::Ellipse);
        assert_eq!(out.number("x"), Some(5.0));
        assert!(out.attr("anchorX").is_none());
        assert!(out.attr("anchorY").is_none());
    }

    #[test]
    fn test_animated_anchor_retargets_to_position() {
        let el = transformed(
            ElementKind::Group,
            json!({
                "a": { "a": 1, "k": [{ "t": 0, "s": [0, 0] }, { "t": 30, "s": [20, 40] }] },
                "s": { "a": 1, "k": [{ "t": 0, "s": [100, 100] }, { "t": 30, "s": [50, 50] }] }
            }),
        );
        let wrapper = rewrite_pivot(el);

        assert_eq!(wrapper.timelines.len(), 2);
        assert!(wrapper.timelines.iter().all(|t| t.touches("scaleX") || t.touches("scaleY")));

        let inner = &wrapper.children()[0];
        assert_eq!(inner.timelines.len(), 2);
        assert!(inner.timelines[0].touches("x"));
        assert!(inner.timelines[1].touches("y"));
        let last_y = inner.timelines[1].keyframes[1].patch["y"].as_f64();
        assert_eq!(last_y, Some(-40.0));
    }
}
