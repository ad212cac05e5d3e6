use crate::error::Result;
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static attributes of an output element. Nested maps (`shape`, `style`)
/// hold the parameters a draw routine or style pass reads.
pub type AttrMap = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Points(Vec<[f64; 2]>),
    Map(AttrMap),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&[[f64; 2]]> {
        match self {
            AttrValue::Points(points) => Some(points),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_owned())
    }
}

impl From<Vec<[f64; 2]>> for AttrValue {
    fn from(points: Vec<[f64; 2]>) -> Self {
        AttrValue::Points(points)
    }
}

impl From<AttrMap> for AttrValue {
    fn from(map: AttrMap) -> Self {
        AttrValue::Map(map)
    }
}

/// Returns the map attributes for `target` are written into: the root for an
/// empty target, otherwise the nested map under that key (created, or
/// replaced if it held a non-map value).
pub fn target_mut<'a>(attrs: &'a mut AttrMap, target: &str) -> &'a mut AttrMap {
    if target.is_empty() {
        return attrs;
    }
    let entry = attrs
        .entry(target.to_owned())
        .or_insert_with(|| AttrValue::Map(AttrMap::new()));
    if !matches!(entry, AttrValue::Map(_)) {
        *entry = AttrValue::Map(AttrMap::new());
    }
    match entry {
        AttrValue::Map(map) => map,
        _ => unreachable!("entry was replaced with a map above"),
    }
}

/// Single-attribute patch: `{name: value}` or `{target: {name: value}}`.
pub fn patch(target: &str, name: &str, value: impl Into<AttrValue>) -> AttrMap {
    let mut map = AttrMap::new();
    target_mut(&mut map, target).insert(name.to_owned(), value.into());
    map
}

/// Shallow merge; nested maps merge one level deep.
pub fn merge_patch(base: &mut AttrMap, patch: &AttrMap) {
    for (key, value) in patch {
        match (base.get_mut(key), value) {
            (Some(AttrValue::Map(existing)), AttrValue::Map(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "lottie-shape-path")]
    Path,
    #[serde(rename = "lottie-shape-ellipse")]
    Ellipse,
    #[serde(rename = "lottie-shape-rect")]
    Rect,
}

impl ElementKind {
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Group => "group",
            ElementKind::Path => "lottie-shape-path",
            ElementKind::Ellipse => "lottie-shape-ellipse",
            ElementKind::Rect => "lottie-shape-rect",
        }
    }
}

/// One node of the compiled tree. Groups always carry a child list, shapes
/// never do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub attrs: AttrMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Element>>,
    #[serde(rename = "keyframeAnimation", skip_serializing_if = "Vec::is_empty")]
    pub timelines: Vec<Timeline>,
}

impl Element {
    pub fn group() -> Self {
        Element {
            kind: ElementKind::Group,
            name: None,
            attrs: AttrMap::new(),
            children: Some(Vec::new()),
            timelines: Vec::new(),
        }
    }

    pub fn shape(kind: ElementKind) -> Self {
        let children = (kind == ElementKind::Group).then(Vec::new);
        Element {
            kind,
            name: None,
            attrs: AttrMap::new(),
            children,
            timelines: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_owned);
        self
    }

    pub fn children(&self) -> &[Element] {
        self.children.as_deref().unwrap_or_default()
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.attrs.get(key).and_then(AttrValue::as_f64)
    }

    /// Looks up `section.key`, e.g. `("style", "fill")`.
    pub fn nested(&self, section: &str, key: &str) -> Option<&AttrValue> {
        self.attrs.get(section)?.as_map()?.get(key)
    }
}

/// Output of a compile pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledScene {
    pub width: u32,
    pub height: u32,
    pub elements: Vec<Element>,
}

impl CompiledScene {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_is_one_level_deep() {
        let mut base = AttrMap::new();
        base.insert("x".into(), 1.0.into());
        target_mut(&mut base, "style").insert("fill".into(), "red".into());
        target_mut(&mut base, "style").insert("lineWidth".into(), 2.0.into());

        let mut incoming = patch("style", "fill", "blue");
        incoming.insert("x".into(), 5.0.into());
        merge_patch(&mut base, &incoming);

        assert_eq!(base["x"], AttrValue::Number(5.0));
        let style = base["style"].as_map().unwrap();
        assert_eq!(style["fill"].as_str(), Some("blue"));
        assert_eq!(style["lineWidth"].as_f64(), Some(2.0));
    }

    #[test]
    fn test_element_serializes_flat() {
        let mut group = Element::group().with_name(Some("Layer"));
        group.attrs.insert("x".into(), 10.0.into());
        let mut ellipse = Element::shape(ElementKind::Ellipse);
        target_mut(&mut ellipse.attrs, "shape").insert("rx".into(), 5.0.into());
        group.push_child(ellipse);

        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "group",
                "name": "Layer",
                "x": 10.0,
                "children": [{ "type": "lottie-shape-ellipse", "shape": { "rx": 5.0 } }]
            })
        );
    }
}
