//! Schema normalization.
//!
//! Lottie files written by older exporters encode a handful of things
//! differently (0-255 colors, bare text documents, relative path tangents
//! stored without a closed flag, ...). `RawDocument::normalize` migrates a
//! raw JSON document into the canonical encoding exactly once; the
//! `normalized` flag on the wrapper makes repeated calls no-ops.

use crate::error::{DataError, Result};
use crate::model::{LayerKind, LottieJson};
use crate::precomp;
use serde_json::{json, Value as Json};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Exporter version, compared major → minor → patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Assumed for documents without a version string: newer than every
    /// migration threshold.
    pub const LATEST: Version = Version::new(100, 100, 100);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parses `"5.7.4"`. Missing or non-numeric minor/patch parts read as 0;
    /// an unreadable major part rejects the whole string.
    pub fn parse(s: &str) -> Option<Version> {
        fn leading_number(part: &str) -> Option<u32> {
            let digits: String = part
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }

        let mut parts = s.split('.');
        let major = leading_number(parts.next()?)?;
        let minor = parts.next().and_then(leading_number).unwrap_or(0);
        let patch = parts.next().and_then(leading_number).unwrap_or(0);
        Some(Version::new(major, minor, patch))
    }

    fn of_document(json: &Json) -> Version {
        json.get("v")
            .and_then(Json::as_str)
            .and_then(Version::parse)
            .unwrap_or(Version::LATEST)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

const COLORS_BEFORE: Version = Version::new(4, 1, 9);
const TEXT_DOCUMENT_BEFORE: Version = Version::new(4, 4, 14);
const GLYPH_PATHS_FROM: Version = Version::new(4, 7, 99);
const TEXT_PATH_PROPERTIES_BEFORE: Version = Version::new(5, 7, 15);
const CLOSED_FLAG_BEFORE: Version = Version::new(4, 4, 18);

const CONVERTED_MARKER: &str = "__converted";

/// A raw animation document paired with its normalization state.
#[derive(Debug, Clone)]
pub struct RawDocument {
    json: Json,
    normalized: bool,
}

impl RawDocument {
    /// Wraps a decoded JSON document. Fails fast when the top level is not
    /// an object or carries no `layers` array.
    pub fn new(json: Json) -> Result<Self> {
        let root = json.as_object().ok_or(DataError::NotAnObject)?;
        if !root.get("layers").is_some_and(Json::is_array) {
            return Err(DataError::MissingLayers);
        }
        Ok(RawDocument {
            json,
            normalized: false,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        RawDocument::new(serde_json::from_slice(bytes)?)
    }

    pub fn version(&self) -> Version {
        Version::of_document(&self.json)
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn as_json(&self) -> &Json {
        &self.json
    }

    /// Applies every version-gated migration, then converts shape and mask
    /// path tangents to absolute coordinates. Calling this again is a no-op.
    pub fn normalize(&mut self) {
        if self.normalized {
            return;
        }
        let version = self.version();

        if version < COLORS_BEFORE {
            for_each_layer_list(&mut self.json, rescale_colors);
        }
        if version < TEXT_DOCUMENT_BEFORE {
            for_each_layer_list(&mut self.json, wrap_text_documents);
        }
        if version >= GLYPH_PATHS_FROM {
            convert_glyph_paths(&mut self.json);
        }
        if version < TEXT_PATH_PROPERTIES_BEFORE {
            for_each_layer_list(&mut self.json, promote_text_path_properties);
        }
        if version < CLOSED_FLAG_BEFORE {
            for_each_layer_list(&mut self.json, propagate_closed_flags);
        }
        for_each_layer_list(&mut self.json, complete_layers);

        self.normalized = true;
        debug!(%version, "normalized animation document");
    }

    /// Normalizes (if not done yet), decodes the typed model and expands
    /// precomposition references.
    pub fn into_animation(mut self) -> Result<LottieJson> {
        self.normalize();
        let mut animation: LottieJson = serde_json::from_value(self.json)?;
        validate_timing(&animation)?;
        precomp::resolve(&mut animation);
        Ok(animation)
    }
}

impl FromStr for RawDocument {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        RawDocument::new(serde_json::from_str(s)?)
    }
}

fn validate_timing(animation: &LottieJson) -> Result<()> {
    let frame_rate_ok = animation.fr.is_finite() && animation.fr >= 0.0;
    if !frame_rate_ok || animation.ip > animation.op {
        return Err(DataError::InvalidTiming {
            frame_rate: animation.fr,
            in_frame: animation.ip,
            out_frame: animation.op,
        });
    }
    Ok(())
}

/// Runs `f` over the top-level layer list and the layer list of every asset.
fn for_each_layer_list(json: &mut Json, mut f: impl FnMut(&mut Vec<Json>)) {
    if let Some(layers) = json.get_mut("layers").and_then(Json::as_array_mut) {
        f(layers);
    }
    if let Some(assets) = json.get_mut("assets").and_then(Json::as_array_mut) {
        for asset in assets {
            if let Some(layers) = asset.get_mut("layers").and_then(Json::as_array_mut) {
                f(layers);
            }
        }
    }
}

fn layer_kind(layer: &Json) -> LayerKind {
    layer.get("ty").map(LayerKind::from_json).unwrap_or_default()
}

fn has_mask(layer: &Json) -> bool {
    layer.get("hasMask").and_then(Json::as_bool).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeTag {
    Group,
    Path,
    Fill,
    Stroke,
    Other,
}

impl ShapeTag {
    fn of(shape: &Json) -> Self {
        match shape.get("ty").and_then(Json::as_str) {
            Some("gr") => ShapeTag::Group,
            Some("sh") => ShapeTag::Path,
            Some("fl") => ShapeTag::Fill,
            Some("st") => ShapeTag::Stroke,
            _ => ShapeTag::Other,
        }
    }
}

fn shape_list<'a>(layer: &'a mut Json, key: &str) -> Option<&'a mut Vec<Json>> {
    layer.get_mut(key).and_then(Json::as_array_mut)
}

fn rescale_colors(layers: &mut Vec<Json>) {
    for layer in layers.iter_mut() {
        if layer_kind(layer) != LayerKind::Shape {
            continue;
        }
        if let Some(shapes) = shape_list(layer, "shapes") {
            rescale_shape_colors(shapes);
        }
    }
}

fn rescale_shape_colors(shapes: &mut [Json]) {
    for shape in shapes {
        match ShapeTag::of(shape) {
            ShapeTag::Group => {
                if let Some(items) = shape_list(shape, "it") {
                    rescale_shape_colors(items);
                }
            }
            ShapeTag::Fill | ShapeTag::Stroke => {
                if let Some(k) = shape.pointer_mut("/c/k") {
                    rescale_color_value(k);
                }
            }
            _ => {}
        }
    }
}

fn is_keyframe_list(k: &Json) -> bool {
    k.as_array()
        .and_then(|items| items.first())
        .is_some_and(Json::is_object)
}

fn rescale_color_value(k: &mut Json) {
    if is_keyframe_list(k) {
        for keyframe in k.as_array_mut().into_iter().flatten() {
            for key in ["s", "e"] {
                if let Some(color) = keyframe.get_mut(key) {
                    scale_channels(color);
                }
            }
        }
    } else {
        scale_channels(k);
    }
}

fn scale_channels(color: &mut Json) {
    let Some(channels) = color.as_array_mut() else {
        return;
    };
    for channel in channels.iter_mut().take(4) {
        if let Some(n) = channel.as_f64() {
            *channel = Json::from(n / 255.0);
        }
    }
}

fn wrap_text_documents(layers: &mut Vec<Json>) {
    for layer in layers.iter_mut() {
        if layer_kind(layer) != LayerKind::Text {
            continue;
        }
        let Some(text) = layer.get_mut("t").and_then(Json::as_object_mut) else {
            continue;
        };
        if let Some(document) = text.remove("d") {
            text.insert("d".to_owned(), json!({ "k": [{ "s": document, "t": 0 }] }));
        }
    }
}

fn promote_text_path_properties(layers: &mut Vec<Json>) {
    for layer in layers.iter_mut() {
        if layer_kind(layer) != LayerKind::Text {
            continue;
        }
        let Some(path) = layer.pointer_mut("/t/p") else {
            continue;
        };
        for key in ["a", "p", "r"] {
            if let Some(value) = path.get_mut(key) {
                if value.is_number() {
                    let n = value.take();
                    *value = json!({ "a": 0, "k": n });
                }
            }
        }
    }
}

fn convert_glyph_paths(json: &mut Json) {
    let Some(chars) = json.get_mut("chars").and_then(Json::as_array_mut) else {
        return;
    };
    for glyph in chars {
        let Some(items) = glyph
            .pointer_mut("/data/shapes/0/it")
            .and_then(Json::as_array_mut)
        else {
            continue;
        };
        for item in items {
            let Some(path) = item.pointer_mut("/ks/k") else {
                continue;
            };
            if path.get(CONVERTED_MARKER).is_some() {
                continue;
            }
            to_absolute(path);
            if let Some(obj) = path.as_object_mut() {
                obj.insert(CONVERTED_MARKER.to_owned(), Json::Bool(true));
            }
        }
    }
}

/// Calls `f` on every path geometry of a path property's `k`: the static
/// path itself, or the `s`/`e` path of each keyframe.
fn for_each_path_geometry(k: &mut Json, f: &mut impl FnMut(&mut Json)) {
    if k.is_object() {
        f(k);
        return;
    }
    for keyframe in k.as_array_mut().into_iter().flatten() {
        for key in ["s", "e"] {
            let Some(value) = keyframe.get_mut(key) else {
                continue;
            };
            if value.is_array() {
                if let Some(first) = value.get_mut(0) {
                    f(first);
                }
            } else if value.is_object() {
                f(value);
            }
        }
    }
}

fn set_closed(path: &mut Json, closed: bool) {
    if let Some(obj) = path.as_object_mut() {
        obj.insert("c".to_owned(), Json::Bool(closed));
    }
}

fn propagate_closed_flags(layers: &mut Vec<Json>) {
    for layer in layers.iter_mut() {
        if has_mask(layer) {
            for mask in shape_list(layer, "masksProperties").into_iter().flatten() {
                let closed = mask.get("cl").and_then(Json::as_bool).unwrap_or(false);
                if let Some(k) = mask.pointer_mut("/pt/k") {
                    for_each_path_geometry(k, &mut |path| set_closed(path, closed));
                }
            }
        }
        if layer_kind(layer) == LayerKind::Shape {
            if let Some(shapes) = shape_list(layer, "shapes") {
                propagate_shape_closed_flags(shapes);
            }
        }
    }
}

fn propagate_shape_closed_flags(shapes: &mut [Json]) {
    for shape in shapes {
        match ShapeTag::of(shape) {
            ShapeTag::Path => {
                let closed = shape.get("closed").and_then(Json::as_bool).unwrap_or(false);
                if let Some(k) = shape.pointer_mut("/ks/k") {
                    for_each_path_geometry(k, &mut |path| set_closed(path, closed));
                }
            }
            ShapeTag::Group => {
                if let Some(items) = shape_list(shape, "it") {
                    propagate_shape_closed_flags(items);
                }
            }
            _ => {}
        }
    }
}

fn complete_layers(layers: &mut Vec<Json>) {
    for layer in layers.iter_mut() {
        if has_mask(layer) {
            for mask in shape_list(layer, "masksProperties").into_iter().flatten() {
                if let Some(k) = mask.pointer_mut("/pt/k") {
                    for_each_path_geometry(k, &mut to_absolute);
                }
            }
        }
        if layer_kind(layer) == LayerKind::Shape {
            if let Some(shapes) = shape_list(layer, "shapes") {
                complete_shapes(shapes);
            }
        }
    }
}

fn complete_shapes(shapes: &mut [Json]) {
    for shape in shapes {
        match ShapeTag::of(shape) {
            ShapeTag::Path => {
                if let Some(k) = shape.pointer_mut("/ks/k") {
                    for_each_path_geometry(k, &mut to_absolute);
                }
            }
            ShapeTag::Group => {
                if let Some(items) = shape_list(shape, "it") {
                    complete_shapes(items);
                }
            }
            _ => {}
        }
    }
}

/// Turns relative `i`/`o` tangent offsets into absolute control points.
fn to_absolute(path: &mut Json) {
    let Some(obj) = path.as_object_mut() else {
        return;
    };
    let Some(vertices) = obj.remove("v") else {
        return;
    };
    if let Some(vertices) = vertices.as_array() {
        for key in ["i", "o"] {
            let Some(tangents) = obj.get_mut(key).and_then(Json::as_array_mut) else {
                continue;
            };
            for (tangent, vertex) in tangents.iter_mut().zip(vertices) {
                offset_point(tangent, vertex);
            }
        }
    }
    obj.insert("v".to_owned(), vertices);
}

fn offset_point(point: &mut Json, by: &Json) {
    let Some(coords) = point.as_array_mut() else {
        return;
    };
    for (axis, coord) in coords.iter_mut().take(2).enumerate() {
        let delta = by.get(axis).and_then(Json::as_f64);
        if let (Some(c), Some(d)) = (coord.as_f64(), delta) {
            *coord = Json::from(c + d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape_layer(version: Option<&str>, shapes: Json) -> Json {
        let mut doc = json!({
            "fr": 30, "ip": 0, "op": 30, "w": 100, "h": 100,
            "layers": [{ "ty": 4, "ind": 1, "ks": {}, "shapes": shapes }]
        });
        if let Some(v) = version {
            doc["v"] = Json::from(v);
        }
        doc
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(4, 1, 8) < Version::new(4, 1, 9));
        assert!(Version::new(4, 0, 99) < Version::new(4, 1, 0));
        assert!(Version::new(3, 99, 99) < Version::new(4, 0, 0));
        assert_eq!(Version::parse("5.7.4"), Some(Version::new(5, 7, 4)));
        assert_eq!(Version::parse("5"), Some(Version::new(5, 0, 0)));
        assert_eq!(Version::parse("beta"), None);
    }

    #[test]
    fn test_rejects_malformed_top_level() {
        assert!(matches!(
            RawDocument::new(json!([1, 2, 3])),
            Err(DataError::NotAnObject)
        ));
        assert!(matches!(
            RawDocument::new(json!({ "fr": 30 })),
            Err(DataError::MissingLayers)
        ));
        assert!(matches!(
            RawDocument::new(json!({ "layers": {} })),
            Err(DataError::MissingLayers)
        ));
    }

    #[test]
    fn test_old_colors_rescaled_once() {
        let mut doc = RawDocument::new(shape_layer(
            Some("4.0.0"),
            json!([{ "ty": "fl", "c": { "k": [255, 0, 51, 255] } }]),
        ))
        .unwrap();
        doc.normalize();
        doc.normalize();
        assert!(doc.is_normalized());
        let color = doc.as_json().pointer("/layers/0/shapes/0/c/k").unwrap();
        assert_eq!(color, &json!([1.0, 0.0, 0.2, 1.0]));
    }

    #[test]
    fn test_keyframed_colors_rescaled_in_groups() {
        let mut doc = RawDocument::new(shape_layer(
            Some("4.1.0"),
            json!([{ "ty": "gr", "it": [{
                "ty": "st",
                "c": { "k": [
                    { "t": 0, "s": [255, 255, 255, 255], "e": [0, 0, 0, 255], "i": { "x": [1], "y": [1] } },
                    { "t": 10 }
                ] }
            }] }]),
        ))
        .unwrap();
        doc.normalize();
        let kf = doc.as_json().pointer("/layers/0/shapes/0/it/0/c/k/0").unwrap();
        assert_eq!(kf["s"], json!([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(kf["e"], json!([0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_missing_version_skips_gated_migrations() {
        let mut doc = RawDocument::new(shape_layer(
            None,
            json!([{ "ty": "fl", "c": { "k": [1, 0, 0, 1] } }]),
        ))
        .unwrap();
        assert_eq!(doc.version(), Version::LATEST);
        doc.normalize();
        let color = doc.as_json().pointer("/layers/0/shapes/0/c/k").unwrap();
        assert_eq!(color, &json!([1, 0, 0, 1]));
    }

    #[test]
    fn test_shape_tangents_become_absolute() {
        let mut doc = RawDocument::new(shape_layer(
            Some("5.5.0"),
            json!([{ "ty": "sh", "ks": { "k": {
                "c": false,
                "v": [[10, 10], [50, 10]],
                "i": [[0, 0], [-5, 2]],
                "o": [[5, 2], [0, 0]]
            } } }]),
        ))
        .unwrap();
        doc.normalize();
        doc.normalize();
        let path = doc.as_json().pointer("/layers/0/shapes/0/ks/k").unwrap();
        assert_eq!(path["i"], json!([[10.0, 10.0], [45.0, 12.0]]));
        assert_eq!(path["o"], json!([[15.0, 12.0], [50.0, 10.0]]));
    }

    #[test]
    fn test_closed_flag_propagated_for_old_files() {
        let mut doc = RawDocument::new(shape_layer(
            Some("4.4.0"),
            json!([{ "ty": "sh", "closed": true, "ks": { "k": [
                { "t": 0, "s": [{ "v": [[0, 0]], "i": [[0, 0]], "o": [[0, 0]] }] },
                { "t": 5 }
            ] } }]),
        ))
        .unwrap();
        doc.normalize();
        let first = doc.as_json().pointer("/layers/0/shapes/0/ks/k/0/s/0").unwrap();
        assert_eq!(first["c"], json!(true));
    }

    #[test]
    fn test_mask_paths_closed_and_absolute() {
        let mut doc = RawDocument::new(json!({
            "v": "4.4.0", "fr": 30, "ip": 0, "op": 30,
            "layers": [{
                "ty": 3, "ind": 1, "hasMask": true,
                "masksProperties": [
                    { "cl": true, "pt": { "k": {
                        "v": [[0, 0], [10, 0]],
                        "i": [[0, 0], [-2, 0]],
                        "o": [[3, 1], [0, 0]]
                    } } },
                    { "cl": false, "pt": { "a": 1, "k": [
                        { "t": 0, "s": [{ "v": [[5, 5]], "i": [[1, 1]], "o": [[-1, -1]] }] },
                        { "t": 10 }
                    ] } }
                ]
            }]
        }))
        .unwrap();
        doc.normalize();

        let fixed = doc.as_json().pointer("/layers/0/masksProperties/0/pt/k").unwrap();
        assert_eq!(fixed["c"], json!(true));
        assert_eq!(fixed["o"][0], json!([3.0, 1.0]));
        assert_eq!(fixed["i"][1], json!([8.0, 0.0]));

        let keyed = doc
            .as_json()
            .pointer("/layers/0/masksProperties/1/pt/k/0/s/0")
            .unwrap();
        assert_eq!(keyed["c"], json!(false));
        assert_eq!(keyed["i"][0], json!([6.0, 6.0]));
        assert_eq!(keyed["o"][0], json!([4.0, 4.0]));
    }

    #[test]
    fn test_text_migrations() {
        let mut doc = RawDocument::new(json!({
            "v": "4.4.0", "fr": 30, "ip": 0, "op": 30,
            "layers": [{
                "ty": 5,
                "t": { "d": { "t": "Hello" }, "p": { "a": 1, "p": 0, "r": 0 } }
            }]
        }))
        .unwrap();
        doc.normalize();
        let text = doc.as_json().pointer("/layers/0/t").unwrap();
        assert_eq!(text["d"], json!({ "k": [{ "s": { "t": "Hello" }, "t": 0 }] }));
        assert_eq!(text["p"]["a"], json!({ "a": 0, "k": 1 }));
    }

    #[test]
    fn test_glyph_paths_converted_once() {
        let mut doc = RawDocument::new(json!({
            "v": "5.0.0", "fr": 30, "ip": 0, "op": 30, "layers": [],
            "chars": [{ "data": { "shapes": [{ "ty": "gr", "it": [{
                "ty": "sh",
                "ks": { "k": { "v": [[1, 1]], "i": [[1, 0]], "o": [[0, 1]] } }
            }] }] } }]
        }))
        .unwrap();
        doc.normalize();
        let path = doc
            .as_json()
            .pointer("/chars/0/data/shapes/0/it/0/ks/k")
            .unwrap();
        assert_eq!(path["i"], json!([[2.0, 1.0]]));
        assert_eq!(path["__converted"], json!(true));
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let doc = RawDocument::new(json!({ "fr": 30, "ip": 40, "op": 10, "layers": [] })).unwrap();
        assert!(matches!(
            doc.into_animation(),
            Err(DataError::InvalidTiming { .. })
        ));
    }
}
