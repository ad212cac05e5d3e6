use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    #[serde(default, deserialize_with = "or_default")]
    pub v: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub nm: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub ip: f64,
    #[serde(default, deserialize_with = "or_default")]
    pub op: f64,
    #[serde(default, deserialize_with = "or_default")]
    pub fr: f64, // 0 means "not given", the compiler falls back to its configured rate
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub w: u32,
    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub h: u32,
    #[serde(deserialize_with = "lenient_list")]
    pub layers: Vec<Layer>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Layer {
    #[serde(default)]
    pub ty: LayerKind,
    #[serde(default, deserialize_with = "deserialize_index")]
    pub ind: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_index")]
    pub parent: Option<u32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f64,
    #[serde(default)]
    pub op: f64,
    #[serde(default)]
    pub st: f64, // Start time offset in frames
    #[serde(default)]
    pub hd: Option<bool>, // Hidden - content is dropped, transform still parents children
    #[serde(default)]
    pub ks: Transform,

    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>, // PreComp
    /// Layers of the referenced precomposition, filled in by normalization.
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub layers: Option<Vec<Layer>>,
    #[serde(default, rename = "sc")]
    pub color: Option<String>, // Solid color, "#rrggbb"
    #[serde(default)]
    pub sw: Option<f64>, // Solid width
    #[serde(default)]
    pub sh: Option<f64>, // Solid height
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub shapes: Option<Vec<Shape>>, // Shape Layer
}

impl Layer {
    pub fn is_hidden(&self) -> bool {
        self.hd.unwrap_or(false)
    }
}

/// Layer type. Files encode it as an integer code; hand-written documents
/// sometimes use the short name instead, both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerKind {
    Precomp,
    Solid,
    Image,
    Null,
    Shape,
    Text,
    #[default]
    Unknown,
}

impl LayerKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => LayerKind::Precomp,
            1 => LayerKind::Solid,
            2 => LayerKind::Image,
            3 => LayerKind::Null,
            4 => LayerKind::Shape,
            5 => LayerKind::Text,
            _ => LayerKind::Unknown,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "precomp" | "precomposition" => LayerKind::Precomp,
            "solid" => LayerKind::Solid,
            "image" => LayerKind::Image,
            "null" => LayerKind::Null,
            "shape" => LayerKind::Shape,
            "text" => LayerKind::Text,
            _ => LayerKind::Unknown,
        }
    }

    /// Reads the `ty` field of a raw layer object.
    pub fn from_json(ty: &serde_json::Value) -> Self {
        if let Some(code) = ty.as_i64() {
            LayerKind::from_code(code)
        } else if let Some(name) = ty.as_str() {
            LayerKind::from_name(name)
        } else {
            LayerKind::Unknown
        }
    }

    pub fn code(self) -> Option<u8> {
        match self {
            LayerKind::Precomp => Some(0),
            LayerKind::Solid => Some(1),
            LayerKind::Image => Some(2),
            LayerKind::Null => Some(3),
            LayerKind::Shape => Some(4),
            LayerKind::Text => Some(5),
            LayerKind::Unknown => None,
        }
    }
}

impl Serialize for LayerKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.code() {
            Some(code) => serializer.serialize_u8(code),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for LayerKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        Ok(LayerKind::from_json(&v))
    }
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(rename = "rp")]
    Repeater(RepeaterShape),
    #[serde(other)]
    #[default]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub it: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub s: Property<Vector>,
    #[serde(default)]
    pub p: Property<Vector>,
    #[serde(default)]
    pub r: Property<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub s: Property<Vector>,
    #[serde(default)]
    pub p: Property<Vector>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub c: Property<Vector>,
    #[serde(default)]
    pub o: Property<f64>,
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub c: Property<Vector>,
    #[serde(default)]
    pub w: Property<f64>,
    #[serde(default)]
    pub o: Property<f64>,
    #[serde(default)]
    pub lc: u8, // 1=butt, 2=round, 3=square
    #[serde(default)]
    pub lj: u8, // 1=miter, 2=round, 3=bevel
    #[serde(default)]
    pub ml: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ks: Property<BezierPath>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub s: Property<f64>,
    #[serde(default)]
    pub e: Property<f64>,
    #[serde(default)]
    pub o: Property<f64>,
    #[serde(default)]
    pub m: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepeaterShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub c: Property<f64>,
    #[serde(default)]
    pub o: Property<f64>,
    #[serde(default)]
    pub m: u8,
    #[serde(default)]
    pub tr: RepeaterTransform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepeaterTransform {
    #[serde(flatten)]
    pub t: Transform,
    #[serde(default)]
    pub so: Property<f64>,
    #[serde(default)]
    pub eo: Property<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TransformShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(flatten)]
    pub t: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vector>, // Anchor
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vector>, // Scale in percent
    #[serde(default, alias = "r")]
    pub rz: Property<f64>, // Rotation in degrees
    #[serde(default)]
    pub o: Property<f64>, // Opacity
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    // Split must be tried first: every field of a unified property is optional.
    Split {
        #[serde(default)]
        s: bool,
        x: Property<f64>,
        y: Property<f64>,
    },
    Unified(Property<Vector>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
    #[serde(default)]
    pub x: Option<String>, // Expression source, never evaluated
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
            x: None,
        }
    }
}

impl<T> Property<T> {
    pub fn constant(value: T) -> Self {
        Property {
            k: Value::Static(value),
            ..Default::default()
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(&self.k, Value::Animated(kfs) if !kfs.is_empty())
    }
}

/// Shape of an animatable value. Anything that matches none of the known
/// encodings decodes to `Default` and is ignored downstream.
#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        // A bare number or an array of numbers is never a keyframe list.
        let keyframed = matches!(
            &v,
            serde_json::Value::Array(arr) if arr.first().is_some_and(|f| f.is_object())
        );
        if keyframed {
            if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
                return Ok(Value::Animated(keyframes));
            }
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        // Per-axis properties given as a single number.
        if v.is_number() {
            let wrapped = serde_json::Value::Array(vec![v.clone()]);
            if let Ok(val) = serde_json::from_value::<T>(wrapped) {
                return Ok(Value::Static(val));
            }
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f64,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    pub fn at(t: f64, s: Option<T>) -> Self {
        Keyframe {
            t,
            s,
            e: None,
            i: None,
            o: None,
            h: None,
        }
    }
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

pub type Vec2 = [f64; 2];

/// Per-axis value (position, scale, anchor, color, size).
pub type Vector = Vec<f64>;

/// Bezier tangent control points for keyframe easing.
/// Accepts `{"x": [0.48], "y": [1]}` as well as `{"x": 0.48, "y": 1}`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BezierTangent {
    #[serde(default, deserialize_with = "deserialize_number_or_seq")]
    pub x: Vec<f64>,
    #[serde(default, deserialize_with = "deserialize_number_or_seq")]
    pub y: Vec<f64>,
}

impl BezierTangent {
    /// Control value for an axis; scalar tangents apply to every axis.
    pub fn x_at(&self, axis: usize) -> Option<f64> {
        self.x.get(axis).or_else(|| self.x.last()).copied()
    }

    pub fn y_at(&self, axis: usize) -> Option<f64> {
        self.y.get(axis).or_else(|| self.y.last()).copied()
    }
}

fn deserialize_number_or_seq<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrSeq {
        Number(f64),
        Seq(Vec<f64>),
    }

    Ok(match Option::<NumberOrSeq>::deserialize(deserializer)? {
        Some(NumberOrSeq::Number(n)) => vec![n],
        Some(NumberOrSeq::Seq(seq)) => seq,
        None => Vec::new(),
    })
}

/// Vertex/tangent path model. After normalization `i` and `o` hold
/// absolute control points rather than offsets from `v`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub layers: Option<Vec<Layer>>,
    #[serde(default, deserialize_with = "or_default")]
    pub w: Option<u32>,
    #[serde(default, deserialize_with = "or_default")]
    pub h: Option<u32>,
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
}

// Lenient decoding. A value of the wrong type falls back to a default
// instead of failing the whole document.

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}

/// Canvas sizes: any non-negative number, rounded.
fn deserialize_dimension<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => n.round().min(u32::MAX as f64) as u32,
        _ => 0,
    })
}

/// Layer indices: integral numbers, including `3.0`.
fn deserialize_index<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(v.as_f64()
        .filter(|n| n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(n))
        .map(|n| n as u32))
}

fn decode_element<T: DeserializeOwned + Default>(item: serde_json::Value) -> T {
    serde_json::from_value(item).unwrap_or_else(|err| {
        warn!(%err, "undecodable element replaced with an unknown placeholder");
        T::default()
    })
}

/// Decodes a list element by element; elements that fail become
/// `T::default()` so their siblings survive.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient_optional_list(deserializer)?.unwrap_or_default())
}

fn lenient_optional_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => {
            Ok(Some(items.into_iter().map(decode_element).collect()))
        }
        serde_json::Value::Null => Ok(None),
        other => {
            warn!(found = %other, "expected a list, ignoring value");
            Ok(None)
        }
    }
}
