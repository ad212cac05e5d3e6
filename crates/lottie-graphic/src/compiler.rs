//! Layer and shape-list compilation into the element tree.

use crate::element::{
    merge_patch, target_mut, AttrMap, AttrValue, CompiledScene, Element, ElementKind,
};
use crate::error::Result;
use crate::options::CompileOptions;
use crate::pivot::rewrite_pivot;
use crate::timeline::{build_timeline, TimeContext};
use crate::transform::{apply_transform, percent_to_ratio};
use crate::value::{push_timeline, resolve_color, resolve_property};
use lottie_data::model::{
    BezierPath, EllipseShape, FillShape, Layer, LayerKind, LottieJson, PathShape,
    PositionProperty, RectShape, RepeaterShape, Shape, StrokeShape, Transform, TrimShape, Value,
};
use lottie_data::RawDocument;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Compiles animation documents with a fixed set of options. A compiler
/// holds no per-compile state and can be shared.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Compiler { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile_str(&self, json: &str) -> Result<CompiledScene> {
        let document: RawDocument = json.parse()?;
        self.compile_document(document)
    }

    pub fn compile_value(&self, json: serde_json::Value) -> Result<CompiledScene> {
        self.compile_document(RawDocument::new(json)?)
    }

    pub fn compile_document(&self, document: RawDocument) -> Result<CompiledScene> {
        let animation = document.into_animation()?;
        Ok(self.compile(&animation))
    }

    /// Compiles an already normalized and precomp-resolved document.
    #[tracing::instrument(skip_all, fields(layers = animation.layers.len(), op = animation.op))]
    pub fn compile(&self, animation: &LottieJson) -> CompiledScene {
        let frame_rate = if animation.fr > 0.0 {
            animation.fr
        } else {
            self.options.fallback_frame_rate
        };
        let clock =
            TimeContext::new(frame_rate, animation.op).with_loop(self.options.loop_timelines);

        let elements = compile_layers(&animation.layers, &clock);
        debug!(elements = elements.len(), "compiled animation");

        CompiledScene {
            width: animation.w,
            height: animation.h,
            elements,
        }
    }
}

/// Normalizes and compiles a raw JSON document with default options.
pub fn compile(json: serde_json::Value) -> Result<CompiledScene> {
    Compiler::default().compile_value(json)
}

struct CompiledLayer {
    index: Option<u32>,
    parent: Option<u32>,
    element: Element,
}

/// Compiles one composition's layers, front-most first, and nests
/// parented layers under their parents.
fn compile_layers(layers: &[Layer], clock: &TimeContext) -> Vec<Element> {
    let compiled: Vec<CompiledLayer> = layers
        .iter()
        .rev()
        .filter_map(|layer| {
            compile_layer(layer, clock).map(|element| CompiledLayer {
                index: layer.ind,
                parent: layer.parent,
                element,
            })
        })
        .collect();
    assemble(compiled)
}

fn assemble(compiled: Vec<CompiledLayer>) -> Vec<Element> {
    let mut by_index: HashMap<u32, usize> = HashMap::new();
    for (pos, layer) in compiled.iter().enumerate() {
        if let Some(index) = layer.index {
            by_index.entry(index).or_insert(pos);
        }
    }

    let parent_of: Vec<Option<usize>> = compiled
        .iter()
        .map(|layer| {
            let parent = layer.parent?;
            let found = by_index.get(&parent).copied();
            if found.is_none() {
                warn!(parent_index = parent, "parent layer not found, keeping layer at top level");
            }
            found
        })
        .collect();

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); compiled.len()];
    let mut roots = Vec::new();
    for pos in 0..compiled.len() {
        match parent_of[pos].filter(|&parent| !closes_cycle(&parent_of, pos, parent)) {
            Some(parent) => children_of[parent].push(pos),
            None => roots.push(pos),
        }
    }

    let mut slots: Vec<Option<Element>> = compiled.into_iter().map(|l| Some(l.element)).collect();
    roots
        .into_iter()
        .filter_map(|pos| build_tree(pos, &mut slots, &children_of))
        .collect()
}

/// True if following parents up from `parent` leads back to `pos`.
fn closes_cycle(parent_of: &[Option<usize>], pos: usize, parent: usize) -> bool {
    let mut cursor = Some(parent);
    for _ in 0..parent_of.len() {
        match cursor {
            Some(at) if at == pos => {
                warn!(layer = pos, "cyclic parent chain, keeping layer at top level");
                return true;
            }
            Some(at) => cursor = parent_of[at],
            None => return false,
        }
    }
    false
}

// Children are attached before the pivot rewrite so they inherit the full
// parent transform, anchor offset included.
fn build_tree(
    pos: usize,
    slots: &mut [Option<Element>],
    children_of: &[Vec<usize>],
) -> Option<Element> {
    let mut element = slots[pos].take()?;
    for &child in &children_of[pos] {
        if let Some(child) = build_tree(child, slots, children_of) {
            element.push_child(child);
        }
    }
    Some(rewrite_pivot(element))
}

fn compile_layer(layer: &Layer, clock: &TimeContext) -> Option<Element> {
    let name = layer.nm.as_deref();
    if matches!(
        layer.ty,
        LayerKind::Image | LayerKind::Text | LayerKind::Unknown
    ) {
        debug!(kind = ?layer.ty, name = ?name, "skipping unsupported layer");
        return None;
    }

    // Layer properties are keyed in composition time.
    let mut element = Element::group().with_name(name);
    apply_transform(&layer.ks, &mut element, clock);
    if layer.is_hidden() {
        return Some(element);
    }

    match layer.ty {
        LayerKind::Shape => {
            let shapes = layer.shapes.as_deref().unwrap_or_default();
            for child in compile_shapes(shapes, Modifiers::default(), clock) {
                element.push_child(child);
            }
        }
        LayerKind::Solid => element.push_child(solid_rect(layer)),
        LayerKind::Precomp => {
            // Precomposition content plays from the layer's start time.
            let local = clock.offset_by(layer.st);
            let layers = layer.layers.as_deref().unwrap_or_default();
            for child in compile_layers(layers, &local) {
                element.push_child(child);
            }
        }
        LayerKind::Null | LayerKind::Image | LayerKind::Text | LayerKind::Unknown => {}
    }
    Some(element)
}

fn solid_rect(layer: &Layer) -> Element {
    let width = layer.sw.unwrap_or(0.0);
    let height = layer.sh.unwrap_or(0.0);
    let mut rect = Element::shape(ElementKind::Rect);

    let shape = target_mut(&mut rect.attrs, "shape");
    shape.insert("cx".into(), (width / 2.0).into());
    shape.insert("cy".into(), (height / 2.0).into());
    shape.insert("width".into(), width.into());
    shape.insert("height".into(), height.into());

    if let Some(color) = &layer.color {
        target_mut(&mut rect.attrs, "style").insert("fill".into(), color.as_str().into());
    }
    rect
}

/// Modifiers in effect for one shape list. Fill, stroke and trim carry into
/// nested groups unless the group declares its own; transform and repeater
/// only affect their own list.
#[derive(Debug, Clone, Copy, Default)]
struct Modifiers<'a> {
    fill: Option<&'a FillShape>,
    stroke: Option<&'a StrokeShape>,
    trim: Option<&'a TrimShape>,
    transform: Option<&'a Transform>,
    repeater: Option<&'a RepeaterShape>,
}

impl<'a> Modifiers<'a> {
    // Within one list the first declared modifier of a kind wins.
    fn collect(shapes: &'a [Shape], inherited: Modifiers<'a>) -> Self {
        let mut own = Modifiers::default();
        for shape in shapes {
            match shape {
                Shape::Fill(fill) => {
                    own.fill.get_or_insert(fill);
                }
                Shape::Stroke(stroke) => {
                    own.stroke.get_or_insert(stroke);
                }
                Shape::Trim(trim) => {
                    own.trim.get_or_insert(trim);
                }
                Shape::Transform(tr) => {
                    own.transform.get_or_insert(&tr.t);
                }
                Shape::Repeater(repeater) => {
                    own.repeater.get_or_insert(repeater);
                }
                _ => {}
            }
        }
        Modifiers {
            fill: own.fill.or(inherited.fill),
            stroke: own.stroke.or(inherited.stroke),
            trim: own.trim.or(inherited.trim),
            transform: own.transform,
            repeater: own.repeater,
        }
    }
}

/// Compiles a shape list in reverse declaration order so the first
/// declared shape ends up drawn last, on top.
fn compile_shapes<'a>(
    shapes: &'a [Shape],
    inherited: Modifiers<'a>,
    clock: &TimeContext,
) -> Vec<Element> {
    let modifiers = Modifiers::collect(shapes, inherited);
    let mut elements = Vec::new();

    for shape in shapes.iter().rev() {
        let element = match shape {
            Shape::Group(group) => {
                let mut element = Element::group().with_name(group.nm.as_deref());
                for child in compile_shapes(&group.it, modifiers, clock) {
                    element.push_child(child);
                }
                element
            }
            Shape::Path(path) => path_element(path, &modifiers, clock),
            Shape::Ellipse(ellipse) => ellipse_element(ellipse, &modifiers, clock),
            Shape::Rect(rect) => rect_element(rect, &modifiers, clock),
            Shape::Fill(_)
            | Shape::Stroke(_)
            | Shape::Transform(_)
            | Shape::Trim(_)
            | Shape::Repeater(_) => continue,
            Shape::Unknown => {
                debug!("skipping unsupported shape");
                continue;
            }
        };

        let element = match modifiers.transform {
            Some(transform) => {
                let mut element = element;
                apply_transform(transform, &mut element, clock);
                rewrite_pivot(element)
            }
            None => element,
        };
        elements.push(element);
    }
    elements
}

fn half(v: f64) -> f64 {
    v / 2.0
}

fn ellipse_element(
    ellipse: &EllipseShape,
    modifiers: &Modifiers<'_>,
    clock: &TimeContext,
) -> Element {
    let mut element = Element::shape(ElementKind::Ellipse).with_name(ellipse.nm.as_deref());
    resolve_property(&ellipse.p, "shape", &["cx", "cy"], None, &mut element, clock);
    resolve_property(&ellipse.s, "shape", &["rx", "ry"], Some(half), &mut element, clock);
    apply_style(&mut element, modifiers, clock);
    element
}

fn rect_element(rect: &RectShape, modifiers: &Modifiers<'_>, clock: &TimeContext) -> Element {
    let mut element = Element::shape(ElementKind::Rect).with_name(rect.nm.as_deref());
    resolve_property(&rect.p, "shape", &["cx", "cy"], None, &mut element, clock);
    resolve_property(&rect.s, "shape", &["width", "height"], None, &mut element, clock);
    resolve_property(&rect.r, "shape", &["r"], None, &mut element, clock);
    apply_style(&mut element, modifiers, clock);
    element
}

fn path_element(path: &PathShape, modifiers: &Modifiers<'_>, clock: &TimeContext) -> Element {
    let mut element = Element::shape(ElementKind::Path).with_name(path.nm.as_deref());
    match &path.ks.k {
        Value::Default => {}
        Value::Static(geometry) => merge_patch(&mut element.attrs, &geometry_patch(geometry)),
        Value::Animated(keyframes) => {
            let timeline =
                build_timeline(keyframes, 0, clock, |geometry| Some(geometry_patch(geometry)));
            if let Some(timeline) = timeline {
                push_timeline(&mut element, timeline);
            }
        }
    }

    if let Some(trim) = modifiers.trim {
        let ratio = Some(percent_to_ratio as fn(f64) -> f64);
        resolve_property(&trim.s, "shape", &["trimStart"], ratio, &mut element, clock);
        resolve_property(&trim.e, "shape", &["trimEnd"], ratio, &mut element, clock);
    }
    if let Some(repeater) = modifiers.repeater {
        apply_repeater(repeater, &mut element, clock);
    }
    apply_style(&mut element, modifiers, clock);
    element
}

fn geometry_patch(geometry: &BezierPath) -> AttrMap {
    let mut shape = AttrMap::new();
    shape.insert("in".into(), AttrValue::Points(geometry.i.clone()));
    shape.insert("out".into(), AttrValue::Points(geometry.o.clone()));
    shape.insert("v".into(), AttrValue::Points(geometry.v.clone()));
    shape.insert("close".into(), AttrValue::Bool(geometry.c));

    let mut patch = AttrMap::new();
    patch.insert("shape".into(), AttrValue::Map(shape));
    patch
}

fn apply_repeater(repeater: &RepeaterShape, element: &mut Element, clock: &TimeContext) {
    let transform = &repeater.tr.t;
    resolve_property(&repeater.c, "shape", &["repeatCount"], None, element, clock);
    match &transform.p {
        PositionProperty::Unified(p) => {
            resolve_property(p, "shape", &["repeatX", "repeatY"], None, element, clock);
        }
        PositionProperty::Split { x, y, .. } => {
            resolve_property(x, "shape", &["repeatX"], None, element, clock);
            resolve_property(y, "shape", &["repeatY"], None, element, clock);
        }
    }
    resolve_property(
        &transform.rz,
        "shape",
        &["repeatRotation"],
        Some(f64::to_radians),
        element,
        clock,
    );
    resolve_property(
        &transform.s,
        "shape",
        &["repeatScaleX", "repeatScaleY"],
        Some(percent_to_ratio),
        element,
        clock,
    );
    resolve_property(
        &transform.a,
        "shape",
        &["repeatAnchorX", "repeatAnchorY"],
        None,
        element,
        clock,
    );
}

fn line_cap(code: u8) -> Option<&'static str> {
    match code {
        1 => Some("butt"),
        2 => Some("round"),
        3 => Some("square"),
        _ => None,
    }
}

fn line_join(code: u8) -> Option<&'static str> {
    match code {
        1 => Some("miter"),
        2 => Some("round"),
        3 => Some("bevel"),
        _ => None,
    }
}

fn apply_style(element: &mut Element, modifiers: &Modifiers<'_>, clock: &TimeContext) {
    if let Some(fill) = modifiers.fill {
        resolve_color(&fill.c, "style", "fill", element, clock);
        resolve_property(
            &fill.o,
            "style",
            &["fillOpacity"],
            Some(percent_to_ratio),
            element,
            clock,
        );
    }

    if let Some(stroke) = modifiers.stroke {
        resolve_color(&stroke.c, "style", "stroke", element, clock);
        resolve_property(&stroke.w, "style", &["lineWidth"], None, element, clock);
        resolve_property(
            &stroke.o,
            "style",
            &["strokeOpacity"],
            Some(percent_to_ratio),
            element,
            clock,
        );

        let style = target_mut(&mut element.attrs, "style");
        if let Some(cap) = line_cap(stroke.lc) {
            style.insert("lineCap".into(), cap.into());
        }
        if let Some(join) = line_join(stroke.lj) {
            style.insert("lineJoin".into(), join.into());
        }
        if let Some(limit) = stroke.ml {
            style.insert("miterLimit".into(), limit.into());
        }
    }
}
