use crate::model::{Layer, LayerKind, LottieJson};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Expands every precomposition layer's `refId` into its own `layers` list.
/// Each instance is an independent copy; nested references are expanded
/// before copying, self-references are dropped.
pub(crate) fn resolve(animation: &mut LottieJson) {
    let raw = animation
        .assets
        .iter_mut()
        .filter_map(|asset| Some((asset.id.clone(), asset.layers.take()?)))
        .collect();
    let mut resolver = Resolver {
        raw,
        expanded: HashMap::new(),
        stack: Vec::new(),
    };

    resolver.expand(&mut animation.layers);

    for asset in &mut animation.assets {
        let known =
            resolver.raw.contains_key(&asset.id) || resolver.expanded.contains_key(&asset.id);
        if known && resolver.ensure_expanded(&asset.id) {
            asset.layers = resolver.expanded.remove(&asset.id);
        }
    }
}

struct Resolver {
    raw: HashMap<String, Vec<Layer>>,
    expanded: HashMap<String, Vec<Layer>>,
    stack: Vec<String>,
}

impl Resolver {
    fn expand(&mut self, layers: &mut [Layer]) {
        for layer in layers {
            if layer.ty != LayerKind::Precomp {
                continue;
            }
            match layer.ref_id.clone() {
                Some(id) => {
                    if self.ensure_expanded(&id) {
                        layer.layers = self.expanded.get(&id).cloned();
                        debug!(asset = %id, "expanded precomposition instance");
                    }
                }
                None => {
                    if let Some(children) = layer.layers.as_mut() {
                        self.expand(children);
                    }
                }
            }
        }
    }

    fn ensure_expanded(&mut self, id: &str) -> bool {
        if self.stack.iter().any(|open| open == id) {
            warn!(asset = id, "precomposition references itself, instance dropped");
            return false;
        }
        if self.expanded.contains_key(id) {
            return true;
        }
        let Some(mut layers) = self.raw.remove(id) else {
            warn!(asset = id, "precomposition asset not found");
            return false;
        };

        self.stack.push(id.to_owned());
        self.expand(&mut layers);
        self.stack.pop();

        self.expanded.insert(id.to_owned(), layers);
        true
    }
}
