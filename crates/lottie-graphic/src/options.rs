use crate::path::DEFAULT_EPSILON;
use crate::repeater::PathDrawer;
use serde::{Deserialize, Serialize};

/// Compiler settings. Every field has a default, so partial configs
/// deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Frames per second used when the document carries no usable `fr`.
    pub fallback_frame_rate: f64,
    /// Marks every emitted timeline as looping.
    pub loop_timelines: bool,
    /// Handle-to-vertex distance under which a path segment is straight.
    pub path_epsilon: f64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            fallback_frame_rate: 30.0,
            loop_timelines: false,
            path_epsilon: DEFAULT_EPSILON,
        }
    }
}

impl CompileOptions {
    /// A path drawer using the configured straight-segment tolerance.
    pub fn path_drawer(&self) -> PathDrawer {
        PathDrawer::new(self.path_epsilon)
    }
}
