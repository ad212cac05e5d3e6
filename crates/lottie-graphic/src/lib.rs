//! Compiles Lottie animation documents into a tree of renderable elements
//! (groups, paths, ellipses, rectangles) whose animated properties are
//! spelled out as percent-positioned keyframe timelines.
//!
//! ```no_run
//! let json = std::fs::read_to_string("animation.json").unwrap();
//! let scene = lottie_graphic::Compiler::default().compile_str(&json).unwrap();
//! println!("{}", scene.to_json().unwrap());
//! ```

pub mod compiler;
pub mod draw;
pub mod element;
pub mod error;
pub mod options;
pub mod path;
pub mod pivot;
pub mod repeater;
pub mod timeline;
pub mod transform;
pub mod trim;
pub mod value;

pub use compiler::{compile, Compiler};
pub use draw::{draw_routine, DrawCommand, DrawContext, DrawRoutine};
pub use element::{AttrMap, AttrValue, CompiledScene, Element, ElementKind};
pub use error::{CompileError, Result};
pub use options::CompileOptions;
pub use repeater::PathDrawer;
pub use timeline::{TimeContext, Timeline, TimelineKeyframe};
