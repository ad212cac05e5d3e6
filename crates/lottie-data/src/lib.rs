//! Lottie document model plus the one-time schema normalization that turns
//! any historical encoding into the canonical shape the compiler reads.

pub mod error;
pub mod model;
pub mod normalize;
mod precomp;

pub use error::{DataError, Result};
pub use normalize::{RawDocument, Version};
