//! Coordinate and geometry types shared across the engine.
//!
//! Canonical CPU space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! The GPU path converts to NDC in the vertex stage using a camera uniform.

mod rect;
mod vec2;

pub use rect::Rect;
pub use vec2::Vec2;
