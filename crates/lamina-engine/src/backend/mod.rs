//! Render backend seam.
//!
//! The engine core never talks to a GPU API directly; everything it needs
//! from the outside world — targets, draws, uploads, shader compilation,
//! compositing — goes through [`RenderBackend`]. `recording` is the test
//! double, `wgpu` the real implementation.

mod types;

pub mod recording;
pub mod wgpu;

pub use types::{
    CompositeParams, DrawCmd, LayerKind, LayerUniforms, PaintSink, RenderBackend, TargetId,
    TargetSink,
};
