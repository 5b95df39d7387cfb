//! Lamina engine crate.
//!
//! Retained-mode layered 2D scene renderer: callers describe a tree of
//! drawable objects grouped into ordered layers; the engine tracks which
//! objects changed frame-over-frame, repacks only the changed geometry into
//! GPU-friendly parallel vertex streams, and issues batched draw calls once
//! per tick.

pub mod assets;
pub mod atlas;
pub mod backend;
pub mod camera;
pub mod coords;
pub mod core;
pub mod layer;
pub mod paint;
pub mod scene;
pub mod shader;
pub mod time;

pub mod logging;

mod compose;
mod pack;

pub use backend::wgpu::WgpuBackend;
pub use camera::Camera;
pub use core::{Engine, EngineConfig, FpsCap, FrameAdvice};
pub use layer::{LayerConfig, Positioning};
pub use scene::{AttrKey, AttrMap, AttrValue, ObjectId};
