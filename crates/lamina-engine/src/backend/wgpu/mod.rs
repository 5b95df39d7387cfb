//! wgpu implementation of [`RenderBackend`](crate::backend::RenderBackend).
//!
//! Headless: the root surface is an offscreen texture like every layer
//! target. Embedders that present to a window blit or copy the root out
//! after [`Engine::tick`](crate::core::Engine::tick).

mod backend;
mod context;

pub use backend::WgpuBackend;
pub use context::{GpuContext, GpuInit};
