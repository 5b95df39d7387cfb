use anyhow::Result;

use crate::assets::{ResourceResolver, StaticResolver};
use crate::backend::RenderBackend;
use crate::backend::recording::RecordingBackend;
use crate::backend::wgpu::WgpuBackend;
use crate::time::FpsCap;

/// Engine construction parameters.
///
/// The backend and resolver are collaborators the engine drives but never
/// creates itself; windowing, decoding and frame scheduling stay outside.
pub struct EngineConfig {
    /// Root surface width in logical pixels.
    pub width: f32,
    /// Root surface height in logical pixels.
    pub height: f32,
    pub fps_cap: FpsCap,
    pub backend: Box<dyn RenderBackend>,
    pub resolver: Box<dyn ResourceResolver>,
}

impl EngineConfig {
    /// Configuration over a recording backend and an in-memory resolver.
    /// The default for tests and embedders that schedule their own output.
    pub fn headless(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            fps_cap: FpsCap::default(),
            backend: Box::new(RecordingBackend::new()),
            resolver: Box::new(StaticResolver::new()),
        }
    }

    /// Configuration over the wgpu backend. The resolver still comes from
    /// the embedder, which owns image decoding and audio loading.
    pub fn gpu(width: f32, height: f32, resolver: Box<dyn ResourceResolver>) -> Result<Self> {
        Ok(Self {
            width,
            height,
            fps_cap: FpsCap::default(),
            backend: Box::new(WgpuBackend::new(width, height)?),
            resolver,
        })
    }
}
