use std::collections::BTreeMap;

/// How a layer's content is anchored relative to the camera.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Positioning {
    /// Scrolls with the camera; objects are culled against the camera rect.
    #[default]
    Relative,
    /// Pinned to the surface; never culled or camera-cropped.
    Absolute,
}

/// Value of one user-declared shader uniform.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Array(Vec<f32>),
}

impl UniformValue {
    /// Number of floats this value occupies in the packed uniform block.
    pub fn len(&self) -> usize {
        match self {
            UniformValue::Scalar(_) => 1,
            UniformValue::Array(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-layer configuration.
///
/// `vertex_hooks`/`fragment_hooks` are WGSL snippets spliced into the layer
/// program at its hook markers; `uniforms` are packed into the program's
/// custom uniform block in name order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub position: Positioning,
    pub use_gpu: bool,
    /// When false the target accumulates across frames instead of being
    /// cleared before repaint.
    pub clear: bool,
    pub vertex_hooks: Vec<String>,
    pub fragment_hooks: Vec<String>,
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            position: Positioning::Relative,
            use_gpu: false,
            clear: true,
            vertex_hooks: Vec::new(),
            fragment_hooks: Vec::new(),
            uniforms: BTreeMap::new(),
        }
    }
}

impl LayerConfig {
    pub fn gpu() -> Self {
        Self {
            use_gpu: true,
            ..Self::default()
        }
    }
}
