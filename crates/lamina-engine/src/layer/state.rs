use crate::backend::{LayerKind, TargetId};
use crate::coords::Vec2;
use crate::scene::ObjectId;

use super::{LayerConfig, SlotPool};

/// One ordered layer: membership list, slot pool and repaint bookkeeping.
///
/// Draw order within the layer is membership order; layers themselves are
/// ordered by the engine's layer list.
#[derive(Debug)]
pub struct Layer {
    pub(crate) config: LayerConfig,
    pub(crate) objects: Vec<ObjectId>,
    pub(crate) pool: SlotPool,
    /// Set by change detection; a false value lets the composer skip the
    /// layer's repaint entirely (canvas layers only).
    pub(crate) modified: bool,
    pub(crate) target: TargetId,
    pub(crate) target_size: Vec2,
    /// Hook text the current program was compiled from, for recompile
    /// diffing. `None` until the first successful compile.
    pub(crate) compiled_hooks: Option<(String, String)>,
    /// Atlas generation last uploaded to this layer's target.
    pub(crate) atlas_generation: u64,
}

impl Layer {
    pub(crate) fn new(config: LayerConfig, target: TargetId, target_size: Vec2) -> Self {
        Self {
            config,
            objects: Vec::new(),
            pool: SlotPool::new(),
            modified: true,
            target,
            target_size,
            compiled_hooks: None,
            atlas_generation: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    #[inline]
    pub fn kind(&self) -> LayerKind {
        if self.config.use_gpu {
            LayerKind::Gpu
        } else {
            LayerKind::Canvas
        }
    }

    #[inline]
    pub fn target(&self) -> TargetId {
        self.target
    }

    #[inline]
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn push_object(&mut self, id: ObjectId) {
        self.objects.push(id);
        self.modified = true;
    }

    pub(crate) fn remove_object(&mut self, id: ObjectId) {
        self.objects.retain(|&o| o != id);
        self.modified = true;
    }
}
