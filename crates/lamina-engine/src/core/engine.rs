use anyhow::{Result, ensure};

use crate::assets::{AudioCache, ImageCache, ResourceResolver, WatchList};
use crate::atlas::AtlasSheet;
use crate::backend::{LayerKind, LayerUniforms, RenderBackend};
use crate::camera::Camera;
use crate::coords::Vec2;
use crate::layer::{Layer, LayerConfig};
use crate::scene::{AttrKey, AttrMap, AttrValue, Object, ObjectId, ObjectStore, SetHook};
use crate::shader;
use crate::time::{FpsCap, FpsCounter, FrameClock, FrameTime};

use super::EngineConfig;

/// The engine: object store, ordered layers, atlas, caches and the backend
/// seam, advanced one frame at a time by [`tick`].
///
/// [`tick`]: Engine::tick
pub struct Engine {
    pub(crate) backend: Box<dyn RenderBackend>,
    pub(crate) resolver: Box<dyn ResourceResolver>,
    pub(crate) store: ObjectStore,
    pub(crate) layers: Vec<Layer>,
    pub(crate) atlas: AtlasSheet,
    pub(crate) images: ImageCache,
    pub(crate) audio: AudioCache,
    pub(crate) watches: WatchList,
    pub(crate) camera: Camera,
    pub(crate) pointer: Vec2,
    /// Root surface size in logical pixels.
    pub(crate) size: Vec2,
    pub(crate) fps_cap: FpsCap,
    pub(crate) counter: FpsCounter,
    pub(crate) clock: FrameClock,
    pub(crate) last_frame: Option<FrameTime>,
}

impl Engine {
    /// Builds an engine with one default (canvas, relative) layer, the way
    /// every scene starts.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let EngineConfig {
            width,
            height,
            fps_cap,
            backend,
            resolver,
        } = config;
        ensure!(
            width > 0.0 && height > 0.0,
            "engine surface must have a positive size"
        );

        let mut engine = Self {
            backend,
            resolver,
            store: ObjectStore::new(),
            layers: Vec::new(),
            atlas: AtlasSheet::new(),
            images: ImageCache::new(),
            audio: AudioCache::new(),
            watches: WatchList::new(),
            camera: Camera::default(),
            pointer: Vec2::zero(),
            size: Vec2::new(width, height),
            fps_cap,
            counter: FpsCounter::new(),
            clock: FrameClock::new(),
            last_frame: None,
        };

        engine.backend.resize_root(engine.size)?;
        engine.ensure_layers(1)?;

        log::info!("engine up: {width}x{height}, fps cap {fps_cap:?}");
        Ok(engine)
    }

    // ── objects ───────────────────────────────────────────────────────────

    /// Adds an object, dispatching every supplied attribute once.
    ///
    /// The `layer` attribute (1-based) picks the owning layer, auto-creating
    /// default layers up to that index; absent, the object lands on layer 1.
    pub fn add_object(&mut self, attrs: AttrMap) -> Result<ObjectId> {
        self.add_object_with_hook(attrs, None)
    }

    /// [`add_object`] with a per-object mutation hook that can override
    /// committed attribute values.
    ///
    /// [`add_object`]: Engine::add_object
    pub fn add_object_with_hook(
        &mut self,
        attrs: AttrMap,
        hook: Option<SetHook>,
    ) -> Result<ObjectId> {
        let layer_index = attrs
            .get(&AttrKey::Layer)
            .and_then(AttrValue::as_f32)
            .map(|v| (v as u32).max(1))
            .unwrap_or(1);
        self.ensure_layers(layer_index)?;

        let id = self.store.insert(AttrMap::new(), hook);

        let layer = &mut self.layers[(layer_index - 1) as usize];
        let slot = layer.pool.allocate();
        layer.push_object(id);
        if let Some(obj) = self.store.get_mut(id) {
            obj.layer = layer_index;
            obj.slot = Some(slot);
        }

        for (key, value) in attrs {
            self.dispatch_attr(id, key, value, true)?;
        }
        Ok(id)
    }

    /// Removes an object, freeing its slot and layer membership together.
    /// Returns false when the id is already gone.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.store.remove(id) else {
            return false;
        };
        if let Some(layer) = self.layers.get_mut((obj.layer - 1) as usize) {
            layer.remove_object(id);
            if let Some(slot) = obj.slot {
                layer.pool.free(slot);
            }
        }
        true
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.store.get(id)
    }

    /// Writes an attribute value.
    ///
    /// The write is raw: builtin side effects (resource kickoff, layer
    /// re-homing, deletion) run when the change detector picks the mutation
    /// up at the next tick. Returns false when the object is gone.
    pub fn update_object(&mut self, id: ObjectId, key: AttrKey, value: AttrValue) -> bool {
        match self.store.get_mut(id) {
            Some(obj) => {
                obj.attrs.insert(key, value);
                true
            }
            None => false,
        }
    }

    // ── layers ────────────────────────────────────────────────────────────

    /// Appends a layer, returning its 1-based index.
    pub fn add_layer(&mut self, config: LayerConfig) -> Result<u32> {
        self.create_layer(config)
    }

    pub fn layer(&self, index: u32) -> Option<&Layer> {
        index
            .checked_sub(1)
            .and_then(|i| self.layers.get(i as usize))
    }

    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Replaces a layer's configuration. The layer's kind (canvas vs GPU)
    /// is fixed at creation; shader hooks and uniforms take effect at the
    /// next tick's recompile check.
    pub fn configure_layer(&mut self, index: u32, config: LayerConfig) -> Result<()> {
        let layer = index
            .checked_sub(1)
            .and_then(|i| self.layers.get_mut(i as usize))
            .ok_or_else(|| anyhow::anyhow!("no layer {index}"))?;
        ensure!(
            layer.config.use_gpu == config.use_gpu,
            "layer {index} kind is fixed at creation"
        );

        let uniforms_changed = layer.config.uniforms != config.uniforms;
        let use_gpu = config.use_gpu;
        let target = layer.target;
        layer.config = config;
        layer.modified = true;

        if uniforms_changed && use_gpu {
            let block =
                shader::pack_custom_uniforms(&self.layers[(index - 1) as usize].config.uniforms);
            self.backend.set_custom_uniforms(target, &block);
        }
        Ok(())
    }

    pub(crate) fn ensure_layers(&mut self, count: u32) -> Result<()> {
        while (self.layers.len() as u32) < count {
            self.create_layer(LayerConfig::default())?;
        }
        Ok(())
    }

    fn create_layer(&mut self, config: LayerConfig) -> Result<u32> {
        let kind = if config.use_gpu {
            LayerKind::Gpu
        } else {
            LayerKind::Canvas
        };
        let target = self.backend.create_target(self.size, kind)?;

        if config.use_gpu {
            self.backend.set_uniforms(
                target,
                &LayerUniforms {
                    camera: [self.camera.x, self.camera.y, self.size.x, self.size.y],
                    sheet_dims: self.atlas.dims(),
                    pointer: [self.pointer.x, self.pointer.y],
                },
            );
        }

        self.layers.push(Layer::new(config, target, self.size));
        let index = self.layers.len() as u32;
        log::debug!("layer {index} created ({kind:?})");
        Ok(index)
    }

    // ── camera / pointer / surface ────────────────────────────────────────

    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Moves the camera. Pan snaps to whole pixels; any actual change pushes
    /// fresh uniforms to every GPU layer immediately, outside the frame
    /// loop.
    pub fn set_camera(&mut self, camera: Camera) {
        let snapped = camera.snapped();
        if self.camera != snapped {
            self.camera = snapped;
            self.refresh_uniforms();
        }
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Tracks the pointer position into layer uniforms.
    pub fn set_pointer(&mut self, position: Vec2) {
        if self.pointer != position {
            self.pointer = position;
            self.refresh_uniforms();
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Resizes the root surface. Layer targets grow to cover it (they never
    /// shrink below an extent objects already painted into).
    pub fn resize(&mut self, width: f32, height: f32) -> Result<()> {
        ensure!(
            width > 0.0 && height > 0.0,
            "engine surface must have a positive size"
        );
        self.size = Vec2::new(width, height);
        self.backend.resize_root(self.size)?;

        for index in 0..self.layers.len() {
            let current = self.layers[index].target_size;
            let grown = Vec2::new(current.x.max(width), current.y.max(height));
            if grown != current {
                let target = self.layers[index].target;
                self.backend.resize_target(target, grown)?;
                self.layers[index].target_size = grown;
                self.layers[index].modified = true;
            }
        }

        self.refresh_uniforms();
        Ok(())
    }

    /// Frames completed during the most recently finished second.
    pub fn fps(&self) -> u32 {
        self.counter.fps()
    }

    /// Timing snapshot of the latest tick.
    pub fn last_frame(&self) -> Option<FrameTime> {
        self.last_frame
    }

    /// Pushes current camera, sheet and pointer uniforms to every GPU
    /// layer's target, unconditionally.
    pub(crate) fn refresh_uniforms(&mut self) {
        let sheet_dims = self.atlas.dims();
        for layer in &self.layers {
            if !layer.config.use_gpu {
                continue;
            }
            self.backend.set_uniforms(
                layer.target,
                &LayerUniforms {
                    camera: [
                        self.camera.x,
                        self.camera.y,
                        layer.target_size.x,
                        layer.target_size.y,
                    ],
                    sheet_dims,
                    pointer: [self.pointer.x, self.pointer.y],
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Slot;

    fn engine() -> Engine {
        Engine::new(EngineConfig::headless(300.0, 200.0)).unwrap()
    }

    fn attrs(entries: &[(AttrKey, AttrValue)]) -> AttrMap {
        entries.iter().cloned().collect()
    }

    #[test]
    fn new_engine_has_one_default_layer() {
        let e = engine();
        assert_eq!(e.layer_count(), 1);
        assert!(!e.layer(1).unwrap().config().use_gpu);
        assert!(e.layer(2).is_none());
    }

    #[test]
    fn add_object_auto_creates_layers_up_to_index() {
        let mut e = engine();
        let id = e
            .add_object(attrs(&[(AttrKey::Layer, AttrValue::Float(3.0))]))
            .unwrap();

        assert_eq!(e.layer_count(), 3);
        assert_eq!(e.object(id).unwrap().layer_index(), 3);
        assert_eq!(e.layer(3).unwrap().objects(), &[id]);
        assert!(e.layer(1).unwrap().is_empty());
    }

    #[test]
    fn add_object_assigns_a_slot() {
        let mut e = engine();
        let a = e.add_object(AttrMap::new()).unwrap();
        let b = e.add_object(AttrMap::new()).unwrap();

        assert_eq!(e.object(a).unwrap().slot(), Some(Slot(0)));
        assert_eq!(e.object(b).unwrap().slot(), Some(Slot(1)));
    }

    #[test]
    fn remove_object_frees_slot_for_reuse() {
        let mut e = engine();
        let a = e.add_object(AttrMap::new()).unwrap();
        let slot = e.object(a).unwrap().slot().unwrap();

        assert!(e.remove_object(a));
        assert!(!e.remove_object(a));
        assert!(e.object(a).is_none());

        let b = e.add_object(AttrMap::new()).unwrap();
        assert_eq!(e.object(b).unwrap().slot(), Some(slot));
    }

    #[test]
    fn camera_pan_snaps_to_whole_pixels() {
        let mut e = engine();
        e.set_camera(Camera {
            x: 10.6,
            y: 3.2,
            zoom: 2.0,
            rotation: 0.0,
        });
        assert_eq!(e.camera().x, 11.0);
        assert_eq!(e.camera().y, 3.0);
        assert_eq!(e.camera().zoom, 2.0);
    }

    #[test]
    fn configure_layer_rejects_kind_change() {
        let mut e = engine();
        assert!(e.configure_layer(1, LayerConfig::gpu()).is_err());
        assert!(e.configure_layer(1, LayerConfig::default()).is_ok());
        assert!(e.configure_layer(9, LayerConfig::default()).is_err());
    }
}
