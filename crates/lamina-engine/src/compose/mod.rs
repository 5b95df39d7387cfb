//! Frame composition: one [`Engine::tick`] per output frame.
//!
//! Order per tick: resource watches, change detection, per-layer repaint
//! (canvas draw or GPU repack + stream flush), then compositing every
//! non-empty layer onto the root surface under the camera transform.

use anyhow::Result;

use crate::backend::{CompositeParams, DrawCmd, TargetSink};
use crate::coords::{Rect, Vec2};
use crate::layer::{Positioning, StreamKind};
use crate::pack::pack_object;
use crate::paint::Color;
use crate::scene::{AttrKey, AttrValue, ImageRef, ObjectId};
use crate::shader;
use crate::time::{FrameAdvice, advise};

use crate::core::Engine;

impl Engine {
    /// Advances the engine one frame and reports how to pace the next one.
    pub fn tick(&mut self) -> Result<FrameAdvice> {
        let frame = self.clock.tick();

        self.poll_watches(frame.now)?;
        self.detect_changes()?;

        self.backend.begin_frame();
        for index in 0..self.layers.len() {
            self.paint_layer(index)?;
        }
        self.composite_layers();
        self.backend.end_frame();

        self.counter.tick(frame.now);
        self.last_frame = Some(frame);
        Ok(advise(self.fps_cap, self.counter.fps()))
    }

    /// Renders exactly one frame, ignoring pacing.
    pub fn run_once(&mut self) -> Result<()> {
        self.tick().map(|_| ())
    }

    fn paint_layer(&mut self, index: usize) -> Result<()> {
        let use_gpu = self.layers[index].config.use_gpu;

        // Unmodified canvas layers keep their last painted content; GPU
        // layers repaint every frame.
        if !use_gpu && !self.layers[index].modified {
            return Ok(());
        }

        let target = self.layers[index].target;

        if use_gpu {
            self.ensure_program(index);
            self.ensure_atlas(index);
        } else {
            self.grow_target_to_objects(index)?;
            if self.layers[index].config.clear {
                self.backend.clear_target(target);
            }
        }

        let camera_rect = Rect::new(self.camera.x, self.camera.y, self.size.x, self.size.y);
        let absolute = self.layers[index].config.position == Positioning::Absolute;
        let object_ids: Vec<ObjectId> = self.layers[index].objects.clone();

        for id in object_ids {
            let Some(obj) = self.store.get(id) else {
                continue;
            };
            if !obj.visible() {
                continue;
            }
            if !absolute && !obj.buffer_exempt() && !obj.bounds().overlaps(camera_rect) {
                continue;
            }

            if use_gpu {
                pack_object(&mut self.layers[index].pool, obj, &self.atlas);
            } else {
                self.draw_canvas_object(target, id);
            }
        }

        if use_gpu {
            let dirty = self.layers[index].pool.take_dirty();
            for kind in StreamKind::ALL {
                if dirty[kind.index()] {
                    self.backend
                        .upload_stream(target, kind, self.layers[index].pool.stream(kind));
                }
            }
            self.backend
                .draw_layer(target, self.layers[index].pool.vertex_count());
        }

        self.layers[index].modified = false;
        Ok(())
    }

    /// Reassembles the layer program and recompiles when the assembled
    /// source differs from what is currently running. A failed compile
    /// keeps the previous program and is retried next frame.
    fn ensure_program(&mut self, index: usize) {
        let assembled = (
            shader::assemble_vertex(&self.layers[index].config),
            shader::assemble_fragment(&self.layers[index].config),
        );
        if self.layers[index].compiled_hooks.as_ref() == Some(&assembled) {
            return;
        }

        let target = self.layers[index].target;
        match self.backend.recompile(target, &assembled.0, &assembled.1) {
            Ok(()) => {
                let block = shader::pack_custom_uniforms(&self.layers[index].config.uniforms);
                self.backend.set_custom_uniforms(target, &block);
                self.layers[index].compiled_hooks = Some(assembled);
            }
            Err(err) => {
                log::warn!(
                    "layer {}: shader recompile failed, keeping previous program: {err:#}",
                    index + 1
                );
            }
        }
    }

    fn ensure_atlas(&mut self, index: usize) {
        if self.layers[index].atlas_generation == self.atlas.generation() {
            return;
        }
        self.backend.upload_atlas(self.layers[index].target, &self.atlas);
        self.layers[index].atlas_generation = self.atlas.generation();
    }

    /// Grows a canvas layer's target to the furthest object extent, never
    /// below the root surface and never shrinking. Oversized targets are
    /// what makes camera-crop panning work without repaints.
    fn grow_target_to_objects(&mut self, index: usize) -> Result<()> {
        let mut size = self.layers[index].target_size;
        for &id in &self.layers[index].objects {
            if let Some(obj) = self.store.get(id) {
                let max = obj.bounds().max();
                if max.x > size.x {
                    size.x = max.x.max(self.size.x);
                }
                if max.y > size.y {
                    size.y = max.y.max(self.size.y);
                }
            }
        }

        if size != self.layers[index].target_size {
            let target = self.layers[index].target;
            self.backend.resize_target(target, size)?;
            self.layers[index].target_size = size;
        }
        Ok(())
    }

    /// Forwards one object's visual attributes as draw commands, in the
    /// paint order the attributes compose in: background fill, image, then
    /// the immediate-mode extras and the procedural hook.
    fn draw_canvas_object(&mut self, target: crate::backend::TargetId, id: ObjectId) {
        let Some(obj) = self.store.get(id) else {
            return;
        };

        if let Some(rgba) = obj.bg_color() {
            self.backend.draw(
                target,
                DrawCmd::Rect {
                    rect: obj.bounds(),
                    color: Color::from_bytes_alpha(rgba),
                },
            );
        }

        if let Some(ImageRef::Handle(image)) = obj.image_ref() {
            let src = match obj.crop() {
                Some([x, y, w, h]) => Rect::new(x, y, w, h),
                None => {
                    let (w, h) = self.resolver.image_size(*image).unwrap_or((0, 0));
                    Rect::new(0.0, 0.0, w as f32, h as f32)
                }
            };
            self.backend.draw(
                target,
                DrawCmd::Image {
                    image: *image,
                    src,
                    dest: obj.bounds(),
                    opacity: obj.opacity(),
                    rotation_deg: obj.rotation_deg(),
                },
            );
        }

        if let Some(AttrValue::Text(spec)) = obj.attr(&AttrKey::Text) {
            self.backend.draw(
                target,
                DrawCmd::Text {
                    origin: Vec2::new(obj.x(), obj.y()),
                    spec: spec.clone(),
                },
            );
        }

        if let Some(AttrValue::Arc(spec)) = obj.attr(&AttrKey::Arc) {
            self.backend.draw(
                target,
                DrawCmd::Arc {
                    origin: Vec2::new(obj.x(), obj.y()),
                    spec: spec.clone(),
                },
            );
        }

        if let Some(AttrValue::Line(spec)) = obj.attr(&AttrKey::Line) {
            self.backend.draw(target, DrawCmd::Line { spec: spec.clone() });
        }

        if let Some(hook) = obj.run_hook() {
            let hook = hook.clone();
            let origin = Vec2::new(obj.x(), obj.y());
            let mut sink = TargetSink::new(self.backend.as_mut(), target, origin);
            (hook.0)(&mut sink);
        }
    }

    /// Draws every non-empty layer onto the root surface in order. Relative
    /// canvas layers are cropped at the camera position; GPU and absolute
    /// layers already account for it.
    fn composite_layers(&mut self) {
        for layer in &self.layers {
            if layer.is_empty() {
                continue;
            }

            let pans_with_camera =
                layer.config.position != Positioning::Absolute && !layer.config.use_gpu;
            let crop_origin = if pans_with_camera {
                Vec2::new(self.camera.x, self.camera.y)
            } else {
                Vec2::zero()
            };

            self.backend.composite(
                layer.target,
                &CompositeParams {
                    crop: Rect::from_origin_size(crop_origin, layer.target_size),
                    dest_size: layer.target_size * self.camera.zoom,
                    rotation_deg: self.camera.rotation,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Instant;

    use crate::assets::{ImageId, StaticResolver, WATCH_INTERVAL};
    use crate::backend::recording::{BackendCall, RecordingBackend};
    use crate::backend::{DrawCmd, PaintSink, TargetId};
    use crate::camera::Camera;
    use crate::coords::Rect;
    use crate::core::{Engine, EngineConfig};
    use crate::layer::{LayerConfig, StreamKind};
    use crate::paint::Color;
    use crate::scene::{AttrKey, AttrMap, AttrValue, DrawHook, ImageRef};
    use crate::time::{FpsCap, FrameAdvice};

    fn harness() -> (Engine, RecordingBackend, StaticResolver) {
        harness_with_cap(FpsCap::default())
    }

    fn harness_with_cap(fps_cap: FpsCap) -> (Engine, RecordingBackend, StaticResolver) {
        let backend = RecordingBackend::new();
        let resolver = StaticResolver::new();
        let engine = Engine::new(EngineConfig {
            width: 300.0,
            height: 200.0,
            fps_cap,
            backend: Box::new(backend.clone()),
            resolver: Box::new(resolver.clone()),
        })
        .unwrap();
        (engine, backend, resolver)
    }

    fn attrs(entries: &[(AttrKey, AttrValue)]) -> AttrMap {
        entries.iter().cloned().collect()
    }

    fn rect_attrs(x: f32, y: f32, w: f32, h: f32) -> Vec<(AttrKey, AttrValue)> {
        vec![
            (AttrKey::X, AttrValue::Float(x)),
            (AttrKey::Y, AttrValue::Float(y)),
            (AttrKey::Width, AttrValue::Float(w)),
            (AttrKey::Height, AttrValue::Float(h)),
            (AttrKey::BgColor, AttrValue::Color([255.0, 0.0, 0.0, 1.0])),
        ]
    }

    fn draws(calls: &[BackendCall]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Draw { .. }))
            .count()
    }

    // ── frame flow ────────────────────────────────────────────────────────

    #[test]
    fn tick_brackets_frame_and_advises_display_sync() {
        let (mut e, backend, _) = harness();
        let advice = e.tick().unwrap();
        assert_eq!(advice, FrameAdvice::DisplaySync);

        let calls = backend.calls();
        let begin = calls
            .iter()
            .position(|c| matches!(c, BackendCall::BeginFrame))
            .unwrap();
        let end = calls
            .iter()
            .position(|c| matches!(c, BackendCall::EndFrame))
            .unwrap();
        assert!(begin < end);
        assert!(e.last_frame().is_some());
    }

    #[test]
    fn fps_cap_once_stops_after_single_frame() {
        let (mut e, _, _) = harness_with_cap(FpsCap::Once);
        assert_eq!(e.tick().unwrap(), FrameAdvice::Stop);
    }

    // ── canvas layers ─────────────────────────────────────────────────────

    #[test]
    fn canvas_rect_paints_then_composites() {
        let (mut e, backend, _) = harness();
        e.add_object(attrs(&rect_attrs(10.0, 20.0, 100.0, 50.0))).unwrap();
        let target = e.layer(1).unwrap().target();
        backend.drain();

        e.tick().unwrap();

        let calls = backend.calls_for(target);
        assert!(matches!(calls[0], BackendCall::ClearTarget { .. }));
        let BackendCall::Draw {
            cmd: crate::backend::DrawCmd::Rect { rect, color },
            ..
        } = &calls[1]
        else {
            panic!("expected a rect draw, got {:?}", calls[1]);
        };
        assert_eq!((rect.x(), rect.y(), rect.width(), rect.height()), (10.0, 20.0, 100.0, 50.0));
        assert_eq!(color.r, 1.0);

        let BackendCall::Composite { params, .. } = calls.last().unwrap() else {
            panic!("expected a composite");
        };
        assert_eq!((params.crop.x(), params.crop.y()), (0.0, 0.0));
        assert_eq!((params.dest_size.x, params.dest_size.y), (300.0, 200.0));
    }

    #[test]
    fn unmodified_canvas_layer_keeps_last_paint() {
        let (mut e, backend, _) = harness();
        e.add_object(attrs(&rect_attrs(0.0, 0.0, 10.0, 10.0))).unwrap();
        e.tick().unwrap();
        backend.drain();

        e.tick().unwrap();

        let calls = backend.calls();
        assert_eq!(draws(&calls), 0);
        assert!(!calls.iter().any(|c| matches!(c, BackendCall::ClearTarget { .. })));
        // The stale target still lands on the root every frame.
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Composite { .. })));
    }

    #[test]
    fn invisible_and_culled_objects_skip_painting() {
        let (mut e, backend, _) = harness();
        e.add_object(attrs(&rect_attrs(0.0, 0.0, 10.0, 10.0))).unwrap();

        let mut hidden = rect_attrs(20.0, 0.0, 10.0, 10.0);
        hidden.push((AttrKey::Visible, AttrValue::Bool(false)));
        e.add_object(attrs(&hidden)).unwrap();

        e.add_object(attrs(&rect_attrs(5000.0, 0.0, 10.0, 10.0))).unwrap();

        let mut exempt = rect_attrs(6000.0, 0.0, 10.0, 10.0);
        exempt.push((AttrKey::Buffer, AttrValue::Bool(true)));
        e.add_object(attrs(&exempt)).unwrap();

        backend.drain();
        e.tick().unwrap();

        // Visible-on-screen plus the cull-exempt one; hidden and off-camera
        // never reach the backend.
        assert_eq!(draws(&backend.calls()), 2);
    }

    #[test]
    fn run_hook_draws_in_object_space() {
        let (mut e, backend, _) = harness();
        let hook = DrawHook(Rc::new(|sink| {
            sink.draw(DrawCmd::Rect {
                rect: Rect::new(1.0, 2.0, 5.0, 5.0),
                color: Color::from_bytes_alpha([0.0, 255.0, 0.0, 1.0]),
            });
        }));
        let mut object = rect_attrs(30.0, 40.0, 10.0, 10.0);
        object.push((AttrKey::Run, AttrValue::Run(hook)));
        e.add_object(attrs(&object)).unwrap();
        backend.drain();

        e.tick().unwrap();

        // Hook coordinates are object-local: the rect lands offset by the
        // object's x/y.
        assert!(backend.calls().iter().any(|c| matches!(
            c,
            BackendCall::Draw { cmd: DrawCmd::Rect { rect, .. }, .. }
                if rect.x() == 31.0 && rect.y() == 42.0
        )));
    }

    #[test]
    fn canvas_target_grows_to_furthest_object() {
        let (mut e, backend, _) = harness();
        e.add_object(attrs(&rect_attrs(450.0, 80.0, 100.0, 40.0))).unwrap();
        let target = e.layer(1).unwrap().target();
        backend.drain();

        e.tick().unwrap();

        let calls = backend.calls_for(target);
        assert!(calls.iter().any(|c| matches!(
            c,
            BackendCall::ResizeTarget { size, .. } if size.x == 550.0 && size.y == 200.0
        )));
    }

    #[test]
    fn resize_grows_existing_layer_targets() {
        let (mut e, backend, _) = harness();
        backend.drain();

        e.resize(400.0, 300.0).unwrap();

        let calls = backend.calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            BackendCall::ResizeRoot { size } if size.x == 400.0 && size.y == 300.0
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            BackendCall::ResizeTarget { size, .. } if size.x == 400.0 && size.y == 300.0
        )));
        assert_eq!(e.layer(1).unwrap().target_size.x, 400.0);
    }

    // ── GPU layers ────────────────────────────────────────────────────────

    fn gpu_layer_with_rect(e: &mut Engine) -> (u32, TargetId) {
        let index = e.add_layer(LayerConfig::gpu()).unwrap();
        let mut object = rect_attrs(10.0, 20.0, 100.0, 50.0);
        object.push((AttrKey::Layer, AttrValue::Float(index as f32)));
        e.add_object(attrs(&object)).unwrap();
        (index, e.layer(index).unwrap().target())
    }

    #[test]
    fn gpu_layer_uploads_streams_then_converges() {
        let (mut e, backend, _) = harness();
        let (_, target) = gpu_layer_with_rect(&mut e);
        backend.drain();

        e.tick().unwrap();

        let calls = backend.calls_for(target);
        assert!(matches!(calls[0], BackendCall::Recompile { .. }));
        assert!(matches!(calls[1], BackendCall::SetCustomUniforms { .. }));

        let uploads: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::UploadStream { kind, data, .. } => Some((*kind, data.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(uploads.len(), 4);
        let geometry = &uploads
            .iter()
            .find(|(kind, _)| *kind == StreamKind::Geometry)
            .unwrap()
            .1;
        assert_eq!(&geometry[..4], &[0.0, 0.0, 100.0, 50.0]);

        assert!(matches!(
            calls.last(),
            Some(BackendCall::Composite { .. })
        ));
        assert!(calls
            .iter()
            .any(|c| matches!(c, BackendCall::DrawLayer { vertex_count: 6, .. })));

        // Nothing changed: the next frame redraws without re-uploading.
        backend.drain();
        e.tick().unwrap();
        let calls = backend.calls_for(target);
        assert!(!calls.iter().any(|c| matches!(c, BackendCall::UploadStream { .. })));
        assert!(!calls.iter().any(|c| matches!(c, BackendCall::Recompile { .. })));
        assert!(calls
            .iter()
            .any(|c| matches!(c, BackendCall::DrawLayer { vertex_count: 6, .. })));
    }

    #[test]
    fn failed_recompile_keeps_previous_program_and_retries() {
        let (mut e, backend, _) = harness();
        let (index, target) = gpu_layer_with_rect(&mut e);
        backend.fail_recompiles(true);
        backend.drain();

        e.tick().unwrap();
        assert!(e.layer(index).unwrap().compiled_hooks.is_none());
        assert!(!backend
            .calls_for(target)
            .iter()
            .any(|c| matches!(c, BackendCall::SetCustomUniforms { .. })));

        backend.fail_recompiles(false);
        backend.drain();
        e.tick().unwrap();

        assert!(e.layer(index).unwrap().compiled_hooks.is_some());
        let calls = backend.calls_for(target);
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Recompile { .. })));
        assert!(calls
            .iter()
            .any(|c| matches!(c, BackendCall::SetCustomUniforms { .. })));
    }

    #[test]
    fn camera_pan_crops_canvas_composite_only() {
        let (mut e, backend, _) = harness();
        e.add_object(attrs(&rect_attrs(0.0, 0.0, 10.0, 10.0))).unwrap();
        let canvas_target = e.layer(1).unwrap().target();
        let (_, gpu_target) = gpu_layer_with_rect(&mut e);
        backend.drain();

        e.set_camera(Camera {
            x: 7.0,
            y: 3.0,
            zoom: 1.0,
            rotation: 0.0,
        });
        assert!(backend.calls_for(gpu_target).iter().any(|c| matches!(
            c,
            BackendCall::SetUniforms { uniforms, .. } if uniforms.camera[0] == 7.0
        )));

        e.tick().unwrap();

        let canvas = backend.calls_for(canvas_target);
        let BackendCall::Composite { params, .. } = canvas.last().unwrap() else {
            panic!("expected canvas composite");
        };
        assert_eq!((params.crop.x(), params.crop.y()), (7.0, 3.0));

        let gpu = backend.calls_for(gpu_target);
        let BackendCall::Composite { params, .. } = gpu.last().unwrap() else {
            panic!("expected gpu composite");
        };
        // GPU layers pan in the vertex stage, not in compositing.
        assert_eq!(params.crop.x(), 0.0);
    }

    // ── resources ─────────────────────────────────────────────────────────

    #[test]
    fn ready_image_reaches_atlas_and_layer(){
        let (mut e, backend, resolver) = harness();
        resolver.insert_image("hero.png", 4, 4, vec![0xff; 64]);

        let index = e.add_layer(LayerConfig::gpu()).unwrap();
        let id = e
            .add_object(attrs(&[
                (AttrKey::Layer, AttrValue::Float(index as f32)),
                (AttrKey::Width, AttrValue::Float(4.0)),
                (AttrKey::Height, AttrValue::Float(4.0)),
                (
                    AttrKey::Image,
                    AttrValue::Image(ImageRef::Source("hero.png".into())),
                ),
            ]))
            .unwrap();
        let target = e.layer(index).unwrap().target();

        // Ready resources resolve during dispatch, before any tick.
        assert!(matches!(
            e.object(id).unwrap().image_ref(),
            Some(ImageRef::Handle(_))
        ));
        backend.drain();

        e.tick().unwrap();

        let calls = backend.calls_for(target);
        assert!(calls.iter().any(|c| matches!(
            c,
            BackendCall::UploadAtlas { generation: 1, dims: [10, 24], .. }
        )));
        let texcoords = calls
            .iter()
            .find_map(|c| match c {
                BackendCall::UploadStream {
                    kind: StreamKind::TexCoords,
                    data,
                    ..
                } => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        // Texture path: uv corner, opacity, atlas marker.
        assert_eq!(&texcoords[..4], &[0.0, 0.0, 1.0, -1.0]);
    }

    #[test]
    fn held_image_resolves_after_release() {
        let (mut e, _, resolver) = harness();
        resolver.insert_image("slow.png", 1, 1, vec![0; 4]);
        resolver.hold("slow.png");

        let id = e
            .add_object(attrs(&[(
                AttrKey::Image,
                AttrValue::Image(ImageRef::Source("slow.png".into())),
            )]))
            .unwrap();

        let t0 = Instant::now();
        e.poll_watches(t0).unwrap();
        assert!(matches!(
            e.object(id).unwrap().image_ref(),
            Some(ImageRef::Source(_))
        ));

        resolver.release("slow.png");
        e.poll_watches(t0 + WATCH_INTERVAL).unwrap();

        let obj = e.object(id).unwrap();
        assert_eq!(obj.image_ref(), Some(&ImageRef::Handle(ImageId(0))));
        assert_eq!(
            obj.snapshot.get(&AttrKey::Image),
            Some(&AttrValue::Image(ImageRef::Handle(ImageId(0))))
        );
        assert!(e.atlas.entry(ImageId(0)).is_some());
        assert!(e.watches.is_empty());
    }
}
