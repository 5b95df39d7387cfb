//! Call-recording backend: the headless default and the test double.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::atlas::AtlasSheet;
use crate::coords::Vec2;
use crate::layer::StreamKind;

use super::{CompositeParams, DrawCmd, LayerKind, LayerUniforms, RenderBackend, TargetId};

/// One recorded backend call. Bulky payloads (streams, atlas pixels) are
/// captured by value or reduced to what assertions need.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateTarget {
        target: TargetId,
        size: Vec2,
        kind: LayerKind,
    },
    ResizeTarget {
        target: TargetId,
        size: Vec2,
    },
    ClearTarget {
        target: TargetId,
    },
    Draw {
        target: TargetId,
        cmd: DrawCmd,
    },
    UploadStream {
        target: TargetId,
        kind: StreamKind,
        data: Vec<f32>,
    },
    SetUniforms {
        target: TargetId,
        uniforms: LayerUniforms,
    },
    SetCustomUniforms {
        target: TargetId,
        data: Vec<f32>,
    },
    UploadAtlas {
        target: TargetId,
        generation: u64,
        dims: [u32; 2],
    },
    Recompile {
        target: TargetId,
        vertex_src: String,
        fragment_src: String,
    },
    DrawLayer {
        target: TargetId,
        vertex_count: u32,
    },
    BeginFrame,
    Composite {
        target: TargetId,
        params: CompositeParams,
    },
    EndFrame,
    ResizeRoot {
        size: Vec2,
    },
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<BackendCall>,
    next_target: u32,
    fail_recompiles: bool,
}

/// Backend that appends every call to a log instead of rendering.
///
/// Clones share the log, so a test can keep a handle after boxing the
/// backend into the engine.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `recompile` return an error, for exercising
    /// the keep-last-good-program path.
    pub fn fail_recompiles(&self, fail: bool) {
        self.state.borrow_mut().fail_recompiles = fail;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    pub fn drain(&self) -> Vec<BackendCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    /// Calls addressed to one target, in order.
    pub fn calls_for(&self, target: TargetId) -> Vec<BackendCall> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| match call {
                BackendCall::CreateTarget { target: t, .. }
                | BackendCall::ResizeTarget { target: t, .. }
                | BackendCall::ClearTarget { target: t }
                | BackendCall::Draw { target: t, .. }
                | BackendCall::UploadStream { target: t, .. }
                | BackendCall::SetUniforms { target: t, .. }
                | BackendCall::SetCustomUniforms { target: t, .. }
                | BackendCall::UploadAtlas { target: t, .. }
                | BackendCall::Recompile { target: t, .. }
                | BackendCall::DrawLayer { target: t, .. }
                | BackendCall::Composite { target: t, .. } => *t == target,
                BackendCall::BeginFrame | BackendCall::EndFrame | BackendCall::ResizeRoot { .. } => {
                    false
                }
            })
            .cloned()
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl RenderBackend for RecordingBackend {
    fn create_target(&mut self, size: Vec2, kind: LayerKind) -> Result<TargetId> {
        let mut state = self.state.borrow_mut();
        let target = TargetId(state.next_target);
        state.next_target += 1;
        state.calls.push(BackendCall::CreateTarget { target, size, kind });
        Ok(target)
    }

    fn resize_target(&mut self, target: TargetId, size: Vec2) -> Result<()> {
        self.record(BackendCall::ResizeTarget { target, size });
        Ok(())
    }

    fn clear_target(&mut self, target: TargetId) {
        self.record(BackendCall::ClearTarget { target });
    }

    fn draw(&mut self, target: TargetId, cmd: DrawCmd) {
        self.record(BackendCall::Draw { target, cmd });
    }

    fn upload_stream(&mut self, target: TargetId, kind: StreamKind, data: &[f32]) {
        self.record(BackendCall::UploadStream {
            target,
            kind,
            data: data.to_vec(),
        });
    }

    fn set_uniforms(&mut self, target: TargetId, uniforms: &LayerUniforms) {
        self.record(BackendCall::SetUniforms {
            target,
            uniforms: *uniforms,
        });
    }

    fn set_custom_uniforms(&mut self, target: TargetId, data: &[f32; 64]) {
        self.record(BackendCall::SetCustomUniforms {
            target,
            data: data.to_vec(),
        });
    }

    fn upload_atlas(&mut self, target: TargetId, atlas: &AtlasSheet) {
        self.record(BackendCall::UploadAtlas {
            target,
            generation: atlas.generation(),
            dims: [atlas.width(), atlas.height()],
        });
    }

    fn recompile(&mut self, target: TargetId, vertex_src: &str, fragment_src: &str) -> Result<()> {
        if self.state.borrow().fail_recompiles {
            return Err(anyhow!("recompile rejected by test backend"));
        }
        self.record(BackendCall::Recompile {
            target,
            vertex_src: vertex_src.to_owned(),
            fragment_src: fragment_src.to_owned(),
        });
        Ok(())
    }

    fn draw_layer(&mut self, target: TargetId, vertex_count: u32) {
        self.record(BackendCall::DrawLayer {
            target,
            vertex_count,
        });
    }

    fn begin_frame(&mut self) {
        self.record(BackendCall::BeginFrame);
    }

    fn composite(&mut self, target: TargetId, params: &CompositeParams) {
        self.record(BackendCall::Composite {
            target,
            params: *params,
        });
    }

    fn end_frame(&mut self) {
        self.record(BackendCall::EndFrame);
    }

    fn resize_root(&mut self, size: Vec2) -> Result<()> {
        self.record(BackendCall::ResizeRoot { size });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_are_assigned_sequentially() {
        let mut backend = RecordingBackend::new();
        let a = backend
            .create_target(Vec2::new(10.0, 10.0), LayerKind::Canvas)
            .unwrap();
        let b = backend
            .create_target(Vec2::new(10.0, 10.0), LayerKind::Gpu)
            .unwrap();
        assert_eq!(a, TargetId(0));
        assert_eq!(b, TargetId(1));
    }

    #[test]
    fn calls_for_filters_by_target() {
        let mut backend = RecordingBackend::new();
        let a = backend
            .create_target(Vec2::new(4.0, 4.0), LayerKind::Gpu)
            .unwrap();
        let b = backend
            .create_target(Vec2::new(4.0, 4.0), LayerKind::Gpu)
            .unwrap();

        backend.draw_layer(a, 6);
        backend.draw_layer(b, 12);
        backend.begin_frame();

        let for_a = backend.calls_for(a);
        assert_eq!(for_a.len(), 2);
        assert!(matches!(
            for_a[1],
            BackendCall::DrawLayer { vertex_count: 6, .. }
        ));
    }

    #[test]
    fn failed_recompile_records_nothing() {
        let mut backend = RecordingBackend::new();
        let t = backend
            .create_target(Vec2::new(4.0, 4.0), LayerKind::Gpu)
            .unwrap();

        backend.fail_recompiles(true);
        assert!(backend.recompile(t, "v", "f").is_err());
        assert!(
            !backend
                .calls()
                .iter()
                .any(|c| matches!(c, BackendCall::Recompile { .. }))
        );
    }
}
