use anyhow::Result;

use crate::assets::ImageId;
use crate::atlas::AtlasSheet;
use crate::coords::{Rect, Vec2};
use crate::layer::StreamKind;
use crate::paint::Color;
use crate::scene::{ArcSpec, LineSpec, TextSpec};

/// Backend-assigned handle for one layer's render target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// How a layer's target is driven.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Immediate-mode 2D draw commands, repainted on change.
    Canvas,
    /// Batched vertex streams through the layer's GPU program.
    Gpu,
}

/// Per-layer uniform block, refreshed on camera or pointer movement.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LayerUniforms {
    /// `{x, y, target_width, target_height}`.
    pub camera: [f32; 4],
    /// Atlas sheet dimensions in pixels.
    pub sheet_dims: [f32; 2],
    /// Pointer position in logical pixels.
    pub pointer: [f32; 2],
}

/// How a layer target lands on the root surface during compositing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositeParams {
    /// Source region of the layer target.
    pub crop: Rect,
    /// Destination extent on the root surface (zoom applied).
    pub dest_size: Vec2,
    /// Camera rotation in degrees, about the destination center.
    pub rotation_deg: f32,
}

/// Immediate-mode draw command for a canvas-kind target.
///
/// The engine forwards these as-is; rasterization is the backend's business.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect {
        rect: Rect,
        color: Color,
    },
    Text {
        origin: Vec2,
        spec: TextSpec,
    },
    Arc {
        origin: Vec2,
        spec: ArcSpec,
    },
    Line {
        spec: LineSpec,
    },
    Image {
        image: ImageId,
        /// Source crop in image pixels.
        src: Rect,
        dest: Rect,
        opacity: f32,
        rotation_deg: f32,
    },
}

/// Draw-command receiver handed to procedural draw hooks.
pub trait PaintSink {
    fn draw(&mut self, cmd: DrawCmd);
}

/// The complete rendering surface the engine core talks to: layer target
/// lifecycle, immediate-mode forwarding, GPU stream/uniform/atlas upload,
/// program recompilation and frame composition.
///
/// Upload and draw calls are infallible by design — they only touch
/// already-created resources. Creation, resizing and shader compilation can
/// fail and say so.
pub trait RenderBackend {
    fn create_target(&mut self, size: Vec2, kind: LayerKind) -> Result<TargetId>;

    fn resize_target(&mut self, target: TargetId, size: Vec2) -> Result<()>;

    /// Clears a target to transparent black.
    fn clear_target(&mut self, target: TargetId);

    fn draw(&mut self, target: TargetId, cmd: DrawCmd);

    /// Replaces the whole vertex stream of a GPU target.
    fn upload_stream(&mut self, target: TargetId, kind: StreamKind, data: &[f32]);

    fn set_uniforms(&mut self, target: TargetId, uniforms: &LayerUniforms);

    /// Replaces the packed custom-uniform block of a GPU target.
    fn set_custom_uniforms(&mut self, target: TargetId, data: &[f32; 64]);

    fn upload_atlas(&mut self, target: TargetId, atlas: &AtlasSheet);

    /// Rebuilds the target's GPU program from assembled shader sources.
    ///
    /// On error the previously compiled program stays active.
    fn recompile(&mut self, target: TargetId, vertex_src: &str, fragment_src: &str) -> Result<()>;

    /// Draws `vertex_count` vertices of the target's streams through its
    /// program, into the target.
    fn draw_layer(&mut self, target: TargetId, vertex_count: u32);

    fn begin_frame(&mut self);

    /// Draws a layer target onto the root surface.
    fn composite(&mut self, target: TargetId, params: &CompositeParams);

    fn end_frame(&mut self);

    fn resize_root(&mut self, size: Vec2) -> Result<()>;
}

/// Borrow of one target as a [`PaintSink`], for draw hooks.
///
/// Commands are translated by `origin` on the way through, so a hook draws
/// in its object's local coordinates rather than layer space.
pub struct TargetSink<'a> {
    backend: &'a mut dyn RenderBackend,
    target: TargetId,
    origin: Vec2,
}

impl<'a> TargetSink<'a> {
    pub fn new(backend: &'a mut dyn RenderBackend, target: TargetId, origin: Vec2) -> Self {
        Self {
            backend,
            target,
            origin,
        }
    }
}

impl PaintSink for TargetSink<'_> {
    fn draw(&mut self, cmd: DrawCmd) {
        let cmd = match cmd {
            DrawCmd::Rect { rect, color } => DrawCmd::Rect {
                rect: Rect::from_origin_size(rect.origin + self.origin, rect.size),
                color,
            },
            DrawCmd::Text { origin, spec } => DrawCmd::Text {
                origin: origin + self.origin,
                spec,
            },
            DrawCmd::Arc { origin, spec } => DrawCmd::Arc {
                origin: origin + self.origin,
                spec,
            },
            DrawCmd::Line { mut spec } => {
                for point in spec.points.chunks_exact_mut(2) {
                    point[0] += self.origin.x;
                    point[1] += self.origin.y;
                }
                DrawCmd::Line { spec }
            }
            DrawCmd::Image {
                image,
                src,
                dest,
                opacity,
                rotation_deg,
            } => DrawCmd::Image {
                image,
                src,
                dest: Rect::from_origin_size(dest.origin + self.origin, dest.size),
                opacity,
                rotation_deg,
            },
        };
        self.backend.draw(self.target, cmd);
    }
}
