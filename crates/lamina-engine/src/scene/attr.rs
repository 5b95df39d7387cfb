use std::collections::BTreeMap;
use std::rc::Rc;

use crate::assets::{AudioId, ImageId};
use crate::backend::PaintSink;
use crate::paint::Color;

/// Attribute keys of a drawable object.
///
/// Builtins cover the enumerated per-object configuration surface; anything
/// else travels as `Custom` and participates in change detection without
/// builtin side effects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrKey {
    X,
    Y,
    Width,
    Height,
    Rotation,
    Opacity,
    Image,
    Audio,
    BgColor,
    Text,
    Arc,
    Line,
    Crop,
    Visible,
    Buffer,
    Layer,
    Delete,
    Run,
    Custom(String),
}

impl AttrKey {
    pub fn name(&self) -> &str {
        match self {
            AttrKey::X => "x",
            AttrKey::Y => "y",
            AttrKey::Width => "width",
            AttrKey::Height => "height",
            AttrKey::Rotation => "rotation",
            AttrKey::Opacity => "opacity",
            AttrKey::Image => "image",
            AttrKey::Audio => "audio",
            AttrKey::BgColor => "bg_color",
            AttrKey::Text => "text",
            AttrKey::Arc => "arc",
            AttrKey::Line => "line",
            AttrKey::Crop => "crop",
            AttrKey::Visible => "visible",
            AttrKey::Buffer => "buffer",
            AttrKey::Layer => "layer",
            AttrKey::Delete => "delete",
            AttrKey::Run => "run",
            AttrKey::Custom(name) => name,
        }
    }
}

/// Text payload: content, CSS-style font spec, fill style string.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub content: String,
    pub font: String,
    pub fill: String,
}

/// Stroked arc payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSpec {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub start_angle: f32,
    pub end_angle: f32,
    pub counterclockwise: bool,
    pub stroke: String,
}

/// Stroked line payload: flat `[x0, y0, x1, y1, ...]` point list (a single
/// segment is just a two-point path).
#[derive(Debug, Clone, PartialEq)]
pub struct LineSpec {
    pub points: Vec<f32>,
    pub width: f32,
    pub color: Color,
}

/// Image attribute state: an unresolved source string, or the resolved
/// (decoded, atlas-backed) handle the dispatcher swaps in once the resource
/// is ready.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    Source(String),
    Handle(ImageId),
}

/// Audio attribute state, symmetric with [`ImageRef`].
#[derive(Debug, Clone, PartialEq)]
pub enum AudioRef {
    Source(String),
    Handle(AudioId),
}

/// Procedural draw callback (`run`), invoked with a sink for the owning
/// layer's target during repaint.
#[derive(Clone)]
pub struct DrawHook(pub Rc<dyn Fn(&mut dyn PaintSink)>);

impl std::fmt::Debug for DrawHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DrawHook")
    }
}

impl PartialEq for DrawHook {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Per-object mutation hook, called after builtin attribute handling with
/// `(attrs, key, old, new)`; a `Some` return overrides the committed value.
#[derive(Clone)]
pub struct SetHook(
    #[allow(clippy::type_complexity)]
    pub  Rc<dyn Fn(&AttrMap, &AttrKey, Option<&AttrValue>, &AttrValue) -> Option<AttrValue>>,
);

impl std::fmt::Debug for SetHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SetHook")
    }
}

impl PartialEq for SetHook {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Attribute value.
///
/// Comparison is key-level value equality (hooks by pointer identity) — the
/// granularity the change detector diffs at.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Float(f32),
    Bool(bool),
    Str(String),
    /// `bg_color` quadruple: byte-range RGB, unit-range alpha.
    Color([f32; 4]),
    /// `crop` rectangle `[x, y, w, h]` in source-image pixels.
    Floats(Vec<f32>),
    Text(TextSpec),
    Arc(ArcSpec),
    Line(LineSpec),
    Image(ImageRef),
    Audio(AudioRef),
    Run(DrawHook),
}

impl AttrValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Ordered attribute map; deterministic iteration keeps change detection and
/// initial dispatch stable.
pub type AttrMap = BTreeMap<AttrKey, AttrValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_compare_by_identity() {
        let a = DrawHook(Rc::new(|_sink| {}));
        let b = DrawHook(Rc::new(|_sink| {}));
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
    }

    #[test]
    fn values_compare_by_content() {
        assert_eq!(AttrValue::Float(1.0), AttrValue::Float(1.0));
        assert_ne!(AttrValue::Float(1.0), AttrValue::Float(2.0));
        assert_ne!(
            AttrValue::Image(ImageRef::Source("a".into())),
            AttrValue::Image(ImageRef::Handle(ImageId(0)))
        );
    }
}
