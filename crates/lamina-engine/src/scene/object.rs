use crate::coords::Rect;
use crate::layer::Slot;

use super::{AttrKey, AttrMap, AttrValue, AudioRef, DrawHook, ImageRef, SetHook};

/// Stable identity of a drawable object for its whole lifetime, across layer
/// reassignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// One drawable object: an attribute map plus engine-side bookkeeping.
///
/// `snapshot` is the last-observed copy of every attribute, diffed by the
/// change detector each frame; after a completed frame it equals `attrs`
/// for every iterated key.
#[derive(Debug, Clone)]
pub struct Object {
    pub(crate) id: ObjectId,
    pub(crate) attrs: AttrMap,
    pub(crate) snapshot: AttrMap,
    pub(crate) set_hook: Option<SetHook>,
    /// 1-based index of the owning layer.
    pub(crate) layer: u32,
    /// Assigned pool slot in the owning layer.
    pub(crate) slot: Option<Slot>,
}

impl Object {
    pub(crate) fn new(id: ObjectId, attrs: AttrMap, set_hook: Option<SetHook>) -> Self {
        Self {
            id,
            attrs,
            snapshot: AttrMap::new(),
            set_hook,
            layer: 1,
            slot: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    /// 1-based index of the layer currently owning this object.
    #[inline]
    pub fn layer_index(&self) -> u32 {
        self.layer
    }

    #[inline]
    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    pub fn attr(&self, key: &AttrKey) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    fn f32_or(&self, key: AttrKey, default: f32) -> f32 {
        self.attrs.get(&key).and_then(AttrValue::as_f32).unwrap_or(default)
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.f32_or(AttrKey::X, 0.0)
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.f32_or(AttrKey::Y, 0.0)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.f32_or(AttrKey::Width, 0.0)
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.f32_or(AttrKey::Height, 0.0)
    }

    /// Rotation in degrees, clockwise.
    #[inline]
    pub fn rotation_deg(&self) -> f32 {
        self.f32_or(AttrKey::Rotation, 0.0)
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.f32_or(AttrKey::Opacity, 1.0)
    }

    /// Objects default to visible; only an explicit `false` hides them.
    #[inline]
    pub fn visible(&self) -> bool {
        self.attrs
            .get(&AttrKey::Visible)
            .and_then(AttrValue::as_bool)
            .unwrap_or(true)
    }

    /// Buffer-exempt objects bypass viewport culling (offscreen buffering).
    #[inline]
    pub fn buffer_exempt(&self) -> bool {
        self.attrs
            .get(&AttrKey::Buffer)
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    pub fn bg_color(&self) -> Option<[f32; 4]> {
        match self.attrs.get(&AttrKey::BgColor) {
            Some(AttrValue::Color(rgba)) => Some(*rgba),
            _ => None,
        }
    }

    /// Explicit source crop `[x, y, w, h]`, if set.
    pub fn crop(&self) -> Option<[f32; 4]> {
        match self.attrs.get(&AttrKey::Crop) {
            Some(AttrValue::Floats(v)) if v.len() >= 4 => Some([v[0], v[1], v[2], v[3]]),
            _ => None,
        }
    }

    pub fn image_ref(&self) -> Option<&ImageRef> {
        match self.attrs.get(&AttrKey::Image) {
            Some(AttrValue::Image(r)) => Some(r),
            _ => None,
        }
    }

    pub fn audio_ref(&self) -> Option<&AudioRef> {
        match self.attrs.get(&AttrKey::Audio) {
            Some(AttrValue::Audio(r)) => Some(r),
            _ => None,
        }
    }

    pub fn run_hook(&self) -> Option<&DrawHook> {
        match self.attrs.get(&AttrKey::Run) {
            Some(AttrValue::Run(hook)) => Some(hook),
            _ => None,
        }
    }

    /// Axis-aligned bounds from the geometry attributes.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x(), self.y(), self.width(), self.height())
    }
}
