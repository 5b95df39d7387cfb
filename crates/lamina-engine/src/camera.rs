//! Scene camera.

/// Camera over the scene: pan, zoom about the surface center, rotation in
/// degrees.
///
/// Pan coordinates snap to whole pixels before they reach uniforms or the
/// compositor, so sub-pixel camera drift never blurs layer content.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
    pub rotation: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
            rotation: 0.0,
        }
    }
}

impl Camera {
    /// Pan position snapped to whole pixels.
    #[inline]
    pub fn snapped(self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapped_rounds_pan_only() {
        let c = Camera {
            x: 10.4,
            y: -3.6,
            zoom: 1.25,
            rotation: 45.5,
        };
        let s = c.snapped();
        assert_eq!(s.x, 10.0);
        assert_eq!(s.y, -4.0);
        assert_eq!(s.zoom, 1.25);
        assert_eq!(s.rotation, 45.5);
    }
}
