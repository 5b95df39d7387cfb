/// Straight-alpha RGBA color with unit-range channels.
///
/// Callers usually construct this from a `bg_color` quadruple where RGB is
/// in `0..=255` and alpha is in `0..=1` — use [`from_bytes_alpha`] for that.
/// The buffer packer writes these channels verbatim into the
/// texture-coordinate stream, where a non-negative fourth component tags the
/// record as "literal color" for the fragment stage.
///
/// [`from_bytes_alpha`]: Color::from_bytes_alpha
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn transparent() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 0.0,
        }
    }

    /// Creates a color from unit-range components, clamped to `[0, 1]`.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Creates a color from a `[r, g, b, a]` quadruple with byte-range RGB
    /// (`0..=255`) and unit-range alpha — the `bg_color` attribute shape.
    #[inline]
    pub fn from_bytes_alpha(rgba: [f32; 4]) -> Self {
        Self::new(rgba[0] / 255.0, rgba[1] / 255.0, rgba[2] / 255.0, rgba[3])
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_alpha_scales_rgb_only() {
        let c = Color::from_bytes_alpha([255.0, 0.0, 127.5, 1.0]);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert_eq!(c.b, 0.5);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn new_clamps_channels() {
        let c = Color::new(-0.5, 2.0, 0.5, 1.5);
        assert_eq!(c.to_array(), [0.0, 1.0, 0.5, 1.0]);
    }
}
