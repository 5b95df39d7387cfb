use std::collections::HashMap;

use crate::assets::ImageId;

/// Vertical gap inserted above each packed image, in pixels.
pub const ATLAS_PADDING: u32 = 10;

const INITIAL_EDGE: u32 = 10;
const BYTES_PER_PIXEL: usize = 4;

/// Immutable rectangle assigned to an image inside the sheet.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtlasRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Append-only vertical-strip atlas over an RGBA8 pixel sheet.
///
/// Packing policy: every image lands at `x = 0` below everything packed so
/// far; the sheet's height grows by the image height plus padding, and its
/// width grows only when the new image is wider than the sheet.
#[derive(Debug, Clone)]
pub struct AtlasSheet {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    entries: HashMap<ImageId, AtlasRect>,
    generation: u64,
}

impl AtlasSheet {
    pub fn new() -> Self {
        Self {
            width: INITIAL_EDGE,
            height: INITIAL_EDGE,
            pixels: vec![0; (INITIAL_EDGE * INITIAL_EDGE) as usize * BYTES_PER_PIXEL],
            entries: HashMap::new(),
            generation: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dims(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    /// Raw RGBA8 sheet contents, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bumped every time the sheet's pixel contents change; lets the engine
    /// decide when a re-upload to layer backends is due.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rectangle previously assigned to `id`, if any.
    #[inline]
    pub fn entry(&self, id: ImageId) -> Option<AtlasRect> {
        self.entries.get(&id).copied()
    }

    /// Packs a decoded image, growing and redrawing the sheet.
    ///
    /// Idempotent per image id: a second call returns the already-assigned
    /// rectangle without touching the sheet.
    ///
    /// `pixels` must be tightly packed RGBA8, `width * height * 4` bytes;
    /// short inputs are blitted as far as they reach and logged.
    pub fn ensure_packed(&mut self, id: ImageId, width: u32, height: u32, pixels: &[u8]) -> AtlasRect {
        if let Some(rect) = self.entries.get(&id) {
            return *rect;
        }

        let new_width = self.width.max(width);
        let new_height = self.height + ATLAS_PADDING + height;

        if pixels.len() < (width as usize * height as usize * BYTES_PER_PIXEL) {
            log::warn!(
                "atlas: image {id:?} supplied {} bytes, expected {}",
                pixels.len(),
                width as usize * height as usize * BYTES_PER_PIXEL
            );
        }

        let mut sheet = vec![0u8; new_width as usize * new_height as usize * BYTES_PER_PIXEL];

        // Preserve everything already packed; rectangles never move.
        blit(
            &mut sheet,
            new_width,
            0,
            0,
            &self.pixels,
            self.width,
            self.height,
        );

        let y = new_height - height;
        blit(&mut sheet, new_width, 0, y, pixels, width, height);

        self.width = new_width;
        self.height = new_height;
        self.pixels = sheet;
        self.generation += 1;

        let rect = AtlasRect {
            x: 0.0,
            y: y as f32,
            width: width as f32,
            height: height as f32,
        };
        self.entries.insert(id, rect);

        log::debug!(
            "atlas: packed image {id:?} at y={y}, sheet now {}x{}",
            self.width,
            self.height
        );

        rect
    }
}

impl Default for AtlasSheet {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `src` (tightly packed, `src_w` wide) into `dst` at `(dst_x, dst_y)`.
fn blit(dst: &mut [u8], dst_w: u32, dst_x: u32, dst_y: u32, src: &[u8], src_w: u32, src_h: u32) {
    let row_bytes = src_w as usize * BYTES_PER_PIXEL;
    for row in 0..src_h as usize {
        let src_start = row * row_bytes;
        if src_start >= src.len() {
            break;
        }
        let src_end = (src_start + row_bytes).min(src.len());

        let dst_start =
            ((dst_y as usize + row) * dst_w as usize + dst_x as usize) * BYTES_PER_PIXEL;
        let dst_end = dst_start + (src_end - src_start);
        dst[dst_start..dst_end].copy_from_slice(&src[src_start..src_end]);
    }
}
