//! Shared texture atlas.
//!
//! All loaded images are packed into one CPU-side RGBA8 sheet that GPU
//! layers sample from, minimizing texture binds. Packing is append-only:
//! rectangles never move once assigned, so texture coordinates computed
//! against an entry stay valid for the lifetime of the scene.

mod sheet;

pub use sheet::{ATLAS_PADDING, AtlasRect, AtlasSheet};
