//! Layer GPU program assembly.
//!
//! The base WGSL pair implements the stream-consuming quad pipeline; layer
//! configuration contributes hook snippets and custom uniform declarations,
//! spliced in as pure string work so assembly is testable without a device.

mod assemble;

pub use assemble::{
    CUSTOM_UNIFORM_FLOATS, CUSTOM_UNIFORM_VECS, assemble_fragment, assemble_vertex,
    pack_custom_uniforms,
};
