use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::layer::{LayerConfig, UniformValue};

/// Capacity of the packed custom-uniform block, in floats.
pub const CUSTOM_UNIFORM_FLOATS: usize = 64;

/// Capacity of the packed custom-uniform block, in `vec4` slots.
pub const CUSTOM_UNIFORM_VECS: usize = CUSTOM_UNIFORM_FLOATS / 4;

const HOOK_MARKER: &str = "//@lamina:hook";
const UNIFORM_MARKER: &str = "//@lamina:uniforms";

const LAYER_VS: &str = include_str!("shaders/layer_vs.wgsl");
const LAYER_FS: &str = include_str!("shaders/layer_fs.wgsl");

/// Assembles the vertex-stage WGSL for a layer: user hook snippets spliced
/// at the hook marker, uniform accessors at the uniform marker.
pub fn assemble_vertex(config: &LayerConfig) -> String {
    splice(LAYER_VS, &config.vertex_hooks, &config.uniforms)
}

/// Assembles the fragment-stage WGSL for a layer.
pub fn assemble_fragment(config: &LayerConfig) -> String {
    splice(LAYER_FS, &config.fragment_hooks, &config.uniforms)
}

fn splice(base: &str, hooks: &[String], uniforms: &BTreeMap<String, UniformValue>) -> String {
    base.replace(UNIFORM_MARKER, &uniform_accessors(uniforms))
        .replace(HOOK_MARKER, &hooks.join("\n"))
}

/// Generates one WGSL accessor function per declared uniform, addressing the
/// packed `vec4` block. Scalars become `fn u_name() -> f32`, arrays become
/// `fn u_name(i: u32) -> f32` over consecutive floats.
fn uniform_accessors(uniforms: &BTreeMap<String, UniformValue>) -> String {
    let mut out = String::new();
    let mut offset = 0usize;

    for (name, value) in uniforms {
        let len = value.len();
        if offset + len > CUSTOM_UNIFORM_FLOATS {
            log::warn!(
                "uniform block full: dropping '{name}' and later declarations \
                 ({} of {CUSTOM_UNIFORM_FLOATS} floats used)",
                offset
            );
            break;
        }

        match value {
            UniformValue::Scalar(_) => {
                let _ = writeln!(
                    out,
                    "fn u_{name}() -> f32 {{ return custom_data.values[{}u][{}u]; }}",
                    offset / 4,
                    offset % 4
                );
            }
            UniformValue::Array(_) => {
                let _ = writeln!(
                    out,
                    "fn u_{name}(i: u32) -> f32 {{ let k = {offset}u + i; \
                     return custom_data.values[k / 4u][k % 4u]; }}"
                );
            }
        }
        offset += len;
    }

    out
}

/// Packs the declared uniform values into the fixed-size block, in name
/// order — the same order the accessors were generated in. Overflow is
/// truncated.
pub fn pack_custom_uniforms(
    uniforms: &BTreeMap<String, UniformValue>,
) -> [f32; CUSTOM_UNIFORM_FLOATS] {
    let mut block = [0.0f32; CUSTOM_UNIFORM_FLOATS];
    let mut offset = 0usize;

    for value in uniforms.values() {
        match value {
            UniformValue::Scalar(v) => {
                if offset >= CUSTOM_UNIFORM_FLOATS {
                    break;
                }
                block[offset] = *v;
                offset += 1;
            }
            UniformValue::Array(values) => {
                for &v in values {
                    if offset >= CUSTOM_UNIFORM_FLOATS {
                        break;
                    }
                    block[offset] = v;
                    offset += 1;
                }
            }
        }
    }

    block
}
