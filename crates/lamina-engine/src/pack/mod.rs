//! Buffer packing: object attributes into slot records.
//!
//! Derives the four 24-float records for an object and writes each one only
//! when it actually differs from what the pool already holds, so untouched
//! streams never get flagged for re-upload.

use crate::atlas::AtlasSheet;
use crate::layer::{RECORD_FLOATS, Slot, SlotPool, StreamKind};
use crate::paint::Color;
use crate::scene::{ImageRef, Object};

/// Tolerance for record comparison; writes below this are dropped.
const PACK_EPSILON: f32 = 1e-6;

/// Texture-path corner order for the two quad triangles.
const CORNERS: [[f32; 2]; 6] = [
    [0.0, 0.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [0.0, 1.0],
    [1.0, 0.0],
    [1.0, 1.0],
];

/// Repacks one object into its assigned slot.
///
/// No-op for objects without a slot. The texture path wins when an image is
/// both assigned and already atlas-resident; otherwise the record carries a
/// literal color, or a discard marker when the object has neither.
pub(crate) fn pack_object(pool: &mut SlotPool, object: &Object, atlas: &AtlasSheet) {
    let Some(slot) = object.slot() else {
        return;
    };

    write_if_changed(pool, StreamKind::Geometry, slot, &geometry_record(object));
    write_if_changed(pool, StreamKind::Properties, slot, &properties_record(object));

    let resolved = object
        .image_ref()
        .and_then(|image| match image {
            ImageRef::Handle(id) => atlas.entry(*id),
            ImageRef::Source(_) => None,
        });

    let (texcoords, crop) = match resolved {
        Some(rect) => {
            let opacity = round3(object.opacity());
            let mut tex = [0.0f32; RECORD_FLOATS];
            for (vertex, corner) in CORNERS.iter().enumerate() {
                tex[vertex * 4..vertex * 4 + 4]
                    .copy_from_slice(&[corner[0], corner[1], opacity, -1.0]);
            }

            // An explicit crop is in source-image pixels; shift it by the
            // image's atlas origin so sampling stays inside the entry.
            let region = match object.crop() {
                Some([x, y, w, h]) => [rect.x + x, rect.y + y, w, h],
                None => [rect.x, rect.y, rect.width, rect.height],
            };
            (tex, splat4(region))
        }
        None => match object.bg_color() {
            Some(rgba) => (
                splat4(Color::from_bytes_alpha(rgba).to_array()),
                [0.0; RECORD_FLOATS],
            ),
            // Neither image nor color: a discard marker in every vertex.
            None => (splat4([-1.0, 0.0, 0.0, 0.0]), [0.0; RECORD_FLOATS]),
        },
    };

    write_if_changed(pool, StreamKind::TexCoords, slot, &texcoords);
    write_if_changed(pool, StreamKind::AtlasCrop, slot, &crop);
}

fn geometry_record(object: &Object) -> [f32; RECORD_FLOATS] {
    let w = object.width();
    let h = object.height();
    let mut record = [0.0f32; RECORD_FLOATS];
    for (vertex, corner) in CORNERS.iter().enumerate() {
        record[vertex * 4..vertex * 4 + 4]
            .copy_from_slice(&[corner[0] * w, corner[1] * h, w, h]);
    }
    record
}

fn properties_record(object: &Object) -> [f32; RECORD_FLOATS] {
    // Screen-space clockwise rotation; the y axis points down.
    let radians = -object.rotation_deg().to_radians();
    splat4([radians.sin(), radians.cos(), object.x(), object.y()])
}

/// Replicates one vertex quadruple across all six vertices.
fn splat4(quad: [f32; 4]) -> [f32; RECORD_FLOATS] {
    let mut record = [0.0f32; RECORD_FLOATS];
    for vertex in 0..6 {
        record[vertex * 4..vertex * 4 + 4].copy_from_slice(&quad);
    }
    record
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

fn write_if_changed(pool: &mut SlotPool, kind: StreamKind, slot: Slot, record: &[f32; RECORD_FLOATS]) {
    let current = pool.record(kind, slot);
    let changed = current
        .iter()
        .zip(record.iter())
        .any(|(a, b)| (a - b).abs() > PACK_EPSILON);
    if changed {
        pool.write_record(kind, slot, record);
    }
}
