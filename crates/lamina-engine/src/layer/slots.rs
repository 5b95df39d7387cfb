//! Per-layer slot pool: four parallel float streams holding one fixed-width
//! record per object.
//!
//! Each record is 24 floats (6 vertices × 4 floats), one per vertex-attribute
//! stream consumed by the layer's GPU program. A `-1.0` in the geometry
//! stream's first float marks a slot as free; the vertex stage emits a
//! degenerate position for such records so they can never be observed as
//! valid data.

/// Floats per slot record: 6 vertices × 4 floats.
pub const RECORD_FLOATS: usize = 24;

/// Vertices per slot record (two triangles forming a quad).
pub const RECORD_VERTICES: u32 = 6;

/// Records added per pool growth.
pub const GROW_RECORDS: usize = 100;

/// Free-slot marker written into the geometry stream's first component.
pub const SENTINEL: f32 = -1.0;

/// The four parallel vertex-attribute streams.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Local-space quad corners plus the quad's width/height.
    Geometry,
    /// Per-vertex `{sin(rotation), cos(rotation), x, y}`.
    Properties,
    /// Per-corner `{u, v, opacity, tag}` or a literal RGBA color.
    TexCoords,
    /// Resolved atlas rectangle replicated per vertex.
    AtlasCrop,
}

impl StreamKind {
    pub const ALL: [StreamKind; 4] = [
        StreamKind::Geometry,
        StreamKind::Properties,
        StreamKind::TexCoords,
        StreamKind::AtlasCrop,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            StreamKind::Geometry => 0,
            StreamKind::Properties => 1,
            StreamKind::TexCoords => 2,
            StreamKind::AtlasCrop => 3,
        }
    }
}

/// Stable index of one record inside a layer's pool.
///
/// The index never changes while the owning object stays in the same layer;
/// freed indices become eligible for reuse by later allocations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Slot(pub usize);

/// Parallel-array slot pool for one layer.
#[derive(Debug, Clone)]
pub struct SlotPool {
    streams: [Vec<f32>; 4],
    dirty: [bool; 4],
}

impl SlotPool {
    /// Creates a pool with a single free record.
    pub fn new() -> Self {
        Self {
            streams: std::array::from_fn(|_| vec![SENTINEL; RECORD_FLOATS]),
            dirty: [false; 4],
        }
    }

    /// Current capacity in records.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.streams[0].len() / RECORD_FLOATS
    }

    /// Vertex count covering the whole pool, sentinel records included
    /// (their vertices are discarded in the vertex stage).
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.capacity() as u32 * RECORD_VERTICES
    }

    /// Grows the pool in `GROW_RECORDS` chunks until it holds at least
    /// `required` records. New regions are filled with the sentinel record.
    pub fn ensure_capacity(&mut self, required: usize) {
        while self.capacity() < required {
            for stream in &mut self.streams {
                stream.extend(std::iter::repeat_n(SENTINEL, GROW_RECORDS * RECORD_FLOATS));
            }
        }
    }

    /// Claims the first free slot, clearing its records to the neutral
    /// all-zero state in every stream.
    ///
    /// O(capacity); allocation only happens on object add, never per frame.
    pub fn allocate(&mut self) -> Slot {
        loop {
            let geometry = &self.streams[StreamKind::Geometry.index()];
            let found = (0..self.capacity()).find(|&i| geometry[i * RECORD_FLOATS] == SENTINEL);

            match found {
                Some(i) => {
                    let slot = Slot(i);
                    for kind in StreamKind::ALL {
                        self.write_record(kind, slot, &[0.0; RECORD_FLOATS]);
                    }
                    return slot;
                }
                None => self.ensure_capacity(self.capacity() + 1),
            }
        }
    }

    /// Releases a slot by writing the sentinel into each vertex's first
    /// geometry component, making the whole record degenerate in the vertex
    /// stage.
    pub fn free(&mut self, slot: Slot) {
        let base = slot.0 * RECORD_FLOATS;
        let geometry = &mut self.streams[StreamKind::Geometry.index()];
        for vertex in 0..RECORD_VERTICES as usize {
            geometry[base + vertex * 4] = SENTINEL;
        }
        self.dirty[StreamKind::Geometry.index()] = true;
    }

    /// True when the slot currently holds the free marker.
    #[inline]
    pub fn is_free(&self, slot: Slot) -> bool {
        self.streams[StreamKind::Geometry.index()][slot.0 * RECORD_FLOATS] == SENTINEL
    }

    /// The 24-float record at `slot` in the given stream.
    #[inline]
    pub fn record(&self, kind: StreamKind, slot: Slot) -> &[f32] {
        let base = slot.0 * RECORD_FLOATS;
        &self.streams[kind.index()][base..base + RECORD_FLOATS]
    }

    /// Overwrites the record at `slot` and flags the stream for re-upload.
    pub fn write_record(&mut self, kind: StreamKind, slot: Slot, record: &[f32; RECORD_FLOATS]) {
        let base = slot.0 * RECORD_FLOATS;
        self.streams[kind.index()][base..base + RECORD_FLOATS].copy_from_slice(record);
        self.dirty[kind.index()] = true;
    }

    /// Whole stream contents, for upload to the backend.
    #[inline]
    pub fn stream(&self, kind: StreamKind) -> &[f32] {
        &self.streams[kind.index()]
    }

    #[inline]
    pub fn is_dirty(&self, kind: StreamKind) -> bool {
        self.dirty[kind.index()]
    }

    /// Returns and clears the per-stream dirty flags.
    pub fn take_dirty(&mut self) -> [bool; 4] {
        std::mem::replace(&mut self.dirty, [false; 4])
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_one_free_record() {
        let pool = SlotPool::new();
        assert_eq!(pool.capacity(), 1);
        assert!(pool.is_free(Slot(0)));
    }

    #[test]
    fn allocate_clears_all_streams_to_zero() {
        let mut pool = SlotPool::new();
        let slot = pool.allocate();
        for kind in StreamKind::ALL {
            assert_eq!(pool.record(kind, slot), &[0.0; RECORD_FLOATS]);
        }
    }

    #[test]
    fn allocate_grows_when_full() {
        let mut pool = SlotPool::new();
        let a = pool.allocate();
        let b = pool.allocate();
        assert_eq!(a, Slot(0));
        assert_eq!(b, Slot(1));
        assert_eq!(pool.capacity(), 1 + GROW_RECORDS);
    }

    #[test]
    fn growth_fills_new_region_with_sentinel() {
        let mut pool = SlotPool::new();
        pool.ensure_capacity(2);
        for i in 1..pool.capacity() {
            assert!(pool.is_free(Slot(i)));
            for kind in StreamKind::ALL {
                assert!(pool.record(kind, Slot(i)).iter().all(|&f| f == SENTINEL));
            }
        }
    }

    #[test]
    fn freed_slot_reads_as_sentinel_and_is_reused() {
        let mut pool = SlotPool::new();
        pool.ensure_capacity(3);
        let a = pool.allocate();
        let b = pool.allocate();

        pool.free(a);
        assert!(pool.is_free(a));
        assert!(!pool.is_free(b));

        // First-fit reuse: the freed index comes back before any fresh one.
        let c = pool.allocate();
        assert_eq!(c, a);
    }

    #[test]
    fn free_marks_geometry_dirty() {
        let mut pool = SlotPool::new();
        let slot = pool.allocate();
        pool.take_dirty();

        pool.free(slot);
        let dirty = pool.take_dirty();
        assert!(dirty[StreamKind::Geometry.index()]);
        assert!(!dirty[StreamKind::TexCoords.index()]);
    }

    #[test]
    fn slot_indices_are_stable_across_unrelated_churn() {
        let mut pool = SlotPool::new();
        pool.ensure_capacity(5);
        let a = pool.allocate();
        let b = pool.allocate();
        let c = pool.allocate();

        pool.free(b);
        let record_before: Vec<f32> = pool.record(StreamKind::Geometry, c).to_vec();
        let _d = pool.allocate();

        // c's slot and contents are untouched by b's removal and d's arrival.
        assert_eq!(pool.record(StreamKind::Geometry, c), record_before.as_slice());
        assert_eq!(a, Slot(0));
        assert_eq!(c, Slot(2));
    }
}
