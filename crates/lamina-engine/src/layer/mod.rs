//! Layers and their slot pools.
//!
//! A layer is an ordered group of objects sharing one render target and,
//! for GPU layers, one program over four parallel vertex streams managed by
//! a [`SlotPool`].

mod config;
mod slots;
mod state;

pub use config::{LayerConfig, Positioning, UniformValue};
pub use slots::{
    GROW_RECORDS, RECORD_FLOATS, RECORD_VERTICES, SENTINEL, Slot, SlotPool, StreamKind,
};
pub use state::Layer;
