//! Scene model.
//!
//! Responsibilities:
//! - typed attribute keys/values for drawable objects
//! - the object store (identity, attribute map, per-object snapshot)
//! - frame-over-frame change detection against snapshots
//! - attribute-effect dispatch (resource kickoff, layer re-homing, deletion)
//!
//! Change detection and dispatch are engine operations (they touch layers,
//! slots, caches and the backend) and live in `detect`/`dispatch` as
//! `impl Engine` blocks.

mod attr;
mod detect;
mod dispatch;
mod object;
mod store;

pub use attr::{
    ArcSpec, AttrKey, AttrMap, AttrValue, AudioRef, DrawHook, ImageRef, LineSpec, SetHook, TextSpec,
};
pub use object::{Object, ObjectId};
pub use store::ObjectStore;
