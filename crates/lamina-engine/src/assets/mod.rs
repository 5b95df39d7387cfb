//! Resource resolution.
//!
//! Image/audio decoding is an external collaborator: the engine hands a
//! source string to a [`ResourceResolver`], receives a handle, and polls a
//! tri-state readiness signal from the frame loop. Process-wide caches
//! deduplicate handles by source; a throttled watch list carries
//! not-yet-ready resources across ticks.

mod cache;
mod resolver;
mod watch;

pub use cache::{AudioCache, ImageCache};
pub use resolver::{AudioId, ImageId, ReadyState, ResourceResolver, StaticResolver};
pub use watch::{PendingWatch, WATCH_INTERVAL, WatchKind, WatchList};
