//! Engine core: construction, public operations and shared state.
//!
//! The per-frame pipeline lives next to the data it works on: change
//! detection and attribute dispatch under `scene`, frame composition under
//! `compose`. All of them are `impl Engine` blocks over the state defined
//! here.

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::Engine;

pub use crate::time::{FpsCap, FrameAdvice};
