//! Time subsystem.
//!
//! Frame timing utilities, the per-second FPS counter, and the frame-pacing
//! policy derived from the engine's FPS cap. The engine never owns a timer
//! or a display-sync source (those are external collaborators); it only
//! reports what the driving loop should do next.

mod fps;
mod frame_clock;

pub use fps::{FpsCap, FpsCounter, FrameAdvice, advise};
pub use frame_clock::{FrameClock, FrameTime};
