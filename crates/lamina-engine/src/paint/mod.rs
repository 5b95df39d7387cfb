//! Paint types.
//!
//! Colors enter the engine the way callers describe them (`bg_color`
//! quadruples with byte-range RGB and unit-range alpha) and leave it as
//! unit-range floats in the texture-coordinate stream.

mod color;

pub use color::Color;
