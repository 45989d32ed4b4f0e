//! Color model and the shared color palette.
//!
//! Entities reference colors by palette index; renderers fetch the RGBA value
//! from the palette texture.

pub mod color;
pub mod palette;

pub use color::Color;
pub use palette::{ColorSpec, Palette};
