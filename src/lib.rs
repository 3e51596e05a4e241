//! Vector drawing surface engine.
//!
//! The core of an interactive freehand/vector drawing overlay: a unified
//! element model for heterogeneous shapes, composable affine transform
//! chains with derived pivots, a Cairo path renderer and an SVG exporter
//! producing equivalent output, and a persistence codec that reads drawing
//! files written by earlier format versions. Windowing, input delivery and
//! menus live in the embedding application; this crate is everything that
//! happens between a pointer event and a painted or exported shape.

pub mod draw;
pub mod persist;
pub mod surface;
pub mod util;

pub use surface::DrawingSurface;
