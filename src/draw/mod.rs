//! Drawing element model and its two renderers.
//!
//! This module defines the core drawing types:
//! - [`Color`]: RGBA color representation with predefined constants
//! - [`Style`] / [`FontSpec`]: paint and font attributes
//! - [`Transform`]: composable affine transform chain entries
//! - [`Element`]: one vector shape with its points, style and transforms
//! - Cairo rendering/hit-testing and SVG export over the same model

pub mod color;
pub mod element;
pub mod font;
pub mod render;
pub mod style;
pub mod svg;
pub mod transform;

// Re-export commonly used types at module level
pub use color::Color;
pub use element::{Element, ShapeKind, TextBlock};
pub use font::{FontSlant, FontSpec, FontStretch, FontVariant};
pub use render::{build_path, hit_test, measure_text_width, render_all};
pub use style::{DashPattern, FillRule, LineCap, LineJoin, LineStyle, Style};
pub use transform::{SymmetryGuide, Transform, TransformKind, TransformOp};

// Re-export color constants for public API
#[allow(unused_imports)]
pub use color::{BLACK, BLUE, GREEN, RED, TRANSPARENT, WHITE};
