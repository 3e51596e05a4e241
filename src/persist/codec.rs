//! Drawing-file codec.
//!
//! Elements are persisted as a JSON array, one record per line. Optional
//! fields are omitted entirely (never written as null) and point
//! coordinates are rounded to 2 decimal places, so one serialize →
//! deserialize → serialize pass is byte-stable. Loading coerces the field
//! shapes written by older format versions instead of rejecting them.

use crate::draw::element::{Element, ShapeKind, TextBlock};
use crate::draw::font::FontSpec;
use crate::draw::style::Style;
use crate::draw::transform::{Transform, TransformOp};
use crate::util::Point;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec failures. Anything recognizably element-shaped is coerced rather
/// than rejected; only unparseable JSON errors out.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed drawing data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire shape of one element record.
///
/// Style attributes are flattened to top-level keys. The `transform` field
/// only exists in old files (a single pre-chain rotation block) and is
/// coerced into the chain on load.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementRecord {
    shape: ShapeKind,
    #[serde(flatten)]
    style: Style,
    #[serde(default)]
    transformations: Vec<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_right_aligned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font: Option<FontSpec>,
    points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform: Option<LegacyTransform>,
}

/// Single-transform block written before transform chains existed.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct LegacyTransform {
    center: Option<Point>,
    angle: f64,
    start_angle: f64,
    ratio: Option<f64>,
}

impl ElementRecord {
    fn from_element(element: &Element) -> Self {
        let (text, line_index, text_right_aligned, font) = match element.text.as_ref() {
            Some(block) => (
                Some(block.text.clone()),
                block.line_index,
                Some(block.right_aligned),
                Some(block.font.clone()),
            ),
            None => (None, None, None, None),
        };
        Self {
            shape: element.shape,
            style: element.style.clone(),
            transformations: element.transformations.clone(),
            text,
            line_index,
            text_right_aligned,
            font,
            points: element.points.iter().map(|point| point.rounded()).collect(),
            transform: None,
        }
    }

    // Applies the backward-compatibility coercions and validates the point
    // count. Returns None for records too degenerate to keep.
    fn into_element(self) -> Option<Element> {
        let ElementRecord {
            shape,
            style,
            mut transformations,
            text,
            line_index,
            text_right_aligned,
            font,
            mut points,
            transform,
        } = self;

        if let Some(legacy) = transform {
            if legacy.center.is_some() {
                let angle = legacy.angle + legacy.start_angle;
                if angle != 0.0 {
                    transformations.push(Transform::from(TransformOp::Rotation { angle }));
                }
            }
            if shape == ShapeKind::Ellipse && points.len() >= 2 {
                if let Some(ratio) = legacy.ratio {
                    if ratio != 0.0 && ratio != 1.0 {
                        // Synthesize the ratio point the current format uses.
                        let (p0, p1) = (points[0], points[1]);
                        points.push(Point::new(
                            ratio * (p1.x - p0.x) + p0.x,
                            ratio * (p1.y - p0.y) + p0.y,
                        ));
                    }
                }
            }
        }

        let text = text.map(|content| TextBlock {
            text: content,
            font: font.map(coerce_legacy_weight).unwrap_or_default().clamped(),
            right_aligned: text_right_aligned.unwrap_or(false),
            cursor_position: None,
            line_index,
        });

        if points.len() < shape.min_points() {
            warn!(
                "dropping {:?} record with {} points (minimum {})",
                shape,
                points.len(),
                shape.min_points()
            );
            return None;
        }

        Some(Element::from_parts(shape, points, style, transformations, text))
    }
}

// Ancient files stored normal/bold as 0/1.
fn coerce_legacy_weight(mut font: FontSpec) -> FontSpec {
    font.weight = match font.weight {
        0 => 400,
        1 => 700,
        weight => weight,
    };
    font
}

/// Serializes the element sequence in the drawing-file layout: one record
/// per line, blank-line separated — a compromise between disk usage and
/// human readability.
pub fn serialize_elements(elements: &[Element]) -> Result<String, CodecError> {
    let mut rows = Vec::with_capacity(elements.len());
    for element in elements {
        rows.push(serde_json::to_string(&ElementRecord::from_element(element))?);
    }
    Ok(format!("[\n  {}\n]", rows.join(",\n\n  ")))
}

/// Parses a drawing file, coercing legacy field shapes and dropping records
/// below their shape's minimum point count.
pub fn deserialize_elements(data: &str) -> Result<Vec<Element>, CodecError> {
    let records: Vec<ElementRecord> = serde_json::from_str(data)?;
    Ok(records
        .into_iter()
        .filter_map(ElementRecord::into_element)
        .collect())
}
