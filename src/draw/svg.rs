//! SVG export of drawing elements.
//!
//! Write-only: drawings are exported as one declarative primitive per
//! element under a single `<svg>` root, with the transform chain carried as
//! nested coordinate-transform attributes. The markup is never read back.

use super::color::Color;
use super::element::{Element, ShapeKind};
use super::render::measure_text_width;
use super::style::FillRule;
use super::transform::TransformOp;
use crate::util::Point;
use std::fmt::Write as _;

const RADIAN: f64 = 180.0 / std::f64::consts::PI;

/// Builds a complete SVG document for the element sequence.
///
/// `background` paints a full-size rect behind the elements and is also the
/// color eraser strokes are exported with; `None` leaves the page
/// transparent.
pub fn document(
    elements: &[Element],
    width: f64,
    height: f64,
    background: Option<Color>,
) -> String {
    let background = background
        .map(|color| color.to_css_string())
        .unwrap_or_else(|| "transparent".to_string());

    let mut content = format!(
        "<svg viewBox=\"0 0 {} {}\" xmlns=\"http://www.w3.org/2000/svg\">",
        num(width),
        num(height)
    );
    if background != "transparent" {
        let _ = write!(
            content,
            "\n  <rect id=\"background\" width=\"100%\" height=\"100%\" fill=\"{background}\"/>"
        );
    }
    for element in elements {
        content.push_str(&element_markup(element, &background));
    }
    content.push_str("\n</svg>");
    content
}

/// One `\n  `-prefixed primitive row for a single element.
pub fn element_markup(element: &Element, background: &str) -> String {
    let mut row = String::from("\n  ");
    let points: Vec<Point> = element.points.iter().map(|p| p.rounded()).collect();
    let style = &element.style;
    let color = if style.eraser {
        background.to_string()
    } else {
        style.color.to_css_string()
    };
    let fill = style.fill && !element.is_straight_line();

    let mut attributes = if fill {
        let mut attributes = format!("fill=\"{color}\"");
        if style.fill_rule != FillRule::Nonzero {
            let _ = write!(attributes, " fill-rule=\"{}\"", style.fill_rule.svg_name());
        }
        attributes
    } else {
        "fill=\"none\"".to_string()
    };

    if style.line.line_width > 0.0 {
        let _ = write!(
            attributes,
            " stroke=\"{color}\" stroke-width=\"{}\"",
            num(style.line.line_width)
        );
        if style.line.line_cap != super::style::LineCap::Butt {
            let _ = write!(
                attributes,
                " stroke-linecap=\"{}\"",
                style.line.line_cap.svg_name()
            );
        }
        if style.line.line_join != super::style::LineJoin::Miter && !element.is_straight_line() {
            let _ = write!(
                attributes,
                " stroke-linejoin=\"{}\"",
                style.line.line_join.svg_name()
            );
        }
        if style.dash.is_effective() {
            let _ = write!(
                attributes,
                " stroke-dasharray=\"{} {}\" stroke-dashoffset=\"{}\"",
                num(style.dash.array[0]),
                num(style.dash.array[1]),
                num(style.dash.offset)
            );
        }
    } else {
        attributes.push_str(" stroke=\"none\"");
    }

    let transform = transform_attribute(element);
    let closing = if fill { "z" } else { "" };

    match element.shape {
        ShapeKind::Line if points.len() == 4 => {
            let _ = write!(
                row,
                "<path {attributes} d=\"M{} {} C {} {}, {} {}, {} {}{closing}\"{transform}/>",
                num(points[0].x),
                num(points[0].y),
                num(points[1].x),
                num(points[1].y),
                num(points[2].x),
                num(points[2].y),
                num(points[3].x),
                num(points[3].y),
            );
        }
        ShapeKind::Line if points.len() == 3 => {
            let _ = write!(
                row,
                "<path {attributes} d=\"M{} {} C {} {}, {} {}, {} {}{closing}\"{transform}/>",
                num(points[0].x),
                num(points[0].y),
                num(points[0].x),
                num(points[0].y),
                num(points[1].x),
                num(points[1].y),
                num(points[2].x),
                num(points[2].y),
            );
        }
        ShapeKind::Line if points.len() == 2 => {
            let _ = write!(
                row,
                "<line {attributes} x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\"{transform}/>",
                num(points[0].x),
                num(points[0].y),
                num(points[1].x),
                num(points[1].y),
            );
        }
        ShapeKind::Free if !points.is_empty() => {
            let _ = write!(row, "<path {attributes} d=\"M{} {}", num(points[0].x), num(points[0].y));
            for point in &points[1..] {
                let _ = write!(row, " L {} {}", num(point.x), num(point.y));
            }
            let _ = write!(row, "{closing}\"{transform}/>");
        }
        ShapeKind::Ellipse if points.len() == 3 => {
            let ry = points[1].distance_to(points[0]);
            let rx = points[2].distance_to(points[0]);
            let _ = write!(
                row,
                "<ellipse {attributes} cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\"{transform}/>",
                num(points[0].x),
                num(points[0].y),
                num(rx),
                num(ry),
            );
        }
        ShapeKind::Ellipse if points.len() == 2 => {
            let radius = points[1].distance_to(points[0]);
            let _ = write!(
                row,
                "<circle {attributes} cx=\"{}\" cy=\"{}\" r=\"{}\"{transform}/>",
                num(points[0].x),
                num(points[0].y),
                num(radius),
            );
        }
        ShapeKind::Rectangle if points.len() == 2 => {
            let _ = write!(
                row,
                "<rect {attributes} x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"{transform}/>",
                num(points[0].x.min(points[1].x)),
                num(points[0].y.min(points[1].y)),
                num((points[1].x - points[0].x).abs()),
                num((points[1].y - points[0].y).abs()),
            );
        }
        ShapeKind::Polygon if points.len() >= 3 => {
            let _ = write!(row, "<polygon {attributes} points=\"");
            for point in &points {
                let _ = write!(row, " {},{}", num(point.x), num(point.y));
            }
            let _ = write!(row, "\"{transform}/>");
        }
        ShapeKind::Polyline if points.len() >= 2 => {
            let _ = write!(row, "<polyline {attributes} points=\"");
            for point in &points {
                let _ = write!(row, " {},{}", num(point.x), num(point.y));
            }
            let _ = write!(row, "\"{transform}/>");
        }
        ShapeKind::Text if points.len() == 2 => {
            if let Some(markup) = text_markup(element, &points, &color, &transform) {
                row.push_str(&markup);
            } else {
                return String::new();
            }
        }
        _ => return String::new(),
    }

    row
}

fn text_markup(
    element: &Element,
    points: &[Point],
    color: &str,
    transform: &str,
) -> Option<String> {
    let block = element.text.as_ref()?;
    let size = (points[1].y - points[0].y).abs();

    // Text carries no stroke; visibility comes from the fill alone.
    let mut attributes = format!(
        "fill=\"{color}\" stroke=\"transparent\" stroke-opacity=\"0\" font-size=\"{}\"",
        num(size)
    );
    if !block.font.family.is_empty() {
        let _ = write!(attributes, " font-family=\"{}\"", block.font.family);
    }
    if block.font.weight != 400 {
        let _ = write!(attributes, " font-weight=\"{}\"", block.font.weight);
    }
    if block.font.slant != super::font::FontSlant::Normal {
        let _ = write!(attributes, " font-style=\"{}\"", block.font.slant.svg_name());
    }
    if block.font.stretch != super::font::FontStretch::Normal {
        let _ = write!(
            attributes,
            " font-stretch=\"{}\"",
            block.font.stretch.svg_name()
        );
    }
    if block.font.variant != super::font::FontVariant::Normal {
        attributes.push_str(" font-variant=\"small-caps\"");
    }

    // Same measured width the Cairo path uses, so both outputs anchor
    // right-aligned text identically.
    let width = measure_text_width(element).unwrap_or(0.0);
    let x = points[1].x - if block.right_aligned { width } else { 0.0 };
    let y = points[0].y.max(points[1].y);

    Some(format!(
        "<text {attributes} x=\"{}\" y=\"{}\"{transform}>{}</text>",
        num(x),
        num(y),
        escape_text(&block.text),
    ))
}

/// Transform attribute mirroring the Cairo issuance order (back-to-front, so
/// the oldest chain entry binds tightest to the raw coordinates). Angles are
/// emitted in degrees.
fn transform_attribute(element: &Element) -> String {
    let mut attribute = String::new();
    for index in (0..element.transformations.len()).rev() {
        attribute.push_str(if attribute.is_empty() {
            " transform=\""
        } else {
            " "
        });
        match element.transformations[index].op {
            TransformOp::Translation { slide_x, slide_y } => {
                let _ = write!(attribute, "translate({},{})", num(slide_x), num(slide_y));
            }
            TransformOp::Rotation { angle } => {
                let pivot = element.transform_pivot(index);
                let _ = write!(
                    attribute,
                    "translate({},{}) rotate({}) translate({},{})",
                    num(pivot.x),
                    num(pivot.y),
                    num(angle * RADIAN),
                    num(-pivot.x),
                    num(-pivot.y),
                );
            }
            TransformOp::Scale {
                scale_x,
                scale_y,
                angle,
            }
            | TransformOp::Stretch {
                scale_x,
                scale_y,
                angle,
            } => {
                let pivot = element.transform_pivot(index);
                let _ = write!(
                    attribute,
                    "translate({},{}) rotate({}) scale({},{}) rotate({}) translate({},{})",
                    num(pivot.x),
                    num(pivot.y),
                    num(angle * RADIAN),
                    num(scale_x),
                    num(scale_y),
                    num(-angle * RADIAN),
                    num(-pivot.x),
                    num(-pivot.y),
                );
            }
            TransformOp::Reflection {
                slide_x,
                slide_y,
                scale_x,
                scale_y,
                angle,
            }
            | TransformOp::Inversion {
                slide_x,
                slide_y,
                scale_x,
                scale_y,
                angle,
            } => {
                let _ = write!(
                    attribute,
                    "translate({},{}) rotate({}) scale({},{}) rotate({}) translate({},{})",
                    num(slide_x),
                    num(slide_y),
                    num(angle * RADIAN),
                    num(scale_x),
                    num(scale_y),
                    num(-angle * RADIAN),
                    num(-slide_x),
                    num(-slide_y),
                );
            }
        }
    }
    if !attribute.is_empty() {
        attribute.push('"');
    }
    attribute
}

// Shortest natural float formatting: "10", "0.5", "3.14".
fn num(value: f64) -> String {
    format!("{}", value)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
