//! Cairo-based rendering, hit-testing and text measurement for elements.
//!
//! The exported SVG markup must stay visually equivalent to what these
//! functions paint; both consume the same transform chain and the same
//! measured text width.

use super::color::Color;
use super::element::{Element, ShapeKind};
use super::transform::{INVERSION_CIRCLE_RADIUS, SymmetryGuide, TransformOp};
use log::warn;
use std::f64::consts::PI;

/// Per-element render options (in-progress decorations).
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderParams {
    /// Draw the text caret bar.
    pub show_text_cursor: bool,
    /// Draw a dummy-stroked frame around the text extent (grabbed text).
    pub show_text_frame: bool,
    /// Trace the text frame invisibly so containment queries see it.
    pub trace_text_frame: bool,
    /// Replace the element's stroke with the dummy stroke (outline preview
    /// of a zero-width filled shape under construction).
    pub dummy_stroke: bool,
}

/// Paints every committed element and the in-progress one.
///
/// The whole pass runs behind a fault boundary: a Cairo error is logged and
/// the frame skipped, so one bad element can never take the surface down
/// permanently.
pub fn render_all(
    cr: &cairo::Context,
    elements: &[Element],
    current: Option<&Element>,
    text_cursor_visible: bool,
) {
    if let Err(err) = try_render_all(cr, elements, current, text_cursor_visible) {
        warn!("skipping frame after render error: {err}");
    }
}

fn try_render_all(
    cr: &cairo::Context,
    elements: &[Element],
    current: Option<&Element>,
    text_cursor_visible: bool,
) -> Result<(), cairo::Error> {
    for element in elements {
        cr.save()?;
        build_path(cr, element, &RenderParams::default())?;
        if element.style.fill && !element.is_straight_line() {
            cr.fill_preserve()?;
            if matches!(element.shape, ShapeKind::Free | ShapeKind::Line) {
                cr.close_path();
            }
        }
        cr.stroke()?;
        cr.restore()?;
    }

    if let Some(element) = current {
        cr.save()?;
        let params = RenderParams {
            show_text_cursor: text_cursor_visible,
            dummy_stroke: element.style.fill && element.style.line.line_width == 0.0,
            ..RenderParams::default()
        };
        build_path(cr, element, &params)?;
        cr.stroke()?;
        cr.restore()?;
    }

    Ok(())
}

/// Builds the element's path (and immediate text rendering) on the context,
/// leaving the path ready to fill/stroke and the CTM restored.
pub fn build_path(
    cr: &cairo::Context,
    element: &Element,
    params: &RenderParams,
) -> Result<(), cairo::Error> {
    let style = &element.style;
    set_source_color(cr, style.color);

    // Symmetry guide for an in-progress mirror gesture.
    if let Some(guide) = element.last_transformation().and_then(|t| t.guide()) {
        set_dummy_stroke(cr);
        match guide {
            SymmetryGuide::Axis { start, end } => {
                cr.move_to(start.x, start.y);
                cr.line_to(end.x, end.y);
            }
            SymmetryGuide::Center(center) => {
                cr.arc(center.x, center.y, INVERSION_CIRCLE_RADIUS, 0.0, 2.0 * PI);
            }
        }
        cr.stroke()?;
    }

    cr.set_line_cap(style.line.line_cap.to_cairo());
    cr.set_line_join(style.line.line_join.to_cairo());
    cr.set_line_width(style.line.line_width);
    cr.set_fill_rule(style.fill_rule.to_cairo());
    if style.dash.is_effective() {
        cr.set_dash(&style.dash.array, style.dash.offset);
    } else {
        cr.set_dash(&[], 0.0);
    }
    cr.set_operator(if style.eraser {
        cairo::Operator::Clear
    } else {
        cairo::Operator::Over
    });
    if params.dummy_stroke {
        set_dummy_stroke(cr);
    }

    // The chain transforms only the path geometry; stroking must happen in
    // the base space so line width is not scaled along.
    let base_matrix = cr.matrix();
    apply_transformations(cr, element);
    trace_shape(cr, element, params)?;
    cr.set_matrix(base_matrix);

    Ok(())
}

fn apply_transformations(cr: &cairo::Context, element: &Element) {
    for index in (0..element.transformations.len()).rev() {
        match element.transformations[index].op {
            TransformOp::Translation { slide_x, slide_y } => {
                cr.translate(slide_x, slide_y);
            }
            TransformOp::Rotation { angle } => {
                let pivot = element.transform_pivot(index);
                cr.translate(pivot.x, pivot.y);
                cr.rotate(angle);
                cr.translate(-pivot.x, -pivot.y);
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
                cr.translate(pivot.x, pivot.y);
                cr.rotate(angle);
                cr.scale(scale_x, scale_y);
                cr.rotate(-angle);
                cr.translate(-pivot.x, -pivot.y);
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
                cr.translate(slide_x, slide_y);
                cr.rotate(angle);
                cr.scale(scale_x, scale_y);
                cr.rotate(-angle);
                cr.translate(-slide_x, -slide_y);
            }
        }
    }
}

fn trace_shape(
    cr: &cairo::Context,
    element: &Element,
    params: &RenderParams,
) -> Result<(), cairo::Error> {
    let points = &element.points;
    if points.is_empty() {
        return Ok(());
    }

    match element.shape {
        ShapeKind::Line if points.len() == 3 => {
            cr.move_to(points[0].x, points[0].y);
            cr.curve_to(
                points[0].x, points[0].y, points[1].x, points[1].y, points[2].x, points[2].y,
            );
        }
        ShapeKind::Line if points.len() == 4 => {
            cr.move_to(points[0].x, points[0].y);
            cr.curve_to(
                points[1].x, points[1].y, points[2].x, points[2].y, points[3].x, points[3].y,
            );
        }
        ShapeKind::Free | ShapeKind::Line => {
            cr.move_to(points[0].x, points[0].y);
            for point in &points[1..] {
                cr.line_to(point.x, point.y);
            }
        }
        ShapeKind::Ellipse if points.len() >= 2 => {
            let center = points[0];
            let radius = points[1].distance_to(center);
            if let Some(ratio_point) = points.get(2) {
                let ratio = if radius == 0.0 {
                    1.0
                } else {
                    ratio_point.distance_to(center) / radius
                };
                cr.translate(center.x, center.y);
                cr.scale(ratio, 1.0);
                cr.translate(-center.x, -center.y);
                cr.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
                cr.translate(center.x, center.y);
                cr.scale(1.0 / nonzero(ratio), 1.0);
                cr.translate(-center.x, -center.y);
            } else {
                cr.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
            }
        }
        ShapeKind::Rectangle if points.len() == 2 => {
            cr.rectangle(
                points[0].x,
                points[0].y,
                points[1].x - points[0].x,
                points[1].y - points[0].y,
            );
        }
        ShapeKind::Polygon | ShapeKind::Polyline if points.len() >= 2 => {
            cr.move_to(points[0].x, points[0].y);
            for point in &points[1..] {
                cr.line_to(point.x, point.y);
            }
            if element.shape == ShapeKind::Polygon {
                cr.close_path();
            }
        }
        ShapeKind::Text if points.len() >= 2 => {
            trace_text(cr, element, params)?;
        }
        _ => {}
    }

    Ok(())
}

fn trace_text(
    cr: &cairo::Context,
    element: &Element,
    params: &RenderParams,
) -> Result<(), cairo::Error> {
    let Some(block) = element.text.as_ref() else {
        return Ok(());
    };
    let points = &element.points;
    let size = (points[1].y - points[0].y).abs();
    let baseline_y = points[0].y.max(points[1].y);

    let layout = pangocairo::functions::create_layout(cr);
    layout.set_font_description(Some(&block.font.to_pango_description(size)));
    layout.set_text(&block.text);

    let width = layout.pixel_size().0 as f64;
    element.set_text_width(width);

    let origin_x = points[1].x - if block.right_aligned { width } else { 0.0 };
    let origin_y = baseline_y - layout.baseline() as f64 / pango::SCALE as f64;
    cr.move_to(origin_x, origin_y);
    pangocairo::functions::show_layout(cr, &layout);

    if params.show_text_cursor {
        let cursor = block
            .cursor_position
            .unwrap_or_else(|| block.text.chars().count())
            .min(block.text.chars().count());
        let head: String = block.text.chars().take(cursor).collect();
        layout.set_text(&head);
        let head_width = layout.pixel_size().0 as f64;
        cr.rectangle(origin_x + head_width, baseline_y, size / 25.0, -size);
        cr.fill()?;
    }

    if params.show_text_frame || params.trace_text_frame {
        cr.rectangle(origin_x, baseline_y, width, -size);
        if params.show_text_frame {
            set_dummy_stroke(cr);
        } else {
            // Trace only, so containment queries can find the element.
            cr.set_line_width(0.0);
        }
    }

    Ok(())
}

/// Containment query against the path currently traced for `element`.
///
/// Text uses fill containment of its traced frame; every other shape uses
/// stroke containment with an enlarged effective width, unioned with fill
/// containment for filled shapes.
pub fn contains_point(
    cr: &cairo::Context,
    element: &Element,
    x: f64,
    y: f64,
) -> Result<bool, cairo::Error> {
    if element.shape == ShapeKind::Text {
        return cr.in_fill(x, y);
    }

    cr.save()?;
    cr.set_line_width(element.style.line.line_width.max(25.0));
    cr.set_dash(&[], 0.0);
    let inside = cr.in_stroke(x, y)? || (element.style.fill && cr.in_fill(x, y)?);
    cr.restore()?;
    Ok(inside)
}

/// Finds the topmost element under the pointer, using a throwaway context so
/// queries work outside a repaint pass. Returns the element's index.
pub fn hit_test(elements: &[Element], x: f64, y: f64) -> Option<usize> {
    let cr = scratch_context()?;
    for (index, element) in elements.iter().enumerate().rev() {
        let params = RenderParams {
            trace_text_frame: true,
            ..RenderParams::default()
        };
        if cr.save().is_err() {
            return None;
        }
        let hit = build_path(&cr, element, &params)
            .and_then(|_| contains_point(&cr, element, x, y))
            .unwrap_or(false);
        cr.new_path();
        let _ = cr.restore();
        if hit {
            return Some(index);
        }
    }
    None
}

/// Measures (and caches) the pixel width of a text element without painting
/// it, so SVG export and hit-testing agree with the on-screen layout.
pub fn measure_text_width(element: &Element) -> Option<f64> {
    if let Some(width) = element.text_width() {
        return Some(width);
    }
    let block = element.text.as_ref()?;
    if element.points.len() < 2 {
        return None;
    }

    let cr = scratch_context()?;
    let size = (element.points[1].y - element.points[0].y).abs();
    let layout = pangocairo::functions::create_layout(&cr);
    layout.set_font_description(Some(&block.font.to_pango_description(size)));
    layout.set_text(&block.text);
    let width = layout.pixel_size().0 as f64;
    element.set_text_width(width);
    Some(width)
}

// A 1x1 surface is enough for geometry and layout queries.
fn scratch_context() -> Option<cairo::Context> {
    let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, 1, 1).ok()?;
    cairo::Context::new(&surface).ok()
}

fn set_source_color(cr: &cairo::Context, color: Color) {
    cr.set_source_rgba(color.r, color.g, color.b, color.a);
}

// Thin dashed stroke used for guides and construction frames.
fn set_dummy_stroke(cr: &cairo::Context) {
    cr.set_line_width(2.0);
    cr.set_line_cap(cairo::LineCap::Butt);
    cr.set_line_join(cairo::LineJoin::Miter);
    cr.set_dash(&[1.0, 2.0], 0.0);
}

fn nonzero(value: f64) -> f64 {
    if value == 0.0 { 1.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::element::TextBlock;
    use crate::draw::font::FontSpec;
    use crate::draw::style::Style;
    use crate::util::Point;

    fn rectangle(fill: bool) -> Element {
        let mut element = Element::new(
            ShapeKind::Rectangle,
            Style {
                fill,
                ..Style::default()
            },
        );
        element.points = vec![Point::new(10.0, 10.0), Point::new(110.0, 60.0)];
        element
    }

    #[test]
    fn hit_test_finds_topmost_element() {
        let bottom = rectangle(true);
        let mut top = rectangle(true);
        top.points = vec![Point::new(50.0, 20.0), Point::new(90.0, 50.0)];
        let elements = [bottom, top];

        assert_eq!(hit_test(&elements, 60.0, 30.0), Some(1));
        assert_eq!(hit_test(&elements, 15.0, 15.0), Some(0));
        assert_eq!(hit_test(&elements, 500.0, 500.0), None);
    }

    #[test]
    fn unfilled_shapes_hit_only_near_the_stroke() {
        let outline = rectangle(false);
        let elements = [outline];
        // Center of a 100x50 outline: farther than the 25px effective stroke.
        assert_eq!(hit_test(&elements, 60.0, 35.0), None);
        // On the edge.
        assert_eq!(hit_test(&elements, 10.0, 30.0), Some(0));
    }

    #[test]
    fn translated_element_hits_at_its_new_position() {
        let mut moved = rectangle(true);
        moved
            .transformations
            .push(crate::draw::transform::TransformOp::Translation {
                slide_x: 200.0,
                slide_y: 0.0,
            }
            .into());
        let elements = [moved];
        assert_eq!(hit_test(&elements, 60.0, 30.0), None);
        assert_eq!(hit_test(&elements, 260.0, 30.0), Some(0));
    }

    #[test]
    fn measure_text_width_caches_on_the_element() {
        let mut text = Element::new(ShapeKind::Text, Style::default())
            .with_text(TextBlock::new(FontSpec::default(), false));
        text.points = vec![Point::new(0.0, 0.0), Point::new(0.0, 30.0)];
        if let Some(block) = text.text.as_mut() {
            block.text = "hello".to_string();
        }
        let width = measure_text_width(&text);
        assert!(width.is_some());
        assert_eq!(text.text_width(), width);
    }

    #[test]
    fn render_all_survives_a_degenerate_element() {
        let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, 64, 64).unwrap();
        let cr = cairo::Context::new(&surface).unwrap();
        let mut empty = Element::new(ShapeKind::Polygon, Style::default());
        empty.points.clear();
        render_all(&cr, &[empty, rectangle(false)], None, false);
    }
}
