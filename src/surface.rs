//! Drawing surface state and gesture orchestration.
//!
//! [`DrawingSurface`] owns the committed element sequence, the undo stack
//! and the in-progress element, and turns pointer/command input from the
//! embedding application into element lifecycle calls. It knows nothing
//! about windowing: the host delivers events and calls [`DrawingSurface::render`]
//! from its repaint callback.

use crate::draw::element::{Element, ShapeKind, TextBlock};
use crate::draw::{
    Color, DashPattern, FillRule, FontSpec, LineStyle, Style, Transform, TransformKind, render, svg,
};
use crate::persist::codec;
use crate::util::Point;
use log::debug;

/// Active tool: one per shape kind plus the three manipulation modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Free,
    Line,
    Ellipse,
    Rectangle,
    Text,
    Polygon,
    Polyline,
    /// Translate, or rotate with the modifier.
    Move,
    /// Scale uniformly, or stretch with the modifier.
    Resize,
    /// Reflect across a line, or invert through a point with the modifier.
    Mirror,
}

impl Tool {
    /// The shape kind this tool draws, if it is a drawing tool.
    pub fn shape(self) -> Option<ShapeKind> {
        match self {
            Tool::Free => Some(ShapeKind::Free),
            Tool::Line => Some(ShapeKind::Line),
            Tool::Ellipse => Some(ShapeKind::Ellipse),
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Text => Some(ShapeKind::Text),
            Tool::Polygon => Some(ShapeKind::Polygon),
            Tool::Polyline => Some(ShapeKind::Polyline),
            Tool::Move | Tool::Resize | Tool::Mirror => None,
        }
    }

    pub fn is_manipulation(self) -> bool {
        matches!(self, Tool::Move | Tool::Resize | Tool::Mirror)
    }
}

/// Cursor icon the host should show under the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerHint {
    PointingHand,
    Crosshair,
    MoveOrResize,
    Default,
}

impl PointerHint {
    /// Icon name in the host cursor theme.
    pub fn icon_name(self) -> &'static str {
        match self {
            PointerHint::PointingHand => "pointing-hand",
            PointerHint::Crosshair => "crosshair",
            PointerHint::MoveOrResize => "move-or-resize",
            PointerHint::Default => "default",
        }
    }
}

/// The drawing surface: committed elements, the undone stack, the element
/// under construction, and the current tool/style settings.
pub struct DrawingSurface {
    pub elements: Vec<Element>,
    undone: Vec<Element>,
    pub current: Option<Element>,
    writing: bool,

    pub tool: Tool,
    pub color: Color,
    pub line: LineStyle,
    pub dashed_line: bool,
    pub dash_array: [f64; 2],
    pub dash_offset: f64,
    pub fill: bool,
    pub fill_rule: FillRule,
    pub font: FontSpec,
    /// Concrete family substituted when the font family is "theme".
    pub theme_font_family: String,
    pub text_right_aligned: bool,

    /// Paints behind the drawing and colors exported eraser strokes.
    pub background: Option<Color>,
    width: f64,
    height: f64,

    grabbed: Option<usize>,
    transforming: bool,
    last_saved: Option<String>,
    pub needs_redraw: bool,
}

impl DrawingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            elements: Vec::new(),
            undone: Vec::new(),
            current: None,
            writing: false,
            tool: Tool::Free,
            color: crate::draw::BLACK,
            line: LineStyle::default(),
            dashed_line: false,
            dash_array: [0.0, 0.0],
            dash_offset: 0.0,
            fill: false,
            fill_rule: FillRule::default(),
            font: FontSpec::default(),
            theme_font_family: "Sans".to_string(),
            text_right_aligned: false,
            background: None,
            width,
            height,
            grabbed: None,
            transforming: false,
            last_saved: None,
            needs_redraw: true,
        }
    }

    pub fn is_writing(&self) -> bool {
        self.writing
    }

    pub fn grabbed(&self) -> Option<usize> {
        self.grabbed
    }

    fn current_style(&self, eraser: bool) -> Style {
        let dash = if self.dashed_line {
            // Fall back to width-derived segments when no explicit pattern
            // is configured.
            let on = if self.dash_array[0] > 0.0 {
                self.dash_array[0]
            } else {
                self.line.line_width
            };
            let off = if self.dash_array[1] > 0.0 {
                self.dash_array[1]
            } else {
                self.line.line_width * 3.0
            };
            DashPattern {
                active: true,
                array: [on, off],
                offset: self.dash_offset,
            }
        } else {
            DashPattern::default()
        };

        Style {
            color: self.color,
            line: self.line,
            dash,
            fill: self.fill,
            fill_rule: self.fill_rule,
            eraser,
        }
    }

    // ------------------------------------------------------------------
    // Drawing gestures
    // ------------------------------------------------------------------

    /// Begins a drawing gesture with the active tool. No-op for
    /// manipulation tools (those go through [`Self::start_transforming`]).
    pub fn start_drawing(&mut self, x: f64, y: f64, eraser: bool) {
        if self.writing {
            self.stop_writing(false);
        }
        let Some(shape) = self.tool.shape() else {
            return;
        };

        let mut style = self.current_style(eraser);
        let mut element = Element::new(shape, style.clone());
        if shape == ShapeKind::Text {
            style.fill = false;
            element.style = style;
            let mut font = self.font.clone().clamped();
            if font.family.eq_ignore_ascii_case("theme") {
                font.family = self.theme_font_family.clone();
            }
            let mut block = TextBlock::new(font, self.text_right_aligned);
            // Placeholder shown while the anchor box is being sized.
            block.text = "Text".to_string();
            element = element.with_text(block);
        }

        element.start_drawing(x, y);
        self.current = Some(element);
        self.needs_redraw = true;
    }

    /// Feeds a pointer sample to the in-progress element.
    pub fn update_drawing(&mut self, x: f64, y: f64, constrain: bool) {
        if let Some(element) = self.current.as_mut() {
            element.update_drawing(x, y, constrain);
            self.needs_redraw = true;
        }
    }

    /// Commits the in-progress element, or discards it when it stayed below
    /// the minimum drawing size. Text elements switch to writing instead of
    /// committing immediately.
    pub fn stop_drawing(&mut self) {
        let Some(mut element) = self.current.take() else {
            return;
        };
        let keep = element.stop_drawing();
        if keep {
            if element.shape == ShapeKind::Text && !self.writing {
                self.begin_writing(element);
                return;
            }
            self.elements.push(element);
        } else {
            debug!("discarding sub-minimum drawing gesture");
        }
        self.needs_redraw = true;
    }

    /// Marks the next polygon/polyline vertex or promotes a line's control
    /// points.
    pub fn add_vertex(&mut self) {
        if let Some(element) = self.current.as_mut() {
            element.add_point();
            self.needs_redraw = true;
        }
    }

    /// Abandons whatever gesture is in progress without touching the
    /// committed sequence. Safe to call with nothing in progress.
    pub fn cancel(&mut self) {
        if self.current.is_some() {
            self.current = None;
            self.writing = false;
            self.needs_redraw = true;
        }
        if self.transforming {
            if let Some(index) = self.grabbed {
                if let Some(element) = self.elements.get_mut(index) {
                    element.abort_transformation();
                }
            }
            self.transforming = false;
            self.needs_redraw = true;
        }
    }

    // ------------------------------------------------------------------
    // Text writing
    // ------------------------------------------------------------------

    fn begin_writing(&mut self, mut element: Element) {
        if let Some(block) = element.text.as_mut() {
            block.text.clear();
            block.cursor_position = Some(0);
        }
        self.writing = true;
        self.current = Some(element);
        self.needs_redraw = true;
    }

    /// Replaces the text and caret of the element being written.
    pub fn update_text(&mut self, text: &str, cursor: Option<usize>) {
        if !self.writing {
            return;
        }
        if let Some(block) = self.current.as_mut().and_then(|e| e.text.as_mut()) {
            block.text = text.to_string();
            block.cursor_position = cursor;
            self.needs_redraw = true;
        }
    }

    /// Finishes writing. With `new_line` the committed line is kept in its
    /// stacked group and a fresh empty line starts one line height below,
    /// sharing the group's rotation pivot through `line_index`.
    pub fn stop_writing(&mut self, new_line: bool) {
        if !self.writing {
            return;
        }
        let Some(mut element) = self.current.take() else {
            self.writing = false;
            return;
        };

        let has_text = element
            .text
            .as_ref()
            .is_some_and(|block| !block.text.is_empty());
        let stack_next = new_line && element.points.len() == 2;

        if stack_next {
            if let Some(block) = element.text.as_mut() {
                block.line_index = Some(block.line_index.unwrap_or(0));
                block.cursor_position = None;
            }
            let height = element.line_height();
            let mut next = Element::from_parts(
                element.shape,
                vec![
                    Point::new(element.points[0].x, element.points[0].y + height),
                    Point::new(element.points[1].x, element.points[1].y + height),
                ],
                element.style.clone(),
                element.transformations.clone(),
                element.text.clone(),
            );
            if let Some(block) = next.text.as_mut() {
                block.line_index = block.line_index.map(|index| index + 1);
                block.text.clear();
                block.cursor_position = Some(0);
            }
            if has_text {
                self.elements.push(element);
            }
            self.current = Some(next);
        } else {
            if let Some(block) = element.text.as_mut() {
                block.cursor_position = None;
            }
            if has_text {
                self.elements.push(element);
            }
            self.writing = false;
        }
        self.needs_redraw = true;
    }

    // ------------------------------------------------------------------
    // Transform gestures
    // ------------------------------------------------------------------

    /// Refreshes the grabbed element from the pointer position (hover with a
    /// manipulation tool active).
    pub fn update_grab(&mut self, x: f64, y: f64) {
        if self.transforming {
            return;
        }
        let grabbed = self.hit_test(x, y);
        if grabbed != self.grabbed {
            self.grabbed = grabbed;
            self.needs_redraw = true;
        }
    }

    /// Begins a transform gesture on the grabbed element. `alternate` is the
    /// modifier selecting the paired kind; `duplicate` transforms a fresh
    /// copy, leaving the original in place.
    pub fn start_transforming(&mut self, x: f64, y: f64, alternate: bool, duplicate: bool) {
        let Some(kind) = self.transform_kind(alternate) else {
            return;
        };
        let Some(mut index) = self.grabbed else {
            return;
        };
        if index >= self.elements.len() {
            return;
        }

        if duplicate {
            let copy = self.elements[index].clone();
            self.elements.push(copy);
            index = self.elements.len() - 1;
            self.grabbed = Some(index);
        }

        self.elements[index].start_transformation(x, y, kind);
        self.transforming = true;
        self.needs_redraw = true;
    }

    /// Updates the in-progress transform, switching to the paired kind when
    /// the modifier state flipped mid-drag.
    pub fn update_transforming(&mut self, x: f64, y: f64, alternate: bool) {
        if !self.transforming {
            return;
        }
        let Some(index) = self.grabbed else {
            return;
        };
        let Some(element) = self.elements.get_mut(index) else {
            return;
        };

        let active = element.last_transformation().map(Transform::kind);
        match active {
            Some(TransformKind::Translation) if alternate => {
                element.stop_transformation();
                element.start_transformation(x, y, TransformKind::Rotation);
            }
            Some(TransformKind::Rotation) if !alternate => {
                element.stop_transformation();
                element.start_transformation(x, y, TransformKind::Translation);
            }
            Some(TransformKind::Scale) if alternate => {
                element.stop_transformation();
                element.start_transformation(x, y, TransformKind::Stretch);
            }
            Some(TransformKind::Stretch) if !alternate => {
                element.stop_transformation();
                element.start_transformation(x, y, TransformKind::Scale);
            }
            Some(TransformKind::Reflection) if alternate => {
                element.abort_transformation();
                element.start_transformation(x, y, TransformKind::Inversion);
            }
            Some(TransformKind::Inversion) if !alternate => {
                element.abort_transformation();
                element.start_transformation(x, y, TransformKind::Reflection);
            }
            _ => {}
        }

        element.update_transformation(x, y);
        self.needs_redraw = true;
    }

    /// Commits the in-progress transform and releases the grab.
    pub fn stop_transforming(&mut self) {
        if !self.transforming {
            return;
        }
        if let Some(element) = self.grabbed.and_then(|index| self.elements.get_mut(index)) {
            element.stop_transformation();
        }
        self.transforming = false;
        self.grabbed = None;
        self.needs_redraw = true;
    }

    fn transform_kind(&self, alternate: bool) -> Option<TransformKind> {
        match self.tool {
            Tool::Move => Some(if alternate {
                TransformKind::Rotation
            } else {
                TransformKind::Translation
            }),
            Tool::Resize => Some(if alternate {
                TransformKind::Stretch
            } else {
                TransformKind::Scale
            }),
            Tool::Mirror => Some(if alternate {
                TransformKind::Inversion
            } else {
                TransformKind::Reflection
            }),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Stack operations
    // ------------------------------------------------------------------

    /// Moves the most recent element onto the redo stack.
    pub fn undo(&mut self) {
        if let Some(element) = self.elements.pop() {
            self.undone.push(element);
            self.needs_redraw = true;
        }
    }

    /// Restores the most recently undone element.
    pub fn redo(&mut self) {
        if let Some(element) = self.undone.pop() {
            self.elements.push(element);
            self.needs_redraw = true;
        }
    }

    /// Deletes the in-progress element if any, else the last committed one.
    pub fn delete_last_element(&mut self) {
        if self.current.is_some() {
            self.current = None;
            self.writing = false;
        } else {
            self.elements.pop();
        }
        self.needs_redraw = true;
    }

    /// Clears the page, including the redo stack.
    pub fn erase_all(&mut self) {
        self.current = None;
        self.writing = false;
        self.elements.clear();
        self.undone.clear();
        self.needs_redraw = true;
    }

    /// Smooths the most recent element when it is a freehand stroke.
    pub fn smooth_last_element(&mut self) {
        if let Some(element) = self.elements.last_mut() {
            if element.shape == ShapeKind::Free {
                element.smooth_all();
                self.needs_redraw = true;
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries and outputs
    // ------------------------------------------------------------------

    /// Topmost committed element under the pointer, if any.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<usize> {
        render::hit_test(&self.elements, x, y)
    }

    /// The cursor the host should show, or `None` to keep the current one.
    pub fn pointer_hint(&self, modifier: bool) -> Option<PointerHint> {
        if self.tool.is_manipulation() {
            return Some(if self.grabbed.is_some() {
                PointerHint::MoveOrResize
            } else {
                PointerHint::Default
            });
        }
        let writing_text = self
            .current
            .as_ref()
            .is_some_and(|element| element.shape == ShapeKind::Text && self.writing);
        if self.current.is_none() || writing_text {
            return Some(if self.tool == Tool::Free {
                PointerHint::PointingHand
            } else {
                PointerHint::Crosshair
            });
        }
        if self
            .current
            .as_ref()
            .is_some_and(|element| element.shape != ShapeKind::Free)
            && modifier
        {
            return Some(PointerHint::MoveOrResize);
        }
        None
    }

    /// Paints the page. Call from the host's repaint callback;
    /// `text_cursor_visible` carries the host-driven caret blink phase.
    pub fn render(&mut self, cr: &cairo::Context, text_cursor_visible: bool) {
        render::render_all(
            cr,
            &self.elements,
            self.current.as_ref(),
            text_cursor_visible && self.writing,
        );
        self.needs_redraw = false;
    }

    /// Updates the surface dimensions (host resize or square-area toggle).
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.needs_redraw = true;
    }

    /// Exports the page as an SVG document.
    pub fn export_svg(&self) -> String {
        svg::document(&self.elements, self.width, self.height, self.background)
    }

    /// Serializes the committed sequence in the drawing-file format.
    pub fn serialize(&self) -> Result<String, codec::CodecError> {
        codec::serialize_elements(&self.elements)
    }

    /// True when the live serialization differs from the last persisted one.
    pub fn contents_changed(&self) -> bool {
        match self.serialize() {
            Ok(contents) => self.last_saved.as_deref() != Some(contents.as_str()),
            Err(_) => true,
        }
    }

    /// Records the serialization that was just persisted.
    pub fn mark_saved(&mut self, contents: String) {
        self.last_saved = Some(contents);
    }

    /// Replaces the page with loaded elements (e.g. from the persistent
    /// file), dropping any gesture in progress.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        self.current = None;
        self.writing = false;
        self.transforming = false;
        self.grabbed = None;
        self.elements = elements;
        self.needs_redraw = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::TransformOp;

    fn surface() -> DrawingSurface {
        DrawingSurface::new(800.0, 600.0)
    }

    fn draw_rectangle(surface: &mut DrawingSurface) {
        surface.tool = Tool::Rectangle;
        surface.start_drawing(10.0, 10.0, false);
        surface.update_drawing(110.0, 60.0, false);
        surface.stop_drawing();
    }

    #[test]
    fn rectangle_gesture_commits_one_element() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        assert_eq!(surface.elements.len(), 1);
        assert!(surface.current.is_none());
    }

    #[test]
    fn short_polygon_is_discarded() {
        let mut surface = surface();
        surface.tool = Tool::Polygon;
        surface.start_drawing(0.0, 0.0, false);
        surface.update_drawing(50.0, 0.0, false);
        surface.stop_drawing(); // only 2 vertices
        assert!(surface.elements.is_empty());
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        surface.undo();
        assert!(surface.elements.is_empty());
        surface.redo();
        assert_eq!(surface.elements.len(), 1);
    }

    #[test]
    fn erase_all_clears_both_stacks() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        surface.undo();
        surface.erase_all();
        surface.redo();
        assert!(surface.elements.is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut surface = surface();
        surface.tool = Tool::Free;
        surface.start_drawing(0.0, 0.0, false);
        surface.cancel();
        surface.cancel();
        assert!(surface.current.is_none());
        assert!(surface.elements.is_empty());
    }

    #[test]
    fn text_gesture_switches_to_writing() {
        let mut surface = surface();
        surface.tool = Tool::Text;
        surface.start_drawing(10.0, 10.0, false);
        surface.update_drawing(10.0, 40.0, false);
        surface.stop_drawing();
        assert!(surface.is_writing());
        surface.update_text("hello", None);
        surface.stop_writing(false);
        assert_eq!(surface.elements.len(), 1);
        let block = surface.elements[0].text.as_ref().unwrap();
        assert_eq!(block.text, "hello");
        assert_eq!(block.line_index, None);
    }

    #[test]
    fn empty_text_is_not_committed() {
        let mut surface = surface();
        surface.tool = Tool::Text;
        surface.start_drawing(10.0, 10.0, false);
        surface.update_drawing(10.0, 40.0, false);
        surface.stop_drawing();
        surface.stop_writing(false);
        assert!(surface.elements.is_empty());
    }

    #[test]
    fn new_line_stacks_text_with_shared_group() {
        let mut surface = surface();
        surface.tool = Tool::Text;
        surface.start_drawing(10.0, 10.0, false);
        surface.update_drawing(10.0, 40.0, false);
        surface.stop_drawing();
        surface.update_text("first", None);
        surface.stop_writing(true);

        assert!(surface.is_writing());
        assert_eq!(surface.elements.len(), 1);
        let first = surface.elements[0].text.as_ref().unwrap();
        assert_eq!(first.line_index, Some(0));

        let next = surface.current.as_ref().unwrap();
        let block = next.text.as_ref().unwrap();
        assert_eq!(block.line_index, Some(1));
        assert!(block.text.is_empty());
        // One line height below the first line.
        assert_eq!(next.points[0].y, 40.0);
        assert_eq!(next.points[1].y, 70.0);

        surface.update_text("second", None);
        surface.stop_writing(false);
        assert_eq!(surface.elements.len(), 2);
    }

    #[test]
    fn grab_and_translate_committed_element() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        surface.tool = Tool::Move;
        surface.update_grab(60.0, 10.0);
        assert_eq!(surface.grabbed(), Some(0));

        surface.start_transforming(60.0, 10.0, false, false);
        surface.update_transforming(160.0, 10.0, false);
        surface.stop_transforming();

        assert_eq!(surface.elements[0].transformations.len(), 1);
        assert_eq!(
            surface.elements[0].transformations[0].op,
            TransformOp::Translation {
                slide_x: 100.0,
                slide_y: 0.0
            }
        );
        assert!(surface.grabbed().is_none());
    }

    #[test]
    fn duplicate_transforms_a_copy() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        surface.tool = Tool::Move;
        surface.update_grab(60.0, 10.0);
        surface.start_transforming(60.0, 10.0, false, true);
        surface.update_transforming(260.0, 10.0, false);
        surface.stop_transforming();

        assert_eq!(surface.elements.len(), 2);
        assert!(surface.elements[0].transformations.is_empty());
        assert_eq!(surface.elements[1].transformations.len(), 1);
    }

    #[test]
    fn modifier_flip_replaces_the_in_progress_kind() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        surface.tool = Tool::Mirror;
        surface.update_grab(60.0, 10.0);
        surface.start_transforming(0.0, 0.0, false, false);
        surface.update_transforming(100.0, 0.0, true);
        let element = &surface.elements[0];
        assert!(matches!(
            element.last_transformation().map(Transform::kind),
            Some(TransformKind::Inversion)
        ));
    }

    #[test]
    fn contents_changed_tracks_saved_snapshot() {
        let mut surface = surface();
        assert!(surface.contents_changed()); // nothing saved yet
        let contents = surface.serialize().unwrap();
        surface.mark_saved(contents);
        assert!(!surface.contents_changed());
        draw_rectangle(&mut surface);
        assert!(surface.contents_changed());
    }

    #[test]
    fn pointer_hint_follows_tool_and_state() {
        let mut surface = surface();
        assert_eq!(surface.pointer_hint(false), Some(PointerHint::PointingHand));
        surface.tool = Tool::Rectangle;
        assert_eq!(surface.pointer_hint(false), Some(PointerHint::Crosshair));
        surface.tool = Tool::Move;
        assert_eq!(surface.pointer_hint(false), Some(PointerHint::Default));
        draw_rectangle(&mut surface);
        surface.tool = Tool::Move;
        surface.update_grab(60.0, 10.0);
        assert_eq!(surface.pointer_hint(false), Some(PointerHint::MoveOrResize));
    }

    #[test]
    fn smooth_last_only_touches_freehand() {
        let mut surface = surface();
        draw_rectangle(&mut surface);
        let before = surface.elements[0].points.clone();
        surface.smooth_last_element();
        assert_eq!(surface.elements[0].points, before);

        surface.tool = Tool::Free;
        surface.start_drawing(0.0, 0.0, false);
        surface.update_drawing(10.0, 10.0, false);
        surface.update_drawing(4.0, 0.0, false);
        surface.stop_drawing();
        surface.smooth_last_element();
        assert_eq!(surface.elements[1].points[1], Point::new(2.0, 0.0));
    }
}
