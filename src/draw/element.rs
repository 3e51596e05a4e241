//! The drawing element model.
//!
//! An [`Element`] is one persisted vector shape: its kind, its points (whose
//! count and meaning depend on the kind), paint attributes, an ordered
//! transform chain, and text/font data for text shapes. Elements are built
//! interactively through the drawing lifecycle and mutated afterwards only
//! through transform gestures or smoothing.

use super::font::FontSpec;
use super::style::Style;
use super::transform::{
    MIN_ROTATION_ANGLE, Transform, TransformKind, TransformOp, pivot_matrix,
};
use crate::util::{Point, centroid, curve_center, is_near, naive_center, signed_angle};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, OnceCell};

/// Marks below this size (in px) are dropped as accidental.
pub const MIN_DRAWING_SIZE: f64 = 3.0;

/// Shape kind of a drawing element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Freehand curve through every pointer sample.
    Free,
    /// Straight segment, or a quadratic/cubic curve once control points are
    /// promoted (2–4 points).
    Line,
    /// Center + radius point, with an optional third point setting the
    /// horizontal/vertical ratio.
    Ellipse,
    /// Two opposite corners.
    Rectangle,
    /// Two anchor points spanning the line height.
    Text,
    Polygon,
    Polyline,
}

impl ShapeKind {
    /// Fewest points a committed element of this kind may carry.
    pub fn min_points(self) -> usize {
        match self {
            ShapeKind::Polygon => 3,
            _ => 2,
        }
    }
}

/// Text payload of a text element.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub font: FontSpec,
    pub right_aligned: bool,
    /// Caret position in characters while writing; `None` means end.
    pub cursor_position: Option<usize>,
    /// Groups stacked lines sharing one rotation pivot; the first line of a
    /// group is 0 and standalone text carries no index at all.
    pub line_index: Option<u32>,
}

impl TextBlock {
    pub fn new(font: FontSpec, right_aligned: bool) -> Self {
        Self {
            text: String::new(),
            font,
            right_aligned,
            cursor_position: None,
            line_index: None,
        }
    }
}

/// One drawing element.
#[derive(Clone, Debug)]
pub struct Element {
    pub shape: ShapeKind,
    pub points: Vec<Point>,
    pub style: Style,
    pub transformations: Vec<Transform>,
    pub text: Option<TextBlock>,
    // Original (untransformed) pivot, derived from geometry on first use.
    original_pivot: OnceCell<Point>,
    // Width measured by the text layout engine, shared by hit-testing,
    // caret placement and SVG export.
    text_width: Cell<Option<f64>>,
}

impl Element {
    pub fn new(shape: ShapeKind, style: Style) -> Self {
        Self {
            shape,
            points: Vec::new(),
            style,
            transformations: Vec::new(),
            text: None,
            original_pivot: OnceCell::new(),
            text_width: Cell::new(None),
        }
    }

    pub fn with_text(mut self, text: TextBlock) -> Self {
        self.text = Some(text);
        self
    }

    /// Rebuilds an element from persisted parts.
    pub(crate) fn from_parts(
        shape: ShapeKind,
        points: Vec<Point>,
        style: Style,
        transformations: Vec<Transform>,
        text: Option<TextBlock>,
    ) -> Self {
        Self {
            shape,
            points,
            style,
            transformations,
            text,
            original_pivot: OnceCell::new(),
            text_width: Cell::new(None),
        }
    }

    /// A 2-point line is a straight segment: it is never filled or closed.
    pub fn is_straight_line(&self) -> bool {
        self.shape == ShapeKind::Line && self.points.len() == 2
    }

    /// Height of one text line (the vertical span of the anchor points).
    pub fn line_height(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        (self.points[1].y - self.points[0].y).abs()
    }

    /// Vertical offset of this line within a stacked text group, used to
    /// share the first line's rotation pivot.
    fn line_offset(&self) -> f64 {
        let index = self
            .text
            .as_ref()
            .and_then(|block| block.line_index)
            .unwrap_or(0);
        index as f64 * self.line_height()
    }

    pub fn text_width(&self) -> Option<f64> {
        self.text_width.get()
    }

    pub(crate) fn set_text_width(&self, width: f64) {
        self.text_width.set(Some(width));
    }

    // ------------------------------------------------------------------
    // Drawing lifecycle
    // ------------------------------------------------------------------

    /// Starts the drawing gesture at the pointer. Kinds built vertex by
    /// vertex start with a doubled point so the first drag moves a live
    /// vertex instead of creating one.
    pub fn start_drawing(&mut self, x: f64, y: f64) {
        let start = Point::new(x, y);
        self.points.push(start);
        if matches!(self.shape, ShapeKind::Polygon | ShapeKind::Polyline) {
            self.points.push(start);
        }
    }

    /// Feeds a pointer sample into the active drawing gesture.
    ///
    /// With `constrain` (a modifier key), closed shapes rotate about their
    /// pivot instead of resizing, freehand sampling smooths, and text slides
    /// as a whole. Once a rotation has been snapped in it stays in charge
    /// even after the modifier is released.
    pub fn update_drawing(&mut self, x: f64, y: f64, constrain: bool) {
        let pointer = Point::new(x, y);
        let Some(&last) = self.points.last() else {
            return;
        };
        if pointer == last {
            return;
        }
        let constrain = constrain || !self.transformations.is_empty();

        match self.shape {
            ShapeKind::Free => {
                self.points.push(pointer);
                if constrain {
                    self.smooth_at(self.points.len() - 1);
                }
            }
            ShapeKind::Rectangle | ShapeKind::Polygon | ShapeKind::Polyline if constrain => {
                if self.points.len() < 2 {
                    return;
                }
                let pivot = self.original_pivot();
                let angle = signed_angle(pivot, last, pointer);
                self.set_snap_rotation(angle);
            }
            ShapeKind::Ellipse if constrain => {
                if self.points.len() < 2 {
                    return;
                }
                if self.points.len() == 2 {
                    self.points.push(pointer);
                } else {
                    self.points[2] = pointer;
                }
                let pivot = self.original_pivot();
                let reference = Point::new(pivot.x + 1.0, pivot.y);
                let angle = signed_angle(pivot, reference, pointer);
                self.set_snap_rotation(angle);
            }
            ShapeKind::Polygon | ShapeKind::Polyline => {
                let index = self.points.len() - 1;
                self.points[index] = pointer;
            }
            ShapeKind::Text if constrain => {
                if self.points.len() < 2 {
                    return;
                }
                let slide_x = x - self.points[1].x;
                let slide_y = y - self.points[1].y;
                self.points[0] = Point::new(self.points[0].x + slide_x, self.points[0].y + slide_y);
                self.points[1] = pointer;
            }
            _ => {
                if self.points.len() < 2 {
                    self.points.push(pointer);
                } else {
                    self.points[1] = pointer;
                }
            }
        }
    }

    /// Marks the next vertex (polygon/polyline) or promotes a line to its
    /// next control-point count (2→3→4: straight → quadratic-look → cubic).
    pub fn add_point(&mut self) {
        match self.shape {
            ShapeKind::Polygon | ShapeKind::Polyline => {
                let count = self.points.len();
                if count < 2 {
                    return;
                }
                let last = self.points[count - 1];
                if !is_near(self.points[count - 2], last, MIN_DRAWING_SIZE) {
                    self.points.push(last);
                }
            }
            ShapeKind::Line => {
                if self.points.len() == 2 {
                    self.points.push(self.points[1]);
                } else if self.points.len() == 3 {
                    self.points.push(self.points[2]);
                    self.points[2] = self.points[1];
                }
            }
            _ => {}
        }
    }

    /// Ends the drawing gesture. A trailing point within [`MIN_DRAWING_SIZE`]
    /// of its predecessor is dropped (freehand keeps every sample), and a
    /// below-threshold snapped-in rotation is removed. Returns false when the
    /// result is too small to keep and should be discarded.
    pub fn stop_drawing(&mut self) -> bool {
        if self.shape != ShapeKind::Free && self.points.len() >= 2 {
            let last = self.points[self.points.len() - 1];
            let previous = self.points[self.points.len() - 2];
            if is_near(previous, last, MIN_DRAWING_SIZE) {
                if self.points.len() > self.shape.min_points() {
                    self.points.pop();
                } else {
                    return false;
                }
            }
        }

        if let Some(first) = self.transformations.first() {
            if let TransformOp::Rotation { angle } = first.op {
                if angle.abs() < MIN_ROTATION_ANGLE {
                    self.transformations.remove(0);
                }
            }
        }

        self.points.len() >= self.shape.min_points()
    }

    /// Applies the 3-point rolling average to the whole stroke, as a post-hoc
    /// cleanup of a committed freehand element.
    pub fn smooth_all(&mut self) {
        for i in 0..self.points.len() {
            self.smooth_at(i);
        }
    }

    fn smooth_at(&mut self, i: usize) {
        if i < 2 {
            return;
        }
        self.points[i - 1] = Point::new(
            (self.points[i - 2].x + self.points[i].x) / 2.0,
            (self.points[i - 2].y + self.points[i].y) / 2.0,
        );
    }

    // While drawing, a constrained drag drives a single rotation in the
    // innermost slot.
    fn set_snap_rotation(&mut self, angle: f64) {
        let rotation = Transform::from(TransformOp::Rotation { angle });
        if self.transformations.is_empty() {
            self.transformations.push(rotation);
        } else {
            self.transformations[0] = rotation;
        }
    }

    // ------------------------------------------------------------------
    // Transform gestures
    // ------------------------------------------------------------------

    /// Pushes a new zero-effect transform of the given kind onto the chain.
    pub fn start_transformation(&mut self, x: f64, y: f64, kind: TransformKind) {
        self.transformations
            .push(Transform::begin(kind, Point::new(x, y)));
    }

    /// Updates the in-progress (last) transform from the pointer position.
    /// No-op when the element has too few points to transform meaningfully
    /// or nothing is in progress.
    pub fn update_transformation(&mut self, x: f64, y: f64) {
        if self.points.len() < 2 || self.transformations.is_empty() {
            return;
        }
        let index = self.transformations.len() - 1;
        let pivot = self.transform_pivot(index);
        if let Some(transform) = self.transformations.last_mut() {
            transform.update(Point::new(x, y), pivot);
        }
    }

    /// Commits the in-progress transform, or removes it entirely when its
    /// effect stayed below the kind's minimum threshold.
    pub fn stop_transformation(&mut self) {
        let Some(transform) = self.transformations.last_mut() else {
            return;
        };
        if !transform.finish() {
            self.transformations.pop();
        }
    }

    /// Drops the in-progress transform without committing it (modifier
    /// toggling and gesture cancellation).
    pub fn abort_transformation(&mut self) {
        if self
            .transformations
            .last()
            .is_some_and(|transform| !transform.is_committed())
        {
            self.transformations.pop();
        }
    }

    pub fn last_transformation(&self) -> Option<&Transform> {
        self.transformations.last()
    }

    // ------------------------------------------------------------------
    // Pivots
    // ------------------------------------------------------------------

    /// The element's pivot before any transformation, derived from its
    /// geometry: ellipse center, curve midpoint for cubic lines, the text
    /// anchor (shifted to the group's first line), the polygon centroid, or
    /// the plain vertex mean.
    pub fn original_pivot(&self) -> Point {
        *self.original_pivot.get_or_init(|| {
            let points = &self.points;
            match self.shape {
                ShapeKind::Ellipse if !points.is_empty() => points[0],
                ShapeKind::Line if points.len() == 4 => {
                    curve_center(points[0], points[1], points[2], points[3])
                }
                ShapeKind::Line if points.len() == 3 => {
                    curve_center(points[0], points[0], points[1], points[2])
                }
                ShapeKind::Text if points.len() >= 2 && self.text_width.get().is_some() => {
                    Point::new(
                        points[1].x,
                        points[0].y.max(points[1].y) - self.line_offset(),
                    )
                }
                _ if points.len() >= 3 => centroid(points),
                _ => naive_center(points),
            }
        })
    }

    /// Pivot as seen by chain entry `index`: the original pivot mapped
    /// through every transform before it. Cached on the entry.
    pub fn transform_pivot(&self, index: usize) -> Point {
        let original = self.original_pivot();
        let (preceding, rest) = self.transformations.split_at(index);
        match rest.first() {
            Some(transform) => transform.pivot_under(preceding, original),
            None => {
                let (x, y) = pivot_matrix(preceding).transform_point(original.x, original.y);
                Point::new(x, y)
            }
        }
    }
}
