//! Composable affine transforms attached to drawing elements.
//!
//! An element carries an ordered chain of transforms: index 0 is the
//! innermost (first applied to the raw geometry) and appended entries
//! compose outside the existing ones. Renderers therefore iterate the chain
//! back-to-front when issuing operations. A transform being interactively
//! dragged keeps its start/end pointer coordinates; committing strips them
//! and only the derived parameters survive.

use crate::util::{Point, is_near, signed_angle};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::f64::consts::{FRAC_PI_2, PI};

/// Pixel tolerance for snapping a reflection axis to horizontal/vertical.
pub const REFLECTION_TOLERANCE: f64 = 5.0;
/// Angular tolerance for snapping a stretch axis to horizontal/vertical.
pub const STRETCH_TOLERANCE: f64 = PI / 8.0;
/// Reflections spanning less than this are treated as aborted gestures.
pub const MIN_REFLECTION_LINE_LENGTH: f64 = 10.0;
/// Translations shorter than this are treated as aborted gestures.
pub const MIN_TRANSLATION_DISTANCE: f64 = 1.0;
/// Rotations smaller than this are treated as aborted gestures.
pub const MIN_ROTATION_ANGLE: f64 = PI / 1000.0;
/// Radius of the symmetry-guide circle shown while defining an inversion.
pub const INVERSION_CIRCLE_RADIUS: f64 = 12.0;

/// The six transform kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    Translation,
    Rotation,
    /// Isotropic scale about the pivot.
    Scale,
    /// Independent scale factors along an (axis-snapped) axis.
    Stretch,
    /// Mirror across a line.
    Reflection,
    /// 180° point reflection.
    Inversion,
}

/// Committed parameters of a transform — the only part that persists.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransformOp {
    Translation {
        slide_x: f64,
        slide_y: f64,
    },
    /// Angle is pivot-relative; the pivot is derived from the element
    /// geometry at render time.
    Rotation {
        angle: f64,
    },
    Scale {
        scale_x: f64,
        scale_y: f64,
        angle: f64,
    },
    Stretch {
        scale_x: f64,
        scale_y: f64,
        angle: f64,
    },
    Reflection {
        slide_x: f64,
        slide_y: f64,
        scale_x: f64,
        scale_y: f64,
        angle: f64,
    },
    Inversion {
        slide_x: f64,
        slide_y: f64,
        scale_x: f64,
        scale_y: f64,
        angle: f64,
    },
}

/// Transient pointer coordinates of an in-progress gesture.
#[derive(Clone, Copy, Debug)]
struct Drag {
    start: Point,
    end: Point,
}

/// The visual guide shown while a mirror gesture is being defined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SymmetryGuide {
    /// Reflection axis from the gesture start to the current pointer.
    Axis { start: Point, end: Point },
    /// Inversion center at the current pointer.
    Center(Point),
}

/// One entry of an element's transform chain.
///
/// Serialization goes through [`TransformOp`], so drag state and the pivot
/// cache never reach the drawing file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "TransformOp", into = "TransformOp")]
pub struct Transform {
    pub op: TransformOp,
    drag: Option<Drag>,
    // Pivot under the transforms preceding this one. Those entries are
    // immutable once this transform exists, so the value never goes stale.
    pivot: OnceCell<Point>,
}

impl From<TransformOp> for Transform {
    fn from(op: TransformOp) -> Self {
        Self {
            op,
            drag: None,
            pivot: OnceCell::new(),
        }
    }
}

impl From<Transform> for TransformOp {
    fn from(transform: Transform) -> Self {
        transform.op
    }
}

impl Transform {
    /// Starts a zero-effect transform of the given kind at the pointer.
    pub fn begin(kind: TransformKind, start: Point) -> Self {
        let op = match kind {
            TransformKind::Translation => TransformOp::Translation {
                slide_x: 0.0,
                slide_y: 0.0,
            },
            TransformKind::Rotation => TransformOp::Rotation { angle: 0.0 },
            TransformKind::Scale => TransformOp::Scale {
                scale_x: 1.0,
                scale_y: 1.0,
                angle: 0.0,
            },
            TransformKind::Stretch => TransformOp::Stretch {
                scale_x: 1.0,
                scale_y: 1.0,
                angle: 0.0,
            },
            TransformKind::Reflection => TransformOp::Reflection {
                slide_x: 0.0,
                slide_y: 0.0,
                scale_x: 1.0,
                scale_y: 1.0,
                angle: 0.0,
            },
            TransformKind::Inversion => TransformOp::Inversion {
                slide_x: start.x,
                slide_y: start.y,
                scale_x: -1.0,
                scale_y: -1.0,
                angle: PI + (start.y / nonzero(start.x)).atan(),
            },
        };
        Self {
            op,
            drag: Some(Drag { start, end: start }),
            pivot: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> TransformKind {
        match self.op {
            TransformOp::Translation { .. } => TransformKind::Translation,
            TransformOp::Rotation { .. } => TransformKind::Rotation,
            TransformOp::Scale { .. } => TransformKind::Scale,
            TransformOp::Stretch { .. } => TransformKind::Stretch,
            TransformOp::Reflection { .. } => TransformKind::Reflection,
            TransformOp::Inversion { .. } => TransformKind::Inversion,
        }
    }

    /// True once the gesture has been committed and the transient pointer
    /// coordinates dropped.
    pub fn is_committed(&self) -> bool {
        self.drag.is_none()
    }

    /// Recomputes the derived parameters from the live pointer position.
    ///
    /// `pivot` is the element pivot as seen by this transform (mapped through
    /// the preceding chain entries); it only matters for the pivot-relative
    /// kinds. No-op on a committed transform.
    pub fn update(&mut self, pointer: Point, pivot: Point) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        drag.end = pointer;
        let start = drag.start;

        match &mut self.op {
            TransformOp::Translation { slide_x, slide_y } => {
                *slide_x = pointer.x - start.x;
                *slide_y = pointer.y - start.y;
            }
            TransformOp::Rotation { angle } => {
                *angle = signed_angle(pivot, start, pointer);
            }
            TransformOp::Scale { scale_x, scale_y, .. } => {
                let scale = scale_ratio(pivot, start, pointer);
                *scale_x = scale;
                *scale_y = scale;
            }
            TransformOp::Stretch {
                scale_x,
                scale_y,
                angle,
            } => {
                let horizontal_ref = Point::new(pivot.x + 1.0, pivot.y);
                let start_angle = signed_angle(pivot, horizontal_ref, start);
                let vertical = start_angle.sin().abs() >= (FRAC_PI_2 - STRETCH_TOLERANCE).sin();
                let horizontal = start_angle.cos().abs() >= STRETCH_TOLERANCE.cos();
                let scale = scale_ratio(pivot, start, pointer);
                *scale_x = if vertical { 1.0 } else { scale };
                *scale_y = if vertical { scale } else { 1.0 };
                *angle = if vertical || horizontal {
                    0.0
                } else {
                    signed_angle(pivot, horizontal_ref, pointer)
                };
            }
            TransformOp::Reflection {
                slide_x,
                slide_y,
                scale_x,
                scale_y,
                angle,
            } => {
                if is_near(start, pointer, MIN_REFLECTION_LINE_LENGTH) {
                    // Hold at identity near the anchor: no jump at gesture
                    // start, and the committed line stays meaningful.
                } else if (pointer.y - start.y).abs() <= REFLECTION_TOLERANCE
                    && (pointer.x - start.x).abs() > REFLECTION_TOLERANCE
                {
                    // Horizontal mirror line
                    (*scale_x, *scale_y) = (1.0, -1.0);
                    (*slide_x, *slide_y) = (0.0, start.y);
                    *angle = PI;
                } else if (pointer.x - start.x).abs() <= REFLECTION_TOLERANCE
                    && (pointer.y - start.y).abs() > REFLECTION_TOLERANCE
                {
                    // Vertical mirror line
                    (*scale_x, *scale_y) = (-1.0, 1.0);
                    (*slide_x, *slide_y) = (start.x, 0.0);
                    *angle = PI;
                } else if pointer.x != start.x {
                    let tan = (pointer.y - start.y) / (pointer.x - start.x);
                    (*scale_x, *scale_y) = (1.0, -1.0);
                    (*slide_x, *slide_y) = (0.0, start.y - start.x * tan);
                    *angle = PI + tan.atan();
                } else if pointer.y != start.y {
                    let tan = (pointer.x - start.x) / (pointer.y - start.y);
                    (*scale_x, *scale_y) = (-1.0, 1.0);
                    (*slide_x, *slide_y) = (start.x - start.y * tan, 0.0);
                    *angle = PI - tan.atan();
                }
            }
            TransformOp::Inversion {
                slide_x,
                slide_y,
                scale_x,
                scale_y,
                angle,
            } => {
                (*scale_x, *scale_y) = (-1.0, -1.0);
                (*slide_x, *slide_y) = (pointer.x, pointer.y);
                *angle = PI + (pointer.y / nonzero(pointer.x)).atan();
            }
        }
    }

    /// Ends the gesture. Returns false when the accumulated effect is below
    /// the kind's minimum threshold and the whole transform should be
    /// discarded as a no-op; otherwise the transient coordinates are stripped
    /// and the transform is committed.
    pub fn finish(&mut self) -> bool {
        let Some(drag) = self.drag.take() else {
            return true;
        };
        let discard = match self.op {
            TransformOp::Reflection { .. } => {
                is_near(drag.start, drag.end, MIN_REFLECTION_LINE_LENGTH)
            }
            TransformOp::Translation { slide_x, slide_y } => {
                slide_x.hypot(slide_y) < MIN_TRANSLATION_DISTANCE
            }
            TransformOp::Rotation { angle } => angle.abs() < MIN_ROTATION_ANGLE,
            _ => false,
        };
        !discard
    }

    /// The symmetry guide to draw while a mirror gesture is in progress.
    pub fn guide(&self) -> Option<SymmetryGuide> {
        let drag = self.drag?;
        match self.kind() {
            TransformKind::Reflection => Some(SymmetryGuide::Axis {
                start: drag.start,
                end: drag.end,
            }),
            TransformKind::Inversion => Some(SymmetryGuide::Center(drag.end)),
            _ => None,
        }
    }

    /// Pivot as seen by this transform, computing and caching it on first
    /// use. `preceding` must be the chain entries before this one.
    pub(crate) fn pivot_under(&self, preceding: &[Transform], original: Point) -> Point {
        *self.pivot.get_or_init(|| {
            let (x, y) = pivot_matrix(preceding).transform_point(original.x, original.y);
            Point::new(x, y)
        })
    }
}

/// Matrix mapping the element's original pivot through a chain prefix.
///
/// Iterated back-to-front like the renderers. Rotation and scaling are
/// pivot-centered and leave the pivot fixed by construction, so only
/// translations and mirror conjugations contribute.
pub(crate) fn pivot_matrix(preceding: &[Transform]) -> cairo::Matrix {
    let mut matrix = cairo::Matrix::identity();
    for transform in preceding.iter().rev() {
        match transform.op {
            TransformOp::Translation { slide_x, slide_y } => {
                matrix.translate(slide_x, slide_y);
            }
            TransformOp::Rotation { .. }
            | TransformOp::Scale { .. }
            | TransformOp::Stretch { .. } => {}
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
                matrix.translate(slide_x, slide_y);
                matrix.rotate(angle);
                matrix.scale(scale_x, scale_y);
                matrix.rotate(-angle);
                matrix.translate(-slide_x, -slide_y);
            }
        }
    }
    matrix
}

/// |pivot→pointer| / |pivot→start|, guarded to 1 when degenerate.
fn scale_ratio(pivot: Point, start: Point, pointer: Point) -> f64 {
    let scale = pivot.distance_to(pointer) / pivot.distance_to(start);
    if scale.is_finite() && scale != 0.0 { scale } else { 1.0 }
}

fn nonzero(value: f64) -> f64 {
    if value == 0.0 { 1.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed_translation(slide_x: f64, slide_y: f64) -> Transform {
        Transform::from(TransformOp::Translation { slide_x, slide_y })
    }

    #[test]
    fn horizontal_drag_snaps_to_horizontal_mirror() {
        let mut reflection = Transform::begin(TransformKind::Reflection, Point::new(0.0, 0.0));
        reflection.update(Point::new(100.0, 0.0), Point::default());
        assert_eq!(
            reflection.op,
            TransformOp::Reflection {
                slide_x: 0.0,
                slide_y: 0.0,
                scale_x: 1.0,
                scale_y: -1.0,
                angle: PI,
            }
        );
    }

    #[test]
    fn vertical_drag_snaps_to_vertical_mirror() {
        let mut reflection = Transform::begin(TransformKind::Reflection, Point::new(40.0, 10.0));
        reflection.update(Point::new(42.0, 90.0), Point::default());
        let TransformOp::Reflection {
            slide_x,
            slide_y,
            scale_x,
            scale_y,
            angle,
        } = reflection.op
        else {
            panic!("kind changed");
        };
        assert_eq!((scale_x, scale_y), (-1.0, 1.0));
        assert_eq!((slide_x, slide_y), (40.0, 0.0));
        assert_eq!(angle, PI);
    }

    #[test]
    fn reflection_holds_identity_inside_dead_zone() {
        let mut reflection = Transform::begin(TransformKind::Reflection, Point::new(0.0, 0.0));
        reflection.update(Point::new(4.0, 4.0), Point::default());
        assert_eq!(
            reflection.op,
            TransformOp::Reflection {
                slide_x: 0.0,
                slide_y: 0.0,
                scale_x: 1.0,
                scale_y: 1.0,
                angle: 0.0,
            }
        );
    }

    #[test]
    fn oblique_reflection_derives_line_parameters() {
        let mut reflection = Transform::begin(TransformKind::Reflection, Point::new(0.0, 0.0));
        reflection.update(Point::new(20.0, 20.0), Point::default());
        let TransformOp::Reflection {
            slide_y,
            scale_x,
            scale_y,
            angle,
            ..
        } = reflection.op
        else {
            panic!("kind changed");
        };
        assert_eq!((scale_x, scale_y), (1.0, -1.0));
        assert_eq!(slide_y, 0.0);
        assert!((angle - (PI + 1.0_f64.atan())).abs() < 1e-9);
    }

    #[test]
    fn short_reflection_is_discarded_on_finish() {
        let mut reflection = Transform::begin(TransformKind::Reflection, Point::new(0.0, 0.0));
        reflection.update(Point::new(6.0, 0.0), Point::default());
        assert!(!reflection.finish());
    }

    #[test]
    fn short_translation_is_discarded_on_finish() {
        let mut translation = Transform::begin(TransformKind::Translation, Point::new(5.0, 5.0));
        translation.update(Point::new(5.4, 5.3), Point::default());
        assert!(!translation.finish());

        let mut translation = Transform::begin(TransformKind::Translation, Point::new(5.0, 5.0));
        translation.update(Point::new(9.0, 5.0), Point::default());
        assert!(translation.finish());
        assert!(translation.is_committed());
    }

    #[test]
    fn tiny_rotation_is_discarded_on_finish() {
        let pivot = Point::new(0.0, 0.0);
        let mut rotation = Transform::begin(TransformKind::Rotation, Point::new(100.0, 0.0));
        rotation.update(Point::new(100.0, 0.01), pivot);
        assert!(!rotation.finish());
    }

    #[test]
    fn scale_ratio_guards_degenerate_gestures() {
        let pivot = Point::new(0.0, 0.0);
        let mut scale = Transform::begin(TransformKind::Scale, pivot);
        scale.update(Point::new(10.0, 0.0), pivot);
        assert_eq!(
            scale.op,
            TransformOp::Scale {
                scale_x: 1.0,
                scale_y: 1.0,
                angle: 0.0
            }
        );
    }

    #[test]
    fn stretch_snaps_axis_inside_tolerance() {
        let pivot = Point::new(0.0, 0.0);
        // Start ray 10° off horizontal: inside the π/8 (22.5°) band.
        let start = Point::new(100.0, 100.0 * 10.0_f64.to_radians().tan());
        let mut stretch = Transform::begin(TransformKind::Stretch, start);
        stretch.update(Point::new(start.x * 2.0, start.y * 2.0), pivot);
        let TransformOp::Stretch {
            scale_x,
            scale_y,
            angle,
        } = stretch.op
        else {
            panic!("kind changed");
        };
        assert!((scale_x - 2.0).abs() < 1e-9);
        assert_eq!(scale_y, 1.0);
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn stretch_oblique_keeps_axis_angle() {
        let pivot = Point::new(0.0, 0.0);
        // 45° is outside both snap bands.
        let start = Point::new(100.0, 100.0);
        let mut stretch = Transform::begin(TransformKind::Stretch, start);
        stretch.update(Point::new(150.0, 150.0), pivot);
        let TransformOp::Stretch { angle, .. } = stretch.op else {
            panic!("kind changed");
        };
        assert!((angle - signed_angle(pivot, Point::new(1.0, 0.0), Point::new(150.0, 150.0))).abs() < 1e-9);
    }

    #[test]
    fn inversion_anchors_at_pointer() {
        let mut inversion = Transform::begin(TransformKind::Inversion, Point::new(10.0, 20.0));
        inversion.update(Point::new(30.0, 40.0), Point::default());
        let TransformOp::Inversion {
            slide_x,
            slide_y,
            scale_x,
            scale_y,
            ..
        } = inversion.op
        else {
            panic!("kind changed");
        };
        assert_eq!((slide_x, slide_y), (30.0, 40.0));
        assert_eq!((scale_x, scale_y), (-1.0, -1.0));
    }

    #[test]
    fn pivot_maps_through_preceding_translations() {
        let chain = [committed_translation(10.0, 0.0), committed_translation(0.0, 5.0)];
        let probe = Transform::from(TransformOp::Rotation { angle: 0.3 });
        let pivot = probe.pivot_under(&chain, Point::new(1.0, 2.0));
        assert_eq!(pivot, Point::new(11.0, 7.0));
    }

    #[test]
    fn pivot_ignores_rotation_and_scaling_entries() {
        let chain = [
            Transform::from(TransformOp::Rotation { angle: 1.0 }),
            Transform::from(TransformOp::Scale {
                scale_x: 2.0,
                scale_y: 2.0,
                angle: 0.0,
            }),
        ];
        let probe = Transform::from(TransformOp::Rotation { angle: 0.0 });
        assert_eq!(probe.pivot_under(&chain, Point::new(3.0, 4.0)), Point::new(3.0, 4.0));
    }

    #[test]
    fn pivot_maps_through_point_reflection() {
        // Inversion about (5, 5): p ↦ 2c − p.
        let inversion = Transform::from(TransformOp::Inversion {
            slide_x: 5.0,
            slide_y: 5.0,
            scale_x: -1.0,
            scale_y: -1.0,
            angle: PI,
        });
        let probe = Transform::from(TransformOp::Rotation { angle: 0.0 });
        let pivot = probe.pivot_under(std::slice::from_ref(&inversion), Point::new(1.0, 2.0));
        assert!((pivot.x - 9.0).abs() < 1e-9);
        assert!((pivot.y - 8.0).abs() < 1e-9);
    }

    #[test]
    fn pivot_is_cached_per_entry() {
        let chain = [committed_translation(3.0, 3.0)];
        let probe = Transform::from(TransformOp::Rotation { angle: 0.0 });
        let first = probe.pivot_under(&chain, Point::new(0.0, 0.0));
        let second = probe.pivot_under(&chain, Point::new(100.0, 100.0));
        // Second call hits the cache; the preceding chain is immutable.
        assert_eq!(first, second);
    }

    #[test]
    fn committed_round_trip_drops_transient_state() {
        let mut reflection = Transform::begin(TransformKind::Reflection, Point::new(0.0, 0.0));
        reflection.update(Point::new(100.0, 0.0), Point::default());
        assert!(reflection.finish());
        let json = serde_json::to_string(&reflection).unwrap();
        assert!(json.contains("\"type\":\"reflection\""));
        assert!(!json.contains("start"));
        let back: Transform = serde_json::from_str(&json).unwrap();
        assert_eq!(back.op, reflection.op);
        assert!(back.is_committed());
    }
}
