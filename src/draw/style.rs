//! Stroke and fill attributes attached to every element.

use super::color::{BLACK, Color};
use serde::{Deserialize, Serialize};

/// Line join rendered at path corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Miter,
    #[default]
    Round,
    Bevel,
}

impl LineJoin {
    pub fn to_cairo(self) -> cairo::LineJoin {
        match self {
            LineJoin::Miter => cairo::LineJoin::Miter,
            LineJoin::Round => cairo::LineJoin::Round,
            LineJoin::Bevel => cairo::LineJoin::Bevel,
        }
    }

    pub fn svg_name(self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
            LineJoin::Bevel => "bevel",
        }
    }
}

/// Line cap rendered at path ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

impl LineCap {
    pub fn to_cairo(self) -> cairo::LineCap {
        match self {
            LineCap::Butt => cairo::LineCap::Butt,
            LineCap::Round => cairo::LineCap::Round,
            LineCap::Square => cairo::LineCap::Square,
        }
    }

    pub fn svg_name(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }
}

/// Fill rule used when a filled path self-intersects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    #[default]
    Nonzero,
    Evenodd,
}

impl FillRule {
    pub fn to_cairo(self) -> cairo::FillRule {
        match self {
            FillRule::Nonzero => cairo::FillRule::Winding,
            FillRule::Evenodd => cairo::FillRule::EvenOdd,
        }
    }

    pub fn svg_name(self) -> &'static str {
        match self {
            FillRule::Nonzero => "nonzero",
            FillRule::Evenodd => "evenodd",
        }
    }
}

/// Stroke geometry: width plus join/cap shapes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStyle {
    pub line_width: f64,
    #[serde(default)]
    pub line_join: LineJoin,
    #[serde(default)]
    pub line_cap: LineCap,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            line_width: 3.0,
            line_join: LineJoin::default(),
            line_cap: LineCap::default(),
        }
    }
}

/// Dash specification. Inactive unless enabled with both segment lengths
/// positive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashPattern {
    pub active: bool,
    pub array: [f64; 2],
    pub offset: f64,
}

impl DashPattern {
    /// True when the pattern should actually be applied to a stroke.
    pub fn is_effective(&self) -> bool {
        self.active && self.array[0] > 0.0 && self.array[1] > 0.0
    }
}

/// Complete paint attributes of one element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub color: Color,
    pub line: LineStyle,
    #[serde(default)]
    pub dash: DashPattern,
    #[serde(default)]
    pub fill: bool,
    #[serde(default)]
    pub fill_rule: FillRule,
    /// Eraser elements paint with the clear operator instead of their color.
    #[serde(default)]
    pub eraser: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: BLACK,
            line: LineStyle::default(),
            dash: DashPattern::default(),
            fill: false,
            fill_rule: FillRule::default(),
            eraser: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_requires_both_lengths() {
        let dash = DashPattern {
            active: true,
            array: [4.0, 0.0],
            offset: 0.0,
        };
        assert!(!dash.is_effective());
        let dash = DashPattern {
            active: true,
            array: [4.0, 12.0],
            offset: 2.0,
        };
        assert!(dash.is_effective());
        let dash = DashPattern {
            active: false,
            array: [4.0, 12.0],
            offset: 0.0,
        };
        assert!(!dash.is_effective());
    }

    #[test]
    fn enum_wire_names_are_lowercase() {
        assert_eq!(serde_json::to_string(&LineJoin::Bevel).unwrap(), "\"bevel\"");
        assert_eq!(serde_json::to_string(&FillRule::Evenodd).unwrap(), "\"evenodd\"");
    }
}
