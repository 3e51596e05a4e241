//! Font selection for text elements.

use serde::{Deserialize, Serialize};

/// Generic family names selectable instead of a concrete installed font.
/// The pseudo-family "theme" means "inherit the theme font" and is resolved
/// to a concrete family by the surface before an element is created.
pub const GENERIC_FAMILIES: [&str; 5] = ["Sans-Serif", "Serif", "Monospace", "Cursive", "Fantasy"];

/// SVG has no weight above 900, so heavier Pango weights are clamped.
pub const MAX_FONT_WEIGHT: u16 = 900;

/// Font slant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSlant {
    #[default]
    Normal,
    Oblique,
    Italic,
}

impl FontSlant {
    fn pango_keyword(self) -> Option<&'static str> {
        match self {
            FontSlant::Normal => None,
            FontSlant::Oblique => Some("Oblique"),
            FontSlant::Italic => Some("Italic"),
        }
    }

    pub fn svg_name(self) -> &'static str {
        match self {
            FontSlant::Normal => "normal",
            FontSlant::Oblique => "oblique",
            FontSlant::Italic => "italic",
        }
    }
}

/// Horizontal font stretch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

impl FontStretch {
    fn pango_keyword(self) -> Option<&'static str> {
        match self {
            FontStretch::UltraCondensed => Some("Ultra-Condensed"),
            FontStretch::ExtraCondensed => Some("Extra-Condensed"),
            FontStretch::Condensed => Some("Condensed"),
            FontStretch::SemiCondensed => Some("Semi-Condensed"),
            FontStretch::Normal => None,
            FontStretch::SemiExpanded => Some("Semi-Expanded"),
            FontStretch::Expanded => Some("Expanded"),
            FontStretch::ExtraExpanded => Some("Extra-Expanded"),
            FontStretch::UltraExpanded => Some("Ultra-Expanded"),
        }
    }

    pub fn svg_name(self) -> &'static str {
        match self {
            FontStretch::UltraCondensed => "ultra-condensed",
            FontStretch::ExtraCondensed => "extra-condensed",
            FontStretch::Condensed => "condensed",
            FontStretch::SemiCondensed => "semi-condensed",
            FontStretch::Normal => "normal",
            FontStretch::SemiExpanded => "semi-expanded",
            FontStretch::Expanded => "expanded",
            FontStretch::ExtraExpanded => "extra-expanded",
            FontStretch::UltraExpanded => "ultra-expanded",
        }
    }
}

/// Font variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontVariant {
    #[default]
    Normal,
    SmallCaps,
}

/// Font configuration carried by text elements.
///
/// The family is a concrete name (installed font or one of
/// [`GENERIC_FAMILIES`]); the weight is numeric so intermediate weights
/// survive a round trip through the drawing file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16,
    #[serde(rename = "style", default)]
    pub slant: FontSlant,
    #[serde(default)]
    pub stretch: FontStretch,
    #[serde(default)]
    pub variant: FontVariant,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Sans-Serif".to_string(),
            weight: 400,
            slant: FontSlant::default(),
            stretch: FontStretch::default(),
            variant: FontVariant::default(),
        }
    }
}

impl FontSpec {
    /// Clamps the weight to the range expressible in SVG.
    pub fn clamped(mut self) -> Self {
        self.weight = self.weight.min(MAX_FONT_WEIGHT);
        self
    }

    fn weight_keyword(&self) -> Option<&'static str> {
        match self.weight {
            100 => Some("Thin"),
            200 => Some("Ultra-Light"),
            300 => Some("Light"),
            350 => Some("Semi-Light"),
            500 => Some("Medium"),
            600 => Some("Semi-Bold"),
            700 => Some("Bold"),
            800 => Some("Ultra-Bold"),
            900 => Some("Heavy"),
            _ => None,
        }
    }

    /// Builds a Pango font description with an absolute pixel size.
    ///
    /// Family, slant, stretch, weight and variant are assembled into a
    /// description string ("Serif Italic Bold" and the like); the size is set
    /// afterwards in device units so text height tracks the element's anchor
    /// points instead of the output DPI.
    pub fn to_pango_description(&self, pixel_size: f64) -> pango::FontDescription {
        let mut parts = vec![self.family.clone()];
        if let Some(slant) = self.slant.pango_keyword() {
            parts.push(slant.to_string());
        }
        if let Some(stretch) = self.stretch.pango_keyword() {
            parts.push(stretch.to_string());
        }
        if let Some(weight) = self.weight_keyword() {
            parts.push(weight.to_string());
        }
        if self.variant == FontVariant::SmallCaps {
            parts.push("Small-Caps".to_string());
        }

        let mut description = pango::FontDescription::from_string(&parts.join(" "));
        description.set_absolute_size(pixel_size.max(0.0) * pango::SCALE as f64);
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_is_plain_sans() {
        let spec = FontSpec::default();
        assert_eq!(spec.family, "Sans-Serif");
        assert_eq!(spec.weight, 400);
        assert_eq!(spec.slant, FontSlant::Normal);
    }

    #[test]
    fn clamped_caps_ultra_heavy() {
        let spec = FontSpec {
            weight: 1000,
            ..FontSpec::default()
        };
        assert_eq!(spec.clamped().weight, MAX_FONT_WEIGHT);
    }

    #[test]
    fn weight_keywords_cover_named_steps() {
        let spec = FontSpec {
            weight: 700,
            ..FontSpec::default()
        };
        assert_eq!(spec.weight_keyword(), Some("Bold"));
        let spec = FontSpec {
            weight: 400,
            ..FontSpec::default()
        };
        assert_eq!(spec.weight_keyword(), None);
    }
}
