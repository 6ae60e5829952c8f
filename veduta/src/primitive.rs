//! Fully resolved vector primitives.
//!
//! This is the only representation the document composer consumes: every attribute is a concrete
//! number, string or color. Anything expression-shaped has been resolved by then.

use color::{AlphaColor, Srgb};

use crate::fonts::FontRequest;

/// A resolved, opaque-or-not color. Stored as 8-bit sRGB plus a separate alpha so it can be
/// emitted as a hex color with an explicit opacity attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    r: u8,
    g: u8,
    b: u8,
    alpha: f64,
}

impl Paint {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            alpha: 1.,
        }
    }

    /// Parse a CSS color string (`#rrggbb`, `rgb(...)`, `hsl(...)`, named colors).
    pub fn parse(css: &str) -> Result<Self, color::ParseError> {
        let parsed: AlphaColor<Srgb> = css.parse()?;
        let rgba = parsed.to_rgba8();
        Ok(Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            alpha: rgba.a as f64 / 255.,
        })
    }

    /// Build from the renderer's color-object shape: `r`/`g`/`b` (and optional `a`) as floats in
    /// the 0..=1 range.
    pub fn from_unit_components(r: f64, g: f64, b: f64, a: f64) -> Self {
        let channel = |value: f64| (value.clamp(0., 1.) * 255.).round() as u8;
        Self {
            r: channel(r),
            g: channel(g),
            b: channel(b),
            alpha: a.clamp(0., 1.),
        }
    }

    /// Hex CSS representation, without the alpha component.
    pub fn css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha of the color itself, to be multiplied into the style's opacity attribute.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

/// One drawable element of the output document, with fully literal attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Polyline(Polyline),
    Polygon(PolygonShape),
    Text(TextRun),
    Circle(CircleMark),
    /// Primitives that must stay registered to each other, e.g. a marker's circle and its
    /// centered label.
    Group(Vec<Primitive>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<(f64, f64)>,
    pub color: Paint,
    pub width: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonShape {
    /// Exterior ring, projected. Holes are out of scope.
    pub exterior: Vec<(f64, f64)>,
    pub fill: Option<Paint>,
    pub fill_opacity: f64,
    pub outline: Option<Paint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub origin: (f64, f64),
    /// Wrapped lines; a single element for single-line labels.
    pub lines: Vec<String>,
    pub font: FontRequest,
    /// Whether an embeddable binary exists for `font`; if not, the output references a generic
    /// system family instead.
    pub font_embedded: bool,
    pub size: f64,
    pub color: Option<Paint>,
    pub opacity: f64,
    pub halo: Option<Halo>,
    pub line_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halo {
    pub color: Paint,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleMark {
    pub center: (f64, f64),
    pub radius: f64,
    pub color: Paint,
    pub opacity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_colors() {
        assert_eq!(Paint::parse("#336699").unwrap(), Paint::new(0x33, 0x66, 0x99));
        assert_eq!(Paint::parse("red").unwrap(), Paint::new(255, 0, 0));
        assert!(Paint::parse("no-such-color").is_err());
    }

    #[test]
    fn rgba_alpha_is_kept_separate() {
        let paint = Paint::parse("rgba(255, 0, 0, 0.5)").unwrap();
        assert_eq!(paint.css(), "#ff0000");
        approx::assert_relative_eq!(paint.alpha(), 0.5, max_relative = 0.01);
    }

    #[test]
    fn unit_components_are_scaled() {
        let paint = Paint::from_unit_components(1., 0.5, 0., 1.);
        assert_eq!(paint.css(), "#ff8000");
    }
}
