//! Convert visible features into resolved vector primitives.
//!
//! One feature becomes zero or more primitives. Zero is a first-class outcome: lines without a
//! resolvable color, fully transparent fills and bare unstyled points are intentionally
//! invisible, exactly like in the live view. Every numeric, string and color attribute is
//! resolved through the expression evaluator so zoom-dependent styling applies uniformly.

use crate::classify::Bucket;
use crate::diagnostics::{Diagnostics, Stage};
use crate::expression::{
    resolve_color, resolve_number, resolve_opt_number, resolve_string, resolve_string_list,
    EvalContext,
};
use crate::feature::VisibleFeature;
use crate::fonts::FontResolver;
use crate::primitive::{CircleMark, Halo, Paint, PolygonShape, Polyline, Primitive, TextRun};
use crate::projector::Projector;
use crate::text::{font_request, wrap_label, WrapHints};

/// Neutral fill for base-layer polygons (background and islands) that arrive unstyled. The
/// visual base of the document must never be missing.
const NEUTRAL_LAND: Paint = Paint::new(0xf4, 0xf1, 0xea);

/// Converts features of one frozen snapshot. Holds everything that is constant across features.
pub(crate) struct Converter<'a> {
    projector: &'a Projector,
    zoom: f64,
}

impl<'a> Converter<'a> {
    pub(crate) fn new(projector: &'a Projector, zoom: f64) -> Self {
        Self { projector, zoom }
    }

    /// Convert one feature. An empty vector means the feature is intentionally invisible.
    pub(crate) fn convert(
        &self,
        feature: &VisibleFeature,
        bucket: Bucket,
        fonts: &mut FontResolver<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Primitive> {
        if self.zoom < feature.min_zoom || self.zoom > feature.max_zoom {
            return Vec::new();
        }

        let ctx = EvalContext {
            zoom: self.zoom,
            properties: &feature.properties,
        };

        match &feature.geometry {
            geo_types::Geometry::LineString(line) => self
                .polyline(&line.0, feature, &ctx, diagnostics)
                .into_iter()
                .collect(),
            geo_types::Geometry::MultiLineString(multi) => multi
                .0
                .iter()
                .filter_map(|line| self.polyline(&line.0, feature, &ctx, diagnostics))
                .collect(),
            geo_types::Geometry::Polygon(polygon) => self
                .polygon(polygon, feature, bucket, &ctx, diagnostics)
                .into_iter()
                .collect(),
            geo_types::Geometry::MultiPolygon(multi) => multi
                .0
                .iter()
                .filter_map(|polygon| self.polygon(polygon, feature, bucket, &ctx, diagnostics))
                .collect(),
            geo_types::Geometry::Point(point) => {
                self.symbol(*point, feature, &ctx, fonts, diagnostics)
            }
            other => {
                diagnostics.note(
                    Stage::Convert,
                    format!(
                        "'{}': unsupported {} geometry, feature skipped",
                        feature.layer_id,
                        geometry_kind(other)
                    ),
                );
                Vec::new()
            }
        }
    }

    fn polyline(
        &self,
        line: &[geo_types::Coord],
        feature: &VisibleFeature,
        ctx: &EvalContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<Primitive> {
        // No resolvable color means the line was never styled; inventing a stroke here would
        // draw something the live view does not show.
        let color = resolve_color(&feature.paint, "line-color", ctx, diagnostics)?;
        let opacity = resolve_number(&feature.paint, "line-opacity", ctx, 1., diagnostics)
            * color.alpha();
        if opacity <= 0. {
            return None;
        }

        let points = self.project_all(line, feature, diagnostics)?;
        if points.len() < 2 {
            diagnostics.note(
                Stage::Convert,
                format!("'{}': degenerate line skipped", feature.layer_id),
            );
            return None;
        }

        Some(Primitive::Polyline(Polyline {
            points,
            color,
            width: resolve_number(&feature.paint, "line-width", ctx, 1., diagnostics),
            opacity,
        }))
    }

    fn polygon(
        &self,
        polygon: &geo_types::Polygon,
        feature: &VisibleFeature,
        bucket: Bucket,
        ctx: &EvalContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<Primitive> {
        let pattern = resolve_string(&feature.paint, "fill-pattern", ctx, diagnostics);
        let fill = match pattern {
            // Patterns are not rasterized; a fixed palette keyed on the pattern name keeps the
            // area visible.
            Some(name) => Some(pattern_fill(&name)),
            None => resolve_color(&feature.paint, "fill-color", ctx, diagnostics),
        };
        let outline = resolve_color(&feature.paint, "fill-outline-color", ctx, diagnostics);
        let mut opacity = resolve_number(&feature.paint, "fill-opacity", ctx, 1., diagnostics);

        // The visual base of the document: background and islands always get a fill.
        let base_layer = matches!(bucket, Bucket::Background | Bucket::Islands);
        if !base_layer && (opacity <= 0. || (fill.is_none() && outline.is_none())) {
            return None;
        }
        let fill = if base_layer {
            if opacity <= 0. {
                diagnostics.note(
                    Stage::Convert,
                    format!(
                        "'{}': ignoring full transparency on a base layer",
                        feature.layer_id
                    ),
                );
                opacity = 1.;
            }
            Some(fill.unwrap_or(NEUTRAL_LAND))
        } else {
            fill
        };

        let exterior = self.project_all(&polygon.exterior().0, feature, diagnostics)?;
        if exterior.len() < 3 {
            diagnostics.note(
                Stage::Convert,
                format!("'{}': degenerate polygon skipped", feature.layer_id),
            );
            return None;
        }

        let fill_alpha = fill.map_or(1., |paint| paint.alpha());
        Some(Primitive::Polygon(PolygonShape {
            exterior,
            fill,
            fill_opacity: opacity * fill_alpha,
            outline,
        }))
    }

    fn symbol(
        &self,
        point: geo_types::Point,
        feature: &VisibleFeature,
        ctx: &EvalContext<'_>,
        fonts: &mut FontResolver<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Primitive> {
        let origin = self.projector.project(point);
        if !origin.0.is_finite() || !origin.1.is_finite() {
            diagnostics.note(
                Stage::Convert,
                format!("'{}': non-finite projected point skipped", feature.layer_id),
            );
            return Vec::new();
        }

        let text = self.label(origin, feature, ctx, fonts, diagnostics);
        let circle = self.circle(origin, feature, ctx, diagnostics);

        match (circle, text) {
            // A combined marker keeps its circle and label registered to each other.
            (Some(circle), Some(text)) => vec![Primitive::Group(vec![
                Primitive::Circle(circle),
                Primitive::Text(text),
            ])],
            (Some(circle), None) => vec![Primitive::Circle(circle)],
            (None, Some(text)) => vec![Primitive::Text(text)],
            // A bare point with neither a label nor a styled circle is not drawn.
            (None, None) => Vec::new(),
        }
    }

    fn label(
        &self,
        origin: (f64, f64),
        feature: &VisibleFeature,
        ctx: &EvalContext<'_>,
        fonts: &mut FontResolver<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<TextRun> {
        let content = resolve_string(&feature.layout, "text-field", ctx, diagnostics)?;
        if content.is_empty() {
            return None;
        }

        let color = resolve_color(&feature.paint, "text-color", ctx, diagnostics);
        let halo_color = resolve_color(&feature.paint, "text-halo-color", ctx, diagnostics);
        // A label with neither a text color nor a halo color is suppressed on purpose.
        if color.is_none() && halo_color.is_none() {
            return None;
        }

        let content = match resolve_string(&feature.layout, "text-transform", ctx, diagnostics)
            .as_deref()
        {
            Some("uppercase") => content.to_uppercase(),
            Some("lowercase") => content.to_lowercase(),
            _ => content,
        };

        let anchor = resolve_string(&feature.layout, "text-anchor", ctx, diagnostics);
        let hints = WrapHints {
            max_width_em: resolve_opt_number(&feature.layout, "text-max-width", ctx, diagnostics),
            line_height: resolve_opt_number(&feature.layout, "text-line-height", ctx, diagnostics),
            vertical_anchor: anchor
                .as_deref()
                .is_some_and(|anchor| anchor.starts_with("top") || anchor.starts_with("bottom")),
        };
        let lines = wrap_label(&content, &hints);

        let names = resolve_string_list(&feature.layout, "text-font", ctx, diagnostics)
            .unwrap_or_default();
        let font = font_request(&names);
        let font_embedded = fonts.request(&font, diagnostics);

        let halo = halo_color.map(|halo_color| Halo {
            color: halo_color,
            width: resolve_number(&feature.paint, "text-halo-width", ctx, 1., diagnostics),
        });

        Some(TextRun {
            origin,
            lines,
            font,
            font_embedded,
            size: resolve_number(&feature.layout, "text-size", ctx, 16., diagnostics),
            color,
            opacity: resolve_number(&feature.paint, "text-opacity", ctx, 1., diagnostics),
            halo,
            line_height: hints.line_height.unwrap_or(1.2),
        })
    }

    fn circle(
        &self,
        origin: (f64, f64),
        feature: &VisibleFeature,
        ctx: &EvalContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<CircleMark> {
        let radius = resolve_opt_number(&feature.paint, "circle-radius", ctx, diagnostics)?;
        if radius <= 0. {
            return None;
        }

        let color = resolve_color(&feature.paint, "circle-color", ctx, diagnostics)
            .unwrap_or(Paint::new(0, 0, 0));
        Some(CircleMark {
            center: origin,
            radius,
            color,
            opacity: resolve_number(&feature.paint, "circle-opacity", ctx, 1., diagnostics)
                * color.alpha(),
        })
    }

    /// Project a coordinate sequence, rejecting anything that does not land on finite document
    /// coordinates. `None` marks an assembly failure on this feature; the export continues
    /// without it.
    fn project_all(
        &self,
        coords: &[geo_types::Coord],
        feature: &VisibleFeature,
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<(f64, f64)>> {
        let points: Vec<(f64, f64)> = coords
            .iter()
            .map(|coord| (self.projector.x(coord.x), self.projector.y(coord.y)))
            .collect();

        if points
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            diagnostics.note(
                Stage::Convert,
                format!(
                    "'{}': non-finite projected coordinate, feature skipped",
                    feature.layer_id
                ),
            );
            return None;
        }
        Some(points)
    }
}

fn geometry_kind(geometry: &geo_types::Geometry) -> &'static str {
    match geometry {
        geo_types::Geometry::Point(_) => "point",
        geo_types::Geometry::Line(_) => "line",
        geo_types::Geometry::LineString(_) => "linestring",
        geo_types::Geometry::Polygon(_) => "polygon",
        geo_types::Geometry::MultiPoint(_) => "multipoint",
        geo_types::Geometry::MultiLineString(_) => "multilinestring",
        geo_types::Geometry::MultiPolygon(_) => "multipolygon",
        geo_types::Geometry::GeometryCollection(_) => "geometrycollection",
        geo_types::Geometry::Rect(_) => "rect",
        geo_types::Geometry::Triangle(_) => "triangle",
    }
}

/// Fixed fallback palette for named fill patterns.
fn pattern_fill(name: &str) -> Paint {
    let name = name.to_ascii_lowercase();
    let contains = |keywords: &[&str]| keywords.iter().any(|keyword| name.contains(keyword));

    if contains(&["park", "grass", "wood", "forest", "scrub"]) {
        Paint::new(0xcd, 0xeb, 0xb0)
    } else if contains(&["water", "wetland", "swamp"]) {
        Paint::new(0xaa, 0xd3, 0xdf)
    } else if contains(&["sand", "beach"]) {
        Paint::new(0xf5, 0xe9, 0xc6)
    } else if contains(&["hospital"]) {
        Paint::new(0xf9, 0xd6, 0xd6)
    } else if contains(&["school", "university", "college"]) {
        Paint::new(0xf7, 0xf0, 0xac)
    } else {
        Paint::new(0xd9, 0xd7, 0xd2)
    }
}
