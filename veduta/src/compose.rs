//! Assemble the final SVG document.
//!
//! Buckets are rendered in the paint order of the original style: the style's layer list is
//! walked once, recording where each bucket first occurs. The document itself is a `<title>` and
//! `<desc>` header, embedded font faces, a full-canvas background rectangle, and one labeled
//! group per non-empty bucket.

use std::collections::HashMap;
use std::fmt::Write as _;

use svg::node;
use svg::node::element;
use svg::Document;

use crate::camera::Camera;
use crate::classify::{bucket_hint, Bucket, ClassifiedFeatures};
use crate::convert::Converter;
use crate::diagnostics::Diagnostics;
use crate::feature::VisibleFeature;
use crate::fonts::{FontResolver, FontResource};
use crate::primitive::{Paint, Primitive, TextRun};
use crate::projector::Projector;
use crate::style::StyleLayer;

/// Compose the whole document. Fonts requested during conversion are embedded in the header, so
/// every conversion happens before the document is assembled.
pub(crate) fn compose(
    classified: &ClassifiedFeatures,
    projector: &Projector,
    camera: &Camera,
    background: Paint,
    style_layers: &[StyleLayer],
    fonts: &mut FontResolver<'_>,
    output_size: (u32, u32),
    diagnostics: &mut Diagnostics,
) -> Document {
    let converter = Converter::new(projector, camera.zoom());

    // Convert first: this is what fills the font cache.
    let mut groups: Vec<element::Group> = Vec::new();
    for bucket in bucket_order(style_layers) {
        let features = classified.get(bucket);
        if features.is_empty() {
            continue;
        }

        let mut group = element::Group::new().set("id", bucket.label());
        let mut drawn = 0usize;
        for feature in outline_first(features) {
            for primitive in converter.convert(feature, bucket, fonts, diagnostics) {
                group = add_primitive(group, &primitive);
                drawn += 1;
            }
        }
        if drawn > 0 {
            groups.push(group);
        }
    }

    let (width, height) = output_size;
    let center = camera.center();
    let mut document = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height))
        .add(element::Title::new().add(node::Text::new("Exported map view")))
        .add(element::Description::new().add(node::Text::new(format!(
            "center={:.5},{:.5} zoom={} bearing={}",
            center.x(),
            center.y(),
            camera.zoom(),
            camera.bearing()
        ))));

    let embedded = fonts.resources();
    if !embedded.is_empty() {
        document = document.add(
            element::Definitions::new().add(element::Style::new(font_face_css(&embedded))),
        );
    }

    document = document.add(
        element::Rectangle::new()
            .set("x", 0)
            .set("y", 0)
            .set("width", width)
            .set("height", height)
            .set("fill", background.css()),
    );

    for group in groups {
        document = document.add(group);
    }
    document
}

/// Draw order of the buckets, derived from the style's layer list: first occurrence wins,
/// unmatched buckets are appended in a fixed order, `background` is forced first and `islands`
/// is pinned right above `water`.
pub(crate) fn bucket_order(style_layers: &[StyleLayer]) -> Vec<Bucket> {
    let mut order: Vec<Bucket> = Vec::new();
    for layer in style_layers {
        if let Some(bucket) = bucket_hint(&layer.id, layer.source_layer.as_deref(), layer.layer_type)
        {
            if !order.contains(&bucket) {
                order.push(bucket);
            }
        }
    }
    for bucket in Bucket::ALL {
        if !order.contains(&bucket) {
            order.push(bucket);
        }
    }

    order.retain(|bucket| *bucket != Bucket::Background);
    order.insert(0, Bucket::Background);

    // No native style layer maps to islands; they must still sit directly above the water fill.
    order.retain(|bucket| *bucket != Bucket::Islands);
    let water = order
        .iter()
        .position(|bucket| *bucket == Bucket::Water)
        .unwrap_or(0);
    order.insert(water + 1, Bucket::Islands);

    order
}

const OUTLINE_SUFFIXES: [&str; 3] = ["-outline", "-casing", "-case"];

fn outline_variant(layer_id: &str) -> Option<&str> {
    OUTLINE_SUFFIXES
        .iter()
        .find_map(|suffix| layer_id.strip_suffix(suffix))
}

/// Order features so that the outline variant of a road always precedes its fill variant, no
/// matter how the renderer handed them over. Everything else keeps its original order.
fn outline_first(features: &[VisibleFeature]) -> Vec<&VisibleFeature> {
    let mut base_order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, (Vec<&VisibleFeature>, Vec<&VisibleFeature>)> = HashMap::new();

    for feature in features {
        let (base, is_outline) = match outline_variant(&feature.layer_id) {
            Some(base) => (base, true),
            None => (feature.layer_id.as_str(), false),
        };
        if !grouped.contains_key(base) {
            base_order.push(base);
        }
        let slot = grouped.entry(base).or_default();
        if is_outline {
            slot.0.push(feature);
        } else {
            slot.1.push(feature);
        }
    }

    base_order
        .into_iter()
        .filter_map(|base| grouped.remove(base))
        .flat_map(|(outlines, fills)| outlines.into_iter().chain(fills))
        .collect()
}

fn add_primitive(group: element::Group, primitive: &Primitive) -> element::Group {
    match primitive {
        Primitive::Polyline(polyline) => {
            let mut polyline_element = element::Polyline::new()
                .set("points", points_attribute(&polyline.points))
                .set("fill", "none")
                .set("stroke", polyline.color.css())
                .set("stroke-width", fmt(polyline.width))
                .set("stroke-linecap", "round")
                .set("stroke-linejoin", "round");
            if polyline.opacity < 1. {
                polyline_element = polyline_element.set("stroke-opacity", fmt(polyline.opacity));
            }
            group.add(polyline_element)
        }
        Primitive::Polygon(polygon) => {
            let mut polygon_element = element::Polygon::new()
                .set("points", points_attribute(&polygon.exterior))
                .set(
                    "fill",
                    polygon
                        .fill
                        .map_or_else(|| "none".to_owned(), |paint| paint.css()),
                );
            if polygon.fill.is_some() && polygon.fill_opacity < 1. {
                polygon_element = polygon_element.set("fill-opacity", fmt(polygon.fill_opacity));
            }
            if let Some(outline) = polygon.outline {
                polygon_element = polygon_element
                    .set("stroke", outline.css())
                    .set("stroke-width", "1");
            }
            group.add(polygon_element)
        }
        Primitive::Text(text) => group.add(text_element(text)),
        Primitive::Circle(circle) => {
            let mut circle_element = element::Circle::new()
                .set("cx", fmt(circle.center.0))
                .set("cy", fmt(circle.center.1))
                .set("r", fmt(circle.radius))
                .set("fill", circle.color.css());
            if circle.opacity < 1. {
                circle_element = circle_element.set("fill-opacity", fmt(circle.opacity));
            }
            group.add(circle_element)
        }
        Primitive::Group(children) => {
            let mut inner = element::Group::new();
            for child in children {
                inner = add_primitive(inner, child);
            }
            group.add(inner)
        }
    }
}

fn text_element(text: &TextRun) -> element::Text {
    let mut text_element = element::Text::new()
        .set("x", fmt(text.origin.0))
        .set("y", fmt(text.origin.1))
        .set("font-family", font_family_attribute(text))
        .set("font-size", fmt(text.size))
        .set("text-anchor", "middle")
        .set("dominant-baseline", "central")
        .set(
            "fill",
            text.color
                .map_or_else(|| "none".to_owned(), |paint| paint.css()),
        );
    if text.font.weight != 400 {
        text_element = text_element.set("font-weight", text.font.weight.to_string());
    }
    if text.opacity < 1. {
        text_element = text_element.set("opacity", fmt(text.opacity));
    }
    if let Some(halo) = text.halo {
        text_element = text_element
            .set("stroke", halo.color.css())
            .set("stroke-width", fmt(halo.width))
            .set("paint-order", "stroke");
    }

    if let [line] = text.lines.as_slice() {
        text_element.add(node::Text::new(line.clone()))
    } else {
        for (index, line) in text.lines.iter().enumerate() {
            let mut span = element::TSpan::new()
                .set("x", fmt(text.origin.0))
                .add(node::Text::new(line.clone()));
            if index > 0 {
                span = span.set("dy", format!("{}em", fmt(text.line_height)));
            }
            text_element = text_element.add(span);
        }
        text_element
    }
}

/// CSS font family stack for a label: the requested family when it is embedded, always closed by
/// a generic fallback so unmapped families still render.
fn font_family_attribute(text: &TextRun) -> String {
    if text.font_embedded {
        format!("'{}', sans-serif", text.font.family)
    } else {
        format!("{}, sans-serif", text.font.family)
    }
}

fn font_face_css(resources: &[&FontResource]) -> String {
    let mut css = String::new();
    for resource in resources {
        let _ = write!(
            css,
            "@font-face{{font-family:'{}';font-weight:{};src:url(data:font/ttf;base64,{}) format('truetype');}}",
            resource.family, resource.weight, resource.data_base64
        );
    }
    css
}

fn points_attribute(points: &[(f64, f64)]) -> String {
    let mut attribute = String::new();
    for (index, (x, y)) in points.iter().enumerate() {
        if index > 0 {
            attribute.push(' ');
        }
        let _ = write!(attribute, "{x:.2},{y:.2}");
    }
    attribute
}

fn fmt(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::LayerType;
    use serde_json::json;

    fn layers() -> Vec<StyleLayer> {
        vec![
            StyleLayer::new("background", LayerType::Background),
            StyleLayer::new("water-fill", LayerType::Fill).with_source_layer("water"),
            StyleLayer::new("landuse-grass", LayerType::Fill).with_source_layer("landuse"),
            StyleLayer::new("road-primary", LayerType::Line).with_source_layer("road"),
            StyleLayer::new("place-labels", LayerType::Symbol).with_source_layer("place"),
        ]
    }

    #[test]
    fn style_order_decides_bucket_order() {
        let order = bucket_order(&layers());

        let position = |bucket: Bucket| order.iter().position(|b| *b == bucket).unwrap();
        assert_eq!(position(Bucket::Background), 0);
        assert!(position(Bucket::Water) < position(Bucket::Landuse));
        assert_eq!(position(Bucket::Islands), position(Bucket::Water) + 1);
        assert!(position(Bucket::Landuse) < position(Bucket::Roads));
        assert!(position(Bucket::Roads) < position(Bucket::Labels));
        // Every bucket shows up exactly once, matched by a style layer or not.
        assert_eq!(order.len(), Bucket::ALL.len());
    }

    #[test]
    fn islands_follow_water_even_without_a_water_layer() {
        let order = bucket_order(&[StyleLayer::new("background", LayerType::Background)]);
        let water = order.iter().position(|b| *b == Bucket::Water).unwrap();
        let islands = order.iter().position(|b| *b == Bucket::Islands).unwrap();
        assert_eq!(islands, water + 1);
    }

    #[test]
    fn outlines_come_before_their_fill_variant() {
        let line = geo_types::LineString::from(vec![(4.45, 51.90), (4.50, 51.93)]);
        let features = vec![
            VisibleFeature::new("road-primary", LayerType::Line, line.clone())
                .with_paint("line-color", json!("#ffffff")),
            VisibleFeature::new("road-primary-casing", LayerType::Line, line.clone())
                .with_paint("line-color", json!("#888888")),
            VisibleFeature::new("road-minor", LayerType::Line, line)
                .with_paint("line-color", json!("#eeeeee")),
        ];

        let ordered: Vec<&str> = outline_first(&features)
            .iter()
            .map(|feature| feature.layer_id.as_str())
            .collect();
        assert_eq!(ordered, ["road-primary-casing", "road-primary", "road-minor"]);
    }

    #[test]
    fn points_are_rounded_for_stable_output() {
        assert_eq!(
            points_attribute(&[(0.123456, 1.0), (512., 384.5)]),
            "0.12,1.00 512.00,384.50"
        );
    }
}
