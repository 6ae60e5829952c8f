//! Features visible in the live view, as the renderer hands them over.

use serde_json::Value;
use std::collections::HashMap;

use crate::style::{LayerType, StyleValue};

/// One feature currently visible in the view, with its geometry and the raw (unresolved) style
/// rules of the layer it was drawn by.
///
/// Instances are produced by the renderer when the snapshot is taken and never change during an
/// export. Paint and layout rules are normalized [`StyleValue`]s, but still unresolved: zoom- and
/// property-dependent expressions must reach the evaluator intact.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleFeature {
    pub geometry: geo_types::Geometry,
    pub properties: HashMap<String, Value>,
    pub layer_id: String,
    pub source_layer: Option<String>,
    pub layer_type: LayerType,
    pub paint: HashMap<String, StyleValue>,
    pub layout: HashMap<String, StyleValue>,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl VisibleFeature {
    pub fn new(
        layer_id: impl Into<String>,
        layer_type: LayerType,
        geometry: impl Into<geo_types::Geometry>,
    ) -> Self {
        Self {
            geometry: geometry.into(),
            properties: HashMap::new(),
            layer_id: layer_id.into(),
            source_layer: None,
            layer_type,
            paint: HashMap::new(),
            layout: HashMap::new(),
            min_zoom: 0.,
            max_zoom: 24.,
        }
    }

    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Attach a raw paint rule; the duck-typed JSON shape is normalized here, at ingestion.
    pub fn with_paint(mut self, key: impl Into<String>, raw: Value) -> Self {
        self.paint.insert(key.into(), StyleValue::from_json(&raw));
        self
    }

    /// Attach a raw layout rule, normalized like [`Self::with_paint`].
    pub fn with_layout(mut self, key: impl Into<String>, raw: Value) -> Self {
        self.layout.insert(key.into(), StyleValue::from_json(&raw));
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub(crate) fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Whether the feature carries the given tag as a meaningfully "on" property.
    pub(crate) fn has_truthy_property(&self, key: &str) -> bool {
        match self.properties.get(key) {
            Some(Value::Bool(value)) => *value,
            Some(Value::Number(value)) => value.as_f64() != Some(0.),
            Some(Value::String(value)) => !value.is_empty(),
            _ => false,
        }
    }

    pub(crate) fn is_polygonal(&self) -> bool {
        matches!(
            self.geometry,
            geo_types::Geometry::Polygon(_) | geo_types::Geometry::MultiPolygon(_)
        )
    }

    /// Number of vertices on the exterior ring(s). Zero for non-polygonal geometry.
    pub(crate) fn exterior_vertex_count(&self) -> usize {
        match &self.geometry {
            geo_types::Geometry::Polygon(polygon) => polygon.exterior().0.len(),
            geo_types::Geometry::MultiPolygon(multi) => multi
                .0
                .iter()
                .map(|polygon| polygon.exterior().0.len())
                .sum(),
            _ => 0,
        }
    }

    /// Whether any exterior vertex satisfies the predicate (used by the landmass heuristic's
    /// anchor check).
    pub(crate) fn any_exterior_coord(&self, predicate: impl Fn(f64, f64) -> bool) -> bool {
        match &self.geometry {
            geo_types::Geometry::Polygon(polygon) => polygon
                .exterior()
                .0
                .iter()
                .any(|coord| predicate(coord.x, coord.y)),
            geo_types::Geometry::MultiPolygon(multi) => multi.0.iter().any(|polygon| {
                polygon
                    .exterior()
                    .0
                    .iter()
                    .any(|coord| predicate(coord.x, coord.y))
            }),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vertex_count_covers_multi_polygons() {
        let square = geo_types::Polygon::new(
            geo_types::LineString::from(vec![(0., 0.), (1., 0.), (1., 1.), (0., 1.), (0., 0.)]),
            vec![],
        );
        let feature = VisibleFeature::new(
            "landuse",
            LayerType::Fill,
            geo_types::MultiPolygon(vec![square.clone(), square]),
        );

        assert_eq!(feature.exterior_vertex_count(), 10);
        assert!(feature.is_polygonal());
    }

    #[test]
    fn truthy_properties() {
        let point = geo_types::Point::new(4.48, 51.92);
        let feature = VisibleFeature::new("markers", LayerType::Circle, point)
            .with_property("marker", json!(true))
            .with_property("empty", json!(""))
            .with_property("zero", json!(0));

        assert!(feature.has_truthy_property("marker"));
        assert!(!feature.has_truthy_property("empty"));
        assert!(!feature.has_truthy_property("zero"));
        assert!(!feature.has_truthy_property("absent"));
    }
}
