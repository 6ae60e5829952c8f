//! Style rules of the exported view. Loosely (very) based on MapLibre's style specification.
//!
//! The live renderer hands over raw paint/layout values exactly as they appear in the style
//! JSON: sometimes a plain literal, sometimes an expression array, sometimes a legacy function
//! object. [`StyleValue::from_json`] normalizes all those duck-typed shapes into one tagged
//! union at ingestion, so the rest of the pipeline never sniffs raw JSON again.

use serde_json::Value;

/// A single layer of the style, in paint order. The composer walks this list to decide the order
/// of the output groups.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(rename = "source-layer", default)]
    pub source_layer: Option<String>,
}

impl StyleLayer {
    pub fn new(id: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            id: id.into(),
            layer_type,
            source_layer: None,
        }
    }

    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }
}

/// Kind of a style layer, which decides what a feature of that layer draws as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Fill,
    Line,
    Symbol,
    Circle,
    Background,
}

/// A declarative style value: either a literal, or a small expression tree over the current zoom
/// and the feature's properties.
///
/// Only the operators actually encountered in the wild are modeled; everything else becomes
/// [`StyleValue::Unsupported`] and resolves to the attribute's documented default at evaluation
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Literal(Value),
    /// `["get", key]` — property lookup on the feature.
    PropertyGet(String),
    /// `["coalesce", ...]` — first child that evaluates to a defined, non-null value.
    Coalesce(Vec<StyleValue>),
    /// Linear interpolation over zoom between `(zoom, value)` stops, ascending.
    Interpolate(Vec<(f64, Value)>),
    /// Stepped lookup over zoom: the value of the last stop at or below the current zoom.
    Step {
        base: Value,
        stops: Vec<(f64, Value)>,
    },
    /// An expression shape this exporter does not understand.
    Unsupported(Value),
}

impl StyleValue {
    /// Normalize a raw style value into the tagged union.
    pub fn from_json(raw: &Value) -> Self {
        match raw {
            Value::Array(values) => Self::from_expression_array(values, raw),
            Value::Object(object) => {
                if let Some(Value::Array(stops)) = object.get("stops") {
                    Self::from_legacy_function(stops, object, raw)
                } else {
                    // Plain object literal, e.g. a color object.
                    Self::Literal(raw.clone())
                }
            }
            literal => Self::Literal(literal.clone()),
        }
    }

    fn from_expression_array(values: &[Value], raw: &Value) -> Self {
        let Some((Value::String(operator), arguments)) = values.split_first() else {
            return Self::Unsupported(raw.clone());
        };

        match (operator.as_str(), arguments) {
            ("literal", [value]) => Self::Literal(value.clone()),
            ("get", [Value::String(key)]) => Self::PropertyGet(key.clone()),
            ("coalesce", children) if !children.is_empty() => {
                Self::Coalesce(children.iter().map(Self::from_json).collect())
            }
            ("interpolate", [kind, input, rest @ ..]) => {
                // Only linear interpolation over zoom is supported.
                if is_linear(kind) && is_zoom(input) {
                    match parse_flat_stops(rest) {
                        Some(stops) => Self::Interpolate(sorted(stops)),
                        None => Self::Unsupported(raw.clone()),
                    }
                } else {
                    Self::Unsupported(raw.clone())
                }
            }
            ("step", [input, base, rest @ ..]) => {
                if is_zoom(input) {
                    match parse_flat_stops(rest) {
                        Some(stops) => Self::Step {
                            base: base.clone(),
                            stops: sorted(stops),
                        },
                        None => Self::Unsupported(raw.clone()),
                    }
                } else {
                    Self::Unsupported(raw.clone())
                }
            }
            _ => Self::Unsupported(raw.clone()),
        }
    }

    /// Legacy function objects: `{"stops": [[zoom, value], ...]}`, optionally with
    /// `"type": "interval"` for stepped lookup.
    fn from_legacy_function(
        stops: &[Value],
        object: &serde_json::Map<String, Value>,
        raw: &Value,
    ) -> Self {
        let parsed: Option<Vec<(f64, Value)>> = stops
            .iter()
            .map(|stop| match stop {
                Value::Array(pair) => match pair.as_slice() {
                    [Value::Number(zoom), value] => {
                        zoom.as_f64().map(|zoom| (zoom, value.clone()))
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect();

        let Some(parsed) = parsed.filter(|parsed| !parsed.is_empty()) else {
            return Self::Unsupported(raw.clone());
        };
        let parsed = sorted(parsed);

        if object.get("type").and_then(Value::as_str) == Some("interval") {
            Self::Step {
                base: parsed[0].1.clone(),
                stops: parsed,
            }
        } else {
            Self::Interpolate(parsed)
        }
    }
}

fn is_linear(kind: &Value) -> bool {
    matches!(kind, Value::Array(values) if values.first().and_then(Value::as_str) == Some("linear"))
}

fn is_zoom(input: &Value) -> bool {
    matches!(input, Value::Array(values)
        if values.len() == 1 && values[0].as_str() == Some("zoom"))
}

/// Parse the flat `z0, v0, z1, v1, ...` tail of an interpolate/step expression.
fn parse_flat_stops(rest: &[Value]) -> Option<Vec<(f64, Value)>> {
    if rest.is_empty() || rest.len() % 2 != 0 {
        return None;
    }
    rest.chunks(2)
        .map(|pair| pair[0].as_f64().map(|zoom| (zoom, pair[1].clone())))
        .collect()
}

fn sorted(mut stops: Vec<(f64, Value)>) -> Vec<(f64, Value)> {
    stops.sort_by(|a, b| a.0.total_cmp(&b.0));
    stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_stay_literals() {
        assert_eq!(
            StyleValue::from_json(&json!(3.5)),
            StyleValue::Literal(json!(3.5))
        );
        assert_eq!(
            StyleValue::from_json(&json!("#ff0000")),
            StyleValue::Literal(json!("#ff0000"))
        );
    }

    #[test]
    fn get_expression_is_normalized() {
        assert_eq!(
            StyleValue::from_json(&json!(["get", "name"])),
            StyleValue::PropertyGet("name".to_owned())
        );
    }

    #[test]
    fn coalesce_children_are_normalized_recursively() {
        let value = StyleValue::from_json(&json!(["coalesce", ["get", "name_nl"], "fallback"]));
        assert_eq!(
            value,
            StyleValue::Coalesce(vec![
                StyleValue::PropertyGet("name_nl".to_owned()),
                StyleValue::Literal(json!("fallback")),
            ])
        );
    }

    #[test]
    fn interpolate_stops_are_sorted() {
        let value = StyleValue::from_json(&json!([
            "interpolate",
            ["linear"],
            ["zoom"],
            16, 4.0,
            10, 1.0,
        ]));
        assert_eq!(
            value,
            StyleValue::Interpolate(vec![(10., json!(1.0)), (16., json!(4.0))])
        );
    }

    #[test]
    fn legacy_stops_object_becomes_interpolate() {
        let value = StyleValue::from_json(&json!({"stops": [[10, 1.0], [16, 4.0]]}));
        assert_eq!(
            value,
            StyleValue::Interpolate(vec![(10., json!(1.0)), (16., json!(4.0))])
        );
    }

    #[test]
    fn legacy_interval_object_becomes_step() {
        let value = StyleValue::from_json(&json!({
            "type": "interval",
            "stops": [[10, "low"], [14, "high"]],
        }));
        assert_eq!(
            value,
            StyleValue::Step {
                base: json!("low"),
                stops: vec![(10., json!("low")), (14., json!("high"))],
            }
        );
    }

    #[test]
    fn unknown_operators_become_unsupported() {
        let raw = json!(["let", "x", 1, ["var", "x"]]);
        assert_eq!(
            StyleValue::from_json(&raw),
            StyleValue::Unsupported(raw.clone())
        );

        // Non-linear interpolation is out of scope too.
        let raw = json!(["interpolate", ["exponential", 2], ["zoom"], 10, 1, 16, 4]);
        assert_eq!(
            StyleValue::from_json(&raw),
            StyleValue::Unsupported(raw.clone())
        );
    }

    #[test]
    fn style_layers_deserialize_from_style_json() {
        let layers: Vec<StyleLayer> = serde_json::from_value(json!([
            {"id": "water", "type": "fill", "source-layer": "water"},
            {"id": "road-primary", "type": "line", "source-layer": "road"},
            {"id": "background", "type": "background"},
        ]))
        .unwrap();

        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].layer_type, LayerType::Fill);
        assert_eq!(layers[1].source_layer.as_deref(), Some("road"));
        assert_eq!(layers[2].source_layer, None);
    }
}
