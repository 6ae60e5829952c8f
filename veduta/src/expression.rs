//! Evaluate declarative style values against a zoom level and a feature's properties.
//!
//! The core [`evaluate`] is fallible so tests can observe exactly what went wrong, but nothing
//! in the pipeline aborts on it: the `resolve_*` wrappers below are total. They apply the
//! attribute's documented default and record a diagnostic instead of propagating errors, so a
//! malformed style value can never take down an export.

use serde_json::Value;
use std::collections::HashMap;

use crate::diagnostics::{Diagnostics, Stage};
use crate::primitive::Paint;
use crate::style::StyleValue;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported expression: {0:?}")]
    Unsupported(Value),
    #[error("interpolation has no stops")]
    EmptyStops,
    #[error("could not serialize a float. Is it NaN?")]
    CouldNotSerializeFloat,
    #[error("expected a number, got: {0}")]
    ExpectedNumber(Value),
    #[error("expected a string, got: {0}")]
    ExpectedString(Value),
    #[error("expected a color, got: {0}")]
    ExpectedColor(Value),
    #[error(transparent)]
    ColorParse(color::ParseError),
}

/// Everything a style value may depend on: the frozen camera zoom and the feature's properties.
pub struct EvalContext<'a> {
    pub zoom: f64,
    pub properties: &'a HashMap<String, Value>,
}

/// Evaluate a style value. Deterministic and, apart from [`StyleValue::Unsupported`], total.
pub fn evaluate(value: &StyleValue, ctx: &EvalContext<'_>) -> Result<Value, Error> {
    match value {
        StyleValue::Literal(literal) => Ok(literal.clone()),
        StyleValue::PropertyGet(key) => {
            // A missing property is not an error; the attribute's default applies.
            Ok(ctx.properties.get(key).cloned().unwrap_or(Value::Null))
        }
        StyleValue::Coalesce(children) => {
            for child in children {
                match evaluate(child, ctx)? {
                    Value::Null => continue,
                    defined => return Ok(defined),
                }
            }
            Ok(Value::Null)
        }
        StyleValue::Interpolate(stops) => interpolate(stops, ctx.zoom),
        StyleValue::Step { base, stops } => Ok(stops
            .iter()
            .rev()
            .find(|(zoom, _)| *zoom <= ctx.zoom)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| base.clone())),
        StyleValue::Unsupported(raw) => Err(Error::Unsupported(raw.clone())),
    }
}

/// Linear interpolation between the stops bracketing `zoom`, clamped at both ends. Only numeric
/// stop values are interpolated; anything else (e.g. color stops) falls back to the nearest stop.
fn interpolate(stops: &[(f64, Value)], zoom: f64) -> Result<Value, Error> {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Err(Error::EmptyStops);
    };

    if zoom <= first.0 {
        return Ok(first.1.clone());
    }
    if zoom >= last.0 {
        return Ok(last.1.clone());
    }

    let Some(pair) = stops
        .windows(2)
        .find(|pair| pair[0].0 <= zoom && zoom <= pair[1].0)
    else {
        // Stops are sorted at ingestion; with the clamps above, a bracket always exists.
        return Ok(last.1.clone());
    };

    let (z0, v0) = &pair[0];
    let (z1, v1) = &pair[1];
    let t = (zoom - z0) / (z1 - z0);

    match (v0.as_f64(), v1.as_f64()) {
        (Some(a), Some(b)) => number(a + (b - a) * t),
        _ => Ok(if t < 0.5 { v0.clone() } else { v1.clone() }),
    }
}

fn number(value: f64) -> Result<Value, Error> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or(Error::CouldNotSerializeFloat)
}

/// Resolve a numeric attribute, falling back to `default` when the rule is absent, null, or
/// unresolvable.
pub(crate) fn resolve_number(
    rules: &HashMap<String, StyleValue>,
    key: &str,
    ctx: &EvalContext<'_>,
    default: f64,
    diagnostics: &mut Diagnostics,
) -> f64 {
    resolve_opt_number(rules, key, ctx, diagnostics).unwrap_or(default)
}

/// Like [`resolve_number`], but distinguishes "not styled" from any concrete value.
pub(crate) fn resolve_opt_number(
    rules: &HashMap<String, StyleValue>,
    key: &str,
    ctx: &EvalContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<f64> {
    let resolved = resolve_value(rules, key, ctx, diagnostics)?;
    match resolved.as_f64() {
        Some(value) => Some(value),
        None => {
            note_fallback(diagnostics, key, &Error::ExpectedNumber(resolved));
            None
        }
    }
}

/// Resolve a string attribute. Numbers stringify (house numbers and similar labels); other
/// types do not.
pub(crate) fn resolve_string(
    rules: &HashMap<String, StyleValue>,
    key: &str,
    ctx: &EvalContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let resolved = resolve_value(rules, key, ctx, diagnostics)?;
    match resolved {
        Value::String(string) => Some(string),
        Value::Number(number) => Some(number.to_string()),
        other => {
            note_fallback(diagnostics, key, &Error::ExpectedString(other));
            None
        }
    }
}

/// Resolve a list-of-strings attribute (font name lists). A single string counts as a list of
/// one.
pub(crate) fn resolve_string_list(
    rules: &HashMap<String, StyleValue>,
    key: &str,
    ctx: &EvalContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<String>> {
    let resolved = resolve_value(rules, key, ctx, diagnostics)?;
    match resolved {
        Value::String(string) => Some(vec![string]),
        Value::Array(values) => {
            let names: Vec<String> = values
                .into_iter()
                .filter_map(|value| value.as_str().map(str::to_owned))
                .collect();
            (!names.is_empty()).then_some(names)
        }
        other => {
            note_fallback(diagnostics, key, &Error::ExpectedString(other));
            None
        }
    }
}

/// Resolve a color attribute. `None` means the attribute is genuinely unstyled or broken; the
/// caller decides whether that makes the element invisible.
pub(crate) fn resolve_color(
    rules: &HashMap<String, StyleValue>,
    key: &str,
    ctx: &EvalContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<Paint> {
    let resolved = resolve_value(rules, key, ctx, diagnostics)?;
    match &resolved {
        Value::String(css) => match Paint::parse(css) {
            Ok(paint) => Some(paint),
            Err(error) => {
                note_fallback(diagnostics, key, &Error::ColorParse(error));
                None
            }
        },
        Value::Object(object) => {
            let component = |name: &str| object.get(name).and_then(Value::as_f64);
            match (component("r"), component("g"), component("b")) {
                (Some(r), Some(g), Some(b)) => Some(Paint::from_unit_components(
                    r,
                    g,
                    b,
                    component("a").unwrap_or(1.),
                )),
                _ => {
                    note_fallback(diagnostics, key, &Error::ExpectedColor(resolved.clone()));
                    None
                }
            }
        }
        _ => {
            note_fallback(diagnostics, key, &Error::ExpectedColor(resolved));
            None
        }
    }
}

/// Shared front half of the wrappers: absent and null resolve to `None` silently, errors resolve
/// to `None` with a diagnostic.
fn resolve_value(
    rules: &HashMap<String, StyleValue>,
    key: &str,
    ctx: &EvalContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<Value> {
    let rule = rules.get(key)?;
    match evaluate(rule, ctx) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(error) => {
            note_fallback(diagnostics, key, &error);
            None
        }
    }
}

fn note_fallback(diagnostics: &mut Diagnostics, key: &str, error: &Error) {
    diagnostics.note(Stage::Style, format!("{key}: {error}; using default"));
}
