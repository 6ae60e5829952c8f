//! The export pipeline: one frozen snapshot in, one SVG document out.

use std::time::Instant;

use crate::camera::Camera;
use crate::classify::{classify, Bucket, LandmassConfig};
use crate::compose::compose;
use crate::diagnostics::{Diagnostics, Stage};
use crate::expression::{resolve_color, EvalContext};
use crate::feature::VisibleFeature;
use crate::fonts::{FontLibrary, FontResolver};
use crate::primitive::Paint;
use crate::projector::Projector;
use crate::style::StyleLayer;

/// Default canvas color when neither the snapshot nor the style defines one.
const DEFAULT_BACKGROUND: Paint = Paint::new(0xf2, 0xef, 0xe9);

/// Everything the live renderer hands over for one export, captured once. The pipeline never
/// reads the live view: panning or zooming after the snapshot was taken cannot leak into an
/// in-flight export.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub camera: Camera,
    /// Currently visible features with raw, unresolved style rules.
    pub features: Vec<VisibleFeature>,
    /// The style's full layer list, in paint order.
    pub style_layers: Vec<StyleLayer>,
    /// Canvas color of the live view, if the renderer knows it.
    pub background_color: Option<String>,
}

impl ViewSnapshot {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            features: Vec::new(),
            style_layers: Vec::new(),
            background_color: None,
        }
    }

    pub fn with_features(mut self, features: Vec<VisibleFeature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_style_layers(mut self, style_layers: Vec<StyleLayer>) -> Self {
        self.style_layers = style_layers;
        self
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    /// A snapshot with no features and no style layers means the renderer had not finished
    /// loading when it was taken.
    fn is_ready(&self) -> bool {
        !self.features.is_empty() || !self.style_layers.is_empty()
    }
}

/// Export-wide knobs.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output document size in pixels. Defaults to the capture viewport; a fixed print-page
    /// size is equally valid.
    pub output_size: Option<(u32, u32)>,
    pub landmass: LandmassConfig,
    /// Overall budget imposed by the caller. When it runs out the export fails cleanly between
    /// stages instead of hanging; no partial document is produced.
    pub deadline: Option<Instant>,
}

/// Failures that abort an export. Everything recoverable (unresolvable style values, degenerate
/// geometry, missing fonts, per-feature assembly failures) degrades into [`Diagnostics`]
/// instead.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("the renderer has not finished loading the view; retry once it settles")]
    UpstreamNotReady,
    #[error("output size is empty")]
    EmptyOutput,
    #[error("export deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),
}

/// Run the whole pipeline over one frozen snapshot and return the SVG document.
///
/// The document string is only materialized after every stage has succeeded; no partial output
/// exists on any error.
pub fn export_svg(
    snapshot: ViewSnapshot,
    options: &ExportOptions,
    fonts: &dyn FontLibrary,
    diagnostics: &mut Diagnostics,
) -> Result<String, ExportError> {
    if !snapshot.is_ready() {
        return Err(ExportError::UpstreamNotReady);
    }

    let output_size = options.output_size.unwrap_or(snapshot.camera.viewport());
    if output_size.0 == 0 || output_size.1 == 0 {
        return Err(ExportError::EmptyOutput);
    }

    if snapshot.camera.bearing() != 0. {
        diagnostics.note(
            Stage::Compose,
            format!(
                "bearing {} is recorded in the metadata but the document is framed north-up",
                snapshot.camera.bearing()
            ),
        );
    }

    let bounds = snapshot.camera.bounds();
    if bounds.is_degenerate() {
        diagnostics.note(
            Stage::Compose,
            "viewport bounds are degenerate; all geometry collapses to the document midpoint",
        );
    }
    let projector = Projector::new(bounds, output_size);

    check_deadline(options, "classification")?;
    let classified = classify(
        snapshot.features,
        snapshot.camera.zoom(),
        &options.landmass,
        diagnostics,
    );

    check_deadline(options, "conversion")?;
    let background = background_paint(
        snapshot.background_color.as_deref(),
        classified.get(Bucket::Background),
        snapshot.camera.zoom(),
        diagnostics,
    );

    let mut resolver = FontResolver::new(fonts);
    let document = compose(
        &classified,
        &projector,
        &snapshot.camera,
        background,
        &snapshot.style_layers,
        &mut resolver,
        output_size,
        diagnostics,
    );

    check_deadline(options, "assembly")?;
    Ok(document.to_string())
}

fn check_deadline(options: &ExportOptions, stage: &'static str) -> Result<(), ExportError> {
    match options.deadline {
        Some(deadline) if Instant::now() >= deadline => {
            Err(ExportError::DeadlineExceeded(stage))
        }
        _ => Ok(()),
    }
}

/// Canvas color: the snapshot's explicit color wins, then the background layer's paint, then
/// the documented neutral default.
fn background_paint(
    explicit: Option<&str>,
    background_features: &[VisibleFeature],
    zoom: f64,
    diagnostics: &mut Diagnostics,
) -> Paint {
    if let Some(css) = explicit {
        match Paint::parse(css) {
            Ok(paint) => return paint,
            Err(error) => diagnostics.note(
                Stage::Compose,
                format!("background color '{css}': {error}; using the style's background"),
            ),
        }
    }

    background_features
        .iter()
        .find_map(|feature| {
            let ctx = EvalContext {
                zoom,
                properties: &feature.properties,
            };
            resolve_color(&feature.paint, "background-color", &ctx, diagnostics)
        })
        .unwrap_or(DEFAULT_BACKGROUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::NoEmbeddedFonts;
    use crate::position::lon_lat;
    use crate::style::LayerType;
    use serde_json::json;

    fn camera() -> Camera {
        Camera::new(lon_lat(4.48, 51.92), 14., (1024, 768)).unwrap()
    }

    fn style_layers() -> Vec<StyleLayer> {
        vec![
            StyleLayer::new("background", LayerType::Background),
            StyleLayer::new("water-fill", LayerType::Fill).with_source_layer("water"),
            StyleLayer::new("landuse-grass", LayerType::Fill).with_source_layer("landuse"),
        ]
    }

    fn ring_around(center: (f64, f64), radius: f64, vertices: usize) -> geo_types::Polygon {
        let points: Vec<(f64, f64)> = (0..vertices)
            .map(|i| {
                let angle = i as f64 / vertices as f64 * std::f64::consts::TAU;
                (
                    center.0 + angle.cos() * radius,
                    center.1 + angle.sin() * radius,
                )
            })
            .collect();
        geo_types::Polygon::new(geo_types::LineString::from(points), vec![])
    }

    fn rotterdam_snapshot() -> ViewSnapshot {
        let water = VisibleFeature::new(
            "water-fill",
            LayerType::Fill,
            ring_around((4.48, 51.92), 0.2, 16),
        )
        .with_source_layer("water")
        .with_paint("fill-color", json!("#75cff0"));

        let grass = VisibleFeature::new(
            "landuse-grass",
            LayerType::Fill,
            ring_around((4.50, 51.91), 0.01, 1200),
        )
        .with_source_layer("landuse")
        .with_property("class", json!("grass"))
        .with_paint("fill-color", json!("#cdebb0"));

        let unstyled_line = VisibleFeature::new(
            "road-unstyled",
            LayerType::Line,
            geo_types::LineString::from(vec![(4.46, 51.91), (4.49, 51.93)]),
        )
        .with_source_layer("road");

        ViewSnapshot::new(camera())
            .with_features(vec![water, grass, unstyled_line])
            .with_style_layers(style_layers())
    }

    fn coastal_options() -> ExportOptions {
        ExportOptions {
            landmass: LandmassConfig {
                anchors: vec![lon_lat(4.50, 51.91)],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn exports_the_rotterdam_scenario() {
        let mut diagnostics = Diagnostics::new();
        let svg = export_svg(
            rotterdam_snapshot(),
            &coastal_options(),
            &NoEmbeddedFonts,
            &mut diagnostics,
        )
        .unwrap();

        // The water polygon renders in the water group, the oversized coastal grass polygon is
        // reclassified into an islands group placed after it, and the uncolored line is absent.
        let water = svg.find(r#"<g id="water">"#).expect("water group missing");
        let islands = svg.find(r#"<g id="islands">"#).expect("islands group missing");
        assert!(water < islands);
        assert!(!svg.contains(r#"<g id="landuse">"#));
        assert!(!svg.contains("<polyline"));
        assert!(svg.contains("<desc>"));
        assert!(svg.contains("center=4.48000,51.92000 zoom=14 bearing=0"));
    }

    #[test]
    fn identical_snapshots_produce_identical_documents() {
        let mut diagnostics = Diagnostics::new();
        let first = export_svg(
            rotterdam_snapshot(),
            &coastal_options(),
            &NoEmbeddedFonts,
            &mut diagnostics,
        )
        .unwrap();
        let second = export_svg(
            rotterdam_snapshot(),
            &coastal_options(),
            &NoEmbeddedFonts,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn unready_snapshot_is_a_clean_failure() {
        let mut diagnostics = Diagnostics::new();
        let result = export_svg(
            ViewSnapshot::new(camera()),
            &ExportOptions::default(),
            &NoEmbeddedFonts,
            &mut diagnostics,
        );
        assert!(matches!(result, Err(ExportError::UpstreamNotReady)));
    }

    #[test]
    fn exhausted_deadline_aborts_without_output() {
        let options = ExportOptions {
            deadline: Some(Instant::now() - std::time::Duration::from_secs(1)),
            ..coastal_options()
        };

        let mut diagnostics = Diagnostics::new();
        let result = export_svg(
            rotterdam_snapshot(),
            &options,
            &NoEmbeddedFonts,
            &mut diagnostics,
        );
        assert!(matches!(result, Err(ExportError::DeadlineExceeded(_))));
    }

    #[test]
    fn fonts_are_embedded_in_the_header() {
        struct StubFonts;
        impl FontLibrary for StubFonts {
            fn load(&self, family: &str) -> Option<Vec<u8>> {
                (family == "DIN Pro").then(|| vec![1, 2, 3, 4])
            }
        }

        let label = VisibleFeature::new(
            "place-label",
            LayerType::Symbol,
            geo_types::Point::new(4.48, 51.92),
        )
        .with_source_layer("place")
        .with_layout("text-field", json!("Rotterdam"))
        .with_layout("text-font", json!(["DIN Pro Bold"]))
        .with_paint("text-color", json!("#222222"));

        let snapshot = ViewSnapshot::new(camera())
            .with_features(vec![label])
            .with_style_layers(style_layers());

        let mut diagnostics = Diagnostics::new();
        let svg = export_svg(
            snapshot,
            &ExportOptions::default(),
            &StubFonts,
            &mut diagnostics,
        )
        .unwrap();

        assert!(svg.contains("@font-face"));
        assert!(svg.contains("font-weight:700"));
        assert!(svg.contains("base64,AQIDBA=="));
        // The face definitions precede any drawable content.
        assert!(svg.find("@font-face").unwrap() < svg.find("<rect").unwrap());
    }

    #[test]
    fn explicit_background_color_wins() {
        let mut diagnostics = Diagnostics::new();
        let snapshot = rotterdam_snapshot().with_background_color("#101020");
        let svg = export_svg(
            snapshot,
            &coastal_options(),
            &NoEmbeddedFonts,
            &mut diagnostics,
        )
        .unwrap();
        assert!(svg.contains(r##"fill="#101020""##));
    }
}
