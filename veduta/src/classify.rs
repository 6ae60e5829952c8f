//! Partition visible features into semantic buckets.
//!
//! Buckets drive the draw order of the output document. Classification is a single
//! deterministic pass: every feature lands in exactly one bucket, decided by an ordered list of
//! small rules where the first match wins.

use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostics, Stage};
use crate::feature::VisibleFeature;
use crate::position::Position;
use crate::style::LayerType;

/// Semantic group of features. The declaration order is the fallback draw order for buckets the
/// style's layer list does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Background,
    Water,
    /// Large land polygons that must render above water; see [`LandmassConfig`].
    Islands,
    Landuse,
    Roads,
    Railways,
    Buildings,
    Boundaries,
    Other,
    Labels,
    Route,
    Markers,
}

impl Bucket {
    pub(crate) const ALL: [Self; 12] = [
        Self::Background,
        Self::Water,
        Self::Islands,
        Self::Landuse,
        Self::Roads,
        Self::Railways,
        Self::Buildings,
        Self::Boundaries,
        Self::Other,
        Self::Labels,
        Self::Route,
        Self::Markers,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Water => "water",
            Self::Islands => "islands",
            Self::Landuse => "landuse",
            Self::Roads => "roads",
            Self::Railways => "railways",
            Self::Buildings => "buildings",
            Self::Boundaries => "boundaries",
            Self::Other => "other",
            Self::Labels => "labels",
            Self::Route => "route",
            Self::Markers => "markers",
        }
    }
}

/// Tuning of the landmass heuristic.
///
/// The upstream renderer paints certain large land polygons in a z-order that, flattened into a
/// static document, would put them *beneath* the water fill. Such polygons are reclassified from
/// `landuse` to `islands` so the composer can slot them right above water. The heuristic is
/// approximate by design; these constants are configuration, not a contract, and every
/// reclassification is recorded as a diagnostic.
#[derive(Debug, Clone)]
pub struct LandmassConfig {
    /// Known coastal/offshore points. A candidate polygon touching the neighborhood of any
    /// anchor is considered a landmass.
    pub anchors: Vec<Position>,
    /// Neighborhood radius around an anchor, in degrees.
    pub anchor_tolerance: f64,
    /// Vertex threshold at `base_zoom`. The effective threshold halves with every zoom level
    /// above it, since tiles carry less vertex detail when zoomed in.
    pub base_vertices: usize,
    /// Lower clamp for the effective threshold.
    pub min_vertices: usize,
    pub base_zoom: f64,
}

impl Default for LandmassConfig {
    fn default() -> Self {
        Self {
            anchors: Vec::new(),
            anchor_tolerance: 0.02,
            base_vertices: 6000,
            min_vertices: 200,
            base_zoom: 10.,
        }
    }
}

impl LandmassConfig {
    /// Effective vertex threshold at the given zoom.
    pub(crate) fn vertex_threshold(&self, zoom: f64) -> usize {
        let scaled = self.base_vertices as f64 / 2f64.powf(zoom - self.base_zoom);
        scaled.clamp(self.min_vertices as f64, self.base_vertices as f64) as usize
    }
}

/// Features partitioned into buckets, preserving the input order within each bucket.
#[derive(Debug, Default)]
pub struct ClassifiedFeatures {
    buckets: BTreeMap<Bucket, Vec<VisibleFeature>>,
}

impl ClassifiedFeatures {
    pub fn get(&self, bucket: Bucket) -> &[VisibleFeature] {
        self.buckets.get(&bucket).map_or(&[], Vec::as_slice)
    }

    pub fn feature_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Classify all features of a snapshot. Order-independent per feature, order-preserving within
/// a bucket.
pub fn classify(
    features: Vec<VisibleFeature>,
    zoom: f64,
    config: &LandmassConfig,
    diagnostics: &mut Diagnostics,
) -> ClassifiedFeatures {
    let mut classified = ClassifiedFeatures::default();
    for feature in features {
        let bucket = bucket_of(&feature, zoom, config, diagnostics);
        classified.buckets.entry(bucket).or_default().push(feature);
    }
    classified
}

fn bucket_of(
    feature: &VisibleFeature,
    zoom: f64,
    config: &LandmassConfig,
    diagnostics: &mut Diagnostics,
) -> Bucket {
    // Property tags outrank layer naming: the route overlay and its markers keep their buckets
    // no matter which synthetic layer the renderer drew them on.
    if feature.has_truthy_property("route") {
        return Bucket::Route;
    }
    if feature.has_truthy_property("marker") {
        return Bucket::Markers;
    }

    match bucket_hint(
        &feature.layer_id,
        feature.source_layer.as_deref(),
        feature.layer_type,
    ) {
        Some(Bucket::Landuse) if is_landmass(feature, zoom, config) => {
            diagnostics.note(
                Stage::Classify,
                format!(
                    "'{}' reclassified landuse -> islands ({} vertices)",
                    feature.layer_id,
                    feature.exterior_vertex_count()
                ),
            );
            Bucket::Islands
        }
        Some(bucket) => bucket,
        None => Bucket::Other,
    }
}

/// Ordered naming rules; the first whose keyword occurs in the layer id or source-layer name
/// decides the bucket. Rail goes before road so that "railroad" does not end up with the
/// streets.
const NAMING_RULES: &[(&[&str], Bucket)] = &[
    (&["route"], Bucket::Route),
    (&["marker", "pin"], Bucket::Markers),
    (&["water", "ocean"], Bucket::Water),
    (&["rail", "transit"], Bucket::Railways),
    (
        &["road", "street", "highway", "motorway", "bridge", "tunnel"],
        Bucket::Roads,
    ),
    (&["building"], Bucket::Buildings),
    (
        &["landuse", "landcover", "land", "park", "grass", "wood", "sand", "natural"],
        Bucket::Landuse,
    ),
    (&["admin", "boundar", "border"], Bucket::Boundaries),
    (
        &["label", "place", "poi", "text", "shield", "housenum"],
        Bucket::Labels,
    ),
];

/// Bucket a layer maps to, judged by its id, source-layer name and type alone. Shared between
/// the classifier and the composer's layer-order walk, so both agree on what belongs where.
pub(crate) fn bucket_hint(
    layer_id: &str,
    source_layer: Option<&str>,
    layer_type: LayerType,
) -> Option<Bucket> {
    let id = layer_id.to_ascii_lowercase();
    let source = source_layer.map(str::to_ascii_lowercase).unwrap_or_default();

    for (keywords, bucket) in NAMING_RULES {
        if keywords
            .iter()
            .any(|keyword| id.contains(keyword) || source.contains(keyword))
        {
            return Some(*bucket);
        }
    }

    // Unnamed layers still classify by their type.
    match layer_type {
        LayerType::Symbol => Some(Bucket::Labels),
        LayerType::Background => Some(Bucket::Background),
        _ => None,
    }
}

/// Land classes that mark a polygon as actual landmass rather than an overlay.
const LAND_KINDS: [&str; 10] = [
    "grass",
    "park",
    "land",
    "residential",
    "forest",
    "wood",
    "meadow",
    "recreation_ground",
    "scrub",
    "cemetery",
];

fn is_landmass(feature: &VisibleFeature, zoom: f64, config: &LandmassConfig) -> bool {
    if !feature.is_polygonal() {
        return false;
    }
    if feature.exterior_vertex_count() <= config.vertex_threshold(zoom) {
        return false;
    }

    near_anchor(feature, config) || has_land_kind(feature)
}

fn near_anchor(feature: &VisibleFeature, config: &LandmassConfig) -> bool {
    config.anchors.iter().any(|anchor| {
        feature.any_exterior_coord(|lon, lat| {
            (lon - anchor.x()).abs() <= config.anchor_tolerance
                && (lat - anchor.y()).abs() <= config.anchor_tolerance
        })
    })
}

fn has_land_kind(feature: &VisibleFeature) -> bool {
    ["class", "type", "kind", "subclass"].iter().any(|key| {
        feature
            .property_str(key)
            .is_some_and(|value| LAND_KINDS.contains(&value))
    })
}
