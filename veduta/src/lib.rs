#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod camera;
mod classify;
mod compose;
mod convert;
mod diagnostics;
mod export;
mod expression;
mod feature;
mod fonts;
mod mercator;
mod position;
mod primitive;
mod projector;
mod style;
mod text;
mod zoom;

pub use camera::{Bounds, Camera};
pub use classify::{classify, Bucket, ClassifiedFeatures, LandmassConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use export::{export_svg, ExportError, ExportOptions, ViewSnapshot};
pub use expression::{evaluate, Error as ExpressionError, EvalContext};
pub use feature::VisibleFeature;
pub use fonts::{FontDirectory, FontLibrary, FontRequest, FontResource, NoEmbeddedFonts};
pub use position::{lat_lon, lon_lat, Position};
pub use primitive::{CircleMark, Halo, Paint, PolygonShape, Polyline, Primitive, TextRun};
pub use projector::Projector;
pub use style::{LayerType, StyleLayer, StyleValue};
pub use zoom::InvalidZoom;
