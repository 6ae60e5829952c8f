//! Frozen camera state of the live view.

use crate::mercator;
use crate::position::{lon_lat, Position};
use crate::zoom::{InvalidZoom, Zoom};

/// Camera state captured once at the start of an export.
///
/// The export pipeline never reads the live view again; if the user pans or zooms while an export
/// is running, the in-flight export keeps rendering the state captured here.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    center: Position,
    zoom: Zoom,
    bearing: f64,
    pitch: f64,
    viewport: (u32, u32),
}

impl Camera {
    /// Capture a camera. `viewport` is the on-screen size of the view in pixels.
    pub fn new(center: Position, zoom: f64, viewport: (u32, u32)) -> Result<Self, InvalidZoom> {
        Ok(Self {
            center,
            zoom: Zoom::try_from(zoom)?,
            bearing: 0.,
            pitch: 0.,
            viewport,
        })
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.into()
    }

    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Geographic rectangle visible in the viewport, obtained by unprojecting the viewport
    /// corners through the Mercator projection.
    pub fn bounds(&self) -> Bounds {
        let zoom = self.zoom();
        let center = mercator::project(self.center, zoom);
        let half_width = self.viewport.0 as f64 / 2.;
        let half_height = self.viewport.1 as f64 / 2.;

        let north_west = mercator::unproject(
            mercator::Pixels::new(center.x() - half_width, center.y() - half_height),
            zoom,
        );
        let south_east = mercator::unproject(
            mercator::Pixels::new(center.x() + half_width, center.y() + half_height),
            zoom,
        );

        Bounds {
            west: north_west.x(),
            north: north_west.y(),
            east: south_east.x(),
            south: south_east.y(),
        }
    }
}

/// Geographic rectangle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn north_west(&self) -> Position {
        lon_lat(self.west, self.north)
    }

    pub fn south_east(&self) -> Position {
        lon_lat(self.east, self.south)
    }

    /// True when the rectangle has no area along either axis. Such bounds cannot be used for a
    /// linear projection and callers must fall back to the document midpoint.
    pub fn is_degenerate(&self) -> bool {
        self.east == self.west || self.north == self.south
    }
}
