//! Projects geographical positions onto the output document.

use crate::camera::Bounds;
use crate::position::{lon_lat, Position};

/// Linear map from a geographic rectangle onto a document of the given pixel size.
///
/// The bounds must come from the exact viewport corners (see [`crate::Camera::bounds`]) so the
/// framing of the document matches the on-screen view. Latitude increases northwards but document
/// y grows downwards, so the vertical axis is inverted.
#[derive(Debug, Clone)]
pub struct Projector {
    bounds: Bounds,
    width: f64,
    height: f64,
}

impl Projector {
    pub fn new(bounds: Bounds, output_size: (u32, u32)) -> Self {
        Self {
            bounds,
            width: output_size.0 as f64,
            height: output_size.1 as f64,
        }
    }

    /// Document x of a longitude.
    pub fn x(&self, lon: f64) -> f64 {
        if self.bounds.east == self.bounds.west {
            // Degenerate bounds: everything lands in the middle instead of dividing by zero.
            self.width / 2.
        } else {
            (lon - self.bounds.west) / (self.bounds.east - self.bounds.west) * self.width
        }
    }

    /// Document y of a latitude.
    pub fn y(&self, lat: f64) -> f64 {
        if self.bounds.north == self.bounds.south {
            self.height / 2.
        } else {
            (self.bounds.north - lat) / (self.bounds.north - self.bounds.south) * self.height
        }
    }

    /// Project `position` into document pixels.
    pub fn project(&self, position: Position) -> (f64, f64) {
        (self.x(position.x()), self.y(position.y()))
    }

    /// Geographic position of a document pixel. Inverse of [`Self::project`] for non-degenerate
    /// bounds.
    pub fn unproject(&self, x: f64, y: f64) -> Position {
        let lon = self.bounds.west + x / self.width * (self.bounds.east - self.bounds.west);
        let lat = self.bounds.north - y / self.height * (self.bounds.north - self.bounds.south);
        lon_lat(lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            west: 4.4,
            south: 51.88,
            east: 4.56,
            north: 51.96,
        }
    }

    #[test]
    fn corners_map_to_corners() {
        let projector = Projector::new(bounds(), (1024, 768));

        let (x, y) = projector.project(lon_lat(4.4, 51.96));
        approx::assert_relative_eq!(x, 0.);
        approx::assert_relative_eq!(y, 0.);

        let (x, y) = projector.project(lon_lat(4.56, 51.88));
        approx::assert_relative_eq!(x, 1024.);
        approx::assert_relative_eq!(y, 768.);
    }

    #[test]
    fn north_is_up() {
        let projector = Projector::new(bounds(), (1024, 768));
        assert!(projector.y(51.95) < projector.y(51.89));
    }

    #[test]
    fn unproject_is_inverse_of_project() {
        let projector = Projector::new(bounds(), (1024, 768));
        let original = lon_lat(4.478, 51.9123);

        let (x, y) = projector.project(original);
        let unprojected = projector.unproject(x, y);

        approx::assert_relative_eq!(original.x(), unprojected.x(), max_relative = 1e-12);
        approx::assert_relative_eq!(original.y(), unprojected.y(), max_relative = 1e-12);
    }

    #[test]
    fn degenerate_bounds_project_to_the_midpoint() {
        let flat = Bounds {
            west: 4.5,
            south: 51.88,
            east: 4.5,
            north: 51.96,
        };
        let projector = Projector::new(flat, (1024, 768));

        approx::assert_relative_eq!(projector.x(4.5), 512.);
        approx::assert_relative_eq!(projector.x(100.), 512.);
        // Latitude axis is intact.
        approx::assert_relative_eq!(projector.y(51.96), 0.);
    }
}
