//! Project the lat/lon coordinates into a 2D x/y using the Web Mercator.
//! <https://en.wikipedia.org/wiki/Web_Mercator_projection>

use crate::position::{lon_lat, Position};
use std::f64::consts::PI;

/// Size of a single tile in pixels. Most tile sources use 256px tiles, and the zoom scale of
/// the camera is expressed in terms of them.
const TILE_SIZE: u32 = 256;

/// Zoom specifies how many pixels are in the whole map. For example, zoom 0 means that the whole
/// map is just one 256x256 tile, zoom 1 means that it is 2x2 tiles, and so on.
pub(crate) fn total_pixels(zoom: f64) -> f64 {
    2f64.powf(zoom) * (TILE_SIZE as f64)
}

/// Project the position into the Mercator projection and normalize it to 0-1 range.
fn mercator_normalized(position: Position) -> (f64, f64) {
    // Project into Mercator (cylindrical map projection).
    let x = position.x().to_radians();
    let y = position.y().to_radians().tan().asinh();

    // Scale both x and y to 0-1 range.
    let x = (1. + (x / PI)) / 2.;
    let y = (1. - (y / PI)) / 2.;

    (x, y)
}

/// Location projected on the "world bitmap" made of map tiles.
pub(crate) type Pixels = geo_types::Point;

/// Project geographical position into a 2D plane using Mercator.
pub(crate) fn project(position: Position, zoom: f64) -> Pixels {
    let total_pixels = total_pixels(zoom);
    let (x, y) = mercator_normalized(position);
    Pixels::new(x * total_pixels, y * total_pixels)
}

/// Transforms pixels on the "world bitmap" back into a geographical position.
pub(crate) fn unproject(pixels: Pixels, zoom: f64) -> Position {
    let number_of_pixels = total_pixels(zoom);

    let lon = pixels.x();
    let lon = lon / number_of_pixels;
    let lon = (lon * 2. - 1.) * PI;
    let lon = lon.to_degrees();

    let lat = pixels.y();
    let lat = lat / number_of_pixels;
    let lat = (-lat * 2. + 1.) * PI;
    let lat = lat.sinh().atan().to_degrees();

    lon_lat(lon, lat)
}
