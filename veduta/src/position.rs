//! Types and functions for working with positions.

/// Geographical position with latitude and longitude.
pub type Position = geo_types::Point;

/// Construct `Position` from latitude and longitude.
pub fn lat_lon(lat: f64, lon: f64) -> Position {
    Position::new(lon, lat)
}

/// Construct `Position` from longitude and latitude. Note that it is common standard to write
/// coordinates starting with the latitude instead (e.g. `51.9225, 4.47917` is the center of
/// Rotterdam).
pub fn lon_lat(lon: f64, lat: f64) -> Position {
    Position::new(lon, lat)
}
