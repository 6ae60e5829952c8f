#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid zoom level")]
pub struct InvalidZoom;

/// Map zoom level, validated to the range vector styles are defined for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f64);

impl TryFrom<f64> for Zoom {
    type Error = InvalidZoom;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        // Vector styles define layers up to zoom 24.
        // https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames#Zoom_levels
        if !(0. ..=24.).contains(&value) || !value.is_finite() {
            Err(InvalidZoom)
        } else {
            Ok(Self(value))
        }
    }
}

// The reverse shouldn't be implemented, since we already have TryFrom<f64>.
#[allow(clippy::from_over_into)]
impl Into<f64> for Zoom {
    fn into(self) -> f64 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(16.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructing_zoom() {
        assert_eq!(16., Into::<f64>::into(Zoom::default()));
        assert_eq!(24., Into::<f64>::into(Zoom::try_from(24.).unwrap()));
        assert_eq!(InvalidZoom, Zoom::try_from(25.).unwrap_err());
        assert_eq!(InvalidZoom, Zoom::try_from(-1.).unwrap_err());
        assert_eq!(InvalidZoom, Zoom::try_from(f64::NAN).unwrap_err());
    }
}
