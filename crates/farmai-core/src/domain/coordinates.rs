use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Validated WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::InvalidCoordinates {
                reason: format!("latitude must be between -90 and 90, got {latitude}"),
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinates {
                reason: format!("longitude must be between -180 and 180, got {longitude}"),
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse path segments such as `"51.5"` and `"-0.09"`.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, ValidationError> {
        let lat = parse_component("latitude", latitude)?;
        let lon = parse_component("longitude", longitude)?;
        Self::new(lat, lon)
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

fn parse_component(name: &str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidCoordinates {
            reason: format!("{name} must be a number, got '{raw}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_coordinates() {
        let at = Coordinates::parse("51.5", "-0.09").expect("valid coordinates");
        assert_eq!(at.latitude(), 51.5);
        assert_eq!(at.longitude(), -0.09);
    }

    #[test]
    fn accepts_range_edges() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = Coordinates::new(90.5, 0.0).expect_err("must fail");
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        let err = Coordinates::new(0.0, -180.01).expect_err("must fail");
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn rejects_non_numeric_and_non_finite_input() {
        assert!(Coordinates::parse("north", "0").is_err());
        assert!(Coordinates::parse("NaN", "0").is_err());
        assert!(Coordinates::parse("0", "inf").is_err());
    }
}
