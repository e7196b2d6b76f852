use serde::{Deserialize, Serialize};

use crate::error::GeolocationError;

/// A position as reported by the geocoding collaborator, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub address: String,
}

/// Geographic point plus its human-readable address.
///
/// Fields are private: a `Location` is only built whole, from a validated
/// [`RawPosition`], and replaced rather than edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    city: String,
    address: String,
}

impl Location {
    pub fn new(
        latitude: f64,
        longitude: f64,
        city: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, GeolocationError> {
        let valid_lat = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let valid_lon = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !valid_lat || !valid_lon {
            return Err(GeolocationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
            city: city.into(),
            address: address.into(),
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Default for Location {
    /// Tiananmen, Beijing.
    fn default() -> Self {
        Self {
            latitude: 39.9087,
            longitude: 116.3974,
            city: "北京市".to_string(),
            address: "天安门".to_string(),
        }
    }
}

impl TryFrom<RawPosition> for Location {
    type Error = GeolocationError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Location::new(raw.latitude, raw.longitude, raw.city, raw.address)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({:.4}, {:.4})",
            self.city, self.address, self.latitude, self.longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_tiananmen() {
        let loc = Location::default();
        assert_eq!(loc.latitude(), 39.9087);
        assert_eq!(loc.longitude(), 116.3974);
        assert_eq!(loc.city(), "北京市");
        assert_eq!(loc.address(), "天安门");
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let err = Location::new(91.0, 0.0, "x", "y").unwrap_err();
        assert!(matches!(err, GeolocationError::InvalidCoordinates { .. }));

        assert!(Location::new(0.0, -180.5, "x", "y").is_err());
        assert!(Location::new(f64::NAN, 0.0, "x", "y").is_err());
    }

    #[test]
    fn converts_from_raw_position() {
        let raw = RawPosition {
            latitude: 31.2304,
            longitude: 121.4737,
            city: "上海市".into(),
            address: "外滩".into(),
        };
        let loc = Location::try_from(raw).expect("valid position");
        assert_eq!(loc.city(), "上海市");
        assert_eq!(loc.longitude(), 121.4737);
    }
}
