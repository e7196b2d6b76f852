use async_trait::async_trait;

use crate::{error::GeolocationError, location::RawPosition};

/// Resolves the device's current position to coordinates and an address.
#[async_trait]
pub trait Geocoder: Send + Sync + std::fmt::Debug {
    async fn resolve_current_position(&self) -> Result<RawPosition, GeolocationError>;
}

/// Answers with a position fixed at construction, or a fixed failure.
#[derive(Debug, Clone)]
pub struct FixedGeocoder {
    answer: Result<RawPosition, GeolocationError>,
}

impl FixedGeocoder {
    pub fn new(position: RawPosition) -> Self {
        Self {
            answer: Ok(position),
        }
    }

    pub fn failing(err: GeolocationError) -> Self {
        Self { answer: Err(err) }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn resolve_current_position(&self) -> Result<RawPosition, GeolocationError> {
        self.answer.clone()
    }
}
