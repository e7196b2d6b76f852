use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    error::GeolocationError,
    geocode::Geocoder,
    location::{Location, RawPosition},
    notify::Notifier,
    store::weather::{FetchHandle, WeatherStore},
};

/// Owns the current location. Every change triggers a weather refetch.
#[derive(Debug)]
pub struct LocationStore {
    current: watch::Sender<Location>,
    weather: Arc<WeatherStore>,
    geocoder: Arc<dyn Geocoder>,
    notifier: Arc<dyn Notifier>,
}

impl LocationStore {
    /// `current` must be the sender whose receiver was given to `weather`.
    pub fn new(
        current: watch::Sender<Location>,
        weather: Arc<WeatherStore>,
        geocoder: Arc<dyn Geocoder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            current,
            weather,
            geocoder,
            notifier,
        }
    }

    pub fn current(&self) -> Location {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Location> {
        self.current.subscribe()
    }

    /// Replace the location and start a refetch for it.
    ///
    /// Invalid coordinates leave both location and weather untouched.
    pub fn change_location(&self, raw: RawPosition) -> Result<FetchHandle, GeolocationError> {
        let location = Location::try_from(raw)?;

        info!(%location, "location changed");
        self.current.send_replace(location);

        Ok(self.weather.get_all_weather())
    }

    /// Resolve the device position and switch to it.
    ///
    /// On failure the user is notified and `None` is returned; the previous
    /// location and snapshot stay as they were.
    pub async fn get_location(&self) -> Option<FetchHandle> {
        let resolved = self
            .geocoder
            .resolve_current_position()
            .await
            .and_then(|raw| self.change_location(raw));

        match resolved {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(%err, "could not resolve current position");
                self.notifier.report_error(err.user_message());
                None
            }
        }
    }
}
