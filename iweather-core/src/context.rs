use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    dispatcher::WeatherDispatcher,
    error::RegistryError,
    geocode::Geocoder,
    location::Location,
    notify::Notifier,
    storage::KeyValueStore,
    store::{LocationStore, SettingStore, WeatherStore},
};

/// Collaborators the stores are built from.
#[derive(Debug)]
pub struct AppContext {
    pub dispatcher: Arc<WeatherDispatcher>,
    pub storage: Arc<dyn KeyValueStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub notifier: Arc<dyn Notifier>,
    pub initial_location: Location,
}

/// The three stores wired together.
#[derive(Debug)]
pub struct App {
    pub location: LocationStore,
    pub weather: Arc<WeatherStore>,
    pub settings: SettingStore,
}

impl App {
    /// Wire the stores and load persisted preferences into the dispatcher.
    /// No fetch is started.
    pub fn compose(ctx: AppContext) -> Result<Self, RegistryError> {
        let (location_tx, location_rx) = watch::channel(ctx.initial_location);

        let weather = Arc::new(WeatherStore::new(
            ctx.dispatcher,
            location_rx,
            Arc::clone(&ctx.notifier),
        ));
        let location = LocationStore::new(
            location_tx,
            Arc::clone(&weather),
            ctx.geocoder,
            ctx.notifier,
        );
        let settings = SettingStore::load(ctx.storage, Arc::clone(&weather))?;

        Ok(Self {
            location,
            weather,
            settings,
        })
    }
}
