//! Core library for the `iweather` app.
//!
//! This crate defines:
//! - The location entity and the normalized weather snapshot
//! - The weather provider abstraction, built-in providers and the dispatcher
//! - Stores that keep location, weather and preferences consistent
//! - Collaborator seams (persistence, geocoding, notifications, accounts)
//! - Configuration & credentials handling
//!
//! It is used by `iweather-cli`, but any front end can compose the stores
//! through [`App::compose`].

pub mod auth;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod geocode;
pub mod location;
pub mod model;
pub mod notify;
pub mod provider;
pub mod storage;
pub mod store;
pub mod theme;

pub use config::{Config, ProviderConfig};
pub use context::{App, AppContext};
pub use dispatcher::{DispatcherBuilder, WeatherDispatcher};
pub use error::{
    AuthError, GeolocationError, ProviderFetchError, RegistryError, SettingsError, StorageError,
};
pub use location::{Location, RawPosition};
pub use model::{CurrentConditions, DailyForecast, HourlyForecast, Language, WeatherSnapshot};
pub use provider::{ProviderId, WeatherProvider};
pub use store::{FetchHandle, FetchOutcome, FetchPhase, LocationStore, SettingStore, WeatherStore};
pub use theme::{Appearance, Theme, derive_theme};
