//! Stateful stores that keep location, weather and preferences consistent.
//!
//! `LocationStore` owns the current [`Location`](crate::Location) and
//! publishes it on a watch channel. `WeatherStore` reads that channel when it
//! fetches, and owns the snapshot plus its readiness. `SettingStore` owns the
//! preferences and pushes data-source and language changes into the
//! dispatcher through `WeatherStore`.

pub mod location;
pub mod settings;
pub mod weather;

pub use location::LocationStore;
pub use settings::{Preferences, SettingStore};
pub use weather::{FetchHandle, FetchOutcome, FetchPhase, WeatherState, WeatherStore};
