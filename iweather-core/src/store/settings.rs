use std::sync::Arc;

use chrono::{Local, Timelike};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::{
    error::{RegistryError, SettingsError},
    model::Language,
    storage::{DATA_SOURCE_KEY, KeyValueStore, LANGUAGE_KEY, THEME_KEY},
    store::weather::WeatherStore,
    theme::{Appearance, Theme},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    /// Always the name of a registered provider.
    pub data_source: String,
    pub language: Language,
}

#[derive(Debug)]
struct State {
    prefs: Preferences,
    appearance: Appearance,
}

/// Owns user preferences. Each setter writes through to storage and pushes
/// data-source and language changes into the weather dispatcher.
///
/// A setter that changes the data source or language marks the weather state
/// stale but does not refetch; the next location change or explicit refresh
/// does that.
#[derive(Debug)]
pub struct SettingStore {
    storage: Arc<dyn KeyValueStore>,
    weather: Arc<WeatherStore>,
    state: RwLock<State>,
}

impl SettingStore {
    /// Read persisted preferences and apply them to the dispatcher.
    ///
    /// Missing, unreadable or unrecognised values fall back to defaults; a
    /// persisted data source that is not registered falls back to the
    /// dispatcher's current provider.
    pub fn load(
        storage: Arc<dyn KeyValueStore>,
        weather: Arc<WeatherStore>,
    ) -> Result<Self, RegistryError> {
        let theme = read(storage.as_ref(), THEME_KEY)
            .and_then(|v| v.parse::<Theme>().ok())
            .unwrap_or_default();

        let dispatcher = weather.dispatcher();
        let data_source = match read(storage.as_ref(), DATA_SOURCE_KEY) {
            Some(name) if dispatcher.contains(&name) => name,
            Some(name) => {
                warn!(data_source = %name, "persisted data source is not registered, using default");
                dispatcher.active_name()
            }
            None => dispatcher.active_name(),
        };

        let language = read(storage.as_ref(), LANGUAGE_KEY)
            .and_then(|v| Language::parse(&v))
            .unwrap_or_default();

        let changed = dispatcher.active_name() != data_source || dispatcher.language() != language;
        weather.change_strategy(&data_source)?;
        weather.change_language(language);
        if changed {
            weather.invalidate();
        }

        let appearance = theme.resolve(Local::now().hour());
        info!(%theme, %data_source, %language, "preferences loaded");

        Ok(Self {
            storage,
            weather,
            state: RwLock::new(State {
                prefs: Preferences {
                    theme,
                    data_source,
                    language,
                },
                appearance,
            }),
        })
    }

    pub fn preferences(&self) -> Preferences {
        self.state.read().prefs.clone()
    }

    pub fn appearance(&self) -> Appearance {
        self.state.read().appearance
    }

    /// Set the theme, resolving `autoMode` against the local clock.
    pub fn set_theme(&self, theme: Theme) -> Result<Appearance, SettingsError> {
        self.set_theme_at(theme, Local::now().hour())
    }

    /// Set the theme, resolving `autoMode` against `hour` (0-23).
    pub fn set_theme_at(&self, theme: Theme, hour: u32) -> Result<Appearance, SettingsError> {
        let appearance = theme.resolve(hour);
        {
            let mut state = self.state.write();
            state.prefs.theme = theme;
            state.appearance = appearance;
        }
        info!(%theme, ?appearance, "theme set");

        self.persist(THEME_KEY, theme.as_str())?;
        Ok(appearance)
    }

    /// Switch the weather provider. An unregistered name changes nothing.
    pub fn set_data_source(&self, name: &str) -> Result<(), SettingsError> {
        // Compared against the dispatcher, which `WeatherStore` may have
        // switched behind this store's back.
        let changed = self.weather.dispatcher().active_name() != name;
        self.weather.change_strategy(name)?;

        self.state.write().prefs.data_source = name.to_string();
        if changed {
            self.weather.invalidate();
        }

        self.persist(DATA_SOURCE_KEY, name)
    }

    pub fn set_language(&self, language: Language) -> Result<(), SettingsError> {
        let changed = self.weather.dispatcher().language() != language;
        self.weather.change_language(language);

        self.state.write().prefs.language = language;
        if changed {
            self.weather.invalidate();
        }

        self.persist(LANGUAGE_KEY, language.display_name())
    }

    fn persist(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.storage.set(key, value).map_err(|err| {
            warn!(key, %err, "failed to persist preference");
            SettingsError::from(err)
        })
    }
}

fn read(storage: &dyn KeyValueStore, key: &str) -> Option<String> {
    storage.get(key).unwrap_or_else(|err| {
        warn!(key, %err, "failed to read preference, using default");
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatcher::{WeatherDispatcher, tests::StubProvider},
        error::StorageError,
        location::Location,
        notify::RecordingNotifier,
        storage::MemoryStore,
        store::{FetchOutcome, FetchPhase},
    };
    use tokio::sync::watch;

    /// Store whose writes always fail.
    #[derive(Debug, Default)]
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".into()))
        }
    }

    fn weather_store() -> Arc<WeatherStore> {
        let dispatcher = WeatherDispatcher::builder()
            .register("providerA", StubProvider::new("providerA", 1.0))
            .register("providerB", StubProvider::new("providerB", 2.0))
            .build("providerA")
            .expect("registered");
        let (_tx, rx) = watch::channel(Location::default());
        Arc::new(WeatherStore::new(
            Arc::new(dispatcher),
            rx,
            Arc::new(RecordingNotifier::new()),
        ))
    }

    #[test]
    fn load_defaults_when_storage_is_empty() {
        let storage = Arc::new(MemoryStore::new());
        let settings = SettingStore::load(storage, weather_store()).expect("load");

        let prefs = settings.preferences();
        assert_eq!(prefs.theme, Theme::LightMode);
        assert_eq!(prefs.data_source, "providerA");
        assert_eq!(prefs.language, Language::SimplifiedChinese);
        assert_eq!(settings.appearance(), Appearance::Light);
    }

    #[test]
    fn load_applies_persisted_values_to_dispatcher() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(THEME_KEY, "darkMode").expect("set");
        storage.set(DATA_SOURCE_KEY, "providerB").expect("set");
        storage.set(LANGUAGE_KEY, "English").expect("set");

        let weather = weather_store();
        let settings = SettingStore::load(storage, weather.clone()).expect("load");

        assert_eq!(settings.preferences().theme, Theme::DarkMode);
        assert_eq!(weather.dispatcher().active_name(), "providerB");
        assert_eq!(weather.dispatcher().language(), Language::English);
    }

    #[test]
    fn load_ignores_unregistered_data_source() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(DATA_SOURCE_KEY, "gone").expect("set");

        let settings = SettingStore::load(storage, weather_store()).expect("load");
        assert_eq!(settings.preferences().data_source, "providerA");
    }

    #[test]
    fn set_data_source_switches_dispatcher_and_persists() {
        let storage = Arc::new(MemoryStore::new());
        let weather = weather_store();
        let settings = SettingStore::load(storage.clone(), weather.clone()).expect("load");

        settings.set_data_source("providerB").expect("registered");

        assert_eq!(weather.dispatcher().active_name(), "providerB");
        assert_eq!(
            storage.get(DATA_SOURCE_KEY).expect("get").as_deref(),
            Some("providerB")
        );
        assert_eq!(settings.preferences().data_source, "providerB");
    }

    #[test]
    fn set_data_source_rejects_unknown_provider() {
        let storage = Arc::new(MemoryStore::new());
        let weather = weather_store();
        let settings = SettingStore::load(storage.clone(), weather.clone()).expect("load");

        let err = settings.set_data_source("providerZ").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Registry(RegistryError::UnknownProvider { .. })
        ));
        assert_eq!(weather.dispatcher().active_name(), "providerA");
        assert_eq!(storage.get(DATA_SOURCE_KEY).expect("get"), None);
    }

    #[tokio::test]
    async fn switching_source_marks_ready_snapshot_stale() {
        let weather = weather_store();
        let settings =
            SettingStore::load(Arc::new(MemoryStore::new()), weather.clone()).expect("load");

        assert_eq!(weather.get_all_weather().wait().await, FetchOutcome::Committed);
        assert!(weather.is_ready());

        settings.set_data_source("providerB").expect("registered");
        assert_eq!(weather.state().phase, FetchPhase::Stale);

        weather.get_all_weather().wait().await;
        assert_eq!(weather.snapshot().expect("snapshot").provider, "providerB");
    }

    #[tokio::test]
    async fn returning_to_preferred_source_invalidates_foreign_snapshot() {
        let weather = weather_store();
        let settings =
            SettingStore::load(Arc::new(MemoryStore::new()), weather.clone()).expect("load");

        weather.change_strategy("providerB").expect("registered");
        assert_eq!(weather.get_all_weather().wait().await, FetchOutcome::Committed);
        assert!(weather.is_ready());

        settings.set_data_source("providerA").expect("registered");

        assert_eq!(weather.dispatcher().active_name(), "providerA");
        assert!(!weather.is_ready());
        assert_eq!(weather.snapshot().expect("kept").provider, "providerB");
    }

    #[tokio::test]
    async fn returning_to_preferred_language_invalidates_snapshot() {
        let weather = weather_store();
        let settings =
            SettingStore::load(Arc::new(MemoryStore::new()), weather.clone()).expect("load");

        weather.change_language(Language::English);
        weather.get_all_weather().wait().await;
        assert!(weather.is_ready());

        settings
            .set_language(Language::SimplifiedChinese)
            .expect("persist");
        assert!(!weather.is_ready());
    }

    #[tokio::test]
    async fn load_invalidates_snapshot_when_it_switches_provider() {
        let weather = weather_store();
        weather.get_all_weather().wait().await;
        assert!(weather.is_ready());

        let storage = Arc::new(MemoryStore::new());
        storage.set(DATA_SOURCE_KEY, "providerB").expect("set");
        SettingStore::load(storage, weather.clone()).expect("load");

        assert_eq!(weather.dispatcher().active_name(), "providerB");
        assert!(!weather.is_ready());
    }

    #[tokio::test]
    async fn load_keeps_snapshot_when_nothing_changes() {
        let weather = weather_store();
        weather.get_all_weather().wait().await;

        SettingStore::load(Arc::new(MemoryStore::new()), weather.clone()).expect("load");
        assert!(weather.is_ready());
    }

    #[test]
    fn propagation_happens_even_when_persistence_fails() {
        let weather = weather_store();
        let settings = SettingStore::load(Arc::new(ReadOnlyStore), weather.clone()).expect("load");

        let err = settings.set_language(Language::English).unwrap_err();
        assert!(matches!(err, SettingsError::Storage(_)));
        assert_eq!(weather.dispatcher().language(), Language::English);
        assert_eq!(settings.preferences().language, Language::English);

        assert!(settings.set_data_source("providerB").is_err());
        assert_eq!(weather.dispatcher().active_name(), "providerB");
    }

    #[test]
    fn auto_theme_resolves_from_hour() {
        let storage = Arc::new(MemoryStore::new());
        let settings = SettingStore::load(storage.clone(), weather_store()).expect("load");

        assert_eq!(
            settings.set_theme_at(Theme::AutoMode, 20).expect("persist"),
            Appearance::Dark
        );
        assert_eq!(settings.appearance(), Appearance::Dark);
        assert_eq!(
            settings.set_theme_at(Theme::AutoMode, 6).expect("persist"),
            Appearance::Light
        );
        assert_eq!(storage.get(THEME_KEY).expect("get").as_deref(), Some("autoMode"));
    }
}
