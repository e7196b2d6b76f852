//! Registry of named weather providers with one active selection.
//!
//! Registration happens in two phases. While building, re-registering a name
//! replaces the earlier provider. Once built, the set of names only grows and
//! a second registration under an existing name is an error.

use std::{collections::BTreeMap, future::Future, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::{
    error::{ProviderFetchError, RegistryError},
    location::Location,
    model::{Language, WeatherSnapshot},
    provider::WeatherProvider,
};

#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    providers: BTreeMap<String, Arc<dyn WeatherProvider>>,
    language: Language,
}

impl DispatcherBuilder {
    pub fn register(
        self,
        name: impl Into<String>,
        provider: impl WeatherProvider + 'static,
    ) -> Self {
        self.register_shared(name, Arc::new(provider))
    }

    pub fn register_boxed(
        self,
        name: impl Into<String>,
        provider: Box<dyn WeatherProvider>,
    ) -> Self {
        self.register_shared(name, Arc::from(provider))
    }

    /// Register a provider the caller keeps a handle to.
    pub fn register_shared(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        let name = name.into();
        if self.providers.insert(name.clone(), provider).is_some() {
            debug!(provider = %name, "replacing provider registered earlier during startup");
        }
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Finish registration with `active` selected.
    pub fn build(self, active: &str) -> Result<WeatherDispatcher, RegistryError> {
        let provider = self
            .providers
            .get(active)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProvider {
                name: active.to_string(),
                registered: self.providers.keys().cloned().collect(),
            })?;

        info!(
            active,
            providers = self.providers.len(),
            language = %self.language,
            "weather dispatcher ready"
        );

        Ok(WeatherDispatcher {
            inner: RwLock::new(Inner {
                providers: self.providers,
                active: (active.to_string(), provider),
                language: self.language,
            }),
        })
    }
}

#[derive(Debug)]
struct Inner {
    providers: BTreeMap<String, Arc<dyn WeatherProvider>>,
    /// Name and instance of the selected provider; the name is always a key
    /// of `providers`.
    active: (String, Arc<dyn WeatherProvider>),
    language: Language,
}

/// Delegates fetches to whichever registered provider is active.
#[derive(Debug)]
pub struct WeatherDispatcher {
    inner: RwLock<Inner>,
}

impl WeatherDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Add a provider after startup.
    pub fn register(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut inner = self.inner.write();

        if inner.providers.contains_key(&name) {
            error!(provider = %name, "provider registered twice");
            return Err(RegistryError::DuplicateProvider(name));
        }

        info!(provider = %name, "provider registered");
        inner.providers.insert(name, provider);
        Ok(())
    }

    /// Fetch weather for `location` from the active provider.
    ///
    /// The provider and language are captured when this is called, so a
    /// strategy or language change made while the returned future is pending
    /// only affects later calls.
    pub fn get_all_weather(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<WeatherSnapshot, ProviderFetchError>> + Send + use<> {
        let (name, provider, language) = {
            let inner = self.inner.read();
            let (name, provider) = &inner.active;
            (name.clone(), Arc::clone(provider), inner.language)
        };
        let location = location.clone();

        debug!(provider = %name, %language, %location, "dispatching weather fetch");

        async move { provider.fetch(&location, language).await }
    }

    /// Select the provider used by subsequent fetches.
    pub fn change_strategy(&self, name: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();

        let Some(provider) = inner.providers.get(name).cloned() else {
            let err = RegistryError::UnknownProvider {
                name: name.to_string(),
                registered: inner.providers.keys().cloned().collect(),
            };
            error!(%err, "refusing to switch weather provider");
            return Err(err);
        };

        if inner.active.0 != name {
            info!(from = %inner.active.0, to = name, "weather provider switched");
        }
        inner.active = (name.to_string(), provider);
        Ok(())
    }

    /// Set the language applied to subsequent fetches.
    pub fn change_language(&self, language: Language) {
        let mut inner = self.inner.write();
        if inner.language != language {
            info!(from = %inner.language, to = %language, "weather language switched");
        }
        inner.language = language;
    }

    pub fn active_name(&self) -> String {
        self.inner.read().active.0.clone()
    }

    pub fn language(&self) -> Language {
        self.inner.read().language
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().providers.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn provider_names(&self) -> Vec<String> {
        self.inner.read().providers.keys().cloned().collect()
    }
}
