use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    dispatcher::WeatherDispatcher,
    error::{ProviderFetchError, RegistryError},
    location::Location,
    model::{Language, WeatherSnapshot},
    notify::Notifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// No snapshot matches the current location and provider.
    #[default]
    Stale,
    Fetching,
    Ready,
}

/// Everything a reader may observe about the weather.
///
/// `snapshot` may outlive a failed or invalidated fetch; it is only current
/// when `phase` is `Ready`.
#[derive(Debug, Clone, Default)]
pub struct WeatherState {
    pub snapshot: Option<Arc<WeatherSnapshot>>,
    pub phase: FetchPhase,
    /// Bumped by every fetch start and every invalidation.
    pub generation: u64,
}

impl WeatherState {
    pub fn is_ready(&self) -> bool {
        self.phase == FetchPhase::Ready
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The snapshot was stored and the state is ready.
    Committed,
    /// The provider failed; the previous snapshot was kept.
    Failed(ProviderFetchError),
    /// A newer fetch or an invalidation started before this one finished, so
    /// its result was dropped.
    Superseded,
    /// The fetch task panicked or was cancelled by runtime shutdown.
    Aborted,
}

/// A fetch running in the background.
#[derive(Debug)]
pub struct FetchHandle {
    generation: u64,
    handle: JoinHandle<FetchOutcome>,
}

impl FetchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn wait(self) -> FetchOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(generation = self.generation, %err, "weather fetch task failed");
                FetchOutcome::Aborted
            }
        }
    }
}

#[derive(Debug)]
pub struct WeatherStore {
    dispatcher: Arc<WeatherDispatcher>,
    location: watch::Receiver<Location>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<WeatherState>,
}

impl WeatherStore {
    pub fn new(
        dispatcher: Arc<WeatherDispatcher>,
        location: watch::Receiver<Location>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(WeatherState::default());

        Self {
            dispatcher,
            location,
            notifier,
            state,
        }
    }

    pub fn state(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    pub fn snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    pub fn dispatcher(&self) -> &Arc<WeatherDispatcher> {
        &self.dispatcher
    }

    /// Refetch weather for the current location from the active provider.
    ///
    /// Readiness is cleared before this returns; the fetch itself runs on a
    /// spawned task, so this must be called from within a Tokio runtime.
    /// Only the most recently started fetch may commit its result.
    pub fn get_all_weather(self: &Arc<Self>) -> FetchHandle {
        let location = self.location.borrow().clone();
        let fetch = self.dispatcher.get_all_weather(&location);

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.phase = FetchPhase::Fetching;
            generation = state.generation;
        });
        info!(generation, %location, "weather fetch started");

        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = fetch.await;
            store.complete(generation, result)
        });

        FetchHandle { generation, handle }
    }

    fn complete(
        &self,
        generation: u64,
        result: Result<WeatherSnapshot, ProviderFetchError>,
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::Superseded;

        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            match result {
                Ok(snapshot) => {
                    state.snapshot = Some(Arc::new(snapshot));
                    state.phase = FetchPhase::Ready;
                    outcome = FetchOutcome::Committed;
                }
                Err(err) => {
                    state.phase = FetchPhase::Stale;
                    outcome = FetchOutcome::Failed(err);
                }
            }
            true
        });

        match &outcome {
            FetchOutcome::Committed => info!(generation, "weather snapshot updated"),
            FetchOutcome::Failed(err) => {
                warn!(generation, %err, "weather fetch failed");
                self.notifier.report_error(err.user_message());
            }
            FetchOutcome::Superseded => debug!(generation, "discarding superseded weather result"),
            FetchOutcome::Aborted => {}
        }

        outcome
    }

    /// Mark the current snapshot as no longer matching the configuration.
    /// Any fetch still in flight will be discarded when it resolves.
    pub fn invalidate(&self) {
        self.state.send_modify(|state| {
            state.generation += 1;
            state.phase = FetchPhase::Stale;
        });
        debug!("weather state invalidated");
    }

    /// Select the provider for the next fetch. Does not touch the state.
    pub fn change_strategy(&self, name: &str) -> Result<(), RegistryError> {
        self.dispatcher.change_strategy(name)
    }

    /// Set the language for the next fetch. Does not touch the state.
    pub fn change_language(&self, language: Language) {
        self.dispatcher.change_language(language);
    }
}
