use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password};
use iweather_core::{
    App, AppContext, Config, FetchOutcome, Language, ProviderId, RawPosition, Theme,
    geocode::FixedGeocoder,
    notify::{Notifier, RecordingNotifier},
    storage::FileStore,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "iweather", version, about = "Weather at your location")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider name, e.g. "qWeather" or "openWeather".
        provider: String,
    },

    /// Show weather for the configured location or the given coordinates.
    Show {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// City name shown alongside the coordinates.
        #[arg(long, default_value = "")]
        city: String,

        /// Address shown alongside the coordinates.
        #[arg(long, default_value = "")]
        address: String,

        /// Resolve the current position first.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        here: bool,

        /// Number of forecast days to print.
        #[arg(long, default_value_t = 3)]
        days: usize,
    },

    /// Inspect or change preferences.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the current preferences.
    Show,

    /// lightMode, darkMode, systemMode or autoMode.
    Theme { theme: Theme },

    /// Registered provider name.
    Source { name: String },

    /// 简体中文, 繁體中文 or English (codes zh, zh-hant, en also accepted).
    Language { language: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show {
                lat,
                lon,
                city,
                address,
                here,
                days,
            } => {
                let (app, notifier) = compose()?;

                let handle = match (lat, lon) {
                    (Some(latitude), Some(longitude)) => {
                        let raw = RawPosition {
                            latitude,
                            longitude,
                            city,
                            address,
                        };
                        Some(app.location.change_location(raw)?)
                    }
                    _ if here => app.location.get_location().await,
                    _ => Some(app.weather.get_all_weather()),
                };

                let outcome = match handle {
                    Some(handle) => handle.wait().await,
                    None => FetchOutcome::Aborted,
                };

                for message in notifier.take() {
                    eprintln!("{message}");
                }

                match (outcome, app.weather.snapshot()) {
                    (FetchOutcome::Committed, Some(snapshot)) => {
                        print!("{}", output::render(&snapshot, days));
                        Ok(())
                    }
                    (FetchOutcome::Failed(err), _) => Err(err.into()),
                    _ => bail!("No weather data available"),
                }
            }
            Command::Settings { action } => {
                let (app, _) = compose()?;
                let settings = &app.settings;

                match action {
                    SettingsAction::Show => {}
                    SettingsAction::Theme { theme } => {
                        settings.set_theme(theme)?;
                    }
                    SettingsAction::Source { name } => {
                        let name = ProviderId::try_from(name.as_str())
                            .map(|id| id.as_str().to_string())
                            .unwrap_or(name);
                        settings.set_data_source(&name)?;
                    }
                    SettingsAction::Language { language } => {
                        let language = Language::parse(&language)
                            .with_context(|| format!("Unknown language '{language}'"))?;
                        settings.set_language(language)?;
                    }
                }

                print!(
                    "{}",
                    output::render_settings(
                        &settings.preferences(),
                        settings.appearance(),
                        &app.weather.dispatcher().provider_names(),
                    )
                );
                Ok(())
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.upsert_provider_api_key(id, api_key.trim().to_string());

    let is_default = config.default_provider_id().ok() == Some(id);
    if !is_default
        && Confirm::new(&format!("Use {id} as the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?
    {
        config.set_default_provider(id);
    }

    config.save()?;
    println!(
        "Saved {id} credentials to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

/// Build the stores from on-disk configuration and preferences.
fn compose() -> anyhow::Result<(App, Arc<RecordingNotifier>)> {
    let mut config = Config::load()?;
    config.apply_env();

    let dispatcher = config.build_dispatcher()?;
    let storage = FileStore::open(FileStore::default_path()?)?;
    let initial_location = config.initial_location();
    let notifier = Arc::new(RecordingNotifier::new());

    let position = RawPosition {
        latitude: initial_location.latitude(),
        longitude: initial_location.longitude(),
        city: initial_location.city().to_string(),
        address: initial_location.address().to_string(),
    };

    let app = App::compose(AppContext {
        dispatcher: Arc::new(dispatcher),
        storage: Arc::new(storage),
        geocoder: Arc::new(FixedGeocoder::new(position)),
        notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
        initial_location,
    })?;

    Ok((app, notifier))
}
