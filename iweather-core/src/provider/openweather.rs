use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::ProviderFetchError,
    location::Location,
    model::{CurrentConditions, DailyForecast, HourlyForecast, Language, WeatherSnapshot},
    provider::{ProviderId, get_json},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Forecast entries are 3 hours apart; eight of them cover a day.
const HOURLY_ENTRIES: usize = 8;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        location: &Location,
        language: Language,
    ) -> Result<T, ProviderFetchError> {
        let url = format!("{}{}", self.base_url, path);
        let lat = location.latitude().to_string();
        let lon = location.longitude().to_string();

        get_json(
            &self.http,
            &url,
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", lang_code(language)),
            ],
        )
        .await
    }

    async fn fetch_current(
        &self,
        location: &Location,
        language: Language,
    ) -> Result<CurrentConditions, ProviderFetchError> {
        let parsed: OwCurrentResponse = self.get("/weather", location, language).await?;

        let weather = parsed.weather.first();

        Ok(CurrentConditions {
            observed_at: unix_to_utc(parsed.dt)?,
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            condition: describe(weather),
            icon: weather.map(|w| w.icon.clone()).unwrap_or_default(),
            humidity_pct: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            wind_direction_deg: parsed.wind.deg,
            pressure_hpa: parsed.main.pressure,
        })
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        language: Language,
    ) -> Result<(Vec<HourlyForecast>, Vec<DailyForecast>), ProviderFetchError> {
        let parsed: OwForecastResponse = self.get("/forecast", location, language).await?;

        if parsed.list.is_empty() {
            return Err(ProviderFetchError::NoData);
        }

        let offset = FixedOffset::east_opt(parsed.city.timezone)
            .ok_or_else(|| ProviderFetchError::Parse("invalid city timezone".to_string()))?;

        let hourly = parsed
            .list
            .iter()
            .take(HOURLY_ENTRIES)
            .map(|e| {
                let weather = e.weather.first();
                Ok(HourlyForecast {
                    time: unix_to_utc(e.dt)?,
                    temperature_c: e.main.temp,
                    condition: describe(weather),
                    icon: weather.map(|w| w.icon.clone()).unwrap_or_default(),
                    precipitation_chance: e.pop.map(|p| (p.clamp(0.0, 1.0) * 100.0).round() as u8),
                })
            })
            .collect::<Result<Vec<_>, ProviderFetchError>>()?;

        let daily = fold_daily(&parsed.list, offset)?;

        Ok((hourly, daily))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), fields(provider = "openWeather"))]
    async fn fetch(
        &self,
        location: &Location,
        language: Language,
    ) -> Result<WeatherSnapshot, ProviderFetchError> {
        let (now, (hourly, daily)) = tokio::try_join!(
            self.fetch_current(location, language),
            self.fetch_forecast(location, language),
        )?;

        debug!(hours = hourly.len(), days = daily.len(), "OpenWeather fetch complete");

        Ok(WeatherSnapshot {
            provider: ProviderId::OpenWeather.as_str().to_string(),
            language,
            location: location.clone(),
            now,
            hourly,
            daily,
            fetched_at: Utc::now(),
        })
    }
}

/// Fold 3-hourly entries into one forecast per local calendar day. The
/// condition shown for a day is the one of the entry closest to local noon.
fn fold_daily(
    entries: &[OwForecastEntry],
    offset: FixedOffset,
) -> Result<Vec<DailyForecast>, ProviderFetchError> {
    let mut days: BTreeMap<NaiveDate, Vec<(u32, &OwForecastEntry)>> = BTreeMap::new();

    for entry in entries {
        let local = unix_to_utc(entry.dt)?.with_timezone(&offset);
        days.entry(local.date_naive())
            .or_default()
            .push((local.hour(), entry));
    }

    Ok(days
        .into_iter()
        .map(|(date, group)| {
            let high_c = group
                .iter()
                .map(|(_, e)| e.main.temp_max.unwrap_or(e.main.temp))
                .fold(f64::MIN, f64::max);
            let low_c = group
                .iter()
                .map(|(_, e)| e.main.temp_min.unwrap_or(e.main.temp))
                .fold(f64::MAX, f64::min);
            let midday = group
                .iter()
                .min_by_key(|(hour, _)| hour.abs_diff(12))
                .map(|(_, e)| *e);
            let weather = midday.and_then(|e| e.weather.first());
            let humidity = group.iter().map(|(_, e)| u32::from(e.main.humidity)).sum::<u32>()
                / group.len() as u32;

            DailyForecast {
                date,
                high_c,
                low_c,
                condition: describe(weather),
                icon: weather.map(|w| w.icon.clone()).unwrap_or_default(),
                humidity_pct: Some(humidity as u8),
            }
        })
        .collect())
}

fn lang_code(language: Language) -> &'static str {
    match language {
        Language::SimplifiedChinese => "zh_cn",
        Language::TraditionalChinese => "zh_tw",
        Language::English => "en",
    }
}

fn describe(weather: Option<&OwWeather>) -> String {
    weather
        .map(|w| w.description.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, ProviderFetchError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| ProviderFetchError::Parse(format!("timestamp out of range: {ts}")))
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    /// Offset from UTC in seconds.
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}
