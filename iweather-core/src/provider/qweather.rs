use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
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

const DEFAULT_BASE_URL: &str = "https://devapi.qweather.com/v7";

/// QWeather (和风天气) v7 API.
#[derive(Debug, Clone)]
pub struct QWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl QWeatherProvider {
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

    async fn get<T: QwBody>(
        &self,
        path: &str,
        location: &str,
        language: Language,
    ) -> Result<T, ProviderFetchError> {
        let url = format!("{}{}", self.base_url, path);
        let body: T = get_json(
            &self.http,
            &url,
            &[
                ("location", location),
                ("key", self.api_key.as_str()),
                ("lang", lang_code(language)),
            ],
        )
        .await?;

        check_code(body.code())?;
        Ok(body)
    }

    async fn fetch_now(
        &self,
        location: &str,
        language: Language,
    ) -> Result<CurrentConditions, ProviderFetchError> {
        let res: QwNowResponse = self.get("/weather/now", location, language).await?;
        let now = res.now.ok_or(ProviderFetchError::NoData)?;

        Ok(CurrentConditions {
            observed_at: parse_time(&now.obs_time)?,
            temperature_c: num(&now.temp, "temp")?,
            feels_like_c: num(&now.feels_like, "feelsLike")?,
            condition: now.text,
            icon: now.icon,
            humidity_pct: pct(&now.humidity, "humidity")?,
            wind_speed_mps: num(&now.wind_speed, "windSpeed")? / 3.6,
            wind_direction_deg: now.wind360.as_deref().and_then(|v| v.parse().ok()),
            pressure_hpa: now.pressure.as_deref().and_then(|v| v.parse().ok()),
        })
    }

    async fn fetch_hourly(
        &self,
        location: &str,
        language: Language,
    ) -> Result<Vec<HourlyForecast>, ProviderFetchError> {
        let res: QwHourlyResponse = self.get("/weather/24h", location, language).await?;

        res.hourly
            .unwrap_or_default()
            .into_iter()
            .map(|h| {
                Ok(HourlyForecast {
                    time: parse_time(&h.fx_time)?,
                    temperature_c: num(&h.temp, "temp")?,
                    condition: h.text,
                    icon: h.icon,
                    precipitation_chance: h.pop.as_deref().and_then(|v| v.parse().ok()),
                })
            })
            .collect()
    }

    async fn fetch_daily(
        &self,
        location: &str,
        language: Language,
    ) -> Result<Vec<DailyForecast>, ProviderFetchError> {
        let res: QwDailyResponse = self.get("/weather/7d", location, language).await?;

        res.daily
            .unwrap_or_default()
            .into_iter()
            .map(|d| {
                let date = NaiveDate::parse_from_str(&d.fx_date, "%Y-%m-%d").map_err(|e| {
                    ProviderFetchError::Parse(format!("fxDate '{}': {e}", d.fx_date))
                })?;
                Ok(DailyForecast {
                    date,
                    high_c: num(&d.temp_max, "tempMax")?,
                    low_c: num(&d.temp_min, "tempMin")?,
                    condition: d.text_day,
                    icon: d.icon_day,
                    humidity_pct: d.humidity.as_deref().and_then(|v| v.parse().ok()),
                })
            })
            .collect()
    }
}

#[async_trait]
impl WeatherProvider for QWeatherProvider {
    #[instrument(skip(self), fields(provider = "qWeather"))]
    async fn fetch(
        &self,
        location: &Location,
        language: Language,
    ) -> Result<WeatherSnapshot, ProviderFetchError> {
        let query = format!("{:.2},{:.2}", location.longitude(), location.latitude());

        let (now, hourly, daily) = tokio::try_join!(
            self.fetch_now(&query, language),
            self.fetch_hourly(&query, language),
            self.fetch_daily(&query, language),
        )?;

        debug!(hours = hourly.len(), days = daily.len(), "QWeather fetch complete");

        Ok(WeatherSnapshot {
            provider: ProviderId::QWeather.as_str().to_string(),
            language,
            location: location.clone(),
            now,
            hourly,
            daily,
            fetched_at: Utc::now(),
        })
    }
}

fn lang_code(language: Language) -> &'static str {
    match language {
        Language::SimplifiedChinese => "zh",
        Language::TraditionalChinese => "zh-hant",
        Language::English => "en",
    }
}

/// QWeather reports failures in the body `code` even on HTTP 200.
fn check_code(code: &str) -> Result<(), ProviderFetchError> {
    match code {
        "200" => Ok(()),
        "204" | "404" => Err(ProviderFetchError::NoData),
        "401" | "403" => Err(ProviderFetchError::Unauthorized),
        "402" | "429" => Err(ProviderFetchError::RateLimited),
        other => Err(ProviderFetchError::Provider {
            code: other.to_string(),
        }),
    }
}

// e.g. "2020-06-30T21:40+08:00"
fn parse_time(value: &str) -> Result<DateTime<Utc>, ProviderFetchError> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M%:z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderFetchError::Parse(format!("time '{value}': {e}")))
}

fn num(value: &str, field: &str) -> Result<f64, ProviderFetchError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ProviderFetchError::Parse(format!("{field} is not a number: '{value}'")))
}

fn pct(value: &str, field: &str) -> Result<u8, ProviderFetchError> {
    let n = num(value, field)?;
    Ok(n.clamp(0.0, 100.0).round() as u8)
}

trait QwBody: serde::de::DeserializeOwned {
    fn code(&self) -> &str;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QwNow {
    obs_time: String,
    temp: String,
    feels_like: String,
    icon: String,
    text: String,
    wind360: Option<String>,
    wind_speed: String,
    humidity: String,
    pressure: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QwNowResponse {
    code: String,
    now: Option<QwNow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QwHour {
    fx_time: String,
    temp: String,
    icon: String,
    text: String,
    pop: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QwHourlyResponse {
    code: String,
    hourly: Option<Vec<QwHour>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QwDay {
    fx_date: String,
    temp_max: String,
    temp_min: String,
    icon_day: String,
    text_day: String,
    humidity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QwDailyResponse {
    code: String,
    daily: Option<Vec<QwDay>>,
}

impl QwBody for QwNowResponse {
    fn code(&self) -> &str {
        &self.code
    }
}

impl QwBody for QwHourlyResponse {
    fn code(&self) -> &str {
        &self.code
    }
}

impl QwBody for QwDailyResponse {
    fn code(&self) -> &str {
        &self.code
    }
}
