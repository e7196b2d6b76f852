use crate::{
    Config, Language, Location, WeatherSnapshot,
    error::ProviderFetchError,
    provider::{openweather::OpenWeatherProvider, qweather::QWeatherProvider},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod openweather;
pub mod qweather;

/// Built-in weather sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    QWeather,
    OpenWeather,
}

impl ProviderId {
    /// Registry name, also the value persisted under the `dataSource` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::QWeather => "qWeather",
            ProviderId::OpenWeather => "openWeather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::QWeather, ProviderId::OpenWeather]
    }

    /// Environment variable that overrides the configured API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::QWeather => "IWEATHER_QWEATHER_KEY",
            ProviderId::OpenWeather => "IWEATHER_OPENWEATHER_KEY",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "qweather" => Ok(ProviderId::QWeather),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: qWeather, openWeather."
            )),
        }
    }
}

/// A source of weather data.
///
/// Implementations translate their own response shape into a
/// [`WeatherSnapshot`] and their own failures into [`ProviderFetchError`].
/// They keep no state between calls; the language is passed per call.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(
        &self,
        location: &Location,
        language: Language,
    ) -> Result<WeatherSnapshot, ProviderFetchError>;
}

/// Construct a built-in provider from config.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider_cfg = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `iweather configure {id}` or set {}.",
            id.api_key_env()
        )
    })?;

    let http = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let api_key = provider_cfg.api_key.clone();
    let base_url = provider_cfg.base_url.clone();

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::QWeather => {
            let provider = QWeatherProvider::new(api_key, http);
            match base_url {
                Some(url) => Box::new(provider.with_base_url(url)),
                None => Box::new(provider),
            }
        }
        ProviderId::OpenWeather => {
            let provider = OpenWeatherProvider::new(api_key, http);
            match base_url {
                Some(url) => Box::new(provider.with_base_url(url)),
                None => Box::new(provider),
            }
        }
    };

    Ok(boxed)
}

/// GET `url` and decode a JSON body, mapping HTTP-level failures.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ProviderFetchError> {
    let res = http.get(url).query(query).send().await?;

    let status = res.status();
    let body = res.text().await?;

    match status {
        StatusCode::TOO_MANY_REQUESTS => return Err(ProviderFetchError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(ProviderFetchError::Unauthorized);
        }
        s if !s.is_success() => {
            return Err(ProviderFetchError::Status {
                status: s.as_u16(),
                body: truncate_body(&body),
            });
        }
        _ => {}
    }

    serde_json::from_str(&body).map_err(|e| ProviderFetchError::Parse(format!("{url}: {e}")))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
