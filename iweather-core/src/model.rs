use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Language applied to provider text (condition descriptions and the like).
///
/// Persisted by its display name, sent to providers as a provider-specific code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "简体中文")]
    SimplifiedChinese,
    #[serde(rename = "繁體中文")]
    TraditionalChinese,
    #[serde(rename = "English")]
    English,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::SimplifiedChinese => "简体中文",
            Language::TraditionalChinese => "繁體中文",
            Language::English => "English",
        }
    }

    pub const fn all() -> &'static [Language] {
        &[
            Language::SimplifiedChinese,
            Language::TraditionalChinese,
            Language::English,
        ]
    }

    /// Accepts the display name or a short code (`zh`, `zh-hant`, `en`).
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|lang| lang.display_name() == trimmed)
            .or_else(|| match trimmed.to_lowercase().as_str() {
                "zh" | "zh-cn" | "zh_cn" | "zh-hans" => Some(Language::SimplifiedChinese),
                "zh-tw" | "zh_tw" | "zh-hant" => Some(Language::TraditionalChinese),
                "en" | "english" => Some(Language::English),
                _ => None,
            })
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Normalized weather for one location, provider and language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub provider: String,
    pub language: Language,
    pub location: Location,
    pub now: CurrentConditions,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub observed_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    /// Provider text in the requested language.
    pub condition: String,
    pub icon: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub wind_direction_deg: Option<f64>,
    pub pressure_hpa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub condition: String,
    pub icon: String,
    /// Probability of precipitation, 0-100.
    pub precipitation_chance: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub high_c: f64,
    pub low_c: f64,
    pub condition: String,
    pub icon: String,
    pub humidity_pct: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_and_codes() {
        assert_eq!(Language::parse("简体中文"), Some(Language::SimplifiedChinese));
        assert_eq!(Language::parse("繁體中文"), Some(Language::TraditionalChinese));
        assert_eq!(Language::parse("EN"), Some(Language::English));
        assert_eq!(Language::parse("klingon"), None);
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&Language::English).expect("serialize");
        assert_eq!(json, "\"English\"");
    }
}
