use chrono::Local;
use iweather_core::{Appearance, WeatherSnapshot, store::Preferences};

/// Human-readable weather report.
pub fn render(snapshot: &WeatherSnapshot, days: usize) -> String {
    let now = &snapshot.now;
    let wind_from = now
        .wind_direction_deg
        .map(|deg| format!(" from {deg:.0}°"))
        .unwrap_or_default();

    let mut lines = vec![
        format!("{} ({})", snapshot.location, snapshot.provider),
        format!(
            "  {}  {:.1}°C (feels like {:.1}°C)",
            now.condition, now.temperature_c, now.feels_like_c
        ),
        format!(
            "  Humidity {}%  Wind {:.1} m/s{wind_from}",
            now.humidity_pct, now.wind_speed_mps
        ),
    ];
    if let Some(pressure) = now.pressure_hpa {
        lines.push(format!("  Pressure {pressure:.0} hPa"));
    }
    lines.push(format!(
        "  Observed {}",
        now.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    ));

    if !snapshot.daily.is_empty() && days > 0 {
        lines.push(String::new());
        lines.extend(snapshot.daily.iter().take(days).map(|day| {
            format!(
                "  {}  {:>5.1}°C / {:>5.1}°C  {}",
                day.date.format("%a %m-%d"),
                day.low_c,
                day.high_c,
                day.condition
            )
        }));
    }

    lines.into_iter().map(|line| line + "\n").collect()
}

pub fn render_settings(prefs: &Preferences, appearance: Appearance, providers: &[String]) -> String {
    format!(
        "theme:      {} ({appearance:?})\n\
         dataSource: {}\n\
         language:   {}\n\
         providers:  {}\n",
        prefs.theme,
        prefs.data_source,
        prefs.language,
        providers.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use iweather_core::{CurrentConditions, DailyForecast, Language, Location, Theme};

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            provider: "qWeather".into(),
            language: Language::SimplifiedChinese,
            location: Location::default(),
            now: CurrentConditions {
                observed_at: Utc::now(),
                temperature_c: 3.0,
                feels_like_c: -1.0,
                condition: "多云".into(),
                icon: "101".into(),
                humidity_pct: 32,
                wind_speed_mps: 5.0,
                wind_direction_deg: Some(315.0),
                pressure_hpa: None,
            },
            hourly: Vec::new(),
            daily: (15..18)
                .map(|d| DailyForecast {
                    date: NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date"),
                    high_c: 6.0,
                    low_c: -6.0,
                    condition: "晴".into(),
                    icon: "100".into(),
                    humidity_pct: None,
                })
                .collect(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn render_includes_current_and_requested_days() {
        let text = render(&snapshot(), 2);

        assert!(text.contains("北京市 天安门"));
        assert!(text.contains("多云  3.0°C (feels like -1.0°C)"));
        assert!(text.contains("from 315°"));
        assert!(!text.contains("Pressure"));
        assert_eq!(text.matches("°C / ").count(), 2);
    }

    #[test]
    fn render_without_forecast_prints_current_only() {
        let mut snap = snapshot();
        snap.now.pressure_hpa = Some(1021.4);
        let text = render(&snap, 0);

        assert!(text.contains("  Pressure 1021 hPa\n"));
        assert!(!text.contains("°C / "));
        assert!(text.ends_with('\n'));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn render_settings_lists_providers() {
        let prefs = Preferences {
            theme: Theme::AutoMode,
            data_source: "qWeather".into(),
            language: Language::English,
        };
        let text = render_settings(
            &prefs,
            Appearance::Dark,
            &["openWeather".into(), "qWeather".into()],
        );

        assert!(text.contains("theme:      autoMode (Dark)"));
        assert!(text.contains("providers:  openWeather, qWeather"));
    }
}
