use serde::{Deserialize, Serialize};

/// First hour (inclusive) of daylight in auto mode.
pub const DAY_START_HOUR: u32 = 6;
/// First hour of the evening (exclusive end of daylight) in auto mode.
pub const DAY_END_HOUR: u32 = 18;

/// Theme preference as chosen by the user and persisted under `theme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    #[default]
    LightMode,
    DarkMode,
    SystemMode,
    AutoMode,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::LightMode => "lightMode",
            Theme::DarkMode => "darkMode",
            Theme::SystemMode => "systemMode",
            Theme::AutoMode => "autoMode",
        }
    }

    pub const fn all() -> &'static [Theme] {
        &[
            Theme::LightMode,
            Theme::DarkMode,
            Theme::SystemMode,
            Theme::AutoMode,
        ]
    }

    /// Resolve to an appearance given the local hour (only used by `AutoMode`).
    pub fn resolve(&self, hour: u32) -> Appearance {
        match self {
            Theme::LightMode => Appearance::Light,
            Theme::DarkMode => Appearance::Dark,
            Theme::SystemMode => Appearance::FollowSystem,
            Theme::AutoMode => derive_theme(hour),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Theme::all()
            .iter()
            .copied()
            .find(|t| {
                let name = t.as_str().to_lowercase();
                lower == name || lower == name.trim_end_matches("mode")
            })
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown theme '{s}'. Supported themes: lightMode, darkMode, systemMode, autoMode."
                )
            })
    }
}

/// What the UI should actually render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
    FollowSystem,
}

/// Light from 06:00 up to (not including) 18:00, dark otherwise.
/// Hours past 23 wrap around the clock.
pub fn derive_theme(hour: u32) -> Appearance {
    if (DAY_START_HOUR..DAY_END_HOUR).contains(&(hour % 24)) {
        Appearance::Light
    } else {
        Appearance::Dark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_theme_boundaries() {
        assert_eq!(derive_theme(5), Appearance::Dark);
        assert_eq!(derive_theme(6), Appearance::Light);
        assert_eq!(derive_theme(17), Appearance::Light);
        assert_eq!(derive_theme(18), Appearance::Dark);
    }

    #[test]
    fn derive_theme_every_hour() {
        for hour in 0..24 {
            let expected = if (6..18).contains(&hour) {
                Appearance::Light
            } else {
                Appearance::Dark
            };
            assert_eq!(derive_theme(hour), expected, "hour {hour}");
        }
    }

    #[test]
    fn fixed_themes_ignore_hour() {
        assert_eq!(Theme::DarkMode.resolve(12), Appearance::Dark);
        assert_eq!(Theme::LightMode.resolve(23), Appearance::Light);
        assert_eq!(Theme::SystemMode.resolve(3), Appearance::FollowSystem);
        assert_eq!(Theme::AutoMode.resolve(3), Appearance::Dark);
    }

    #[test]
    fn parses_persisted_and_short_names() {
        assert_eq!("autoMode".parse::<Theme>().expect("parse"), Theme::AutoMode);
        assert_eq!("dark".parse::<Theme>().expect("parse"), Theme::DarkMode);
        assert!("sepia".parse::<Theme>().is_err());
    }
}
