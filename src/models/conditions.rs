//! Situational context used to decide which providers may run
//!
//! `ProviderConditions` describes the current situation of a request and
//! `ConditionsGate` is the restriction a provider registers with. Every gate
//! field is optional and an absent field matches anything.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Clear,
    Rain,
    Snow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Operating mode of a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestMode {
    /// Quests built only from discovered locations
    PureLocation,
    /// Quests built around one content block, optionally with a location
    ContentBlock,
}

/// Current situation of a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConditions {
    pub season: Option<Season>,
    pub weather: Option<WeatherKind>,
    pub time_of_day: Option<TimeOfDay>,
    pub region: Option<String>,
    pub mode: Option<QuestMode>,
}

impl ProviderConditions {
    #[must_use]
    pub fn for_mode(mode: QuestMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_weather(mut self, weather: WeatherKind) -> Self {
        self.weather = Some(weather);
        self
    }

    #[must_use]
    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    #[must_use]
    pub fn with_season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    /// Fill every unset field from `fallback`, keeping the fields already set
    #[must_use]
    pub fn or(self, fallback: ProviderConditions) -> Self {
        Self {
            season: self.season.or(fallback.season),
            weather: self.weather.or(fallback.weather),
            time_of_day: self.time_of_day.or(fallback.time_of_day),
            region: self.region.or(fallback.region),
            mode: self.mode.or(fallback.mode),
        }
    }
}

/// Restrictions a provider registers with; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionsGate {
    pub season: Option<Season>,
    pub weather: Option<WeatherKind>,
    pub time_of_day: Option<TimeOfDay>,
    pub regions: Option<Vec<String>>,
    pub modes: Option<Vec<QuestMode>>,
}

impl ConditionsGate {
    /// Gate that admits only the given modes
    #[must_use]
    pub fn modes(modes: &[QuestMode]) -> Self {
        Self {
            modes: Some(modes.to_vec()),
            ..Self::default()
        }
    }

    /// Whether the situation satisfies this gate.
    ///
    /// A restriction is only checked when both the gate and the situation
    /// specify that field.
    #[must_use]
    pub fn admits(&self, conditions: &ProviderConditions) -> bool {
        if let (Some(regions), Some(region)) = (&self.regions, &conditions.region) {
            if !regions.iter().any(|r| r.eq_ignore_ascii_case(region)) {
                return false;
            }
        }

        if let (Some(season), Some(current)) = (self.season, conditions.season) {
            if season != current {
                return false;
            }
        }

        if let (Some(weather), Some(current)) = (self.weather, conditions.weather) {
            if weather != current {
                return false;
            }
        }

        if let (Some(time_of_day), Some(current)) = (self.time_of_day, conditions.time_of_day) {
            if time_of_day != current {
                return false;
            }
        }

        if let (Some(modes), Some(mode)) = (&self.modes, conditions.mode) {
            if !modes.contains(&mode) {
                return false;
            }
        }

        true
    }
}
