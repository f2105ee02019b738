//! Quest models: request options, content blocks and composed quests

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::conditions::{ProviderConditions, QuestMode, TimeOfDay};
use super::location::{DetectedLocation, LocationCandidate};

/// Four-level difficulty scale, ordered easy < medium < hard < extreme
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl Difficulty {
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::Extreme => 4,
        }
    }

    /// Whether `other` is at most one level away from `self`
    #[must_use]
    pub fn within_one_of(self, other: Difficulty) -> bool {
        self.level().abs_diff(other.level()) <= 1
    }
}

/// How much time the user has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Under an hour
    Quick,
    /// A few hours
    Afternoon,
    /// A full day
    Day,
    /// Multi-day, capped at one day per activity
    Epic,
}

impl Timeframe {
    /// Longest activity duration allowed for this timeframe, in minutes
    #[must_use]
    pub fn ceiling_minutes(self) -> u32 {
        match self {
            Timeframe::Quick => 60,
            Timeframe::Afternoon => 240,
            Timeframe::Day => 480,
            Timeframe::Epic => 1440,
        }
    }
}

/// Transportation available to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transportation {
    HasCar,
    NoCar,
}

/// Transportation a content block needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportRequirement {
    CarRequired,
    CarOptional,
    NoCarNeeded,
}

impl TransportRequirement {
    #[must_use]
    pub fn satisfied_by(self, transportation: Transportation) -> bool {
        !(self == TransportRequirement::CarRequired && transportation == Transportation::NoCar)
    }
}

/// When a content block can be carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockTimeOfDay {
    #[default]
    Anytime,
    BusinessHours,
    Daylight,
    NightOnly,
}

impl BlockTimeOfDay {
    #[must_use]
    pub fn permits(self, time_of_day: TimeOfDay) -> bool {
        match self {
            BlockTimeOfDay::Anytime => true,
            BlockTimeOfDay::BusinessHours => {
                matches!(time_of_day, TimeOfDay::Morning | TimeOfDay::Afternoon)
            }
            BlockTimeOfDay::Daylight => time_of_day != TimeOfDay::Night,
            BlockTimeOfDay::NightOnly => time_of_day == TimeOfDay::Night,
        }
    }
}

/// Requested quest theme; selects the operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Go somewhere unusual nearby
    Adventure,
    /// Any activity, optionally paired with a place
    Wildcard,
    Journey,
    LifeChanging,
    Playbook,
    Virtuous,
}

impl Theme {
    #[must_use]
    pub fn mode(self) -> QuestMode {
        match self {
            Theme::Adventure => QuestMode::PureLocation,
            _ => QuestMode::ContentBlock,
        }
    }

    /// Theme tags a content block may carry to match this theme.
    /// `None` accepts every tag.
    #[must_use]
    pub fn allowed_tags(self) -> Option<&'static [&'static str]> {
        match self {
            Theme::Adventure => Some(&["adventure", "journey"]),
            Theme::Wildcard => None,
            Theme::Journey => Some(&["journey", "travel", "explore"]),
            Theme::LifeChanging => Some(&["life_changing"]),
            Theme::Playbook => Some(&["playbook", "romantic", "social"]),
            Theme::Virtuous => Some(&["virtuous", "kindness"]),
        }
    }
}

/// An atomic activity description from the content store.
///
/// Field names follow the spreadsheet columns the store exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "Block_ID")]
    pub id: String,
    /// The action text, e.g. "Buy a stranger a coffee"
    #[serde(rename = "Idea")]
    pub action: String,
    /// Estimated duration in minutes
    #[serde(rename = "Time_Required")]
    pub minutes: u32,
    #[serde(rename = "Difficulty_Tag")]
    pub difficulty: Difficulty,
    #[serde(
        rename = "Location_Dependent",
        default,
        serialize_with = "serialize_yes_no",
        deserialize_with = "deserialize_yes_no"
    )]
    pub requires_location: bool,
    #[serde(rename = "Transportation_Required")]
    pub transportation: TransportRequirement,
    #[serde(
        rename = "Theme_Tags",
        default,
        serialize_with = "serialize_tags",
        deserialize_with = "deserialize_tags"
    )]
    pub theme_tags: Vec<String>,
    #[serde(rename = "Time_of_Day", default)]
    pub time_of_day: BlockTimeOfDay,
}

fn serialize_yes_no<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "YES" } else { "NO" })
}

fn deserialize_yes_no<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().eq_ignore_ascii_case("yes"))
}

fn serialize_tags<S: Serializer>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&tags.join(","))
}

fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(parse_tag_list(&raw))
}

/// Split a comma separated tag list into trimmed, lowercase, non-empty tags
#[must_use]
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// What the caller asks `generate` for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub timeframe: Timeframe,
    pub difficulty: Difficulty,
    pub transportation: Transportation,
    pub theme: Theme,
    pub location: Option<DetectedLocation>,
    /// Explicit situational overrides; unset fields are derived from the clock
    #[serde(default)]
    pub conditions: Option<ProviderConditions>,
}

impl RequestContext {
    #[must_use]
    pub fn new(
        timeframe: Timeframe,
        difficulty: Difficulty,
        transportation: Transportation,
        theme: Theme,
    ) -> Self {
        Self {
            timeframe,
            difficulty,
            transportation,
            theme,
            location: None,
            conditions: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: DetectedLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: ProviderConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Time of day the caller stated explicitly, if any
    #[must_use]
    pub fn explicit_time_of_day(&self) -> Option<TimeOfDay> {
        self.conditions.as_ref().and_then(|c| c.time_of_day)
    }
}

/// A composed, user-facing recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedQuest {
    pub id: String,
    pub description: String,
    /// Total estimated duration in minutes
    pub total_minutes: u32,
    pub difficulty: Difficulty,
    pub primary_location: Option<LocationCandidate>,
    pub supplementary_locations: Vec<LocationCandidate>,
    pub block: Option<ContentBlock>,
    pub tags: Vec<String>,
}

impl ComposedQuest {
    /// Primary location first, then supplementary ones
    pub fn locations(&self) -> impl Iterator<Item = &LocationCandidate> {
        self.primary_location
            .iter()
            .chain(self.supplementary_locations.iter())
    }

    #[must_use]
    pub fn location_count(&self) -> usize {
        self.locations().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Difficulty::Hard, Difficulty::Extreme, true)]
    #[case(Difficulty::Extreme, Difficulty::Extreme, true)]
    #[case(Difficulty::Easy, Difficulty::Extreme, false)]
    #[case(Difficulty::Medium, Difficulty::Extreme, false)]
    #[case(Difficulty::Easy, Difficulty::Medium, true)]
    fn test_difficulty_window(
        #[case] requested: Difficulty,
        #[case] block: Difficulty,
        #[case] expected: bool,
    ) {
        assert_eq!(requested.within_one_of(block), expected);
    }

    #[test]
    fn test_transport_requirement() {
        assert!(!TransportRequirement::CarRequired.satisfied_by(Transportation::NoCar));
        assert!(TransportRequirement::CarRequired.satisfied_by(Transportation::HasCar));
        assert!(TransportRequirement::CarOptional.satisfied_by(Transportation::NoCar));
        assert!(TransportRequirement::NoCarNeeded.satisfied_by(Transportation::NoCar));
    }

    #[test]
    fn test_block_time_of_day() {
        assert!(BlockTimeOfDay::Anytime.permits(TimeOfDay::Night));
        assert!(!BlockTimeOfDay::NightOnly.permits(TimeOfDay::Afternoon));
        assert!(!BlockTimeOfDay::Daylight.permits(TimeOfDay::Night));
        assert!(BlockTimeOfDay::BusinessHours.permits(TimeOfDay::Morning));
        assert!(!BlockTimeOfDay::BusinessHours.permits(TimeOfDay::Evening));
    }

    #[test]
    fn test_theme_modes() {
        assert_eq!(Theme::Adventure.mode(), QuestMode::PureLocation);
        assert_eq!(Theme::Virtuous.mode(), QuestMode::ContentBlock);
        assert!(Theme::Wildcard.allowed_tags().is_none());
    }

    #[test]
    fn test_content_block_from_sheet_row() {
        let row = r#"{
            "Block_ID": "B12",
            "Idea": "Write a letter to your future self",
            "Time_Required": 45,
            "Difficulty_Tag": "medium",
            "Location_Dependent": "NO",
            "Transportation_Required": "no_car_needed",
            "Theme_Tags": "Life_Changing, virtuous ,",
            "Time_of_Day": "anytime"
        }"#;

        let block: ContentBlock = serde_json::from_str(row).unwrap();
        assert_eq!(block.id, "B12");
        assert_eq!(block.minutes, 45);
        assert_eq!(block.difficulty, Difficulty::Medium);
        assert!(!block.requires_location);
        assert_eq!(block.theme_tags, vec!["life_changing", "virtuous"]);

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["Theme_Tags"], "life_changing,virtuous");
        assert_eq!(json["Location_Dependent"], "NO");
    }

    #[test]
    fn test_content_block_optional_columns() {
        let row = r#"{
            "Block_ID": "B13",
            "Idea": "Visit a local landmark",
            "Time_Required": 90,
            "Difficulty_Tag": "easy",
            "Location_Dependent": "YES",
            "Transportation_Required": "car_optional"
        }"#;

        let block: ContentBlock = serde_json::from_str(row).unwrap();
        assert!(block.requires_location);
        assert!(block.theme_tags.is_empty());
        assert_eq!(block.time_of_day, BlockTimeOfDay::Anytime);
    }
}
