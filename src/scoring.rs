//! Interest scoring for candidate locations and composed quests

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ComposedQuest, LocationCandidate};

/// Score label, from most to least interesting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestCategory {
    Legendary,
    Epic,
    Cool,
    Interesting,
    Standard,
    Basic,
}

impl InterestCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            InterestCategory::Legendary => "Legendary",
            InterestCategory::Epic => "Epic",
            InterestCategory::Cool => "Cool",
            InterestCategory::Interesting => "Interesting",
            InterestCategory::Standard => "Standard",
            InterestCategory::Basic => "Basic",
        }
    }
}

impl fmt::Display for InterestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base score of a provider type. Unknown types land in the lowest tier.
#[must_use]
pub fn base_score(provider_type: &str) -> f64 {
    match provider_type {
        "obscura" => 5.0,
        "wind_generator" | "google_psychic" | "google_cat_cafe" | "google_japanese_inn" => 4.0,
        "google_observation_deck" | "lighthouse" | "google_off_roading" => 3.0,
        "hiking" | "beach" | "google_beach" | "google_hiking_area" | "skateboard_park"
        | "google_marina" => 2.0,
        _ => 1.0,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Heuristic "how cool is this" measure used to rank and filter quests
#[derive(Debug, Clone)]
pub struct InterestScorer {
    /// URLs containing this marker come from the curated source
    premium_source: String,
}

impl Default for InterestScorer {
    fn default() -> Self {
        Self {
            premium_source: "atlasobscura".to_string(),
        }
    }
}

impl InterestScorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base tier plus rating, description and URL bonuses, rounded to 0.1
    #[must_use]
    pub fn score_candidate(&self, candidate: &LocationCandidate) -> f64 {
        let mut score = base_score(&candidate.provider_type);

        match candidate.rating {
            Some(rating) if rating >= 4.5 => score += 1.0,
            Some(rating) if rating >= 4.0 => score += 0.5,
            _ => {}
        }

        if candidate.description.chars().count() > 100 {
            score += 0.5;
        }

        match candidate.url.as_deref() {
            Some(url) if url.contains(&self.premium_source) => score += 1.0,
            Some(_) => score += 0.3,
            None => {}
        }

        round_one_decimal(score)
    }

    /// Average candidate score over every location on the quest.
    ///
    /// Multi-location quests whose average reaches 3 get a 0.5 bonus.
    /// Quests without locations score 0.
    #[must_use]
    pub fn score_quest(&self, quest: &ComposedQuest) -> f64 {
        let scores: Vec<f64> = quest
            .locations()
            .map(|location| self.score_candidate(location))
            .collect();

        if scores.is_empty() {
            return 0.0;
        }

        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        let bonus = if scores.len() > 1 && average >= 3.0 {
            0.5
        } else {
            0.0
        };

        round_one_decimal(average + bonus)
    }

    #[must_use]
    pub fn categorize(score: f64) -> InterestCategory {
        if score >= 5.0 {
            InterestCategory::Legendary
        } else if score >= 4.0 {
            InterestCategory::Epic
        } else if score >= 3.0 {
            InterestCategory::Cool
        } else if score >= 2.0 {
            InterestCategory::Interesting
        } else if score >= 1.0 {
            InterestCategory::Standard
        } else {
            InterestCategory::Basic
        }
    }

    #[must_use]
    pub fn meets_minimum(&self, quest: &ComposedQuest, threshold: f64) -> bool {
        self.score_quest(quest) >= threshold
    }

    /// Stable sort by quest score, highest first
    pub fn sort_descending(&self, quests: &mut [ComposedQuest]) {
        quests.sort_by_cached_key(|quest| std::cmp::Reverse(ScoreKey(self.score_quest(quest))));
    }
}

/// Total order over scores for sorting
#[derive(PartialEq)]
struct ScoreKey(f64);

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, Difficulty};
    use rstest::rstest;

    fn create_test_candidate(id: &str, provider_type: &str) -> LocationCandidate {
        LocationCandidate::new(
            id,
            "Test Place",
            "Short description",
            Coordinates::new(27.95, -82.46),
            "Tampa, FL",
            provider_type,
        )
    }

    fn create_test_quest(id: &str, locations: Vec<LocationCandidate>) -> ComposedQuest {
        let mut locations = locations.into_iter();
        ComposedQuest {
            id: id.to_string(),
            description: "Test quest".to_string(),
            total_minutes: 60,
            difficulty: Difficulty::Medium,
            primary_location: locations.next(),
            supplementary_locations: locations.collect(),
            block: None,
            tags: Vec::new(),
        }
    }

    #[rstest]
    #[case("obscura", 5.0)]
    #[case("wind_generator", 4.0)]
    #[case("stargazing", 1.0)]
    #[case("lighthouse", 3.0)]
    #[case("google_marina", 2.0)]
    #[case("pier", 1.0)]
    #[case("never_heard_of_it", 1.0)]
    fn test_base_tiers(#[case] provider_type: &str, #[case] expected: f64) {
        let scorer = InterestScorer::new();
        let candidate = create_test_candidate("c", provider_type);
        assert_eq!(scorer.score_candidate(&candidate), expected);
    }

    #[test]
    fn test_candidate_bonuses() {
        let scorer = InterestScorer::new();

        let mut candidate = create_test_candidate("c", "lighthouse");
        candidate.rating = Some(4.2);
        candidate.url = Some("https://example.org".to_string());
        // 3 + 0.5 + 0.3
        assert_eq!(scorer.score_candidate(&candidate), 3.8);

        candidate.rating = Some(4.5);
        candidate.url = Some("https://www.atlasobscura.com/places/x".to_string());
        candidate.description = "x".repeat(101);
        // 3 + 1 + 0.5 + 1
        assert_eq!(scorer.score_candidate(&candidate), 5.5);

        candidate.rating = Some(3.9);
        candidate.url = None;
        candidate.description = "x".repeat(100);
        assert_eq!(scorer.score_candidate(&candidate), 3.0);
    }

    #[test]
    fn test_score_is_deterministic_and_rounded() {
        let scorer = InterestScorer::new();
        let mut candidate = create_test_candidate("c", "beach");
        candidate.url = Some("https://example.org".to_string());
        let first = scorer.score_candidate(&candidate);
        assert_eq!(first, scorer.score_candidate(&candidate));
        assert_eq!(first, (first * 10.0).round() / 10.0);
        assert_eq!(first, 2.3);
    }

    #[test]
    fn test_quest_without_locations_scores_zero() {
        let scorer = InterestScorer::new();
        let quest = create_test_quest("q", vec![]);
        assert_eq!(scorer.score_quest(&quest), 0.0);
        assert!(!scorer.meets_minimum(&quest, 0.1));
        assert!(scorer.meets_minimum(&quest, 0.0));
    }

    #[test]
    fn test_quest_average_and_composition_bonus() {
        let scorer = InterestScorer::new();

        // (5 + 3) / 2 = 4, plus bonus
        let strong = create_test_quest(
            "strong",
            vec![
                create_test_candidate("a", "obscura"),
                create_test_candidate("b", "lighthouse"),
            ],
        );
        assert_eq!(scorer.score_quest(&strong), 4.5);

        // (4 + 1) / 2 = 2.5, below the bonus bar
        let padded = create_test_quest(
            "padded",
            vec![
                create_test_candidate("a", "wind_generator"),
                create_test_candidate("b", "pier"),
            ],
        );
        assert_eq!(scorer.score_quest(&padded), 2.5);

        // A single location never gets the bonus
        let single = create_test_quest("single", vec![create_test_candidate("a", "obscura")]);
        assert_eq!(scorer.score_quest(&single), 5.0);
    }

    #[rstest]
    #[case(5.0, InterestCategory::Legendary)]
    #[case(4.999, InterestCategory::Epic)]
    #[case(3.0, InterestCategory::Cool)]
    #[case(2.0, InterestCategory::Interesting)]
    #[case(1.5, InterestCategory::Standard)]
    #[case(0.0, InterestCategory::Basic)]
    fn test_categorize_boundaries(#[case] score: f64, #[case] expected: InterestCategory) {
        assert_eq!(InterestScorer::categorize(score), expected);
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let scorer = InterestScorer::new();
        let mut quests = vec![
            create_test_quest("low", vec![create_test_candidate("a", "pier")]),
            create_test_quest("tie-1", vec![create_test_candidate("b", "lighthouse")]),
            create_test_quest("high", vec![create_test_candidate("c", "obscura")]),
            create_test_quest("tie-2", vec![create_test_candidate("d", "google_off_roading")]),
        ];

        scorer.sort_descending(&mut quests);
        let ids: Vec<&str> = quests.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "tie-1", "tie-2", "low"]);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(InterestCategory::Legendary.to_string(), "Legendary");
        assert_eq!(InterestScorer::categorize(2.3).label(), "Interesting");
    }
}
