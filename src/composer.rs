//! Quest composition
//!
//! [`QuestComposer::generate`] is the single entry point. The requested
//! theme picks one of two modes:
//! - pure-location: one quest per fetched candidate, cycling through them
//! - content-block: a random eligible content block, optionally paired
//!   with a fetched location
//!
//! Accepted quests are ranked with the [`InterestScorer`] before returning.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::ComposerConfig;
use crate::content::{ContentStore, filter_blocks};
use crate::geo;
use crate::models::{
    ComposedQuest, ContentBlock, DetectedLocation, LocationCandidate, ProviderConditions,
    QuestMode, RequestContext,
};
use crate::providers::{
    ProviderError, ProviderRegistry, ProviderSummary, RegistryStats, SearchParams,
};
use crate::scoring::InterestScorer;

/// Minutes spent on site for a pure-location quest
const ON_SITE_MINUTES: f64 = 60.0;

/// Average travel speed used for duration estimates
const TRAVEL_MPH: f64 = 30.0;

/// Why a generation produced no quests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    #[error("Location is required to find places near you")]
    MissingLocation,

    #[error("No interesting locations found nearby. Try a different area or theme.")]
    NoCandidatesNearby,

    #[error("No activities match your preferences. Try a different difficulty, timeframe or theme.")]
    NoEligibleContent,

    #[error("Activity content is unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Failed to generate a quest after {attempts} attempts")]
    AttemptsExhausted { attempts: usize },
}

/// Result of one `generate` call
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    /// Ranked, best first
    pub quests: Vec<ComposedQuest>,
    /// Content blocks or candidates that survived filtering
    pub considered_count: usize,
    #[serde(serialize_with = "serialize_failure")]
    pub error: Option<GenerationFailure>,
}

fn serialize_failure<S: Serializer>(
    failure: &Option<GenerationFailure>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match failure {
        Some(failure) => serializer.serialize_some(&failure.to_string()),
        None => serializer.serialize_none(),
    }
}

impl GenerationOutcome {
    fn succeeded(quests: Vec<ComposedQuest>, considered_count: usize) -> Self {
        Self {
            success: true,
            quests,
            considered_count,
            error: None,
        }
    }

    fn failed(error: GenerationFailure, considered_count: usize) -> Self {
        Self {
            success: false,
            quests: Vec::new(),
            considered_count,
            error: Some(error),
        }
    }
}

pub struct QuestComposer {
    registry: Arc<ProviderRegistry>,
    content: Option<Arc<dyn ContentStore>>,
    scorer: InterestScorer,
    settings: ComposerConfig,
    rng: Mutex<StdRng>,
    sequence: AtomicU64,
}

impl QuestComposer {
    pub fn new(registry: Arc<ProviderRegistry>, content: Option<Arc<dyn ContentStore>>) -> Self {
        Self {
            registry,
            content,
            scorer: InterestScorer::new(),
            settings: ComposerConfig::default(),
            rng: Mutex::new(StdRng::seed_from_u64(rand::rng().random())),
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_config(mut self, settings: &ComposerConfig) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Deterministic block and location picks, for tests
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    #[must_use]
    pub fn scorer(&self) -> &InterestScorer {
        &self.scorer
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generate up to `target_quests` ranked quests for `request`
    #[instrument(skip(self, request), fields(theme = ?request.theme, timeframe = ?request.timeframe))]
    pub async fn generate(&self, request: &RequestContext) -> GenerationOutcome {
        let conditions = self.conditions_for(request);

        let outcome = match request.theme.mode() {
            QuestMode::PureLocation => self.generate_location_quests(request, &conditions).await,
            QuestMode::ContentBlock => self.generate_block_quests(request, &conditions).await,
        };

        match &outcome.error {
            Some(error) => warn!("Quest generation failed: {}", error),
            None => info!(
                "Generated {} quests from {} considered",
                outcome.quests.len(),
                outcome.considered_count
            ),
        }
        outcome
    }

    async fn generate_location_quests(
        &self,
        request: &RequestContext,
        conditions: &ProviderConditions,
    ) -> GenerationOutcome {
        let Some(location) = request.location.as_ref() else {
            return GenerationOutcome::failed(GenerationFailure::MissingLocation, 0);
        };

        let params = self.search_params(location, self.settings.location_target);
        let candidates = self
            .registry
            .fetch_many(&params, self.settings.location_target, conditions)
            .await;

        if candidates.is_empty() {
            return GenerationOutcome::failed(GenerationFailure::NoCandidatesNearby, 0);
        }

        let attempts = self
            .settings
            .location_max_attempts
            .min(candidates.len() * 2);
        let mut accepted = Vec::new();

        for attempt in 0..attempts {
            if accepted.len() >= self.settings.target_quests {
                break;
            }

            let candidate = &candidates[attempt % candidates.len()];
            let quest = self.location_quest(candidate, request);
            self.consider(quest, self.settings.location_min_score, &mut accepted);
        }

        self.finish(accepted, candidates.len(), attempts)
    }

    async fn generate_block_quests(
        &self,
        request: &RequestContext,
        conditions: &ProviderConditions,
    ) -> GenerationOutcome {
        let Some(store) = self.content.as_ref() else {
            return GenerationOutcome::failed(
                GenerationFailure::ContentUnavailable("no content store configured".to_string()),
                0,
            );
        };

        let blocks = match store.get_content_blocks().await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Failed to load content blocks: {}", e);
                return GenerationOutcome::failed(
                    GenerationFailure::ContentUnavailable(e.user_message()),
                    0,
                );
            }
        };

        let eligible = filter_blocks(blocks, request);
        if eligible.is_empty() {
            return GenerationOutcome::failed(GenerationFailure::NoEligibleContent, 0);
        }

        // Locations are optional here; an empty fetch just means block-only quests
        let locations = match request.location.as_ref() {
            Some(location) => {
                let params = self.search_params(location, self.settings.block_location_target);
                self.registry
                    .fetch_many(&params, self.settings.block_location_target, conditions)
                    .await
            }
            None => Vec::new(),
        };
        debug!(
            "{} eligible blocks, {} locations to pair with",
            eligible.len(),
            locations.len()
        );

        let attempts = self.settings.block_max_attempts;
        let mut accepted = Vec::new();

        for _ in 0..attempts {
            if accepted.len() >= self.settings.target_quests {
                break;
            }

            let block = &eligible[self.random_index(eligible.len())];
            let location = if locations.is_empty() {
                None
            } else {
                Some(&locations[self.random_index(locations.len())])
            };

            let quest = self.block_quest(block, location, request);
            self.consider(quest, self.settings.block_min_score, &mut accepted);
        }

        self.finish(accepted, eligible.len(), attempts)
    }

    /// Accept `quest` if it clears `threshold`, or unconditionally if it is the first
    fn consider(&self, quest: ComposedQuest, threshold: f64, accepted: &mut Vec<ComposedQuest>) {
        let score = self.scorer.score_quest(&quest);
        if score >= threshold || accepted.is_empty() {
            debug!("Accepted quest {} with score {}", quest.id, score);
            accepted.push(quest);
        } else {
            debug!(
                "Rejected quest {} with score {} (minimum {})",
                quest.id, score, threshold
            );
        }
    }

    fn finish(
        &self,
        mut accepted: Vec<ComposedQuest>,
        considered_count: usize,
        attempts: usize,
    ) -> GenerationOutcome {
        if accepted.is_empty() {
            return GenerationOutcome::failed(
                GenerationFailure::AttemptsExhausted { attempts },
                considered_count,
            );
        }

        self.scorer.sort_descending(&mut accepted);
        GenerationOutcome::succeeded(accepted, considered_count)
    }

    fn location_quest(&self, candidate: &LocationCandidate, request: &RequestContext) -> ComposedQuest {
        let ceiling = request.timeframe.ceiling_minutes();
        let travel = candidate
            .distance_miles
            .map(|miles| miles * 2.0 / TRAVEL_MPH * 60.0)
            .unwrap_or(0.0);
        let total_minutes = ((ON_SITE_MINUTES + travel).round() as u32).min(ceiling);

        let mut tags = candidate.tags.clone();
        if !tags.contains(&candidate.provider_type) {
            tags.push(candidate.provider_type.clone());
        }

        ComposedQuest {
            id: self.next_quest_id(),
            description: format!("Visit {}", candidate.title),
            total_minutes,
            difficulty: request.difficulty,
            primary_location: Some(candidate.clone()),
            supplementary_locations: Vec::new(),
            block: None,
            tags,
        }
    }

    fn block_quest(
        &self,
        block: &ContentBlock,
        location: Option<&LocationCandidate>,
        request: &RequestContext,
    ) -> ComposedQuest {
        let ceiling = request.timeframe.ceiling_minutes();
        let description = match location {
            Some(location) => format!("{} at {}", block.action, location.title),
            None => block.action.clone(),
        };

        let travel = location
            .and_then(|l| l.distance_miles)
            .map(|miles| (miles * 2.0 / TRAVEL_MPH * 60.0).round() as u32)
            .unwrap_or(0);

        ComposedQuest {
            id: self.next_quest_id(),
            description,
            total_minutes: (block.minutes + travel).min(ceiling),
            difficulty: block.difficulty,
            primary_location: location.cloned(),
            supplementary_locations: Vec::new(),
            block: Some(block.clone()),
            tags: block.theme_tags.clone(),
        }
    }

    /// Request overrides first, then values derived from the clock and location.
    /// The mode always follows the theme.
    fn conditions_for(&self, request: &RequestContext) -> ProviderConditions {
        let derived = geo::current_conditions(request.location.as_ref(), Utc::now());
        let mut conditions = request.conditions.clone().unwrap_or_default().or(derived);
        conditions.mode = Some(request.theme.mode());
        conditions
    }

    fn search_params(&self, location: &DetectedLocation, limit: usize) -> SearchParams {
        SearchParams::new(
            location.latitude,
            location.longitude,
            self.settings.search_radius_miles,
            limit,
        )
    }

    fn random_index(&self, len: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0..len),
            Err(poisoned) => poisoned.into_inner().random_range(0..len),
        }
    }

    fn next_quest_id(&self) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("quest_{}_{}", Utc::now().timestamp_millis(), n)
    }

    /// What can currently be explored around `location`
    #[must_use]
    pub fn list_available_providers(
        &self,
        location: Option<&DetectedLocation>,
        conditions: &ProviderConditions,
    ) -> Vec<ProviderSummary> {
        let params = match location {
            Some(location) => self.search_params(location, self.settings.location_target),
            None => SearchParams::new(
                0.0,
                0.0,
                self.settings.search_radius_miles,
                self.settings.location_target,
            ),
        };
        self.registry.summaries(&params, conditions)
    }

    #[must_use]
    pub fn get_stats(&self) -> RegistryStats {
        self.registry.get_stats()
    }

    pub async fn search_provider(
        &self,
        type_tag: &str,
        params: &SearchParams,
    ) -> Result<Vec<LocationCandidate>, ProviderError> {
        self.registry.search_provider(type_tag, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StaticContentStore;
    use crate::error::SidequestError;
    use crate::models::{
        BlockTimeOfDay, Coordinates, Difficulty, Theme, Timeframe, TransportRequirement,
        Transportation,
    };
    use crate::providers::{LocationProvider, ProviderRegistration, SearchOutcome};
    use async_trait::async_trait;

    struct ListProvider {
        registration: ProviderRegistration,
        candidates: Vec<LocationCandidate>,
    }

    #[async_trait]
    impl LocationProvider for ListProvider {
        fn registration(&self) -> &ProviderRegistration {
            &self.registration
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn search(&self, _params: &SearchParams) -> Result<SearchOutcome, ProviderError> {
            Ok(SearchOutcome::new(self.candidates.clone(), 0))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ContentStore for BrokenStore {
        async fn get_content_blocks(&self) -> crate::error::Result<Vec<ContentBlock>> {
            Err(SidequestError::content_store("sheet offline"))
        }
    }

    fn create_test_candidate(id: &str, provider_type: &str) -> LocationCandidate {
        let mut candidate = LocationCandidate::new(
            id,
            format!("Place {}", id),
            "A place",
            Coordinates::new(27.95, -82.46),
            "Tampa, FL",
            provider_type,
        );
        candidate.distance_miles = Some(15.0);
        candidate
    }

    fn create_test_block(id: &str) -> ContentBlock {
        ContentBlock {
            id: id.to_string(),
            action: "Sketch the view".to_string(),
            minutes: 45,
            difficulty: Difficulty::Easy,
            requires_location: false,
            transportation: TransportRequirement::NoCarNeeded,
            theme_tags: Vec::new(),
            time_of_day: BlockTimeOfDay::Anytime,
        }
    }

    fn create_test_registry(provider_type: &str, count: usize) -> Arc<ProviderRegistry> {
        let mut registry = ProviderRegistry::with_seed(7);
        let candidates = (0..count)
            .map(|i| create_test_candidate(&format!("{}-{}", provider_type, i), provider_type))
            .collect();
        registry
            .register(Arc::new(ListProvider {
                registration: ProviderRegistration::new("Test", provider_type, 2.0),
                candidates,
            }))
            .unwrap();
        Arc::new(registry)
    }

    fn create_test_request(theme: Theme) -> RequestContext {
        RequestContext::new(
            Timeframe::Afternoon,
            Difficulty::Easy,
            Transportation::HasCar,
            theme,
        )
    }

    #[tokio::test]
    async fn test_location_quest_needs_location() {
        let composer = QuestComposer::new(create_test_registry("lighthouse", 3), None);
        let outcome = composer.generate(&create_test_request(Theme::Adventure)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(GenerationFailure::MissingLocation));
    }

    #[tokio::test]
    async fn test_location_quest_duration_and_tags() {
        let composer = QuestComposer::new(create_test_registry("lighthouse", 1), None);
        let request = create_test_request(Theme::Adventure).at(DetectedLocation::new(27.95, -82.46));
        let outcome = composer.generate(&request).await;

        assert!(outcome.success);
        // A single candidate gives two attempts, both above the bar
        assert_eq!(outcome.quests.len(), 2);
        let quest = &outcome.quests[0];
        // 60 on site + 30 miles round trip at 30 mph
        assert_eq!(quest.total_minutes, 120);
        assert_eq!(quest.tags, vec!["lighthouse"]);
        assert_eq!(quest.difficulty, Difficulty::Easy);
        assert!(quest.id.starts_with("quest_"));
        assert_ne!(outcome.quests[0].id, outcome.quests[1].id);
    }

    #[tokio::test]
    async fn test_duration_capped_by_timeframe() {
        let composer = QuestComposer::new(create_test_registry("lighthouse", 1), None);
        let mut request =
            create_test_request(Theme::Adventure).at(DetectedLocation::new(27.95, -82.46));
        request.timeframe = Timeframe::Quick;

        let outcome = composer.generate(&request).await;
        assert_eq!(outcome.quests[0].total_minutes, 60);
    }

    #[tokio::test]
    async fn test_low_scores_keep_first_quest() {
        // "pier" scores 1.0, below the 2.0 minimum
        let composer = QuestComposer::new(create_test_registry("pier", 4), None);
        let request = create_test_request(Theme::Adventure).at(DetectedLocation::new(27.95, -82.46));
        let outcome = composer.generate(&request).await;

        assert!(outcome.success);
        assert_eq!(outcome.quests.len(), 1);
        assert!(composer.scorer().score_quest(&outcome.quests[0]) < 2.0);
        assert!((1..=4).contains(&outcome.considered_count));
    }

    #[tokio::test]
    async fn test_content_unavailable() {
        let composer = QuestComposer::new(create_test_registry("lighthouse", 1), None);
        let outcome = composer.generate(&create_test_request(Theme::Wildcard)).await;
        assert!(matches!(
            outcome.error,
            Some(GenerationFailure::ContentUnavailable(_))
        ));

        let composer = QuestComposer::new(
            create_test_registry("lighthouse", 1),
            Some(Arc::new(BrokenStore)),
        );
        let outcome = composer.generate(&create_test_request(Theme::Wildcard)).await;
        assert!(!outcome.success);
        assert!(matches!(
            outcome.error,
            Some(GenerationFailure::ContentUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_no_eligible_content() {
        let mut block = create_test_block("b1");
        block.difficulty = Difficulty::Extreme;
        let store = Arc::new(StaticContentStore::new(vec![block]));
        let composer = QuestComposer::new(create_test_registry("lighthouse", 1), Some(store));

        let outcome = composer.generate(&create_test_request(Theme::Wildcard)).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(GenerationFailure::NoEligibleContent));
        assert_ne!(
            GenerationFailure::NoEligibleContent.to_string(),
            GenerationFailure::NoCandidatesNearby.to_string()
        );
    }

    #[tokio::test]
    async fn test_block_quests_pair_with_locations() {
        let store = Arc::new(StaticContentStore::new(vec![
            create_test_block("b1"),
            create_test_block("b2"),
        ]));
        let composer =
            QuestComposer::new(create_test_registry("wind_generator", 3), Some(store)).with_seed(3);
        let request = create_test_request(Theme::Wildcard).at(DetectedLocation::new(27.95, -82.46));

        let outcome = composer.generate(&request).await;
        assert!(outcome.success);
        assert_eq!(outcome.quests.len(), 3);
        assert_eq!(outcome.considered_count, 2);

        for quest in &outcome.quests {
            let location = quest.primary_location.as_ref().unwrap();
            assert_eq!(
                quest.description,
                format!("Sketch the view at {}", location.title)
            );
            assert!(quest.block.is_some());
            // 45 minutes plus an hour of driving
            assert_eq!(quest.total_minutes, 105);
        }
    }

    #[tokio::test]
    async fn test_outcome_serializes_error_message() {
        let composer = QuestComposer::new(create_test_registry("lighthouse", 1), None);
        let outcome = composer.generate(&create_test_request(Theme::Adventure)).await;
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Location is required to find places near you"
        );
    }

    #[test]
    fn test_request_conditions_override_derived() {
        let composer = QuestComposer::new(create_test_registry("lighthouse", 1), None);
        let request = create_test_request(Theme::Adventure)
            .at(DetectedLocation::with_region(27.95, -82.46, "FL"))
            .with_conditions(ProviderConditions::default().with_region("UT"));

        let conditions = composer.conditions_for(&request);
        assert_eq!(conditions.region.as_deref(), Some("UT"));
        assert_eq!(conditions.mode, Some(QuestMode::PureLocation));
        assert!(conditions.season.is_some());
        assert!(conditions.time_of_day.is_some());
    }
}
