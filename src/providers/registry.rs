use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::catalog::describe;
use super::{LocationProvider, ProviderError, ProviderSummary, SearchParams};
use crate::config::RegistryConfig;
use crate::error::{Result, SidequestError};
use crate::geo;
use crate::models::{LocationCandidate, ProviderConditions};

/// Aggregate registry diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    /// Enabled and configured
    pub enabled: usize,
    pub types: Vec<String>,
    /// Advisory only; concurrent callers may interleave updates
    pub last_selected_type: Option<String>,
}

/// Holds the registered providers and selects between them
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LocationProvider>>,
    rng: Mutex<StdRng>,
    last_selected: Mutex<Option<String>>,
    fetch_timeout: Duration,
    distinct_fraction: f64,
    distinct_retries: u32,
    parallel_fetch: bool,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Registry with a deterministic selection sequence
    pub fn with_seed(seed: u64) -> Self {
        let defaults = RegistryConfig::default();
        Self {
            providers: Vec::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            last_selected: Mutex::new(None),
            fetch_timeout: Duration::from_secs(defaults.fetch_timeout_seconds),
            distinct_fraction: defaults.distinct_fraction,
            distinct_retries: defaults.distinct_retries,
            parallel_fetch: defaults.parallel_fetch,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &RegistryConfig) -> Self {
        self.fetch_timeout = Duration::from_secs(config.fetch_timeout_seconds);
        self.distinct_fraction = config.distinct_fraction;
        self.distinct_retries = config.distinct_retries;
        self.parallel_fetch = config.parallel_fetch;
        self
    }

    /// Add a provider.
    ///
    /// Re-registering the same instance is a no-op; a different provider
    /// with a taken type tag or a non-positive weight is rejected.
    pub fn register(&mut self, provider: Arc<dyn LocationProvider>) -> Result<()> {
        let registration = provider.registration();

        if !registration.weight.is_finite() || registration.weight <= 0.0 {
            return Err(SidequestError::registration(format!(
                "Provider '{}' has invalid weight {}",
                registration.type_tag, registration.weight
            )));
        }

        if let Some(existing) = self.get(&registration.type_tag) {
            if Arc::ptr_eq(&existing, &provider) {
                debug!("Provider {} already registered", registration.type_tag);
                return Ok(());
            }
            return Err(SidequestError::registration(format!(
                "Type tag '{}' is already registered",
                registration.type_tag
            )));
        }

        info!(
            "Registered provider {} ({}) with weight {}",
            registration.name, registration.type_tag, registration.weight
        );
        self.providers.push(provider);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, type_tag: &str) -> Option<Arc<dyn LocationProvider>> {
        self.providers
            .iter()
            .find(|p| p.type_tag() == type_tag)
            .cloned()
    }

    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn LocationProvider>] {
        &self.providers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Toggle a provider's enabled flag. Returns false for unknown type tags.
    pub fn set_enabled(&self, type_tag: &str, enabled: bool) -> bool {
        match self.get(type_tag) {
            Some(provider) => {
                provider.registration().set_enabled(enabled);
                info!("Provider {} enabled: {}", type_tag, enabled);
                true
            }
            None => false,
        }
    }

    /// Providers that are available and whose gate admits `conditions`.
    ///
    /// Every provider is evaluated so the debug log stays complete.
    pub fn list_available(
        &self,
        params: &SearchParams,
        conditions: &ProviderConditions,
    ) -> Vec<Arc<dyn LocationProvider>> {
        let mut available = Vec::new();

        for provider in &self.providers {
            let is_available = provider.is_available();
            let can_activate = provider.can_activate(params, conditions);
            debug!(
                provider = %provider.type_tag(),
                "available: {}, can activate: {}", is_available, can_activate
            );

            if is_available && can_activate {
                available.push(Arc::clone(provider));
            }
        }

        debug!("{}/{} providers available", available.len(), self.providers.len());
        available
    }

    /// Draw one available provider with probability proportional to weight squared
    pub fn select_weighted(
        &self,
        params: &SearchParams,
        conditions: &ProviderConditions,
    ) -> Option<Arc<dyn LocationProvider>> {
        let available = self.list_available(params, conditions);
        if available.is_empty() {
            debug!("No providers available for selection");
            return None;
        }

        let weights: Vec<f64> = available.iter().map(|p| p.registration().weight).collect();
        let roll: f64 = match self.rng.lock() {
            Ok(mut rng) => rng.random(),
            Err(poisoned) => poisoned.into_inner().random(),
        };

        let index = pick_weighted(&weights, roll)?;
        let selected = Arc::clone(&available[index]);
        debug!(provider = %selected.type_tag(), "Selected provider");

        if let Ok(mut last) = self.last_selected.lock() {
            *last = Some(selected.type_tag().to_string());
        }

        Some(selected)
    }

    /// Fetch up to `target` candidates, one per weighted draw.
    ///
    /// The first 70% of draws avoid provider types already drawn in this call.
    /// Each provider call is bounded by the fetch timeout; failures and
    /// timeouts are logged and skipped.
    #[instrument(skip(self, params, conditions), fields(lat = params.latitude, lng = params.longitude))]
    pub async fn fetch_many(
        &self,
        params: &SearchParams,
        target: usize,
        conditions: &ProviderConditions,
    ) -> Vec<LocationCandidate> {
        let plan = self.plan_draws(params, target, conditions);
        if plan.is_empty() {
            info!("No providers available, nothing to fetch");
            return Vec::new();
        }

        let results: Vec<Option<LocationCandidate>> = if self.parallel_fetch {
            join_all(plan.iter().map(|provider| self.fetch_one(provider, params))).await
        } else {
            let mut results = Vec::with_capacity(plan.len());
            for provider in &plan {
                results.push(self.fetch_one(provider, params).await);
            }
            results
        };

        let mut seen = HashSet::new();
        let candidates: Vec<LocationCandidate> = results
            .into_iter()
            .flatten()
            .filter(|candidate| {
                let fresh = seen.insert(candidate.id.clone());
                if !fresh {
                    debug!("Dropping duplicate candidate {}", candidate.id);
                }
                fresh
            })
            .take(target)
            .collect();

        info!(
            "Fetched {} candidates from {} provider calls",
            candidates.len(),
            plan.len()
        );
        candidates
    }

    fn plan_draws(
        &self,
        params: &SearchParams,
        target: usize,
        conditions: &ProviderConditions,
    ) -> Vec<Arc<dyn LocationProvider>> {
        let distinct_slots = (target as f64 * self.distinct_fraction).ceil() as usize;
        let mut used_types: HashSet<String> = HashSet::new();
        let mut plan: Vec<Arc<dyn LocationProvider>> = Vec::with_capacity(target);

        for slot in 0..target {
            let choice = if slot < distinct_slots {
                let mut choice = None;
                for _ in 0..self.distinct_retries.max(1) {
                    let Some(provider) = self.select_weighted(params, conditions) else {
                        break;
                    };
                    let fresh = !used_types.contains(provider.type_tag());
                    choice = Some(provider);
                    if fresh {
                        break;
                    }
                }
                choice
            } else {
                self.select_weighted(params, conditions)
            };

            // Nothing selectable now means nothing selectable later either
            let Some(provider) = choice else {
                break;
            };

            used_types.insert(provider.type_tag().to_string());
            plan.push(provider);
        }

        plan
    }

    async fn fetch_one(
        &self,
        provider: &Arc<dyn LocationProvider>,
        params: &SearchParams,
    ) -> Option<LocationCandidate> {
        match tokio::time::timeout(self.fetch_timeout, provider.get_random_candidate(params)).await
        {
            Ok(Some(candidate)) if candidate.has_valid_coordinates() => Some(candidate),
            Ok(Some(candidate)) => {
                warn!(
                    provider = %provider.type_tag(),
                    "Skipping candidate {} with invalid coordinates", candidate.id
                );
                None
            }
            Ok(None) => {
                debug!(provider = %provider.type_tag(), "No candidate returned");
                None
            }
            Err(_) => {
                warn!(
                    provider = %provider.type_tag(),
                    "Provider timed out after {}s, skipping",
                    self.fetch_timeout.as_secs()
                );
                None
            }
        }
    }

    /// Search a single provider directly, sorted by distance from the query point
    #[instrument(skip(self, params))]
    pub async fn search_provider(
        &self,
        type_tag: &str,
        params: &SearchParams,
    ) -> std::result::Result<Vec<LocationCandidate>, ProviderError> {
        let provider = self
            .get(type_tag)
            .filter(|p| p.is_available())
            .ok_or_else(|| {
                ProviderError::not_configured(format!("Provider '{}' is not available", type_tag))
            })?;

        let outcome = tokio::time::timeout(self.fetch_timeout, provider.search(params))
            .await
            .map_err(|_| ProviderError::Timeout(self.fetch_timeout.as_secs()))??;

        let origin = params.coordinates();
        let mut candidates: Vec<LocationCandidate> = outcome
            .candidates
            .into_iter()
            .filter(LocationCandidate::has_valid_coordinates)
            .map(|mut candidate| {
                candidate.distance_miles =
                    Some(geo::rounded_distance_miles(origin, candidate.coordinates()));
                candidate
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance_miles
                .unwrap_or(f64::MAX)
                .total_cmp(&b.distance_miles.unwrap_or(f64::MAX))
        });

        info!(
            "Provider {} returned {} candidates ({} API calls)",
            type_tag,
            candidates.len(),
            outcome.api_calls
        );
        Ok(candidates)
    }

    /// Summaries of every registered provider for the given situation
    pub fn summaries(
        &self,
        params: &SearchParams,
        conditions: &ProviderConditions,
    ) -> Vec<ProviderSummary> {
        self.providers
            .iter()
            .map(|provider| {
                let registration = provider.registration();
                ProviderSummary {
                    name: registration.name.clone(),
                    type_tag: registration.type_tag.clone(),
                    weight: registration.weight,
                    available: provider.is_available()
                        && provider.can_activate(params, conditions),
                    description: describe(&registration.type_tag).to_string(),
                }
            })
            .collect()
    }

    #[must_use]
    pub fn get_stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.providers.len(),
            enabled: self
                .providers
                .iter()
                .filter(|p| p.is_available())
                .count(),
            types: self
                .providers
                .iter()
                .map(|p| p.type_tag().to_string())
                .collect(),
            last_selected_type: self.last_selected.lock().ok().and_then(|last| last.clone()),
        }
    }
}

/// Index drawn from `weights` with mass `w²`, given a uniform roll in `[0, 1)`.
///
/// Falls back to the highest weight when rounding lets the roll run past the end.
fn pick_weighted(weights: &[f64], roll: f64) -> Option<usize> {
    let total: f64 = weights.iter().map(|w| w * w).sum();
    let target = roll * total;

    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight * weight;
        if target < cumulative {
            return Some(index);
        }
    }

    weights
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}
